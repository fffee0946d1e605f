//! Serial-date detection on the observation-label column

use chrono::{Datelike, Days, NaiveDate};
use tracing::{debug, info};

use crate::dataset::{Dataset, Frequency};
use crate::error::Result;

/// Step ranges (min..=max days between labels), first match wins
const FREQUENCIES: [(i64, i64, Frequency); 5] = [
    (364, 365, Frequency::Annual),
    (90, 92, Frequency::Quarterly),
    (28, 31, Frequency::Monthly),
    (7, 7, Frequency::Weekly),
    (1, 5, Frequency::Daily),
];

const YEARS: std::ops::RangeInclusive<i64> = 1000..=3000;

const PHANTOM_LEAP_DAY: i64 = 60;

/// Day counting base of the workbook
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateSystem {
    /// Serial 1 is 1900-01-01, with the phantom 1900-02-29 at serial 60
    #[default]
    Excel1900,
    /// Serial 0 is 1904-01-01
    Excel1904,
}

impl DateSystem {
    pub fn from_date1904(date1904: bool) -> Self {
        if date1904 {
            DateSystem::Excel1904
        } else {
            DateSystem::Excel1900
        }
    }

    /// Calendar date of a serial. `None` for negative serials and for the
    /// 1900 system's serial 60, the nonexistent 1900-02-29.
    pub fn to_date(self, serial: i64) -> Option<NaiveDate> {
        let days = u64::try_from(serial).ok()?;
        let base = match self {
            DateSystem::Excel1900 if serial == PHANTOM_LEAP_DAY => return None,
            DateSystem::Excel1904 => NaiveDate::from_ymd_opt(1904, 1, 1)?,
            DateSystem::Excel1900 if serial < PHANTOM_LEAP_DAY => {
                NaiveDate::from_ymd_opt(1899, 12, 31)?
            }
            DateSystem::Excel1900 => NaiveDate::from_ymd_opt(1899, 12, 30)?,
        };
        base.checked_add_days(Days::new(days))
    }
}

/// Frequency implied by integer labels, or `None` if they do not look
/// like serial dates
pub fn infer_frequency(labels: &[String]) -> Option<Frequency> {
    if labels.len() < 2 || labels[0] == "1" {
        return None;
    }
    let serials = integer_labels(labels)?;

    let mut dmin = i64::MAX;
    let mut dmax = i64::MIN;
    for pair in serials.windows(2) {
        let d = pair[1] - pair[0];
        dmin = dmin.min(d);
        dmax = dmax.max(d);
    }
    if dmax < 0 {
        (dmin, dmax) = (-dmax, -dmin);
    }
    debug!(dmin, dmax, "label step range");

    // Consecutive calendar years written as plain numbers
    if dmin == 1 && dmax == 1 && serials.iter().all(|y| YEARS.contains(y)) {
        return None;
    }

    FREQUENCIES
        .iter()
        .find(|(lo, hi, _)| dmin >= *lo && dmax <= *hi)
        .map(|(_, _, frequency)| *frequency)
}

fn integer_labels(labels: &[String]) -> Option<Vec<i64>> {
    labels.iter().map(|l| l.trim().parse::<i64>().ok()).collect()
}

pub fn format_date(date: NaiveDate, frequency: Frequency) -> String {
    match frequency {
        Frequency::Annual => format!("{}", date.year()),
        Frequency::Quarterly => format!("{}:{}", date.year(), date.month0() / 3 + 1),
        Frequency::Monthly => format!("{}:{:02}", date.year(), date.month()),
        Frequency::Weekly | Frequency::Daily => date.format("%Y-%m-%d").to_string(),
    }
}

/// Rewrite serial-date labels as calendar dates when they match a
/// plausible frequency. Labels are untouched when they do not.
pub fn apply(dataset: &mut Dataset, system: DateSystem) -> Result<Option<Frequency>> {
    let Some(labels) = dataset.labels() else {
        return Ok(None);
    };
    let Some(frequency) = infer_frequency(labels) else {
        debug!("labels are not serial dates");
        return Ok(None);
    };
    let Some(serials) = integer_labels(labels) else {
        return Ok(None);
    };
    let Some(dates) = serials
        .iter()
        .map(|&s| system.to_date(s))
        .collect::<Option<Vec<_>>>()
    else {
        debug!("serial outside the calendar range");
        return Ok(None);
    };

    for (t, date) in dates.into_iter().enumerate() {
        dataset.set_label(t, &format_date(date, frequency))?;
    }
    dataset.set_frequency(Some(frequency));
    info!(frequency = frequency.as_str(), "rewrote serial-date labels");
    Ok(Some(frequency))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn dataset_with_labels(values: &[&str]) -> Dataset {
        let mut ds = Dataset::allocate(1, values.len(), true).unwrap();
        for (t, v) in values.iter().enumerate() {
            ds.set_label(t, v).unwrap();
        }
        ds
    }

    #[test]
    fn test_infer_frequency_table() {
        assert_eq!(infer_frequency(&labels(&["36892", "37257", "37622"])), Some(Frequency::Annual));
        assert_eq!(
            infer_frequency(&labels(&["36526", "36617", "36708", "36800"])),
            Some(Frequency::Quarterly)
        );
        assert_eq!(
            infer_frequency(&labels(&["36526", "36557", "36586", "36617"])),
            Some(Frequency::Monthly)
        );
        assert_eq!(infer_frequency(&labels(&["36526", "36533", "36540"])), Some(Frequency::Weekly));
        assert_eq!(infer_frequency(&labels(&["0", "1", "2"])), Some(Frequency::Daily));
        assert_eq!(infer_frequency(&labels(&["36530", "36533", "36534"])), Some(Frequency::Daily));
    }

    #[test]
    fn test_no_match_or_guarded() {
        assert_eq!(infer_frequency(&labels(&["1", "2", "3"])), None);
        assert_eq!(infer_frequency(&labels(&["2000", "2001", "2002"])), None);
        assert_eq!(infer_frequency(&labels(&["10", "20", "30"])), None);
        assert_eq!(infer_frequency(&labels(&["10", "11", "9"])), None);
        assert_eq!(infer_frequency(&labels(&["10", "x"])), None);
        assert_eq!(infer_frequency(&labels(&["10"])), None);
    }

    #[test]
    fn test_reversed_series() {
        assert_eq!(
            infer_frequency(&labels(&["37622", "37257", "36892"])),
            Some(Frequency::Annual)
        );
    }

    #[test]
    fn test_date_systems() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(DateSystem::Excel1900.to_date(1), Some(d(1900, 1, 1)));
        assert_eq!(DateSystem::Excel1900.to_date(59), Some(d(1900, 2, 28)));
        assert_eq!(DateSystem::Excel1900.to_date(60), None);
        assert_eq!(DateSystem::Excel1900.to_date(61), Some(d(1900, 3, 1)));
        assert_eq!(DateSystem::Excel1904.to_date(60), Some(d(1904, 3, 1)));
        assert_eq!(DateSystem::Excel1900.to_date(36526), Some(d(2000, 1, 1)));
        assert_eq!(DateSystem::Excel1904.to_date(0), Some(d(1904, 1, 1)));
        assert_eq!(DateSystem::Excel1900.to_date(-1), None);
    }

    #[test]
    fn test_apply_rewrites_daily_labels() {
        let mut ds = dataset_with_labels(&["0", "1", "2"]);
        assert_eq!(apply(&mut ds, DateSystem::Excel1900).unwrap(), Some(Frequency::Daily));
        assert_eq!(
            ds.labels().unwrap(),
            &["1899-12-31", "1900-01-01", "1900-01-02"]
        );
        assert_eq!(ds.frequency(), Some(Frequency::Daily));
    }

    #[test]
    fn test_apply_abandons_runs_through_phantom_leap_day() {
        let mut ds = dataset_with_labels(&["59", "60", "61"]);
        assert_eq!(apply(&mut ds, DateSystem::Excel1900).unwrap(), None);
        assert_eq!(ds.labels().unwrap(), &["59", "60", "61"]);
        assert_eq!(ds.frequency(), None);

        let mut ds = dataset_with_labels(&["61", "62", "63"]);
        assert_eq!(apply(&mut ds, DateSystem::Excel1900).unwrap(), Some(Frequency::Daily));
        assert_eq!(
            ds.labels().unwrap(),
            &["1900-03-01", "1900-03-02", "1900-03-03"]
        );
    }

    #[test]
    fn test_apply_formats_by_frequency() {
        let mut ds = dataset_with_labels(&["36526", "36617", "36708", "36800"]);
        apply(&mut ds, DateSystem::Excel1900).unwrap();
        assert_eq!(ds.labels().unwrap(), &["2000:1", "2000:2", "2000:3", "2000:4"]);

        let mut ds = dataset_with_labels(&["36526", "36557", "36586"]);
        apply(&mut ds, DateSystem::Excel1900).unwrap();
        assert_eq!(ds.labels().unwrap(), &["2000:01", "2000:02", "2000:03"]);
    }

    #[test]
    fn test_apply_leaves_counters_alone() {
        let mut ds = dataset_with_labels(&["1", "2", "3"]);
        assert_eq!(apply(&mut ds, DateSystem::Excel1900).unwrap(), None);
        assert_eq!(ds.labels().unwrap(), &["1", "2", "3"]);
        assert_eq!(ds.frequency(), None);
    }
}
