//! The one formula shape the importer evaluates: `<cell> + k` / `<cell> - k`
//!
//! Label columns built as "previous cell plus one period" carry no cached
//! values in some writers. Anything else is left alone.

use regex::Regex;
use std::sync::LazyLock;

use crate::reader::cell_ref;

static STEP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^=?\s*\$?([A-Za-z]{1,3})\$?([0-9]+)\s*([+-])\s*([0-9]+)\s*$").expect("valid regex")
});

/// A parsed `<ref> ± <integer>` formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearStep {
    pub row: u32,
    pub col: u32,
    pub delta: i64,
}

impl LinearStep {
    /// `None` for every other formula shape
    pub fn parse(formula: &str) -> Option<Self> {
        let caps = STEP_RE.captures(formula.trim())?;
        let reference = format!("{}{}", &caps[1], &caps[2]);
        let (row, col) = cell_ref::decode(&reference).ok()?;
        let magnitude = caps[4].parse::<i64>().ok()?;
        let delta = if &caps[3] == "-" { -magnitude } else { magnitude };
        Some(Self { row, col, delta })
    }

    /// Apply the step to the referenced label, which must be an integer
    pub fn apply(&self, previous: &str) -> Option<String> {
        let base = previous.trim().parse::<i64>().ok()?;
        base.checked_add(self.delta).map(|v| v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_linear_steps() {
        assert_eq!(
            LinearStep::parse("A2+1"),
            Some(LinearStep { row: 2, col: 1, delta: 1 })
        );
        assert_eq!(
            LinearStep::parse("=$B$10 - 7"),
            Some(LinearStep { row: 10, col: 2, delta: -7 })
        );
        assert_eq!(
            LinearStep::parse("aa3+365"),
            Some(LinearStep { row: 3, col: 27, delta: 365 })
        );
    }

    #[test]
    fn test_other_shapes_are_not_applicable() {
        for formula in ["A2*2", "SUM(A1:A3)", "A2+B2", "1+A2", "A2+1.5", "Sheet2!A2+1", "A0+1"] {
            assert_eq!(LinearStep::parse(formula), None, "{formula}");
        }
    }

    #[test]
    fn test_apply() {
        let step = LinearStep::parse("A2+91").unwrap();
        assert_eq!(step.apply("36526").as_deref(), Some("36617"));
        assert_eq!(step.apply("2000Q1"), None);
        let back = LinearStep::parse("A2-1").unwrap();
        assert_eq!(back.apply("1").as_deref(), Some("0"));
    }
}
