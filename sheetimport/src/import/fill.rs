//! Second pass: write names, labels and values into the allocated dataset

use tracing::debug;

use super::cells::{self, CellReader, CellValue, at_cell};
use super::formula::LinearStep;
use super::layout::{ColumnSlot, Layout, RowSlot};
use crate::config::ImportConfig;
use crate::dataset::{Dataset, check_varname};
use crate::error::{ImportError, Result};
use crate::reader::cell_ref;
use crate::reader::xml_tree::XmlDocument;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillOutcome {
    /// At least one label came from a number or a linear formula
    pub numeric_labels: bool,
}

pub fn fill(
    doc: &XmlDocument,
    reader: &mut CellReader,
    layout: &Layout,
    config: &ImportConfig,
    dataset: &mut Dataset,
) -> Result<FillOutcome> {
    let mut outcome = FillOutcome::default();
    let mut skipped_formulas = 0usize;

    for item in cells::cells(doc) {
        let (reference, cell) = item?;
        let (row, col) = cell_ref::decode(reference)?;
        let (Some(cslot), Some(rslot)) = (layout.column_slot(col), layout.row_slot(row)) else {
            continue;
        };
        let Some(value) = reader.read(reference, cell)? else {
            continue;
        };

        let stored = match (cslot, rslot, value) {
            (ColumnSlot::Labels, RowSlot::Header, _) => Ok(()),
            (ColumnSlot::Labels, RowSlot::Obs(t), CellValue::Number(n)) => {
                outcome.numeric_labels = true;
                dataset.set_label(t, &format_number(n))
            }
            (ColumnSlot::Labels, RowSlot::Obs(t), CellValue::Text(text)) => {
                dataset.set_label(t, &text)
            }
            (ColumnSlot::Labels, RowSlot::Obs(t), CellValue::Formula(formula)) => {
                match step_label(layout, dataset, col, t, &formula) {
                    Some(label) => {
                        outcome.numeric_labels = true;
                        dataset.set_label(t, &label)
                    }
                    None => {
                        skipped_formulas += 1;
                        Ok(())
                    }
                }
            }
            (ColumnSlot::Var(i), RowSlot::Header, CellValue::Text(text)) => {
                set_name(dataset, i, &text)
            }
            (ColumnSlot::Var(_), RowSlot::Header, CellValue::Number(n)) => Err(
                ImportError::data(format!("number {} where a variable name was expected", n)),
            ),
            (ColumnSlot::Var(i), RowSlot::Obs(t), CellValue::Number(n)) => {
                dataset.set_value(i, t, Some(n))
            }
            (ColumnSlot::Var(i), RowSlot::Obs(t), CellValue::Text(text)) => {
                if config.is_missing_token(&text) {
                    dataset.set_value(i, t, None)
                } else {
                    Err(ImportError::data(format!(
                        "expected a number but found '{}'",
                        text
                    )))
                }
            }
            (ColumnSlot::Var(_), _, CellValue::Formula(_)) => {
                skipped_formulas += 1;
                Ok(())
            }
        };
        stored.map_err(|e| at_cell(reference, e))?;
    }

    if skipped_formulas > 0 {
        debug!(skipped_formulas, "left formula cells without cached values blank");
    }
    Ok(outcome)
}

fn set_name(dataset: &mut Dataset, i: usize, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let name = check_varname(text)?;
    if let Some(existing) = dataset.var_index(&name)
        && existing != i
    {
        return Err(ImportError::data(format!(
            "duplicate variable name '{}'",
            name
        )));
    }
    dataset.set_varname(i, name)
}

/// Label for a `<ref> ± k` formula whose reference is an earlier label
/// in the same column
fn step_label(
    layout: &Layout,
    dataset: &Dataset,
    col: u32,
    t: usize,
    formula: &str,
) -> Option<String> {
    if t == 0 {
        return None;
    }
    let step = LinearStep::parse(formula)?;
    if step.col != col {
        return None;
    }
    match layout.row_slot(step.row)? {
        RowSlot::Obs(rt) if rt < t => step.apply(dataset.label(rt)?),
        _ => None,
    }
}

/// Integral values print without a fractional part
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::import::scan::{self, Window};
    use crate::reader::package::Package;
    use crate::reader::shared_strings::LazySharedStrings;
    use crate::reader::xml_tree::parse;
    use std::fs::File;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn empty_package(dir: &std::path::Path) -> Package {
        let path = dir.join("book.xlsx");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("xl/workbook.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<workbook/>").unwrap();
        zip.finish().unwrap();
        Package::open(&path).unwrap()
    }

    /// Cell markup: `=...` is a formula without cached value, numbers are
    /// plain, everything else is an inline string
    fn sheet(rows: &[&[&str]]) -> XmlDocument {
        let mut xml = String::from("<worksheet><sheetData>");
        for (r, row) in rows.iter().enumerate() {
            xml.push_str(&format!("<row r=\"{}\">", r + 1));
            for (c, v) in row.iter().enumerate() {
                if v.is_empty() {
                    continue;
                }
                let reference = cell_ref::encode(r as u32 + 1, c as u32 + 1);
                if let Some(f) = v.strip_prefix('=') {
                    xml.push_str(&format!("<c r=\"{reference}\"><f>{f}</f></c>"));
                } else if v.parse::<f64>().is_ok() {
                    xml.push_str(&format!("<c r=\"{reference}\"><v>{v}</v></c>"));
                } else {
                    xml.push_str(&format!(
                        "<c r=\"{reference}\" t=\"inlineStr\"><is><t>{v}</t></is></c>"
                    ));
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        parse(xml.as_bytes(), "worksheet").unwrap()
    }

    fn build(rows: &[&[&str]]) -> Result<(Dataset, FillOutcome)> {
        let dir = tempfile::tempdir().unwrap();
        let package = empty_package(dir.path());
        let mut reader = CellReader::new(LazySharedStrings::new(&package, "xl/sharedStrings.xml"));
        let config = ImportConfig::default();
        let doc = sheet(rows);
        let result = scan::scan(&doc, &mut reader, Window::default(), &config)?;
        let layout = Layout::new(&result, Window::default())?;
        let mut dataset = layout.allocate()?;
        let outcome = fill(&doc, &mut reader, &layout, &config, &mut dataset)?;
        Ok((dataset, outcome))
    }

    #[test]
    fn test_blank_corner_grid() {
        let (ds, outcome) = build(&[
            &["", "gdp", "cpi"],
            &["2000", "100.0", "50.0"],
            &["2001", "105.0", "52.0"],
        ])
        .unwrap();
        assert_eq!(ds.varnames(), &["gdp", "cpi"]);
        assert_eq!(ds.labels().unwrap(), &["2000", "2001"]);
        assert_eq!(ds.column(2).unwrap(), &[Some(50.0), Some(52.0)]);
        assert!(outcome.numeric_labels);
    }

    #[test]
    fn test_missing_tokens_and_bad_strings() {
        let (ds, _) = build(&[&["x", "y"], &["1", "NA"], &["2", "4"]]).unwrap();
        assert_eq!(ds.value(2, 0), None);
        assert_eq!(ds.value(2, 1), Some(4.0));

        let err = build(&[&["x", "y"], &["1", "oops"]]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(err.to_string().contains("B2"));
    }

    #[test]
    fn test_header_names_are_validated() {
        let (ds, _) = build(&[&["obs", "real gdp"], &["1", "2"]]).unwrap();
        assert_eq!(ds.varnames(), &["real_gdp"]);

        for bad in ["2nd", "const", "a-b"] {
            let err = build(&[&["obs", bad], &["x1", "2"]]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Data, "{bad}");
        }
        let err = build(&[&["obs", "x", "x"], &["a", "1", "2"]]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_linear_formula_labels() {
        let (ds, outcome) = build(&[
            &["date", "y"],
            &["36526", "1"],
            &["=A2+7", "2"],
            &["=$A$3+7", "3"],
        ])
        .unwrap();
        assert_eq!(ds.labels().unwrap(), &["36526", "36533", "36540"]);
        assert!(outcome.numeric_labels);
    }

    #[test]
    fn test_other_formulas_stay_blank() {
        let (ds, _) = build(&[
            &["date", "y"],
            &["10", "1"],
            &["=B2+1", "2"],
            &["=SUM(A2:A3)", "=B3*2"],
        ])
        .unwrap();
        assert_eq!(ds.labels().unwrap(), &["10", "", ""]);
        assert_eq!(ds.value(1, 2), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2000.0), "2000");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(1.5), "1.5");
    }
}
