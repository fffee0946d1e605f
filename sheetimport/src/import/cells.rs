//! Cell enumeration and value resolution shared by both worksheet passes

use crate::error::{ImportError, Result};
use crate::reader::shared_strings::{self, LazySharedStrings};
use crate::reader::xml_tree::{Element, XmlDocument};

/// Resolved content of a non-empty cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    /// Formula without a cached result
    Formula(String),
}

/// Every `<c>` element of the worksheet in document order, paired with
/// its mandatory `r` attribute
pub fn cells(doc: &XmlDocument) -> impl Iterator<Item = Result<(&str, &Element)>> {
    doc.root
        .child("sheetData")
        .into_iter()
        .flat_map(|data| data.children_named("row"))
        .flat_map(|row| row.children_named("c"))
        .map(|cell| match cell.attr("r") {
            Some(reference) => Ok((reference, cell)),
            None => Err(ImportError::format(
                "cell element without an 'r' reference attribute",
            )),
        })
}

/// Resolves cell elements to values, loading shared strings on demand
#[derive(Debug)]
pub struct CellReader<'p> {
    strings: LazySharedStrings<'p>,
}

impl<'p> CellReader<'p> {
    pub fn new(strings: LazySharedStrings<'p>) -> Self {
        Self { strings }
    }

    pub fn strings_loaded(&self) -> bool {
        self.strings.is_loaded()
    }

    /// `Ok(None)` for a cell with neither a value nor a formula
    pub fn read(&mut self, reference: &str, cell: &Element) -> Result<Option<CellValue>> {
        let kind = cell.attr("t").unwrap_or("n");

        if kind == "inlineStr" {
            return Ok(cell
                .child("is")
                .map(|is| CellValue::Text(shared_strings::item_text(is))));
        }

        let raw = cell.child("v").map(|v| v.text.as_str()).filter(|v| !v.is_empty());
        let Some(raw) = raw else {
            return Ok(cell
                .child("f")
                .map(|f| f.text.trim())
                .filter(|f| !f.is_empty())
                .map(|f| CellValue::Formula(f.to_string())));
        };

        let value = match kind {
            "s" => {
                let index = raw.trim().parse::<usize>().map_err(|_| {
                    ImportError::format(format!(
                        "{}: invalid shared string index '{}'",
                        reference, raw
                    ))
                })?;
                let text = self
                    .strings
                    .get(index)
                    .map_err(|e| at_cell(reference, e))?;
                CellValue::Text(text.to_string())
            }
            "str" | "e" => CellValue::Text(raw.to_string()),
            "b" => match raw.trim() {
                "0" => CellValue::Number(0.0),
                "1" => CellValue::Number(1.0),
                other => {
                    return Err(ImportError::format(format!(
                        "{}: invalid boolean '{}'",
                        reference, other
                    )));
                }
            },
            _ => CellValue::Number(parse_number(reference, raw)?),
        };
        Ok(Some(value))
    }
}

fn parse_number(reference: &str, raw: &str) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(ImportError::format(format!(
            "{}: malformed numeric value '{}'",
            reference, raw
        ))),
    }
}

/// Prefix a data or format error with the cell it arose from
pub(crate) fn at_cell(reference: &str, err: ImportError) -> ImportError {
    match err {
        ImportError::Data(msg) => ImportError::Data(format!("{}: {}", reference, msg)),
        ImportError::Format(msg) => ImportError::Format(format!("{}: {}", reference, msg)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::reader::package::Package;
    use crate::reader::xml_tree::parse;
    use std::fs::File;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn package_with_strings(dir: &std::path::Path, sst: &str) -> Package {
        let path = dir.join("book.xlsx");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("xl/sharedStrings.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(sst.as_bytes()).unwrap();
        zip.finish().unwrap();
        Package::open(&path).unwrap()
    }

    fn sheet(cells: &str) -> XmlDocument {
        let xml = format!("<worksheet><sheetData><row r=\"1\">{cells}</row></sheetData></worksheet>");
        parse(xml.as_bytes(), "worksheet").unwrap()
    }

    #[test]
    fn test_reads_each_cell_type() {
        let dir = tempfile::tempdir().unwrap();
        let package = package_with_strings(
            dir.path(),
            r#"<sst uniqueCount="1"><si><t>gdp</t></si></sst>"#,
        );
        let mut reader = CellReader::new(LazySharedStrings::new(&package, "xl/sharedStrings.xml"));
        let doc = sheet(
            r#"<c r="A1"><v>1.5</v></c><c r="B1" t="s"><v>0</v></c><c r="C1" t="b"><v>1</v></c>
<c r="D1" t="inlineStr"><is><t>inline</t></is></c><c r="E1" t="e"><v>#N/A</v></c>
<c r="F1"><f>F0+1</f></c><c r="G1" s="3"/><c r="H1"><f>H0*2</f><v>4</v></c>"#,
        );

        let mut values = Vec::new();
        for item in cells(&doc) {
            let (reference, cell) = item.unwrap();
            values.push(reader.read(reference, cell).unwrap());
        }
        assert_eq!(
            values,
            vec![
                Some(CellValue::Number(1.5)),
                Some(CellValue::Text("gdp".into())),
                Some(CellValue::Number(1.0)),
                Some(CellValue::Text("inline".into())),
                Some(CellValue::Text("#N/A".into())),
                Some(CellValue::Formula("F0+1".into())),
                None,
                Some(CellValue::Number(4.0)),
            ]
        );
        assert!(reader.strings_loaded());
    }

    #[test]
    fn test_strings_stay_unloaded_without_string_cells() {
        let dir = tempfile::tempdir().unwrap();
        let package = package_with_strings(dir.path(), "<sst/>");
        let mut reader = CellReader::new(LazySharedStrings::new(&package, "xl/sharedStrings.xml"));
        let doc = sheet(r#"<c r="A1"><v>2</v></c>"#);
        for item in cells(&doc) {
            let (reference, cell) = item.unwrap();
            reader.read(reference, cell).unwrap();
        }
        assert!(!reader.strings_loaded());
    }

    #[test]
    fn test_bad_index_and_number() {
        let dir = tempfile::tempdir().unwrap();
        let package = package_with_strings(
            dir.path(),
            r#"<sst uniqueCount="1"><si><t>a</t></si></sst>"#,
        );
        let mut reader = CellReader::new(LazySharedStrings::new(&package, "xl/sharedStrings.xml"));
        let doc = sheet(r#"<c r="A1" t="s"><v>5</v></c><c r="B1"><v>1,5</v></c><c><v>1</v></c>"#);
        let items: Vec<_> = cells(&doc).collect();

        let (r, c) = items[0].as_ref().unwrap();
        let err = reader.read(r, c).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(err.to_string().contains("A1"));

        let (r, c) = items[1].as_ref().unwrap();
        assert_eq!(reader.read(r, c).unwrap_err().kind(), ErrorKind::Format);

        assert_eq!(items[2].as_ref().unwrap_err().kind(), ErrorKind::Format);
    }
}
