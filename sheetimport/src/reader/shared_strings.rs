//! Shared string table (`xl/sharedStrings.xml`)

use tracing::info;

use super::package::Package;
use super::xml_tree::{Element, XmlDocument};
use crate::error::{ImportError, Result};

pub const DEFAULT_MEMBER: &str = "xl/sharedStrings.xml";

/// Index-addressable pool of strings referenced from `t="s"` cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedStrings {
    strings: Vec<String>,
}

impl SharedStrings {
    /// Build the table from a parsed `<sst>` document.
    ///
    /// The declared `uniqueCount` (or `count`) is a lower bound on the
    /// number of entries; a table holding fewer is rejected.
    pub fn from_document(doc: &XmlDocument) -> Result<Self> {
        let declared = match doc.root.attr("uniqueCount").or_else(|| doc.root.attr("count")) {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| {
                ImportError::format(format!("invalid shared string count '{}'", raw))
            })?),
            None => None,
        };

        let mut strings = Vec::new();
        let hint = declared.unwrap_or_else(|| doc.root.children.len());
        strings.try_reserve(hint)?;

        for si in doc.root.children_named("si") {
            strings.push(item_text(si));
        }

        if let Some(expected) = declared
            && strings.len() < expected
        {
            return Err(ImportError::archive(format!(
                "shared string table declares {} entries but holds {}",
                expected,
                strings.len()
            )));
        }

        Ok(Self { strings })
    }

    pub fn load(package: &Package, member: &str) -> Result<Self> {
        let doc = package.read_xml(member, "sst")?;
        let table = Self::from_document(&doc)?;
        info!(strings = table.len(), member, "loaded shared strings");
        Ok(table)
    }

    pub fn get(&self, index: usize) -> Result<&str> {
        self.strings.get(index).map(String::as_str).ok_or_else(|| {
            ImportError::data(format!(
                "shared string index {} out of range (table holds {})",
                index,
                self.strings.len()
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Plain `<t>` or concatenated rich-text runs; phonetic runs are skipped
pub(crate) fn item_text(si: &Element) -> String {
    if let Some(t) = si.child("t") {
        return t.text.clone();
    }
    si.children_named("r")
        .filter_map(|run| run.child("t"))
        .map(|t| t.text.as_str())
        .collect()
}

/// Loads the table on first use and keeps it for the rest of the import
#[derive(Debug)]
pub struct LazySharedStrings<'p> {
    package: &'p Package,
    member: String,
    table: Option<SharedStrings>,
}

impl<'p> LazySharedStrings<'p> {
    pub fn new(package: &'p Package, member: impl Into<String>) -> Self {
        Self {
            package,
            member: member.into(),
            table: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.table.is_some()
    }

    pub fn get(&mut self, index: usize) -> Result<&str> {
        let table = match &mut self.table {
            Some(table) => table,
            slot @ None => slot.insert(SharedStrings::load(self.package, &self.member)?),
        };
        table.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::reader::xml_tree::parse;

    fn table(xml: &str) -> Result<SharedStrings> {
        SharedStrings::from_document(&parse(xml.as_bytes(), "sst")?)
    }

    #[test]
    fn test_plain_and_rich_text_items() {
        let sst = table(
            r#"<sst count="5" uniqueCount="3">
<si><t>gdp</t></si>
<si><r><t>c</t></r><r><rPr/><t>pi</t></r><rPh><t>x</t></rPh></si>
<si><t/></si>
</sst>"#,
        )
        .unwrap();
        assert_eq!(sst.len(), 3);
        assert_eq!(sst.get(0).unwrap(), "gdp");
        assert_eq!(sst.get(1).unwrap(), "cpi");
        assert_eq!(sst.get(2).unwrap(), "");
    }

    #[test]
    fn test_out_of_range_index_is_data_error() {
        let sst = table(r#"<sst uniqueCount="1"><si><t>a</t></si></sst>"#).unwrap();
        let err = sst.get(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_short_table_is_rejected() {
        let err = table(r#"<sst count="2"><si><t>a</t></si></sst>"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Archive);
        assert!(table(r#"<sst count="x"/>"#).is_err());
    }

    #[test]
    fn test_missing_count_accepts_what_is_there() {
        let sst = table(r#"<sst><si><t>a</t></si><si><t>b</t></si></sst>"#).unwrap();
        assert_eq!(sst.len(), 2);
    }
}
