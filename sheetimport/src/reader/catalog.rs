//! Sheet directory: sheet names and the members holding them

use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::package::Package;
use super::shared_strings;
use super::xml_tree::XmlDocument;
use crate::error::{ImportError, Result};

const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const WORKSHEETS: &str = "xl/worksheets";

/// How the caller picks a sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    Name(String),
    /// 1-based position in the catalog
    Index(usize),
}

impl SheetSelector {
    /// A purely numeric selector is a position, anything else a name.
    /// A position past the last sheet is retried as a name on selection.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<usize>() {
            Ok(n) => SheetSelector::Index(n),
            Err(_) => SheetSelector::Name(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetEntry {
    /// 0-based logical index
    pub index: usize,
    pub name: String,
    /// Archive member holding the worksheet XML
    pub member: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetCatalog {
    sheets: Vec<SheetEntry>,
    shared_strings: String,
    date1904: bool,
}

struct Relationship {
    target: String,
    kind: String,
}

impl SheetCatalog {
    /// Build from workbook metadata, or by scanning the worksheet
    /// members when the package carries none
    pub fn build(package: &Package) -> Result<Self> {
        let rels = read_relationships(package)?;
        let shared_strings = rels
            .values()
            .find(|r| r.kind.ends_with("/sharedStrings"))
            .map(|r| r.target.clone())
            .unwrap_or_else(|| shared_strings::DEFAULT_MEMBER.to_string());

        let catalog = if package.has_member(WORKBOOK) {
            let doc = package.read_xml(WORKBOOK, "workbook")?;
            Self::from_workbook(&doc, &rels, shared_strings)?
        } else {
            Self::from_worksheet_scan(package, shared_strings)?
        };

        if catalog.sheets.is_empty() {
            return Err(ImportError::archive(format!(
                "{} holds no worksheets",
                package.source().display()
            )));
        }
        info!(sheets = catalog.sheets.len(), "built sheet catalog");
        Ok(catalog)
    }

    fn from_workbook(
        doc: &XmlDocument,
        rels: &HashMap<String, Relationship>,
        shared_strings: String,
    ) -> Result<Self> {
        let date1904 = doc
            .root
            .child("workbookPr")
            .and_then(|p| p.attr("date1904"))
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        let mut found: Vec<(u32, String, String)> = Vec::new();
        if let Some(sheets) = doc.root.child("sheets") {
            for sheet in sheets.children_named("sheet") {
                let name = sheet
                    .attr("name")
                    .ok_or_else(|| ImportError::format("<sheet> without a name attribute"))?;
                let sheet_id = match sheet.attr("sheetId") {
                    Some(raw) => raw.parse::<u32>().map_err(|_| {
                        ImportError::format(format!("invalid sheetId '{}' for '{}'", raw, name))
                    })?,
                    None => found.len() as u32 + 1,
                };

                let member = match sheet.attr("r:id").and_then(|id| rels.get(id)) {
                    Some(rel) if !rel.kind.is_empty() && !rel.kind.ends_with("/worksheet") => {
                        debug!(sheet = name, kind = %rel.kind, "skipping non-worksheet sheet");
                        continue;
                    }
                    Some(rel) => rel.target.clone(),
                    None => format!("{}/sheet{}.xml", WORKSHEETS, sheet_id),
                };
                found.push((sheet_id, name.to_string(), member));
            }
        }
        found.sort_by_key(|(id, _, _)| *id);

        Ok(Self {
            sheets: entries(found.into_iter().map(|(_, name, member)| (name, member))),
            shared_strings,
            date1904,
        })
    }

    fn from_worksheet_scan(package: &Package, shared_strings: String) -> Result<Self> {
        let mut found = Vec::new();
        for member in package.members_in(WORKSHEETS, ".xml") {
            let doc = package.read_xml(member, "worksheet")?;
            if !has_cells(&doc) {
                debug!(member, "skipping empty worksheet");
                continue;
            }
            let stem = Path::new(member)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(member)
                .to_string();
            found.push((stem, member.to_string()));
        }
        found.sort_by(|(a, _), (b, _)| {
            numeric_suffix(a)
                .cmp(&numeric_suffix(b))
                .then_with(|| a.cmp(b))
        });

        Ok(Self {
            sheets: entries(found.into_iter()),
            shared_strings,
            date1904: false,
        })
    }

    pub fn sheets(&self) -> &[SheetEntry] {
        &self.sheets
    }

    pub fn names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Member holding the shared string table
    pub fn shared_strings_member(&self) -> &str {
        &self.shared_strings
    }

    /// Whether serial dates count from 1904-01-01
    pub fn date1904(&self) -> bool {
        self.date1904
    }

    /// Look up a sheet by selector. Without one, the first sheet holding
    /// any cell is chosen.
    pub fn select(
        &self,
        package: &Package,
        selector: Option<&SheetSelector>,
    ) -> Result<&SheetEntry> {
        match selector {
            Some(SheetSelector::Name(name)) => {
                self.sheets.iter().find(|s| &s.name == name).ok_or_else(|| {
                    ImportError::data(format!(
                        "sheet '{}' not found. Available sheets: {}",
                        name,
                        self.names().join(", ")
                    ))
                })
            }
            // A number past the end may still be a sheet name, e.g. "2020"
            Some(SheetSelector::Index(n)) => n
                .checked_sub(1)
                .and_then(|i| self.sheets.get(i))
                .or_else(|| {
                    let name = n.to_string();
                    self.sheets.iter().find(|s| s.name == name)
                })
                .ok_or_else(|| {
                    ImportError::data(format!(
                        "sheet index {} out of range (1..={})",
                        n,
                        self.sheets.len()
                    ))
                }),
            None => {
                for sheet in &self.sheets {
                    let doc = package.read_xml(&sheet.member, "worksheet")?;
                    if has_cells(&doc) {
                        return Ok(sheet);
                    }
                }
                Err(ImportError::data("no sheet holds any data"))
            }
        }
    }
}

fn entries(found: impl Iterator<Item = (String, String)>) -> Vec<SheetEntry> {
    found
        .enumerate()
        .map(|(index, (name, member))| SheetEntry {
            index,
            name,
            member,
        })
        .collect()
}

pub(crate) fn has_cells(doc: &XmlDocument) -> bool {
    doc.root
        .child("sheetData")
        .is_some_and(|data| data.children_named("row").any(|row| row.child("c").is_some()))
}

fn numeric_suffix(stem: &str) -> u64 {
    stem.trim_start_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .unwrap_or(u64::MAX)
}

fn read_relationships(package: &Package) -> Result<HashMap<String, Relationship>> {
    let mut rels = HashMap::new();
    if !package.has_member(WORKBOOK_RELS) {
        return Ok(rels);
    }
    let doc = package.read_xml(WORKBOOK_RELS, "Relationships")?;
    for rel in doc.root.children_named("Relationship") {
        let (Some(id), Some(target)) = (rel.attr("Id"), rel.attr("Target")) else {
            continue;
        };
        if rel.attr("TargetMode") == Some("External") {
            continue;
        }
        rels.insert(
            id.to_string(),
            Relationship {
                target: resolve_target(target),
                kind: rel.attr("Type").unwrap_or_default().to_string(),
            },
        );
    }
    Ok(rels)
}

/// Relationship targets are relative to `xl/` unless absolute
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = vec!["xl"];
    for part in target.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            p => parts.push(p),
        }
    }
    parts.join("/")
}
