//! Two-pass worksheet import and the finalizer that merges the result
//! into a caller's dataset

pub mod cells;
pub mod dates;
pub mod fill;
pub mod formula;
pub mod layout;
pub mod scan;

use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use self::cells::CellReader;
use self::dates::DateSystem;
use self::layout::Layout;
use self::scan::{ImportFlags, Window};
use crate::config::ImportConfig;
use crate::dataset::{Dataset, Frequency, MergeMode, Provenance};
use crate::error::{ImportError, Result};
use crate::reader::catalog::{SheetCatalog, SheetEntry, SheetSelector};
use crate::reader::package::Package;
use crate::reader::shared_strings::LazySharedStrings;

pub const FORMAT_TAG: &str = "xlsx";

/// Per-invocation choices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// `None` picks the first sheet holding data
    pub sheet: Option<SheetSelector>,
    /// Columns to skip on the left
    pub xoffset: u32,
    /// Rows to skip on top
    pub yoffset: u32,
    pub merge: MergeMode,
}

/// The resolved sheet and window, for the caller to reuse
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub sheet: String,
    /// 1-based position in the catalog
    pub sheet_index: usize,
    pub xoffset: u32,
    pub yoffset: u32,
}

impl Selection {
    /// Options that repeat this selection
    pub fn to_options(&self, merge: MergeMode) -> ImportOptions {
        ImportOptions {
            sheet: Some(SheetSelector::Name(self.sheet.clone())),
            xoffset: self.xoffset,
            yoffset: self.yoffset,
            merge,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub selection: Selection,
    pub flags: ImportFlags,
    pub frequency: Option<Frequency>,
    /// Variables dropped because they held no value
    pub pruned: Vec<String>,
}

/// Spreadsheet importer
#[derive(Debug, Clone, Default)]
pub struct Importer {
    config: ImportConfig,
}

impl Importer {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Sheets of a workbook in catalog order
    pub fn list_sheets<P: AsRef<Path>>(&self, path: P) -> Result<Vec<SheetEntry>> {
        let package = Package::open(path)?;
        let catalog = SheetCatalog::build(&package)?;
        Ok(catalog.sheets().to_vec())
    }

    /// Import one worksheet into a fresh dataset.
    ///
    /// The scratch extraction is gone by the time this returns, whether
    /// or not the import succeeded.
    pub fn read<P: AsRef<Path>>(
        &self,
        path: P,
        options: &ImportOptions,
    ) -> Result<(Dataset, ImportOutcome)> {
        let package = Package::open(path)?;
        let catalog = SheetCatalog::build(&package)?;
        let entry = catalog.select(&package, options.sheet.as_ref())?;
        info!(sheet = %entry.name, member = %entry.member, "reading worksheet");

        let doc = package.read_xml(&entry.member, "worksheet")?;
        let mut reader = CellReader::new(LazySharedStrings::new(
            &package,
            catalog.shared_strings_member(),
        ));
        let window = Window {
            xoffset: options.xoffset,
            yoffset: options.yoffset,
        };

        let scanned = scan::scan(&doc, &mut reader, window, &self.config)
            .map_err(|e| in_sheet(&entry.name, e))?;
        let layout = Layout::new(&scanned, window).map_err(|e| in_sheet(&entry.name, e))?;
        let mut dataset = layout.allocate()?;
        let filled = fill::fill(&doc, &mut reader, &layout, &self.config, &mut dataset)
            .map_err(|e| in_sheet(&entry.name, e))?;

        let frequency = if self.config.detect_dates && layout.has_labels() && filled.numeric_labels
        {
            dates::apply(&mut dataset, DateSystem::from_date1904(catalog.date1904()))?
        } else {
            None
        };

        let pruned = dataset.prune_empty();
        if !pruned.is_empty() {
            warn!(dropped = ?pruned, "dropped variables without any value");
        }
        if dataset.nvars() == 0 {
            return Err(ImportError::data(format!(
                "sheet '{}': no variable holds any value",
                entry.name
            )));
        }
        dataset
            .validate_names()
            .map_err(|e| in_sheet(&entry.name, e))?;

        dataset.set_provenance(Provenance {
            source: package.source().to_path_buf(),
            format: FORMAT_TAG.to_string(),
            sheet: entry.name.clone(),
        });

        let outcome = ImportOutcome {
            selection: Selection {
                sheet: entry.name.clone(),
                sheet_index: entry.index + 1,
                xoffset: options.xoffset,
                yoffset: options.yoffset,
            },
            flags: layout.flags,
            frequency,
            pruned,
        };
        info!(
            nvars = dataset.nvars(),
            nobs = dataset.nobs(),
            "imported worksheet"
        );
        Ok((dataset, outcome))
    }

    /// Import one worksheet and merge it into `target` per
    /// `options.merge`. On failure `target` is left as it was.
    pub fn import<P: AsRef<Path>>(
        &self,
        path: P,
        options: &ImportOptions,
        target: &mut Dataset,
    ) -> Result<ImportOutcome> {
        let (dataset, outcome) = self.read(path, options)?;
        let provenance = dataset.provenance().cloned();
        target.merge(dataset, options.merge)?;
        if let Some(provenance) = provenance {
            target.set_provenance(provenance);
        }
        Ok(outcome)
    }
}

fn in_sheet(sheet: &str, err: ImportError) -> ImportError {
    match err {
        ImportError::Data(msg) => ImportError::Data(format!("sheet '{}': {}", sheet, msg)),
        ImportError::Format(msg) => ImportError::Format(format!("sheet '{}': {}", sheet, msg)),
        other => other,
    }
}
