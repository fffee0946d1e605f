//! sheetimport: xlsx worksheets into statistical datasets
//!
//! Reads one worksheet of an Office Open XML spreadsheet and infers, from
//! the cell layout alone, whether the first row names the variables,
//! whether the first column labels the observations, and whether those
//! labels are serial dates.

pub mod config;
pub mod dataset;
pub mod error;
pub mod import;
pub mod reader;

use std::path::Path;

pub use config::ImportConfig;
pub use dataset::{Dataset, Frequency, MergeMode, Provenance};
pub use error::{ErrorKind, ImportError, Result};
pub use import::scan::ImportFlags;
pub use import::{ImportOptions, ImportOutcome, Importer, Selection};
pub use reader::{SheetEntry, SheetSelector};

/// Import with the default configuration
pub fn import_xlsx<P: AsRef<Path>>(
    path: P,
    options: &ImportOptions,
    target: &mut Dataset,
) -> Result<ImportOutcome> {
    Importer::default().import(path, options, target)
}
