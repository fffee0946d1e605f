//! xlsx package access: archive, XML trees, sheet catalog and shared strings

pub mod catalog;
pub mod cell_ref;
pub mod package;
pub mod shared_strings;
pub mod xml_tree;

pub use catalog::{SheetCatalog, SheetEntry, SheetSelector};
pub use package::Package;
pub use shared_strings::{LazySharedStrings, SharedStrings};
