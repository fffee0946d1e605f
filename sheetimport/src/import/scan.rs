//! First pass: bounding box and header classification

use bitflags::bitflags;
use tracing::{debug, info};

use super::cells::{self, CellReader, CellValue};
use crate::config::ImportConfig;
use crate::error::Result;
use crate::reader::cell_ref::{self, BoundingBox};
use crate::reader::xml_tree::XmlDocument;

bitflags! {
    /// Shape of the top-left corner of the reading window
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ImportFlags: u8 {
        /// Corner cell holds neither a number nor a non-blank string
        const TOP_LEFT_EMPTY = 0x01;
        /// First row is data; names are synthesized
        const AUTO_VARNAMES = 0x02;
        /// First column holds observation labels
        const OBS_LABELS = 0x04;
    }
}

/// 0-based origin of the reading window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub xoffset: u32,
    pub yoffset: u32,
}

impl Window {
    pub fn corner(&self) -> (u32, u32) {
        (self.yoffset.saturating_add(1), self.xoffset.saturating_add(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanResult {
    pub bbox: BoundingBox,
    pub flags: ImportFlags,
}

/// Walk every cell once, growing the bounding box over occupied cells
/// and classifying the window corner and its right-hand neighbour.
pub fn scan(
    doc: &XmlDocument,
    reader: &mut CellReader,
    window: Window,
    config: &ImportConfig,
) -> Result<ScanResult> {
    let mut bbox = BoundingBox::default();
    let mut flags = ImportFlags::TOP_LEFT_EMPTY;
    let (top, left) = window.corner();
    let mut corner_is_label = false;
    let mut second_is_number = false;

    for item in cells::cells(doc) {
        let (reference, cell) = item?;
        let (row, col) = cell_ref::decode(reference)?;
        let Some(value) = reader.read(reference, cell)? else {
            continue;
        };
        bbox.extend(row, col);

        if row != top {
            continue;
        }
        if col == left {
            match &value {
                CellValue::Number(_) => {
                    flags.insert(ImportFlags::AUTO_VARNAMES);
                    flags.remove(ImportFlags::TOP_LEFT_EMPTY);
                }
                CellValue::Text(text) => {
                    if config.is_label_header(text) {
                        flags.insert(ImportFlags::OBS_LABELS);
                    } else {
                        corner_is_label = true;
                    }
                    if !text.trim().is_empty() {
                        flags.remove(ImportFlags::TOP_LEFT_EMPTY);
                    }
                }
                CellValue::Formula(_) => {}
            }
        } else if left.checked_add(1) == Some(col) && matches!(value, CellValue::Number(_)) {
            flags.insert(ImportFlags::AUTO_VARNAMES);
            second_is_number = true;
        }
    }

    // A text corner beside a numeric first row is a label, not a name
    if corner_is_label && second_is_number {
        flags.insert(ImportFlags::OBS_LABELS);
    }

    debug!(?flags, "classified window corner");
    info!(
        maxrow = bbox.maxrow,
        maxcol = bbox.maxcol,
        last = %cell_ref::encode(bbox.maxrow.max(1), bbox.maxcol.max(1)),
        "found bounding box"
    );
    Ok(ScanResult { bbox, flags })
}
