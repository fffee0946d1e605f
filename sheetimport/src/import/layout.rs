//! Dataset builder: turns the first-pass result into an allocated dataset
//! and maps sheet coordinates onto it

use tracing::info;

use super::scan::{ImportFlags, ScanResult, Window};
use crate::dataset::Dataset;
use crate::error::{ImportError, Result};

/// Where a sheet column lands in the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSlot {
    Labels,
    /// Variable index, 1-based (slot 0 is the constant)
    Var(usize),
}

/// Where a sheet row lands in the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSlot {
    Header,
    /// 0-based observation
    Obs(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub window: Window,
    pub flags: ImportFlags,
    pub nvars: usize,
    pub nobs: usize,
}

impl Layout {
    /// Fix the final flags and the dataset dimensions
    pub fn new(scan: &ScanResult, window: Window) -> Result<Self> {
        let mut flags = scan.flags;
        if flags.contains(ImportFlags::TOP_LEFT_EMPTY) {
            flags.insert(ImportFlags::OBS_LABELS);
        }

        let label_cols = i64::from(flags.contains(ImportFlags::OBS_LABELS));
        let header_rows = i64::from(!flags.contains(ImportFlags::AUTO_VARNAMES));
        let v = i64::from(scan.bbox.maxcol) - i64::from(window.xoffset) - label_cols;
        let n = i64::from(scan.bbox.maxrow) - i64::from(window.yoffset) - header_rows;

        if v <= 0 || n <= 0 {
            return Err(ImportError::data(format!(
                "no usable data: with column offset {} and row offset {} the sheet \
                 (extent {} rows x {} columns) leaves {} variables and {} observations",
                window.xoffset, window.yoffset, scan.bbox.maxrow, scan.bbox.maxcol, v, n
            )));
        }

        Ok(Self {
            window,
            flags,
            nvars: v as usize,
            nobs: n as usize,
        })
    }

    pub fn has_labels(&self) -> bool {
        self.flags.contains(ImportFlags::OBS_LABELS)
    }

    pub fn auto_varnames(&self) -> bool {
        self.flags.contains(ImportFlags::AUTO_VARNAMES)
    }

    /// Allocate the dataset, naming variables `v1..` when the sheet has
    /// no header row
    pub fn allocate(&self) -> Result<Dataset> {
        let mut dataset = Dataset::allocate(self.nvars, self.nobs, self.has_labels())?;
        if self.auto_varnames() {
            dataset.synthesize_names();
        }
        info!(
            nvars = self.nvars,
            nobs = self.nobs,
            labels = self.has_labels(),
            "allocated dataset"
        );
        Ok(dataset)
    }

    /// `None` for columns left of the window
    pub fn column_slot(&self, col: u32) -> Option<ColumnSlot> {
        if col <= self.window.xoffset {
            return None;
        }
        let i = (col - self.window.xoffset - 1) as usize;
        Some(match (self.has_labels(), i) {
            (true, 0) => ColumnSlot::Labels,
            (true, i) => ColumnSlot::Var(i),
            (false, i) => ColumnSlot::Var(i + 1),
        })
    }

    /// `None` for rows above the window
    pub fn row_slot(&self, row: u32) -> Option<RowSlot> {
        if row <= self.window.yoffset {
            return None;
        }
        let t = (row - self.window.yoffset - 1) as usize;
        Some(match (self.auto_varnames(), t) {
            (true, t) => RowSlot::Obs(t),
            (false, 0) => RowSlot::Header,
            (false, t) => RowSlot::Obs(t - 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::reader::cell_ref::BoundingBox;

    fn scan(maxrow: u32, maxcol: u32, flags: ImportFlags) -> ScanResult {
        ScanResult {
            bbox: BoundingBox { maxrow, maxcol },
            flags,
        }
    }

    #[test]
    fn test_dimensions_with_header_and_labels() {
        let layout = Layout::new(&scan(3, 3, ImportFlags::OBS_LABELS), Window::default()).unwrap();
        assert_eq!((layout.nvars, layout.nobs), (2, 2));
        assert_eq!(layout.column_slot(1), Some(ColumnSlot::Labels));
        assert_eq!(layout.column_slot(3), Some(ColumnSlot::Var(2)));
        assert_eq!(layout.row_slot(1), Some(RowSlot::Header));
        assert_eq!(layout.row_slot(3), Some(RowSlot::Obs(1)));
    }

    #[test]
    fn test_empty_corner_forces_labels() {
        let layout =
            Layout::new(&scan(2, 2, ImportFlags::TOP_LEFT_EMPTY), Window::default()).unwrap();
        assert!(layout.has_labels());
        assert_eq!((layout.nvars, layout.nobs), (1, 1));
    }

    #[test]
    fn test_auto_varnames_without_labels() {
        let window = Window { xoffset: 1, yoffset: 2 };
        let layout = Layout::new(&scan(5, 4, ImportFlags::AUTO_VARNAMES), window).unwrap();
        assert_eq!((layout.nvars, layout.nobs), (3, 3));
        assert_eq!(layout.column_slot(1), None);
        assert_eq!(layout.column_slot(2), Some(ColumnSlot::Var(1)));
        assert_eq!(layout.row_slot(2), None);
        assert_eq!(layout.row_slot(3), Some(RowSlot::Obs(0)));

        let dataset = layout.allocate().unwrap();
        assert_eq!(dataset.varnames(), &["v1", "v2", "v3"]);
        assert!(!dataset.has_labels());
    }

    #[test]
    fn test_no_rectangle_is_data_error() {
        let err = Layout::new(&scan(1, 3, ImportFlags::empty()), Window::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        let err = Layout::new(
            &scan(4, 2, ImportFlags::OBS_LABELS),
            Window { xoffset: 1, yoffset: 0 },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(Layout::new(&scan(0, 0, ImportFlags::TOP_LEFT_EMPTY), Window::default()).is_err());
    }
}
