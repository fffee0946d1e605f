//! Cell reference codec ("AB65" <-> 1-based row/column)

use crate::error::{ImportError, Result};

/// Highest column addressable in a worksheet (XFD)
pub const MAX_COL: u32 = 16_384;

/// Parse a cell reference like "AB65" into 1-based (row, col)
///
/// Column letters are a bijective base-26 numeral (A=1 .. Z=26, AA=27).
/// The reference must be one or more letters followed by one or more digits.
pub fn decode(cell_ref: &str) -> Result<(u32, u32)> {
    let split = cell_ref
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| ImportError::format(format!("cell reference '{cell_ref}' has no row")))?;
    let (letters, digits) = cell_ref.split_at(split);

    if letters.is_empty() {
        return Err(ImportError::format(format!(
            "cell reference '{cell_ref}' has no column"
        )));
    }

    let mut col = 0u32;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(ImportError::format(format!(
                "invalid column letter '{ch}' in cell reference '{cell_ref}'"
            )));
        }
        let value = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(value))
            .filter(|&c| c <= MAX_COL)
            .ok_or_else(|| ImportError::format(format!("column out of range in '{cell_ref}'")))?;
    }

    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ImportError::format(format!(
            "invalid row in cell reference '{cell_ref}'"
        )));
    }
    let row = digits
        .parse::<u32>()
        .map_err(|_| ImportError::format(format!("row out of range in '{cell_ref}'")))?;
    if row == 0 {
        return Err(ImportError::format(format!(
            "row 0 in cell reference '{cell_ref}'"
        )));
    }

    Ok((row, col))
}

/// Column number to letters (1 -> "A", 27 -> "AA")
pub fn column_letters(col: u32) -> String {
    let mut c = col;
    let mut letters = String::new();
    while c > 0 {
        let m = (c - 1) % 26;
        letters.insert(0, (b'A' + m as u8) as char);
        c = (c - m) / 26;
    }
    letters
}

/// 1-based (row, col) back to a reference string
pub fn encode(row: u32, col: u32) -> String {
    format!("{}{}", column_letters(col), row)
}

/// Running maxima of the occupied cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundingBox {
    pub maxrow: u32,
    pub maxcol: u32,
}

impl BoundingBox {
    pub fn extend(&mut self, row: u32, col: u32) {
        self.maxrow = self.maxrow.max(row);
        self.maxcol = self.maxcol.max(col);
    }
}
