//! A1-style cell addresses and rectangular regions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PanchangamError;

/// Largest column Excel accepts (`XFD`)
const MAX_COLUMN: u32 = 16_384;
/// Largest row Excel accepts
const MAX_ROW: u32 = 1_048_576;

/// A single cell address such as `O4`; column and row are 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRef {
    // Row first so the derived ordering is document order
    row: u32,
    column: u32,
}

impl CellRef {
    pub fn new(column: u32, row: u32) -> crate::Result<Self> {
        if column == 0 || column > MAX_COLUMN {
            return Err(PanchangamError::validation(format!(
                "column {column} is outside 1..={MAX_COLUMN}"
            )));
        }
        if row == 0 || row > MAX_ROW {
            return Err(PanchangamError::validation(format!(
                "row {row} is outside 1..={MAX_ROW}"
            )));
        }
        Ok(Self { row, column })
    }

    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }

    #[must_use]
    pub fn row(&self) -> u32 {
        self.row
    }

    /// Column letters for a 1-based column index (`1` → `A`, `27` → `AA`)
    #[must_use]
    pub fn column_name(column: u32) -> String {
        let mut letters = Vec::new();
        let mut n = column;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(b'A' + rem as u8);
            n = (n - 1) / 26;
        }
        letters.reverse();
        String::from_utf8(letters).unwrap_or_default()
    }

    /// Parse the column part of a reference, ignoring any row digits
    #[must_use]
    pub fn parse_column(reference: &str) -> Option<u32> {
        let letters: String = reference
            .chars()
            .take_while(char::is_ascii_alphabetic)
            .collect();
        if letters.is_empty() || letters.len() > 3 {
            return None;
        }
        let column = letters
            .bytes()
            .fold(0u32, |acc, b| acc * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1));
        (column <= MAX_COLUMN).then_some(column)
    }
}

impl FromStr for CellRef {
    type Err = PanchangamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('$');
        let invalid = || PanchangamError::validation(format!("Invalid cell reference '{s}'"));

        let split = trimmed
            .find(|c: char| !c.is_ascii_alphabetic())
            .ok_or_else(invalid)?;
        let (letters, digits) = trimmed.split_at(split);
        let digits = digits.trim_start_matches('$');
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let column = Self::parse_column(letters).ok_or_else(invalid)?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        Self::new(column, row)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_name(self.column), self.row)
    }
}

impl TryFrom<String> for CellRef {
    type Error = PanchangamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CellRef> for String {
    fn from(value: CellRef) -> Self {
        value.to_string()
    }
}

/// An inclusive rectangle of cells such as `B1:L32`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRange {
    start: CellRef,
    end: CellRef,
}

impl CellRange {
    /// Build a range from any two corners
    #[must_use]
    pub fn new(a: CellRef, b: CellRef) -> Self {
        let start = CellRef {
            row: a.row.min(b.row),
            column: a.column.min(b.column),
        };
        let end = CellRef {
            row: a.row.max(b.row),
            column: a.column.max(b.column),
        };
        Self { start, end }
    }

    #[must_use]
    pub fn start(&self) -> CellRef {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> CellRef {
        self.end
    }

    #[must_use]
    pub fn contains(&self, cell: CellRef) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.column..=self.end.column).contains(&cell.column)
    }

    /// Smallest range covering both this range and `cell`
    #[must_use]
    pub fn expanded_to(&self, cell: CellRef) -> Self {
        Self {
            start: CellRef {
                row: self.start.row.min(cell.row),
                column: self.start.column.min(cell.column),
            },
            end: CellRef {
                row: self.end.row.max(cell.row),
                column: self.end.column.max(cell.column),
            },
        }
    }
}

impl FromStr for CellRange {
    type Err = PanchangamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((a, b)) => Ok(Self::new(a.parse()?, b.parse()?)),
            None => {
                let cell: CellRef = s.parse()?;
                Ok(Self::new(cell, cell))
            }
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl TryFrom<String> for CellRange {
    type Error = PanchangamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CellRange> for String {
    fn from(value: CellRange) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A1", 1, 1)]
    #[case("O4", 15, 4)]
    #[case("L32", 12, 32)]
    #[case("AA10", 27, 10)]
    #[case("$B$7", 2, 7)]
    #[case("xfd1048576", 16_384, 1_048_576)]
    fn test_parse_cell_ref(#[case] input: &str, #[case] column: u32, #[case] row: u32) {
        let cell: CellRef = input.parse().unwrap();
        assert_eq!(cell.column(), column);
        assert_eq!(cell.row(), row);
    }

    #[rstest]
    #[case("")]
    #[case("4")]
    #[case("O")]
    #[case("O0")]
    #[case("A1B")]
    #[case("XFE1")]
    #[case("A1048577")]
    fn test_invalid_cell_ref(#[case] input: &str) {
        assert!(input.parse::<CellRef>().is_err());
    }

    #[test]
    fn test_column_names_round_trip() {
        for column in [1, 2, 15, 26, 27, 52, 53, 702, 703, 16_384] {
            let name = CellRef::column_name(column);
            assert_eq!(CellRef::parse_column(&name), Some(column), "column {name}");
        }
        assert_eq!(CellRef::column_name(26), "Z");
        assert_eq!(CellRef::column_name(28), "AB");
    }

    #[test]
    fn test_cells_order_by_row_then_column() {
        let mut cells: Vec<CellRef> = ["O6", "B5", "O4", "A6"]
            .iter()
            .map(|c| c.parse().unwrap())
            .collect();
        cells.sort();
        let names: Vec<String> = cells.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["O4", "B5", "A6", "O6"]);
    }

    #[test]
    fn test_range_normalizes_corners() {
        let range: CellRange = "L32:B1".parse().unwrap();
        assert_eq!(range.to_string(), "B1:L32");
        assert!(range.contains("C10".parse().unwrap()));
        assert!(!range.contains("O4".parse().unwrap()));
    }

    #[test]
    fn test_range_expansion() {
        let range: CellRange = "B1:L32".parse().unwrap();
        let expanded = range.expanded_to("O6".parse().unwrap());
        assert_eq!(expanded.to_string(), "B1:O32");
        let single: CellRange = "A1".parse().unwrap();
        assert_eq!(single.to_string(), "A1");
    }
}
