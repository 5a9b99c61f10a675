use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Remote service error: {0}")]
    Remote(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Cell encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Invalid range: '{0}'")]
    InvalidRange(String),
    #[error("Unknown table #{0}")]
    UnknownTable(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub id: i64,
    pub store: String,
    pub name: String,
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.store, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Color {
    pub const fn rgb(red: f32, green: f32, blue: f32) -> Self {
        Color { red, green, blue }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrap: Option<bool>,
}

impl CellFormat {
    pub fn header() -> Self {
        CellFormat {
            background: Some(Color::rgb(0.2, 0.4, 0.6)),
            bold: Some(true),
            wrap: None,
        }
    }

    pub fn negative_amount() -> Self {
        CellFormat {
            background: Some(Color::rgb(0.96, 0.8, 0.8)),
            ..Default::default()
        }
    }

    pub fn wrapped() -> Self {
        CellFormat {
            wrap: Some(true),
            ..Default::default()
        }
    }

    /// Fields set on `other` win.
    pub fn merge(&self, other: &CellFormat) -> CellFormat {
        CellFormat {
            background: other.background.or(self.background),
            bold: other.bold.or(self.bold),
            wrap: other.wrap.or(self.wrap),
        }
    }
}

/// 1-based column number to letters: 1 → `A`, 27 → `AA`.
pub fn column_letters(mut col: u32) -> String {
    let mut out = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        out.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn column_number(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        let c = c.to_ascii_uppercase();
        c.is_ascii_uppercase()
            .then(|| acc * 26 + (c as u32 - 'A' as u32 + 1))
    })
}

/// One corner of an A1 range. A missing row means the whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub col: u32,
    pub row: Option<u32>,
}

impl CellRef {
    pub fn new(col: u32, row: u32) -> Self {
        CellRef { col, row: Some(row) }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", column_letters(self.col))?;
        if let Some(row) = self.row {
            write!(f, "{row}")?;
        }
        Ok(())
    }
}

impl FromStr for CellRef {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
        let (letters, digits) = s.split_at(split);
        let col = column_number(letters).ok_or_else(|| StoreError::InvalidRange(s.to_string()))?;
        let row = if digits.is_empty() {
            None
        } else {
            let n: u32 = digits
                .parse()
                .map_err(|_| StoreError::InvalidRange(s.to_string()))?;
            if n == 0 {
                return Err(StoreError::InvalidRange(s.to_string()));
            }
            Some(n)
        };
        Ok(CellRef { col, row })
    }
}

/// Rectangular A1-notation range, e.g. `A1:Z1`, `B7`, `A:B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    pub fn cell(col: u32, row: u32) -> Self {
        let c = CellRef::new(col, row);
        CellRange { start: c, end: c }
    }

    pub fn row_span(row: u32, first_col: u32, last_col: u32) -> Self {
        CellRange {
            start: CellRef::new(first_col, row),
            end: CellRef::new(last_col, row),
        }
    }

    pub fn columns(first_col: u32, last_col: u32) -> Self {
        CellRange {
            start: CellRef { col: first_col, row: None },
            end: CellRef { col: last_col, row: None },
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end && self.start.row.is_some() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl FromStr for CellRange {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((a, b)) => Ok(CellRange {
                start: a.parse()?,
                end: b.parse()?,
            }),
            None => {
                let c: CellRef = s.parse()?;
                Ok(CellRange { start: c, end: c })
            }
        }
    }
}

/// A named spreadsheet-like destination holding named sub-tables of string cells.
/// Rows are addressed 1-based, the way spreadsheet users see them.
#[allow(async_fn_in_trait)]
pub trait TabularStore {
    /// Opens the named store, creating it when absent.
    async fn open_or_create_store(&self, name: &str) -> Result<StoreRef, StoreError>;

    /// Opens a sub-table, creating it with the given capacity when absent.
    async fn open_or_create_table(
        &self,
        store: &StoreRef,
        name: &str,
        rows: u32,
        cols: u32,
    ) -> Result<TableRef, StoreError>;

    /// Number of populated rows, counting up to the last non-empty one.
    async fn row_count(&self, table: &TableRef) -> Result<usize, StoreError>;

    /// Every populated row, header included.
    async fn read_rows(&self, table: &TableRef) -> Result<Vec<Vec<String>>, StoreError>;

    /// Writes `rows` starting at 1-based `start_row`, overwriting whatever is there.
    async fn write_rows(
        &self,
        table: &TableRef,
        start_row: usize,
        rows: &[Vec<String>],
    ) -> Result<(), StoreError>;

    async fn format(
        &self,
        table: &TableRef,
        range: &CellRange,
        format: &CellFormat,
    ) -> Result<(), StoreError>;

    /// Removes every value and format from the table.
    async fn clear(&self, table: &TableRef) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_known_values() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(2), "B");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(52), "AZ");
        assert_eq!(column_letters(703), "AAA");
    }

    #[test]
    fn column_number_inverts_letters() {
        for n in [1, 2, 26, 27, 52, 703] {
            assert_eq!(column_number(&column_letters(n)), Some(n));
        }
        assert_eq!(column_number(""), None);
        assert_eq!(column_number("A1"), None);
    }

    #[test]
    fn range_display() {
        assert_eq!(CellRange::row_span(1, 1, 26).to_string(), "A1:Z1");
        assert_eq!(CellRange::cell(2, 7).to_string(), "B7");
        assert_eq!(CellRange::columns(1, 2).to_string(), "A:B");
    }

    #[test]
    fn range_parse() {
        assert_eq!("A1:Z1".parse::<CellRange>().unwrap(), CellRange::row_span(1, 1, 26));
        assert_eq!("b7".parse::<CellRange>().unwrap(), CellRange::cell(2, 7));
        assert_eq!("A:B".parse::<CellRange>().unwrap(), CellRange::columns(1, 2));
    }

    #[test]
    fn range_parse_rejects_garbage() {
        assert!("".parse::<CellRange>().is_err());
        assert!("1A".parse::<CellRange>().is_err());
        assert!("A0".parse::<CellRange>().is_err());
        assert!("A1:".parse::<CellRange>().is_err());
    }

    #[test]
    fn merge_prefers_newer_fields() {
        let merged = CellFormat::header().merge(&CellFormat::wrapped());
        assert_eq!(merged.bold, Some(true));
        assert_eq!(merged.wrap, Some(true));
        assert_eq!(merged.background, CellFormat::header().background);
    }

    #[test]
    fn format_serializes_sparsely() {
        let json = serde_json::to_string(&CellFormat::wrapped()).unwrap();
        assert_eq!(json, r#"{"wrap":true}"#);
    }
}
