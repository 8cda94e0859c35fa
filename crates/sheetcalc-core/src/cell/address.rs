//! A1-style cell addresses and rectangular ranges

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell position, 0-based, with the `$` markers it was written with
///
/// The absolute flags only matter when a reference is rendered back to
/// text; evaluation always works with the stored coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0 ... XFD=16383)
    pub col: u16,
    /// Row written as `$n`
    pub row_absolute: bool,
    /// Column written as `$A`
    pub col_absolute: bool,
}

impl CellAddress {
    /// Relative address (`A1` style)
    pub fn new(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, false, false)
    }

    /// Fully absolute address (`$A$1` style)
    pub fn absolute(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, true, true)
    }

    pub fn with_absolute(row: u32, col: u16, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Parse an A1-style address such as `B7`, `$B$7` or `b$7`
    ///
    /// ```
    /// use sheetcalc_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$C$10").unwrap();
    /// assert_eq!((addr.row, addr.col), (9, 2));
    /// assert!(addr.row_absolute && addr.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let text = s.trim();
        let (col_absolute, rest) = match text.strip_prefix('$') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let split = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let (letters, rest) = rest.split_at(split);
        if letters.is_empty() {
            return Err(Error::InvalidAddress(format!("no column letters in '{}'", s)));
        }

        let (row_absolute, digits) = match rest.strip_prefix('$') {
            Some(digits) => (true, digits),
            None => (false, rest),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!("invalid row number in '{}'", s)));
        }

        let row_number: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;
        if row_number == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }
        if row_number > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row_number - 1, MAX_ROWS - 1));
        }

        let col = Self::letters_to_column(letters)?;
        Ok(Self::with_absolute(row_number - 1, col, row_absolute, col_absolute))
    }

    /// Column index to letters (0 = A, 25 = Z, 26 = AA)
    pub fn column_to_letters(col: u16) -> String {
        let mut letters = Vec::with_capacity(3);
        let mut n = u32::from(col) + 1;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(b'A' + rem as u8);
            n = (n - 1) / 26;
        }
        letters.reverse();
        String::from_utf8(letters).unwrap_or_default()
    }

    /// Column letters to index (A = 0, case-insensitive)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut value: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            value = value * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if value > u32::from(MAX_COLS) {
                return Err(Error::ColumnOutOfBounds(
                    value.min(u32::from(u16::MAX)) as u16,
                    MAX_COLS - 1,
                ));
            }
        }
        Ok((value - 1) as u16)
    }

    /// Format as A1-style text, including `$` markers
    pub fn to_a1_string(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.col_absolute { "$" } else { "" },
            Self::column_to_letters(self.col),
            if self.row_absolute { "$" } else { "" },
            self.row + 1
        )
    }

    /// Same position with all `$` markers dropped
    pub fn position(&self) -> Self {
        Self::new(self.row, self.col)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular block of cells, normalized so `start` is top-left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    /// Build a range from two corners in any order
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        let (top, bottom) = if a.row <= b.row { (a, b) } else { (b, a) };
        let (left, right) = if a.col <= b.col { (a, b) } else { (b, a) };
        Self {
            start: CellAddress::with_absolute(
                top.row,
                left.col,
                top.row_absolute,
                left.col_absolute,
            ),
            end: CellAddress::with_absolute(
                bottom.row,
                right.col,
                bottom.row_absolute,
                right.col_absolute,
            ),
        }
    }

    pub fn from_indices(first_row: u32, first_col: u16, last_row: u32, last_col: u16) -> Self {
        Self::new(
            CellAddress::new(first_row, first_col),
            CellAddress::new(last_row, last_col),
        )
    }

    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse `A1:B10` (or a lone `A1`)
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().split_once(':') {
            Some((first, last)) => Ok(Self::new(
                CellAddress::parse(first).map_err(|e| Error::InvalidRange(e.to_string()))?,
                CellAddress::parse(last).map_err(|e| Error::InvalidRange(e.to_string()))?,
            )),
            None => CellAddress::parse(s).map(Self::single),
        }
    }

    pub fn first_row(&self) -> u32 {
        self.start.row
    }

    pub fn last_row(&self) -> u32 {
        self.end.row
    }

    pub fn first_col(&self) -> u16 {
        self.start.col
    }

    pub fn last_col(&self) -> u16 {
        self.end.col
    }

    pub fn contains(&self, row: u32, col: u16) -> bool {
        self.contains_row(row) && self.contains_col(col)
    }

    pub fn contains_row(&self, row: u32) -> bool {
        (self.start.row..=self.end.row).contains(&row)
    }

    pub fn contains_col(&self, col: u16) -> bool {
        (self.start.col..=self.end.col).contains(&col)
    }

    /// One row tall
    pub fn is_row(&self) -> bool {
        self.start.row == self.end.row
    }

    /// One column wide
    pub fn is_column(&self) -> bool {
        self.start.col == self.end.col
    }

    pub fn is_single_cell(&self) -> bool {
        self.is_row() && self.is_column()
    }

    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    pub fn cell_count(&self) -> u64 {
        u64::from(self.row_count()) * u64::from(self.col_count())
    }

    /// Cell positions in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (u32, u16)> + '_ {
        let (first_col, last_col) = (self.start.col, self.end.col);
        (self.start.row..=self.end.row)
            .flat_map(move |row| (first_col..=last_col).map(move |col| (row, col)))
    }

    pub fn to_a1_string(&self) -> String {
        if self.start == self.end {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start, self.end)
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
