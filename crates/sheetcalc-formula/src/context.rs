//! Evaluation context

use crate::dependency::{BookId, CellKey};

/// Position a formula is evaluated at
///
/// Relative references and implicit intersection are resolved against it.
/// It is an immutable value passed down every call, so nested evaluations
/// of other cells each get their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationContext {
    /// Workbook holding the formula
    pub book: BookId,
    /// Worksheet index within that workbook
    pub sheet: usize,
    /// Row of the formula cell
    pub row: u32,
    /// Column of the formula cell
    pub col: u16,
}

impl EvaluationContext {
    pub fn new(book: BookId, sheet: usize, row: u32, col: u16) -> Self {
        Self {
            book,
            sheet,
            row,
            col,
        }
    }

    /// Context for evaluating the formula stored at `key`
    pub fn for_cell(key: &CellKey) -> Self {
        Self::new(key.book, key.sheet, key.row, key.col)
    }

    pub fn cell_key(&self) -> CellKey {
        CellKey::new(self.book, self.sheet, self.row, self.col)
    }
}
