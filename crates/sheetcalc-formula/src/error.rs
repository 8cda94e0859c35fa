//! Formula error types
//!
//! These are faults: the token sequence, the document or the caller broke
//! a contract. Spreadsheet errors such as `#DIV/0!` are ordinary
//! [`Value::Error`](crate::Value::Error) results and never show up here.

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Faults raised while evaluating
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Token sequence that does not reduce to exactly one value
    #[error("Malformed formula: {0}")]
    MalformedFormula(String),

    /// Sheet name that does not exist in the referenced workbook
    #[error("Sheet '{sheet}' not found in workbook '{book}'")]
    SheetNotFound { book: String, sheet: String },

    /// Reference to a sheet index or workbook id that is not registered
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Workbook name registered twice
    #[error("Workbook '{0}' is already linked")]
    DuplicateLink(String),

    /// Workbook name that is not in the link table
    #[error("Workbook '{0}' is not linked")]
    UnknownWorkbook(String),

    /// Invalid argument supplied by a function implementation's caller
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Document-layer failure
    #[error(transparent)]
    Core(#[from] sheetcalc_core::Error),
}
