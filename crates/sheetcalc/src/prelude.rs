//! Prelude module - common imports for sheetcalc users
//!
//! ```rust
//! use sheetcalc::prelude::*;
//! ```

pub use crate::{
    // Calculation types
    CalculationOptions,
    CalculationStats,
    CellAddress,
    CellRange,
    // Cell types
    CellValue,
    ErrorCode,
    // Engine types
    EvaluatorOptions,
    // Formula tokens
    Formula,
    FormulaError,
    FormulaEvaluator,
    Value,
    // Workbook types
    Workbook,
    WorkbookCalculationExt,
    Worksheet,
};
