//! # sheetcalc
//!
//! An incremental spreadsheet formula engine.
//!
//! Sheetcalc evaluates formulas stored as postfix token sequences, caches
//! each result together with what it read, and invalidates exactly the
//! dependents of a cell when it changes. Formulas may reference other
//! workbooks registered through a link table.
//!
//! ## Features
//!
//! - Stack evaluation of postfix formula tokens
//! - Per-workbook dependency caches with transitive invalidation
//! - Cross-workbook references
//! - Circular-reference detection
//! - Defined names and a pluggable function registry
//! - Whole-workbook recalculation with statistics
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 21.0).unwrap();
//!
//! let mut evaluator = FormulaEvaluator::new(workbook);
//! let a1 = evaluator.cell("Sheet1", "A1").unwrap();
//! let b1 = evaluator.cell("Sheet1", "B1").unwrap();
//!
//! // =A1*2
//! let doubled = Formula::builder().cell("A1").number(2.0).mul().build().unwrap();
//! evaluator.set_cell_formula(b1, doubled).unwrap();
//! assert_eq!(evaluator.evaluate(b1).unwrap(), Value::Number(42.0));
//!
//! evaluator.set_cell_value(a1, 5.0).unwrap();
//! assert_eq!(evaluator.evaluate(b1).unwrap(), Value::Number(10.0));
//! ```

pub mod calculation;
pub mod prelude;

// Re-export calculation types
pub use calculation::{
    calculated_value, CalculationOptions, CalculationStats, WorkbookCalculationExt,
};

// Re-export core types
pub use sheetcalc_core::{
    BinaryOperator,
    CellAddress,
    CellRange,
    CellType,
    // Cell types
    CellValue,
    // Error types
    Error,
    ErrorCode,
    // Formula tokens
    Formula,
    FormulaBuilder,
    NameScope,
    NamedRange,
    Result,
    SheetRef,
    Token,
    UnaryOperator,
    // Workbook types
    Workbook,
    Worksheet,
};

// Re-export engine types
pub use sheetcalc_formula::{
    BookId, CellKey, EvaluationCache, EvaluatorOptions, FormulaError, FormulaEvaluator,
    FormulaResult, FunctionContext, FunctionDef, FunctionRegistry, Value,
};
