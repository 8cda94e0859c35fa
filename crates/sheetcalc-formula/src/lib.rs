//! # sheetcalc-formula
//!
//! Formula evaluation engine for sheetcalc.
//!
//! This crate provides:
//! - A stack evaluator for postfix formula token sequences
//! - A per-workbook dependency cache with transitive invalidation
//! - Cross-workbook references through a link table
//! - Circular-reference detection
//! - A pluggable registry of built-in functions
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_core::{Formula, Workbook};
//! use sheetcalc_formula::{FormulaEvaluator, Value};
//!
//! let mut wb = Workbook::new();
//! let sheet = wb.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 2.0).unwrap();
//! sheet
//!     .set_cell_formula("B1", Formula::builder().cell("A1").number(3.0).mul().build().unwrap())
//!     .unwrap();
//!
//! let mut evaluator = FormulaEvaluator::new(wb);
//! let b1 = evaluator.cell("Sheet1", "B1").unwrap();
//! assert_eq!(evaluator.evaluate(b1).unwrap(), Value::Number(6.0));
//! ```

pub mod circular;
pub mod coercion;
pub mod context;
pub mod dependency;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod value;
pub mod workbook_evaluator;

pub use context::EvaluationContext;
pub use dependency::{AreaRef, BookId, CacheEntry, CellKey, EvalKey, EvaluationCache};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::evaluate_formula;
pub use functions::{FunctionContext, FunctionDef, FunctionImpl, FunctionRegistry};
pub use value::Value;
pub use workbook_evaluator::{EvaluatorOptions, FormulaEvaluator};
