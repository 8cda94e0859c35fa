//! # sheetcalc-core
//!
//! The document layer consumed by the sheetcalc evaluation engine.
//!
//! This crate provides:
//! - [`CellValue`] - what a cell stores (literal or formula plus cached result)
//! - [`CellAddress`] and [`CellRange`] - cell addressing
//! - [`Formula`] and [`Token`] - immutable postfix token sequences
//! - [`Workbook`], [`Worksheet`] - sparse in-memory cell storage
//! - [`NamedRange`] - defined names whose definitions are token sequences
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_core::{CellValue, Formula, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_cell_value("A1", 10.0).unwrap();
//! sheet.set_cell_value_at(1, 0, CellValue::string("ten")).unwrap();
//!
//! // =A1*2, written in evaluation (postfix) order
//! let formula = Formula::builder().cell("A1").number(2.0).mul().build().unwrap();
//! sheet.set_cell_formula("B1", formula).unwrap();
//! assert_eq!(sheet.formula("B1").unwrap().unwrap().to_formula_string(), "A1*2");
//! ```

pub mod cell;
pub mod error;
pub mod formula;
pub mod named_range;
pub mod workbook;
pub mod worksheet;

pub use cell::{CellAddress, CellRange, CellType, CellValue, ErrorCode, SharedString};
pub use error::{Error, Result};
pub use formula::{
    BinaryOperator, Formula, FormulaBuilder, SheetRef, Token, UnaryOperator,
};
pub use named_range::{NameScope, NamedRange, NamedRangeCollection};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
