//! Workbook calculation
//!
//! Whole-workbook recalculation on top of [`FormulaEvaluator`], with
//! statistics about what the pass found.
//!
//! # Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 10.0).unwrap();
//! sheet.set_cell_value("A2", 20.0).unwrap();
//! sheet
//!     .set_cell_formula("A3", Formula::builder().cell("A1").cell("A2").add().build().unwrap())
//!     .unwrap();
//!
//! let stats = workbook.calculate().unwrap();
//! assert_eq!(stats.cells_calculated, 1);
//! ```

use crate::{
    CellValue, ErrorCode, EvaluatorOptions, FormulaEvaluator, FormulaResult, Value, Workbook,
};

/// Options for workbook calculation
#[derive(Debug, Clone)]
pub struct CalculationOptions {
    /// Discard results stored by earlier passes before calculating
    pub force_full_calculation: bool,
    /// Settings for the underlying evaluator
    pub evaluator: EvaluatorOptions,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            force_full_calculation: true,
            evaluator: EvaluatorOptions::default(),
        }
    }
}

/// Statistics from a calculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Total number of formula cells
    pub formula_count: usize,
    /// Number of cells calculated
    pub cells_calculated: usize,
    /// Number of cells whose result is an error value, circular ones excluded
    pub errors: usize,
    /// Number of cells caught in a circular reference
    pub circular_references: usize,
    /// Number of cells that could not be evaluated at all
    pub faults: usize,
}

/// Extension trait for Workbook to add calculation methods
pub trait WorkbookCalculationExt {
    /// Calculate all formulas in the workbook with default options
    fn calculate(&mut self) -> FormulaResult<CalculationStats>;

    /// Calculate all formulas with custom options
    fn calculate_with_options(
        &mut self,
        options: &CalculationOptions,
    ) -> FormulaResult<CalculationStats>;
}

impl WorkbookCalculationExt for Workbook {
    fn calculate(&mut self) -> FormulaResult<CalculationStats> {
        self.calculate_with_options(&CalculationOptions::default())
    }

    fn calculate_with_options(
        &mut self,
        options: &CalculationOptions,
    ) -> FormulaResult<CalculationStats> {
        if options.force_full_calculation {
            for sheet in self.worksheets_mut() {
                sheet.clear_formula_results();
            }
        }

        let workbook = std::mem::take(self);
        let mut evaluator = FormulaEvaluator::new(workbook).with_options(options.evaluator.clone());
        let stats = calculate_all(&mut evaluator);
        *self = evaluator.into_workbook()?;
        stats
    }
}

/// Evaluate every formula cell of the primary workbook, counting outcomes
///
/// Faults are logged and counted rather than aborting the pass.
fn calculate_all(evaluator: &mut FormulaEvaluator) -> FormulaResult<CalculationStats> {
    let cells = evaluator.formula_cells(evaluator.primary())?;
    let mut stats = CalculationStats {
        formula_count: cells.len(),
        ..CalculationStats::default()
    };

    for cell in cells {
        match evaluator.evaluate_formula_cell(cell) {
            Ok(Some(_)) => {
                stats.cells_calculated += 1;
                match evaluator.cached_value(cell) {
                    Some(Value::Error(ErrorCode::CircularRef)) => stats.circular_references += 1,
                    Some(Value::Error(_)) => stats.errors += 1,
                    _ => {}
                }
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("failed to evaluate {}: {}", cell, e);
                stats.faults += 1;
            }
        }
    }

    log::debug!(
        "calculated {} of {} formula cells ({} errors, {} circular, {} faults)",
        stats.cells_calculated,
        stats.formula_count,
        stats.errors,
        stats.circular_references,
        stats.faults
    );
    Ok(stats)
}

/// Value a formula cell holds after calculation, if any
pub fn calculated_value(
    workbook: &Workbook,
    sheet: usize,
    row: u32,
    col: u16,
) -> Option<&CellValue> {
    workbook
        .worksheet(sheet)?
        .cell_at(row, col)?
        .cached_value()
}
