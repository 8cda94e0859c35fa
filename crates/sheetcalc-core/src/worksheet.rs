//! Worksheet type

use crate::cell::{CellAddress, CellRange, CellStorage, CellValue};
use crate::error::{Error, Result};
use crate::formula::Formula;
use crate::{MAX_COLS, MAX_ROWS};

/// A single sheet of sparse cell storage
#[derive(Debug, Clone)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Non-empty cells
    cells: CellStorage,
}

impl Worksheet {
    /// Create a new empty worksheet
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: CellStorage::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // === Cell Access ===

    /// Get a cell by address string (e.g., "A1")
    pub fn cell(&self, address: &str) -> Result<Option<&CellValue>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cells.get(addr.row, addr.col))
    }

    /// Get a cell by row and column indices
    pub fn cell_at(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cells.get(row, col)
    }

    /// Cell contents, `Empty` for cells never written
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.cells.get(row, col).cloned().unwrap_or_default()
    }

    // === Cell Modification ===

    /// Set a cell value by address string
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by row and column indices
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        validate_cell_position(row, col)?;
        self.cells.set(row, col, value.into());
        Ok(())
    }

    /// Store a formula with no cached result
    pub fn set_cell_formula(&mut self, address: &str, formula: Formula) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_formula_at(addr.row, addr.col, formula)
    }

    pub fn set_cell_formula_at(&mut self, row: u32, col: u16, formula: Formula) -> Result<()> {
        self.set_cell_value_at(row, col, CellValue::formula(formula))
    }

    /// Clear a cell
    pub fn clear_cell(&mut self, address: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.clear_cell_at(addr.row, addr.col);
        Ok(())
    }

    pub fn clear_cell_at(&mut self, row: u32, col: u16) -> Option<CellValue> {
        self.cells.remove(row, col)
    }

    // === Range Operations ===

    /// Bounds of all non-empty cells
    pub fn used_range(&self) -> Option<CellRange> {
        self.cells
            .used_bounds()
            .map(|(min_row, min_col, max_row, max_col)| {
                CellRange::from_indices(min_row, min_col, max_row, max_col)
            })
    }

    /// Non-empty cells inside a range, row-major
    pub fn cells_in_range(&self, range: &CellRange) -> impl Iterator<Item = (u32, u16, &CellValue)> {
        self.cells.iter_window(
            range.first_row(),
            range.first_col(),
            range.last_row(),
            range.last_col(),
        )
    }

    /// Number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.cell_count()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    // === Formula calculation support ===

    /// Iterate over all formula cells: (row, col, formula)
    pub fn formula_cells(&self) -> impl Iterator<Item = (u32, u16, &Formula)> {
        self.cells
            .iter()
            .filter_map(|(row, col, value)| value.as_formula().map(|f| (row, col, f)))
    }

    /// The formula stored at an address, if the cell holds one
    pub fn formula(&self, address: &str) -> Result<Option<&Formula>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.formula_at(addr.row, addr.col))
    }

    pub fn formula_at(&self, row: u32, col: u16) -> Option<&Formula> {
        self.cells.get(row, col).and_then(CellValue::as_formula)
    }

    /// Set the cached result of a formula cell, keeping the formula
    ///
    /// Fails if the cell does not hold a formula.
    pub fn set_formula_result(&mut self, row: u32, col: u16, value: CellValue) -> Result<()> {
        match self.cells.get_mut(row, col) {
            Some(CellValue::Formula { cached, .. }) => {
                *cached = Some(Box::new(value));
                Ok(())
            }
            _ => Err(Error::UnexpectedCellType {
                address: CellAddress::new(row, col).to_a1_string(),
                expected: "formula",
            }),
        }
    }

    /// Drop the cached result of every formula cell
    pub fn clear_formula_results(&mut self) {
        let positions: Vec<(u32, u16)> = self
            .formula_cells()
            .map(|(row, col, _)| (row, col))
            .collect();
        for (row, col) in positions {
            if let Some(CellValue::Formula { cached, .. }) = self.cells.get_mut(row, col) {
                *cached = None;
            }
        }
    }

    /// The cached result for formula cells, the stored value otherwise
    pub fn get_calculated_value_at(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cells.get(row, col).map(CellValue::effective_value)
    }
}

fn validate_cell_position(row: u32, col: u16) -> Result<()> {
    if row >= MAX_ROWS {
        return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
    }
    if col >= MAX_COLS {
        return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_worksheet() {
        let ws = Worksheet::new("Test");
        assert_eq!(ws.name(), "Test");
        assert!(ws.is_empty());
        assert!(ws.used_range().is_none());
    }

    #[test]
    fn test_set_cell_values() {
        let mut ws = Worksheet::new("Test");

        ws.set_cell_value("A1", "Hello").unwrap();
        ws.set_cell_value("B1", 42.0).unwrap();
        ws.set_cell_value("C1", true).unwrap();

        assert_eq!(ws.get_value("A1").unwrap().as_string(), Some("Hello"));
        assert_eq!(ws.get_value("B1").unwrap().as_number(), Some(42.0));
        assert_eq!(ws.get_value("C1").unwrap().as_bool(), Some(true));
        assert_eq!(ws.get_value("D1").unwrap(), CellValue::Empty);

        ws.set_cell_value("B1", CellValue::Empty).unwrap();
        assert_eq!(ws.cell_count(), 2);
    }

    #[test]
    fn test_formula_result_round_trip() {
        let mut ws = Worksheet::new("Test");
        let formula = Formula::builder().area("B1:B10").func("SUM", 1).build().unwrap();
        ws.set_cell_formula("A1", formula).unwrap();

        assert_eq!(ws.formula_cells().count(), 1);
        assert_eq!(
            ws.formula("A1").unwrap().unwrap().to_formula_string(),
            "SUM(B1:B10)"
        );
        assert_eq!(ws.get_calculated_value_at(0, 0), Some(&CellValue::Empty));

        ws.set_formula_result(0, 0, CellValue::Number(7.0)).unwrap();
        assert_eq!(ws.get_calculated_value_at(0, 0), Some(&CellValue::Number(7.0)));
        assert!(ws.formula_at(0, 0).is_some());

        ws.clear_formula_results();
        assert_eq!(ws.get_calculated_value_at(0, 0), Some(&CellValue::Empty));
    }

    #[test]
    fn test_formula_result_requires_formula_cell() {
        let mut ws = Worksheet::new("Test");
        ws.set_cell_value_at(0, 0, 1.0).unwrap();
        let err = ws.set_formula_result(0, 0, CellValue::Number(2.0)).unwrap_err();
        assert!(matches!(err, Error::UnexpectedCellType { .. }));
        assert!(ws.set_formula_result(5, 5, CellValue::Empty).is_err());
    }

    #[test]
    fn test_bounds_checked() {
        let mut ws = Worksheet::new("Test");
        assert!(ws.set_cell_value_at(MAX_ROWS, 0, 1.0).is_err());
        assert!(ws.set_cell_value_at(0, MAX_COLS, 1.0).is_err());
    }
}
