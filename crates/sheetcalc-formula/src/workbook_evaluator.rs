//! Evaluation driver
//!
//! [`FormulaEvaluator`] is the entry point hosts use. It owns a primary
//! workbook plus any workbooks linked for external references, and offers
//! the four recomputation strategies:
//!
//! | Operation | Caches result | Replaces formula |
//! |---|---|---|
//! | [`evaluate`](FormulaEvaluator::evaluate) | no | no |
//! | [`evaluate_formula_cell`](FormulaEvaluator::evaluate_formula_cell) | yes | no |
//! | [`evaluate_in_cell`](FormulaEvaluator::evaluate_in_cell) | yes | yes |
//! | [`evaluate_all`](FormulaEvaluator::evaluate_all) | yes, every formula cell | no |
//!
//! Storage edits made behind the evaluator's back must be reported through
//! the `notify_*` methods, or made through the mutation helpers which do
//! both in one step.

use crate::dependency::{BookId, CellKey, EvalKey, EvaluationCache};
use crate::environment::Environment;
use crate::error::{FormulaError, FormulaResult};
use crate::functions::FunctionRegistry;
use crate::value::Value;
use sheetcalc_core::{
    CellAddress, CellType, CellValue, Formula, NameScope, NamedRange, Workbook, Worksheet,
};

/// Evaluator settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluatorOptions {
    /// Evaluate references to unlinked workbooks to the referring cell's
    /// last stored result instead of `#NAME?`
    pub ignore_missing_workbooks: bool,
}

impl EvaluatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignore_missing_workbooks(mut self, ignore: bool) -> Self {
        self.ignore_missing_workbooks = ignore;
        self
    }
}

/// Formula evaluator for one workbook and the workbooks it links to
#[derive(Debug)]
pub struct FormulaEvaluator {
    env: Environment,
    primary: BookId,
}

impl FormulaEvaluator {
    /// Evaluator for `workbook`, with no name other workbooks can refer to
    pub fn new(workbook: Workbook) -> Self {
        let mut env = Environment::new(EvaluatorOptions::default());
        let primary = env.push_book(None, workbook);
        Self { env, primary }
    }

    /// Evaluator for `workbook`, registered under `name` so that linked
    /// workbooks can refer back to it
    pub fn with_name(name: &str, workbook: Workbook) -> Self {
        let mut env = Environment::new(EvaluatorOptions::default());
        let primary = env.push_book(Some(name), workbook);
        Self { env, primary }
    }

    pub fn with_options(mut self, options: EvaluatorOptions) -> Self {
        self.env.set_options(options);
        self
    }

    pub fn options(&self) -> &EvaluatorOptions {
        self.env.options()
    }

    /// Changing options drops every cached result
    pub fn set_options(&mut self, options: EvaluatorOptions) {
        self.env.set_options(options);
        self.env.clear_caches();
    }

    /// Id of the workbook this evaluator was created for
    pub fn primary(&self) -> BookId {
        self.primary
    }

    pub fn functions(&self) -> &FunctionRegistry {
        self.env.functions()
    }

    /// Registry for adding or replacing functions
    ///
    /// Cached results are not invalidated; call
    /// [`clear_all_cached_result_values`](Self::clear_all_cached_result_values)
    /// if earlier results depend on a replaced function.
    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        self.env.functions_mut()
    }

    // === Link table ===

    /// Make `workbook` reachable from formulas as `[name]Sheet!A1`
    pub fn link(&mut self, name: &str, workbook: Workbook) -> FormulaResult<BookId> {
        self.env.add_book(Some(name), workbook)
    }

    /// Remove a linked workbook and hand it back
    ///
    /// Cells that read from it are invalidated and will see `#NAME?` (or
    /// their stored results, see [`EvaluatorOptions`]) when next evaluated.
    pub fn unlink(&mut self, name: &str) -> FormulaResult<Workbook> {
        if self.env.book_id(name) == Some(self.primary) {
            return Err(FormulaError::InvalidReference(format!(
                "cannot unlink the primary workbook '{}'",
                name
            )));
        }
        self.env.remove_book(name).map(|(_, workbook)| workbook)
    }

    pub fn book_id(&self, name: &str) -> Option<BookId> {
        self.env.book_id(name)
    }

    pub fn workbook(&self) -> FormulaResult<&Workbook> {
        self.env.workbook(self.primary)
    }

    pub fn workbook_of(&self, book: BookId) -> FormulaResult<&Workbook> {
        self.env.workbook(book)
    }

    /// Direct access to a registered workbook's storage
    ///
    /// Cached results are not touched; follow every edit with the matching
    /// `notify_*` call.
    pub fn workbook_mut(&mut self, book: BookId) -> FormulaResult<&mut Workbook> {
        self.env.workbook_mut(book)
    }

    /// Give the primary workbook back, dropping linked ones
    pub fn into_workbook(mut self) -> FormulaResult<Workbook> {
        self.env.take_workbook(self.primary)
    }

    /// Cache of one workbook, for inspection
    pub fn evaluation_cache(&self, book: BookId) -> FormulaResult<&EvaluationCache> {
        self.env.cache(book)
    }

    // === Cell handles ===

    /// Key of a cell in the primary workbook
    pub fn cell(&self, sheet: &str, address: &str) -> FormulaResult<CellKey> {
        self.cell_in(self.primary, sheet, address)
    }

    /// Key of a cell in any registered workbook
    pub fn cell_in(&self, book: BookId, sheet: &str, address: &str) -> FormulaResult<CellKey> {
        let workbook = self.env.workbook(book)?;
        let index = workbook
            .sheet_index(sheet)
            .ok_or_else(|| FormulaError::SheetNotFound {
                book: self
                    .env
                    .book_name(book)
                    .map(str::to_string)
                    .unwrap_or_else(|| book.to_string()),
                sheet: sheet.to_string(),
            })?;
        let address = CellAddress::parse(address)?;
        Ok(CellKey::from_address(book, index, &address))
    }

    fn worksheet(&self, cell: &CellKey) -> FormulaResult<&Worksheet> {
        self.env
            .workbook(cell.book)?
            .worksheet(cell.sheet)
            .ok_or_else(|| FormulaError::InvalidReference(format!("no sheet for {}", cell)))
    }

    fn worksheet_mut(&mut self, cell: &CellKey) -> FormulaResult<&mut Worksheet> {
        self.env
            .workbook_mut(cell.book)?
            .worksheet_mut(cell.sheet)
            .ok_or_else(|| FormulaError::InvalidReference(format!("no sheet for {}", cell)))
    }

    fn is_formula(&self, cell: &CellKey) -> FormulaResult<bool> {
        Ok(self.worksheet(cell)?.formula_at(cell.row, cell.col).is_some())
    }

    // === Evaluation ===

    /// Value of a cell without caching it
    ///
    /// Cells the formula reads are served from, and stored into, the cache
    /// as usual. A literal cell yields its value.
    pub fn evaluate(&mut self, cell: CellKey) -> FormulaResult<Value> {
        self.env.evaluate_cell_uncached(cell)
    }

    /// Evaluate a formula cell, cache the result and store it as the
    /// cell's cached value
    ///
    /// Returns the type of the result, or `None` if the cell holds no
    /// formula (in which case nothing happens).
    pub fn evaluate_formula_cell(&mut self, cell: CellKey) -> FormulaResult<Option<CellType>> {
        if !self.is_formula(&cell)? {
            return Ok(None);
        }
        let value = self.env.evaluate_cell(cell)?;
        let result = value.to_cell_value();
        let cell_type = result.cell_type();
        self.worksheet_mut(&cell)?
            .set_formula_result(cell.row, cell.col, result)?;
        Ok(Some(cell_type))
    }

    /// Evaluate a formula cell and replace the formula with its result
    ///
    /// Non-formula cells are left alone. Returns the same cell.
    pub fn evaluate_in_cell(&mut self, cell: CellKey) -> FormulaResult<CellKey> {
        if !self.is_formula(&cell)? {
            return Ok(cell);
        }
        let value = self.env.evaluate_cell(cell)?;
        self.worksheet_mut(&cell)?
            .set_cell_value_at(cell.row, cell.col, value.to_cell_value())?;
        self.env.forget(&EvalKey::Cell(cell));
        Ok(cell)
    }

    /// Evaluate every formula cell of the primary workbook
    pub fn evaluate_all(&mut self) -> FormulaResult<()> {
        self.evaluate_all_in(self.primary)
    }

    /// Evaluate every formula cell of one workbook, stopping at the first fault
    pub fn evaluate_all_in(&mut self, book: BookId) -> FormulaResult<()> {
        for cell in self.formula_cells(book)? {
            self.evaluate_formula_cell(cell)?;
        }
        Ok(())
    }

    /// Keys of all formula cells in a workbook, sheet by sheet in row order
    pub fn formula_cells(&self, book: BookId) -> FormulaResult<Vec<CellKey>> {
        Ok(self
            .env
            .workbook(book)?
            .worksheets()
            .enumerate()
            .flat_map(|(sheet, ws)| {
                ws.formula_cells()
                    .map(move |(row, col, _)| CellKey::new(book, sheet, row, col))
            })
            .collect())
    }

    /// Last cached result of a cell, if still valid
    pub fn cached_value(&self, cell: CellKey) -> Option<Value> {
        self.env
            .cache(cell.book)
            .ok()?
            .get(&EvalKey::Cell(cell))
            .cloned()
    }

    // === Notifications ===

    /// A cell's literal value was changed in storage
    pub fn notify_update_cell(&mut self, cell: CellKey) {
        self.env.invalidate_cell(cell);
    }

    /// A cell's formula was set or replaced in storage
    pub fn notify_set_formula(&mut self, cell: CellKey) {
        self.env.invalidate_cell(cell);
    }

    /// A cell was cleared in storage
    pub fn notify_delete_cell(&mut self, cell: CellKey) {
        self.env.invalidate_cell(cell);
    }

    /// Forget every cached result, in every registered workbook
    pub fn clear_all_cached_result_values(&mut self) {
        self.env.clear_caches();
    }

    // === Mutation ===

    /// Store a literal and invalidate what depends on the cell
    pub fn set_cell_value<V: Into<CellValue>>(
        &mut self,
        cell: CellKey,
        value: V,
    ) -> FormulaResult<()> {
        self.worksheet_mut(&cell)?
            .set_cell_value_at(cell.row, cell.col, value)?;
        self.env.invalidate_cell(cell);
        Ok(())
    }

    /// Store a formula and invalidate what depends on the cell
    pub fn set_cell_formula(&mut self, cell: CellKey, formula: Formula) -> FormulaResult<()> {
        self.worksheet_mut(&cell)?
            .set_cell_formula_at(cell.row, cell.col, formula)?;
        self.env.invalidate_cell(cell);
        Ok(())
    }

    /// Empty a cell and invalidate what depends on it
    pub fn clear_cell(&mut self, cell: CellKey) -> FormulaResult<Option<CellValue>> {
        let previous = self.worksheet_mut(&cell)?.clear_cell_at(cell.row, cell.col);
        self.env.invalidate_cell(cell);
        Ok(previous)
    }

    /// Define or redefine a workbook-scoped name
    ///
    /// Everything that read the name, including lookups that found nothing,
    /// is invalidated.
    pub fn define_name(
        &mut self,
        book: BookId,
        name: &str,
        refers_to: Formula,
    ) -> FormulaResult<()> {
        self.env
            .workbook_mut(book)?
            .named_ranges_mut()
            .define_or_update(NamedRange::workbook_scope(name, refers_to))?;
        self.env.invalidate_name(book, name)?;
        Ok(())
    }

    /// Remove a defined name, returning its definition
    ///
    /// Readers are invalidated and fall back to a name of wider scope, or
    /// to `#NAME?`.
    pub fn remove_name(
        &mut self,
        book: BookId,
        name: &str,
        scope: NameScope,
    ) -> FormulaResult<Option<NamedRange>> {
        let removed = self.env.workbook_mut(book)?.remove_name(name, scope);
        if removed.is_some() {
            self.env.invalidate_name(book, name)?;
        }
        Ok(removed)
    }
}
