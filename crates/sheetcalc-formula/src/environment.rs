//! Cross-workbook environment
//!
//! The environment owns every workbook an evaluator can reach, each with its
//! own [`EvaluationCache`], plus the single call stack shared by all of them.
//! A reference into another workbook is resolved through the link table and
//! read through that workbook's cache, so chains such as A -> B -> A need no
//! locking: the whole walk happens under one `&mut Environment`.

use crate::circular::{CallStack, Entry};
use crate::context::EvaluationContext;
use crate::dependency::{AreaRef, BookId, CellKey, EvalKey, EvaluationCache, Precedents};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator;
use crate::functions::FunctionRegistry;
use crate::value::Value;
use crate::workbook_evaluator::EvaluatorOptions;
use ahash::{AHashMap, AHashSet};
use sheetcalc_core::{CellValue, ErrorCode, Formula, NameScope, SheetRef, Workbook};

/// A registered workbook
#[derive(Debug)]
struct LinkedBook {
    /// Name other workbooks use to reference it (`[name]Sheet1!A1`)
    name: Option<String>,
    workbook: Workbook,
    cache: EvaluationCache,
}

/// What a cell contributes when read
enum CellContent {
    Literal(Value),
    Formula(Formula),
}

/// A formula queued for evaluation
#[derive(Debug)]
struct Task {
    key: EvalKey,
    formula: Formula,
    ctx: EvaluationContext,
    /// Store the result in the cache
    persist: bool,
    /// Attempted before and parked on the call stack
    parked: bool,
}

impl Task {
    fn new(key: EvalKey, formula: Formula, ctx: EvaluationContext, persist: bool) -> Self {
        Self {
            key,
            formula,
            ctx,
            persist,
            parked: false,
        }
    }
}

enum Attempt {
    Done(Value),
    Parked(Task),
}

/// Workbooks, their caches and the evaluation call stack
#[derive(Debug)]
pub struct Environment {
    books: Vec<Option<LinkedBook>>,
    /// Lowercase workbook name -> id
    links: AHashMap<String, BookId>,
    stack: CallStack,
    /// Uncomputed cells the running attempt read, in reading order
    deferred: Vec<(CellKey, Formula)>,
    functions: FunctionRegistry,
    options: EvaluatorOptions,
}

impl Environment {
    pub fn new(options: EvaluatorOptions) -> Self {
        Self {
            books: Vec::new(),
            links: AHashMap::new(),
            stack: CallStack::new(),
            deferred: Vec::new(),
            functions: FunctionRegistry::new(),
            options,
        }
    }

    pub fn options(&self) -> &EvaluatorOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: EvaluatorOptions) {
        self.options = options;
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    // === Link table ===

    /// Register a workbook, optionally under a name other workbooks can use
    ///
    /// All caches are reset: references that could not be resolved before
    /// recorded no dependency that would otherwise be invalidated.
    pub fn add_book(&mut self, name: Option<&str>, workbook: Workbook) -> FormulaResult<BookId> {
        if let Some(name) = name {
            if self.links.contains_key(&name.to_lowercase()) {
                return Err(FormulaError::DuplicateLink(name.to_string()));
            }
        }

        Ok(self.push_book(name, workbook))
    }

    /// Register a workbook whose name is known to be free
    pub(crate) fn push_book(&mut self, name: Option<&str>, workbook: Workbook) -> BookId {
        let id = BookId(self.books.len());
        if let Some(name) = name {
            self.links.insert(name.to_lowercase(), id);
            log::debug!("linked workbook '{}' as {}", name, id);
        }
        self.books.push(Some(LinkedBook {
            name: name.map(str::to_string),
            workbook,
            cache: EvaluationCache::new(),
        }));
        self.clear_caches();
        id
    }

    /// Remove a named workbook and hand it back
    ///
    /// Everything in other workbooks that read from it is invalidated, so
    /// the next evaluation sees the reference as unresolvable.
    pub fn remove_book(&mut self, name: &str) -> FormulaResult<(BookId, Workbook)> {
        let id = self
            .links
            .remove(&name.to_lowercase())
            .ok_or_else(|| FormulaError::UnknownWorkbook(name.to_string()))?;
        let book = self
            .books
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or_else(|| FormulaError::UnknownWorkbook(name.to_string()))?;

        let mut stale: Vec<EvalKey> = book
            .cache
            .all_dependents()
            .into_iter()
            .filter(|key| key.book() != id)
            .collect();
        // Names may hold references into the removed workbook without having read it
        for other in self.books.iter().flatten() {
            stale.extend(
                other
                    .cache
                    .precedent_keys()
                    .filter(|key| matches!(key, EvalKey::Name { .. }))
                    .cloned(),
            );
        }
        log::debug!(
            "unlinked workbook '{}' ({}), invalidating {} dependents",
            name,
            id,
            stale.len()
        );
        for key in stale {
            self.invalidate(&key);
        }
        Ok((id, book.workbook))
    }

    pub fn book_id(&self, name: &str) -> Option<BookId> {
        self.links.get(&name.to_lowercase()).copied()
    }

    pub fn book_name(&self, id: BookId) -> Option<&str> {
        self.books
            .get(id.0)
            .and_then(Option::as_ref)
            .and_then(|b| b.name.as_deref())
    }

    pub fn contains_book(&self, id: BookId) -> bool {
        self.books.get(id.0).map_or(false, Option::is_some)
    }

    fn book(&self, id: BookId) -> FormulaResult<&LinkedBook> {
        self.books
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| FormulaError::InvalidReference(format!("{} is not linked", id)))
    }

    fn book_mut(&mut self, id: BookId) -> FormulaResult<&mut LinkedBook> {
        self.books
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| FormulaError::InvalidReference(format!("{} is not linked", id)))
    }

    pub fn workbook(&self, id: BookId) -> FormulaResult<&Workbook> {
        self.book(id).map(|b| &b.workbook)
    }

    /// Direct storage access; the caller must invalidate what it edits
    pub fn workbook_mut(&mut self, id: BookId) -> FormulaResult<&mut Workbook> {
        self.book_mut(id).map(|b| &mut b.workbook)
    }

    pub fn take_workbook(&mut self, id: BookId) -> FormulaResult<Workbook> {
        let book = self
            .books
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or_else(|| FormulaError::InvalidReference(format!("{} is not linked", id)))?;
        if let Some(name) = &book.name {
            self.links.remove(&name.to_lowercase());
        }
        Ok(book.workbook)
    }

    pub fn cache(&self, id: BookId) -> FormulaResult<&EvaluationCache> {
        self.book(id).map(|b| &b.cache)
    }

    /// Describe a workbook for fault messages
    fn describe(&self, id: BookId) -> String {
        self.book_name(id)
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string())
    }

    // === Resolution ===

    /// Workbook and sheet index a reference qualifier points at
    ///
    /// An unlinked workbook is a value-level outcome, returned as `Err`.
    pub fn resolve_sheet(
        &self,
        ctx: &EvaluationContext,
        sheet: Option<&SheetRef>,
    ) -> FormulaResult<Result<(BookId, usize), Value>> {
        let Some(sheet_ref) = sheet else {
            return Ok(Ok((ctx.book, ctx.sheet)));
        };

        let book = match &sheet_ref.book {
            None => ctx.book,
            Some(name) => match self.book_id(name) {
                Some(id) => id,
                None => return Ok(Err(self.missing_workbook_value(name))),
            },
        };

        let sheet = self
            .workbook(book)?
            .sheet_index(&sheet_ref.sheet)
            .ok_or_else(|| FormulaError::SheetNotFound {
                book: self.describe(book),
                sheet: sheet_ref.sheet.clone(),
            })?;
        Ok(Ok((book, sheet)))
    }

    fn missing_workbook_value(&self, name: &str) -> Value {
        if !self.options.ignore_missing_workbooks {
            log::debug!("reference to unlinked workbook '{}'", name);
            return Value::Error(ErrorCode::Name);
        }
        // Fall back to what the referring cell last stored
        self.stack
            .current()
            .and_then(EvalKey::as_cell)
            .and_then(|cell| {
                let book = self.book(cell.book).ok()?;
                let stored = book.workbook.worksheet(cell.sheet)?.cell_at(cell.row, cell.col)?;
                stored.cached_value().map(Value::from)
            })
            .unwrap_or(Value::Blank)
    }

    fn cell_content(&self, key: &CellKey) -> FormulaResult<CellContent> {
        let sheet = self
            .workbook(key.book)?
            .worksheet(key.sheet)
            .ok_or_else(|| {
                FormulaError::InvalidReference(format!(
                    "sheet index {} in {}",
                    key.sheet,
                    self.describe(key.book)
                ))
            })?;
        Ok(match sheet.cell_at(key.row, key.col) {
            None => CellContent::Literal(Value::Blank),
            Some(CellValue::Formula { formula, .. }) => CellContent::Formula(formula.clone()),
            Some(other) => CellContent::Literal(Value::from(other)),
        })
    }

    // === Evaluation ===

    /// Value of a cell as read by the formula being evaluated
    pub fn cell_value(&mut self, key: CellKey) -> FormulaResult<Value> {
        self.stack.record(EvalKey::Cell(key));
        let may_defer = !self.is_deferring();
        self.read_cell(key, may_defer)
    }

    /// Value of a cell, computing and caching it if it holds a formula
    pub fn evaluate_cell(&mut self, key: CellKey) -> FormulaResult<Value> {
        let may_defer = !self.is_deferring();
        self.read_cell(key, may_defer)
    }

    /// Value of a cell computed afresh, without storing its own result
    ///
    /// Other cells it reads still go through their caches.
    pub fn evaluate_cell_uncached(&mut self, key: CellKey) -> FormulaResult<Value> {
        match self.cell_content(&key)? {
            CellContent::Literal(value) => Ok(value),
            CellContent::Formula(formula) => self.settle(Task::new(
                EvalKey::Cell(key),
                formula,
                EvaluationContext::for_cell(&key),
                false,
            )),
        }
    }

    /// Non-empty cells of an area, formulas evaluated
    pub fn area_values(&mut self, area: &AreaRef) -> FormulaResult<Vec<Value>> {
        self.stack.record_area(*area);
        let positions: Vec<(u32, u16)> = self
            .workbook(area.book)?
            .worksheet(area.sheet)
            .ok_or_else(|| {
                FormulaError::InvalidReference(format!(
                    "sheet index {} in {}",
                    area.sheet,
                    self.describe(area.book)
                ))
            })?
            .cells_in_range(&area.range)
            .map(|(row, col, _)| (row, col))
            .collect();

        // Every cell of an area reached before any deferral is really read
        let may_defer = !self.is_deferring();
        positions
            .into_iter()
            .map(|(row, col)| self.read_cell(area.cell(row, col), may_defer))
            .collect()
    }

    /// Value of a defined name as seen from `ctx`
    ///
    /// The result is left undereferenced so a name for a range can feed a
    /// function that takes ranges.
    pub fn name_value(&mut self, ctx: &EvaluationContext, name: &str) -> FormulaResult<Value> {
        let found = self
            .workbook(ctx.book)?
            .get_named_range(name, ctx.sheet)
            .map(|n| (n.scope, n.refers_to.clone()));

        let Some((scope, formula)) = found else {
            // A later definition must reach this reader
            self.stack
                .record(EvalKey::name(ctx.book, NameScope::Workbook, name));
            return Ok(Value::Error(ErrorCode::Name));
        };

        let key = EvalKey::name(ctx.book, scope, name);
        self.stack.record(key.clone());
        let sheet = match scope {
            NameScope::Sheet(index) => index,
            NameScope::Workbook => 0,
        };
        let name_ctx = EvaluationContext::new(ctx.book, sheet, 0, 0);
        if self.stack.current().is_none() {
            return self.settle(Task::new(key, formula, name_ctx, true));
        }
        self.compute_name(key, &formula, name_ctx)
    }

    /// True once the running attempt has met a cell it must wait for
    ///
    /// From then on reads yield blank placeholders and nothing is stored.
    fn is_deferring(&self) -> bool {
        !self.deferred.is_empty()
    }

    fn cached(&self, key: &EvalKey) -> FormulaResult<Option<Value>> {
        Ok(self.book(key.book())?.cache.get(key).cloned())
    }

    /// Read a cell from inside or outside a running evaluation
    ///
    /// Outside, a formula cell is evaluated outright. Inside, a formula cell
    /// with no clean cached value is not evaluated on the spot: it is queued
    /// (when `may_defer`) and a blank placeholder stands in for it until
    /// the attempt is run again.
    fn read_cell(&mut self, key: CellKey, may_defer: bool) -> FormulaResult<Value> {
        let formula = match self.cell_content(&key)? {
            CellContent::Literal(value) => return Ok(value),
            CellContent::Formula(formula) => formula,
        };
        let eval_key = EvalKey::Cell(key);

        if self.stack.current().is_none() {
            let ctx = EvaluationContext::for_cell(&key);
            return self.settle(Task::new(eval_key, formula, ctx, true));
        }
        if self.stack.contains(&eval_key) {
            if self.is_deferring() {
                return Ok(Value::Blank);
            }
            self.stack.mark_cycle(&eval_key);
            return Ok(Value::Error(ErrorCode::CircularRef));
        }
        if let Some(value) = self.cached(&eval_key)? {
            return Ok(value);
        }
        if may_defer {
            self.deferred.push((key, formula));
        }
        Ok(Value::Blank)
    }

    /// Evaluate `target` and every uncomputed cell it reads
    ///
    /// An attempt that reads a formula cell with no cached value is parked
    /// on the call stack, the cells it waits for are computed first and the
    /// attempt is run again. Reference chains and cycles of any length are
    /// walked on the heap this way; only defined names nest natively.
    fn settle(&mut self, target: Task) -> FormulaResult<Value> {
        if target.persist {
            if let Some(value) = self.cached(&target.key)? {
                return Ok(value);
            }
        }
        let result = self.run_tasks(target);
        if result.is_err() {
            self.stack.clear();
            self.deferred.clear();
        }
        result
    }

    fn run_tasks(&mut self, mut target: Task) -> FormulaResult<Value> {
        let mut work: Vec<Task> = Vec::new();
        loop {
            let Some(task) = work.pop() else {
                match self.attempt(target)? {
                    Attempt::Done(value) => return Ok(value),
                    Attempt::Parked(task) => {
                        target = task;
                        self.queue_deferred(&mut work);
                        continue;
                    }
                }
            };
            // Queued more than once, or computed as a precedent of a sibling
            if !task.parked && self.cached(&task.key)?.is_some() {
                continue;
            }
            if let Attempt::Parked(task) = self.attempt(task)? {
                work.push(task);
                self.queue_deferred(&mut work);
            }
        }
    }

    /// Move the cells the last attempt waits for onto `work`, first read on top
    fn queue_deferred(&mut self, work: &mut Vec<Task>) {
        let mut seen: AHashSet<CellKey> = AHashSet::new();
        let deferred: Vec<(CellKey, Formula)> = std::mem::take(&mut self.deferred)
            .into_iter()
            .filter(|(key, _)| seen.insert(*key))
            .collect();
        work.extend(deferred.into_iter().rev().map(|(key, formula)| {
            Task::new(EvalKey::Cell(key), formula, EvaluationContext::for_cell(&key), true)
        }));
    }

    /// Run one task to completion, or park it behind the cells it waits for
    fn attempt(&mut self, task: Task) -> FormulaResult<Attempt> {
        if task.parked {
            self.stack.resume();
        } else if self.stack.enter(task.key.clone()) == Entry::Circular {
            return Ok(Attempt::Done(Value::Error(ErrorCode::CircularRef)));
        }
        log::trace!("evaluating {} = {}", task.key, task.formula);

        let value = evaluator::evaluate_formula(self, &task.formula, &task.ctx)?;
        let value = if task.key.as_cell().is_some() {
            self.dereference_result(&value, &task.ctx)?
        } else {
            value
        };

        if self.is_deferring() {
            self.stack.park();
            log::trace!("{} waits for {} cells", task.key, self.deferred.len());
            return Ok(Attempt::Parked(Task {
                parked: true,
                ..task
            }));
        }

        let Some(frame) = self.stack.exit() else {
            return Ok(Attempt::Done(value));
        };
        let value = if frame.circular {
            Value::Error(ErrorCode::CircularRef)
        } else {
            value
        };
        if task.persist {
            self.store(frame.key, value.clone(), frame.precedents);
        }
        Ok(Attempt::Done(value))
    }

    /// Evaluate a defined name read from inside another evaluation
    fn compute_name(
        &mut self,
        key: EvalKey,
        formula: &Formula,
        ctx: EvaluationContext,
    ) -> FormulaResult<Value> {
        if !self.stack.contains(&key) {
            if let Some(value) = self.cached(&key)? {
                return Ok(value);
            }
        }
        if self.is_deferring() {
            return Ok(Value::Blank);
        }
        if self.stack.enter(key.clone()) == Entry::Circular {
            return Ok(Value::Error(ErrorCode::CircularRef));
        }
        log::trace!("evaluating {} = {}", key, formula);

        let result = evaluator::evaluate_formula(self, formula, &ctx);
        let frame = self.stack.exit();
        let value = result?;
        if self.is_deferring() {
            return Ok(Value::Blank);
        }

        let Some(frame) = frame else {
            return Ok(value);
        };
        let value = if frame.circular {
            Value::Error(ErrorCode::CircularRef)
        } else {
            value
        };
        self.store(frame.key, value.clone(), frame.precedents);
        Ok(value)
    }

    /// Resolve a stack value to a scalar at the position of `ctx`
    ///
    /// Areas go through implicit intersection: a single cell is itself, a
    /// single column or row picks the cell in line with `ctx`, and a block
    /// picks the cell at `ctx`'s own row and column. Anything else is
    /// `#VALUE!`.
    pub fn dereference(&mut self, value: &Value, ctx: &EvaluationContext) -> FormulaResult<Value> {
        match value {
            Value::CellRef(key) => self.cell_value(*key),
            Value::AreaRef(area) => match implicit_intersection(area, ctx) {
                Some(key) => self.cell_value(key),
                None => Ok(Value::Error(ErrorCode::Value)),
            },
            other => Ok(other.clone()),
        }
    }

    /// Final result of a formula cell: a scalar, with missing arguments blank
    pub fn dereference_result(
        &mut self,
        value: &Value,
        ctx: &EvaluationContext,
    ) -> FormulaResult<Value> {
        Ok(match self.dereference(value, ctx)? {
            Value::MissingArg => Value::Blank,
            other => other,
        })
    }

    /// Store a result and rebuild the reverse edges of `key`
    fn store(&mut self, key: EvalKey, value: Value, precedents: Precedents) {
        let Some(book) = self.books.get_mut(key.book().0).and_then(Option::as_mut) else {
            return;
        };
        let previous = book.cache.store(key.clone(), value, precedents.clone());

        if let Some(previous) = previous {
            self.unlink_precedents(&key, &previous.precedents);
        }
        for precedent in precedents.keys {
            if let Some(owner) = self.books.get_mut(precedent.book().0).and_then(Option::as_mut) {
                owner.cache.add_dependent(precedent, key.clone());
            }
        }
        for area in precedents.areas {
            if let Some(owner) = self.books.get_mut(area.book.0).and_then(Option::as_mut) {
                owner.cache.add_area_dependent(area, key.clone());
            }
        }
    }

    fn unlink_precedents(&mut self, key: &EvalKey, precedents: &Precedents) {
        for precedent in &precedents.keys {
            if let Some(owner) = self.books.get_mut(precedent.book().0).and_then(Option::as_mut) {
                owner.cache.remove_dependent(precedent, key);
            }
        }
        for area in &precedents.areas {
            if let Some(owner) = self.books.get_mut(area.book.0).and_then(Option::as_mut) {
                owner.cache.remove_area_dependent(area, key);
            }
        }
    }

    // === Invalidation ===

    /// Mark `key` and everything that transitively read it dirty
    ///
    /// Returns the number of keys visited.
    pub fn invalidate(&mut self, key: &EvalKey) -> usize {
        let mut visited: AHashSet<EvalKey> = AHashSet::new();
        let mut pending = vec![key.clone()];

        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(book) = self.books.get_mut(current.book().0).and_then(Option::as_mut) {
                book.cache.mark_dirty(&current);
                pending.extend(
                    book.cache
                        .dependents_of(&current)
                        .into_iter()
                        .filter(|k| !visited.contains(k)),
                );
            }
        }

        log::debug!("invalidated {} from {}", visited.len(), key);
        visited.len()
    }

    /// Invalidate a cell after its storage changed
    ///
    /// If it no longer holds a formula its own entry and edges are dropped.
    pub fn invalidate_cell(&mut self, cell: CellKey) -> usize {
        let key = EvalKey::Cell(cell);
        let visited = self.invalidate(&key);

        let still_formula = matches!(self.cell_content(&cell), Ok(CellContent::Formula(_)));
        if !still_formula {
            self.forget(&key);
        }
        visited
    }

    /// Drop the cached entry of `key` and the edges it recorded
    ///
    /// Edges from keys that read `key` stay, so they still see later edits.
    pub fn forget(&mut self, key: &EvalKey) {
        let removed = self
            .books
            .get_mut(key.book().0)
            .and_then(Option::as_mut)
            .and_then(|book| book.cache.remove(key));
        if let Some(entry) = removed {
            self.unlink_precedents(key, &entry.precedents);
        }
    }

    /// Invalidate every cached value of a name, whatever its scope
    pub fn invalidate_name(&mut self, book: BookId, name: &str) -> FormulaResult<usize> {
        let sheets = self.workbook(book)?.sheet_count();
        let scopes = std::iter::once(NameScope::Workbook).chain((0..sheets).map(NameScope::Sheet));
        let keys: Vec<EvalKey> = scopes.map(|scope| EvalKey::name(book, scope, name)).collect();
        Ok(keys.iter().map(|key| self.invalidate(key)).sum())
    }

    /// Forget every cached value in every workbook
    pub fn clear_caches(&mut self) {
        for book in self.books.iter_mut().flatten() {
            book.cache.clear();
        }
        log::debug!("cleared all cached results");
    }
}

/// Cell of `area` in line with the evaluating position, if any
pub fn implicit_intersection(area: &AreaRef, ctx: &EvaluationContext) -> Option<CellKey> {
    let range = &area.range;
    if range.is_single_cell() {
        return Some(area.cell(range.first_row(), range.first_col()));
    }
    if range.is_column() {
        return range
            .contains_row(ctx.row)
            .then(|| area.cell(ctx.row, range.first_col()));
    }
    if range.is_row() {
        return range
            .contains_col(ctx.col)
            .then(|| area.cell(range.first_row(), ctx.col));
    }
    range
        .contains(ctx.row, ctx.col)
        .then(|| area.cell(ctx.row, ctx.col))
}
