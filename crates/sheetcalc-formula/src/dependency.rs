//! Dependency cache
//!
//! Every linked workbook owns one [`EvaluationCache`]. It memoizes the
//! result of each formula cell (and defined name) evaluated so far together
//! with what that evaluation read. Reverse edges live in the cache of the
//! workbook that owns the *precedent*, so a change in one workbook can be
//! followed into dependents held by another.

use crate::value::Value;
use ahash::{AHashMap, AHashSet};
use sheetcalc_core::{CellAddress, CellRange, NameScope};
use std::fmt;

/// Handle to a workbook registered with an evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookId(pub(crate) usize);

impl BookId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "book{}", self.0)
    }
}

/// Stable identity of a cell across all linked workbooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub book: BookId,
    pub sheet: usize,
    pub row: u32,
    pub col: u16,
}

impl CellKey {
    pub fn new(book: BookId, sheet: usize, row: u32, col: u16) -> Self {
        Self {
            book,
            sheet,
            row,
            col,
        }
    }

    pub fn from_address(book: BookId, sheet: usize, addr: &CellAddress) -> Self {
        Self::new(book, sheet, addr.row, addr.col)
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}!{}",
            self.book,
            self.sheet,
            CellAddress::new(self.row, self.col)
        )
    }
}

/// An area in one sheet of one workbook
///
/// The range is stored without `$` markers so equal areas hash equally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaRef {
    pub book: BookId,
    pub sheet: usize,
    pub range: CellRange,
}

impl AreaRef {
    pub fn new(book: BookId, sheet: usize, range: &CellRange) -> Self {
        Self {
            book,
            sheet,
            range: CellRange::from_indices(
                range.first_row(),
                range.first_col(),
                range.last_row(),
                range.last_col(),
            ),
        }
    }

    pub fn contains(&self, key: &CellKey) -> bool {
        self.book == key.book && self.sheet == key.sheet && self.range.contains(key.row, key.col)
    }

    pub fn cell(&self, row: u32, col: u16) -> CellKey {
        CellKey::new(self.book, self.sheet, row, col)
    }
}

impl fmt::Display for AreaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}!{}", self.book, self.sheet, self.range)
    }
}

/// Anything whose evaluated value is cached
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EvalKey {
    Cell(CellKey),
    /// Defined name; `name` is lowercase
    Name {
        book: BookId,
        scope: NameScope,
        name: String,
    },
}

impl EvalKey {
    pub fn name(book: BookId, scope: NameScope, name: &str) -> Self {
        EvalKey::Name {
            book,
            scope,
            name: name.to_lowercase(),
        }
    }

    /// Workbook whose cache holds this key
    pub fn book(&self) -> BookId {
        match self {
            EvalKey::Cell(cell) => cell.book,
            EvalKey::Name { book, .. } => *book,
        }
    }

    pub fn as_cell(&self) -> Option<&CellKey> {
        match self {
            EvalKey::Cell(cell) => Some(cell),
            EvalKey::Name { .. } => None,
        }
    }
}

impl From<CellKey> for EvalKey {
    fn from(cell: CellKey) -> Self {
        EvalKey::Cell(cell)
    }
}

impl fmt::Display for EvalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalKey::Cell(cell) => write!(f, "{}", cell),
            EvalKey::Name { book, scope, name } => match scope {
                NameScope::Workbook => write!(f, "{}:{}", book, name),
                NameScope::Sheet(sheet) => write!(f, "{}:{}!{}", book, sheet, name),
            },
        }
    }
}

/// What one evaluation read
#[derive(Debug, Default, Clone)]
pub struct Precedents {
    pub keys: AHashSet<EvalKey>,
    pub areas: AHashSet<AreaRef>,
}

impl Precedents {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.areas.is_empty()
    }
}

/// Memoized result of one key
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// `None` once invalidated
    pub value: Option<Value>,
    pub precedents: Precedents,
}

impl CacheEntry {
    pub fn is_dirty(&self) -> bool {
        self.value.is_none()
    }
}

/// Per-workbook memo table plus the reverse edges into it
#[derive(Debug, Default)]
pub struct EvaluationCache {
    entries: AHashMap<EvalKey, CacheEntry>,
    /// Precedent in this workbook -> keys (in any workbook) that read it
    dependents: AHashMap<EvalKey, AHashSet<EvalKey>>,
    /// Area in this workbook -> keys that iterated it
    area_dependents: AHashMap<AreaRef, AHashSet<EvalKey>>,
}

impl EvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clean cached value, if any
    pub fn get(&self, key: &EvalKey) -> Option<&Value> {
        self.entries.get(key).and_then(|e| e.value.as_ref())
    }

    pub fn entry(&self, key: &EvalKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Store a fresh result, returning the entry it replaces
    pub fn store(
        &mut self,
        key: EvalKey,
        value: Value,
        precedents: Precedents,
    ) -> Option<CacheEntry> {
        self.entries.insert(
            key,
            CacheEntry {
                value: Some(value),
                precedents,
            },
        )
    }

    /// Mark an entry dirty; returns whether it held a clean value
    pub fn mark_dirty(&mut self, key: &EvalKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => entry.value.take().is_some(),
            None => false,
        }
    }

    /// Drop an entry outright
    pub fn remove(&mut self, key: &EvalKey) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    pub fn add_dependent(&mut self, precedent: EvalKey, dependent: EvalKey) {
        self.dependents.entry(precedent).or_default().insert(dependent);
    }

    pub fn remove_dependent(&mut self, precedent: &EvalKey, dependent: &EvalKey) {
        if let Some(set) = self.dependents.get_mut(precedent) {
            set.remove(dependent);
            if set.is_empty() {
                self.dependents.remove(precedent);
            }
        }
    }

    pub fn add_area_dependent(&mut self, area: AreaRef, dependent: EvalKey) {
        self.area_dependents.entry(area).or_default().insert(dependent);
    }

    pub fn remove_area_dependent(&mut self, area: &AreaRef, dependent: &EvalKey) {
        if let Some(set) = self.area_dependents.get_mut(area) {
            set.remove(dependent);
            if set.is_empty() {
                self.area_dependents.remove(area);
            }
        }
    }

    /// Keys that read `key` directly or through an area covering it
    pub fn dependents_of(&self, key: &EvalKey) -> Vec<EvalKey> {
        let mut result: Vec<EvalKey> = self
            .dependents
            .get(key)
            .into_iter()
            .flat_map(|set| set.iter().cloned())
            .collect();
        if let EvalKey::Cell(cell) = key {
            for (area, set) in &self.area_dependents {
                if area.contains(cell) {
                    result.extend(set.iter().cloned());
                }
            }
        }
        result
    }

    /// Every key in this workbook that something else depends on
    pub fn precedent_keys(&self) -> impl Iterator<Item = &EvalKey> {
        self.dependents.keys()
    }

    /// Every key that depends on something in this workbook
    pub fn all_dependents(&self) -> AHashSet<EvalKey> {
        self.dependents
            .values()
            .chain(self.area_dependents.values())
            .flat_map(|set| set.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries holding a clean value
    pub fn clean_count(&self) -> usize {
        self.entries.values().filter(|e| !e.is_dirty()).count()
    }

    /// Forget all entries and edges
    pub fn clear(&mut self) {
        self.entries.clear();
        self.dependents.clear();
        self.area_dependents.clear();
    }
}
