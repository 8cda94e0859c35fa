//! Defined names
//!
//! A defined name maps an identifier to a token sequence. The sequence is
//! usually a single reference (`Sheet1!$A$2:$A$4`) but can be a constant
//! (`3.14`) or a full expression (`SUM(Sheet1!$A$1:$A$3)`); the evaluator
//! treats all of them like a cell formula.

use crate::error::{Error, Result};
use crate::formula::Formula;
use ahash::AHashMap;

/// Scope of a defined name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameScope {
    /// Visible from every sheet
    Workbook,
    /// Visible from one sheet only, shadowing a workbook name
    Sheet(usize),
}

/// A defined name
#[derive(Debug, Clone)]
pub struct NamedRange {
    /// Names are case-insensitive
    pub name: String,
    pub scope: NameScope,
    /// Definition in postfix order
    pub refers_to: Formula,
}

impl NamedRange {
    pub fn new(name: impl Into<String>, refers_to: Formula, scope: NameScope) -> Self {
        Self {
            name: name.into(),
            scope,
            refers_to,
        }
    }

    pub fn workbook_scope(name: impl Into<String>, refers_to: Formula) -> Self {
        Self::new(name, refers_to, NameScope::Workbook)
    }

    pub fn sheet_scope(name: impl Into<String>, refers_to: Formula, sheet_index: usize) -> Self {
        Self::new(name, refers_to, NameScope::Sheet(sheet_index))
    }
}

/// Defined names with case-insensitive, scope-aware lookup
#[derive(Debug, Default, Clone)]
pub struct NamedRangeCollection {
    ranges: AHashMap<(String, NameScope), NamedRange>,
}

impl NamedRangeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str, scope: NameScope) -> (String, NameScope) {
        (name.to_lowercase(), scope)
    }

    /// Define a new name; fails if the name already exists in that scope
    pub fn define(&mut self, range: NamedRange) -> Result<()> {
        validate_name(&range.name)?;
        let key = Self::key(&range.name, range.scope);
        if self.ranges.contains_key(&key) {
            return Err(Error::InvalidName(format!(
                "'{}' already exists in this scope",
                range.name
            )));
        }
        self.ranges.insert(key, range);
        Ok(())
    }

    /// Define or replace a name, returning the previous definition
    pub fn define_or_update(&mut self, range: NamedRange) -> Result<Option<NamedRange>> {
        validate_name(&range.name)?;
        let key = Self::key(&range.name, range.scope);
        Ok(self.ranges.insert(key, range))
    }

    /// Resolve a name as seen from a sheet: sheet scope first, then workbook
    pub fn get(&self, name: &str, current_sheet: usize) -> Option<&NamedRange> {
        self.get_exact(name, NameScope::Sheet(current_sheet))
            .or_else(|| self.get_exact(name, NameScope::Workbook))
    }

    pub fn get_exact(&self, name: &str, scope: NameScope) -> Option<&NamedRange> {
        self.ranges.get(&Self::key(name, scope))
    }

    pub fn remove(&mut self, name: &str, scope: NameScope) -> Option<NamedRange> {
        self.ranges.remove(&Self::key(name, scope))
    }

    pub fn contains(&self, name: &str, scope: NameScope) -> bool {
        self.ranges.contains_key(&Self::key(name, scope))
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedRange> {
        self.ranges.values()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_' || c == '\\');
    if !valid_start || !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return Err(Error::InvalidName(format!("'{}' is not a valid name", name)));
    }
    Ok(())
}
