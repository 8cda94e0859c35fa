//! Stored cell contents and spreadsheet error codes

use crate::formula::Formula;
use std::fmt;
use std::sync::Arc;

/// What a cell holds in storage
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// No content
    #[default]
    Empty,

    Boolean(bool),

    /// All numbers, dates included, are f64
    Number(f64),

    String(SharedString),

    /// A literal error constant typed into the cell
    Error(ErrorCode),

    /// A formula together with the last result written back by an evaluator
    Formula {
        /// Postfix token sequence; never mutated by evaluation
        formula: Formula,
        /// Result stored by `evaluate_formula_cell`/`evaluate_all`, if any
        cached: Option<Box<CellValue>>,
    },
}

impl CellValue {
    pub fn string<S: Into<String>>(s: S) -> Self {
        CellValue::String(SharedString::new(s.into()))
    }

    /// A formula cell with no cached result yet
    pub fn formula(formula: Formula) -> Self {
        CellValue::Formula {
            formula,
            cached: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    /// The token sequence if this is a formula cell
    pub fn as_formula(&self) -> Option<&Formula> {
        match self {
            CellValue::Formula { formula, .. } => Some(formula),
            _ => None,
        }
    }

    /// The cached result of a formula cell
    pub fn cached_value(&self) -> Option<&CellValue> {
        match self {
            CellValue::Formula { cached, .. } => cached.as_deref(),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.effective_value() {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.effective_value() {
            CellValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self.effective_value() {
            CellValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<ErrorCode> {
        match self.effective_value() {
            CellValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Cached result for formulas (blank if never evaluated), the value itself otherwise
    pub fn effective_value(&self) -> &CellValue {
        match self {
            CellValue::Formula {
                cached: Some(v), ..
            } => v.effective_value(),
            CellValue::Formula { cached: None, .. } => &CellValue::Empty,
            _ => self,
        }
    }

    pub fn cell_type(&self) -> CellType {
        match self {
            CellValue::Empty => CellType::Blank,
            CellValue::Boolean(_) => CellType::Boolean,
            CellValue::Number(_) => CellType::Numeric,
            CellValue::String(_) => CellType::Text,
            CellValue::Error(_) => CellType::Error,
            CellValue::Formula { .. } => CellType::Formula,
        }
    }

    /// Type of the cached result; `None` for non-formula cells
    pub fn cached_result_type(&self) -> Option<CellType> {
        match self {
            CellValue::Formula { cached, .. } => Some(
                cached
                    .as_deref()
                    .map(CellValue::cell_type)
                    .unwrap_or(CellType::Blank),
            ),
            _ => None,
        }
    }

    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        self.cell_type().name()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::String(s) => f.write_str(s.as_str()),
            CellValue::Error(e) => write!(f, "{}", e),
            CellValue::Formula {
                cached: Some(v), ..
            } => write!(f, "{}", v),
            CellValue::Formula { formula, .. } => write!(f, "={}", formula),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::string(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::string(s)
    }
}

impl From<ErrorCode> for CellValue {
    fn from(e: ErrorCode) -> Self {
        CellValue::Error(e)
    }
}

impl From<Formula> for CellValue {
    fn from(formula: Formula) -> Self {
        CellValue::formula(formula)
    }
}

/// Kind of content a cell holds, or of a formula's cached result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellType {
    Blank,
    Numeric,
    Text,
    Boolean,
    Error,
    Formula,
}

impl CellType {
    pub fn name(&self) -> &'static str {
        match self {
            CellType::Blank => "blank",
            CellType::Numeric => "numeric",
            CellType::Text => "text",
            CellType::Boolean => "boolean",
            CellType::Error => "error",
            CellType::Formula => "formula",
        }
    }
}

/// Spreadsheet error values
///
/// A closed set: every coercion failure or unresolved reference maps to one
/// of these, and they travel through evaluation as ordinary values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    /// #NULL! - empty intersection
    Null,
    /// #DIV/0! - division by zero
    Div0,
    /// #VALUE! - wrong type of operand
    Value,
    /// #REF! - invalid or deleted reference
    Ref,
    /// #NAME? - unknown name, function or workbook
    Name,
    /// #NUM! - numeric result out of range
    Num,
    /// #N/A - value not available
    Na,
    /// A formula that (transitively) depends on itself
    CircularRef,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 8] = [
        ErrorCode::Null,
        ErrorCode::Div0,
        ErrorCode::Value,
        ErrorCode::Ref,
        ErrorCode::Name,
        ErrorCode::Num,
        ErrorCode::Na,
        ErrorCode::CircularRef,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Null => "#NULL!",
            ErrorCode::Div0 => "#DIV/0!",
            ErrorCode::Value => "#VALUE!",
            ErrorCode::Ref => "#REF!",
            ErrorCode::Name => "#NAME?",
            ErrorCode::Num => "#NUM!",
            ErrorCode::Na => "#N/A",
            ErrorCode::CircularRef => "~CIRCULAR~REF~",
        }
    }

    /// Parse the display text of an error (case-insensitive)
    pub fn from_text(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// BIFF error code; the circular marker uses the out-of-band value -60
    pub fn code(&self) -> i32 {
        match self {
            ErrorCode::Null => 0x00,
            ErrorCode::Div0 => 0x07,
            ErrorCode::Value => 0x0F,
            ErrorCode::Ref => 0x17,
            ErrorCode::Name => 0x1D,
            ErrorCode::Num => 0x24,
            ErrorCode::Na => 0x2A,
            ErrorCode::CircularRef => -60,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable reference-counted text shared between cells and results
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SharedString(Arc<str>);

impl SharedString {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        SharedString(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SharedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedString {
    fn from(s: &str) -> Self {
        SharedString::new(s)
    }
}

impl From<String> for SharedString {
    fn from(s: String) -> Self {
        SharedString(Arc::from(s))
    }
}
