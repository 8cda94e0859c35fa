//! Evaluation values

use crate::dependency::{AreaRef, CellKey};
use sheetcalc_core::{CellType, CellValue, ErrorCode, SharedString};
use std::fmt;

/// A value on the evaluation stack
///
/// References are carried undereferenced so that functions taking ranges
/// can iterate them; operators dereference them at the point of use.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(SharedString),
    Boolean(bool),
    Error(ErrorCode),
    /// Empty cell, or the result of a formula that yields nothing
    Blank,
    /// Omitted function argument
    MissingArg,
    /// Single cell reference
    CellRef(CellKey),
    /// Rectangular area reference
    AreaRef(AreaRef),
}

impl Value {
    pub fn text<S: AsRef<str>>(s: S) -> Self {
        Value::Text(SharedString::new(s))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Value::CellRef(_) | Value::AreaRef(_))
    }

    pub fn error(&self) -> Option<ErrorCode> {
        match self {
            Value::Error(e) => Some(*e),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert a scalar result into what a cell stores
    ///
    /// References have no literal form and become `#VALUE!`.
    pub fn to_cell_value(&self) -> CellValue {
        match self {
            Value::Number(n) => CellValue::Number(*n),
            Value::Text(s) => CellValue::String(s.clone()),
            Value::Boolean(b) => CellValue::Boolean(*b),
            Value::Error(e) => CellValue::Error(*e),
            Value::Blank | Value::MissingArg => CellValue::Empty,
            Value::CellRef(_) | Value::AreaRef(_) => CellValue::Error(ErrorCode::Value),
        }
    }

    /// Type tag a cell holding this result reports
    pub fn cell_type(&self) -> CellType {
        self.to_cell_value().cell_type()
    }
}

impl From<&CellValue> for Value {
    /// Literal contents map directly; a formula cell contributes its cached result
    fn from(value: &CellValue) -> Self {
        match value.effective_value() {
            CellValue::Empty => Value::Blank,
            CellValue::Number(n) => Value::Number(*n),
            CellValue::String(s) => Value::Text(s.clone()),
            CellValue::Boolean(b) => Value::Boolean(*b),
            CellValue::Error(e) => Value::Error(*e),
            CellValue::Formula { .. } => Value::Blank,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<ErrorCode> for Value {
    fn from(e: ErrorCode) -> Self {
        Value::Error(e)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&crate::coercion::format_number(*n)),
            Value::Text(s) => f.write_str(s.as_str()),
            Value::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Value::Error(e) => write!(f, "{}", e),
            Value::Blank | Value::MissingArg => Ok(()),
            Value::CellRef(key) => write!(f, "{}", key),
            Value::AreaRef(area) => write!(f, "{}", area),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetcalc_core::Formula;

    #[test]
    fn test_from_cell_value_uses_cached_formula_result() {
        let formula = Formula::builder().number(1.0).build().unwrap();
        let uncached = CellValue::formula(formula.clone());
        assert_eq!(Value::from(&uncached), Value::Blank);

        let cached = CellValue::Formula {
            formula,
            cached: Some(Box::new(CellValue::string("x"))),
        };
        assert_eq!(Value::from(&cached), Value::text("x"));
    }

    #[test]
    fn test_to_cell_value() {
        assert_eq!(Value::MissingArg.to_cell_value(), CellValue::Empty);
        assert_eq!(Value::Number(2.5).cell_type(), CellType::Numeric);
        assert_eq!(
            Value::Error(ErrorCode::CircularRef).to_cell_value(),
            CellValue::Error(ErrorCode::CircularRef)
        );
    }
}
