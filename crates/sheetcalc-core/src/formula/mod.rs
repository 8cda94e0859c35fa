//! Formula token sequences
//!
//! A [`Formula`] is an immutable, cheaply clonable postfix sequence of
//! [`Token`]s. It is owned by the cell (or defined name) that holds it;
//! evaluation only ever reads it.
//!
//! Formula text is never parsed here. Sequences are produced by a host's
//! parser or assembled with [`FormulaBuilder`]:
//!
//! ```rust
//! use sheetcalc_core::Formula;
//!
//! // IF(A1=1,B1,C1)
//! let formula = Formula::builder()
//!     .cell("A1")
//!     .number(1.0)
//!     .eq()
//!     .cell("B1")
//!     .cell("C1")
//!     .func("IF", 3)
//!     .build()
//!     .unwrap();
//! assert_eq!(formula.to_formula_string(), "IF(A1=1,B1,C1)");
//! ```

mod render;
mod token;

pub use token::{BinaryOperator, SheetRef, Token, UnaryOperator};

use crate::cell::{CellAddress, CellRange, ErrorCode, SharedString};
use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Immutable postfix token sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Formula(Arc<[Token]>);

impl Formula {
    pub fn new(tokens: Vec<Token>) -> Self {
        Formula(tokens.into())
    }

    pub fn builder() -> FormulaBuilder {
        FormulaBuilder::default()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render the sequence as infix formula text, without the leading `=`
    ///
    /// Rendering is lenient: a malformed sequence renders as far as it can.
    /// Only the evaluator rejects malformed sequences.
    pub fn to_formula_string(&self) -> String {
        render::render(&self.0)
    }

    /// Whether two handles share the same token storage
    pub fn ptr_eq(&self, other: &Formula) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Vec<Token>> for Formula {
    fn from(tokens: Vec<Token>) -> Self {
        Formula::new(tokens)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_formula_string())
    }
}

/// Fluent construction of postfix token sequences
///
/// Address parse failures are remembered and reported by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct FormulaBuilder {
    tokens: Vec<Token>,
    error: Option<Error>,
}

impl FormulaBuilder {
    pub fn token(mut self, token: Token) -> Self {
        self.tokens.push(token);
        self
    }

    pub fn build(self) -> Result<Formula> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(Formula::new(self.tokens)),
        }
    }

    // === Literals ===

    pub fn number(self, n: f64) -> Self {
        self.token(Token::Number(n))
    }

    pub fn text<S: AsRef<str>>(self, s: S) -> Self {
        self.token(Token::Text(SharedString::new(s)))
    }

    pub fn boolean(self, b: bool) -> Self {
        self.token(Token::Bool(b))
    }

    pub fn error(self, code: ErrorCode) -> Self {
        self.token(Token::Error(code))
    }

    pub fn missing_arg(self) -> Self {
        self.token(Token::MissingArg)
    }

    // === References ===

    pub fn cell(self, address: &str) -> Self {
        self.reference(None, address)
    }

    pub fn area(self, range: &str) -> Self {
        self.area_reference(None, range)
    }

    pub fn sheet_cell(self, sheet: &str, address: &str) -> Self {
        self.reference(Some(SheetRef::local(sheet)), address)
    }

    pub fn sheet_area(self, sheet: &str, range: &str) -> Self {
        self.area_reference(Some(SheetRef::local(sheet)), range)
    }

    /// `[book]sheet!address`
    pub fn external_cell(self, book: &str, sheet: &str, address: &str) -> Self {
        self.reference(Some(SheetRef::external(book, sheet)), address)
    }

    /// `[book]sheet!range`
    pub fn external_area(self, book: &str, sheet: &str, range: &str) -> Self {
        self.area_reference(Some(SheetRef::external(book, sheet)), range)
    }

    pub fn name<S: Into<String>>(self, name: S) -> Self {
        self.token(Token::Name(name.into()))
    }

    pub fn ref_error(self) -> Self {
        self.token(Token::RefErr)
    }

    pub fn area_error(self) -> Self {
        self.token(Token::AreaErr)
    }

    pub fn deleted_ref(self, sheet: SheetRef) -> Self {
        self.token(Token::DeletedRef3d(sheet))
    }

    pub fn deleted_area(self, sheet: SheetRef) -> Self {
        self.token(Token::DeletedArea3d(sheet))
    }

    fn reference(mut self, sheet: Option<SheetRef>, address: &str) -> Self {
        match CellAddress::parse(address) {
            Ok(address) => self.token(Token::Ref { sheet, address }),
            Err(e) => {
                self.error.get_or_insert(e);
                self
            }
        }
    }

    fn area_reference(mut self, sheet: Option<SheetRef>, range: &str) -> Self {
        match CellRange::parse(range) {
            Ok(range) => self.token(Token::Area { sheet, range }),
            Err(e) => {
                self.error.get_or_insert(e);
                self
            }
        }
    }

    // === Operators ===

    pub fn binary(self, op: BinaryOperator) -> Self {
        self.token(Token::Binary(op))
    }

    pub fn unary(self, op: UnaryOperator) -> Self {
        self.token(Token::Unary(op))
    }

    pub fn add(self) -> Self {
        self.binary(BinaryOperator::Add)
    }

    pub fn sub(self) -> Self {
        self.binary(BinaryOperator::Subtract)
    }

    pub fn mul(self) -> Self {
        self.binary(BinaryOperator::Multiply)
    }

    pub fn div(self) -> Self {
        self.binary(BinaryOperator::Divide)
    }

    pub fn pow(self) -> Self {
        self.binary(BinaryOperator::Power)
    }

    pub fn concat(self) -> Self {
        self.binary(BinaryOperator::Concat)
    }

    pub fn eq(self) -> Self {
        self.binary(BinaryOperator::Equal)
    }

    pub fn ne(self) -> Self {
        self.binary(BinaryOperator::NotEqual)
    }

    pub fn lt(self) -> Self {
        self.binary(BinaryOperator::LessThan)
    }

    pub fn le(self) -> Self {
        self.binary(BinaryOperator::LessEqual)
    }

    pub fn gt(self) -> Self {
        self.binary(BinaryOperator::GreaterThan)
    }

    pub fn ge(self) -> Self {
        self.binary(BinaryOperator::GreaterEqual)
    }

    pub fn plus(self) -> Self {
        self.unary(UnaryOperator::Plus)
    }

    pub fn neg(self) -> Self {
        self.unary(UnaryOperator::Minus)
    }

    pub fn percent(self) -> Self {
        self.unary(UnaryOperator::Percent)
    }

    pub fn paren(self) -> Self {
        self.token(Token::Paren)
    }

    // === Calls ===

    pub fn func(self, name: &str, arity: usize) -> Self {
        self.token(Token::func(name, arity))
    }

    /// Optimized single-operand `SUM`
    pub fn attr_sum(self) -> Self {
        self.token(Token::AttrSum(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_reports_bad_address() {
        let result = Formula::builder().cell("A0").number(1.0).add().build();
        assert!(matches!(result, Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_clones_share_tokens() {
        let formula = Formula::builder().number(42.0).attr_sum().build().unwrap();
        let copy = formula.clone();
        assert!(formula.ptr_eq(&copy));
        assert_eq!(copy.tokens(), &[Token::Number(42.0), Token::AttrSum(1)]);
    }
}
