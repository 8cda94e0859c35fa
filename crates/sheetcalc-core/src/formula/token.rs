//! Formula tokens in evaluation (postfix) order

use crate::cell::{CellAddress, CellRange, ErrorCode, SharedString};
use std::fmt;

/// A sheet qualifier on a reference, optionally inside another workbook
///
/// `Sheet2!A1` has `book: None`; `[other.xls]Sheet1!A1` names the linked
/// workbook it must be resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetRef {
    pub book: Option<String>,
    pub sheet: String,
}

impl SheetRef {
    pub fn local<S: Into<String>>(sheet: S) -> Self {
        Self {
            book: None,
            sheet: sheet.into(),
        }
    }

    pub fn external<B: Into<String>, S: Into<String>>(book: B, sheet: S) -> Self {
        Self {
            book: Some(book.into()),
            sheet: sheet.into(),
        }
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plain = self.sheet.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.')
            && self
                .book
                .as_deref()
                .map_or(true, |b| !b.contains(['\'', ' ']));
        let body = match &self.book {
            Some(book) => format!("[{}]{}", book, self.sheet),
            None => self.sheet.clone(),
        };
        if plain {
            write!(f, "{}!", body)
        } else {
            write!(f, "'{}'!", body.replace('\'', "''"))
        }
    }
}

/// Prefix and postfix unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Percent,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Text
    Concat,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Concat => "&",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterEqual
        )
    }
}

/// One element of a postfix formula
///
/// Operands push a value, operators and function calls pop their arity's
/// worth of operands and push one result.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Literals ===
    Number(f64),
    Text(SharedString),
    Bool(bool),
    Error(ErrorCode),
    /// An omitted function argument, as in `IF(1,,)`
    MissingArg,

    // === References ===
    /// Single cell, on the formula's own sheet unless qualified
    Ref {
        sheet: Option<SheetRef>,
        address: CellAddress,
    },
    /// Rectangular area, on the formula's own sheet unless qualified
    Area {
        sheet: Option<SheetRef>,
        range: CellRange,
    },
    /// Defined name
    Name(String),
    /// Reference invalidated by a structural edit (`#REF!`)
    RefErr,
    /// Area invalidated by a structural edit
    AreaErr,
    /// 3-D reference whose target was deleted
    DeletedRef3d(SheetRef),
    /// 3-D area whose target was deleted
    DeletedArea3d(SheetRef),

    // === Operators ===
    Unary(UnaryOperator),
    Binary(BinaryOperator),
    /// Explicit parentheses; no effect on evaluation
    Paren,

    // === Calls ===
    /// Call of a function with a fixed number of stacked operands
    Func { name: String, arity: usize },
    /// Optimized `SUM` over the preceding `n` operands
    AttrSum(usize),
}

impl Token {
    /// Unqualified relative cell reference
    pub fn cell(row: u32, col: u16) -> Self {
        Token::Ref {
            sheet: None,
            address: CellAddress::new(row, col),
        }
    }

    pub fn func<S: AsRef<str>>(name: S, arity: usize) -> Self {
        Token::Func {
            name: name.as_ref().to_ascii_uppercase(),
            arity,
        }
    }

    /// Number of operands consumed from the stack
    pub fn operand_count(&self) -> usize {
        match self {
            Token::Unary(_) | Token::Paren => 1,
            Token::Binary(_) => 2,
            Token::Func { arity, .. } => *arity,
            Token::AttrSum(n) => *n,
            _ => 0,
        }
    }

    /// Whether the token pushes a value without consuming any
    pub fn is_operand(&self) -> bool {
        !matches!(
            self,
            Token::Unary(_)
                | Token::Binary(_)
                | Token::Paren
                | Token::Func { .. }
                | Token::AttrSum(_)
        )
    }
}
