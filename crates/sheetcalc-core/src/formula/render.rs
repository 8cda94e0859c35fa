//! Postfix to infix rendering

use super::token::{Token, UnaryOperator};

/// Render tokens as infix text
///
/// Parentheses come only from `Paren` tokens. Missing operands render as
/// empty text so that malformed sequences still produce something readable.
pub(crate) fn render(tokens: &[Token]) -> String {
    let mut stack: Vec<String> = Vec::with_capacity(tokens.len());

    for token in tokens {
        let text = match token {
            Token::Number(n) => format!("{}", n),
            Token::Text(s) => format!("\"{}\"", s.as_str().replace('"', "\"\"")),
            Token::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Token::Error(e) => e.as_str().to_string(),
            Token::MissingArg => String::new(),
            Token::Ref { sheet, address } => match sheet {
                Some(sheet) => format!("{}{}", sheet, address),
                None => address.to_a1_string(),
            },
            Token::Area { sheet, range } => {
                let range = if range.is_single_cell() {
                    format!("{}:{}", range.start, range.end)
                } else {
                    range.to_a1_string()
                };
                match sheet {
                    Some(sheet) => format!("{}{}", sheet, range),
                    None => range,
                }
            }
            Token::Name(name) => name.clone(),
            Token::RefErr | Token::AreaErr => "#REF!".to_string(),
            Token::DeletedRef3d(sheet) | Token::DeletedArea3d(sheet) => {
                format!("{}#REF!", sheet)
            }
            Token::Unary(op) => {
                let operand = stack.pop().unwrap_or_default();
                match op {
                    UnaryOperator::Plus => format!("+{}", operand),
                    UnaryOperator::Minus => format!("-{}", operand),
                    UnaryOperator::Percent => format!("{}%", operand),
                }
            }
            Token::Binary(op) => {
                let right = stack.pop().unwrap_or_default();
                let left = stack.pop().unwrap_or_default();
                format!("{}{}{}", left, op.symbol(), right)
            }
            Token::Paren => format!("({})", stack.pop().unwrap_or_default()),
            Token::Func { name, arity } => {
                let args = pop_args(&mut stack, *arity);
                format!("{}({})", name, args.join(","))
            }
            Token::AttrSum(n) => {
                let args = pop_args(&mut stack, *n);
                format!("SUM({})", args.join(","))
            }
        };
        stack.push(text);
    }

    // Leftover operands are joined so nothing silently disappears
    stack.join(" ")
}

fn pop_args(stack: &mut Vec<String>, count: usize) -> Vec<String> {
    let split = stack.len().saturating_sub(count);
    let mut args = stack.split_off(split);
    while args.len() < count {
        args.insert(0, String::new());
    }
    args
}
