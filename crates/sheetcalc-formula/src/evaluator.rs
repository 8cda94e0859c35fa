//! Formula evaluator
//!
//! Runs a formula's postfix token sequence against an operand stack.
//! References are pushed unresolved and only dereferenced by the operators
//! that need scalars, so functions receive areas intact.

use crate::coercion::{compare, to_number, to_text};
use crate::context::EvaluationContext;
use crate::dependency::{AreaRef, CellKey};
use crate::environment::Environment;
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{self, FunctionContext};
use crate::value::Value;
use sheetcalc_core::{BinaryOperator, ErrorCode, Formula, Token, UnaryOperator};
use std::cmp::Ordering;

/// Evaluate `formula` at the position described by `ctx`
///
/// The result may still be a reference; callers that need a scalar pass
/// it through [`Environment::dereference`].
pub fn evaluate_formula(
    env: &mut Environment,
    formula: &Formula,
    ctx: &EvaluationContext,
) -> FormulaResult<Value> {
    let mut stack: Vec<Value> = Vec::with_capacity(formula.len());

    for token in formula.tokens() {
        let value = match token {
            Token::Number(n) => Value::Number(*n),
            Token::Text(s) => Value::Text(s.clone()),
            Token::Bool(b) => Value::Boolean(*b),
            Token::Error(e) => Value::Error(*e),
            Token::MissingArg => Value::MissingArg,

            Token::Ref { sheet, address } => match env.resolve_sheet(ctx, sheet.as_ref())? {
                Ok((book, sheet)) => Value::CellRef(CellKey::from_address(book, sheet, address)),
                Err(value) => value,
            },
            Token::Area { sheet, range } => match env.resolve_sheet(ctx, sheet.as_ref())? {
                Ok((book, sheet)) => Value::AreaRef(AreaRef::new(book, sheet, range)),
                Err(value) => value,
            },
            Token::Name(name) => env.name_value(ctx, name)?,
            Token::RefErr | Token::AreaErr | Token::DeletedRef3d(_) | Token::DeletedArea3d(_) => {
                Value::Error(ErrorCode::Ref)
            }

            Token::Unary(op) => {
                let operand = pop(&mut stack, formula)?;
                let operand = env.dereference(&operand, ctx)?;
                evaluate_unary(*op, &operand)
            }
            Token::Binary(op) => {
                let right = pop(&mut stack, formula)?;
                let left = pop(&mut stack, formula)?;
                let left = env.dereference(&left, ctx)?;
                let right = env.dereference(&right, ctx)?;
                evaluate_binary(*op, &left, &right)
            }
            Token::Paren => pop(&mut stack, formula)?,

            Token::Func { name, arity } => {
                let args = pop_args(&mut stack, *arity, formula)?;
                call_function(env, ctx, name, &args)?
            }
            Token::AttrSum(count) => {
                let args = pop_args(&mut stack, *count, formula)?;
                functions::math::fn_sum(&args, &mut FunctionContext::new(env, ctx))?
            }
        };
        stack.push(value);
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(value), true) => Ok(value),
        (None, _) => Err(FormulaError::MalformedFormula(format!(
            "'{}' produced no value",
            formula
        ))),
        (Some(_), false) => Err(FormulaError::MalformedFormula(format!(
            "'{}' left {} values on the stack",
            formula,
            stack.len() + 1
        ))),
    }
}

fn pop(stack: &mut Vec<Value>, formula: &Formula) -> FormulaResult<Value> {
    stack
        .pop()
        .ok_or_else(|| FormulaError::MalformedFormula(format!("stack underflow in '{}'", formula)))
}

/// Pop `count` operands, first argument first
fn pop_args(stack: &mut Vec<Value>, count: usize, formula: &Formula) -> FormulaResult<Vec<Value>> {
    if stack.len() < count {
        return Err(FormulaError::MalformedFormula(format!(
            "stack underflow in '{}'",
            formula
        )));
    }
    Ok(stack.split_off(stack.len() - count))
}

fn call_function(
    env: &mut Environment,
    ctx: &EvaluationContext,
    name: &str,
    args: &[Value],
) -> FormulaResult<Value> {
    let Some(def) = env.functions().get(name).copied() else {
        log::debug!("unknown function {}", name);
        return Ok(Value::Error(ErrorCode::Name));
    };

    if args.len() < def.min_args || def.max_args.map_or(false, |max| args.len() > max) {
        log::debug!("{} called with {} arguments", def.name, args.len());
        return Ok(Value::Error(ErrorCode::Value));
    }

    (def.implementation)(args, &mut FunctionContext::new(env, ctx))
}

fn evaluate_unary(op: UnaryOperator, operand: &Value) -> Value {
    match (op, operand) {
        // Unary plus leaves text alone
        (UnaryOperator::Plus, Value::Text(_)) => operand.clone(),
        _ => match to_number(operand) {
            Ok(n) => match op {
                UnaryOperator::Plus => Value::Number(n),
                UnaryOperator::Minus => Value::Number(-n),
                UnaryOperator::Percent => Value::Number(n / 100.0),
            },
            Err(e) => Value::Error(e),
        },
    }
}

fn evaluate_binary(op: BinaryOperator, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOperator::Concat => match (to_text(left), to_text(right)) {
            (Ok(l), Ok(r)) => Value::text(l + &r),
            (Err(e), _) | (_, Err(e)) => Value::Error(e),
        },
        op if op.is_comparison() => {
            if let Some(e) = left.error().or_else(|| right.error()) {
                return Value::Error(e);
            }
            let ordering = compare(left, right);
            Value::Boolean(match op {
                BinaryOperator::Equal => ordering == Ordering::Equal,
                BinaryOperator::NotEqual => ordering != Ordering::Equal,
                BinaryOperator::LessThan => ordering == Ordering::Less,
                BinaryOperator::LessEqual => ordering != Ordering::Greater,
                BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
        op => {
            let (l, r) = match (to_number(left), to_number(right)) {
                (Ok(l), Ok(r)) => (l, r),
                (Err(e), _) | (_, Err(e)) => return Value::Error(e),
            };
            let result = match op {
                BinaryOperator::Add => l + r,
                BinaryOperator::Subtract => l - r,
                BinaryOperator::Multiply => l * r,
                BinaryOperator::Divide => {
                    if r == 0.0 {
                        return Value::Error(ErrorCode::Div0);
                    }
                    l / r
                }
                _ => l.powf(r),
            };
            if result.is_finite() {
                Value::Number(result)
            } else {
                Value::Error(ErrorCode::Num)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook_evaluator::EvaluatorOptions;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::{CellValue, Workbook};

    fn env_with(cells: &[(&str, CellValue)]) -> (Environment, EvaluationContext) {
        let mut wb = Workbook::new();
        let sheet = wb.worksheet_mut(0).unwrap();
        for (address, value) in cells {
            sheet.set_cell_value(address, value.clone()).unwrap();
        }
        let mut env = Environment::new(EvaluatorOptions::default());
        let book = env.add_book(None, wb).unwrap();
        // Evaluate as if from J10
        (env, EvaluationContext::new(book, 0, 9, 9))
    }

    fn eval(formula: Formula) -> Value {
        let (mut env, ctx) = env_with(&[]);
        evaluate_formula(&mut env, &formula, &ctx).unwrap()
    }

    #[test]
    fn test_evaluate_arithmetic() {
        let f = Formula::builder().number(1.0).number(2.0).number(3.0).mul().add().build().unwrap();
        assert_eq!(eval(f), Value::Number(7.0));

        let f = Formula::builder().number(2.0).number(10.0).pow().build().unwrap();
        assert_eq!(eval(f), Value::Number(1024.0));

        let f = Formula::builder().number(50.0).percent().neg().build().unwrap();
        assert_eq!(eval(f), Value::Number(-0.5));
    }

    #[test]
    fn test_evaluate_division_by_zero() {
        let f = Formula::builder().number(1.0).number(0.0).div().build().unwrap();
        assert_eq!(eval(f), Value::Error(ErrorCode::Div0));
    }

    #[test]
    fn test_non_finite_result_is_num_error() {
        let f = Formula::builder().number(-1.0).number(0.5).pow().build().unwrap();
        assert_eq!(eval(f), Value::Error(ErrorCode::Num));
    }

    #[test]
    fn test_first_error_wins() {
        let f = Formula::builder()
            .error(ErrorCode::Na)
            .error(ErrorCode::Div0)
            .add()
            .build()
            .unwrap();
        assert_eq!(eval(f), Value::Error(ErrorCode::Na));

        let f = Formula::builder()
            .text("x")
            .error(ErrorCode::Div0)
            .add()
            .build()
            .unwrap();
        assert_eq!(eval(f), Value::Error(ErrorCode::Value));
    }

    #[test]
    fn test_unary_plus_keeps_text() {
        let f = Formula::builder().text("abc").plus().build().unwrap();
        assert_eq!(eval(f), Value::text("abc"));

        let f = Formula::builder().text("abc").neg().build().unwrap();
        assert_eq!(eval(f), Value::Error(ErrorCode::Value));
    }

    #[test]
    fn test_concat_and_comparison() {
        let f = Formula::builder().text("Value: ").number(42.0).concat().build().unwrap();
        assert_eq!(eval(f), Value::text("Value: 42"));

        let f = Formula::builder().text("ABC").text("abc").eq().build().unwrap();
        assert_eq!(eval(f), Value::Boolean(true));

        let f = Formula::builder().text("1").number(1.0).eq().build().unwrap();
        assert_eq!(eval(f), Value::Boolean(false));

        let f = Formula::builder().boolean(true).number(5.0).gt().build().unwrap();
        assert_eq!(eval(f), Value::Boolean(true));
    }

    #[test]
    fn test_missing_args_in_expressions() {
        // 1+IF(1,,)
        let f = Formula::builder()
            .number(1.0)
            .number(1.0)
            .missing_arg()
            .missing_arg()
            .func("IF", 3)
            .add()
            .build()
            .unwrap();
        assert_eq!(eval(f), Value::Number(1.0));

        // "abc"&CHOOSE(2,5,,9)
        let f = Formula::builder()
            .text("abc")
            .number(2.0)
            .number(5.0)
            .missing_arg()
            .number(9.0)
            .func("CHOOSE", 4)
            .concat()
            .build()
            .unwrap();
        assert_eq!(eval(f), Value::text("abc"));
    }

    #[test]
    fn test_references_stay_unresolved_until_used() {
        let (mut env, ctx) = env_with(&[("A1", CellValue::Number(4.0))]);

        let f = Formula::builder().cell("A1").build().unwrap();
        let value = evaluate_formula(&mut env, &f, &ctx).unwrap();
        assert!(matches!(value, Value::CellRef(key) if key.row == 0 && key.col == 0));

        let f = Formula::builder().cell("A1").number(1.0).add().build().unwrap();
        assert_eq!(evaluate_formula(&mut env, &f, &ctx).unwrap(), Value::Number(5.0));
    }

    #[test]
    fn test_area_operand_uses_implicit_intersection() {
        let (mut env, ctx) = env_with(&[
            ("D10", CellValue::Number(8.0)),
            ("D11", CellValue::Number(9.0)),
        ]);

        let f = Formula::builder().area("D2:D20").number(1.0).add().build().unwrap();
        assert_eq!(evaluate_formula(&mut env, &f, &ctx).unwrap(), Value::Number(9.0));

        let f = Formula::builder().area("D11:D20").number(1.0).add().build().unwrap();
        assert_eq!(
            evaluate_formula(&mut env, &f, &ctx).unwrap(),
            Value::Error(ErrorCode::Value)
        );
    }

    #[test]
    fn test_reference_error_tokens() {
        let f = Formula::builder().ref_error().number(1.0).add().build().unwrap();
        assert_eq!(eval(f), Value::Error(ErrorCode::Ref));
    }

    #[test]
    fn test_unknown_function_and_bad_arity() {
        let f = Formula::builder().number(1.0).func("NOSUCHFN", 1).build().unwrap();
        assert_eq!(eval(f), Value::Error(ErrorCode::Name));

        let f = Formula::builder().func("ABS", 0).build().unwrap();
        assert_eq!(eval(f), Value::Error(ErrorCode::Value));
    }

    #[test]
    fn test_attr_sum() {
        let (mut env, ctx) = env_with(&[
            ("A1", CellValue::Number(2.0)),
            ("A2", CellValue::Number(5.0)),
        ]);
        let f = Formula::builder().area("A1:A2").attr_sum().build().unwrap();
        assert_eq!(evaluate_formula(&mut env, &f, &ctx).unwrap(), Value::Number(7.0));
    }

    #[test]
    fn test_malformed_formulas() {
        let (mut env, ctx) = env_with(&[]);

        let empty = Formula::new(vec![]);
        assert!(matches!(
            evaluate_formula(&mut env, &empty, &ctx),
            Err(FormulaError::MalformedFormula(_))
        ));

        let underflow = Formula::new(vec![Token::Number(1.0), Token::Binary(BinaryOperator::Add)]);
        assert!(matches!(
            evaluate_formula(&mut env, &underflow, &ctx),
            Err(FormulaError::MalformedFormula(_))
        ));
    }

    #[test]
    fn test_unknown_sheet_is_a_fault() {
        let f = Formula::builder().sheet_cell("Missing", "A1").build().unwrap();
        let (mut env, ctx) = env_with(&[]);
        assert!(matches!(
            evaluate_formula(&mut env, &f, &ctx),
            Err(FormulaError::SheetNotFound { .. })
        ));
    }
}
