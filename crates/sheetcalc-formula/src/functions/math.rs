//! Math and aggregate functions

use super::{collect_numbers, FunctionContext};
use crate::coercion::to_number;
use crate::error::FormulaResult;
use crate::value::Value;
use sheetcalc_core::ErrorCode;

/// SUM function
pub fn fn_sum(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    Ok(match collect_numbers(args, fctx)? {
        Ok(numbers) => Value::Number(numbers.iter().sum()),
        Err(e) => Value::Error(e),
    })
}

/// AVERAGE function
pub fn fn_average(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    Ok(match collect_numbers(args, fctx)? {
        Ok(numbers) if numbers.is_empty() => Value::Error(ErrorCode::Div0),
        Ok(numbers) => Value::Number(numbers.iter().sum::<f64>() / numbers.len() as f64),
        Err(e) => Value::Error(e),
    })
}

/// MIN function
pub fn fn_min(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    Ok(match collect_numbers(args, fctx)? {
        Ok(numbers) => Value::Number(numbers.into_iter().reduce(f64::min).unwrap_or(0.0)),
        Err(e) => Value::Error(e),
    })
}

/// MAX function
pub fn fn_max(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    Ok(match collect_numbers(args, fctx)? {
        Ok(numbers) => Value::Number(numbers.into_iter().reduce(f64::max).unwrap_or(0.0)),
        Err(e) => Value::Error(e),
    })
}

/// COUNT function
///
/// Counts numbers in referenced cells, and any direct argument that
/// converts to a number.
pub fn fn_count(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    let mut count = 0usize;
    for arg in args {
        if arg.is_reference() {
            count += fctx
                .values(arg)?
                .iter()
                .filter(|v| matches!(v, Value::Number(_)))
                .count();
        } else if to_number(arg).is_ok() {
            count += 1;
        }
    }
    Ok(Value::Number(count as f64))
}

/// COUNTA function
pub fn fn_counta(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    let mut count = 0usize;
    for arg in args {
        count += fctx
            .values(arg)?
            .iter()
            .filter(|v| !matches!(v, Value::Blank))
            .count();
    }
    Ok(Value::Number(count as f64))
}

/// ABS function
pub fn fn_abs(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    let value = fctx.scalar(&args[0])?;
    Ok(match to_number(&value) {
        Ok(n) => Value::Number(n.abs()),
        Err(e) => Value::Error(e),
    })
}
