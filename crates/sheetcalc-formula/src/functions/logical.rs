//! Logical functions

use super::FunctionContext;
use crate::coercion::to_bool;
use crate::error::FormulaResult;
use crate::value::Value;
use sheetcalc_core::ErrorCode;

/// An argument handed back as a result; an omitted one is blank
fn passthrough(value: &Value) -> Value {
    match value {
        Value::MissingArg => Value::Blank,
        other => other.clone(),
    }
}

/// IF(condition, value_if_true, [value_if_false])
///
/// The chosen branch is returned as-is, so `IF(x, A1:A3)` can feed a range
/// into an enclosing function.
pub fn fn_if(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    let condition = fctx.scalar(&args[0])?;
    let condition = match to_bool(&condition) {
        Ok(b) => b,
        Err(e) => return Ok(Value::Error(e)),
    };

    Ok(if condition {
        passthrough(&args[1])
    } else {
        args.get(2).map_or(Value::Boolean(false), passthrough)
    })
}

/// NOT(logical)
pub fn fn_not(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    let value = fctx.scalar(&args[0])?;
    Ok(match to_bool(&value) {
        Ok(b) => Value::Boolean(!b),
        Err(e) => Value::Error(e),
    })
}

/// Truth values from AND/OR arguments
///
/// Text in referenced cells is skipped; a direct text argument must spell
/// a boolean. `Err` carries the first error met.
fn collect_bools(
    args: &[Value],
    fctx: &mut FunctionContext<'_>,
) -> FormulaResult<Result<Vec<bool>, ErrorCode>> {
    let mut bools = Vec::new();
    for arg in args {
        if arg.is_reference() {
            for value in fctx.values(arg)? {
                match value {
                    Value::Boolean(b) => bools.push(b),
                    Value::Number(n) => bools.push(n != 0.0),
                    Value::Error(e) => return Ok(Err(e)),
                    _ => {}
                }
            }
        } else {
            match to_bool(arg) {
                Ok(b) => bools.push(b),
                Err(e) => return Ok(Err(e)),
            }
        }
    }
    Ok(Ok(bools))
}

/// AND(logical1, ...)
pub fn fn_and(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    Ok(match collect_bools(args, fctx)? {
        Ok(bools) if bools.is_empty() => Value::Error(ErrorCode::Value),
        Ok(bools) => Value::Boolean(bools.into_iter().all(|b| b)),
        Err(e) => Value::Error(e),
    })
}

/// OR(logical1, ...)
pub fn fn_or(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    Ok(match collect_bools(args, fctx)? {
        Ok(bools) if bools.is_empty() => Value::Error(ErrorCode::Value),
        Ok(bools) => Value::Boolean(bools.into_iter().any(|b| b)),
        Err(e) => Value::Error(e),
    })
}

/// TRUE()
pub fn fn_true(_args: &[Value], _fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    Ok(Value::Boolean(true))
}

/// FALSE()
pub fn fn_false(_args: &[Value], _fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    Ok(Value::Boolean(false))
}

/// IFERROR(value, value_if_error)
pub fn fn_iferror(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    let value = fctx.scalar(&args[0])?;
    Ok(if value.is_error() {
        passthrough(&args[1])
    } else {
        passthrough(&value)
    })
}
