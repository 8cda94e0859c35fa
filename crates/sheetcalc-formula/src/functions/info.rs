//! Information functions

use super::FunctionContext;
use crate::error::FormulaResult;
use crate::value::Value;

/// ISBLANK(value)
pub fn fn_isblank(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    let v = fctx.scalar(&args[0])?;
    Ok(Value::Boolean(matches!(v, Value::Blank)))
}

/// ISNUMBER(value)
pub fn fn_isnumber(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    let v = fctx.scalar(&args[0])?;
    Ok(Value::Boolean(matches!(v, Value::Number(_))))
}

/// ISTEXT(value)
pub fn fn_istext(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    let v = fctx.scalar(&args[0])?;
    Ok(Value::Boolean(matches!(v, Value::Text(_))))
}

/// ISERROR(value)
pub fn fn_iserror(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    let v = fctx.scalar(&args[0])?;
    Ok(Value::Boolean(v.is_error()))
}
