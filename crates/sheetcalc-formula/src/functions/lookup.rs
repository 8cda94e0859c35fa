//! Lookup and reference functions

use super::FunctionContext;
use crate::coercion::to_number;
use crate::dependency::AreaRef;
use crate::error::FormulaResult;
use crate::value::Value;
use sheetcalc_core::{CellRange, ErrorCode, MAX_COLS, MAX_ROWS};

/// Truncated integer from a scalar argument
fn to_i64_trunc(
    value: &Value,
    fctx: &mut FunctionContext<'_>,
) -> FormulaResult<Result<i64, ErrorCode>> {
    let value = fctx.scalar(value)?;
    Ok(to_number(&value).map(|n| n.trunc() as i64))
}

/// CHOOSE(index, value1, ...)
pub fn fn_choose(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    let index = match to_i64_trunc(&args[0], fctx)? {
        Ok(i) => i,
        Err(e) => return Ok(Value::Error(e)),
    };
    let choices = &args[1..];
    if index < 1 || index as usize > choices.len() {
        return Ok(Value::Error(ErrorCode::Value));
    }
    Ok(match &choices[index as usize - 1] {
        Value::MissingArg => Value::Blank,
        other => other.clone(),
    })
}

/// Start and end of one dimension of an OFFSET result
///
/// A negative extent reaches back from the shifted start. Arguments far
/// outside the sheet saturate when truncated, so every step is checked.
fn offset_span(start: i64, shift: i64, extent: i64, limit: i64) -> Option<(i64, i64)> {
    let first = start.checked_add(shift)?;
    let (lo, hi) = if extent > 0 {
        (first, first.checked_add(extent - 1)?)
    } else {
        (first.checked_add(extent + 1)?, first)
    };
    (lo >= 0 && hi < limit).then_some((lo, hi))
}

/// OFFSET(reference, rows, cols, [height], [width])
///
/// Returns a reference, so the result can be iterated or dereferenced by
/// whatever consumes it.
pub fn fn_offset(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    let base = match &args[0] {
        Value::CellRef(key) => AreaRef::new(
            key.book,
            key.sheet,
            &CellRange::from_indices(key.row, key.col, key.row, key.col),
        ),
        Value::AreaRef(area) => *area,
        Value::Error(e) => return Ok(Value::Error(*e)),
        _ => return Ok(Value::Error(ErrorCode::Value)),
    };

    let mut numbers = [0i64; 4];
    let defaults = [
        None,
        None,
        Some(i64::from(base.range.row_count())),
        Some(i64::from(base.range.col_count())),
    ];
    for (i, default) in defaults.into_iter().enumerate() {
        let arg = args.get(i + 1).filter(|a| !matches!(a, Value::MissingArg));
        numbers[i] = match (arg, default) {
            (Some(arg), _) => match to_i64_trunc(arg, fctx)? {
                Ok(n) => n,
                Err(e) => return Ok(Value::Error(e)),
            },
            (None, Some(default)) => default,
            (None, None) => 0,
        };
    }
    let [rows, cols, height, width] = numbers;
    if height == 0 || width == 0 {
        return Ok(Value::Error(ErrorCode::Ref));
    }

    let range = &base.range;
    let spans = (
        offset_span(i64::from(range.first_row()), rows, height, i64::from(MAX_ROWS)),
        offset_span(i64::from(range.first_col()), cols, width, i64::from(MAX_COLS)),
    );
    let ((first_row, last_row), (first_col, last_col)) = match spans {
        (Some(r), Some(c)) => (r, c),
        _ => return Ok(Value::Error(ErrorCode::Ref)),
    };

    let area = AreaRef::new(
        base.book,
        base.sheet,
        &CellRange::from_indices(
            first_row as u32,
            first_col as u16,
            last_row as u32,
            last_col as u16,
        ),
    );
    Ok(if area.range.is_single_cell() {
        Value::CellRef(area.cell(first_row as u32, first_col as u16))
    } else {
        Value::AreaRef(area)
    })
}

/// ROW([reference])
pub fn fn_row(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    Ok(match args.first() {
        None | Some(Value::MissingArg) => Value::Number(f64::from(fctx.context().row) + 1.0),
        Some(Value::CellRef(key)) => Value::Number(f64::from(key.row) + 1.0),
        Some(Value::AreaRef(area)) => Value::Number(f64::from(area.range.first_row()) + 1.0),
        Some(Value::Error(e)) => Value::Error(*e),
        Some(_) => Value::Error(ErrorCode::Value),
    })
}

/// COLUMN([reference])
pub fn fn_column(args: &[Value], fctx: &mut FunctionContext<'_>) -> FormulaResult<Value> {
    Ok(match args.first() {
        None | Some(Value::MissingArg) => Value::Number(f64::from(fctx.context().col) + 1.0),
        Some(Value::CellRef(key)) => Value::Number(f64::from(key.col) + 1.0),
        Some(Value::AreaRef(area)) => Value::Number(f64::from(area.range.first_col()) + 1.0),
        Some(Value::Error(e)) => Value::Error(*e),
        Some(_) => Value::Error(ErrorCode::Value),
    })
}
