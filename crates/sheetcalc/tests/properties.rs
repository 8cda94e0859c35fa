//! Property tests for caching, invalidation and cycle detection

use proptest::prelude::*;
use sheetcalc::prelude::*;
use sheetcalc::{CellKey, CellType, FormulaBuilder};

fn build(f: FormulaBuilder) -> Formula {
    f.build().unwrap()
}

fn address(row: usize) -> String {
    format!("A{}", row + 1)
}

/// A1 = x, then A(i+1) = A(i) + step(i)
fn chain(start: f64, steps: &[f64]) -> Workbook {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", start).unwrap();
    for (i, step) in steps.iter().enumerate() {
        let f = build(Formula::builder().cell(&address(i)).number(*step).add());
        sheet.set_cell_formula(&address(i + 1), f).unwrap();
    }
    wb
}

/// A(i) = A(i+1) + 1, with the last cell pointing back at A1
fn ring(len: usize) -> Workbook {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    for i in 0..len {
        let next = address((i + 1) % len);
        let f = build(Formula::builder().cell(&next).number(1.0).add());
        sheet.set_cell_formula(&address(i), f).unwrap();
    }
    wb
}

fn cells(evaluator: &FormulaEvaluator, count: usize) -> Vec<CellKey> {
    (0..count)
        .map(|i| evaluator.cell("Sheet1", &address(i)).unwrap())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_cell_of_a_cycle_is_circular(len in 1usize..=2000, start in 0usize..2000) {
        let mut evaluator = FormulaEvaluator::new(ring(len));
        let keys = cells(&evaluator, len);

        // Entering the ring anywhere marks the whole ring
        let entry = keys[start % len];
        prop_assert_eq!(
            evaluator.evaluate_formula_cell(entry).unwrap(),
            Some(CellType::Error)
        );
        for key in &keys {
            prop_assert_eq!(
                evaluator.cached_value(*key),
                Some(Value::Error(ErrorCode::CircularRef))
            );
        }

        // And stays that way when every cell is evaluated afresh
        evaluator.clear_all_cached_result_values();
        evaluator.evaluate_all().unwrap();
        for key in &keys {
            prop_assert_eq!(
                evaluator.evaluate(*key).unwrap(),
                Value::Error(ErrorCode::CircularRef)
            );
        }
    }

    #[test]
    fn chain_edits_reach_the_end(
        start in -1000.0f64..1000.0,
        edited in -1000.0f64..1000.0,
        steps in proptest::collection::vec(-100i32..100, 1..1000),
    ) {
        let steps: Vec<f64> = steps.into_iter().map(f64::from).collect();
        let mut evaluator = FormulaEvaluator::new(chain(start, &steps));
        let keys = cells(&evaluator, steps.len() + 1);
        let last = *keys.last().unwrap();

        evaluator.evaluate_all().unwrap();
        let total: f64 = steps.iter().sum();
        let expected = evaluator.cached_value(last).and_then(|v| v.as_number()).unwrap();
        prop_assert!((expected - (start + total)).abs() < 1e-6);

        evaluator.set_cell_value(keys[0], edited).unwrap();
        for key in &keys[1..] {
            prop_assert_eq!(evaluator.cached_value(*key), None);
        }
        let value = evaluator.evaluate(last).unwrap().as_number().unwrap();
        prop_assert!((value - (edited + total)).abs() < 1e-6);
    }

    #[test]
    fn cached_and_fresh_results_agree(
        start in -1000.0f64..1000.0,
        steps in proptest::collection::vec(-100i32..100, 1..20),
    ) {
        let steps: Vec<f64> = steps.into_iter().map(f64::from).collect();
        let mut evaluator = FormulaEvaluator::new(chain(start, &steps));
        let keys = cells(&evaluator, steps.len() + 1);

        for key in keys.iter().rev() {
            let fresh = evaluator.evaluate(*key).unwrap();
            evaluator.evaluate_formula_cell(*key).unwrap();
            let cached = evaluator.cached_value(*key);
            if key.row > 0 {
                prop_assert_eq!(cached.as_ref(), Some(&fresh));
            }
            prop_assert_eq!(evaluator.evaluate(*key).unwrap(), fresh);
        }
    }

    #[test]
    fn single_operand_sum_matches_sum(
        values in proptest::collection::vec(-1.0e6f64..1.0e6, 1..30),
    ) {
        let mut wb = Workbook::new();
        let sheet = wb.worksheet_mut(0).unwrap();
        for (i, value) in values.iter().enumerate() {
            sheet.set_cell_value(&address(i), *value).unwrap();
        }
        let range = format!("A1:A{}", values.len());
        sheet
            .set_cell_formula("B1", build(Formula::builder().area(&range).attr_sum()))
            .unwrap();
        sheet
            .set_cell_formula("B2", build(Formula::builder().area(&range).func("SUM", 1)))
            .unwrap();

        let mut evaluator = FormulaEvaluator::new(wb);
        let b1 = evaluator.cell("Sheet1", "B1").unwrap();
        let b2 = evaluator.cell("Sheet1", "B2").unwrap();
        prop_assert_eq!(evaluator.evaluate(b1).unwrap(), evaluator.evaluate(b2).unwrap());
    }
}
