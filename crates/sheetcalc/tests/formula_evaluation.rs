//! Tests for formula evaluation through the public driver

use sheetcalc::prelude::*;
use sheetcalc::{calculated_value, CellType, FormulaBuilder, SheetRef, Token};

fn build(f: FormulaBuilder) -> Formula {
    f.build().unwrap()
}

fn sheet1(evaluator: &FormulaEvaluator) -> &Worksheet {
    evaluator.workbook().unwrap().worksheet(0).unwrap()
}

/// Constants, operators and functions without cell references
#[test]
fn test_evaluate_simple_formulas() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    // 1+2*3
    sheet
        .set_cell_formula(
            "A1",
            build(Formula::builder().number(1.0).number(2.0).number(3.0).mul().add()),
        )
        .unwrap();
    // "Hello "&"World"
    sheet
        .set_cell_formula(
            "A2",
            build(Formula::builder().text("Hello ").text("World").concat()),
        )
        .unwrap();
    // 5>3
    sheet
        .set_cell_formula("A3", build(Formula::builder().number(5.0).number(3.0).gt()))
        .unwrap();
    // SUM(1,2,3,4,5)
    let mut sum = Formula::builder();
    for n in 1..=5 {
        sum = sum.number(f64::from(n));
    }
    sheet
        .set_cell_formula("A4", build(sum.func("SUM", 5)))
        .unwrap();

    let mut evaluator = FormulaEvaluator::new(wb);
    let a1 = evaluator.cell("Sheet1", "A1").unwrap();
    let a2 = evaluator.cell("Sheet1", "A2").unwrap();
    let a3 = evaluator.cell("Sheet1", "A3").unwrap();
    let a4 = evaluator.cell("Sheet1", "A4").unwrap();

    assert_eq!(evaluator.evaluate(a1).unwrap(), Value::Number(7.0));
    assert_eq!(evaluator.evaluate(a2).unwrap(), Value::text("Hello World"));
    assert_eq!(evaluator.evaluate(a3).unwrap(), Value::Boolean(true));
    assert_eq!(evaluator.evaluate(a4).unwrap(), Value::Number(15.0));
}

/// Cell references, areas and recalculation after an edit
#[test]
fn test_evaluate_with_cell_references() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", 10.0).unwrap();
    sheet.set_cell_value("A2", 20.0).unwrap();
    sheet.set_cell_value("A3", 30.0).unwrap();
    sheet.set_cell_value("B1", 5.0).unwrap();
    // SUM(A1:A3)*B1
    sheet
        .set_cell_formula(
            "C1",
            build(Formula::builder().area("A1:A3").func("SUM", 1).cell("B1").mul()),
        )
        .unwrap();

    let mut evaluator = FormulaEvaluator::new(wb);
    let c1 = evaluator.cell("Sheet1", "C1").unwrap();
    assert_eq!(evaluator.evaluate_formula_cell(c1).unwrap(), Some(CellType::Numeric));
    assert_eq!(evaluator.cached_value(c1), Some(Value::Number(300.0)));

    let a2 = evaluator.cell("Sheet1", "A2").unwrap();
    evaluator.set_cell_value(a2, 50.0).unwrap();
    assert_eq!(evaluator.cached_value(c1), None);
    assert_eq!(evaluator.evaluate(c1).unwrap(), Value::Number(450.0));
}

/// Filling an empty cell inside an aggregated area reaches the aggregate
#[test]
fn test_value_in_empty_area_cell() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", 1.0).unwrap();
    sheet
        .set_cell_formula("B1", build(Formula::builder().area("A1:A5").func("SUM", 1)))
        .unwrap();

    let mut evaluator = FormulaEvaluator::new(wb);
    let b1 = evaluator.cell("Sheet1", "B1").unwrap();
    evaluator.evaluate_formula_cell(b1).unwrap();
    assert_eq!(evaluator.cached_value(b1), Some(Value::Number(1.0)));

    let a4 = evaluator.cell("Sheet1", "A4").unwrap();
    evaluator.set_cell_value(a4, 10.0).unwrap();
    assert_eq!(evaluator.cached_value(b1), None);
    assert_eq!(evaluator.evaluate(b1).unwrap(), Value::Number(11.0));

    // A formula dropped into the area counts too
    let a5 = evaluator.cell("Sheet1", "A5").unwrap();
    evaluator
        .set_cell_formula(a5, build(Formula::builder().cell("A4").number(2.0).mul()))
        .unwrap();
    assert_eq!(evaluator.cached_value(b1), None);
    assert_eq!(evaluator.evaluate(b1).unwrap(), Value::Number(31.0));

    evaluator.clear_cell(a4).unwrap();
    assert_eq!(evaluator.evaluate(b1).unwrap(), Value::Number(1.0));
}

/// Omitted arguments act as blank for operators and as empty text for `&`
#[test]
fn test_missing_arg() {
    let mut wb = Workbook::new();
    // 1+IF(1,,)
    wb.worksheet_mut(0)
        .unwrap()
        .set_cell_formula(
            "A1",
            build(
                Formula::builder()
                    .number(1.0)
                    .number(1.0)
                    .missing_arg()
                    .missing_arg()
                    .func("IF", 3)
                    .add(),
            ),
        )
        .unwrap();

    let mut evaluator = FormulaEvaluator::new(wb);
    let a1 = evaluator.cell("Sheet1", "A1").unwrap();
    assert_eq!(evaluator.evaluate_formula_cell(a1).unwrap(), Some(CellType::Numeric));
    assert_eq!(evaluator.cached_value(a1), Some(Value::Number(1.0)));

    // "abc"&IF(1,,)
    evaluator
        .set_cell_formula(
            a1,
            build(
                Formula::builder()
                    .text("abc")
                    .number(1.0)
                    .missing_arg()
                    .missing_arg()
                    .func("IF", 3)
                    .concat(),
            ),
        )
        .unwrap();
    assert_eq!(evaluator.evaluate_formula_cell(a1).unwrap(), Some(CellType::Text));
    assert_eq!(evaluator.cached_value(a1), Some(Value::text("abc")));

    // "abc"&CHOOSE(2,5,,9)
    let choose = build(
        Formula::builder()
            .text("abc")
            .number(2.0)
            .number(5.0)
            .missing_arg()
            .number(9.0)
            .func("CHOOSE", 4)
            .concat(),
    );
    assert_eq!(choose.to_formula_string(), "\"abc\"&CHOOSE(2,5,,9)");
    evaluator.set_cell_formula(a1, choose).unwrap();
    assert_eq!(evaluator.evaluate_formula_cell(a1).unwrap(), Some(CellType::Text));
    assert_eq!(evaluator.cached_value(a1), Some(Value::text("abc")));
}

/// A formula whose result is an area that cannot be intersected with the
/// formula's position yields `#VALUE!`
#[test]
fn test_result_outside_range() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0)
        .unwrap()
        .set_cell_formula("A1", build(Formula::builder().area("D2:D5")))
        .unwrap();

    let mut evaluator = FormulaEvaluator::new(wb);
    let a1 = evaluator.cell("Sheet1", "A1").unwrap();
    assert_eq!(evaluator.evaluate(a1).unwrap(), Value::Error(ErrorCode::Value));

    // OFFSET(A1,0,0) points back at its own cell
    evaluator.clear_all_cached_result_values();
    evaluator
        .set_cell_formula(
            a1,
            build(
                Formula::builder()
                    .cell("A1")
                    .number(0.0)
                    .number(0.0)
                    .func("OFFSET", 3),
            ),
        )
        .unwrap();
    assert_eq!(evaluator.evaluate(a1).unwrap(), Value::Error(ErrorCode::CircularRef));
}

/// A result that is a single cell inside a column lines up with the row
#[test]
fn test_result_intersects_column() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    for (i, address) in ["D1", "D2", "D3"].iter().enumerate() {
        sheet.set_cell_value(address, (i + 1) as f64 * 10.0).unwrap();
    }
    sheet
        .set_cell_formula("A2", build(Formula::builder().area("D1:D3")))
        .unwrap();

    let mut evaluator = FormulaEvaluator::new(wb);
    let a2 = evaluator.cell("Sheet1", "A2").unwrap();
    assert_eq!(evaluator.evaluate(a2).unwrap(), Value::Number(20.0));
}

/// Workbook-scoped names: a constant, a formula and a set of cells
#[test]
#[allow(clippy::approx_constant)]
fn test_defined_names() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    for (address, value) in [("A1", 2.0), ("A2", 5.0), ("A3", 3.0), ("A4", 7.0)] {
        sheet.set_cell_value(address, value).unwrap();
    }
    wb.define_name("aConstant", build(Formula::builder().number(3.14)))
        .unwrap();
    wb.define_name(
        "aFormula",
        build(Formula::builder().sheet_area("Sheet1", "$A$1:$A$3").func("SUM", 1)),
    )
    .unwrap();
    wb.define_name("aSet", build(Formula::builder().sheet_area("Sheet1", "$A$2:$A$4")))
        .unwrap();

    let sheet = wb.worksheet_mut(0).unwrap();
    sheet
        .set_cell_formula("C1", build(Formula::builder().name("aConstant")))
        .unwrap();
    sheet
        .set_cell_formula("C2", build(Formula::builder().name("aFormula")))
        .unwrap();
    sheet
        .set_cell_formula("C3", build(Formula::builder().name("aSet").func("SUM", 1)))
        .unwrap();
    // aConstant+aFormula+SUM(aSet)
    sheet
        .set_cell_formula(
            "C4",
            build(
                Formula::builder()
                    .name("aConstant")
                    .name("aFormula")
                    .add()
                    .name("aSet")
                    .func("SUM", 1)
                    .add(),
            ),
        )
        .unwrap();

    let mut evaluator = FormulaEvaluator::new(wb);
    let expected = [("C1", 3.14), ("C2", 10.0), ("C3", 15.0), ("C4", 28.14)];
    for (address, want) in expected {
        let cell = evaluator.cell("Sheet1", address).unwrap();
        let got = evaluator.evaluate(cell).unwrap().as_number().unwrap();
        assert!((got - want).abs() < 1e-9, "{}: {} != {}", address, got, want);
    }

    // A cell read through a name invalidates the readers of the name
    let a3 = evaluator.cell("Sheet1", "A3").unwrap();
    let c2 = evaluator.cell("Sheet1", "C2").unwrap();
    evaluator.evaluate_formula_cell(c2).unwrap();
    evaluator.set_cell_value(a3, 13.0).unwrap();
    assert_eq!(evaluator.cached_value(c2), None);
    assert_eq!(evaluator.evaluate(c2).unwrap(), Value::Number(20.0));
}

/// Defining a name reaches formulas that looked it up before it existed
#[test]
fn test_late_name_definition() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0)
        .unwrap()
        .set_cell_formula(
            "A1",
            build(Formula::builder().name("rate").number(2.0).mul()),
        )
        .unwrap();

    let mut evaluator = FormulaEvaluator::new(wb);
    let a1 = evaluator.cell("Sheet1", "A1").unwrap();
    evaluator.evaluate_formula_cell(a1).unwrap();
    assert_eq!(evaluator.cached_value(a1), Some(Value::Error(ErrorCode::Name)));

    let book = evaluator.primary();
    evaluator
        .define_name(book, "rate", build(Formula::builder().number(0.25)))
        .unwrap();
    assert_eq!(evaluator.cached_value(a1), None);
    assert_eq!(evaluator.evaluate(a1).unwrap(), Value::Number(0.5));

    evaluator
        .define_name(book, "RATE", build(Formula::builder().number(4.0)))
        .unwrap();
    assert_eq!(evaluator.evaluate(a1).unwrap(), Value::Number(8.0));
}

/// Deleted and invalid references evaluate to `#REF!`
#[test]
fn test_reference_errors() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet
        .set_cell_formula("A1", build(Formula::builder().ref_error()))
        .unwrap();
    sheet
        .set_cell_formula(
            "A2",
            build(Formula::builder().area_error().func("SUM", 1)),
        )
        .unwrap();
    sheet
        .set_cell_formula(
            "A3",
            build(Formula::builder().deleted_ref(SheetRef::local("Gone")).number(1.0).add()),
        )
        .unwrap();

    let mut evaluator = FormulaEvaluator::new(wb);
    for address in ["A1", "A2", "A3"] {
        let cell = evaluator.cell("Sheet1", address).unwrap();
        assert_eq!(
            evaluator.evaluate(cell).unwrap(),
            Value::Error(ErrorCode::Ref),
            "{}",
            address
        );
    }
}

/// The optimized single-operand SUM agrees with the ordinary call
#[test]
fn test_attr_sum_matches_sum() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", 4.0).unwrap();
    sheet.set_cell_value("A2", 38.0).unwrap();
    sheet
        .set_cell_formula("B1", build(Formula::builder().number(42.0).attr_sum()))
        .unwrap();
    sheet
        .set_cell_formula("B2", build(Formula::builder().area("A1:A2").attr_sum()))
        .unwrap();
    sheet
        .set_cell_formula("B3", build(Formula::builder().area("A1:A2").func("SUM", 1)))
        .unwrap();

    let mut evaluator = FormulaEvaluator::new(wb);
    let b1 = evaluator.cell("Sheet1", "B1").unwrap();
    let b2 = evaluator.cell("Sheet1", "B2").unwrap();
    let b3 = evaluator.cell("Sheet1", "B3").unwrap();
    assert_eq!(evaluator.evaluate(b1).unwrap(), Value::Number(42.0));
    assert_eq!(evaluator.evaluate(b2).unwrap(), evaluator.evaluate(b3).unwrap());
}

/// A malformed token sequence is a fault, not a value
#[test]
fn test_malformed_formula_is_fault() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0)
        .unwrap()
        .set_cell_formula("A1", Formula::new(vec![Token::Number(1.0), Token::Number(2.0)]))
        .unwrap();

    let mut evaluator = FormulaEvaluator::new(wb);
    let a1 = evaluator.cell("Sheet1", "A1").unwrap();
    assert!(matches!(
        evaluator.evaluate(a1),
        Err(FormulaError::MalformedFormula(_))
    ));
}

// === IF with equality tests, across every driver ===

/// What A1 holds in an IF-equals case
#[derive(Clone)]
enum Input {
    Number(f64),
    Text(&'static str),
    Formula(f64),
    Blank,
}

/// `IF(<test>,B1,C1)` with B1 = 2 and C1 = 3; the test is built on A1
fn if_equals_formula(test: FormulaBuilder) -> Formula {
    build(test.cell("B1").cell("C1").func("IF", 3))
}

fn if_equals_workbook(input: &Input, formula: &Formula) -> Workbook {
    let mut wb = Workbook::empty();
    wb.add_worksheet_with_name("IFEquals").unwrap();
    let sheet = wb.worksheet_mut(0).unwrap();
    match input {
        Input::Number(n) => sheet.set_cell_value("A1", *n).unwrap(),
        Input::Text(s) => sheet.set_cell_value("A1", *s).unwrap(),
        Input::Formula(n) => sheet
            .set_cell_formula("A1", build(Formula::builder().number(*n)))
            .unwrap(),
        Input::Blank => {}
    }
    sheet.set_cell_value("B1", 2.0).unwrap();
    sheet.set_cell_value("C1", 3.0).unwrap();
    sheet.set_cell_formula("D1", formula.clone()).unwrap();
    wb
}

fn check_if_equals(label: &str, input: Input, formula: Formula, expected: f64) {
    let rendered = formula.to_formula_string();
    let d1 = |evaluator: &FormulaEvaluator| evaluator.cell("IFEquals", "D1").unwrap();

    // evaluate leaves the formula in place
    let mut evaluator = FormulaEvaluator::new(if_equals_workbook(&input, &formula));
    let cell = d1(&evaluator);
    assert_eq!(evaluator.evaluate(cell).unwrap(), Value::Number(expected), "{}", label);
    let stored = sheet1(&evaluator).formula_at(0, 3).unwrap();
    assert_eq!(stored.to_formula_string(), rendered, "{}", label);

    // evaluate_formula_cell stores the result next to the formula
    let mut evaluator = FormulaEvaluator::new(if_equals_workbook(&input, &formula));
    let cell = d1(&evaluator);
    assert_eq!(
        evaluator.evaluate_formula_cell(cell).unwrap(),
        Some(CellType::Numeric),
        "{}",
        label
    );
    let stored = sheet1(&evaluator).cell_at(0, 3).unwrap();
    assert_eq!(stored.as_formula().map(Formula::to_formula_string), Some(rendered.clone()));
    assert_eq!(stored.cached_value(), Some(&CellValue::Number(expected)), "{}", label);

    // evaluate_in_cell replaces the formula with its result
    let mut evaluator = FormulaEvaluator::new(if_equals_workbook(&input, &formula));
    let cell = d1(&evaluator);
    assert_eq!(evaluator.evaluate_in_cell(cell).unwrap(), cell);
    assert_eq!(
        sheet1(&evaluator).cell_at(0, 3),
        Some(&CellValue::Number(expected)),
        "{}",
        label
    );

    // evaluate_all
    let mut evaluator = FormulaEvaluator::new(if_equals_workbook(&input, &formula));
    evaluator.evaluate_all().unwrap();
    assert_eq!(
        sheet1(&evaluator).get_calculated_value_at(0, 3),
        Some(&CellValue::Number(expected)),
        "{}",
        label
    );

    // whole-workbook calculation
    let mut wb = if_equals_workbook(&input, &formula);
    let stats = wb.calculate().unwrap();
    assert_eq!(stats.faults, 0, "{}", label);
    assert_eq!(
        calculated_value(&wb, 0, 0, 3),
        Some(&CellValue::Number(expected)),
        "{}",
        label
    );
}

#[test]
fn test_if_equals_numeric() {
    // IF(A1=1,2,3)
    let f = build(
        Formula::builder()
            .cell("A1")
            .number(1.0)
            .eq()
            .number(2.0)
            .number(3.0)
            .func("IF", 3),
    );
    assert_eq!(f.to_formula_string(), "IF(A1=1,2,3)");
    check_if_equals("numeric literal branches", Input::Number(1.0), f, 2.0);

    let f = if_equals_formula(Formula::builder().cell("A1").number(1.0).eq());
    assert_eq!(f.to_formula_string(), "IF(A1=1,B1,C1)");
    check_if_equals("numeric", Input::Number(1.0), f.clone(), 2.0);
    check_if_equals("text never equals a number", Input::Text("1"), f.clone(), 3.0);
    check_if_equals("formula", Input::Formula(1.0), f.clone(), 2.0);
    check_if_equals("blank is not 1", Input::Blank, f, 3.0);
}

#[test]
fn test_if_equals_with_coercion() {
    // IF(A1&""="1",B1,C1)
    let f = if_equals_formula(Formula::builder().cell("A1").text("").concat().text("1").eq());
    check_if_equals("number concatenated to text", Input::Number(1.0), f, 2.0);

    // IF(A1="1",B1,C1)
    let f = if_equals_formula(Formula::builder().cell("A1").text("1").eq());
    check_if_equals("text", Input::Text("1"), f, 2.0);

    // IF(A1+0=1,B1,C1)
    let f = if_equals_formula(Formula::builder().cell("A1").number(0.0).add().number(1.0).eq());
    check_if_equals("text coerced by arithmetic", Input::Text("1"), f, 2.0);

    // IF(A1=0,B1,C1)
    let f = if_equals_formula(Formula::builder().cell("A1").number(0.0).eq());
    check_if_equals("blank equals 0", Input::Blank, f, 2.0);
}
