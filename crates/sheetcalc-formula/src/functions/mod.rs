//! Built-in spreadsheet functions

pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;

use crate::coercion::to_number;
use crate::context::EvaluationContext;
use crate::environment::Environment;
use crate::error::FormulaResult;
use crate::value::Value;
use sheetcalc_core::ErrorCode;
use std::collections::HashMap;
use std::fmt;

/// Function implementation signature
///
/// Arguments arrive as evaluated, references included. Functions that need
/// scalars or the contents of an area go through the [`FunctionContext`].
pub type FunctionImpl = fn(&[Value], &mut FunctionContext<'_>) -> FormulaResult<Value>;

/// Function definition
#[derive(Clone, Copy)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

/// Function registry
#[derive(Debug)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_info_functions();
        registry.register_lookup_functions();

        registry
    }

    /// Create a registry with no functions
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function, replacing any existing one with the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn add(
        &mut self,
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        f: FunctionImpl,
    ) {
        self.register(FunctionDef {
            name,
            min_args,
            max_args,
            implementation: f,
        });
    }

    fn register_math_functions(&mut self) {
        self.add("SUM", 1, None, math::fn_sum);
        self.add("AVERAGE", 1, None, math::fn_average);
        self.add("MIN", 1, None, math::fn_min);
        self.add("MAX", 1, None, math::fn_max);
        self.add("COUNT", 1, None, math::fn_count);
        self.add("COUNTA", 1, None, math::fn_counta);
        self.add("ABS", 1, Some(1), math::fn_abs);
    }

    fn register_logical_functions(&mut self) {
        self.add("IF", 2, Some(3), logical::fn_if);
        self.add("NOT", 1, Some(1), logical::fn_not);
        self.add("AND", 1, None, logical::fn_and);
        self.add("OR", 1, None, logical::fn_or);
        self.add("TRUE", 0, Some(0), logical::fn_true);
        self.add("FALSE", 0, Some(0), logical::fn_false);
        self.add("IFERROR", 2, Some(2), logical::fn_iferror);
    }

    fn register_info_functions(&mut self) {
        self.add("ISBLANK", 1, Some(1), info::fn_isblank);
        self.add("ISERROR", 1, Some(1), info::fn_iserror);
        self.add("ISNUMBER", 1, Some(1), info::fn_isnumber);
        self.add("ISTEXT", 1, Some(1), info::fn_istext);
    }

    fn register_lookup_functions(&mut self) {
        self.add("CHOOSE", 2, None, lookup::fn_choose);
        self.add("OFFSET", 3, Some(5), lookup::fn_offset);
        self.add("ROW", 0, Some(1), lookup::fn_row);
        self.add("COLUMN", 0, Some(1), lookup::fn_column);
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// What a function can reach while it runs
pub struct FunctionContext<'a> {
    env: &'a mut Environment,
    ctx: &'a EvaluationContext,
}

impl<'a> FunctionContext<'a> {
    pub(crate) fn new(env: &'a mut Environment, ctx: &'a EvaluationContext) -> Self {
        Self { env, ctx }
    }

    /// Position of the calling formula
    pub fn context(&self) -> &EvaluationContext {
        self.ctx
    }

    /// Argument as a scalar, references resolved at the caller's position
    pub fn scalar(&mut self, value: &Value) -> FormulaResult<Value> {
        self.env.dereference(value, self.ctx)
    }

    /// Every value an argument stands for
    ///
    /// A cell reference yields its value and an area its non-empty cells.
    /// Other values yield themselves.
    pub fn values(&mut self, value: &Value) -> FormulaResult<Vec<Value>> {
        match value {
            Value::CellRef(key) => Ok(vec![self.env.cell_value(*key)?]),
            Value::AreaRef(area) => self.env.area_values(area),
            other => Ok(vec![other.clone()]),
        }
    }
}

/// Numbers from a list of arguments, the way aggregate functions see them
///
/// Values read through references count only when numeric; direct
/// arguments are coerced. The first error met wins.
pub fn collect_numbers(
    args: &[Value],
    fctx: &mut FunctionContext<'_>,
) -> FormulaResult<Result<Vec<f64>, ErrorCode>> {
    let mut numbers = Vec::new();
    for arg in args {
        if arg.is_reference() {
            for value in fctx.values(arg)? {
                match value {
                    Value::Number(n) => numbers.push(n),
                    Value::Error(e) => return Ok(Err(e)),
                    _ => {}
                }
            }
        } else {
            match to_number(arg) {
                Ok(n) => numbers.push(n),
                Err(e) => return Ok(Err(e)),
            }
        }
    }
    Ok(Ok(numbers))
}
