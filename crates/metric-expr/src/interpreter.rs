//! Evaluation of a parsed expression into a metric graph.
//!
//! Values stay plain (numbers, strings, lists, maps) until an operation
//! involves a metric; arithmetic on numbers alone folds immediately.

use crate::ast::{Arg, BinaryOp, Expr, UnaryOp};
use crate::error::CompileError;
use metric_core::combinators::{
    Abs, Acc, Arithmetic, ArithmeticOp, AutoRegress, Concat, Cycle, Diff, Downsample,
    DownsampleMethod, Extremum, ExtremumOp, Pulse, Regress, Repeat, Shift, Smooth,
};
use metric_core::generators::{Const, Cos, Fragment, Normal, Rand, RandChoice, RandInt, Sin};
use metric_core::{coerce, lines, rect, Metric, Node, Operand};
use std::collections::HashMap;

/// Intermediate value of an expression.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Str(String),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Metric(Metric),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Metric(_) => "metric",
        }
    }

    fn into_number(self) -> Result<f64, CompileError> {
        match self {
            Value::Number(value) => Ok(value),
            other => Err(CompileError::Type(format!(
                "expected a number, found {}",
                other.type_name()
            ))),
        }
    }

    /// Numbers, lists and maps convert the same way `#` literals do.
    pub fn into_operand(self) -> Result<Operand, CompileError> {
        match self {
            Value::Number(value) => Ok(Operand::Number(value)),
            Value::List(items) => items
                .into_iter()
                .map(Value::into_number)
                .collect::<Result<Vec<_>, _>>()
                .map(Operand::Sequence),
            Value::Map(entries) => entries
                .into_iter()
                .map(|(position, value)| Ok((position.into_number()?, value.into_number()?)))
                .collect::<Result<Vec<_>, CompileError>>()
                .map(Operand::Positions),
            Value::Metric(metric) => Ok(Operand::Metric(metric)),
            Value::Str(text) => Err(CompileError::Type(format!(
                "cannot use string '{text}' as a metric"
            ))),
        }
    }

    pub fn into_metric(self) -> Result<Metric, CompileError> {
        Ok(coerce(self.into_operand()?))
    }
}

/// Per-leaf seeds derived from one base seed, in construction order.
#[derive(Debug, Clone)]
pub struct SeedSequence {
    base: Option<u64>,
    issued: u64,
}

impl SeedSequence {
    pub fn new(base: Option<u64>) -> Self {
        Self { base, issued: 0 }
    }

    /// Next leaf seed, or `None` to draw from entropy.
    pub fn next_seed(&mut self) -> Option<u64> {
        let base = self.base?;
        let seed = base.wrapping_add(self.issued.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        self.issued += 1;
        Some(seed)
    }
}

/// Evaluated call arguments.
struct CallArgs {
    function: String,
    positional: Vec<Value>,
    keyword: Vec<(String, Value)>,
}

impl CallArgs {
    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::argument(&self.function, message)
    }

    fn positional_only(self) -> Result<Vec<Value>, CompileError> {
        if let Some((name, _)) = self.keyword.first() {
            return Err(self.error(format!("unexpected keyword argument '{name}'")));
        }
        Ok(self.positional)
    }

    /// Match arguments to parameter slots by position, then by name.
    fn bind(self, params: &'static [&'static str]) -> Result<Bound, CompileError> {
        if self.positional.len() > params.len() {
            return Err(self.error(format!(
                "takes at most {} arguments ({} given)",
                params.len(),
                self.positional.len()
            )));
        }
        let mut slots: Vec<Option<Value>> = self.positional.into_iter().map(Some).collect();
        slots.resize_with(params.len(), || None);
        for (name, value) in self.keyword {
            let Some(i) = params.iter().position(|param| *param == name) else {
                return Err(CompileError::argument(
                    &self.function,
                    format!("unexpected keyword argument '{name}'"),
                ));
            };
            if slots[i].is_some() {
                return Err(CompileError::argument(
                    &self.function,
                    format!("got multiple values for argument '{name}'"),
                ));
            }
            slots[i] = Some(value);
        }
        Ok(Bound {
            function: self.function,
            params,
            slots,
        })
    }
}

/// Arguments bound to named parameter slots.
struct Bound {
    function: String,
    params: &'static [&'static str],
    slots: Vec<Option<Value>>,
}

impl Bound {
    fn wrong(&self, i: usize, expected: &str, found: &Value) -> CompileError {
        CompileError::argument(
            &self.function,
            format!(
                "'{}' must be {expected}, found {}",
                self.params[i],
                found.type_name()
            ),
        )
    }

    fn optional(&mut self, i: usize) -> Option<Value> {
        self.slots[i].take()
    }

    fn required(&mut self, i: usize) -> Result<Value, CompileError> {
        self.optional(i).ok_or_else(|| {
            CompileError::argument(
                &self.function,
                format!("missing required argument '{}'", self.params[i]),
            )
        })
    }

    fn to_number(&self, i: usize, value: Value) -> Result<f64, CompileError> {
        match value {
            Value::Number(number) => Ok(number),
            other => Err(self.wrong(i, "a number", &other)),
        }
    }

    fn to_integer(&self, i: usize, value: Value) -> Result<i64, CompileError> {
        match value {
            Value::Number(number) => {
                as_integer(number).ok_or_else(|| self.wrong(i, "an integer", &value))
            }
            other => Err(self.wrong(i, "an integer", &other)),
        }
    }

    fn to_count(&self, i: usize, value: Value) -> Result<u64, CompileError> {
        match value {
            Value::Number(number)
                if number >= 0.0 && number < u64::MAX as f64 && number.fract() == 0.0 =>
            {
                Ok(number as u64)
            }
            other => Err(self.wrong(i, "a non-negative integer", &other)),
        }
    }

    fn to_numbers(&self, i: usize, value: Value) -> Result<Vec<f64>, CompileError> {
        match value {
            Value::List(items) => items
                .into_iter()
                .map(|item| self.to_number(i, item))
                .collect(),
            other => Err(self.wrong(i, "a list of numbers", &other)),
        }
    }

    fn number(&mut self, i: usize) -> Result<f64, CompileError> {
        let value = self.required(i)?;
        self.to_number(i, value)
    }

    fn number_or(&mut self, i: usize, default: f64) -> Result<f64, CompileError> {
        match self.optional(i) {
            Some(value) => self.to_number(i, value),
            None => Ok(default),
        }
    }

    fn integer(&mut self, i: usize) -> Result<i64, CompileError> {
        let value = self.required(i)?;
        self.to_integer(i, value)
    }

    fn count(&mut self, i: usize) -> Result<u64, CompileError> {
        let value = self.required(i)?;
        self.to_count(i, value)
    }

    fn count_opt(&mut self, i: usize) -> Result<Option<u64>, CompileError> {
        self.optional(i)
            .map(|value| self.to_count(i, value))
            .transpose()
    }

    fn size(&mut self, i: usize) -> Result<usize, CompileError> {
        Ok(self.count(i)? as usize)
    }

    fn numbers(&mut self, i: usize) -> Result<Vec<f64>, CompileError> {
        let value = self.required(i)?;
        self.to_numbers(i, value)
    }

    fn numbers_opt(&mut self, i: usize) -> Result<Option<Vec<f64>>, CompileError> {
        self.optional(i)
            .map(|value| self.to_numbers(i, value))
            .transpose()
    }

    fn operand(&mut self, i: usize) -> Result<Operand, CompileError> {
        self.required(i)?.into_operand()
    }

    fn operand_opt(&mut self, i: usize) -> Result<Option<Operand>, CompileError> {
        self.optional(i).map(Value::into_operand).transpose()
    }

    fn method_or(&mut self, i: usize) -> Result<DownsampleMethod, CompileError> {
        match self.optional(i) {
            None => Ok(DownsampleMethod::default()),
            Some(Value::Str(name)) => Ok(name.parse()?),
            Some(other) => Err(self.wrong(i, "a string", &other)),
        }
    }

    fn points(&mut self, i: usize) -> Result<Vec<(f64, f64)>, CompileError> {
        let Value::List(items) = self.required(i)? else {
            return Err(CompileError::argument(
                &self.function,
                "'points' must be a list of (x, y) pairs",
            ));
        };
        items
            .into_iter()
            .map(|item| match self.to_numbers(i, item)?.as_slice() {
                &[x, y] => Ok((x, y)),
                _ => Err(CompileError::argument(
                    &self.function,
                    "each point must have exactly two coordinates",
                )),
            })
            .collect()
    }
}

/// Whole numbers that fit an `i64` without saturating.
fn as_integer(number: f64) -> Option<i64> {
    let in_range = number >= i64::MIN as f64 && number < i64::MAX as f64;
    (in_range && number.fract() == 0.0).then_some(number as i64)
}

fn arithmetic_op(op: BinaryOp) -> Option<ArithmeticOp> {
    match op {
        BinaryOp::Add => Some(ArithmeticOp::Add),
        BinaryOp::Sub => Some(ArithmeticOp::Sub),
        BinaryOp::Mul => Some(ArithmeticOp::Mul),
        BinaryOp::Div => Some(ArithmeticOp::Div),
        BinaryOp::FloorDiv => Some(ArithmeticOp::FloorDiv),
        BinaryOp::Mod => Some(ArithmeticOp::Mod),
        BinaryOp::Pow => Some(ArithmeticOp::Pow),
        BinaryOp::ShiftLeft | BinaryOp::ShiftRight | BinaryOp::At => None,
    }
}

fn unsupported(op: &str, left: &Value, right: &Value) -> CompileError {
    CompileError::Type(format!(
        "unsupported operands for {op}: {} and {}",
        left.type_name(),
        right.type_name()
    ))
}

/// Tree-walking evaluator.
pub struct Interpreter<'a> {
    bindings: &'a HashMap<String, Metric>,
    seeds: &'a mut SeedSequence,
}

impl<'a> Interpreter<'a> {
    pub fn new(bindings: &'a HashMap<String, Metric>, seeds: &'a mut SeedSequence) -> Self {
        Self { bindings, seeds }
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, CompileError> {
        match expr {
            Expr::Number(value) => Ok(Value::Number(*value)),
            Expr::Str(text) => Ok(Value::Str(text.clone())),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Map(entries) => entries
                .iter()
                .map(|(key, value)| Ok((self.eval(key)?, self.eval(value)?)))
                .collect::<Result<Vec<_>, CompileError>>()
                .map(Value::Map),
            Expr::Lift(literal) => Ok(Value::Metric(self.eval(literal)?.into_metric()?)),
            // A reference yields an independent copy of the bound metric.
            Expr::External(name) => self
                .bindings
                .get(name)
                .cloned()
                .map(Value::Metric)
                .ok_or_else(|| CompileError::UnknownMetric(name.clone())),
            Expr::Name(name) => Err(CompileError::Type(format!("'{name}' is not a value"))),
            Expr::Call { function, args } => {
                let args = self.eval_args(function, args)?;
                self.call_function(function, args)
            }
            Expr::Method {
                receiver,
                method,
                args,
            } => {
                let receiver = self.eval(receiver)?;
                let args = self.eval_args(method, args)?;
                self.call_method(receiver, method, args)
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                unary(*op, operand)
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, left, right)
            }
        }
    }

    fn eval_args(&mut self, function: &str, args: &[Arg]) -> Result<CallArgs, CompileError> {
        let mut call = CallArgs {
            function: function.to_string(),
            positional: Vec::new(),
            keyword: Vec::new(),
        };
        for arg in args {
            let value = self.eval(&arg.value)?;
            match &arg.name {
                Some(name) => call.keyword.push((name.clone(), value)),
                None => call.positional.push(value),
            }
        }
        Ok(call)
    }

    fn seeded<N: Node + 'static>(&mut self, node: N, with_seed: fn(N, u64) -> N) -> Value {
        let node = match self.seeds.next_seed() {
            Some(seed) => with_seed(node, seed),
            None => node,
        };
        Value::Metric(Metric::new(node))
    }

    fn call_function(&mut self, function: &str, args: CallArgs) -> Result<Value, CompileError> {
        let metric: Metric = match function {
            "const" => {
                let mut args = args.bind(&["value"])?;
                Const::new(args.number(0)?).into()
            }
            "frag" => {
                let mut args = args.bind(&["values"])?;
                Fragment::new(args.numbers(0)?).into()
            }
            "normal" => {
                let mut args = args.bind(&["scale", "loc"])?;
                let node = Normal::new(args.number_or(0, 1.0)?, args.number_or(1, 0.0)?)?;
                return Ok(self.seeded(node, Normal::with_seed));
            }
            "rand" => {
                let node = match bounds(args, Bound::to_number)?.as_slice() {
                    [] => Rand::unit(),
                    &[high] => Rand::up_to(high),
                    &[a, b, ..] => Rand::new(a, b),
                };
                return Ok(self.seeded(node, Rand::with_seed));
            }
            "rand_int" => {
                let node = match bounds(args, Bound::to_integer)?.as_slice() {
                    [] => RandInt::default(),
                    &[high] => RandInt::up_to(high),
                    &[a, b, ..] => RandInt::new(a, b),
                };
                return Ok(self.seeded(node, RandInt::with_seed));
            }
            "rand_choice" => {
                let mut args = args.bind(&["choices", "weights"])?;
                let node = RandChoice::new(args.numbers(0)?, args.numbers_opt(1)?)?;
                return Ok(self.seeded(node, RandChoice::with_seed));
            }
            "sin" | "cos" => {
                let mut args = args.bind(&["period", "amplitude", "initial_phase"])?;
                let period = args.number(0)?;
                let amplitude = args.number_or(1, 1.0)?;
                let initial_phase = args.number_or(2, 0.0)?;
                if function == "sin" {
                    Sin::new(period, amplitude, initial_phase).into()
                } else {
                    Cos::new(period, amplitude, initial_phase).into()
                }
            }
            "abs" => {
                let mut args = args.bind(&["x"])?;
                return match args.required(0)? {
                    Value::Number(value) => Ok(Value::Number(value.abs())),
                    Value::Metric(metric) => Ok(Value::Metric(Abs::new(metric).into())),
                    other => Err(args.wrong(0, "a number or a metric", &other)),
                };
            }
            "min" => return extremum(ExtremumOp::Min, args),
            "max" => return extremum(ExtremumOp::Max, args),
            "acc" | "diff" => {
                let mut args = args.bind(&["x"])?;
                let x = args.operand(0)?;
                if function == "acc" {
                    Acc::new(x).into()
                } else {
                    Diff::new(x).into()
                }
            }
            "shift" => {
                let mut args = args.bind(&["x", "n", "padding"])?;
                Shift::new(args.operand(0)?, args.integer(1)?, args.number_or(2, 0.0)?).into()
            }
            "smooth" => {
                let mut args = args.bind(&["x", "window_size"])?;
                Smooth::new(args.operand(0)?, args.size(1)?)?.into()
            }
            "regress" => {
                let mut args = args.bind(&["x", "factors", "paddings"])?;
                Regress::new(args.operand(0)?, args.numbers(1)?, args.operand_opt(2)?)?.into()
            }
            "autoregress" => {
                let mut args = args.bind(&["x", "factors"])?;
                AutoRegress::new(args.operand(0)?, args.numbers(1)?)?.into()
            }
            "downsample" => {
                let mut args = args.bind(&["metric", "sample_size", "method"])?;
                Downsample::new(args.operand(0)?, args.size(1)?, args.method_or(2)?)?.into()
            }
            "repeat" | "cycle" => {
                let mut args = args.bind(&["metric", "start", "end", "n"])?;
                let metric = args.operand(0)?;
                let (start, end, n) = (args.count(1)?, args.count(2)?, args.count_opt(3)?);
                if function == "repeat" {
                    Repeat::new(metric, start, end, n)?.into()
                } else {
                    Cycle::new(metric, start, end, n)?.into()
                }
            }
            "concat" => {
                let mut args = args.bind(&["metric1", "metric2", "at"])?;
                let (first, second) = (args.operand(0)?, args.operand(1)?);
                let at = match args.optional(2) {
                    Some(value) => args.to_count(2, value)?,
                    None => 0,
                };
                Concat::new(first, second, at).into()
            }
            "pulse" => {
                let mut args = args.bind(&["pos", "val"])?;
                Pulse::new(args.operand(0)?, args.operand(1)?).into()
            }
            "rect" => {
                let mut args = args.bind(&["left", "right", "bottom", "up"])?;
                rect(args.count(0)?, args.count(1)?, args.number(2)?, args.number(3)?)
            }
            "lines" => {
                let mut args = args.bind(&["points"])?;
                lines(&args.points(0)?)?
            }
            other => {
                return Err(CompileError::Type(format!("'{other}' is not callable")));
            }
        };
        Ok(Value::Metric(metric))
    }

    fn call_method(
        &mut self,
        receiver: Value,
        method: &str,
        args: CallArgs,
    ) -> Result<Value, CompileError> {
        let metric = match receiver {
            Value::Metric(metric) => metric,
            other => {
                return Err(CompileError::Type(format!(
                    "{} has no method '{method}'",
                    other.type_name()
                )));
            }
        };
        let metric = match method {
            "acc" => {
                args.bind(&[])?;
                metric.acc()
            }
            "diff" => {
                args.bind(&[])?;
                metric.diff()
            }
            "shift" => {
                let mut args = args.bind(&["n", "padding"])?;
                metric.shift(args.integer(0)?, args.number_or(1, 0.0)?)
            }
            "smooth" => {
                let mut args = args.bind(&["window_size"])?;
                metric.smooth(args.size(0)?)?
            }
            "regress" => {
                let mut args = args.bind(&["factors", "paddings"])?;
                metric.regress(args.numbers(0)?, args.operand_opt(1)?)?
            }
            "autoregress" => {
                let mut args = args.bind(&["factors"])?;
                metric.autoregress(args.numbers(0)?)?
            }
            "downsample" => {
                let mut args = args.bind(&["sample_size", "method"])?;
                metric.downsample(args.size(0)?, args.method_or(1)?)?
            }
            "repeat" | "cycle" => {
                let mut args = args.bind(&["start", "end", "n"])?;
                let (start, end, n) = (args.count(0)?, args.count(1)?, args.count_opt(2)?);
                if method == "repeat" {
                    metric.repeat(start, end, n)?
                } else {
                    metric.cycle(start, end, n)?
                }
            }
            "concat" => {
                let mut args = args.bind(&["at", "other"])?;
                metric.concat(args.count(0)?, args.operand(1)?)
            }
            "val" => {
                let mut args = args.bind(&["val"])?;
                metric.as_pos(args.operand(0)?)
            }
            "at" => {
                let mut args = args.bind(&["pos"])?;
                metric.as_val(args.operand(0)?)
            }
            other => {
                return Err(CompileError::Type(format!("metric has no method '{other}'")));
            }
        };
        Ok(Value::Metric(metric))
    }
}

/// Zero, one (`high`) or two (`a`, `b`) positional bounds.
fn bounds<T>(
    args: CallArgs,
    convert: fn(&Bound, usize, Value) -> Result<T, CompileError>,
) -> Result<Vec<T>, CompileError> {
    let function = args.function.clone();
    let values = args.positional_only()?;
    if values.len() > 2 {
        return Err(CompileError::argument(
            &function,
            format!("takes at most 2 arguments ({} given)", values.len()),
        ));
    }
    let params: &'static [&'static str] = if values.len() == 1 {
        &["high"]
    } else {
        &["a", "b"]
    };
    let bound = Bound {
        function,
        params,
        slots: Vec::new(),
    };
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| convert(&bound, i, value))
        .collect()
}

/// `min`/`max`: elementwise over metrics, plain fold over numbers.
fn extremum(op: ExtremumOp, args: CallArgs) -> Result<Value, CompileError> {
    let function = args.function.clone();
    let mut values = args.positional_only()?;
    if values.iter().any(|value| matches!(value, Value::Metric(_))) {
        let operands = values
            .into_iter()
            .map(Value::into_operand)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Value::Metric(Extremum::new(op, operands)?.into()));
    }
    // A single list argument folds over its items.
    if let [Value::List(_)] = values.as_slice() {
        if let Some(Value::List(items)) = values.pop() {
            values = items;
        }
    }
    let numbers = values
        .into_iter()
        .map(Value::into_number)
        .collect::<Result<Vec<_>, _>>()?;
    op.fold(numbers)
        .map(Value::Number)
        .ok_or_else(|| CompileError::argument(&function, "expected at least one argument"))
}

fn unary(op: UnaryOp, operand: Value) -> Result<Value, CompileError> {
    match (op, operand) {
        (UnaryOp::Neg, Value::Number(value)) => Ok(Value::Number(-value)),
        (UnaryOp::Pos, Value::Number(value)) => Ok(Value::Number(value)),
        (UnaryOp::Neg, Value::Metric(metric)) => Ok(Value::Metric(metric.neg())),
        (UnaryOp::Pos, Value::Metric(metric)) => Ok(Value::Metric(metric.pos())),
        (_, other) => Err(CompileError::Type(format!(
            "bad operand for unary operator: {}",
            other.type_name()
        ))),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, CompileError> {
    let has_metric = matches!(left, Value::Metric(_)) || matches!(right, Value::Metric(_));
    match op {
        BinaryOp::ShiftLeft | BinaryOp::ShiftRight => match (left, right) {
            (Value::Metric(metric), Value::Number(number)) => {
                let n = as_integer(number).ok_or_else(|| {
                    CompileError::Type(format!("shift amount must be an integer, got {number}"))
                })?;
                let n = if op == BinaryOp::ShiftLeft {
                    n.checked_neg().ok_or_else(|| {
                        CompileError::Type(format!("shift amount out of range: {n}"))
                    })?
                } else {
                    n
                };
                Ok(Value::Metric(Shift::new(metric, n, 0.0).into()))
            }
            (left, right) => Err(unsupported(op.symbol(), &left, &right)),
        },
        // value @ position
        BinaryOp::At if has_metric => Ok(Value::Metric(
            Pulse::new(right.into_operand()?, left.into_operand()?).into(),
        )),
        _ => {
            let arithmetic = match arithmetic_op(op) {
                Some(arithmetic) => arithmetic,
                None => return Err(unsupported(op.symbol(), &left, &right)),
            };
            match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(arithmetic.apply(a, b))),
                (left, right) if has_metric => Ok(Value::Metric(
                    Arithmetic::new(arithmetic, left.into_operand()?, right.into_operand()?)
                        .into(),
                )),
                (left, right) => Err(unsupported(op.symbol(), &left, &right)),
            }
        }
    }
}
