//! Free-function form of the algebra.
//!
//! Operand order is preserved exactly: `sub(1.0, m)` is `Sub(Const(1), m)`,
//! which is how reflected operators such as `1 - m` are built.

use crate::coerce::{coerce, Operand};
use crate::combinators::{Abs, Arithmetic, ArithmeticOp, Concat, Extremum, ExtremumOp, Pulse};
use crate::error::MetricError;
use crate::metric::Metric;

pub fn add(a: impl Into<Operand>, b: impl Into<Operand>) -> Metric {
    Arithmetic::new(ArithmeticOp::Add, a, b).into()
}

pub fn sub(a: impl Into<Operand>, b: impl Into<Operand>) -> Metric {
    Arithmetic::new(ArithmeticOp::Sub, a, b).into()
}

pub fn mul(a: impl Into<Operand>, b: impl Into<Operand>) -> Metric {
    Arithmetic::new(ArithmeticOp::Mul, a, b).into()
}

pub fn div(a: impl Into<Operand>, b: impl Into<Operand>) -> Metric {
    Arithmetic::new(ArithmeticOp::Div, a, b).into()
}

pub fn floor_div(a: impl Into<Operand>, b: impl Into<Operand>) -> Metric {
    Arithmetic::new(ArithmeticOp::FloorDiv, a, b).into()
}

pub fn rem(a: impl Into<Operand>, b: impl Into<Operand>) -> Metric {
    Arithmetic::new(ArithmeticOp::Mod, a, b).into()
}

pub fn pow(a: impl Into<Operand>, b: impl Into<Operand>) -> Metric {
    Arithmetic::new(ArithmeticOp::Pow, a, b).into()
}

pub fn abs(x: impl Into<Operand>) -> Metric {
    Abs::new(x).into()
}

pub fn concat(a: impl Into<Operand>, b: impl Into<Operand>, at: u64) -> Metric {
    Concat::new(a, b, at).into()
}

pub fn pulse(pos: impl Into<Operand>, val: impl Into<Operand>) -> Metric {
    Pulse::new(pos, val).into()
}

pub fn min(operands: impl IntoIterator<Item = Operand>) -> Result<Metric, MetricError> {
    Ok(Extremum::new(ExtremumOp::Min, operands)?.into())
}

pub fn max(operands: impl IntoIterator<Item = Operand>) -> Result<Metric, MetricError> {
    Ok(Extremum::new(ExtremumOp::Max, operands)?.into())
}

/// Coerce a literal into a metric; see [`coerce`].
pub fn lift(x: impl Into<Operand>) -> Metric {
    coerce(x)
}
