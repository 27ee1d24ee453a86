//! Fluent construction of metric graphs and derived shapes.
//!
//! Methods on [`Metric`] consume the receiver and return the combinator
//! wrapping it; the receiver always becomes the first child. The pulse
//! helpers come in both orientations: `pos.as_pos(val)` and
//! `val.as_val(pos)` build the same [`Pulse`].

use crate::coerce::Operand;
use crate::combinators::{
    Abs, Acc, Arithmetic, ArithmeticOp, AutoRegress, Concat, Cycle, Diff, Downsample,
    DownsampleMethod, Pulse, Regress, Repeat, Shift, Smooth,
};
use crate::error::MetricError;
use crate::generators::Const;
use crate::metric::Metric;
use std::cmp::Ordering;

impl Metric {
    fn arithmetic(self, op: ArithmeticOp, other: impl Into<Operand>) -> Metric {
        Arithmetic::new(op, self, other).into()
    }

    pub fn plus(self, other: impl Into<Operand>) -> Metric {
        self.arithmetic(ArithmeticOp::Add, other)
    }

    pub fn minus(self, other: impl Into<Operand>) -> Metric {
        self.arithmetic(ArithmeticOp::Sub, other)
    }

    pub fn times(self, other: impl Into<Operand>) -> Metric {
        self.arithmetic(ArithmeticOp::Mul, other)
    }

    pub fn divided_by(self, other: impl Into<Operand>) -> Metric {
        self.arithmetic(ArithmeticOp::Div, other)
    }

    pub fn floor_div(self, other: impl Into<Operand>) -> Metric {
        self.arithmetic(ArithmeticOp::FloorDiv, other)
    }

    pub fn modulo(self, other: impl Into<Operand>) -> Metric {
        self.arithmetic(ArithmeticOp::Mod, other)
    }

    pub fn pow(self, other: impl Into<Operand>) -> Metric {
        self.arithmetic(ArithmeticOp::Pow, other)
    }

    /// `0 - self`
    pub fn neg(self) -> Metric {
        Arithmetic::new(ArithmeticOp::Sub, 0.0, self).into()
    }

    /// `0 + self`
    pub fn pos(self) -> Metric {
        Arithmetic::new(ArithmeticOp::Add, 0.0, self).into()
    }

    /// Run `n` steps ahead. `i64::MIN` saturates to `i64::MAX`.
    pub fn shift_left(self, n: i64) -> Metric {
        Shift::new(self, n.saturating_neg(), 0.0).into()
    }

    /// Delay by `n` steps, padding with zeros.
    pub fn shift_right(self, n: i64) -> Metric {
        Shift::new(self, n, 0.0).into()
    }

    pub fn abs(self) -> Metric {
        Abs::new(self).into()
    }

    pub fn acc(self) -> Metric {
        Acc::new(self).into()
    }

    pub fn diff(self) -> Metric {
        Diff::new(self).into()
    }

    pub fn shift(self, n: i64, padding: f64) -> Metric {
        Shift::new(self, n, padding).into()
    }

    pub fn smooth(self, window_size: usize) -> Result<Metric, MetricError> {
        Ok(Smooth::new(self, window_size)?.into())
    }

    pub fn regress(
        self,
        factors: Vec<f64>,
        paddings: Option<Operand>,
    ) -> Result<Metric, MetricError> {
        Ok(Regress::new(self, factors, paddings)?.into())
    }

    pub fn autoregress(self, factors: Vec<f64>) -> Result<Metric, MetricError> {
        Ok(AutoRegress::new(self, factors)?.into())
    }

    pub fn downsample(
        self,
        sample_size: usize,
        method: DownsampleMethod,
    ) -> Result<Metric, MetricError> {
        Ok(Downsample::new(self, sample_size, method)?.into())
    }

    pub fn repeat(self, start: u64, end: u64, n: Option<u64>) -> Result<Metric, MetricError> {
        Ok(Repeat::new(self, start, end, n)?.into())
    }

    pub fn cycle(self, start: u64, end: u64, n: Option<u64>) -> Result<Metric, MetricError> {
        Ok(Cycle::new(self, start, end, n)?.into())
    }

    /// `self` before index `at`, `other` from there on.
    pub fn concat(self, at: u64, other: impl Into<Operand>) -> Metric {
        Concat::new(self, other, at).into()
    }

    /// Pulse with `self` as positions.
    pub fn as_pos(self, val: impl Into<Operand>) -> Metric {
        Pulse::new(self, val).into()
    }

    /// Alias of [`Metric::as_pos`].
    pub fn val(self, val: impl Into<Operand>) -> Metric {
        self.as_pos(val)
    }

    /// Pulse with `self` as values.
    pub fn as_val(self, pos: impl Into<Operand>) -> Metric {
        Pulse::new(pos, self).into()
    }

    /// Alias of [`Metric::as_val`].
    pub fn at_pos(self, pos: impl Into<Operand>) -> Metric {
        self.as_val(pos)
    }
}

/// `bottom` outside `[left, right)`, `up` inside.
pub fn rect(left: u64, right: u64, bottom: f64, up: f64) -> Metric {
    Metric::new(Const::new(bottom))
        .concat(left, Const::new(up))
        .concat(right, Const::new(bottom))
}

/// Piecewise-linear ramp through `(x, y)` points.
///
/// Holds `y` of the first point before it and `y` of the last point after
/// it. Positions must be strictly increasing; fractional positions switch
/// segments at the next whole index.
pub fn lines(points: &[(f64, f64)]) -> Result<Metric, MetricError> {
    let (&(first_x, first_y), rest) = points.split_first().ok_or(MetricError::EmptyPoints)?;
    let switch_at = |x: f64| x.max(0.0).ceil() as u64;

    let mut metric = Metric::new(Const::new(first_y));
    let (mut x0, mut y0) = (first_x, first_y);
    for &(x1, y1) in rest {
        if x1.partial_cmp(&x0) != Some(Ordering::Greater) {
            return Err(MetricError::InvalidParameter {
                name: "points",
                reason: format!("x positions must be strictly increasing ({x0} then {x1})"),
            });
        }
        let delta = (y1 - y0) / (x1 - x0);
        let ramp = Metric::new(Const::new(delta)).acc().plus(y0).minus(delta);
        metric = metric.concat(switch_at(x0), ramp);
        (x0, y0) = (x1, y1);
    }
    Ok(metric.concat(switch_at(x0), Const::new(y0)))
}
