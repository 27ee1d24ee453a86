//! Binary combinators: elementwise arithmetic and concatenation.

use crate::coerce::{coerce, Operand};
use crate::error::MetricError;
use crate::metric::{Metric, Node};
use crate::snapshot::NodeState;
use serde_json::{json, Value};

/// Elementwise binary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl ArithmeticOp {
    pub fn name(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "Add",
            ArithmeticOp::Sub => "Sub",
            ArithmeticOp::Mul => "Mul",
            ArithmeticOp::Div => "Div",
            ArithmeticOp::FloorDiv => "FloorDiv",
            ArithmeticOp::Mod => "Mod",
            ArithmeticOp::Pow => "Pow",
        }
    }

    /// Combine two values.
    ///
    /// Division yields NaN for a NaN divisor and `+∞` for a zero divisor.
    /// Modulo yields NaN for a NaN divisor, the dividend for a zero divisor,
    /// and otherwise takes the sign of the divisor.
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            ArithmeticOp::Add => a + b,
            ArithmeticOp::Sub => a - b,
            ArithmeticOp::Mul => a * b,
            ArithmeticOp::Div | ArithmeticOp::FloorDiv => {
                if b.is_nan() {
                    f64::NAN
                } else if b == 0.0 {
                    f64::INFINITY
                } else if *self == ArithmeticOp::FloorDiv {
                    (a / b).floor()
                } else {
                    a / b
                }
            }
            ArithmeticOp::Mod => {
                if b.is_nan() {
                    f64::NAN
                } else if b == 0.0 {
                    a
                } else {
                    let r = a % b;
                    if r != 0.0 && (r < 0.0) != (b < 0.0) {
                        r + b
                    } else {
                        r
                    }
                }
            }
            ArithmeticOp::Pow => a.powf(b),
        }
    }
}

/// Elementwise combination of two metrics.
#[derive(Debug, Clone)]
pub struct Arithmetic {
    op: ArithmeticOp,
    left: Metric,
    right: Metric,
}

impl Arithmetic {
    pub fn new(op: ArithmeticOp, left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Self {
            op,
            left: coerce(left),
            right: coerce(right),
        }
    }

    pub fn op(&self) -> ArithmeticOp {
        self.op
    }
}

impl Node for Arithmetic {
    fn kind(&self) -> &'static str {
        self.op.name()
    }

    fn calc(&mut self, _index: u64) -> f64 {
        let a = self.left.step();
        let b = self.right.step();
        self.op.apply(a, b)
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    fn snapshot(&self) -> NodeState {
        NodeState::Pair {
            left: Box::new(self.left.snapshot()),
            right: Box::new(self.right.snapshot()),
        }
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        restore_pair(self.kind(), &mut self.left, &mut self.right, state)
    }

    fn describe(&self) -> Value {
        json!({
            "type": self.kind(),
            "metric1": self.left.describe(),
            "metric2": self.right.describe(),
        })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

/// `left` for own indices below `at`, `right` from then on.
///
/// Only the selected side is stepped, so `right` starts from its own index 0
/// when the switch happens.
#[derive(Debug, Clone)]
pub struct Concat {
    left: Metric,
    right: Metric,
    at: u64,
}

impl Concat {
    pub fn new(left: impl Into<Operand>, right: impl Into<Operand>, at: u64) -> Self {
        Self {
            left: coerce(left),
            right: coerce(right),
            at,
        }
    }
}

impl Node for Concat {
    fn kind(&self) -> &'static str {
        "Concat"
    }

    fn calc(&mut self, index: u64) -> f64 {
        if index < self.at {
            self.left.step()
        } else {
            self.right.step()
        }
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    fn snapshot(&self) -> NodeState {
        NodeState::Pair {
            left: Box::new(self.left.snapshot()),
            right: Box::new(self.right.snapshot()),
        }
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        restore_pair(self.kind(), &mut self.left, &mut self.right, state)
    }

    fn describe(&self) -> Value {
        json!({
            "type": self.kind(),
            "metric1": self.left.describe(),
            "metric2": self.right.describe(),
            "at": self.at,
        })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

fn restore_pair(
    kind: &'static str,
    left: &mut Metric,
    right: &mut Metric,
    state: &NodeState,
) -> Result<(), MetricError> {
    match state {
        NodeState::Pair {
            left: left_state,
            right: right_state,
        } => {
            left.restore(left_state)?;
            right.restore(right_state)
        }
        other => Err(MetricError::mismatch(kind, other.variant())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_division_edge_cases() {
        let mut by_zero = Metric::new(Arithmetic::new(ArithmeticOp::Div, vec![1.0, -3.0], 0.0));
        assert_eq!(by_zero.take(3), vec![f64::INFINITY; 3]);
        let mut by_nan = Metric::new(Arithmetic::new(ArithmeticOp::Div, 1.0, f64::NAN));
        assert!(by_nan.take(3).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_floor_division() {
        assert_eq!(ArithmeticOp::FloorDiv.apply(7.0, 2.0), 3.0);
        assert_eq!(ArithmeticOp::FloorDiv.apply(-7.0, 2.0), -4.0);
        assert_eq!(ArithmeticOp::Div.apply(7.0, 2.0), 3.5);
    }

    #[test]
    fn test_modulo_edge_cases() {
        assert_eq!(ArithmeticOp::Mod.apply(7.0, 0.0), 7.0);
        assert!(ArithmeticOp::Mod.apply(7.0, f64::NAN).is_nan());
        assert_eq!(ArithmeticOp::Mod.apply(7.0, 3.0), 1.0);
        assert_eq!(ArithmeticOp::Mod.apply(-7.0, 3.0), 2.0);
        assert_eq!(ArithmeticOp::Mod.apply(7.0, -3.0), -2.0);
    }

    #[test]
    fn test_elementwise_ops() {
        let mut sum = Metric::new(Arithmetic::new(ArithmeticOp::Add, vec![1.0, 2.0], 10.0));
        assert_eq!(sum.take(3), vec![11.0, 12.0, 10.0]);
        let mut power = Metric::new(Arithmetic::new(ArithmeticOp::Pow, 2.0, vec![1.0, 2.0, 3.0]));
        assert_eq!(power.take(3), vec![2.0, 4.0, 8.0]);
        assert_eq!(sum.kind(), "Add");
    }

    #[test]
    fn test_concat_advances_selected_side_only() {
        let mut metric = Metric::new(Concat::new(vec![1.0, 2.0, 3.0], vec![7.0, 8.0], 2));
        assert_eq!(metric.take(5), vec![1.0, 2.0, 7.0, 8.0, 0.0]);
        metric.reset();
        assert_eq!(metric.take(3), vec![1.0, 2.0, 7.0]);
    }
}
