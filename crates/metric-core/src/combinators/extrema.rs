//! N-ary elementwise minimum and maximum.

use crate::coerce::{coerce, Operand};
use crate::error::MetricError;
use crate::metric::{Metric, Node};
use crate::snapshot::NodeState;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtremumOp {
    Min,
    Max,
}

impl ExtremumOp {
    pub fn name(&self) -> &'static str {
        match self {
            ExtremumOp::Min => "Min",
            ExtremumOp::Max => "Max",
        }
    }

    /// Fold values left to right, replacing the running result only on a
    /// strict improvement. A leading NaN therefore sticks.
    pub fn fold(&self, values: impl IntoIterator<Item = f64>) -> Option<f64> {
        values.into_iter().reduce(|best, value| {
            let better = match self {
                ExtremumOp::Min => value < best,
                ExtremumOp::Max => value > best,
            };
            if better {
                value
            } else {
                best
            }
        })
    }
}

/// Elementwise min or max across all operands.
#[derive(Debug, Clone)]
pub struct Extremum {
    op: ExtremumOp,
    metrics: Vec<Metric>,
}

impl Extremum {
    pub fn new(
        op: ExtremumOp,
        operands: impl IntoIterator<Item = Operand>,
    ) -> Result<Self, MetricError> {
        let metrics: Vec<Metric> = operands.into_iter().map(coerce).collect();
        if metrics.is_empty() {
            return Err(MetricError::EmptyOperands(op.name()));
        }
        Ok(Self { op, metrics })
    }
}

impl Node for Extremum {
    fn kind(&self) -> &'static str {
        self.op.name()
    }

    fn calc(&mut self, _index: u64) -> f64 {
        let values: Vec<f64> = self.metrics.iter_mut().map(Metric::step).collect();
        self.op.fold(values).unwrap_or(f64::NAN)
    }

    fn reset(&mut self) {
        self.metrics.iter_mut().for_each(Metric::reset);
    }

    fn snapshot(&self) -> NodeState {
        NodeState::Many(self.metrics.iter().map(Metric::snapshot).collect())
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        match state {
            NodeState::Many(children) if children.len() == self.metrics.len() => {
                for (metric, child) in self.metrics.iter_mut().zip(children) {
                    metric.restore(child)?;
                }
                Ok(())
            }
            NodeState::Many(children) => Err(MetricError::mismatch(
                format!("{} operands", self.metrics.len()),
                format!("{} operands", children.len()),
            )),
            other => Err(MetricError::mismatch(self.kind(), other.variant())),
        }
    }

    fn describe(&self) -> Value {
        let metrics: Vec<Value> = self.metrics.iter().map(Metric::describe).collect();
        json!({ "type": self.kind(), "metrics": metrics })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_elementwise() {
        let operands = || vec![Operand::from(vec![1.0, 5.0, 3.0]), Operand::from(2.0)];
        let mut min = Metric::new(Extremum::new(ExtremumOp::Min, operands()).unwrap());
        let mut max = Metric::new(Extremum::new(ExtremumOp::Max, operands()).unwrap());
        assert_eq!(min.take(3), vec![1.0, 2.0, 2.0]);
        assert_eq!(max.take(3), vec![2.0, 5.0, 3.0]);
    }

    #[test]
    fn test_requires_operands() {
        assert_eq!(
            Extremum::new(ExtremumOp::Max, Vec::new()).unwrap_err(),
            MetricError::EmptyOperands("Max")
        );
    }

    #[test]
    fn test_restore_checks_arity() {
        let operands = |n: usize| (0..n).map(|i| Operand::Number(i as f64));
        let two = Metric::new(Extremum::new(ExtremumOp::Min, operands(2)).unwrap());
        let mut three = Metric::new(Extremum::new(ExtremumOp::Min, operands(3)).unwrap());
        assert!(three.restore(&two.snapshot()).is_err());
    }
}
