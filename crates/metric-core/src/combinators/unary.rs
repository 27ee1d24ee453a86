//! Single-child combinators that keep at most a scalar of state.

use crate::coerce::{coerce, Operand};
use crate::error::MetricError;
use crate::metric::{Metric, Node};
use crate::snapshot::NodeState;
use serde_json::{json, Value};

/// Clamp to non-negative values: `max(m, 0)`.
///
/// NaN passes through unchanged.
#[derive(Debug, Clone)]
pub struct Abs {
    metric: Metric,
}

impl Abs {
    pub fn new(metric: impl Into<Operand>) -> Self {
        Self {
            metric: coerce(metric),
        }
    }
}

impl Node for Abs {
    fn kind(&self) -> &'static str {
        "Abs"
    }

    fn calc(&mut self, _index: u64) -> f64 {
        let value = self.metric.step();
        if value < 0.0 {
            0.0
        } else {
            value
        }
    }

    fn reset(&mut self) {
        self.metric.reset();
    }

    fn snapshot(&self) -> NodeState {
        NodeState::Child(Box::new(self.metric.snapshot()))
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        match state {
            NodeState::Child(child) => self.metric.restore(child),
            other => Err(MetricError::mismatch(self.kind(), other.variant())),
        }
    }

    fn describe(&self) -> Value {
        json!({ "type": self.kind(), "metric": self.metric.describe() })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

/// Running sum.
#[derive(Debug, Clone)]
pub struct Acc {
    metric: Metric,
    total: f64,
}

impl Acc {
    pub fn new(metric: impl Into<Operand>) -> Self {
        Self {
            metric: coerce(metric),
            total: 0.0,
        }
    }
}

impl Node for Acc {
    fn kind(&self) -> &'static str {
        "Acc"
    }

    fn calc(&mut self, _index: u64) -> f64 {
        self.total += self.metric.step();
        self.total
    }

    fn reset(&mut self) {
        self.metric.reset();
        self.total = 0.0;
    }

    fn snapshot(&self) -> NodeState {
        NodeState::Accumulator {
            child: Box::new(self.metric.snapshot()),
            total: self.total,
        }
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        match state {
            NodeState::Accumulator { child, total } => {
                self.metric.restore(child)?;
                self.total = *total;
                Ok(())
            }
            other => Err(MetricError::mismatch(self.kind(), other.variant())),
        }
    }

    fn describe(&self) -> Value {
        json!({ "type": self.kind(), "metric": self.metric.describe() })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

/// Difference to the previous value; NaN on the first step.
#[derive(Debug, Clone)]
pub struct Diff {
    metric: Metric,
    previous: f64,
}

impl Diff {
    pub fn new(metric: impl Into<Operand>) -> Self {
        Self {
            metric: coerce(metric),
            previous: f64::NAN,
        }
    }
}

impl Node for Diff {
    fn kind(&self) -> &'static str {
        "Diff"
    }

    fn calc(&mut self, _index: u64) -> f64 {
        let value = self.metric.step();
        let delta = value - self.previous;
        self.previous = value;
        delta
    }

    fn reset(&mut self) {
        self.metric.reset();
        self.previous = f64::NAN;
    }

    fn snapshot(&self) -> NodeState {
        NodeState::Previous {
            child: Box::new(self.metric.snapshot()),
            previous: self.previous,
        }
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        match state {
            NodeState::Previous { child, previous } => {
                self.metric.restore(child)?;
                self.previous = *previous;
                Ok(())
            }
            other => Err(MetricError::mismatch(self.kind(), other.variant())),
        }
    }

    fn describe(&self) -> Value {
        json!({ "type": self.kind(), "metric": self.metric.describe() })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

/// Shift a metric in time.
///
/// A positive `n` delays the metric: `padding` is emitted for the first `n`
/// steps. A negative `n` skips `-n` steps of the metric up front (and again
/// after every reset), so it runs ahead.
#[derive(Debug, Clone)]
pub struct Shift {
    metric: Metric,
    n: i64,
    padding: f64,
    remaining: u64,
}

impl Shift {
    pub fn new(metric: impl Into<Operand>, n: i64, padding: f64) -> Self {
        let mut shift = Self {
            metric: coerce(metric),
            n,
            padding,
            remaining: 0,
        };
        shift.prime();
        shift
    }

    fn prime(&mut self) {
        if self.n < 0 {
            for _ in 0..self.n.unsigned_abs() {
                self.metric.step();
            }
        }
        self.remaining = self.n.max(0) as u64;
    }
}

impl Node for Shift {
    fn kind(&self) -> &'static str {
        "Shift"
    }

    fn calc(&mut self, _index: u64) -> f64 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.padding
        } else {
            self.metric.step()
        }
    }

    fn reset(&mut self) {
        self.metric.reset();
        self.prime();
    }

    fn snapshot(&self) -> NodeState {
        NodeState::Shift {
            child: Box::new(self.metric.snapshot()),
            remaining: self.remaining,
        }
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        match state {
            NodeState::Shift { child, remaining } => {
                self.metric.restore(child)?;
                self.remaining = *remaining;
                Ok(())
            }
            other => Err(MetricError::mismatch(self.kind(), other.variant())),
        }
    }

    fn describe(&self) -> Value {
        json!({
            "type": self.kind(),
            "metric": self.metric.describe(),
            "n": self.n,
            "padding": self.padding,
        })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abs_clamps_negatives() {
        let mut metric = Metric::new(Abs::new(vec![-2.0, 3.0, -0.5, f64::NAN]));
        let values = metric.take(4);
        assert_eq!(&values[..3], &[0.0, 3.0, 0.0]);
        assert!(values[3].is_nan());
    }

    #[test]
    fn test_acc_counts_and_resets() {
        let mut metric = Metric::new(Acc::new(1.0));
        assert_eq!(metric.take(4), vec![1.0, 2.0, 3.0, 4.0]);
        metric.reset();
        assert_eq!(metric.step(), 1.0);
    }

    #[test]
    fn test_diff_recovers_acc_source() {
        let source = vec![3.0, -1.0, 4.0, 1.5, 9.0];
        let mut metric = Metric::new(Diff::new(Acc::new(source.clone())));
        let values = metric.take(5);
        assert!(values[0].is_nan());
        assert_eq!(&values[1..], &source[1..]);
    }

    #[test]
    fn test_shift_pads() {
        let mut metric = Metric::new(Shift::new(vec![5.0, 6.0, 7.0], 2, 0.0));
        assert_eq!(metric.take(7), vec![0.0, 0.0, 5.0, 6.0, 7.0, 0.0, 0.0]);
    }

    #[test]
    fn test_shift_negative_runs_ahead_after_reset() {
        let mut metric = Metric::new(Shift::new(vec![5.0, 6.0, 7.0], -1, 9.0));
        assert_eq!(metric.take(3), vec![6.0, 7.0, 0.0]);
        metric.reset();
        assert_eq!(metric.take(2), vec![6.0, 7.0]);
    }

    #[test]
    fn test_shift_custom_padding_after_reset() {
        let mut metric = Metric::new(Shift::new(1.0, 1, -1.0));
        assert_eq!(metric.take(2), vec![-1.0, 1.0]);
        metric.reset();
        assert_eq!(metric.take(2), vec![-1.0, 1.0]);
    }
}
