//! Deterministic leaves.

use crate::error::MetricError;
use crate::metric::Node;
use crate::snapshot::NodeState;
use serde_json::{json, Value};

/// Always the same value.
#[derive(Debug, Clone)]
pub struct Const {
    value: f64,
}

impl Const {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Node for Const {
    fn kind(&self) -> &'static str {
        "Const"
    }

    fn calc(&mut self, _index: u64) -> f64 {
        self.value
    }

    fn reset(&mut self) {}

    fn snapshot(&self) -> NodeState {
        NodeState::Stateless
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        restore_stateless(self.kind(), state)
    }

    fn describe(&self) -> Value {
        json!({ "type": self.kind(), "value": self.value })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

/// A finite run of values followed by zeros.
#[derive(Debug, Clone)]
pub struct Fragment {
    values: Vec<f64>,
}

impl Fragment {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }
}

impl Node for Fragment {
    fn kind(&self) -> &'static str {
        "Fragment"
    }

    fn calc(&mut self, index: u64) -> f64 {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.values.get(i))
            .copied()
            .unwrap_or(0.0)
    }

    fn reset(&mut self) {}

    fn snapshot(&self) -> NodeState {
        NodeState::Stateless
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        restore_stateless(self.kind(), state)
    }

    fn describe(&self) -> Value {
        json!({ "type": self.kind(), "values": self.values, "len": self.values.len() })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

pub(crate) fn restore_stateless(kind: &'static str, state: &NodeState) -> Result<(), MetricError> {
    match state {
        NodeState::Stateless => Ok(()),
        other => Err(MetricError::mismatch(kind, other.variant())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Metric;

    #[test]
    fn test_const_forever_and_after_reset() {
        let mut metric = Metric::new(Const::new(7.0));
        assert!(metric.take(100).iter().all(|v| *v == 7.0));
        metric.reset();
        assert_eq!(metric.step(), 7.0);
    }

    #[test]
    fn test_fragment_pads_with_zero() {
        let mut metric = Metric::new(Fragment::new(vec![5.0, 6.0, 7.0]));
        assert_eq!(metric.take(5), vec![5.0, 6.0, 7.0, 0.0, 0.0]);
    }

    #[test]
    fn test_empty_fragment() {
        let mut metric = Metric::new(Fragment::new(Vec::new()));
        assert_eq!(metric.take(2), vec![0.0, 0.0]);
    }
}
