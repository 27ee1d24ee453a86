//! Event-style pulses.

use crate::coerce::{coerce, Operand};
use crate::error::MetricError;
use crate::metric::{Metric, Node};
use crate::snapshot::NodeState;
use serde_json::{json, Value};

/// Emit scheduled values at scheduled positions, zero elsewhere.
///
/// `pos` and `val` are stepped in lockstep: one pair is pulled ahead of time
/// (at construction and after reset) and the next pair is pulled each time
/// the pending position is reached. Positions must be increasing for every
/// event to fire.
#[derive(Debug, Clone)]
pub struct Pulse {
    pos: Metric,
    val: Metric,
    pending: (f64, f64),
}

impl Pulse {
    pub fn new(pos: impl Into<Operand>, val: impl Into<Operand>) -> Self {
        let mut pos = coerce(pos);
        let mut val = coerce(val);
        let pending = (pos.step(), val.step());
        Self { pos, val, pending }
    }
}

impl Node for Pulse {
    fn kind(&self) -> &'static str {
        "Pulse"
    }

    fn calc(&mut self, index: u64) -> f64 {
        let (position, value) = self.pending;
        if index as f64 == position {
            self.pending = (self.pos.step(), self.val.step());
            value
        } else {
            0.0
        }
    }

    fn reset(&mut self) {
        self.pos.reset();
        self.val.reset();
        self.pending = (self.pos.step(), self.val.step());
    }

    fn snapshot(&self) -> NodeState {
        NodeState::Pulse {
            pos: Box::new(self.pos.snapshot()),
            val: Box::new(self.val.snapshot()),
            pending: self.pending,
        }
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        match state {
            NodeState::Pulse { pos, val, pending } => {
                self.pos.restore(pos)?;
                self.val.restore(val)?;
                self.pending = *pending;
                Ok(())
            }
            other => Err(MetricError::mismatch(self.kind(), other.variant())),
        }
    }

    fn describe(&self) -> Value {
        json!({
            "type": self.kind(),
            "pos": self.pos.describe(),
            "val": self.val.describe(),
        })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::Acc;

    #[test]
    fn test_pulse_fires_at_positions() {
        let mut metric = Metric::new(Pulse::new(vec![1.0, 4.0], vec![10.0, 20.0]));
        assert_eq!(metric.take(6), vec![0.0, 10.0, 0.0, 0.0, 20.0, 0.0]);
        metric.reset();
        assert_eq!(metric.take(2), vec![0.0, 10.0]);
    }

    #[test]
    fn test_periodic_pulse_from_metrics() {
        // positions 2, 5, 8, ... with values 1, 2, 3, ...
        let positions = Acc::new(vec![2.0, 3.0, 3.0, 3.0]);
        let mut metric = Metric::new(Pulse::new(positions, Acc::new(1.0)));
        assert_eq!(
            metric.take(9),
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 3.0]
        );
    }
}
