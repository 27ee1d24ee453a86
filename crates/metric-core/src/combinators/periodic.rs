//! Time-windowed repetition.
//!
//! Both combinators are active on `[start, start + (end - start) * n)`, or
//! on `[start, ∞)` when `n` is unset, and pass the metric through outside.
//! [`Repeat`] replays recorded values; [`Cycle`] replays the metric itself by
//! restoring it from a checkpoint at every period boundary, so nested state
//! (random generators, accumulators, windows) is replayed too.

use crate::coerce::{coerce, Operand};
use crate::error::MetricError;
use crate::metric::{Metric, Node};
use crate::snapshot::{NodeState, Snapshot};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy)]
struct Window {
    start: u64,
    end: u64,
    n: Option<u64>,
}

impl Window {
    fn new(start: u64, end: u64, n: Option<u64>) -> Result<Self, MetricError> {
        if end <= start {
            return Err(MetricError::InvalidWindow { start, end });
        }
        Ok(Self { start, end, n })
    }

    fn period(&self) -> u64 {
        self.end - self.start
    }

    fn contains(&self, index: u64) -> bool {
        if index < self.start {
            return false;
        }
        match self.n {
            Some(n) => index < self.start.saturating_add(self.period().saturating_mul(n)),
            None => true,
        }
    }

    /// Position within the current period.
    fn offset(&self, index: u64) -> u64 {
        (index - self.start) % self.period()
    }

    fn describe(&self, kind: &str, metric: &Metric) -> Value {
        json!({
            "type": kind,
            "metric": metric.describe(),
            "start": self.start,
            "end": self.end,
            "n": self.n,
        })
    }
}

/// Record the first period inside the window and replay its values.
#[derive(Debug, Clone)]
pub struct Repeat {
    metric: Metric,
    window: Window,
    recorded: Vec<f64>,
}

impl Repeat {
    pub fn new(
        metric: impl Into<Operand>,
        start: u64,
        end: u64,
        n: Option<u64>,
    ) -> Result<Self, MetricError> {
        Ok(Self {
            metric: coerce(metric),
            window: Window::new(start, end, n)?,
            recorded: Vec::new(),
        })
    }
}

impl Node for Repeat {
    fn kind(&self) -> &'static str {
        "Repeat"
    }

    fn calc(&mut self, index: u64) -> f64 {
        if !self.window.contains(index) {
            self.metric.step()
        } else if (self.recorded.len() as u64) < self.window.period() {
            let value = self.metric.step();
            self.recorded.push(value);
            value
        } else {
            self.recorded[self.window.offset(index) as usize]
        }
    }

    fn reset(&mut self) {
        self.metric.reset();
        self.recorded.clear();
    }

    fn snapshot(&self) -> NodeState {
        NodeState::Recording {
            child: Box::new(self.metric.snapshot()),
            recorded: self.recorded.clone(),
        }
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        match state {
            NodeState::Recording { child, recorded } => {
                self.metric.restore(child)?;
                self.recorded = recorded.clone();
                Ok(())
            }
            other => Err(MetricError::mismatch(self.kind(), other.variant())),
        }
    }

    fn describe(&self) -> Value {
        self.window.describe(self.kind(), &self.metric)
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

/// Checkpoint state of a [`Cycle`].
#[derive(Debug, Clone)]
enum CyclePhase {
    /// Window not entered yet
    Inactive,
    /// Window entered; the metric is rolled back here at each period start
    Replaying(Box<Snapshot>),
}

/// Replay the metric's whole trajectory every period inside the window.
#[derive(Debug, Clone)]
pub struct Cycle {
    metric: Metric,
    window: Window,
    phase: CyclePhase,
}

impl Cycle {
    pub fn new(
        metric: impl Into<Operand>,
        start: u64,
        end: u64,
        n: Option<u64>,
    ) -> Result<Self, MetricError> {
        Ok(Self {
            metric: coerce(metric),
            window: Window::new(start, end, n)?,
            phase: CyclePhase::Inactive,
        })
    }
}

impl Node for Cycle {
    fn kind(&self) -> &'static str {
        "Cycle"
    }

    fn calc(&mut self, index: u64) -> f64 {
        if !self.window.contains(index) {
            return self.metric.step();
        }
        if let CyclePhase::Replaying(checkpoint) = &self.phase {
            if self.window.offset(index) == 0 {
                // Checkpoints are taken from this metric or checked against it
                // in `restore`, so rolling back cannot mismatch.
                let restored = self.metric.restore(checkpoint);
                debug_assert!(restored.is_ok(), "cycle checkpoint does not fit its metric");
                tracing::trace!(index, "cycle rolled back to checkpoint");
            }
        } else {
            tracing::debug!(index, "cycle window entered, taking checkpoint");
            self.phase = CyclePhase::Replaying(Box::new(self.metric.snapshot()));
        }
        self.metric.step()
    }

    fn reset(&mut self) {
        self.metric.reset();
        self.phase = CyclePhase::Inactive;
    }

    fn snapshot(&self) -> NodeState {
        let checkpoint = match &self.phase {
            CyclePhase::Inactive => None,
            CyclePhase::Replaying(checkpoint) => Some(checkpoint.clone()),
        };
        NodeState::Cycle {
            child: Box::new(self.metric.snapshot()),
            checkpoint,
        }
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        match state {
            NodeState::Cycle { child, checkpoint } => {
                if let Some(checkpoint) = checkpoint {
                    self.metric.clone().restore(checkpoint)?;
                }
                self.metric.restore(child)?;
                self.phase = match checkpoint {
                    None => CyclePhase::Inactive,
                    Some(checkpoint) => CyclePhase::Replaying(checkpoint.clone()),
                };
                Ok(())
            }
            other => Err(MetricError::mismatch(self.kind(), other.variant())),
        }
    }

    fn describe(&self) -> Value {
        self.window.describe(self.kind(), &self.metric)
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{Acc, Smooth};
    use crate::generators::{Normal, Rand};

    #[test]
    fn test_repeat_replays_buffer() {
        let mut metric = Metric::new(Repeat::new(Acc::new(1.0), 2, 4, Some(2)).unwrap());
        // before window: 1, 2; recorded: 3, 4; replayed: 3, 4; after: 5, 6
        assert_eq!(metric.take(8), vec![1.0, 2.0, 3.0, 4.0, 3.0, 4.0, 5.0, 6.0]);
        metric.reset();
        assert_eq!(metric.take(5), vec![1.0, 2.0, 3.0, 4.0, 3.0]);
    }

    #[test]
    fn test_repeat_unbounded() {
        let mut metric = Metric::new(Repeat::new(Acc::new(1.0), 0, 3, None).unwrap());
        assert_eq!(metric.take(9), vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_window_validation() {
        assert_eq!(
            Cycle::new(1.0, 5, 5, None).unwrap_err(),
            MetricError::InvalidWindow { start: 5, end: 5 }
        );
        assert!(Repeat::new(1.0, 4, 2, Some(1)).is_err());
    }

    #[test]
    fn test_cycle_replays_random_state() {
        let source = Rand::new(0.0, 10.0).with_seed(9);
        let mut metric = Metric::new(Cycle::new(source, 0, 3, Some(2)).unwrap());
        let values = metric.take(9);
        assert_eq!(&values[3..6], &values[0..3]);
        assert_ne!(&values[6..9], &values[0..3]);
    }

    #[test]
    fn test_cycle_replays_nested_state() {
        let noise = Normal::new(1.0, 0.0).unwrap().with_seed(5);
        let source = Smooth::new(Acc::new(noise), 3).unwrap();
        let mut metric = Metric::new(Cycle::new(source, 2, 6, None).unwrap());
        let values = metric.take(14);
        assert_eq!(&values[6..10], &values[2..6]);
        assert_eq!(&values[10..14], &values[2..6]);
    }

    #[test]
    fn test_cycle_continues_after_window() {
        let mut metric = Metric::new(Cycle::new(Acc::new(1.0), 1, 3, Some(2)).unwrap());
        // 1 | 2 3 | 2 3 | then the restored accumulator continues: 4 5
        assert_eq!(metric.take(7), vec![1.0, 2.0, 3.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_cycle_reset_drops_checkpoint() {
        let mut metric = Metric::new(Cycle::new(Acc::new(1.0), 0, 2, None).unwrap());
        assert_eq!(metric.take(4), vec![1.0, 2.0, 1.0, 2.0]);
        metric.reset();
        assert!(matches!(
            metric.snapshot().state,
            NodeState::Cycle {
                checkpoint: None,
                ..
            }
        ));
        assert_eq!(metric.take(3), vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_cycle_restore_rejects_foreign_checkpoint() {
        let mut metric = Metric::new(Cycle::new(Acc::new(1.0), 0, 2, None).unwrap());
        metric.take(3);
        let mut snapshot = metric.snapshot();
        if let NodeState::Cycle { checkpoint, .. } = &mut snapshot.state {
            *checkpoint = Some(Box::new(Metric::new(Rand::unit()).snapshot()));
        }

        let mut target = Metric::new(Cycle::new(Acc::new(1.0), 0, 2, None).unwrap());
        assert!(matches!(
            target.restore(&snapshot),
            Err(MetricError::SnapshotMismatch { .. })
        ));

        // A matching snapshot keeps replaying from its checkpoint.
        target.restore(&metric.snapshot()).unwrap();
        assert_eq!(target.take(3), vec![2.0, 1.0, 2.0]);
    }
}
