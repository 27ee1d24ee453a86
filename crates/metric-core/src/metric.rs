//! The evaluation protocol shared by every node.
//!
//! Each node type implements [`Node`], which only knows how to compute the
//! value for a given index and how to reset, snapshot and restore its own
//! state. [`Metric`] wraps a node with the step cursor and the cached value
//! and implements the protocol (`step`, `last`, `at`, `take`, `reset`,
//! `snapshot`, `restore`) once for all of them.

use crate::error::MetricError;
use crate::snapshot::{NodeState, Snapshot};
use serde_json::Value;
use std::fmt;

/// Per-node hooks of the generator algebra.
pub trait Node: fmt::Debug {
    /// Node type name.
    fn kind(&self) -> &'static str;

    /// Compute the value at `index`.
    ///
    /// Called exactly once per index, in increasing order starting at 0.
    /// Combinators pull their children with [`Metric::step`].
    fn calc(&mut self, index: u64) -> f64;

    /// Return to the pre-iteration state, children included.
    fn reset(&mut self);

    /// Capture the node's mutable state.
    fn snapshot(&self) -> NodeState;

    /// Overwrite the node's mutable state from a snapshot.
    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError>;

    /// Describe parameters and children for debug rendering.
    fn describe(&self) -> Value;

    fn clone_box(&self) -> Box<dyn Node>;
}

/// A lazy, forward-only numeric stream.
#[derive(Debug)]
pub struct Metric {
    cursor: Option<u64>,
    last: Option<f64>,
    node: Box<dyn Node>,
}

impl Metric {
    /// Wrap a node.
    pub fn new(node: impl Node + 'static) -> Self {
        Self {
            cursor: None,
            last: None,
            node: Box::new(node),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    /// Index of the last produced value (`None` before the first step).
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    /// Advance by one step and return the new value.
    pub fn step(&mut self) -> f64 {
        let index = self.cursor.map_or(0, |cursor| cursor + 1);
        let value = self.node.calc(index);
        self.cursor = Some(index);
        self.last = Some(value);
        value
    }

    /// The most recently produced value.
    pub fn last(&self) -> Result<f64, MetricError> {
        self.last.ok_or(MetricError::NotStarted)
    }

    /// Value at `index`, stepping forward as needed.
    ///
    /// Requesting the current index returns the cached value; requesting an
    /// earlier one fails since the stream cannot seek backward.
    pub fn at(&mut self, index: i64) -> Result<f64, MetricError> {
        if index < 0 {
            return Err(MetricError::NegativeIndex(index));
        }
        let index = index as u64;
        if let Some(cursor) = self.cursor {
            if index < cursor {
                return Err(MetricError::Backward {
                    requested: index,
                    cursor,
                });
            }
        }
        while self.cursor != Some(index) {
            self.step();
        }
        self.last()
    }

    /// The next `n` values.
    pub fn take(&mut self, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.step()).collect()
    }

    /// Return to the state before index 0, keeping construction parameters.
    pub fn reset(&mut self) {
        self.node.reset();
        self.cursor = None;
        self.last = None;
    }

    /// Capture the full state tree.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            kind: self.node.kind(),
            cursor: self.cursor,
            last: self.last,
            state: self.node.snapshot(),
        }
    }

    /// Overwrite the full state tree from a snapshot of the same shape.
    ///
    /// On a mismatch deep in the tree the nodes visited before the mismatch
    /// are left restored.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), MetricError> {
        if snapshot.kind != self.node.kind() {
            return Err(MetricError::mismatch(self.node.kind(), snapshot.kind));
        }
        self.node.restore(&snapshot.state)?;
        self.cursor = snapshot.cursor;
        self.last = snapshot.last;
        Ok(())
    }

    /// Iterate over the values from the current position on.
    pub fn values(&mut self) -> Values<'_> {
        Values { metric: self }
    }

    /// JSON description of the node graph.
    pub fn describe(&self) -> Value {
        self.node.describe()
    }
}

impl Clone for Metric {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor,
            last: self.last,
            node: self.node.clone_box(),
        }
    }
}

impl<N: Node + 'static> From<N> for Metric {
    fn from(node: N) -> Self {
        Metric::new(node)
    }
}

/// Unbounded iterator over a metric's values.
pub struct Values<'a> {
    metric: &'a mut Metric,
}

impl Iterator for Values<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.metric.step())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}
