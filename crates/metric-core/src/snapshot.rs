//! Explicit checkpoints of a metric's mutable state.
//!
//! A [`Snapshot`] mirrors the mutable fields of a node tree: the step cursor
//! and cached value of every node, plus one [`NodeState`] variant per family
//! of node state. Construction parameters are not captured; a snapshot can
//! only be restored into a node of the same kind and shape, which
//! [`Metric::restore`](crate::Metric::restore) checks before overwriting.

use rand::rngs::StdRng;
use std::collections::VecDeque;

/// Deep copy of a metric's state at a point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub(crate) kind: &'static str,
    pub(crate) cursor: Option<u64>,
    pub(crate) last: Option<f64>,
    pub(crate) state: NodeState,
}

impl Snapshot {
    /// Kind of the node the snapshot was taken from.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Cursor position at capture time (`None` before the first step).
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }
}

/// Mutable state of a single node, with child snapshots nested.
#[derive(Debug, Clone)]
pub enum NodeState {
    /// Nodes whose output depends on the index only
    Stateless,

    /// Random leaves: generator state
    Random(StdRng),

    /// Pass-through wrappers with no state of their own
    Child(Box<Snapshot>),

    /// Running sum
    Accumulator { child: Box<Snapshot>, total: f64 },

    /// Previous value of the child
    Previous { child: Box<Snapshot>, previous: f64 },

    /// Padding steps left to emit
    Shift { child: Box<Snapshot>, remaining: u64 },

    /// Sliding window over the child
    Window {
        child: Box<Snapshot>,
        values: VecDeque<f64>,
    },

    /// Sliding window with its padding source
    Regress {
        child: Box<Snapshot>,
        paddings: Box<Snapshot>,
        window: VecDeque<f64>,
    },

    /// Seed values and trailing window of own outputs
    AutoRegress {
        child: Box<Snapshot>,
        initials: Vec<f64>,
        window: VecDeque<f64>,
    },

    /// Recorded period of a repeat window
    Recording {
        child: Box<Snapshot>,
        recorded: Vec<f64>,
    },

    /// Cycle phase: the checkpoint of the child, once taken
    Cycle {
        child: Box<Snapshot>,
        checkpoint: Option<Box<Snapshot>>,
    },

    /// Two children
    Pair {
        left: Box<Snapshot>,
        right: Box<Snapshot>,
    },

    /// Position/value sources and the pending pair
    Pulse {
        pos: Box<Snapshot>,
        val: Box<Snapshot>,
        pending: (f64, f64),
    },

    /// N children
    Many(Vec<Snapshot>),
}

impl NodeState {
    /// Variant name, used in mismatch errors.
    pub fn variant(&self) -> &'static str {
        match self {
            NodeState::Stateless => "Stateless",
            NodeState::Random(_) => "Random",
            NodeState::Child(_) => "Child",
            NodeState::Accumulator { .. } => "Accumulator",
            NodeState::Previous { .. } => "Previous",
            NodeState::Shift { .. } => "Shift",
            NodeState::Window { .. } => "Window",
            NodeState::Regress { .. } => "Regress",
            NodeState::AutoRegress { .. } => "AutoRegress",
            NodeState::Recording { .. } => "Recording",
            NodeState::Cycle { .. } => "Cycle",
            NodeState::Pair { .. } => "Pair",
            NodeState::Pulse { .. } => "Pulse",
            NodeState::Many(_) => "Many",
        }
    }
}
