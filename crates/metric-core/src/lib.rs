//! Composable metric stream generators.
//!
//! A metric is a lazy, forward-only stream of `f64` values. Metrics are built
//! from leaf generators (constants, fragments, random draws, waves) and
//! combinators (arithmetic, accumulation, windows, shifts, pulses, periodic
//! replay), then pulled one index at a time.
//!
//! # Architecture
//!
//! ```text
//!        Operand (number | sequence | positions | metric)
//!            │ coerce
//!            ▼
//! ┌────────────────────┐
//! │       Metric       │  step / last / at / take / reset
//! │  - cursor          │  snapshot / restore
//! │  - last            │
//! │  - Box<dyn Node>   │──► calc(index) pulls children via step()
//! └────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use metric_core::generators::{Normal, Sin};
//! use metric_core::Metric;
//!
//! let noise = Normal::new(0.5, 0.0).unwrap().with_seed(42);
//! let mut load = Metric::new(Sin::new(24.0, 10.0, 0.0))
//!     .plus(50.0)
//!     .plus(noise)
//!     .smooth(3)
//!     .unwrap();
//!
//! let day: Vec<f64> = load.take(24);
//! assert_eq!(day.len(), 24);
//! ```
//!
//! Graphs are ownership trees: every combinator owns its children, and a
//! metric cannot appear twice in a graph. Cloning a metric yields an
//! independent copy with the same state.

pub mod builders;
pub mod coerce;
pub mod combinators;
pub mod error;
pub mod generators;
pub mod metric;
pub mod ops;
pub mod snapshot;

// Re-exports for convenience
pub use builders::{lines, rect};
pub use coerce::{coerce, Operand};
pub use combinators::DownsampleMethod;
pub use error::MetricError;
pub use metric::{Metric, Node, Values};
pub use snapshot::{NodeState, Snapshot};
