//! metricgen library
//!
//! Synthetic metric time series for fixtures and load tests. Metrics are
//! written as expressions over a small generator algebra, collected in a YAML
//! configuration and sampled into JSON or CSV.
//!
//! # Crates
//!
//! - `metric_core` - generator nodes, combinators and the evaluation protocol
//! - `metric_expr` - the expression compiler
//! - `fixture_inspect` - tree rendering and record projection used for output
//!
//! # CLI Usage
//!
//! ```bash
//! # Evaluate one expression
//! metricgen eval "sin(24, amplitude=10) + normal(0.5)" --count 48 --seed 1
//!
//! # Sample every metric in a config file as CSV
//! metricgen generate --config metrics.yaml --count 1000 --format csv
//!
//! # Show the compiled node graphs
//! metricgen tree --config metrics.yaml
//! ```

pub mod config;
pub mod output;

pub use config::{ConfigError, MetricSpec, MetricsConfig, NamedMetric};
pub use output::{print_graph, render_graph, sample, write_series, OutputFormat, Series};
