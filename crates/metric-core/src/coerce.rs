//! Coercion of plain values into metrics.
//!
//! Every combinator constructor accepts `impl Into<Operand>`, so numbers,
//! sequences and position/value maps can stand in for metrics.

use crate::combinators::Pulse;
use crate::generators::{Const, Fragment};
use crate::metric::{Metric, Node};
use std::collections::BTreeMap;

/// A metric or a value convertible to one.
#[derive(Debug, Clone)]
pub enum Operand {
    /// Becomes a [`Const`]
    Number(f64),
    /// Becomes a [`Fragment`]
    Sequence(Vec<f64>),
    /// Becomes a [`Pulse`] firing at each position, in position order
    Positions(Vec<(f64, f64)>),
    /// Passed through unchanged
    Metric(Metric),
}

/// Convert an operand into a metric.
pub fn coerce(operand: impl Into<Operand>) -> Metric {
    match operand.into() {
        Operand::Number(value) => Const::new(value).into(),
        Operand::Sequence(values) => Fragment::new(values).into(),
        Operand::Positions(mut pairs) => {
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            let (positions, values): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            Pulse::new(positions, values).into()
        }
        Operand::Metric(metric) => metric,
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Number(value)
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Number(value.into())
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Number(value as f64)
    }
}

impl From<u32> for Operand {
    fn from(value: u32) -> Self {
        Operand::Number(value.into())
    }
}

impl From<Vec<f64>> for Operand {
    fn from(values: Vec<f64>) -> Self {
        Operand::Sequence(values)
    }
}

impl From<&[f64]> for Operand {
    fn from(values: &[f64]) -> Self {
        Operand::Sequence(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Operand {
    fn from(values: [f64; N]) -> Self {
        Operand::Sequence(values.to_vec())
    }
}

impl From<BTreeMap<i64, f64>> for Operand {
    fn from(map: BTreeMap<i64, f64>) -> Self {
        Operand::Positions(map.into_iter().map(|(k, v)| (k as f64, v)).collect())
    }
}

impl From<Metric> for Operand {
    fn from(metric: Metric) -> Self {
        Operand::Metric(metric)
    }
}

impl<N: Node + 'static> From<N> for Operand {
    fn from(node: N) -> Self {
        Operand::Metric(Metric::new(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_number() {
        let mut metric = coerce(4.5);
        assert_eq!(metric.kind(), "Const");
        assert_eq!(metric.take(3), vec![4.5, 4.5, 4.5]);
    }

    #[test]
    fn test_coerce_sequence() {
        let mut metric = coerce(vec![1.0, 2.0]);
        assert_eq!(metric.kind(), "Fragment");
        assert_eq!(metric.take(3), vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_coerce_positions_sorted() {
        let mut metric = coerce(Operand::Positions(vec![(3.0, 7.0), (1.0, 2.0)]));
        assert_eq!(metric.kind(), "Pulse");
        assert_eq!(metric.take(5), vec![0.0, 2.0, 0.0, 7.0, 0.0]);
    }

    #[test]
    fn test_coerce_map() {
        let map: BTreeMap<i64, f64> = [(0, 1.0), (2, 5.0)].into_iter().collect();
        assert_eq!(coerce(map).take(4), vec![1.0, 0.0, 5.0, 0.0]);
    }

    #[test]
    fn test_coerce_metric_passthrough() {
        let mut metric = coerce(vec![9.0]);
        metric.step();
        let passed = coerce(metric);
        assert_eq!(passed.cursor(), Some(0));
    }
}
