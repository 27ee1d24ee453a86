//! Random leaves.
//!
//! Each node owns its generator. By default it is seeded from OS entropy;
//! `with_seed` makes the stream reproducible. The generator state is part of
//! the node's snapshot, so a cycled random metric replays exactly, but
//! `reset` does not reseed.

use crate::error::MetricError;
use crate::metric::Node;
use crate::snapshot::NodeState;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

fn restore_rng(kind: &'static str, rng: &mut StdRng, state: &NodeState) -> Result<(), MetricError> {
    match state {
        NodeState::Random(saved) => {
            *rng = saved.clone();
            Ok(())
        }
        other => Err(MetricError::mismatch(kind, other.variant())),
    }
}

/// Order two bounds, as the one- and two-argument forms accept them either way.
fn ordered(a: f64, b: f64) -> (f64, f64) {
    (a.min(b), a.max(b))
}

/// Normally distributed samples.
#[derive(Debug, Clone)]
pub struct Normal {
    scale: f64,
    loc: f64,
    distribution: rand_distr::Normal<f64>,
    rng: StdRng,
}

impl Normal {
    /// Normal distribution with standard deviation `scale` around `loc`.
    pub fn new(scale: f64, loc: f64) -> Result<Self, MetricError> {
        if !(scale.is_finite() && scale >= 0.0) {
            return Err(MetricError::InvalidParameter {
                name: "scale",
                reason: format!("must be a non-negative finite number, got {scale}"),
            });
        }
        let distribution =
            rand_distr::Normal::new(loc, scale).map_err(|e| MetricError::InvalidParameter {
                name: "scale",
                reason: e.to_string(),
            })?;
        Ok(Self {
            scale,
            loc,
            distribution,
            rng: StdRng::from_entropy(),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

impl Node for Normal {
    fn kind(&self) -> &'static str {
        "Normal"
    }

    fn calc(&mut self, _index: u64) -> f64 {
        self.distribution.sample(&mut self.rng)
    }

    fn reset(&mut self) {}

    fn snapshot(&self) -> NodeState {
        NodeState::Random(self.rng.clone())
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        restore_rng(self.kind(), &mut self.rng, state)
    }

    fn describe(&self) -> Value {
        json!({ "type": self.kind(), "scale": self.scale, "loc": self.loc })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

/// Uniform samples in `[low, high)`.
#[derive(Debug, Clone)]
pub struct Rand {
    low: f64,
    high: f64,
    rng: StdRng,
}

impl Rand {
    /// Uniform in `[min(a, b), max(a, b))`.
    pub fn new(a: f64, b: f64) -> Self {
        let (low, high) = ordered(a, b);
        Self {
            low,
            high,
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform in `[0, 1)`.
    pub fn unit() -> Self {
        Self::new(0.0, 1.0)
    }

    /// Uniform in `[0, high)`.
    pub fn up_to(high: f64) -> Self {
        Self::new(0.0, high)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

impl Node for Rand {
    fn kind(&self) -> &'static str {
        "Rand"
    }

    fn calc(&mut self, _index: u64) -> f64 {
        self.low + self.rng.gen::<f64>() * (self.high - self.low)
    }

    fn reset(&mut self) {}

    fn snapshot(&self) -> NodeState {
        NodeState::Random(self.rng.clone())
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        restore_rng(self.kind(), &mut self.rng, state)
    }

    fn describe(&self) -> Value {
        json!({ "type": self.kind(), "low": self.low, "high": self.high })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

/// Uniform integers in `[low, high]`, both ends included.
#[derive(Debug, Clone)]
pub struct RandInt {
    low: i64,
    high: i64,
    rng: StdRng,
}

impl RandInt {
    pub fn new(a: i64, b: i64) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
            rng: StdRng::from_entropy(),
        }
    }

    /// Integers in `[0, high]`.
    pub fn up_to(high: i64) -> Self {
        Self::new(0, high)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

impl Default for RandInt {
    /// Coin flip between 0 and 1.
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl Node for RandInt {
    fn kind(&self) -> &'static str {
        "RandInt"
    }

    fn calc(&mut self, _index: u64) -> f64 {
        self.rng.gen_range(self.low..=self.high) as f64
    }

    fn reset(&mut self) {}

    fn snapshot(&self) -> NodeState {
        NodeState::Random(self.rng.clone())
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        restore_rng(self.kind(), &mut self.rng, state)
    }

    fn describe(&self) -> Value {
        json!({ "type": self.kind(), "low": self.low, "high": self.high })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

/// Weighted choice among a fixed set of values.
#[derive(Debug, Clone)]
pub struct RandChoice {
    choices: Vec<f64>,
    weights: Vec<f64>,
    index: WeightedIndex<f64>,
    rng: StdRng,
}

impl RandChoice {
    /// Choose among `choices`, uniformly unless `weights` are given.
    ///
    /// Weights are normalized to sum to 1.
    pub fn new(choices: Vec<f64>, weights: Option<Vec<f64>>) -> Result<Self, MetricError> {
        if choices.is_empty() {
            return Err(MetricError::EmptyChoices);
        }
        let weights = match weights {
            None => vec![1.0 / choices.len() as f64; choices.len()],
            Some(weights) if weights.len() != choices.len() => {
                return Err(MetricError::WeightsMismatch {
                    choices: choices.len(),
                    weights: weights.len(),
                });
            }
            Some(weights) => {
                let total: f64 = weights.iter().sum();
                weights.iter().map(|w| w / total).collect()
            }
        };
        let index =
            WeightedIndex::new(&weights).map_err(|e| MetricError::InvalidWeights(e.to_string()))?;
        Ok(Self {
            choices,
            weights,
            index,
            rng: StdRng::from_entropy(),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Normalized weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl Node for RandChoice {
    fn kind(&self) -> &'static str {
        "RandChoice"
    }

    fn calc(&mut self, _index: u64) -> f64 {
        self.choices[self.index.sample(&mut self.rng)]
    }

    fn reset(&mut self) {}

    fn snapshot(&self) -> NodeState {
        NodeState::Random(self.rng.clone())
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        restore_rng(self.kind(), &mut self.rng, state)
    }

    fn describe(&self) -> Value {
        json!({
            "type": self.kind(),
            "choices": self.choices,
            "weights": self.weights,
        })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Metric;

    #[test]
    fn test_rand_bounds() {
        let mut metric = Metric::new(Rand::new(5.0, 2.0).with_seed(42));
        for value in metric.take(1000) {
            assert!((2.0..5.0).contains(&value));
        }
        let mut unit = Metric::new(Rand::unit().with_seed(1));
        assert!(unit.take(100).iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_rand_int_inclusive() {
        let mut metric = Metric::new(RandInt::new(1, 3).with_seed(42));
        let values = metric.take(500);
        assert!(values.iter().all(|v| (1.0..=3.0).contains(v) && v.fract() == 0.0));
        assert!(values.contains(&1.0));
        assert!(values.contains(&3.0));
    }

    #[test]
    fn test_seeded_streams_are_reproducible() {
        let mut a = Metric::new(Normal::new(2.0, 10.0).unwrap().with_seed(7));
        let mut b = Metric::new(Normal::new(2.0, 10.0).unwrap().with_seed(7));
        assert_eq!(a.take(10), b.take(10));
    }

    #[test]
    fn test_normal_rejects_negative_scale() {
        assert!(matches!(
            Normal::new(-1.0, 0.0),
            Err(MetricError::InvalidParameter { name: "scale", .. })
        ));
        assert!(Normal::new(f64::NAN, 0.0).is_err());
        assert!(Normal::new(f64::INFINITY, 0.0).is_err());
        assert!(Normal::new(0.0, 3.0).is_ok());
    }

    #[test]
    fn test_rand_choice_weights_mismatch() {
        let result = RandChoice::new(vec![1.0, 2.0], Some(vec![1.0]));
        assert_eq!(
            result.unwrap_err(),
            MetricError::WeightsMismatch {
                choices: 2,
                weights: 1
            }
        );
        assert_eq!(
            RandChoice::new(Vec::new(), None).unwrap_err(),
            MetricError::EmptyChoices
        );
    }

    #[test]
    fn test_rand_choice_normalizes_weights() {
        let choice = RandChoice::new(vec![1.0, 2.0], Some(vec![1.0, 3.0])).unwrap();
        assert_eq!(choice.weights(), &[0.25, 0.75]);
    }

    #[test]
    fn test_rand_choice_frequencies() {
        let choice = RandChoice::new(vec![1.0, 2.0], Some(vec![1.0, 3.0]))
            .unwrap()
            .with_seed(42);
        let mut metric = Metric::new(choice);
        let values = metric.take(20_000);
        let ones = values.iter().filter(|v| **v == 1.0).count() as f64;
        let twos = values.iter().filter(|v| **v == 2.0).count() as f64;
        assert_eq!(ones + twos, 20_000.0);
        let ratio = twos / ones;
        assert!((2.7..3.3).contains(&ratio), "ratio was {ratio}");
    }

    #[test]
    fn test_snapshot_replays_random_stream() {
        let mut metric = Metric::new(Rand::unit().with_seed(3));
        metric.take(5);
        let snapshot = metric.snapshot();
        let first = metric.take(5);
        metric.restore(&snapshot).unwrap();
        assert_eq!(metric.cursor(), Some(4));
        assert_eq!(metric.take(5), first);
    }
}
