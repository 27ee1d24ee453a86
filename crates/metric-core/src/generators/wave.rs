//! Periodic waves: `amplitude * f(2π·i/period + initial_phase)`.

use super::constant::restore_stateless;
use crate::error::MetricError;
use crate::metric::Node;
use crate::snapshot::NodeState;
use serde_json::{json, Value};
use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy)]
struct Wave {
    period: f64,
    amplitude: f64,
    initial_phase: f64,
}

impl Wave {
    fn angle(&self, index: u64) -> f64 {
        index as f64 * TAU / self.period + self.initial_phase
    }

    fn describe(&self, kind: &str) -> Value {
        json!({
            "type": kind,
            "period": self.period,
            "amplitude": self.amplitude,
            "initial_phase": self.initial_phase,
        })
    }
}

/// Sine wave.
#[derive(Debug, Clone)]
pub struct Sin {
    wave: Wave,
}

impl Sin {
    pub fn new(period: f64, amplitude: f64, initial_phase: f64) -> Self {
        Self {
            wave: Wave {
                period,
                amplitude,
                initial_phase,
            },
        }
    }

    /// Unit amplitude, zero phase.
    pub fn with_period(period: f64) -> Self {
        Self::new(period, 1.0, 0.0)
    }
}

impl Node for Sin {
    fn kind(&self) -> &'static str {
        "Sin"
    }

    fn calc(&mut self, index: u64) -> f64 {
        self.wave.amplitude * self.wave.angle(index).sin()
    }

    fn reset(&mut self) {}

    fn snapshot(&self) -> NodeState {
        NodeState::Stateless
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        restore_stateless(self.kind(), state)
    }

    fn describe(&self) -> Value {
        self.wave.describe(self.kind())
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

/// Cosine wave.
#[derive(Debug, Clone)]
pub struct Cos {
    wave: Wave,
}

impl Cos {
    pub fn new(period: f64, amplitude: f64, initial_phase: f64) -> Self {
        Self {
            wave: Wave {
                period,
                amplitude,
                initial_phase,
            },
        }
    }

    pub fn with_period(period: f64) -> Self {
        Self::new(period, 1.0, 0.0)
    }
}

impl Node for Cos {
    fn kind(&self) -> &'static str {
        "Cos"
    }

    fn calc(&mut self, index: u64) -> f64 {
        self.wave.amplitude * self.wave.angle(index).cos()
    }

    fn reset(&mut self) {}

    fn snapshot(&self) -> NodeState {
        NodeState::Stateless
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        restore_stateless(self.kind(), state)
    }

    fn describe(&self) -> Value {
        self.wave.describe(self.kind())
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Metric;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_sin_quarter_period() {
        let mut metric = Metric::new(Sin::new(4.0, 2.0, 0.0));
        let values = metric.take(5);
        let expected = [0.0, 2.0, 0.0, -2.0, 0.0];
        for (value, expected) in values.iter().zip(expected) {
            assert!(close(*value, expected), "{value} != {expected}");
        }
    }

    #[test]
    fn test_cos_with_phase() {
        let mut metric = Metric::new(Cos::new(8.0, 1.0, std::f64::consts::PI));
        assert!(close(metric.step(), -1.0));
        assert!(close(metric.at(4).unwrap(), 1.0));
    }
}
