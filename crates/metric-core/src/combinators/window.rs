//! Sliding-window combinators: smoothing, regression, autoregression and
//! downsampling.

use crate::coerce::{coerce, Operand};
use crate::error::MetricError;
use crate::metric::{Metric, Node};
use crate::snapshot::NodeState;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

fn dot(window: &VecDeque<f64>, factors: &[f64]) -> f64 {
    window.iter().zip(factors).map(|(v, f)| v * f).sum()
}

/// Mean of the non-NaN values; NaN when there are none.
fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

fn nan_reduce(values: &[f64], pick: fn(f64, f64) -> f64) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .reduce(pick)
        .unwrap_or(f64::NAN)
}

fn check_factors(factors: &[f64]) -> Result<(), MetricError> {
    if factors.is_empty() {
        return Err(MetricError::InvalidSize { name: "factors" });
    }
    Ok(())
}

/// Moving average over the last `window_size` values, ignoring NaN.
///
/// The window starts filled with NaN, so early values average over the
/// steps seen so far.
#[derive(Debug, Clone)]
pub struct Smooth {
    metric: Metric,
    window_size: usize,
    values: VecDeque<f64>,
}

impl Smooth {
    pub fn new(metric: impl Into<Operand>, window_size: usize) -> Result<Self, MetricError> {
        if window_size == 0 {
            return Err(MetricError::InvalidSize {
                name: "window_size",
            });
        }
        Ok(Self {
            metric: coerce(metric),
            window_size,
            values: VecDeque::from(vec![f64::NAN; window_size]),
        })
    }
}

impl Node for Smooth {
    fn kind(&self) -> &'static str {
        "Smooth"
    }

    fn calc(&mut self, _index: u64) -> f64 {
        self.values.pop_front();
        self.values.push_back(self.metric.step());
        nan_mean(self.values.make_contiguous())
    }

    fn reset(&mut self) {
        self.metric.reset();
        self.values = VecDeque::from(vec![f64::NAN; self.window_size]);
    }

    fn snapshot(&self) -> NodeState {
        NodeState::Window {
            child: Box::new(self.metric.snapshot()),
            values: self.values.clone(),
        }
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        match state {
            NodeState::Window { child, values } => {
                self.metric.restore(child)?;
                self.values = values.clone();
                Ok(())
            }
            other => Err(MetricError::mismatch(self.kind(), other.variant())),
        }
    }

    fn describe(&self) -> Value {
        json!({
            "type": self.kind(),
            "metric": self.metric.describe(),
            "window_size": self.window_size,
        })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

/// Sliding dot product of the last `len(factors)` values with `factors`.
///
/// Factors apply oldest first. The window is seeded by pulling
/// `len(factors)` values from `paddings` (zeros by default).
#[derive(Debug, Clone)]
pub struct Regress {
    metric: Metric,
    factors: Vec<f64>,
    paddings: Metric,
    window: VecDeque<f64>,
}

impl Regress {
    pub fn new(
        metric: impl Into<Operand>,
        factors: Vec<f64>,
        paddings: Option<Operand>,
    ) -> Result<Self, MetricError> {
        check_factors(&factors)?;
        let mut paddings = coerce(paddings.unwrap_or(Operand::Number(0.0)));
        let window = paddings.take(factors.len()).into();
        Ok(Self {
            metric: coerce(metric),
            factors,
            paddings,
            window,
        })
    }
}

impl Node for Regress {
    fn kind(&self) -> &'static str {
        "Regress"
    }

    fn calc(&mut self, _index: u64) -> f64 {
        self.window.pop_front();
        self.window.push_back(self.metric.step());
        dot(&self.window, &self.factors)
    }

    fn reset(&mut self) {
        self.metric.reset();
        self.paddings.reset();
        self.window = self.paddings.take(self.factors.len()).into();
    }

    fn snapshot(&self) -> NodeState {
        NodeState::Regress {
            child: Box::new(self.metric.snapshot()),
            paddings: Box::new(self.paddings.snapshot()),
            window: self.window.clone(),
        }
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        match state {
            NodeState::Regress {
                child,
                paddings,
                window,
            } => {
                self.metric.restore(child)?;
                self.paddings.restore(paddings)?;
                self.window = window.clone();
                Ok(())
            }
            other => Err(MetricError::mismatch(self.kind(), other.variant())),
        }
    }

    fn describe(&self) -> Value {
        json!({
            "type": self.kind(),
            "metric": self.metric.describe(),
            "factors": self.factors,
            "paddings": self.paddings.describe(),
        })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

/// Self-referential regression.
///
/// The first `len(factors)` outputs are pulled from the metric (at
/// construction and after reset); every later output is the dot product of
/// the trailing window of its own outputs with `factors`, without touching
/// the metric again.
#[derive(Debug, Clone)]
pub struct AutoRegress {
    metric: Metric,
    factors: Vec<f64>,
    initials: Vec<f64>,
    window: VecDeque<f64>,
}

impl AutoRegress {
    pub fn new(metric: impl Into<Operand>, factors: Vec<f64>) -> Result<Self, MetricError> {
        check_factors(&factors)?;
        let mut metric = coerce(metric);
        let initials = metric.take(factors.len());
        Ok(Self {
            window: VecDeque::with_capacity(factors.len()),
            metric,
            factors,
            initials,
        })
    }
}

impl Node for AutoRegress {
    fn kind(&self) -> &'static str {
        "AutoRegress"
    }

    fn calc(&mut self, _index: u64) -> f64 {
        let value = if self.window.len() < self.factors.len() {
            self.initials[self.window.len()]
        } else {
            let value = dot(&self.window, &self.factors);
            self.window.pop_front();
            value
        };
        self.window.push_back(value);
        value
    }

    fn reset(&mut self) {
        self.metric.reset();
        self.initials = self.metric.take(self.factors.len());
        self.window.clear();
    }

    fn snapshot(&self) -> NodeState {
        NodeState::AutoRegress {
            child: Box::new(self.metric.snapshot()),
            initials: self.initials.clone(),
            window: self.window.clone(),
        }
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        match state {
            NodeState::AutoRegress {
                child,
                initials,
                window,
            } => {
                self.metric.restore(child)?;
                self.initials = initials.clone();
                self.window = window.clone();
                Ok(())
            }
            other => Err(MetricError::mismatch(self.kind(), other.variant())),
        }
    }

    fn describe(&self) -> Value {
        json!({
            "type": self.kind(),
            "metric": self.metric.describe(),
            "factors": self.factors,
        })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

/// Aggregation used by [`Downsample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownsampleMethod {
    #[default]
    Avg,
    Max,
    Min,
}

impl DownsampleMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownsampleMethod::Avg => "avg",
            DownsampleMethod::Max => "max",
            DownsampleMethod::Min => "min",
        }
    }

    fn reduce(&self, samples: &[f64]) -> f64 {
        match self {
            DownsampleMethod::Avg => nan_mean(samples),
            DownsampleMethod::Max => nan_reduce(samples, f64::max),
            DownsampleMethod::Min => nan_reduce(samples, f64::min),
        }
    }
}

impl FromStr for DownsampleMethod {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avg" => Ok(DownsampleMethod::Avg),
            "max" => Ok(DownsampleMethod::Max),
            "min" => Ok(DownsampleMethod::Min),
            other => Err(MetricError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for DownsampleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduce every `sample_size` consecutive values into one, ignoring NaN.
#[derive(Debug, Clone)]
pub struct Downsample {
    metric: Metric,
    sample_size: usize,
    method: DownsampleMethod,
}

impl Downsample {
    pub fn new(
        metric: impl Into<Operand>,
        sample_size: usize,
        method: DownsampleMethod,
    ) -> Result<Self, MetricError> {
        if sample_size == 0 {
            return Err(MetricError::InvalidSize {
                name: "sample_size",
            });
        }
        Ok(Self {
            metric: coerce(metric),
            sample_size,
            method,
        })
    }
}

impl Node for Downsample {
    fn kind(&self) -> &'static str {
        "Downsample"
    }

    fn calc(&mut self, _index: u64) -> f64 {
        let samples = self.metric.take(self.sample_size);
        self.method.reduce(&samples)
    }

    fn reset(&mut self) {
        self.metric.reset();
    }

    fn snapshot(&self) -> NodeState {
        NodeState::Child(Box::new(self.metric.snapshot()))
    }

    fn restore(&mut self, state: &NodeState) -> Result<(), MetricError> {
        match state {
            NodeState::Child(child) => self.metric.restore(child),
            other => Err(MetricError::mismatch(self.kind(), other.variant())),
        }
    }

    fn describe(&self) -> Value {
        json!({
            "type": self.kind(),
            "metric": self.metric.describe(),
            "sample_size": self.sample_size,
            "method": self.method.as_str(),
        })
    }

    fn clone_box(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_ignores_nan_seed() {
        let mut metric = Metric::new(Smooth::new(vec![2.0, 4.0, 6.0, 8.0], 2).unwrap());
        assert_eq!(metric.take(4), vec![2.0, 3.0, 5.0, 7.0]);
        metric.reset();
        assert_eq!(metric.step(), 2.0);
    }

    #[test]
    fn test_smooth_rejects_empty_window() {
        assert_eq!(
            Smooth::new(1.0, 0).unwrap_err(),
            MetricError::InvalidSize {
                name: "window_size"
            }
        );
    }

    #[test]
    fn test_regress_default_paddings() {
        let mut metric =
            Metric::new(Regress::new(vec![1.0, 2.0, 3.0], vec![0.5, 1.0], None).unwrap());
        // windows: [0,1], [1,2], [2,3]
        assert_eq!(metric.take(3), vec![1.0, 2.5, 4.0]);
    }

    #[test]
    fn test_regress_custom_paddings_reset() {
        let mut metric = Metric::new(
            Regress::new(1.0, vec![1.0, 1.0, 1.0], Some(vec![10.0, 20.0, 30.0].into())).unwrap(),
        );
        // windows: [20,30,1], [30,1,1], [1,1,1]
        assert_eq!(metric.take(3), vec![51.0, 32.0, 3.0]);
        metric.reset();
        assert_eq!(metric.step(), 51.0);
    }

    #[test]
    fn test_autoregress_feeds_back() {
        let mut metric =
            Metric::new(AutoRegress::new(vec![1.0, 1.0, 99.0], vec![1.0, 1.0]).unwrap());
        assert_eq!(metric.take(6), vec![1.0, 1.0, 2.0, 3.0, 5.0, 8.0]);
        metric.reset();
        assert_eq!(metric.take(3), vec![1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_downsample_methods() {
        let source = vec![1.0, 5.0, f64::NAN, 3.0, 2.0, 8.0];
        let mut avg =
            Metric::new(Downsample::new(source.clone(), 2, DownsampleMethod::Avg).unwrap());
        assert_eq!(avg.take(3), vec![3.0, 3.0, 5.0]);
        let mut max =
            Metric::new(Downsample::new(source.clone(), 3, DownsampleMethod::Max).unwrap());
        assert_eq!(max.take(2), vec![5.0, 8.0]);
        let mut min = Metric::new(Downsample::new(source, 3, DownsampleMethod::Min).unwrap());
        assert_eq!(min.take(2), vec![1.0, 2.0]);
    }

    #[test]
    fn test_downsample_method_names() {
        assert_eq!("max".parse::<DownsampleMethod>(), Ok(DownsampleMethod::Max));
        assert_eq!(
            "median".parse::<DownsampleMethod>(),
            Err(MetricError::UnknownMethod("median".to_string()))
        );
    }

    #[test]
    fn test_all_nan_window_is_nan() {
        assert!(nan_mean(&[f64::NAN, f64::NAN]).is_nan());
        assert!(nan_reduce(&[f64::NAN], f64::max).is_nan());
    }
}
