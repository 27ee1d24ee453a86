//! YAML metrics configuration.
//!
//! ```yaml
//! seed: 42
//! metrics:
//!   - name: base
//!     expr: "sin(24, amplitude=10) + normal(0.5)"
//!   - name: load
//!     expr: "abs($base + 50).smooth(3)"
//! ```
//!
//! Metrics compile in file order and each may reference any earlier metric
//! as `$name`. A reference takes a fresh copy of the earlier metric, so
//! every configured metric can be sampled independently.

use metric_core::Metric;
use metric_expr::{Bindings, CompileError, Compiler};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Errors that can occur when loading or compiling a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Error reading config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Name that cannot be referenced as `$name`
    #[error("Invalid metric name '{0}': use letters, digits and '_', not starting with a digit")]
    InvalidName(String),

    /// Two metrics with the same name
    #[error("Duplicate metric name: {0}")]
    DuplicateName(String),

    /// Expression rejected by the compiler
    #[error("Failed to compile metric '{name}': {source}")]
    Compile {
        name: String,
        #[source]
        source: CompileError,
    },
}

/// One named metric expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub name: String,
    pub expr: String,
    /// Overrides the seed derived from the file seed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Base seed; random metrics draw from entropy when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub metrics: Vec<MetricSpec>,
}

/// A compiled configuration entry.
#[derive(Debug, Clone)]
pub struct NamedMetric {
    pub name: String,
    pub expr: String,
    pub metric: Metric,
}

impl MetricsConfig {
    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse from a YAML string, checking metric names.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: MetricsConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for spec in &self.metrics {
            if !is_identifier(&spec.name) {
                return Err(ConfigError::InvalidName(spec.name.clone()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::DuplicateName(spec.name.clone()));
            }
        }
        Ok(())
    }

    /// Compiler seed of every metric, in order.
    ///
    /// Derived seeds come from a generator seeded with the file seed, so
    /// they do not overlap with the per-leaf seeds the compiler derives
    /// from each of them.
    pub fn metric_seeds(&self) -> Vec<Option<u64>> {
        let mut seeder = self.seed.map(StdRng::seed_from_u64);
        self.metrics
            .iter()
            .map(|spec| {
                let derived = seeder.as_mut().map(|rng| rng.gen::<u64>());
                spec.seed.or(derived)
            })
            .collect()
    }

    /// Compile every metric in order.
    pub fn compile(&self) -> Result<Vec<NamedMetric>, ConfigError> {
        self.validate()?;
        let mut bindings = Bindings::new();
        let mut compiled = Vec::with_capacity(self.metrics.len());

        for (spec, seed) in self.metrics.iter().zip(self.metric_seeds()) {
            let compiler = match seed {
                Some(seed) => Compiler::new().with_seed(seed),
                None => Compiler::new(),
            };
            let result = compiler
                .compile(&spec.expr, &bindings)
                .map_err(|source| ConfigError::Compile {
                    name: spec.name.clone(),
                    source,
                })?;
            tracing::debug!(
                name = %spec.name,
                kind = result.metric.kind(),
                references = ?result.bound,
                "compiled metric"
            );
            bindings.insert(spec.name.clone(), result.metric.clone());
            compiled.push(NamedMetric {
                name: spec.name.clone(),
                expr: spec.expr.clone(),
                metric: result.metric,
            });
        }

        Ok(compiled)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
