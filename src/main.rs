//! Command-line interface for metricgen
//!
//! # Usage Examples
//!
//! ## Evaluate an expression
//! ```bash
//! # Daily sine wave with noise, reproducible
//! metricgen eval "sin(24, amplitude=10) + 50 + normal(0.5)" --count 48 --seed 7
//!
//! # Reference earlier bindings with $name
//! metricgen eval '$base.smooth(4)' \
//!   --bind 'base=rand(10) + acc(0.1)' \
//!   --count 20 --format csv
//!
//! # Print the compiled node graph
//! metricgen eval "rect(10, 20, 0, 1) * 5" --tree
//! ```
//!
//! ## Configuration files
//! ```bash
//! metricgen generate --config metrics.yaml --count 1000 --format keyed
//! metricgen tree --config metrics.yaml --flat
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use fixture_inspect::TreeOptions;
use metricgen::{print_graph, sample, write_series, MetricSpec, MetricsConfig, OutputFormat};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Name of the evaluated expression among its bindings.
const EVAL_NAME: &str = "expr";

#[derive(Parser)]
#[command(name = "metricgen")]
#[command(about = "Generate synthetic metric time series from composable expressions")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a single expression and print its values
    Eval {
        /// Expression to compile
        expr: String,

        /// Metric available as $NAME (format: NAME=EXPR); later bindings may use earlier ones
        #[arg(long = "bind", value_name = "NAME=EXPR")]
        bindings: Vec<String>,

        /// Number of values to generate
        #[arg(long, default_value_t = 10, env = "METRICGEN_COUNT")]
        count: usize,

        /// Seed for reproducible random values
        #[arg(long, env = "METRICGEN_SEED")]
        seed: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Print the compiled node graph instead of values
        #[arg(long)]
        tree: bool,
    },

    /// Generate values for every metric in a configuration file
    Generate {
        /// YAML configuration file
        #[arg(long, value_name = "PATH", env = "METRICGEN_CONFIG")]
        config: PathBuf,

        /// Number of values per metric
        #[arg(long, default_value_t = 10, env = "METRICGEN_COUNT")]
        count: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Overrides the seed in the configuration file
        #[arg(long)]
        seed: Option<u64>,

        /// Write to a file instead of stdout
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Print the node graph of every metric in a configuration file
    Tree {
        /// YAML configuration file
        #[arg(long, value_name = "PATH", env = "METRICGEN_CONFIG")]
        config: PathBuf,

        /// One line per metric
        #[arg(long)]
        flat: bool,
    },
}

fn main() -> anyhow::Result<()> {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Eval {
            expr,
            bindings,
            count,
            seed,
            format,
            tree,
        } => run_eval(expr, bindings, count, seed, format, tree),
        Commands::Generate {
            config,
            count,
            format,
            seed,
            output,
        } => run_generate(config, count, format, seed, output),
        Commands::Tree { config, flat } => run_tree(config, flat),
    }
}

fn run_eval(
    expr: String,
    bindings: Vec<String>,
    count: usize,
    seed: Option<u64>,
    format: OutputFormat,
    tree: bool,
) -> anyhow::Result<()> {
    let mut metrics = bindings
        .iter()
        .map(|binding| parse_binding(binding))
        .collect::<anyhow::Result<Vec<_>>>()?;
    metrics.push(MetricSpec {
        name: EVAL_NAME.to_string(),
        expr,
        seed: None,
    });
    let config = MetricsConfig { seed, metrics };

    let mut compiled = config.compile().context("Failed to compile expression")?;
    let Some(mut evaluated) = compiled.pop() else {
        anyhow::bail!("Nothing to evaluate");
    };

    if tree {
        print_graph(&evaluated, &TreeOptions::default());
        return Ok(());
    }

    let series = sample(std::slice::from_mut(&mut evaluated), count);
    write_series(io::stdout().lock(), &series, format)
}

/// Split `NAME=EXPR` at the first `=`.
fn parse_binding(binding: &str) -> anyhow::Result<MetricSpec> {
    let (name, expr) = binding
        .split_once('=')
        .with_context(|| format!("Invalid binding '{binding}': expected NAME=EXPR"))?;
    Ok(MetricSpec {
        name: name.trim().to_string(),
        expr: expr.to_string(),
        seed: None,
    })
}

fn run_generate(
    config_path: PathBuf,
    count: usize,
    format: OutputFormat,
    seed: Option<u64>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = MetricsConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {config_path:?}"))?;
    if seed.is_some() {
        config.seed = seed;
    }

    tracing::info!(
        "Generating {} values for {} metrics (seed={:?})",
        count,
        config.metrics.len(),
        config.seed
    );

    let mut compiled = config.compile()?;
    let series = sample(&mut compiled, count);

    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create output file {path:?}"))?;
            let mut writer = BufWriter::new(file);
            write_series(&mut writer, &series, format)?;
            writer.flush()?;
            tracing::info!("Wrote {} series to {:?}", series.len(), path);
        }
        None => write_series(io::stdout().lock(), &series, format)?,
    }
    Ok(())
}

fn run_tree(config_path: PathBuf, flat: bool) -> anyhow::Result<()> {
    let config = MetricsConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {config_path:?}"))?;
    let options = if flat {
        TreeOptions::flat()
    } else {
        TreeOptions::default()
    };
    for named in config.compile()? {
        print_graph(&named, &options);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binding_splits_at_first_equals() {
        let spec = parse_binding("base=sin(24, amplitude=3)").unwrap();
        assert_eq!(spec.name, "base");
        assert_eq!(spec.expr, "sin(24, amplitude=3)");
        assert!(parse_binding("no_equals").is_err());
    }

    #[test]
    fn test_cli_parses_eval() {
        let cli = Cli::try_parse_from([
            "metricgen", "eval", "$a + 1", "--bind", "a=acc(1)", "--count", "5", "--format", "csv",
        ])
        .unwrap();
        match cli.command {
            Commands::Eval {
                expr,
                bindings,
                count,
                format,
                tree,
                ..
            } => {
                assert_eq!(expr, "$a + 1");
                assert_eq!(bindings, vec!["a=acc(1)".to_string()]);
                assert_eq!(count, 5);
                assert_eq!(format, OutputFormat::Csv);
                assert!(!tree);
            }
            _ => panic!("expected eval command"),
        }
    }
}
