//! Sampling and output formats.

use crate::config::NamedMetric;
use anyhow::Context;
use fixture_inspect::{list_to_map, Projection, TreeOptions};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

/// Output format for generated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Array of `{name, values}` records
    #[default]
    Json,
    /// One row per index, one column per metric
    Csv,
    /// Object mapping each name to its values
    Keyed,
}

/// Values generated by one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// Pull `count` values from every metric.
pub fn sample(metrics: &mut [NamedMetric], count: usize) -> Vec<Series> {
    metrics
        .iter_mut()
        .map(|named| Series {
            name: named.name.clone(),
            values: named.metric.take(count),
        })
        .collect()
}

/// Write series in the requested format.
///
/// Non-finite values are written as `null` in JSON and as `NaN`/`inf` in CSV.
pub fn write_series<W: Write>(
    mut writer: W,
    series: &[Series],
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, series)
                .context("Failed to write JSON output")?;
            writeln!(writer)?;
        }
        OutputFormat::Keyed => {
            let records = series
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<Value>, _>>()?;
            let keyed = list_to_map(
                Some(records.as_slice()),
                "name",
                &Projection::Field("values".into()),
            )?
            .unwrap_or_default();
            serde_json::to_writer_pretty(&mut writer, &keyed)
                .context("Failed to write keyed JSON output")?;
            writeln!(writer)?;
        }
        OutputFormat::Csv => write_csv(writer, series)?,
    }
    Ok(())
}

/// Render a metric's node graph as a tree rooted at its name.
pub fn render_graph(named: &NamedMetric, options: &TreeOptions) -> String {
    fixture_inspect::render(&named.metric.describe(), &named.name, options)
}

/// Print a metric's node graph to stdout.
pub fn print_graph(named: &NamedMetric, options: &TreeOptions) {
    fixture_inspect::print(&named.metric.describe(), &named.name, options);
}

fn write_csv<W: Write>(writer: W, series: &[Series]) -> anyhow::Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    let mut header = vec!["index".to_string()];
    header.extend(series.iter().map(|s| s.name.clone()));
    out.write_record(&header)?;

    let rows = series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    for index in 0..rows {
        let mut record = vec![index.to_string()];
        record.extend(series.iter().map(|s| {
            s.values
                .get(index)
                .map(|value| value.to_string())
                .unwrap_or_default()
        }));
        out.write_record(&record)?;
    }
    out.flush().context("Failed to flush CSV output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> Vec<Series> {
        vec![
            Series {
                name: "a".into(),
                values: vec![1.0, 2.5],
            },
            Series {
                name: "b".into(),
                values: vec![f64::NAN, 4.0],
            },
        ]
    }

    fn render(format: OutputFormat) -> String {
        let mut out = Vec::new();
        write_series(&mut out, &series(), format).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_csv_output() {
        assert_eq!(render(OutputFormat::Csv), "index,a,b\n0,1,NaN\n1,2.5,4\n");
    }

    #[test]
    fn test_json_output() {
        let value: Value = serde_json::from_str(&render(OutputFormat::Json)).unwrap();
        assert_eq!(value[0]["name"], "a");
        assert_eq!(value[0]["values"][1], 2.5);
        assert!(value[1]["values"][0].is_null());
    }

    #[test]
    fn test_keyed_output() {
        let value: Value = serde_json::from_str(&render(OutputFormat::Keyed)).unwrap();
        assert_eq!(value["a"], serde_json::json!([1.0, 2.5]));
        assert_eq!(value["b"][1], 4.0);
    }

    #[test]
    fn test_render_graph() {
        let named = NamedMetric {
            name: "ramp".into(),
            expr: "acc(2)".into(),
            metric: metric_expr::compile("acc(2)", &Default::default())
                .unwrap()
                .metric,
        };
        let flat = render_graph(&named, &TreeOptions::flat());
        assert!(flat.starts_with("ramp: {"));
        assert!(flat.contains("type: Acc"));

        let tree = render_graph(&named, &TreeOptions::default());
        assert!(tree.starts_with("ramp\n"));
        assert!(tree.contains("└─ type: Acc"));

        print_graph(&named, &TreeOptions::flat());
    }

    #[test]
    fn test_sample_takes_count_values() {
        let mut metrics = vec![NamedMetric {
            name: "ramp".into(),
            expr: "acc(1)".into(),
            metric: metric_expr::compile("acc(1)", &Default::default())
                .unwrap()
                .metric,
        }];
        let series = sample(&mut metrics, 3);
        assert_eq!(series[0].values, vec![1.0, 2.0, 3.0]);
    }
}
