//! Metric extraction from benchmark stdout
//!
//! Benchmarks report their last ten iteration times on one line:
//!
//! ```text
//! last 10 iterations fib: 120.5, 118.0, 119.25, ...
//! ```
//!
//! Each value on such a line becomes its own [`MetricRecord`], so the
//! reporting side can aggregate ten independent data points.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// `last 10 iterations <benchmark>:<values>` where values are numbers
/// separated by commas and spaces
static ITERATIONS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^last 10 iterations (?P<benchmark>\S+):(?P<values>(?:[ ,]+\d+(?:\.\d+)?)+)")
        .unwrap()
});

/// Name of the only metric this suite reports
pub const TIME_METRIC: &str = "time";

/// Which direction of a metric is an improvement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Better {
    Lower,
    Higher,
}

impl std::fmt::Display for Better {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lower => write!(f, "lower"),
            Self::Higher => write!(f, "higher"),
        }
    }
}

/// One scored measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub benchmark: String,
    #[serde(rename = "metric.name")]
    pub metric_name: String,
    #[serde(rename = "metric.type")]
    pub metric_type: String,
    #[serde(rename = "metric.value")]
    pub value: f64,
    #[serde(rename = "metric.score-function")]
    pub score_function: String,
    #[serde(rename = "metric.better")]
    pub better: Better,
    #[serde(rename = "metric.iteration")]
    pub iteration: u32,
}

impl MetricRecord {
    /// A lower-is-better `time` measurement
    pub fn time(benchmark: impl Into<String>, value: f64) -> Self {
        Self {
            benchmark: benchmark.into(),
            metric_name: TIME_METRIC.to_string(),
            metric_type: "numeric".to_string(),
            value,
            score_function: "id".to_string(),
            better: Better::Lower,
            iteration: 0,
        }
    }
}

/// A matched iteration line
#[derive(Debug, Clone, PartialEq)]
pub struct IterationLine {
    pub benchmark: String,
    pub values: Vec<f64>,
}

impl IterationLine {
    /// Expand into one record per value
    pub fn into_records(self) -> impl Iterator<Item = MetricRecord> {
        let benchmark = self.benchmark;
        self.values
            .into_iter()
            .map(move |value| MetricRecord::time(benchmark.clone(), value))
    }
}

/// Parses `last 10 iterations` lines into metric records
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricRule;

impl MetricRule {
    pub fn new() -> Self {
        Self
    }

    /// Match a single line; anything that does not fit the grammar is `None`
    pub fn parse_line(&self, line: &str) -> Option<IterationLine> {
        let caps = ITERATIONS_LINE.captures(line)?;
        let benchmark = caps.name("benchmark")?.as_str().to_string();
        let values: Vec<f64> = caps
            .name("values")?
            .as_str()
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .filter_map(|v| v.parse().ok())
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(IterationLine { benchmark, values })
    }

    /// Lazily yield records for every matching line of `text`.
    ///
    /// Calling this again on the same text starts over.
    pub fn parse<'a>(&'a self, text: &'a str) -> impl Iterator<Item = MetricRecord> + 'a {
        text.lines()
            .filter_map(move |line| self.parse_line(line))
            .flat_map(IterationLine::into_records)
    }
}
