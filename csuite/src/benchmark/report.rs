//! Run Report: structured results of one suite run
//!
//! Holds per-benchmark outcomes and metric records, renders a Markdown
//! summary and writes the JSON results file consumed by result uploaders.

use crate::benchmark::outcome::RunOutcome;
use crate::benchmark::rules::MetricRecord;
use crate::error::SuiteResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Suite identity
pub const SUITE_NAME: &str = "csuite";
pub const SUITE_GROUP: &str = "Graal";
pub const SUITE_SUBGROUP: &str = "sulong";

/// Dimensions stamped on every result record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteDimensions {
    #[serde(rename = "bench-suite")]
    pub suite: String,
    pub group: String,
    pub subgroup: String,
    pub vm: String,
    #[serde(rename = "vm-config")]
    pub vm_config: String,
    #[serde(rename = "host-vm", skip_serializing_if = "Option::is_none")]
    pub host_vm: Option<String>,
    #[serde(rename = "host-vm-config", skip_serializing_if = "Option::is_none")]
    pub host_vm_config: Option<String>,
}

impl SuiteDimensions {
    pub fn new(vm: impl Into<String>, vm_config: impl Into<String>) -> Self {
        Self {
            suite: SUITE_NAME.to_string(),
            group: SUITE_GROUP.to_string(),
            subgroup: SUITE_SUBGROUP.to_string(),
            vm: vm.into(),
            vm_config: vm_config.into(),
            host_vm: None,
            host_vm_config: None,
        }
    }

    pub fn with_host(mut self, name: impl Into<String>, config: impl Into<String>) -> Self {
        self.host_vm = Some(name.into());
        self.host_vm_config = Some(config.into());
        self
    }
}

/// One entry of the results file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(flatten)]
    pub dimensions: SuiteDimensions,
    #[serde(flatten)]
    pub metric: MetricRecord,
}

/// Summary statistics over a benchmark's `time` values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl TimeSummary {
    /// `None` for an empty sample
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };
        Some(Self {
            count: n,
            min: sorted[0],
            max: sorted[n - 1],
            mean: sorted.iter().sum::<f64>() / n as f64,
            median,
        })
    }
}

/// Outcome of running one benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub benchmark: String,
    pub outcome: RunOutcome,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<MetricRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<TimeSummary>,
}

impl BenchmarkResult {
    pub fn new(
        benchmark: impl Into<String>,
        outcome: RunOutcome,
        exit_code: Option<i32>,
        duration_ms: u64,
        records: Vec<MetricRecord>,
    ) -> Self {
        let values: Vec<f64> = records.iter().map(|r| r.value).collect();
        Self {
            benchmark: benchmark.into(),
            outcome,
            exit_code,
            duration_ms,
            summary: TimeSummary::from_values(&values),
            records,
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Complete report of one suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub dimensions: SuiteDimensions,
    pub results: Vec<BenchmarkResult>,
}

/// On-disk results file layout
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultsFile {
    pub queries: Vec<ResultRecord>,
}

impl RunReport {
    pub fn new(dimensions: SuiteDimensions) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            dimensions,
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: BenchmarkResult) {
        self.results.push(result);
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(BenchmarkResult::passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &BenchmarkResult> {
        self.results.iter().filter(|r| !r.passed())
    }

    /// Every metric record stamped with the run's dimensions
    pub fn queries(&self) -> Vec<ResultRecord> {
        self.results
            .iter()
            .flat_map(|r| r.records.iter())
            .map(|m| ResultRecord {
                dimensions: self.dimensions.clone(),
                metric: m.clone(),
            })
            .collect()
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        let passed = self.results.iter().filter(|r| r.passed()).count();
        format!(
            "{}:{} {}/{} benchmarks passed, {} data points",
            self.dimensions.vm,
            self.dimensions.vm_config,
            passed,
            self.results.len(),
            self.results.iter().map(|r| r.records.len()).sum::<usize>()
        )
    }

    /// Markdown table of per-benchmark results
    pub fn format_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "# {} results ({}-{})\n\n",
            self.dimensions.suite, self.dimensions.vm, self.dimensions.vm_config
        ));
        if let (Some(host), Some(config)) =
            (&self.dimensions.host_vm, &self.dimensions.host_vm_config)
        {
            out.push_str(&format!("Host: {}-{}\n\n", host, config));
        }
        out.push_str("| Benchmark | Status | N | Min | Median | Mean | Max |\n");
        out.push_str("|-----------|--------|---|-----|--------|------|-----|\n");
        for r in &self.results {
            match &r.summary {
                Some(s) => out.push_str(&format!(
                    "| {} | {} | {} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
                    r.benchmark, r.outcome, s.count, s.min, s.median, s.mean, s.max
                )),
                None => out.push_str(&format!(
                    "| {} | {} | 0 | - | - | - | - |\n",
                    r.benchmark, r.outcome
                )),
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write `{"queries": [...]}` to `path`
    pub fn write_results_file(&self, path: &Path) -> SuiteResult<()> {
        let file = ResultsFile {
            queries: self.queries(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        tracing::info!(
            path = %path.display(),
            records = file.queries.len(),
            "Wrote results file"
        );
        Ok(())
    }
}
