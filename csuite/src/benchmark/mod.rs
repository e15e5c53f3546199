//! Benchmark Module
//!
//! Discovers the C benchmarks, builds them with the selected execution
//! strategy, runs the artifacts and turns their stdout into metric records.
//!
//! # Architecture
//!
//! ```text
//! sulong-benchmarks/<name>/Makefile → BenchmarkSuite::list_available_benchmarks
//!                                              ↓
//!                               build (make, post_process) per benchmark
//!                                              ↓
//!                                execute artifact per benchmark
//!                                              ↓
//!                         ┌────────────────────┴───────────────────┐
//!                         ↓                                        ↓
//!                 outcome::classify                      rules::MetricRule
//!                         │                                        │
//!                         └────────────────────┬───────────────────┘
//!                                              ↓
//!                                          RunReport
//! ```

pub mod outcome;
pub mod report;
pub mod rules;
pub mod suite;

pub use outcome::{classify, FailureReason, RunOutcome};
pub use report::{
    BenchmarkResult, ResultRecord, ResultsFile, RunReport, SuiteDimensions, TimeSummary,
    SUITE_GROUP, SUITE_NAME, SUITE_SUBGROUP,
};
pub use rules::{Better, IterationLine, MetricRecord, MetricRule, TIME_METRIC};
pub use suite::{BenchmarkSelector, BenchmarkSuite, BUILD_DESCRIPTOR, NATIVE_OUT};
