//! C benchmark suite driver
//!
//! This library provides:
//! - Execution strategies for building and running C benchmarks natively
//!   (gcc, clang) or as optimized bitcode on a hosting runtime (sulong)
//! - An immutable registry of strategies and hosting runtimes
//! - The benchmark suite: discovery, build, execution and metric parsing
//!
//! # Usage
//!
//! ```bash
//! # List the benchmarks found under ../../sulong-benchmarks
//! csuite-runner list
//!
//! # Run one benchmark with the default strategy
//! csuite-runner run csuite:fib
//!
//! # Run every benchmark natively with clang -O3
//! csuite-runner run 'csuite:*' --vm clang --vm-config O3
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod benchmark;
pub mod config;
pub mod error;
pub mod process;
pub mod registry;
pub mod strategy;
pub mod toolchain;

pub use benchmark::{
    BenchmarkResult, BenchmarkSelector, BenchmarkSuite, MetricRecord, MetricRule, RunOutcome,
    RunReport,
};
pub use config::SuiteConfig;
pub use error::{SuiteError, SuiteResult};
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use registry::{HostRegistry, StrategyRegistry};
pub use strategy::{ExecutionStrategy, HostRuntime, StrategyContext};
pub use toolchain::Toolchain;
