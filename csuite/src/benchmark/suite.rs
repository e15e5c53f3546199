//! Benchmark Suite: discover, build and run the C benchmarks
//!
//! Every benchmark is a subdirectory of the benchmarks root holding a
//! `Makefile`. A run builds each requested benchmark into
//! `<root>/<benchmark>/<strategy bin dir>`, post-processes the artifact and
//! only then executes the artifacts one after another.
//!
//! The build tool is started with an explicit working directory, so the
//! driver's own current directory never changes.

use crate::benchmark::outcome::{classify, FailureReason, RunOutcome};
use crate::benchmark::report::{BenchmarkResult, RunReport, SuiteDimensions, SUITE_NAME};
use crate::benchmark::rules::{MetricRecord, MetricRule};
use crate::error::{SuiteError, SuiteResult};
use crate::process::{current_env, CommandSpec};
use crate::strategy::{ExecutionStrategy, StrategyContext};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Build descriptor marking a directory as a benchmark
pub const BUILD_DESCRIPTOR: &str = "Makefile";

/// Name of the native executable the Makefiles produce
pub const NATIVE_OUT: &str = "bench";

/// Make variable switching the build to verbose output
pub const VERBOSE_FLAG: &str = "MX_VERBOSE=y";

/// Which benchmarks a run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BenchmarkSelector {
    /// `csuite:*`
    All,
    /// `csuite:<name>`
    One(String),
}

impl BenchmarkSelector {
    /// Parse `csuite:<name>` or `csuite:*`
    pub fn parse(selector: &str) -> SuiteResult<Self> {
        let rest = selector
            .strip_prefix(SUITE_NAME)
            .and_then(|r| r.strip_prefix(':'))
            .ok_or_else(|| SuiteError::invalid_selector(selector))?;
        match rest {
            "*" => Ok(Self::All),
            "" | "." | ".." => Err(SuiteError::invalid_selector(selector)),
            name if name.contains(['/', '\\', ':']) => Err(SuiteError::invalid_selector(selector)),
            name => Ok(Self::One(name.to_string())),
        }
    }

    /// Benchmark names this selector stands for, in run order
    pub fn resolve(&self, suite: &BenchmarkSuite<'_>) -> SuiteResult<Vec<String>> {
        match self {
            Self::All => suite.list_available_benchmarks(),
            Self::One(name) => Ok(vec![name.clone()]),
        }
    }
}

impl std::str::FromStr for BenchmarkSelector {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Orchestrates one strategy over the benchmarks root
pub struct BenchmarkSuite<'a> {
    root: PathBuf,
    strategy: &'a ExecutionStrategy,
    ctx: StrategyContext<'a>,
    rule: MetricRule,
    /// Final artifact per built benchmark
    artifacts: BTreeMap<String, PathBuf>,
}

impl<'a> BenchmarkSuite<'a> {
    /// Suite over the configured benchmarks root
    pub fn new(strategy: &'a ExecutionStrategy, ctx: StrategyContext<'a>) -> SuiteResult<Self> {
        let root = ctx.config.benchmarks_root()?;
        Ok(Self::with_root(root, strategy, ctx))
    }

    /// Suite over an explicit benchmarks root
    pub fn with_root(
        root: impl Into<PathBuf>,
        strategy: &'a ExecutionStrategy,
        ctx: StrategyContext<'a>,
    ) -> Self {
        Self {
            root: root.into(),
            strategy,
            ctx,
            rule: MetricRule::new(),
            artifacts: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn strategy(&self) -> &ExecutionStrategy {
        self.strategy
    }

    /// Artifacts recorded so far, keyed by benchmark
    pub fn artifacts(&self) -> &BTreeMap<String, PathBuf> {
        &self.artifacts
    }

    /// Dimensions stamped on this suite's results
    pub fn dimensions(&self) -> SuiteDimensions {
        let dims = SuiteDimensions::new(self.strategy.name(), self.strategy.config_name());
        match self.ctx.host {
            Some(host) if self.strategy.is_hosted() => dims.with_host(&host.name, &host.config),
            _ => dims,
        }
    }

    /// Sorted names of every subdirectory of the root that has a Makefile
    pub fn list_available_benchmarks(&self) -> SuiteResult<Vec<String>> {
        if !self.root.is_dir() {
            return Err(SuiteError::benchmarks_dir_missing(&self.root));
        }
        let mut benchmarks = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            // follows symlinks, so linked benchmark checkouts are listed
            if !path.is_dir() {
                continue;
            }
            if path.join(BUILD_DESCRIPTOR).is_file() {
                if let Some(name) = path.file_name() {
                    benchmarks.push(name.to_string_lossy().to_string());
                }
            }
        }
        benchmarks.sort();
        Ok(benchmarks)
    }

    /// `<root>/<benchmark>/<bin dir>` for exactly one benchmark
    pub fn working_directory(&self, benchmarks: &[String]) -> SuiteResult<PathBuf> {
        let name = single(benchmarks)?;
        Ok(self.root.join(name).join(self.strategy.bin_dir()))
    }

    /// Command line running the recorded artifact of exactly one benchmark
    pub fn create_command_line(&self, benchmarks: &[String]) -> SuiteResult<Vec<String>> {
        let name = single(benchmarks)?;
        let artifact = self
            .artifacts
            .get(name)
            .ok_or_else(|| SuiteError::MissingArtifact {
                benchmark: name.to_string(),
            })?;
        Ok(vec![artifact.display().to_string()])
    }

    /// Build one benchmark and record its final artifact
    pub fn build(&mut self, benchmark: &str) -> SuiteResult<PathBuf> {
        let bench_dir = self.root.join(benchmark);
        let makefile = bench_dir.join(BUILD_DESCRIPTOR);
        if !makefile.is_file() {
            return Err(SuiteError::UnknownBenchmark {
                name: benchmark.to_string(),
            });
        }

        let cwd = self.working_directory(&[benchmark.to_string()])?;
        std::fs::create_dir_all(&cwd)?;
        let stale = cwd.join(NATIVE_OUT);
        if stale.exists() {
            std::fs::remove_file(&stale)?;
        }

        let mut env = current_env();
        env.insert("VPATH".to_string(), bench_dir.display().to_string());
        let env = self.strategy.prepare_env(env, &self.ctx)?;

        let make = self.ctx.config.make.clone();
        let mut command = CommandSpec::new(make.clone())
            .args(["-f".to_string(), makefile.display().to_string()])
            .current_dir(&cwd)
            .envs(env);
        if self.ctx.config.verbose {
            command = command.arg(VERBOSE_FLAG);
        }

        tracing::info!(
            benchmark,
            vm = %self.strategy.bin_dir(),
            cwd = %cwd.display(),
            "Building benchmark"
        );
        self.ctx.runner.run(&command)?.check(&make)?;

        let artifact = self
            .strategy
            .post_process(Path::new(NATIVE_OUT), &cwd, &self.ctx)?;
        tracing::debug!(benchmark, artifact = %artifact.display(), "Recorded build artifact");
        self.artifacts.insert(benchmark.to_string(), artifact.clone());
        Ok(artifact)
    }

    /// Execute one built benchmark and classify its output.
    ///
    /// Failures of the run itself end up in the result; only fatal errors
    /// (missing host, missing artifact, bad configuration) are returned.
    pub fn execute(&self, benchmark: &str, extra_args: &[String]) -> SuiteResult<BenchmarkResult> {
        let names = [benchmark.to_string()];
        let cwd = self.working_directory(&names)?;
        let mut cmdline = self.create_command_line(&names)?;
        cmdline.extend(extra_args.iter().cloned());

        let started = Instant::now();
        let output = match self.strategy.execute(&cwd, &cmdline, &self.ctx) {
            Ok(output) => output,
            Err(e) if !e.is_fatal() => {
                tracing::warn!(benchmark, error = %e, "Benchmark could not be executed");
                return Ok(BenchmarkResult::new(
                    benchmark,
                    RunOutcome::failed(FailureReason::Error {
                        message: e.to_string(),
                    }),
                    None,
                    started.elapsed().as_millis() as u64,
                    Vec::new(),
                ));
            }
            Err(e) => return Err(e),
        };

        let outcome = classify(output.exit_code, &output.stdout);
        let records: Vec<MetricRecord> = if outcome.is_success() {
            self.rule.parse(&output.stdout).collect()
        } else {
            tracing::debug!(benchmark, stderr = %output.stderr, "Benchmark stderr");
            Vec::new()
        };
        tracing::info!(
            benchmark,
            vm = %self.strategy.bin_dir(),
            outcome = %outcome,
            records = records.len(),
            "Benchmark finished"
        );

        Ok(BenchmarkResult::new(
            benchmark,
            outcome,
            output.exit_code,
            output.duration_ms,
            records,
        ))
    }

    /// Build every benchmark, then execute each one.
    ///
    /// A build failure aborts the whole run. With `fail_fast`, the first
    /// failed execution stops the remaining ones.
    pub fn run(
        &mut self,
        benchmarks: &[String],
        extra_args: &[String],
        fail_fast: bool,
    ) -> SuiteResult<RunReport> {
        for benchmark in benchmarks {
            self.build(benchmark)?;
        }

        let mut report = RunReport::new(self.dimensions());
        for benchmark in benchmarks {
            let result = self.execute(benchmark, extra_args)?;
            let passed = result.passed();
            report.push(result);
            if !passed && fail_fast {
                tracing::warn!(benchmark = %benchmark, "Stopping after first failure");
                break;
            }
        }
        tracing::info!("{}", report.summary());
        Ok(report)
    }
}

/// The one name in `benchmarks`, or the selection guidance error
fn single(benchmarks: &[String]) -> SuiteResult<&str> {
    match benchmarks {
        [name] => Ok(name.as_str()),
        _ => Err(SuiteError::AmbiguousSelection {
            count: benchmarks.len(),
        }),
    }
}
