//! Command-line driver for the csuite C benchmark suite
//!
//! Builds the C benchmarks under `sulong-benchmarks` with a native compiler
//! or as bitcode for the sulong interpreter, runs them and writes the
//! parsed `time` metrics to a results file.
//!
//! # Usage
//!
//! ```bash
//! # Benchmarks available under the benchmarks root
//! csuite-runner list
//!
//! # Registered execution strategies and hosting runtimes
//! csuite-runner vms
//!
//! # One benchmark on the default strategy (sulong on graalvm-jvm)
//! csuite-runner run csuite:fib
//!
//! # Everything with gcc -O2, extra arguments after `--`
//! csuite-runner run 'csuite:*' --vm gcc --vm-config O2 -- 1000
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use csuite::benchmark::{BenchmarkSelector, BenchmarkSuite};
use csuite::strategy::StrategyContext;
use csuite::{StrategyRegistry, SuiteConfig, SuiteError, SystemRunner, Toolchain};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file layered over defaults and environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging and verbose builds (MX_VERBOSE=y)
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the benchmarks found under the benchmarks root
    List,
    /// List registered execution strategies and hosting runtimes
    Vms {
        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Build and run benchmarks
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// `csuite:<benchmark-name>` or `csuite:*`
    selector: String,

    /// Execution strategy name (gcc, clang, sulong)
    #[arg(long)]
    vm: Option<String>,

    /// Execution strategy configuration (O0..O3, default)
    #[arg(long)]
    vm_config: Option<String>,

    /// Hosting runtime for hosted strategies
    #[arg(long)]
    host_vm: Option<String>,

    /// Hosting runtime configuration (jvm, native, default)
    #[arg(long)]
    host_vm_config: Option<String>,

    /// Where to write the `{"queries": [...]}` results file
    #[arg(long, default_value = "bench-results.json")]
    results_file: PathBuf,

    /// Stop executing after the first failed benchmark
    #[arg(long, default_value_t = false)]
    fail_fast: bool,

    /// Print the report as JSON instead of Markdown
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Arguments passed to every benchmark
    #[arg(last = true)]
    args: Vec<String>,
}

/// One row of `vms` output
#[derive(Debug, Serialize)]
struct VmInfo {
    registry: String,
    name: String,
    config: String,
    priority: i32,
    hosted: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = SuiteConfig::load(cli.config.as_deref())
        .map_err(hinted)
        .context("Failed to load configuration")?;
    config.verbose |= cli.verbose;

    let registry = StrategyRegistry::native(config.hosts.clone()).map_err(hinted)?;

    match cli.command {
        Command::List => list(&config, &registry),
        Command::Vms { json } => vms(&registry, json),
        Command::Run(args) => run(&config, &registry, args),
    }
}

/// Attach the recovery hint to a suite error
fn hinted(e: SuiteError) -> anyhow::Error {
    anyhow!("{} [{}]\nHint: {}", e, e.code(), e.recovery_hint())
}

fn list(config: &SuiteConfig, registry: &StrategyRegistry) -> Result<ExitCode> {
    let strategy = registry.select(None, None).map_err(hinted)?;
    let toolchain = Toolchain::new(config.llvm_home.clone());
    let runner = SystemRunner;
    let ctx = StrategyContext::new(&runner, &toolchain, config);
    let suite = BenchmarkSuite::new(strategy, ctx).map_err(hinted)?;

    for name in suite.list_available_benchmarks().map_err(hinted)? {
        println!("{}", name);
    }
    Ok(ExitCode::SUCCESS)
}

fn vms(registry: &StrategyRegistry, json: bool) -> Result<ExitCode> {
    let mut rows: Vec<VmInfo> = registry
        .entries()
        .iter()
        .map(|e| VmInfo {
            registry: registry.name().to_string(),
            name: e.strategy.name().to_string(),
            config: e.strategy.config_name().to_string(),
            priority: e.priority,
            hosted: e.strategy.is_hosted(),
        })
        .collect();
    rows.extend(registry.hosts().hosts().iter().map(|h| VmInfo {
        registry: registry.hosts().name().to_string(),
        name: h.name.clone(),
        config: h.config.clone(),
        priority: h.priority,
        hosted: false,
    }));

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(ExitCode::SUCCESS);
    }
    println!("{:<8} {:<10} {:<10} {:>8}", "REGISTRY", "NAME", "CONFIG", "PRIORITY");
    for row in &rows {
        println!(
            "{:<8} {:<10} {:<10} {:>8}{}",
            row.registry,
            row.name,
            row.config,
            row.priority,
            if row.hosted { "  (hosted)" } else { "" }
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn run(config: &SuiteConfig, registry: &StrategyRegistry, args: RunArgs) -> Result<ExitCode> {
    let selector = BenchmarkSelector::parse(&args.selector).map_err(hinted)?;
    let strategy = registry
        .select(args.vm.as_deref(), args.vm_config.as_deref())
        .map_err(hinted)?;
    let host = registry
        .select_host(
            strategy,
            args.host_vm.as_deref(),
            args.host_vm_config.as_deref(),
        )
        .map_err(hinted)?;

    let toolchain = Toolchain::new(config.llvm_home.clone());
    let runner = SystemRunner;
    let ctx = StrategyContext::new(&runner, &toolchain, config).with_host(host);
    let mut suite = BenchmarkSuite::new(strategy, ctx).map_err(hinted)?;
    let benchmarks = selector.resolve(&suite).map_err(hinted)?;

    info!(
        vm = %strategy,
        host = %host.map(|h| h.label()).unwrap_or_default(),
        benchmarks = benchmarks.len(),
        root = %suite.root().display(),
        "Starting csuite run"
    );

    let report = suite
        .run(&benchmarks, &args.args, args.fail_fast)
        .map_err(hinted)?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.format_markdown());
    }
    report
        .write_results_file(&args.results_file)
        .map_err(hinted)
        .with_context(|| format!("Failed to write {}", args.results_file.display()))?;

    if report.all_passed() {
        return Ok(ExitCode::SUCCESS);
    }
    for failed in report.failed() {
        error!(benchmark = %failed.benchmark, outcome = %failed.outcome, "Benchmark failed");
    }
    Ok(ExitCode::FAILURE)
}
