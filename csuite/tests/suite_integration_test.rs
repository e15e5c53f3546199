//! End-to-end suite tests over scratch benchmark trees.
//!
//! External tools are replaced by a recording runner, so these tests check
//! the exact command sequence a run produces without a compiler installed.

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use csuite::benchmark::{BenchmarkSelector, BenchmarkSuite, RunOutcome};
use csuite::config::{default_hosts, SuiteConfig};
use csuite::process::{CommandOutput, CommandRunner, CommandSpec};
use csuite::strategy::bitcode::OPT_PASSES;
use csuite::strategy::{BitcodeStrategy, CompilerKind, CompilerStrategy, ExecutionStrategy};
use csuite::{StrategyContext, StrategyRegistry, SuiteError, SuiteResult, Toolchain};

/// Records every command and answers with a canned response
struct RecordingRunner<F>
where
    F: Fn(&CommandSpec) -> CommandOutput,
{
    calls: RefCell<Vec<CommandSpec>>,
    respond: F,
}

impl<F> RecordingRunner<F>
where
    F: Fn(&CommandSpec) -> CommandOutput,
{
    fn new(respond: F) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            respond,
        }
    }

    fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }
}

impl<F> CommandRunner for RecordingRunner<F>
where
    F: Fn(&CommandSpec) -> CommandOutput,
{
    fn run(&self, command: &CommandSpec) -> SuiteResult<CommandOutput> {
        self.calls.borrow_mut().push(command.clone());
        Ok((self.respond)(command))
    }
}

fn output(exit_code: i32, stdout: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(exit_code),
        stdout: stdout.to_string(),
        stderr: String::new(),
        duration_ms: 3,
    }
}

fn make_tree(root: &Path, with_makefile: &[&str], without: &[&str]) {
    for name in with_makefile {
        fs::create_dir_all(root.join(name)).unwrap();
        fs::write(root.join(name).join("Makefile"), "bench:\n\tcc -o bench main.c\n").unwrap();
    }
    for name in without {
        fs::create_dir_all(root.join(name)).unwrap();
    }
}

fn gcc_o0() -> ExecutionStrategy {
    CompilerStrategy::new(CompilerKind::Gcc, "O0", ["-O0"]).into()
}

#[test]
fn test_lists_only_directories_with_makefile() {
    let dir = tempfile::tempdir().unwrap();
    make_tree(dir.path(), &["c", "a"], &["b"]);
    fs::write(dir.path().join("README"), "not a benchmark").unwrap();

    let config = SuiteConfig::default();
    let toolchain = Toolchain::default();
    let runner = RecordingRunner::new(|_| output(0, ""));
    let strategy = gcc_o0();
    let suite = BenchmarkSuite::with_root(
        dir.path(),
        &strategy,
        StrategyContext::new(&runner, &toolchain, &config),
    );

    assert_eq!(suite.list_available_benchmarks().unwrap(), vec!["a", "c"]);
    assert_eq!(
        BenchmarkSelector::All.resolve(&suite).unwrap(),
        vec!["a", "c"]
    );
    assert!(runner.calls().is_empty());
}

#[cfg(unix)]
#[test]
fn test_lists_symlinked_benchmark_directories() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("sulong-benchmarks");
    make_tree(&root, &["a"], &[]);
    let checkout = dir.path().join("checkout");
    make_tree(&checkout, &["fib"], &[]);
    std::os::unix::fs::symlink(checkout.join("fib"), root.join("fib")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("gone"), root.join("dangling")).unwrap();

    let config = SuiteConfig::default();
    let toolchain = Toolchain::default();
    let runner = RecordingRunner::new(|_| output(0, ""));
    let strategy = gcc_o0();
    let suite = BenchmarkSuite::with_root(
        &root,
        &strategy,
        StrategyContext::new(&runner, &toolchain, &config),
    );

    assert_eq!(suite.list_available_benchmarks().unwrap(), vec!["a", "fib"]);
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SuiteConfig::default();
    config.benchmarks_dir = Some(dir.path().join("sulong-benchmarks"));
    let toolchain = Toolchain::default();
    let runner = RecordingRunner::new(|_| output(0, ""));
    let strategy = gcc_o0();
    let suite =
        BenchmarkSuite::new(&strategy, StrategyContext::new(&runner, &toolchain, &config)).unwrap();

    let err = suite.list_available_benchmarks().unwrap_err();
    assert!(matches!(err, SuiteError::BenchmarksDirMissing { .. }));
    assert!(err.recovery_hint().contains("CSUITE_BENCHMARKS_DIR"));
}

#[test]
fn test_default_root_is_two_levels_above_suite_dir() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SuiteConfig::default();
    config.suite_dir = dir.path().join("graal").join("sulong");
    let toolchain = Toolchain::default();
    let runner = RecordingRunner::new(|_| output(0, ""));
    let strategy = gcc_o0();
    let suite =
        BenchmarkSuite::new(&strategy, StrategyContext::new(&runner, &toolchain, &config)).unwrap();

    assert_eq!(
        suite.root(),
        dir.path()
            .join("graal")
            .join("sulong")
            .join("..")
            .join("..")
            .join("sulong-benchmarks")
    );
}

#[test]
fn test_single_benchmark_operations_reject_ambiguity() {
    let dir = tempfile::tempdir().unwrap();
    make_tree(dir.path(), &["fib", "nbody"], &[]);
    let config = SuiteConfig::default();
    let toolchain = Toolchain::default();
    let runner = RecordingRunner::new(|_| output(0, ""));
    let strategy: ExecutionStrategy =
        CompilerStrategy::new(CompilerKind::Clang, "O3", ["-O3"]).into();
    let suite = BenchmarkSuite::with_root(
        dir.path(),
        &strategy,
        StrategyContext::new(&runner, &toolchain, &config),
    );

    let none: Vec<String> = vec![];
    let two = vec!["fib".to_string(), "nbody".to_string()];
    for names in [&none, &two] {
        let err = suite.working_directory(names).unwrap_err();
        assert_eq!(err.code(), "AMBIGUOUS_SELECTION");
        assert!(err.to_string().contains("csuite:<benchmark-name>"));
        let err = suite.create_command_line(names).unwrap_err();
        assert_eq!(err.code(), "AMBIGUOUS_SELECTION");
    }

    let one = vec!["fib".to_string()];
    let first = suite.working_directory(&one).unwrap();
    assert_eq!(first, dir.path().join("fib").join("clang-O3"));
    assert_eq!(suite.working_directory(&one).unwrap(), first);
}

#[test]
fn test_build_failure_leaves_process_cwd_untouched() {
    let dir = tempfile::tempdir().unwrap();
    make_tree(dir.path(), &["fib"], &[]);
    let config = SuiteConfig::default();
    let toolchain = Toolchain::default();
    let runner = RecordingRunner::new(|_| output(2, ""));
    let strategy = gcc_o0();
    let mut suite = BenchmarkSuite::with_root(
        dir.path(),
        &strategy,
        StrategyContext::new(&runner, &toolchain, &config),
    );

    let before = std::env::current_dir().unwrap();
    let err = suite.run(&["fib".to_string()], &[], false).unwrap_err();
    assert_eq!(err.code(), "COMMAND_FAILED");
    assert_eq!(std::env::current_dir().unwrap(), before);

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].cwd.as_deref(),
        Some(dir.path().join("fib").join("gcc-O0").as_path())
    );
}

#[test]
fn test_native_run_writes_results_file() {
    let dir = tempfile::tempdir().unwrap();
    make_tree(dir.path(), &["fib", "nbody"], &[]);
    let config = SuiteConfig::default();
    let toolchain = Toolchain::default();
    let runner = RecordingRunner::new(|cmd| {
        if cmd.program == "make" {
            output(0, "")
        } else if cmd.program.ends_with("fib/gcc-O0/bench") {
            output(0, "fib: 10\nlast 10 iterations fib: 10, 9.5, 9.75\n")
        } else {
            output(1, "nbody: 3\n")
        }
    });
    let strategy = gcc_o0();
    let mut suite = BenchmarkSuite::with_root(
        dir.path(),
        &strategy,
        StrategyContext::new(&runner, &toolchain, &config),
    );

    let names = suite.list_available_benchmarks().unwrap();
    let report = suite.run(&names, &["5".to_string()], false).unwrap();

    assert!(!report.all_passed());
    assert_eq!(report.results[0].records.len(), 3);
    assert_eq!(report.results[0].summary.as_ref().unwrap().median, 9.75);
    assert_eq!(report.results[1].outcome.to_string(), "FAIL (exit code 1)");

    let exec_calls: Vec<_> = runner
        .calls()
        .into_iter()
        .filter(|c| c.program != "make")
        .collect();
    assert_eq!(exec_calls.len(), 2);
    assert_eq!(exec_calls[0].args, vec!["5"]);

    let results = dir.path().join("bench-results.json");
    report.write_results_file(&results).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&results).unwrap()).unwrap();
    let queries = json["queries"].as_array().unwrap();
    assert_eq!(queries.len(), 3);
    assert_eq!(queries[2]["metric.value"], 9.75);
    assert_eq!(queries[2]["vm"], "gcc");
    assert_eq!(queries[2]["vm-config"], "O0");
}

#[cfg(unix)]
fn fake_llvm_home(dir: &Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bin = dir.join("llvm").join("bin");
    fs::create_dir_all(&bin).unwrap();
    for program in ["clang", "opt"] {
        let path = bin.join(program);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
    dir.join("llvm")
}

#[cfg(unix)]
#[test]
fn test_bitcode_run_on_native_host() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("sulong-benchmarks");
    make_tree(&root, &["fib"], &[]);
    let llvm_home = fake_llvm_home(dir.path());

    let mut config = SuiteConfig::default();
    config.verbose = true;
    config.substitutions.insert("SULONG_LIBS", "/opt/sulong/libs");
    let graalvm_home = dir.path().join("graalvm");
    config.hosts = default_hosts(Some(&graalvm_home), vec![]);

    let registry = StrategyRegistry::native(config.hosts.clone()).unwrap();
    let strategy = registry.select(None, None).unwrap();
    assert!(matches!(strategy, ExecutionStrategy::Bitcode(_)));
    let host = registry
        .select_host(strategy, Some("graalvm"), Some("native"))
        .unwrap();

    let toolchain = Toolchain::with_search_path(Some(llvm_home.clone()), vec![]);
    let runner = RecordingRunner::new(|cmd| {
        if cmd.program.ends_with("lli") {
            output(0, "fib: 1\nlast 10 iterations fib: 1.0, 2.0, 3.0\n")
        } else {
            output(0, "")
        }
    });
    let ctx = StrategyContext::new(&runner, &toolchain, &config).with_host(host);
    let mut suite = BenchmarkSuite::with_root(&root, strategy, ctx);

    let report = suite.run(&["fib".to_string()], &[], false).unwrap();
    assert_eq!(report.results[0].outcome, RunOutcome::Success);
    assert_eq!(report.results[0].records.len(), 3);
    assert_eq!(report.dimensions.host_vm.as_deref(), Some("graalvm"));
    assert_eq!(report.dimensions.host_vm_config.as_deref(), Some("native"));

    let cwd = root.join("fib").join("sulong-default");
    let calls = runner.calls();
    assert_eq!(calls.len(), 4);

    // make with the bitcode wrapper as compiler
    let make = &calls[0];
    let env = make.env.as_ref().unwrap();
    assert_eq!(make.program, "make");
    assert_eq!(make.args.last().map(String::as_str), Some("MX_VERBOSE=y"));
    assert_eq!(env.get("CC").map(String::as_str), Some("wllvm"));
    assert_eq!(env.get("LLVM_COMPILER").map(String::as_str), Some("clang"));
    assert!(env.get("CFLAGS").unwrap().ends_with("-lm -lgmp"));

    // bitcode extraction then the optimizer, both inside the working directory
    assert_eq!(calls[1].program, "extract-bc");
    assert_eq!(calls[1].args, vec!["bench", "--output", "bench.bc"]);
    assert_eq!(calls[2].program, llvm_home.join("bin").join("opt").display().to_string());
    let mut expected_opt = vec!["-o".to_string(), "bench.bc".to_string(), "bench.bc".to_string()];
    expected_opt.extend(OPT_PASSES.iter().map(|p| p.to_string()));
    assert_eq!(calls[2].args, expected_opt);
    for call in &calls[..3] {
        assert_eq!(call.cwd.as_deref(), Some(cwd.as_path()));
    }

    // lli with native-mode flags and the optimized bitcode last
    let lli = &calls[3];
    assert_eq!(lli.program, graalvm_home.join("bin").join("lli").display().to_string());
    assert!(lli.args.iter().all(|a| !a.starts_with("--jvm.")));
    assert!(lli
        .args
        .contains(&"--native.Dgraal.TruffleBackgroundCompilation=false".to_string()));
    assert!(lli
        .args
        .contains(&"--llvm.libraryPath=/opt/sulong/libs".to_string()));
    assert_eq!(
        lli.args.last().map(String::as_str),
        Some(cwd.join("bench.bc").display().to_string().as_str())
    );
}

#[test]
fn test_execute_before_build_is_missing_artifact() {
    let dir = tempfile::tempdir().unwrap();
    make_tree(dir.path(), &["fib"], &[]);
    let config = SuiteConfig::default();
    let toolchain = Toolchain::default();
    let runner = RecordingRunner::new(|_| output(0, ""));
    let strategy: ExecutionStrategy = BitcodeStrategy::new().into();
    let suite = BenchmarkSuite::with_root(
        dir.path(),
        &strategy,
        StrategyContext::new(&runner, &toolchain, &config),
    );

    let err = suite.execute("fib", &[]).unwrap_err();
    assert_eq!(err.code(), "MISSING_ARTIFACT");
}
