//! Bitcode interpreter strategy
//!
//! Builds through a bitcode-recording compiler wrapper, pulls the bitcode
//! back out of the native binary, runs a fixed optimization pipeline over it
//! and executes the result with `lli` on a hosting runtime.

use super::{HostRuntime, StrategyContext, LINK_FLAGS};
use crate::error::{SuiteError, SuiteResult};
use crate::process::{CommandOutput, CommandSpec, EnvMap};
use crate::toolchain::{CLANG, OPT};
use std::path::{Path, PathBuf};

/// Optimization passes applied to extracted bitcode. Order matters.
pub const OPT_PASSES: &[&str] = &[
    "-mem2reg",
    "-globalopt",
    "-simplifycfg",
    "-constprop",
    "-instcombine",
    "-dse",
    "-loop-simplify",
    "-reassociate",
    "-licm",
    "-gvn",
];

/// File the extracted and optimized bitcode is written to
pub const BITCODE_FILE: &str = "bench.bc";

/// Guest language launcher on the hosting runtime
pub const LANGUAGE_LAUNCHER: &str = "lli";

/// Main class used when the host only offers a raw JVM
pub const LAUNCHER_CLASS: &str = "com.oracle.truffle.llvm.launcher.LLVMLauncher";

/// Shared library every benchmark links against
pub const GMP_LIBRARY: &str = "libgmp.so.10";

const JVM_PREFIX: &str = "--jvm.";
const NATIVE_PREFIX: &str = "--native.";

/// Bitcode interpreter hosted on a Java runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitcodeStrategy {
    config_name: String,
}

impl Default for BitcodeStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl BitcodeStrategy {
    pub fn new() -> Self {
        Self {
            config_name: "default".to_string(),
        }
    }

    pub fn name(&self) -> &str {
        "sulong"
    }

    pub fn config_name(&self) -> &str {
        &self.config_name
    }

    /// No optimization level here; optimization happens on the bitcode
    pub fn prepare_env(&self, mut env: EnvMap, ctx: &StrategyContext<'_>) -> EnvMap {
        let cflags: Vec<&str> = ctx
            .config
            .env_flags
            .iter()
            .map(String::as_str)
            .chain(LINK_FLAGS.iter().copied())
            .collect();
        env.insert("CFLAGS".to_string(), cflags.join(" "));
        env.insert("LLVM_COMPILER".to_string(), CLANG.to_string());
        env.insert("CC".to_string(), ctx.config.bitcode_wrapper.clone());
        env
    }

    /// Extract bitcode from `exe`, optimize it, return the bitcode path
    pub fn post_process(
        &self,
        exe: &Path,
        cwd: &Path,
        ctx: &StrategyContext<'_>,
    ) -> SuiteResult<PathBuf> {
        let bitcode = self.extract_bitcode(exe, cwd, ctx)?;
        self.optimize_bitcode(&bitcode, cwd, ctx)?;
        Ok(cwd.join(bitcode))
    }

    fn extract_bitcode(
        &self,
        exe: &Path,
        cwd: &Path,
        ctx: &StrategyContext<'_>,
    ) -> SuiteResult<String> {
        let program = ctx.config.extract_bc.clone();
        let command = CommandSpec::new(program.clone())
            .arg(exe.display().to_string())
            .args(["--output", BITCODE_FILE])
            .current_dir(cwd);
        tracing::info!(exe = %exe.display(), "Extracting bitcode");
        ctx.runner.run(&command)?.check(&program)?;
        Ok(BITCODE_FILE.to_string())
    }

    fn optimize_bitcode(
        &self,
        bitcode: &str,
        cwd: &Path,
        ctx: &StrategyContext<'_>,
    ) -> SuiteResult<()> {
        let opt = ctx.toolchain.find_program(OPT)?.display().to_string();
        let command = CommandSpec::new(opt.clone())
            .args(["-o", bitcode, bitcode])
            .args(OPT_PASSES.iter().copied())
            .current_dir(cwd);
        tracing::info!(bitcode, passes = OPT_PASSES.len(), "Optimizing bitcode");
        ctx.runner.run(&command)?.check(&opt)?;
        Ok(())
    }

    /// Arguments passed to the launcher ahead of the program arguments.
    ///
    /// A host in native mode takes `--native.` where a JVM host takes `--jvm.`.
    pub fn launcher_args(
        &self,
        host: &HostRuntime,
        ctx: &StrategyContext<'_>,
    ) -> SuiteResult<Vec<String>> {
        let args = vec![
            "--jvm.Dgraal.TruffleBackgroundCompilation=false".to_string(),
            "--jvm.Dgraal.TruffleInliningMaxCallerSize=10000".to_string(),
            "--jvm.Dgraal.TruffleCompilationExceptionsAreFatal=true".to_string(),
            ctx.config
                .substitutions
                .substitute("--llvm.libraryPath=<path:SULONG_LIBS>")?,
            format!("--llvm.libraries={}", GMP_LIBRARY),
        ];

        if !host.is_native_mode() {
            return Ok(args);
        }
        Ok(args
            .into_iter()
            .map(|arg| match arg.strip_prefix(JVM_PREFIX) {
                Some(rest) => format!("{}{}", NATIVE_PREFIX, rest),
                None => arg,
            })
            .collect())
    }

    /// Run the bitcode under `lli` on the selected hosting runtime
    pub fn execute(
        &self,
        cwd: &Path,
        args: &[String],
        ctx: &StrategyContext<'_>,
    ) -> SuiteResult<CommandOutput> {
        let host = ctx.host.ok_or_else(|| SuiteError::HostRequired {
            strategy: self.name().to_string(),
        })?;

        let mut launcher_args = self.launcher_args(host, ctx)?;
        launcher_args.extend(args.iter().cloned());

        let command = match host.lang_command(LANGUAGE_LAUNCHER, &launcher_args, cwd) {
            Some(command) => command,
            None => {
                let mut cmdline = host.classpath_options();
                cmdline.push("-XX:-UseJVMCIClassLoader".to_string());
                cmdline.push(LAUNCHER_CLASS.to_string());
                cmdline.extend(launcher_args);
                host.classpath_command(&cmdline, cwd).ok_or_else(|| {
                    SuiteError::config(format!(
                        "hosting runtime {} has neither a launcher nor a classpath",
                        host.label()
                    ))
                })?
            }
        };
        tracing::debug!(host = %host.label(), "Running bitcode on hosting runtime");
        ctx.runner.run(&command)
    }
}
