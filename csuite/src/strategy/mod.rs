//! Execution strategies
//!
//! An execution strategy decides how a benchmark is compiled and run:
//!
//! ```text
//! prepare_env ──▶ make ──▶ post_process ──▶ execute
//!  (CC, CFLAGS)            (bitcode only)    (native binary or hosted lli)
//! ```
//!
//! Two variants exist: [`CompilerStrategy`] builds and runs a native binary
//! with gcc or clang, [`BitcodeStrategy`] builds through a bitcode-recording
//! wrapper, optimizes the extracted bitcode and interprets it on a hosting
//! runtime.

pub mod bitcode;
pub mod compiler;
pub mod host;

pub use bitcode::BitcodeStrategy;
pub use compiler::{CompilerKind, CompilerStrategy};
pub use host::{HostLaunch, HostRuntime};

use crate::config::SuiteConfig;
use crate::error::SuiteResult;
use crate::process::{CommandOutput, CommandRunner, EnvMap};
use crate::toolchain::Toolchain;
use std::path::{Path, PathBuf};

/// Link flags every benchmark needs (libm and GMP)
pub const LINK_FLAGS: &[&str] = &["-lm", "-lgmp"];

/// Everything a strategy needs from its surroundings
#[derive(Clone, Copy)]
pub struct StrategyContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub toolchain: &'a Toolchain,
    pub config: &'a SuiteConfig,
    /// Selected hosting runtime, required by hosted strategies
    pub host: Option<&'a HostRuntime>,
}

impl<'a> StrategyContext<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        toolchain: &'a Toolchain,
        config: &'a SuiteConfig,
    ) -> Self {
        Self {
            runner,
            toolchain,
            config,
            host: None,
        }
    }

    pub fn with_host(mut self, host: Option<&'a HostRuntime>) -> Self {
        self.host = host;
        self
    }
}

/// A way of building and running C benchmarks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Native binary from gcc or clang
    Compiler(CompilerStrategy),
    /// Optimized bitcode interpreted on a hosting runtime
    Bitcode(BitcodeStrategy),
}

impl ExecutionStrategy {
    /// Strategy name ("gcc", "clang", "sulong")
    pub fn name(&self) -> &str {
        match self {
            Self::Compiler(c) => c.name(),
            Self::Bitcode(b) => b.name(),
        }
    }

    /// Configuration label ("O2", "default", ...)
    pub fn config_name(&self) -> &str {
        match self {
            Self::Compiler(c) => c.config_name(),
            Self::Bitcode(b) => b.config_name(),
        }
    }

    /// Per-strategy output directory inside a benchmark: `{name}-{config}`
    pub fn bin_dir(&self) -> String {
        format!("{}-{}", self.name(), self.config_name())
    }

    /// Whether execution happens inside a hosting runtime
    pub fn is_hosted(&self) -> bool {
        matches!(self, Self::Bitcode(_))
    }

    /// Return `env` with the compiler variables this strategy needs
    pub fn prepare_env(&self, env: EnvMap, ctx: &StrategyContext<'_>) -> SuiteResult<EnvMap> {
        match self {
            Self::Compiler(c) => c.prepare_env(env, ctx),
            Self::Bitcode(b) => Ok(b.prepare_env(env, ctx)),
        }
    }

    /// Turn the built executable into the artifact that gets run
    pub fn post_process(
        &self,
        exe: &Path,
        cwd: &Path,
        ctx: &StrategyContext<'_>,
    ) -> SuiteResult<PathBuf> {
        match self {
            Self::Compiler(_) => Ok(cwd.join(exe)),
            Self::Bitcode(b) => b.post_process(exe, cwd, ctx),
        }
    }

    /// Run a built artifact and capture its output
    pub fn execute(
        &self,
        cwd: &Path,
        args: &[String],
        ctx: &StrategyContext<'_>,
    ) -> SuiteResult<CommandOutput> {
        match self {
            Self::Compiler(c) => c.execute(cwd, args, ctx),
            Self::Bitcode(b) => b.execute(cwd, args, ctx),
        }
    }
}

impl From<CompilerStrategy> for ExecutionStrategy {
    fn from(strategy: CompilerStrategy) -> Self {
        Self::Compiler(strategy)
    }
}

impl From<BitcodeStrategy> for ExecutionStrategy {
    fn from(strategy: BitcodeStrategy) -> Self {
        Self::Bitcode(strategy)
    }
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name(), self.config_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_dir_combines_name_and_config() {
        let gcc: ExecutionStrategy = CompilerStrategy::new(CompilerKind::Gcc, "O2", ["-O2"]).into();
        assert_eq!(gcc.bin_dir(), "gcc-O2");
        assert!(!gcc.is_hosted());

        let sulong: ExecutionStrategy = BitcodeStrategy::new().into();
        assert_eq!(sulong.bin_dir(), "sulong-default");
        assert!(sulong.is_hosted());
        assert_eq!(sulong.to_string(), "sulong:default");
    }
}
