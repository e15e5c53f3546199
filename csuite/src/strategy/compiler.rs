//! Native compiler strategies (gcc, clang)

use super::{StrategyContext, LINK_FLAGS};
use crate::error::SuiteResult;
use crate::process::{CommandOutput, CommandSpec, EnvMap};
use crate::toolchain::{Toolchain, CLANG};
use std::path::Path;

/// Which C compiler builds the benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilerKind {
    Gcc,
    Clang,
}

impl CompilerKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gcc => "gcc",
            Self::Clang => CLANG,
        }
    }

    /// Executable to put in `CC`.
    ///
    /// clang comes from the LLVM toolchain, which must be complete on disk.
    pub fn c_compiler_exe(&self, toolchain: &Toolchain) -> SuiteResult<String> {
        match self {
            Self::Gcc => Ok("gcc".to_string()),
            Self::Clang => {
                toolchain.ensure_binaries_exist()?;
                let path = toolchain.find_program(CLANG)?;
                Ok(path.display().to_string())
            }
        }
    }
}

impl std::fmt::Display for CompilerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Builds a native binary with a fixed set of optimization flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerStrategy {
    kind: CompilerKind,
    config_name: String,
    options: Vec<String>,
}

impl CompilerStrategy {
    pub fn new<I, S>(kind: CompilerKind, config_name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            config_name: config_name.into(),
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind(&self) -> CompilerKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        self.kind.name()
    }

    pub fn config_name(&self) -> &str {
        &self.config_name
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// `CFLAGS` = options + `CPPFLAGS` + link flags, `CC` = compiler
    pub fn prepare_env(&self, mut env: EnvMap, ctx: &StrategyContext<'_>) -> SuiteResult<EnvMap> {
        let cflags: Vec<&str> = self
            .options
            .iter()
            .chain(ctx.config.env_flags.iter())
            .map(String::as_str)
            .chain(LINK_FLAGS.iter().copied())
            .collect();
        env.insert("CFLAGS".to_string(), cflags.join(" "));
        env.insert("CC".to_string(), self.kind.c_compiler_exe(ctx.toolchain)?);
        Ok(env)
    }

    /// Run the native binary; `args[0]` is the executable
    pub fn execute(
        &self,
        cwd: &Path,
        args: &[String],
        ctx: &StrategyContext<'_>,
    ) -> SuiteResult<CommandOutput> {
        let command = CommandSpec::from_argv(args)?.current_dir(cwd);
        ctx.runner.run(&command)
    }
}
