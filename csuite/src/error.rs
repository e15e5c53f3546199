//! Suite error types
//!
//! Every failure the driver can hit while discovering, building or running
//! benchmarks. Each error carries a recovery hint for the person at the
//! terminal.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for suite operations
pub type SuiteResult<T> = Result<T, SuiteError>;

/// Guidance printed whenever a call needs exactly one benchmark
pub const SELECTION_GUIDANCE: &str =
    "Please run a specific benchmark (csuite:<benchmark-name>) or all the benchmarks (csuite:*)";

/// Error type for all suite operations
#[derive(Debug, Error)]
pub enum SuiteError {
    /// The benchmarks root directory does not exist
    #[error("Benchmarks directory {path} is missing")]
    BenchmarksDirMissing { path: PathBuf },

    /// Zero or several benchmarks were given where exactly one is required
    #[error("{count} benchmarks selected where exactly one is required. Please run a specific benchmark (csuite:<benchmark-name>) or all the benchmarks (csuite:*)")]
    AmbiguousSelection { count: usize },

    /// A benchmark selector did not follow `csuite:<name>` / `csuite:*`
    #[error("Invalid benchmark selector '{selector}'. Please run a specific benchmark (csuite:<benchmark-name>) or all the benchmarks (csuite:*)")]
    InvalidSelector { selector: String },

    /// The named benchmark does not exist under the benchmarks root
    #[error("Unknown benchmark '{name}'")]
    UnknownBenchmark { name: String },

    /// A toolchain program could not be located
    #[error("Toolchain program '{program}' not found (searched {searched} locations)")]
    ToolchainNotFound { program: String, searched: usize },

    /// An external command could not be started
    #[error("Failed to run '{program}': {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external command exited unsuccessfully
    #[error("Command '{program}' failed with exit code {}", .exit_code.map_or_else(|| "<signal>".to_string(), |c| c.to_string()))]
    CommandFailed {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// No build artifact was recorded for a benchmark
    #[error("No build artifact recorded for benchmark '{benchmark}'")]
    MissingArtifact { benchmark: String },

    /// No strategy is registered under this name/configuration
    #[error("Unknown execution strategy {name}:{config}")]
    UnknownStrategy { name: String, config: String },

    /// A strategy with the same identity is already registered
    #[error("Execution strategy {name}:{config} is already registered")]
    DuplicateStrategy { name: String, config: String },

    /// No hosting runtime is registered under this name/configuration
    #[error("Unknown hosting runtime {name}:{config}")]
    UnknownHost { name: String, config: String },

    /// The strategy runs hosted but no hosting runtime was selected
    #[error("Execution strategy '{strategy}' requires a hosting runtime")]
    HostRequired { strategy: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SuiteError {
    /// Create a benchmarks-dir-missing error
    pub fn benchmarks_dir_missing(path: impl Into<PathBuf>) -> Self {
        Self::BenchmarksDirMissing { path: path.into() }
    }

    /// Create an invalid selector error
    pub fn invalid_selector(selector: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an unknown strategy error
    pub fn unknown_strategy(name: impl Into<String>, config: impl Into<String>) -> Self {
        Self::UnknownStrategy {
            name: name.into(),
            config: config.into(),
        }
    }

    /// Create an unknown host error
    pub fn unknown_host(name: impl Into<String>, config: impl Into<String>) -> Self {
        Self::UnknownHost {
            name: name.into(),
            config: config.into(),
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::BenchmarksDirMissing { .. } => "BENCHMARKS_DIR_MISSING",
            Self::AmbiguousSelection { .. } => "AMBIGUOUS_SELECTION",
            Self::InvalidSelector { .. } => "INVALID_SELECTOR",
            Self::UnknownBenchmark { .. } => "UNKNOWN_BENCHMARK",
            Self::ToolchainNotFound { .. } => "TOOLCHAIN_NOT_FOUND",
            Self::CommandSpawn { .. } => "COMMAND_SPAWN",
            Self::CommandFailed { .. } => "COMMAND_FAILED",
            Self::MissingArtifact { .. } => "MISSING_ARTIFACT",
            Self::UnknownStrategy { .. } => "UNKNOWN_STRATEGY",
            Self::DuplicateStrategy { .. } => "DUPLICATE_STRATEGY",
            Self::UnknownHost { .. } => "UNKNOWN_HOST",
            Self::HostRequired { .. } => "HOST_REQUIRED",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Toml(_) => "TOML_ERROR",
        }
    }

    /// Actionable next step for the user
    pub fn recovery_hint(&self) -> String {
        match self {
            Self::BenchmarksDirMissing { path } => format!(
                "Check out the benchmark sources at {} or set CSUITE_BENCHMARKS_DIR",
                path.display()
            ),
            Self::AmbiguousSelection { .. } | Self::InvalidSelector { .. } => {
                SELECTION_GUIDANCE.to_string()
            }
            Self::UnknownBenchmark { .. } => {
                "Run `csuite-runner list` to see the available benchmarks".to_string()
            }
            Self::ToolchainNotFound { program, .. } => format!(
                "Install '{}' or point CSUITE_LLVM_HOME at an LLVM installation",
                program
            ),
            Self::CommandSpawn { program, .. } => {
                format!("Make sure '{}' is installed and on PATH", program)
            }
            Self::CommandFailed { .. } => {
                "Re-run with --verbose to see the captured output".to_string()
            }
            Self::MissingArtifact { .. } => {
                "Build the benchmark before asking for its command line".to_string()
            }
            Self::UnknownStrategy { .. } | Self::DuplicateStrategy { .. } => {
                "Run `csuite-runner vms` to list registered execution strategies".to_string()
            }
            Self::UnknownHost { .. } | Self::HostRequired { .. } => {
                "Select a hosting runtime with --host-vm / --host-vm-config".to_string()
            }
            Self::Config { .. } | Self::Toml(_) => {
                "Fix the configuration file or environment and retry".to_string()
            }
            Self::Io(_) | Self::Json(_) => "Check file permissions and disk space".to_string(),
        }
    }

    /// Whether the caller should stop the whole run rather than record a
    /// failed benchmark
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::CommandFailed { .. } | Self::CommandSpawn { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_selection_carries_guidance() {
        let err = SuiteError::AmbiguousSelection { count: 2 };
        let msg = err.to_string();
        assert!(msg.contains("csuite:<benchmark-name>"));
        assert!(msg.contains("csuite:*"));
        assert_eq!(err.code(), "AMBIGUOUS_SELECTION");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_command_failed_is_not_fatal() {
        let err = SuiteError::CommandFailed {
            program: "bench".to_string(),
            exit_code: Some(3),
            stderr: String::new(),
        };
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("exit code 3"));
    }

    #[test]
    fn test_missing_dir_hint_mentions_path() {
        let err = SuiteError::benchmarks_dir_missing("/nowhere/sulong-benchmarks");
        assert!(err.recovery_hint().contains("/nowhere/sulong-benchmarks"));
    }
}
