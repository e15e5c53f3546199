//! Pass/fail classification of a benchmark execution
//!
//! A run fails if any stdout line looks like an error or exception, if the
//! process exited non-zero, or if no line looks like a `name: number`
//! result. Failure patterns are checked first so that a crash that still
//! exits zero is caught.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static FAILURE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"error:").unwrap(),
        Regex::new(r"Exception").unwrap(),
    ]
});

static SUCCESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(### )?([a-zA-Z0-9\.\-_]+): +([0-9]+(?:\.[0-9]+)?)").unwrap()
});

/// Why a run was classified as failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// A stdout line matched an error/exception pattern
    FailurePattern { line: String },
    /// The process exited with a non-zero code or was killed
    NonZeroExit { exit_code: Option<i32> },
    /// No line looked like a benchmark result
    NoSuccessPattern,
    /// The run could not be started or its command line could not be built
    Error { message: String },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailurePattern { line } => write!(f, "failure pattern matched: {}", line),
            Self::NonZeroExit {
                exit_code: Some(code),
            } => write!(f, "exit code {}", code),
            Self::NonZeroExit { exit_code: None } => write!(f, "terminated by signal"),
            Self::NoSuccessPattern => write!(f, "no success pattern found in output"),
            Self::Error { message } => write!(f, "{}", message),
        }
    }
}

/// Result of classifying one execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Failed { reason: FailureReason },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn failed(reason: FailureReason) -> Self {
        Self::Failed { reason }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "PASS"),
            Self::Failed { reason } => write!(f, "FAIL ({})", reason),
        }
    }
}

/// First stdout line matching a failure pattern
pub fn find_failure(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .find(|line| FAILURE_PATTERNS.iter().any(|p| p.is_match(line)))
}

/// Whether stdout contains at least one `name: number` line
pub fn has_success_signal(stdout: &str) -> bool {
    SUCCESS_PATTERN.is_match(stdout)
}

/// Classify an execution from its exit code and stdout
pub fn classify(exit_code: Option<i32>, stdout: &str) -> RunOutcome {
    if let Some(line) = find_failure(stdout) {
        return RunOutcome::failed(FailureReason::FailurePattern {
            line: line.to_string(),
        });
    }
    if exit_code != Some(0) {
        return RunOutcome::failed(FailureReason::NonZeroExit { exit_code });
    }
    if !has_success_signal(stdout) {
        return RunOutcome::failed(FailureReason::NoSuccessPattern);
    }
    RunOutcome::Success
}
