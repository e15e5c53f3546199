//! Suite configuration
//!
//! Layered as: built-in defaults, then environment variables, then an
//! optional TOML file. The CLI applies its own flags on top.

use crate::error::{SuiteError, SuiteResult};
use crate::strategy::host::HostRuntime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Name of the benchmarks checkout, relative to the suite's grandparent
pub const BENCHMARKS_DIR_NAME: &str = "sulong-benchmarks";

static PATH_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<path:([A-Za-z0-9_]+)>").unwrap());

/// Named paths substituted into `<path:NAME>` tokens
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathSubstitutions(BTreeMap<String, PathBuf>);

impl PathSubstitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.0.insert(name.into(), path.into());
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.0.get(name).map(PathBuf::as_path)
    }

    /// Replace every `<path:NAME>` token in `template`
    pub fn substitute(&self, template: &str) -> SuiteResult<String> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for caps in PATH_TOKEN.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let path = self.get(name.as_str()).ok_or_else(|| {
                SuiteError::config(format!("no path registered for <path:{}>", name.as_str()))
            })?;
            out.push_str(&template[last..whole.start()]);
            out.push_str(&path.display().to_string());
            last = whole.end();
        }
        out.push_str(&template[last..]);
        Ok(out)
    }
}

/// Top-level suite configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Directory of the suite checkout; benchmarks live at `../../sulong-benchmarks`
    pub suite_dir: PathBuf,
    /// Explicit benchmarks root (overrides the suite-relative default)
    pub benchmarks_dir: Option<PathBuf>,
    /// Build tool invoked per benchmark
    pub make: String,
    /// Tool extracting bitcode from a wrapped native binary
    pub extract_bc: String,
    /// Compiler wrapper that records bitcode alongside native objects
    pub bitcode_wrapper: String,
    /// Root of an LLVM installation
    pub llvm_home: Option<PathBuf>,
    /// Extra compiler flags (from `CPPFLAGS`)
    pub env_flags: Vec<String>,
    /// Values for `<path:NAME>` tokens
    pub substitutions: PathSubstitutions,
    /// Hosting runtimes available to hosted strategies
    pub hosts: Vec<HostRuntime>,
    /// Forward verbosity to the build
    pub verbose: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            suite_dir: PathBuf::from("."),
            benchmarks_dir: None,
            make: "make".to_string(),
            extract_bc: "extract-bc".to_string(),
            bitcode_wrapper: "wllvm".to_string(),
            llvm_home: None,
            env_flags: Vec::new(),
            substitutions: PathSubstitutions::new(),
            hosts: default_hosts(None, Vec::new()),
            verbose: false,
        }
    }
}

/// Built-in hosting runtimes
pub fn default_hosts(graalvm_home: Option<&Path>, classpath: Vec<PathBuf>) -> Vec<HostRuntime> {
    let bin_dir = graalvm_home.map(|home| home.join("bin"));
    vec![
        HostRuntime::classpath("server", "default", "java", classpath),
        HostRuntime::launcher("graalvm", "jvm", bin_dir.clone()).with_priority(1),
        HostRuntime::launcher("graalvm", "native", bin_dir),
    ]
}

/// Split a flags string the way `CPPFLAGS` is consumed: on single spaces
pub fn split_flags(value: &str) -> Vec<String> {
    value
        .split(' ')
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

impl SuiteConfig {
    /// Defaults overlaid with the process environment and, if given, a TOML file
    pub fn load(file: Option<&Path>) -> SuiteResult<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        if let Some(path) = file {
            let text = std::fs::read_to_string(path)?;
            config.apply_file(&text)?;
            tracing::debug!(path = %path.display(), "Loaded configuration file");
        }
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("CSUITE_SUITE_DIR") {
            self.suite_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("CSUITE_BENCHMARKS_DIR") {
            self.benchmarks_dir = Some(PathBuf::from(dir));
        }
        if let Some(home) = lookup("CSUITE_LLVM_HOME") {
            self.llvm_home = Some(PathBuf::from(home));
        }
        if let Some(flags) = lookup("CPPFLAGS") {
            self.env_flags = split_flags(&flags);
        }
        if let Some(libs) = lookup("SULONG_LIBS") {
            self.substitutions.insert("SULONG_LIBS", libs);
        }

        let graalvm_home = lookup("GRAALVM_HOME").map(PathBuf::from);
        let classpath: Vec<PathBuf> = lookup("SULONG_CLASSPATH")
            .map(|cp| std::env::split_paths(&cp).collect())
            .unwrap_or_default();
        if graalvm_home.is_some() || !classpath.is_empty() {
            self.hosts = default_hosts(graalvm_home.as_deref(), classpath);
        }
    }

    /// Overlay values present in a TOML document
    pub fn apply_file(&mut self, text: &str) -> SuiteResult<()> {
        let overlay: ConfigOverlay = toml::from_str(text)?;
        if let Some(v) = overlay.suite_dir {
            self.suite_dir = v;
        }
        if overlay.benchmarks_dir.is_some() {
            self.benchmarks_dir = overlay.benchmarks_dir;
        }
        if let Some(v) = overlay.make {
            self.make = v;
        }
        if let Some(v) = overlay.extract_bc {
            self.extract_bc = v;
        }
        if let Some(v) = overlay.bitcode_wrapper {
            self.bitcode_wrapper = v;
        }
        if overlay.llvm_home.is_some() {
            self.llvm_home = overlay.llvm_home;
        }
        if let Some(v) = overlay.env_flags {
            self.env_flags = v;
        }
        if let Some(subs) = overlay.substitutions {
            for (name, path) in subs.0 {
                self.substitutions.insert(name, path);
            }
        }
        if let Some(hosts) = overlay.hosts {
            self.hosts = hosts;
        }
        if let Some(v) = overlay.verbose {
            self.verbose = v;
        }
        Ok(())
    }

    /// Absolute benchmarks root directory
    pub fn benchmarks_root(&self) -> SuiteResult<PathBuf> {
        let root = match &self.benchmarks_dir {
            Some(dir) => dir.clone(),
            None => self
                .suite_dir
                .join("..")
                .join("..")
                .join(BENCHMARKS_DIR_NAME),
        };
        absolutize(&root)
    }
}

/// Partial configuration as read from a TOML file
#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    suite_dir: Option<PathBuf>,
    benchmarks_dir: Option<PathBuf>,
    make: Option<String>,
    extract_bc: Option<String>,
    bitcode_wrapper: Option<String>,
    llvm_home: Option<PathBuf>,
    env_flags: Option<Vec<String>>,
    substitutions: Option<PathSubstitutions>,
    hosts: Option<Vec<HostRuntime>>,
    verbose: Option<bool>,
}

/// Make `path` absolute against the current directory without touching disk
pub fn absolutize(path: &Path) -> SuiteResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
