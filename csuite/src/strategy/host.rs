//! Hosting runtimes
//!
//! A hosting runtime is the outer process a guest program runs inside. It
//! either exposes a per-language launcher binary (`<bin_dir>/lli`) or has to
//! be driven through a raw classpath invocation of `java`.

use crate::process::CommandSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration label of a host running in native-image mode
pub const NATIVE_MODE: &str = "native";

/// How a hosting runtime is started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "launch", rename_all = "snake_case")]
pub enum HostLaunch {
    /// The runtime ships one launcher binary per guest language
    Launcher {
        /// Directory containing the launchers (None = resolve on PATH)
        #[serde(default)]
        bin_dir: Option<PathBuf>,
    },
    /// A plain JVM; the caller assembles the classpath and main class
    Classpath {
        /// The `java` executable
        #[serde(default = "default_java")]
        java: String,
        /// Classpath entries
        #[serde(default)]
        classpath: Vec<PathBuf>,
        /// Extra VM arguments placed before the classpath
        #[serde(default)]
        vm_args: Vec<String>,
    },
}

fn default_java() -> String {
    "java".to_string()
}

/// A registered hosting runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRuntime {
    /// Runtime name (e.g. "server", "graalvm")
    pub name: String,
    /// Configuration label (e.g. "default", "jvm", "native")
    pub config: String,
    /// Launch mechanism
    #[serde(flatten)]
    pub launch: HostLaunch,
    /// Selection priority when no host is named
    #[serde(default)]
    pub priority: i32,
}

impl HostRuntime {
    pub fn launcher(
        name: impl Into<String>,
        config: impl Into<String>,
        bin_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            config: config.into(),
            launch: HostLaunch::Launcher { bin_dir },
            priority: 0,
        }
    }

    pub fn classpath(
        name: impl Into<String>,
        config: impl Into<String>,
        java: impl Into<String>,
        classpath: Vec<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            config: config.into(),
            launch: HostLaunch::Classpath {
                java: java.into(),
                classpath,
                vm_args: Vec::new(),
            },
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// `name-config` label used in logs and result dimensions
    pub fn label(&self) -> String {
        format!("{}-{}", self.name, self.config)
    }

    /// Whether this host runs in native-image mode
    pub fn is_native_mode(&self) -> bool {
        self.config == NATIVE_MODE
    }

    /// Command running `args` under the launcher for `lang`.
    ///
    /// Returns `None` when the runtime has no per-language launchers.
    pub fn lang_command(&self, lang: &str, args: &[String], cwd: &Path) -> Option<CommandSpec> {
        match &self.launch {
            HostLaunch::Launcher { bin_dir } => {
                let program = match bin_dir {
                    Some(dir) => dir.join(lang).display().to_string(),
                    None => lang.to_string(),
                };
                Some(
                    CommandSpec::new(program)
                        .args(args.iter().cloned())
                        .current_dir(cwd),
                )
            }
            HostLaunch::Classpath { .. } => None,
        }
    }

    /// `-cp <entries>` for classpath-launched runtimes, empty otherwise
    pub fn classpath_options(&self) -> Vec<String> {
        match &self.launch {
            HostLaunch::Classpath { classpath, .. } if !classpath.is_empty() => {
                let joined = std::env::join_paths(classpath)
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_else(|_| {
                        classpath
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>()
                            .join(":")
                    });
                vec!["-cp".to_string(), joined]
            }
            _ => Vec::new(),
        }
    }

    /// Command running `java` with `args` for classpath-launched runtimes.
    ///
    /// Returns `None` for runtimes with per-language launchers.
    pub fn classpath_command(&self, args: &[String], cwd: &Path) -> Option<CommandSpec> {
        match &self.launch {
            HostLaunch::Classpath { java, vm_args, .. } => Some(
                CommandSpec::new(java.clone())
                    .args(vm_args.iter().cloned())
                    .args(args.iter().cloned())
                    .current_dir(cwd),
            ),
            HostLaunch::Launcher { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launcher_builds_lang_command() {
        let host =
            HostRuntime::launcher("graalvm", "jvm", Some(PathBuf::from("/opt/graalvm/bin")));
        let cmd = host
            .lang_command("lli", &["bench.bc".to_string()], Path::new("/work"))
            .unwrap();
        assert_eq!(cmd.program, "/opt/graalvm/bin/lli");
        assert_eq!(cmd.args, vec!["bench.bc"]);
        assert_eq!(cmd.cwd.as_deref(), Some(Path::new("/work")));
    }

    #[test]
    fn test_classpath_host_has_no_lang_launcher() {
        let host =
            HostRuntime::classpath("server", "default", "java", vec![PathBuf::from("a.jar")]);
        assert!(host.lang_command("lli", &[], Path::new("/work")).is_none());
        assert_eq!(host.classpath_options(), vec!["-cp", "a.jar"]);

        let cmd = host
            .classpath_command(&["Main".to_string()], Path::new("/work"))
            .unwrap();
        assert_eq!(cmd.program, "java");
        assert_eq!(cmd.args, vec!["Main"]);
    }

    #[test]
    fn test_launcher_host_has_no_classpath_command() {
        let host =
            HostRuntime::launcher("graalvm", "native", Some(PathBuf::from("/opt/graalvm/bin")));
        assert!(host.classpath_command(&[], Path::new("/work")).is_none());
        assert!(host.classpath_options().is_empty());
    }

    #[test]
    fn test_native_mode_detection() {
        assert!(HostRuntime::launcher("graalvm", "native", None).is_native_mode());
        assert!(!HostRuntime::launcher("graalvm", "jvm", None).is_native_mode());
    }

    #[test]
    fn test_host_deserializes_from_toml() {
        let host: HostRuntime = toml::from_str(
            r#"
            name = "server"
            config = "default"
            launch = "classpath"
            classpath = ["/lib/sulong.jar"]
            "#,
        )
        .unwrap();
        assert_eq!(host.label(), "server-default");
        match host.launch {
            HostLaunch::Classpath { java, classpath, .. } => {
                assert_eq!(java, "java");
                assert_eq!(classpath, vec![PathBuf::from("/lib/sulong.jar")]);
            }
            other => panic!("unexpected launch {:?}", other),
        }
    }
}
