//! LLVM toolchain locator
//!
//! Finds `clang`, `opt` and friends either under a configured LLVM home or
//! on `PATH`, accepting the versioned names distributions install them as.

use crate::error::{SuiteError, SuiteResult};
use std::path::{Path, PathBuf};

/// Version suffixes accepted when searching `PATH`, most preferred first
pub const SUPPORTED_SUFFIXES: &[&str] = &["", "-3.8", "-3.9", "-4.0", "-5.0", "-6.0"];

/// Programs that must be present before any LLVM-based strategy runs
pub const REQUIRED_PROGRAMS: &[&str] = &["clang", "opt"];

/// Program name of the C front end
pub const CLANG: &str = "clang";

/// Program name of the bitcode optimizer
pub const OPT: &str = "opt";

/// Locates LLVM programs on disk
#[derive(Debug, Clone, Default)]
pub struct Toolchain {
    /// Root of an LLVM installation (programs live in `bin/`)
    llvm_home: Option<PathBuf>,
    /// Directories searched after `llvm_home`
    search_path: Vec<PathBuf>,
}

impl Toolchain {
    /// Create a locator searching `llvm_home` first and then `PATH`
    pub fn new(llvm_home: Option<PathBuf>) -> Self {
        let search_path = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();
        Self {
            llvm_home,
            search_path,
        }
    }

    /// Create a locator with an explicit search path
    pub fn with_search_path(llvm_home: Option<PathBuf>, search_path: Vec<PathBuf>) -> Self {
        Self {
            llvm_home,
            search_path,
        }
    }

    /// Candidate locations for `program`, in lookup order
    fn candidates(&self, program: &str) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if let Some(home) = &self.llvm_home {
            out.push(home.join("bin").join(program));
        }
        for suffix in SUPPORTED_SUFFIXES {
            for dir in &self.search_path {
                out.push(dir.join(format!("{}{}", program, suffix)));
            }
        }
        out
    }

    /// Find an LLVM program, returning its full path
    pub fn find_program(&self, program: &str) -> SuiteResult<PathBuf> {
        let candidates = self.candidates(program);
        let searched = candidates.len();
        candidates
            .into_iter()
            .find(|p| is_executable(p))
            .ok_or_else(|| SuiteError::ToolchainNotFound {
                program: program.to_string(),
                searched,
            })
    }

    /// Fail unless every program in [`REQUIRED_PROGRAMS`] can be found
    pub fn ensure_binaries_exist(&self) -> SuiteResult<()> {
        for program in REQUIRED_PROGRAMS {
            let path = self.find_program(program)?;
            tracing::debug!(program, path = %path.display(), "Located LLVM program");
        }
        Ok(())
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_program(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    #[test]
    fn test_llvm_home_wins_over_path() {
        let home = tempfile::tempdir().unwrap();
        let path_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(home.path().join("bin")).unwrap();
        let expected = fake_program(&home.path().join("bin"), "clang");
        fake_program(path_dir.path(), "clang");

        let tc = Toolchain::with_search_path(
            Some(home.path().to_path_buf()),
            vec![path_dir.path().to_path_buf()],
        );
        assert_eq!(tc.find_program("clang").unwrap(), expected);
    }

    #[test]
    fn test_versioned_name_found_on_path() {
        let path_dir = tempfile::tempdir().unwrap();
        let expected = fake_program(path_dir.path(), "opt-3.8");

        let tc = Toolchain::with_search_path(None, vec![path_dir.path().to_path_buf()]);
        assert_eq!(tc.find_program("opt").unwrap(), expected);
    }

    #[test]
    fn test_missing_program_is_toolchain_error() {
        let tc = Toolchain::with_search_path(None, vec![]);
        match tc.find_program("clang") {
            Err(SuiteError::ToolchainNotFound { program, searched }) => {
                assert_eq!(program, "clang");
                assert_eq!(searched, 0);
            }
            other => panic!("expected ToolchainNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_ensure_binaries_exist_requires_opt() {
        let path_dir = tempfile::tempdir().unwrap();
        fake_program(path_dir.path(), "clang");
        let tc = Toolchain::with_search_path(None, vec![path_dir.path().to_path_buf()]);
        assert!(tc.ensure_binaries_exist().is_err());

        fake_program(path_dir.path(), "opt");
        assert!(tc.ensure_binaries_exist().is_ok());
    }
}
