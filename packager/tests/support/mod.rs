//! Test support utilities for packager behavioural tests.
//!
//! Provides a temporary sandbox holding a component repository and a package
//! output directory, plus helpers for writing repository files.

use camino::Utf8PathBuf;
use tempfile::TempDir;

/// A temporary repository and package directory pair.
pub struct Sandbox {
    // Keep the temporary directory alive for the lifetime of the sandbox.
    _temp: TempDir,
    /// Component repository root.
    pub repository: Utf8PathBuf,
    /// Package output root; not created up front.
    pub package: Utf8PathBuf,
}

impl Sandbox {
    /// Creates a sandbox with an empty repository directory.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root =
            Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("temp dir path not UTF-8");
        let repository = root.join("repo");
        std::fs::create_dir_all(&repository).expect("failed to create repository dir");
        Self {
            _temp: temp,
            repository,
            package: root.join("package"),
        }
    }

    /// Writes `content` to `relative` inside the repository.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.repository.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(&path, content).expect("failed to write repository file");
    }

    /// Reads `relative` from the repository.
    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.repository.join(relative))
            .expect("failed to read repository file")
    }
}
