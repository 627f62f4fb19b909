//! Error types for the Contao packager.
//!
//! Every failure aborts the packaging run. The variants fall into three
//! families: validation failures (the manifest or the run configuration is
//! not acceptable), I/O failures (unreadable documents, failed copies) and
//! external process failures (non-zero exit or timeout of `composer` or
//! `git`). None of them is retried.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while packaging a module.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// The manifest does not describe a Contao module.
    #[error("project {name} does not seem to be a contao module (type: {found})")]
    NotAModule {
        /// Package name declared by the manifest.
        name: String,
        /// The `type` value found in the manifest, or `<missing>`.
        found: String,
    },

    /// The package name has no usable last segment to name the module after.
    #[error("package name '{name}' does not name a module directory")]
    InvalidPackageName {
        /// Package name declared by the manifest.
        name: String,
    },

    /// A symlink or source target would be written outside the package.
    #[error("target {target} of {source_path} leaves the package directory")]
    UnsafeTarget {
        /// Repository path being mapped.
        source_path: String,
        /// The rejected target path.
        target: String,
    },

    /// The run configuration was rejected at construction.
    #[error("invalid run configuration: {reason}")]
    InvalidConfig {
        /// Description of the rejected setting.
        reason: String,
    },

    /// A JSON document (manifest, lock file or override) could not be parsed.
    #[error("invalid manifest document at {path}: {reason}")]
    InvalidManifest {
        /// Path to the malformed document.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// Copying a file or directory into the package failed.
    #[error("failed to copy {source_path} to {target_path}: {reason}")]
    CopyFailed {
        /// Path being copied from.
        source_path: Utf8PathBuf,
        /// Path being copied to.
        target_path: Utf8PathBuf,
        /// Description of the underlying I/O error.
        reason: String,
    },

    /// Writing a generated file failed.
    #[error("failed to write {path}")]
    WriteFailed {
        /// Path of the file that could not be written.
        path: Utf8PathBuf,
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An external command exited non-zero, could not be spawned, or timed out.
    #[error("{command} failed: {message}")]
    ExternalProcess {
        /// The command line that failed.
        command: String,
        /// Captured error output or failure description.
        message: String,
    },

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl PackagerError {
    /// Returns true for the validation family of errors.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NotAModule { .. }
                | Self::InvalidPackageName { .. }
                | Self::UnsafeTarget { .. }
                | Self::InvalidConfig { .. }
        )
    }

    /// Returns true when an external command caused the failure.
    #[must_use]
    pub fn is_external_process(&self) -> bool {
        matches!(self, Self::ExternalProcess { .. })
    }
}

/// Result type alias using [`PackagerError`].
pub type Result<T> = std::result::Result<T, PackagerError>;
