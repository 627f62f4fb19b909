//! Status output for the packager.
//!
//! Progress lines go to an injected writer (stderr in the binary) so that
//! tests can capture them. Failed writes are ignored.

use crate::module_path::{ResolutionSource, ResolvedModule};
use camino::Utf8Path;
use std::io::Write;
use std::time::Duration;

/// Writes one status line, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Status sink that drops everything in quiet mode.
pub struct StatusWriter<'a> {
    stderr: &'a mut dyn Write,
    discard: std::io::Sink,
    quiet: bool,
}

impl<'a> StatusWriter<'a> {
    /// Wraps `stderr`; nothing is written when `quiet` is set.
    #[must_use]
    pub fn new(stderr: &'a mut dyn Write, quiet: bool) -> Self {
        Self {
            stderr,
            discard: std::io::sink(),
            quiet,
        }
    }

    /// Writes one line unless quiet.
    pub fn line(&mut self, message: impl std::fmt::Display) {
        if !self.quiet {
            write_stderr_line(self.stderr, message);
        }
    }

    /// Writes one line even in quiet mode.
    pub fn notice(&mut self, message: impl std::fmt::Display) {
        write_stderr_line(self.stderr, message);
    }

    /// Returns the raw sink, for streaming external command output.
    ///
    /// In quiet mode the returned sink discards everything.
    pub fn stream(&mut self) -> &mut dyn Write {
        if self.quiet {
            &mut self.discard
        } else {
            &mut *self.stderr
        }
    }
}

/// Format the closing message of a successful run.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use contao_packager::output::success_message;
///
/// let msg = success_message("system/modules/widget", Utf8Path::new("/build/widget"));
/// assert_eq!(msg, "Packaged system/modules/widget into /build/widget");
/// ```
#[must_use]
pub fn success_message(module: &str, package_dir: &Utf8Path) -> String {
    format!("Packaged {module} into {package_dir}")
}

/// Configuration information for dry-run output.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use contao_packager::manifest::ContaoHints;
/// use contao_packager::module_path::resolve_module_path;
/// use contao_packager::output::DryRunInfo;
/// use std::time::Duration;
///
/// let module = resolve_module_path("acme/widget", &ContaoHints::default())?;
/// let info = DryRunInfo {
///     package_name: "acme/widget",
///     repository_dir: Utf8Path::new("/src/widget"),
///     package_dir: Utf8Path::new("/build/widget"),
///     composer_dir: Utf8Path::new("/opt/composer"),
///     config_file: None,
///     timeout: Duration::from_secs(300),
///     module: &module,
///     dependencies: &["acme/legacy".to_owned()],
/// };
///
/// let output = info.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("system/modules/widget (derived from package name)"));
/// # Ok::<(), contao_packager::error::PackagerError>(())
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Declared package name.
    pub package_name: &'a str,
    /// Component repository.
    pub repository_dir: &'a Utf8Path,
    /// Package output root.
    pub package_dir: &'a Utf8Path,
    /// Directory holding `composer.phar`.
    pub composer_dir: &'a Utf8Path,
    /// Manifest override file, if any.
    pub config_file: Option<&'a Utf8Path>,
    /// External command timeout.
    pub timeout: Duration,
    /// Resolved module path and copy mappings.
    pub module: &'a ResolvedModule,
    /// Declared `require` entries, still unclassified.
    pub dependencies: &'a [String],
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let origin = match self.module.source {
            ResolutionSource::DeclaredTarget => "declared target",
            ResolutionSource::PackageName => "derived from package name",
        };
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Package: {}", self.package_name),
            format!("Repository directory: {}", self.repository_dir),
            format!("Package directory: {}", self.package_dir),
            format!("Composer directory: {}", self.composer_dir),
            format!("Timeout: {}s", self.timeout.as_secs()),
            format!("Module path: {} ({origin})", self.module.path),
        ];

        if let Some(config_file) = self.config_file {
            lines.push(format!("Config file: {config_file}"));
        }

        lines.push(String::new());
        lines.push("Copy mappings:".to_owned());
        for (source, target) in &self.module.mappings {
            lines.push(format!("  - {source} -> {target}"));
        }

        lines.push(String::new());
        lines.push("Dependencies to classify:".to_owned());
        for dependency in self.dependencies {
            lines.push(format!("  - {dependency}"));
        }

        lines.join("\n")
    }
}
