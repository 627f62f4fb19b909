//! Run configuration.
//!
//! A [`RunConfig`] is the flat, immutable input of one packaging run. It can
//! only be obtained through [`RunConfigBuilder::build`], which rejects
//! settings the pipeline could not work with.

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;

/// Default timeout for every external command, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default PHP interpreter.
pub const DEFAULT_PHP: &str = "php";

/// Validated settings of one packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    repository_dir: Utf8PathBuf,
    package_dir: Utf8PathBuf,
    config_file: Option<Utf8PathBuf>,
    repository_url: Option<String>,
    composer_dir: Utf8PathBuf,
    timeout: Duration,
    php: String,
    quiet: bool,
    dry_run: bool,
}

impl RunConfig {
    /// Starts a builder for a run over `repository_dir` writing into
    /// `package_dir`.
    #[must_use]
    pub fn builder(
        repository_dir: impl Into<Utf8PathBuf>,
        package_dir: impl Into<Utf8PathBuf>,
    ) -> RunConfigBuilder {
        RunConfigBuilder::new(repository_dir, package_dir)
    }

    /// Checked-out component repository.
    #[must_use]
    pub fn repository_dir(&self) -> &Utf8Path {
        &self.repository_dir
    }

    /// Package output root.
    #[must_use]
    pub fn package_dir(&self) -> &Utf8Path {
        &self.package_dir
    }

    /// Optional manifest override file.
    #[must_use]
    pub fn config_file(&self) -> Option<&Utf8Path> {
        self.config_file.as_deref()
    }

    /// Source repository identifier recorded in `RELEASE`.
    #[must_use]
    pub fn repository_url(&self) -> Option<&str> {
        self.repository_url.as_deref()
    }

    /// Directory holding `composer.phar`.
    #[must_use]
    pub fn composer_dir(&self) -> &Utf8Path {
        &self.composer_dir
    }

    /// Timeout applied to every external command.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// PHP interpreter used to run Composer.
    #[must_use]
    pub fn php(&self) -> &str {
        &self.php
    }

    /// Whether progress output is suppressed.
    #[must_use]
    pub const fn quiet(&self) -> bool {
        self.quiet
    }

    /// Whether the run only reports what it would do.
    #[must_use]
    pub const fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Builder for [`RunConfig`].
///
/// # Examples
///
/// ```no_run
/// use contao_packager::config::RunConfig;
/// use std::time::Duration;
///
/// let config = RunConfig::builder("/src/widget", "/build/widget")
///     .composer_dir("/opt/composer")
///     .timeout(Duration::from_secs(120))
///     .build()?;
/// assert_eq!(config.php(), "php");
/// # Ok::<(), contao_packager::error::PackagerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    repository_dir: Utf8PathBuf,
    package_dir: Utf8PathBuf,
    config_file: Option<Utf8PathBuf>,
    repository_url: Option<String>,
    composer_dir: Option<Utf8PathBuf>,
    timeout: Duration,
    php: String,
    quiet: bool,
    dry_run: bool,
}

impl RunConfigBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new(repository_dir: impl Into<Utf8PathBuf>, package_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            repository_dir: repository_dir.into(),
            package_dir: package_dir.into(),
            config_file: None,
            repository_url: None,
            composer_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            php: DEFAULT_PHP.to_owned(),
            quiet: false,
            dry_run: false,
        }
    }

    /// Sets the manifest override file.
    #[must_use]
    pub fn config_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Sets the source repository identifier.
    #[must_use]
    pub fn repository_url(mut self, url: impl Into<String>) -> Self {
        self.repository_url = Some(url.into());
        self
    }

    /// Sets the directory holding `composer.phar`; defaults to the
    /// repository directory.
    #[must_use]
    pub fn composer_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.composer_dir = Some(dir.into());
        self
    }

    /// Sets the external command timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the PHP interpreter.
    #[must_use]
    pub fn php(mut self, php: impl Into<String>) -> Self {
        self.php = php.into();
        self
    }

    /// Suppresses progress output.
    #[must_use]
    pub const fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Enables dry-run mode.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Validates the settings and produces the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfig`] when the repository or
    /// composer directory does not exist, the override file is missing, the
    /// timeout is zero or the PHP interpreter is empty.
    pub fn build(self) -> Result<RunConfig> {
        require_dir("repository directory", &self.repository_dir)?;
        let composer_dir = self
            .composer_dir
            .unwrap_or_else(|| self.repository_dir.clone());
        require_dir("composer directory", &composer_dir)?;

        if let Some(file) = &self.config_file
            && !file.is_file()
        {
            return Err(invalid(format!("config file {file} does not exist")));
        }
        if self.timeout.is_zero() {
            return Err(invalid("timeout must be greater than zero".to_owned()));
        }
        if self.php.trim().is_empty() {
            return Err(invalid("php interpreter must not be empty".to_owned()));
        }

        Ok(RunConfig {
            repository_dir: self.repository_dir,
            package_dir: self.package_dir,
            config_file: self.config_file,
            repository_url: self.repository_url,
            composer_dir,
            timeout: self.timeout,
            php: self.php,
            quiet: self.quiet,
            dry_run: self.dry_run,
        })
    }
}

fn require_dir(label: &str, path: &Utf8Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(invalid(format!("{label} {path} does not exist")))
    }
}

fn invalid(reason: String) -> PackagerError {
    PackagerError::InvalidConfig { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Dirs {
        _temp: TempDir,
        root: Utf8PathBuf,
    }

    #[fixture]
    fn dirs() -> Dirs {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("temp dir path not UTF-8");
        Dirs { _temp: temp, root }
    }

    #[rstest]
    fn defaults_apply(dirs: Dirs) {
        let config = RunConfig::builder(dirs.root.clone(), dirs.root.join("package"))
            .build()
            .expect("valid config");

        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.php(), DEFAULT_PHP);
        assert_eq!(config.composer_dir(), dirs.root);
        assert_eq!(config.config_file(), None);
        assert_eq!(config.repository_url(), None);
        assert!(!config.quiet());
        assert!(!config.dry_run());
    }

    #[rstest]
    fn explicit_settings_are_kept(dirs: Dirs) {
        let override_file = dirs.root.join("override.json");
        std::fs::write(&override_file, "{}").expect("failed to write override");

        let config = RunConfig::builder(dirs.root.clone(), dirs.root.join("package"))
            .config_file(override_file.clone())
            .repository_url("https://github.com/acme/widget")
            .timeout(Duration::from_secs(5))
            .php("php5")
            .quiet(true)
            .dry_run(true)
            .build()
            .expect("valid config");

        assert_eq!(config.config_file(), Some(override_file.as_path()));
        assert_eq!(config.repository_url(), Some("https://github.com/acme/widget"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.php(), "php5");
        assert!(config.quiet());
        assert!(config.dry_run());
    }

    #[rstest]
    #[case::missing_repository("missing", None, 300, "repository directory")]
    #[case::missing_composer(".", Some("missing"), 300, "composer directory")]
    #[case::zero_timeout(".", None, 0, "timeout")]
    fn invalid_settings_are_rejected(
        dirs: Dirs,
        #[case] repository: &str,
        #[case] composer: Option<&str>,
        #[case] timeout: u64,
        #[case] expected: &str,
    ) {
        let mut builder = RunConfig::builder(dirs.root.join(repository), dirs.root.join("package"))
            .timeout(Duration::from_secs(timeout));
        if let Some(composer) = composer {
            builder = builder.composer_dir(dirs.root.join(composer));
        }

        let err = builder.build().expect_err("expected rejection");
        assert!(err.is_validation());
        assert!(err.to_string().contains(expected), "unexpected message: {err}");
    }

    #[rstest]
    fn missing_override_file_is_rejected(dirs: Dirs) {
        let err = RunConfig::builder(dirs.root.clone(), dirs.root.join("package"))
            .config_file(dirs.root.join("absent.json"))
            .build()
            .expect_err("expected rejection");
        assert!(matches!(err, PackagerError::InvalidConfig { .. }));
    }
}
