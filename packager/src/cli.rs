//! CLI argument definitions for the Contao packager.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::config::{DEFAULT_PHP, DEFAULT_TIMEOUT_SECS, RunConfig};
use crate::error::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use std::time::Duration;

/// Repackage a Composer-managed Contao component as a legacy module.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "contao-packager")]
#[command(version, about)]
#[command(long_about = concat!(
    "Repackage a Composer-managed Contao component as a legacy module.\n\n",
    "The component's composer.json must declare the type contao-module. ",
    "Dependencies that are themselves legacy modules are moved from require ",
    "to replace, Composer installs the rest, and the result is laid out ",
    "below system/modules/<name> in the package directory together with a ",
    "class map, the vendor autoloader and a RELEASE file.\n\n",
    "composer.json and composer.lock in the repository are rewritten in place.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Package the component in the current directory:\n",
    "    $ contao-packager --package-dir build/package\n\n",
    "  Record the source repository in RELEASE:\n",
    "    $ contao-packager -r src/widget -p build/widget \\\n",
    "        --repository https://github.com/acme/widget\n\n",
    "  Preview without changing anything:\n",
    "    $ contao-packager -p build/widget --dry-run",
))]
pub struct Cli {
    /// Checked-out component repository.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub repository_dir: Utf8PathBuf,

    /// Output root receiving the packaged module.
    #[arg(short, long, value_name = "DIR")]
    pub package_dir: Utf8PathBuf,

    /// JSON document shallow-merged over composer.json.
    #[arg(short, long, value_name = "FILE")]
    pub config_file: Option<Utf8PathBuf>,

    /// Source repository identifier recorded in RELEASE.
    #[arg(long, value_name = "URL")]
    pub repository: Option<String>,

    /// Directory holding composer.phar [default: the repository directory].
    #[arg(long, value_name = "DIR")]
    pub composer_dir: Option<Utf8PathBuf>,

    /// Timeout for every external command, in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// PHP interpreter used to run composer.phar.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_PHP)]
    pub php: String,

    /// Show configuration and exit without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress output (errors still shown).
    #[arg(short, long)]
    pub quiet: bool,
}

impl Default for Cli {
    /// Creates a `Cli` packaging the current directory into `package`.
    ///
    /// This is useful for testing or programmatic construction where only
    /// specific fields need to be set.
    ///
    /// # Examples
    ///
    /// ```
    /// use contao_packager::cli::Cli;
    ///
    /// let cli = Cli::default();
    /// assert_eq!(cli.timeout, 300);
    /// assert_eq!(cli.php, "php");
    /// assert!(!cli.dry_run);
    /// ```
    fn default() -> Self {
        Self {
            repository_dir: Utf8PathBuf::from("."),
            package_dir: Utf8PathBuf::from("package"),
            config_file: None,
            repository: None,
            composer_dir: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            php: DEFAULT_PHP.to_owned(),
            dry_run: false,
            quiet: false,
        }
    }
}

impl Cli {
    /// Converts the parsed arguments into a validated run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PackagerError::InvalidConfig`] when the
    /// settings are rejected by [`crate::config::RunConfigBuilder::build`].
    pub fn to_config(&self) -> Result<RunConfig> {
        let mut builder = RunConfig::builder(self.repository_dir.clone(), self.package_dir.clone())
            .timeout(Duration::from_secs(self.timeout))
            .php(self.php.clone())
            .quiet(self.quiet)
            .dry_run(self.dry_run);

        if let Some(file) = &self.config_file {
            builder = builder.config_file(file.clone());
        }
        if let Some(url) = &self.repository {
            builder = builder.repository_url(url.clone());
        }
        if let Some(dir) = &self.composer_dir {
            builder = builder.composer_dir(dir.clone());
        }

        builder.build()
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
