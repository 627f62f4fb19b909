//! Composer invocations.
//!
//! The packager never resolves dependencies itself. It asks Composer for a
//! package's type (`show`) and lets Composer populate `vendor/` (`install
//! --no-dev`), both through the injected [`CommandExecutor`].

use crate::error::Result;
use crate::process::{CommandExecutor, ensure_success};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Write;

/// File name of the Composer executable archive.
pub const COMPOSER_PHAR: &str = "composer.phar";

/// Locates `composer.phar` and the PHP interpreter that runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composer {
    php: String,
    phar: Utf8PathBuf,
}

impl Composer {
    /// Creates a Composer handle for `<composer_dir>/composer.phar`.
    #[must_use]
    pub fn new(php: impl Into<String>, composer_dir: &Utf8Path) -> Self {
        Self {
            php: php.into(),
            phar: composer_dir.join(COMPOSER_PHAR),
        }
    }

    /// Returns the PHP interpreter used to run Composer.
    #[must_use]
    pub fn php(&self) -> &str {
        &self.php
    }

    /// Returns the path of `composer.phar`.
    #[must_use]
    pub fn phar(&self) -> &Utf8Path {
        &self.phar
    }

    /// Asks Composer for the declared type of `package` at `constraint`.
    ///
    /// Returns `None` when the output carries no `type` field.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PackagerError::ExternalProcess`] when the
    /// command fails or times out.
    pub fn show_package_type(
        &self,
        executor: &dyn CommandExecutor,
        repository_dir: &Utf8Path,
        package: &str,
        constraint: &str,
    ) -> Result<Option<String>> {
        let args = [self.phar.as_str(), "show", package, constraint];
        let output = executor.run(&self.php, &args, Some(repository_dir))?;
        let output = ensure_success(&self.php, &args, output)?;
        Ok(parse_show_type(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Installs the component's dependencies without dev requirements,
    /// streaming Composer's output to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PackagerError::ExternalProcess`] carrying the
    /// captured stderr when the install fails or times out.
    pub fn install(
        &self,
        executor: &dyn CommandExecutor,
        repository_dir: &Utf8Path,
        sink: &mut dyn Write,
    ) -> Result<()> {
        let args = [self.phar.as_str(), "install", "--no-dev"];
        let output = executor.run_streaming(&self.php, &args, Some(repository_dir), sink)?;
        ensure_success(&self.php, &args, output)?;
        Ok(())
    }
}

/// Extracts the `type` field from `composer show` output.
///
/// Only the field between the first and second colon is kept.
///
/// # Examples
///
/// ```
/// use contao_packager::composer::parse_show_type;
///
/// let output = "name     : acme/legacy\ntype     : legacy-contao-module\n";
/// assert_eq!(parse_show_type(output).as_deref(), Some("legacy-contao-module"));
/// assert_eq!(parse_show_type("name : acme/util\n"), None);
/// ```
#[must_use]
pub fn parse_show_type(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let mut fields = line.split(':').map(str::trim);
        if fields.next()? != "type" {
            return None;
        }
        fields.next().map(str::to_owned)
    })
}
