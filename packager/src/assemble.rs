//! Package tree assembly.
//!
//! Copies the declared source and symlink trees, the runonce scripts and the
//! installed vendor tree from the repository into the package directory and
//! writes the runonce aggregator. Composer must have populated `vendor/`
//! before [`TreeAssembler::assemble`] runs.

use crate::error::{PackagerError, Result};
use crate::host::VENDOR_DIR;
use crate::module_path::ModulePath;
use crate::template::{HostTemplate, runonce_class_name};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use walkdir::WalkDir;

/// Name of the module's configuration directory.
pub const CONFIG_DIR: &str = "config";

/// Name of the generated runonce aggregator.
pub const RUNONCE_AGGREGATOR: &str = "runonce.php";

/// Files written by [`TreeAssembler::assemble`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Targets of the declared source → target mappings.
    pub mapped: Vec<Utf8PathBuf>,
    /// Numbered runonce scripts, in execution order.
    pub runonce_scripts: Vec<Utf8PathBuf>,
    /// The aggregator, when at least one runonce script exists.
    pub aggregator: Option<Utf8PathBuf>,
    /// Destination of the vendor tree.
    pub vendor: Utf8PathBuf,
}

/// Copies repository content into the package layout.
#[derive(Debug, Clone, Copy)]
pub struct TreeAssembler<'a> {
    repository_dir: &'a Utf8Path,
    package_dir: &'a Utf8Path,
    module: &'a ModulePath,
}

impl<'a> TreeAssembler<'a> {
    /// Creates an assembler copying from `repository_dir` into
    /// `package_dir`, with module files placed under `module`.
    #[must_use]
    pub fn new(
        repository_dir: &'a Utf8Path,
        package_dir: &'a Utf8Path,
        module: &'a ModulePath,
    ) -> Self {
        Self {
            repository_dir,
            package_dir,
            module,
        }
    }

    /// Returns `<package>/<module>/config`.
    #[must_use]
    pub fn config_dir(&self) -> Utf8PathBuf {
        self.module.join_in(self.package_dir, CONFIG_DIR)
    }

    /// Runs every assembly step in order.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::CopyFailed`] or [`PackagerError::WriteFailed`]
    /// for the first step that fails; later steps are not attempted.
    pub fn assemble(
        &self,
        mappings: &[(String, String)],
        runonce: &[String],
        template: &dyn HostTemplate,
    ) -> Result<AssemblyReport> {
        self.prepare_config_dir()?;
        let mapped = self.copy_mappings(mappings)?;
        let runonce_scripts = self.copy_runonce(runonce)?;
        let aggregator = if runonce_scripts.is_empty() {
            None
        } else {
            Some(self.write_aggregator(template, &runonce_class_name())?)
        };
        let vendor = self.copy_vendor()?;

        Ok(AssemblyReport {
            mapped,
            runonce_scripts,
            aggregator,
            vendor,
        })
    }

    /// Creates the module's `config` directory.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::WriteFailed`] if the directory cannot be
    /// created.
    pub fn prepare_config_dir(&self) -> Result<Utf8PathBuf> {
        let dir = self.config_dir();
        fs::create_dir_all(&dir).map_err(|source| PackagerError::WriteFailed {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// Copies `<repo>/<source>` to `<package>/<target>` for every mapping.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::CopyFailed`] for a missing or unreadable
    /// source.
    pub fn copy_mappings(&self, mappings: &[(String, String)]) -> Result<Vec<Utf8PathBuf>> {
        mappings
            .iter()
            .map(|(source, target)| {
                let destination = self.package_dir.join(target);
                copy_tree(&self.repository_dir.join(source), &destination)?;
                log::debug!("copied {source} to {destination}");
                Ok(destination)
            })
            .collect()
    }

    /// Copies the runonce scripts to `config/runonce_<i>.php`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::CopyFailed`] if a script cannot be copied.
    pub fn copy_runonce(&self, scripts: &[String]) -> Result<Vec<Utf8PathBuf>> {
        let config_dir = self.config_dir();
        scripts
            .iter()
            .enumerate()
            .map(|(index, script)| {
                let destination = config_dir.join(format!("runonce_{index}.php"));
                copy_file(&self.repository_dir.join(script), &destination)?;
                Ok(destination)
            })
            .collect()
    }

    /// Writes `config/runonce.php` declaring `class_name`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::WriteFailed`] if the file cannot be written.
    pub fn write_aggregator(
        &self,
        template: &dyn HostTemplate,
        class_name: &str,
    ) -> Result<Utf8PathBuf> {
        let path = self.config_dir().join(RUNONCE_AGGREGATOR);
        write_file(&path, &template.runonce_aggregator(class_name))?;
        Ok(path)
    }

    /// Copies `<repo>/vendor` to `<package>/<module>/classes/vendor`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::CopyFailed`] when the vendor tree is missing
    /// or cannot be copied.
    pub fn copy_vendor(&self) -> Result<Utf8PathBuf> {
        let destination = self.module.join_in(self.package_dir, VENDOR_DIR);
        copy_tree(&self.repository_dir.join("vendor"), &destination)?;
        Ok(destination)
    }
}

/// Recursively copies `source` to `target`, following symlinks.
///
/// Directories are recreated and files copied byte for byte; missing parent
/// directories of `target` are created. Returns the number of files copied.
///
/// # Errors
///
/// Returns [`PackagerError::CopyFailed`] naming the entry that failed.
pub fn copy_tree(source: &Utf8Path, target: &Utf8Path) -> Result<usize> {
    let metadata =
        fs::metadata(source).map_err(|e| copy_failed(source, target, e.to_string()))?;
    if !metadata.is_dir() {
        copy_file(source, target)?;
        return Ok(1);
    }

    let mut copied = 0;
    for entry in WalkDir::new(source).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| copy_failed(source, target, e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(source.as_std_path())
            .ok()
            .and_then(Utf8Path::from_path)
            .ok_or_else(|| {
                copy_failed(source, target, format!("unexpected entry {}", entry.path().display()))
            })?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)
                .map_err(|e| copy_failed(source, &destination, e.to_string()))?;
        } else {
            let entry_path = source.join(relative);
            copy_file(&entry_path, &destination)?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn copy_file(source: &Utf8Path, target: &Utf8Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| copy_failed(source, target, e.to_string()))?;
    }
    fs::copy(source, target).map_err(|e| copy_failed(source, target, e.to_string()))?;
    Ok(())
}

pub(crate) fn write_file(path: &Utf8Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| PackagerError::WriteFailed {
            path: path.to_owned(),
            source,
        })?;
    }
    fs::write(path, content).map_err(|source| PackagerError::WriteFailed {
        path: path.to_owned(),
        source,
    })
}

fn copy_failed(source: &Utf8Path, target: &Utf8Path, reason: String) -> PackagerError {
    PackagerError::CopyFailed {
        source_path: source.to_owned(),
        target_path: target.to_owned(),
        reason,
    }
}
