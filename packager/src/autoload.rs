//! Autoload merging.
//!
//! The legacy host knows nothing about psr-0, psr-4 or classmap autoloading.
//! Every declared autoload root is scanned into one [`ClassMap`] and copied
//! below the module's `classes/` directory; the module's `autoload.php` and
//! `config.php` then get the vendor autoloader and the class cache priming
//! appended.

use crate::assemble::{CONFIG_DIR, copy_tree, write_file};
use crate::classmap::{ClassMap, scan_path};
use crate::error::{PackagerError, Result};
use crate::manifest::AutoloadSpec;
use crate::module_path::ModulePath;
use crate::template::HostTemplate;
use camino::{Utf8Path, Utf8PathBuf};

/// Directory below the module receiving the autoload roots.
pub const CLASSES_DIR: &str = "classes";

/// Overlay receiving the vendor autoloader.
pub const AUTOLOAD_OVERLAY: &str = "autoload.php";

/// Overlay receiving the legacy bootstrap block.
pub const CONFIG_OVERLAY: &str = "config.php";

/// Outcome of the autoload merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoloadReport {
    /// Union of all scanned roots.
    pub class_map: ClassMap,
    /// Copied roots below `classes/`, in scan order.
    pub copied: Vec<Utf8PathBuf>,
    /// Path of the rewritten `autoload.php`.
    pub autoload_file: Utf8PathBuf,
    /// Path of the rewritten `config.php`.
    pub config_file: Utf8PathBuf,
}

/// Scans autoload roots and writes the legacy overlays.
#[derive(Debug, Clone, Copy)]
pub struct AutoloadMerger<'a> {
    repository_dir: &'a Utf8Path,
    package_dir: &'a Utf8Path,
    module: &'a ModulePath,
}

impl<'a> AutoloadMerger<'a> {
    /// Creates a merger reading roots from `repository_dir` and writing
    /// below `module` inside `package_dir`.
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

    /// Scans and copies every root, then appends both overlays.
    ///
    /// # Errors
    ///
    /// Returns the first scan, copy or write failure.
    pub fn merge(&self, spec: &AutoloadSpec, template: &dyn HostTemplate) -> Result<AutoloadReport> {
        let (class_map, copied) = self.merge_roots(spec)?;
        let autoload_file = self.append_overlay(AUTOLOAD_OVERLAY, |existing| {
            template.autoload_overlay(existing, self.module)
        })?;
        let config_file = self.append_overlay(CONFIG_OVERLAY, |existing| {
            template.config_overlay(existing, self.module, &class_map)
        })?;

        Ok(AutoloadReport {
            class_map,
            copied,
            autoload_file,
            config_file,
        })
    }

    /// Scans each root in psr-0, psr-4, classmap order and copies it to
    /// `<module>/classes/<root>`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] when a root cannot be scanned and
    /// [`PackagerError::CopyFailed`] when it cannot be copied.
    pub fn merge_roots(&self, spec: &AutoloadSpec) -> Result<(ClassMap, Vec<Utf8PathBuf>)> {
        let classes_dir = self.module.join_in(self.package_dir, CLASSES_DIR);
        std::fs::create_dir_all(&classes_dir).map_err(|source| PackagerError::WriteFailed {
            path: classes_dir.clone(),
            source,
        })?;

        let mut class_map = ClassMap::new();
        let mut copied = Vec::new();
        for root in spec.source_paths() {
            let source = self.repository_dir.join(root);
            let scanned = scan_path(&source)?;
            log::debug!("{root}: {} class(es)", scanned.len());
            class_map.merge(scanned);

            let destination = classes_dir.join(root);
            copy_tree(&source, &destination)?;
            copied.push(destination);
        }
        Ok((class_map, copied))
    }

    fn append_overlay(
        &self,
        file_name: &str,
        render: impl FnOnce(Option<&str>) -> String,
    ) -> Result<Utf8PathBuf> {
        let path = self
            .module
            .join_in(self.package_dir, CONFIG_DIR)
            .join(file_name);
        let existing = if path.is_file() {
            Some(std::fs::read_to_string(&path)?)
        } else {
            None
        };
        write_file(&path, &render(existing.as_deref()))?;
        Ok(path)
    }
}
