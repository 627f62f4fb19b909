//! The `composer.lock` companion document.
//!
//! Only the `packages` list is interpreted; everything else is written back
//! untouched.

use super::LOCK_FILE;
use super::loader::read_json_object;
use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};

/// A parsed lock document.
#[derive(Debug, Clone, PartialEq)]
pub struct LockFile {
    path: Utf8PathBuf,
    document: Map<String, Value>,
}

impl LockFile {
    /// Loads `<repository_dir>/composer.lock` when it exists.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load_if_present(repository_dir: &Utf8Path) -> Result<Option<Self>> {
        let path = repository_dir.join(LOCK_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let document = read_json_object(&path)?;
        Ok(Some(Self { path, document }))
    }

    /// Returns the location of the lock file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the `(name, type)` pairs of the locked packages.
    #[must_use]
    pub fn packages(&self) -> Vec<(String, String)> {
        self.document
            .get("packages")
            .and_then(Value::as_array)
            .map(|packages| packages.iter().map(package_identity).collect())
            .unwrap_or_default()
    }

    /// Removes every locked package for which `predicate(name, type)` holds
    /// and returns the removed names in lock order.
    pub fn remove_packages<F>(&mut self, predicate: F) -> Vec<String>
    where
        F: Fn(&str, &str) -> bool,
    {
        let Some(packages) = self
            .document
            .get_mut("packages")
            .and_then(Value::as_array_mut)
        else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        packages.retain(|package| {
            let (name, package_type) = package_identity(package);
            if predicate(&name, &package_type) {
                removed.push(name);
                false
            } else {
                true
            }
        });
        removed
    }

    /// Writes the lock document back compactly.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::WriteFailed`] if the file cannot be written.
    pub fn write(&self) -> Result<()> {
        let text = Value::Object(self.document.clone()).to_string();
        std::fs::write(&self.path, text).map_err(|source| PackagerError::WriteFailed {
            path: self.path.clone(),
            source,
        })
    }
}

fn package_identity(package: &Value) -> (String, String) {
    let field = |key: &str| {
        package
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };
    (field("name"), field("type"))
}
