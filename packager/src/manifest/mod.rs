//! The component manifest (`composer.json`) and its companion lock file.
//!
//! [`Manifest`] keeps the whole JSON object so that keys the packager does
//! not understand survive the rewrite in their original order. Typed views
//! are provided for the sections the pipeline reads: dependencies,
//! repositories, autoload roots and the `extra.contao` packaging hints.

pub mod loader;
pub mod lock;

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::{Map, Value};

/// File name of the manifest inside the repository root.
pub const MANIFEST_FILE: &str = "composer.json";

/// File name of the lock document inside the repository root.
pub const LOCK_FILE: &str = "composer.lock";

/// Wildcard constraint written into `replace` for folded dependencies.
pub const REPLACE_CONSTRAINT: &str = "*";

/// A parsed `composer.json` document.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    document: Map<String, Value>,
}

/// A repository entry from the manifest's `repositories` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Repository kind (`vcs`, `git`, `composer`, ...).
    pub kind: String,
    /// Repository location.
    pub url: String,
}

impl RepositoryConfig {
    /// Returns true for repositories backed by version control.
    #[must_use]
    pub fn is_version_control(&self) -> bool {
        matches!(self.kind.as_str(), "vcs" | "git")
    }
}

/// Packaging hints from `extra.contao`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContaoHints {
    /// Source → target pairs from `symlinks`, in declaration order.
    pub symlinks: Vec<(String, String)>,
    /// Source → target pairs from `sources`, in declaration order.
    pub sources: Vec<(String, String)>,
    /// Runonce script paths, in declaration order.
    pub runonce: Vec<String>,
}

/// Autoload roots from the `autoload` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoloadSpec {
    /// `psr-0` prefixes and their source paths.
    pub psr0: Vec<(String, Vec<String>)>,
    /// `psr-4` prefixes and their source paths.
    pub psr4: Vec<(String, Vec<String>)>,
    /// `classmap` paths.
    pub classmap: Vec<String>,
}

impl AutoloadSpec {
    /// Returns every declared source path in scan order: psr-0, psr-4, then
    /// classmap, each in declaration order.
    #[must_use]
    pub fn source_paths(&self) -> Vec<&str> {
        let prefixed = self
            .psr0
            .iter()
            .chain(&self.psr4)
            .flat_map(|(_, paths)| paths.iter().map(String::as_str));
        prefixed
            .chain(self.classmap.iter().map(String::as_str))
            .collect()
    }

    /// Returns true when no autoload root is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.psr0.is_empty() && self.psr4.is_empty() && self.classmap.is_empty()
    }
}

impl Manifest {
    /// Wraps an already parsed JSON object.
    #[must_use]
    pub fn from_document(document: Map<String, Value>) -> Self {
        Self { document }
    }

    /// Parses a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidManifest`] if the text is not a JSON
    /// object.
    pub fn parse(text: &str, origin: &Utf8Path) -> Result<Self> {
        loader::parse_object(text, origin).map(Self::from_document)
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Returns the declared package name, or an empty string.
    #[must_use]
    pub fn name(&self) -> &str {
        self.document
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Returns the declared package type.
    #[must_use]
    pub fn package_type(&self) -> Option<&str> {
        self.document.get("type").and_then(Value::as_str)
    }

    /// Returns the `require` entries in declaration order.
    #[must_use]
    pub fn require(&self) -> Vec<(String, String)> {
        string_pairs(self.document.get("require"))
    }

    /// Returns the `replace` entries in declaration order.
    #[must_use]
    pub fn replace(&self) -> Vec<(String, String)> {
        string_pairs(self.document.get("replace"))
    }

    /// Returns true when `package` is listed in `require`.
    #[must_use]
    pub fn requires(&self, package: &str) -> bool {
        self.document
            .get("require")
            .and_then(Value::as_object)
            .is_some_and(|require| require.contains_key(package))
    }

    /// Removes `package` from `require`, returning its constraint.
    pub fn remove_require(&mut self, package: &str) -> Option<String> {
        let require = self.document.get_mut("require")?.as_object_mut()?;
        require
            .shift_remove(package)
            .map(|constraint| constraint.as_str().unwrap_or_default().to_owned())
    }

    /// Drops `require` entirely when it no longer lists any package.
    pub fn drop_empty_require(&mut self) {
        let is_empty = self
            .document
            .get("require")
            .and_then(Value::as_object)
            .is_some_and(Map::is_empty);
        if is_empty {
            self.document.shift_remove("require");
        }
    }

    /// Makes sure a `replace` object exists.
    pub fn ensure_replace(&mut self) {
        let has_object = self
            .document
            .get("replace")
            .is_some_and(Value::is_object);
        if !has_object {
            self.document
                .insert("replace".to_owned(), Value::Object(Map::new()));
        }
    }

    /// Declares that this package replaces `package` at any version.
    pub fn add_replace(&mut self, package: &str) {
        self.ensure_replace();
        if let Some(replace) = self
            .document
            .get_mut("replace")
            .and_then(Value::as_object_mut)
        {
            replace.insert(
                package.to_owned(),
                Value::String(REPLACE_CONSTRAINT.to_owned()),
            );
        }
    }

    /// Returns the manifest's custom repositories.
    #[must_use]
    pub fn repositories(&self) -> Vec<RepositoryConfig> {
        let Some(entries) = self.document.get("repositories") else {
            return Vec::new();
        };
        let values: Vec<&Value> = match entries {
            Value::Array(items) => items.iter().collect(),
            Value::Object(items) => items.values().collect(),
            _ => Vec::new(),
        };
        values
            .into_iter()
            .filter_map(|entry| {
                let kind = entry.get("type")?.as_str()?;
                let url = entry.get("url").and_then(Value::as_str).unwrap_or_default();
                Some(RepositoryConfig {
                    kind: kind.to_owned(),
                    url: url.to_owned(),
                })
            })
            .collect()
    }

    /// Returns the `extra.contao` packaging hints.
    #[must_use]
    pub fn contao_hints(&self) -> ContaoHints {
        let Some(contao) = self
            .document
            .get("extra")
            .and_then(|extra| extra.get("contao"))
        else {
            return ContaoHints::default();
        };

        ContaoHints {
            symlinks: path_pairs(contao.get("symlinks")),
            sources: path_pairs(contao.get("sources")),
            runonce: string_list(contao.get("runonce")),
        }
    }

    /// Returns the declared autoload roots.
    #[must_use]
    pub fn autoload(&self) -> AutoloadSpec {
        let Some(autoload) = self.document.get("autoload") else {
            return AutoloadSpec::default();
        };

        AutoloadSpec {
            psr0: prefix_roots(autoload.get("psr-0")),
            psr4: prefix_roots(autoload.get("psr-4")),
            classmap: string_list(autoload.get("classmap")),
        }
    }

    /// Shallow-merges `overrides` over this manifest; override keys win.
    pub fn merge_overrides(&mut self, overrides: Map<String, Value>) {
        for (key, value) in overrides {
            self.document.insert(key, value);
        }
    }

    /// Serialises the manifest the way Composer writes it (four-space
    /// indentation, trailing newline).
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidManifest`] if serialisation fails.
    pub fn to_pretty_json(&self, origin: &Utf8Path) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.document
            .serialize(&mut serializer)
            .map_err(|e| PackagerError::InvalidManifest {
                path: origin.to_owned(),
                reason: e.to_string(),
            })?;
        let mut text = String::from_utf8_lossy(&buffer).into_owned();
        text.push('\n');
        Ok(text)
    }

    /// Writes the manifest back to `<repository_dir>/composer.json`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::WriteFailed`] if the file cannot be written.
    pub fn write_to(&self, repository_dir: &Utf8Path) -> Result<Utf8PathBuf> {
        let path = repository_dir.join(MANIFEST_FILE);
        let text = self.to_pretty_json(&path)?;
        std::fs::write(&path, text).map_err(|source| PackagerError::WriteFailed {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn string_pairs(value: Option<&Value>) -> Vec<(String, String)> {
    value
        .and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .map(|(key, value)| (key.clone(), value_text(value)))
                .collect()
        })
        .unwrap_or_default()
}

/// Reads a source → target map. A JSON list maps each entry onto itself.
fn path_pairs(value: Option<&Value>) -> Vec<(String, String)> {
    match value {
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(source, target)| (source.clone(), value_text(target)))
            .collect(),
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .map(|path| (path.to_owned(), path.to_owned()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Reads a list of paths; a single string or an object's values also count.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(path)) => vec![path.clone()],
        Some(Value::Array(entries)) => entries.iter().filter_map(value_str).collect(),
        Some(Value::Object(entries)) => entries.values().filter_map(value_str).collect(),
        _ => Vec::new(),
    }
}

fn prefix_roots(value: Option<&Value>) -> Vec<(String, Vec<String>)> {
    value
        .and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .map(|(prefix, paths)| (prefix.clone(), string_list(Some(paths))))
                .collect()
        })
        .unwrap_or_default()
}

fn value_str(value: &Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests;
