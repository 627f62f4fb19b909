//! Manifest loading with optional shallow overrides.

use super::{MANIFEST_FILE, Manifest};
use crate::error::{PackagerError, Result};
use camino::Utf8Path;
use serde_json::{Map, Value};

/// Loads `<repository_dir>/composer.json` and applies `override_file`.
///
/// Top-level keys of the override document replace the manifest's keys
/// wholesale; nested objects are not merged.
///
/// # Errors
///
/// Returns [`PackagerError::Io`] when a document cannot be read and
/// [`PackagerError::InvalidManifest`] when it is not a JSON object.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use contao_packager::manifest::loader::load_manifest;
///
/// let manifest = load_manifest(Utf8Path::new("/src/widget"), None)?;
/// println!("packaging {}", manifest.name());
/// # Ok::<(), contao_packager::error::PackagerError>(())
/// ```
pub fn load_manifest(repository_dir: &Utf8Path, override_file: Option<&Utf8Path>) -> Result<Manifest> {
    let manifest_path = repository_dir.join(MANIFEST_FILE);
    let mut manifest = Manifest::from_document(read_json_object(&manifest_path)?);

    if let Some(path) = override_file {
        log::debug!("merging overrides from {path}");
        manifest.merge_overrides(read_json_object(path)?);
    }

    Ok(manifest)
}

/// Reads a file that must contain a JSON object.
///
/// # Errors
///
/// Returns [`PackagerError::Io`] when the file cannot be read and
/// [`PackagerError::InvalidManifest`] when it is not a JSON object.
pub fn read_json_object(path: &Utf8Path) -> Result<Map<String, Value>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        PackagerError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read {path}: {e}"),
        ))
    })?;
    parse_object(&text, path)
}

/// Parses text that must contain a JSON object.
///
/// # Errors
///
/// Returns [`PackagerError::InvalidManifest`] for malformed JSON or a
/// non-object top level.
pub fn parse_object(text: &str, origin: &Utf8Path) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(text).map_err(|e| PackagerError::InvalidManifest {
        path: origin.to_owned(),
        reason: e.to_string(),
    })?;

    match value {
        Value::Object(document) => Ok(document),
        other => Err(PackagerError::InvalidManifest {
            path: origin.to_owned(),
            reason: format!("expected a JSON object, found {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
