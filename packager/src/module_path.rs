//! Module path resolution inside the host's module directory.
//!
//! The packaging hints declare where parts of the repository end up in the
//! host tree. The first target inside `system/modules/<name>` decides the
//! module directory; without one, the module is named after the last segment
//! of the package name.

use crate::error::{PackagerError, Result};
use crate::host::{MODULE_ROOT, module_path_prefix};
use crate::manifest::ContaoHints;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::fmt;

/// The module directory, relative to the package root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModulePath(Utf8PathBuf);

impl ModulePath {
    /// Returns the path relative to the package root.
    #[must_use]
    pub fn as_path(&self) -> &Utf8Path {
        &self.0
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Resolves `relative` inside this module below `package_dir`.
    #[must_use]
    pub fn join_in(&self, package_dir: &Utf8Path, relative: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        package_dir.join(&self.0).join(relative)
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the module path was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// A declared symlink or source target lies inside the module directory.
    DeclaredTarget,
    /// No target matched; the path was derived from the package name.
    PackageName,
}

/// The outcome of module path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// The resolved module directory.
    pub path: ModulePath,
    /// Where the path came from.
    pub source: ResolutionSource,
    /// Every source → target copy mapping, symlinks first.
    pub mappings: Vec<(String, String)>,
}

/// Merges symlinks and sources into one ordered source → target list.
///
/// Sources are appended after symlinks. A source key declared twice keeps
/// its first position and takes the later target.
///
/// # Errors
///
/// Returns [`PackagerError::UnsafeTarget`] when a target is absolute or
/// climbs out of the package root with `..`.
pub fn merge_mappings(hints: &ContaoHints) -> Result<Vec<(String, String)>> {
    let mut merged: Vec<(String, String)> = Vec::new();
    for (source, target) in hints.symlinks.iter().chain(&hints.sources) {
        if !stays_in_package(target) {
            return Err(PackagerError::UnsafeTarget {
                source_path: source.clone(),
                target: target.clone(),
            });
        }
        match merged.iter_mut().find(|(existing, _)| existing == source) {
            Some(entry) => entry.1.clone_from(target),
            None => merged.push((source.clone(), target.clone())),
        }
    }
    Ok(merged)
}

/// True when `target` is a relative path without parent components.
fn stays_in_package(target: &str) -> bool {
    Utf8Path::new(target)
        .components()
        .all(|component| matches!(component, Utf8Component::Normal(_) | Utf8Component::CurDir))
}

/// Derives the fallback module path from a package name.
///
/// # Examples
///
/// ```
/// use contao_packager::module_path::name_derived_path;
///
/// assert_eq!(name_derived_path("vendor/my-thing").as_str(), "system/modules/my-thing");
/// assert_eq!(name_derived_path("standalone").as_str(), "system/modules/standalone");
/// ```
#[must_use]
pub fn name_derived_path(package_name: &str) -> ModulePath {
    let segment = package_name.rsplit('/').next().unwrap_or(package_name);
    ModulePath(Utf8Path::new(MODULE_ROOT).join(segment))
}

/// Resolves the module path for a package.
///
/// The result is computed once per run, before anything is copied.
///
/// # Errors
///
/// Returns [`PackagerError::UnsafeTarget`] for targets outside the package.
pub fn resolve_module_path(package_name: &str, hints: &ContaoHints) -> Result<ResolvedModule> {
    let mappings = merge_mappings(hints)?;

    let declared = mappings
        .iter()
        .find_map(|(_, target)| module_path_prefix(target));

    let (path, source) = match declared {
        Some(prefix) => (
            ModulePath(Utf8PathBuf::from(prefix)),
            ResolutionSource::DeclaredTarget,
        ),
        None => {
            let path = name_derived_path(package_name);
            log::info!("module path not found, guessing the module path from name: {path}");
            (path, ResolutionSource::PackageName)
        }
    };

    Ok(ResolvedModule {
        path,
        source,
        mappings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|&(s, t)| (s.to_owned(), t.to_owned()))
            .collect()
    }

    #[test]
    fn first_matching_target_wins_over_name() {
        let hints = ContaoHints {
            symlinks: pairs(&[("assets", "files/widget"), ("html", "system/modules/first/html")]),
            sources: pairs(&[("module", "system/modules/second")]),
            runonce: Vec::new(),
        };

        let resolved = resolve_module_path("acme/widget", &hints).expect("targets are safe");
        assert_eq!(resolved.path.as_str(), "system/modules/first");
        assert_eq!(resolved.source, ResolutionSource::DeclaredTarget);
    }

    #[test]
    fn sources_are_considered_after_symlinks() {
        let hints = ContaoHints {
            symlinks: pairs(&[("assets", "files/widget")]),
            sources: pairs(&[("module", "system/modules/from-sources")]),
            runonce: Vec::new(),
        };

        let resolved = resolve_module_path("acme/widget", &hints).expect("targets are safe");
        assert_eq!(resolved.path.as_str(), "system/modules/from-sources");
        assert_eq!(
            resolved.mappings,
            pairs(&[
                ("assets", "files/widget"),
                ("module", "system/modules/from-sources")
            ])
        );
    }

    #[rstest]
    #[case::vendor_name("vendor/my-thing", "system/modules/my-thing")]
    #[case::no_vendor("widget", "system/modules/widget")]
    fn falls_back_to_last_name_segment(#[case] name: &str, #[case] expected: &str) {
        let hints = ContaoHints {
            symlinks: pairs(&[("assets", "files/widget")]),
            ..ContaoHints::default()
        };

        let resolved = resolve_module_path(name, &hints).expect("targets are safe");
        assert_eq!(resolved.path.as_str(), expected);
        assert_eq!(resolved.source, ResolutionSource::PackageName);
    }

    #[test]
    fn duplicate_source_keeps_position_and_takes_later_target() {
        let hints = ContaoHints {
            symlinks: pairs(&[("module", "system/modules/old"), ("assets", "files/a")]),
            sources: pairs(&[("module", "system/modules/new")]),
            runonce: Vec::new(),
        };

        assert_eq!(
            merge_mappings(&hints).expect("targets are safe"),
            pairs(&[("module", "system/modules/new"), ("assets", "files/a")])
        );
    }

    #[rstest]
    #[case::absolute("/etc/widget")]
    #[case::parent("../widget")]
    #[case::nested_parent("system/modules/widget/../../../outside")]
    #[case::module_parent("system/modules/..")]
    fn targets_leaving_the_package_are_rejected(#[case] target: &str) {
        let hints = ContaoHints {
            sources: pairs(&[("module", target)]),
            ..ContaoHints::default()
        };

        let err = resolve_module_path("acme/widget", &hints).expect_err("expected rejection");
        assert!(matches!(
            err,
            PackagerError::UnsafeTarget { ref source_path, target: ref rejected }
                if source_path == "module" && rejected == target
        ));
    }

    #[test]
    fn join_in_places_paths_below_the_module() {
        let path = name_derived_path("acme/widget");
        assert_eq!(
            path.join_in(Utf8Path::new("/pkg"), "config"),
            Utf8PathBuf::from("/pkg/system/modules/widget/config")
        );
    }
}
