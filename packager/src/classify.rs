//! Dependency classification.
//!
//! Every `require` entry is checked against the host's own packages, the
//! legacy namespace and finally its package type. Legacy modules cannot be
//! installed by Composer inside a legacy host, so they are removed from
//! `require`, declared in `replace` and reported to the operator instead.
//!
//! Package types come from a chain of [`PackageTypeSource`]s: the
//! manifest's own VCS repositories first, then `composer show`.

use crate::composer::Composer;
use crate::error::{PackagerError, Result};
use crate::host::{
    DEFAULT_PACKAGE_TYPE, is_core_package, is_legacy_module_type, is_legacy_namespace,
    is_replaced_lock_package,
};
use crate::manifest::lock::LockFile;
use crate::manifest::loader::read_json_object;
use crate::manifest::{MANIFEST_FILE, Manifest, RepositoryConfig};
use crate::process::{CommandExecutor, ensure_success};
use camino::Utf8Path;
use serde_json::Value;
use std::cell::RefCell;

/// A source of package types.
#[cfg_attr(test, mockall::automock)]
pub trait PackageTypeSource {
    /// Returns the type of `package` at `constraint`, or `None` when this
    /// source does not know the package.
    ///
    /// # Errors
    ///
    /// Returns an error when the source itself fails (for example an
    /// external command exits non-zero).
    fn package_type(&self, package: &str, constraint: &str) -> Result<Option<String>>;
}

/// Why a dependency was classified the way it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// One of the host's own packages.
    Core,
    /// A package in the legacy module namespace.
    LegacyNamespace,
    /// A package whose type marks it as a legacy module.
    LegacyModule,
    /// Any other package; it stays in `require`.
    Library,
}

impl DependencyKind {
    /// Returns true when the dependency is folded into `replace`.
    #[must_use]
    pub const fn is_external(self) -> bool {
        !matches!(self, Self::Library)
    }
}

/// A classified `require` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
    /// Package name.
    pub name: String,
    /// Version constraint from `require`.
    pub constraint: String,
    /// Resolved package type; `None` when name rules decided without it.
    pub package_type: Option<String>,
    /// Classification outcome.
    pub kind: DependencyKind,
}

/// The result of classifying a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Every inspected dependency in `require` order.
    pub dependencies: Vec<DependencyRecord>,
    /// Locked packages dropped from `composer.lock`.
    pub lock_replaced: Vec<String>,
}

impl Classification {
    /// Returns the dependencies moved to `replace`, to be reported to the
    /// operator.
    pub fn external(&self) -> impl Iterator<Item = &DependencyRecord> {
        self.dependencies.iter().filter(|d| d.kind.is_external())
    }
}

/// Classifies `require` entries and rewrites the manifest accordingly.
pub struct DependencyClassifier<'a> {
    types: &'a dyn PackageTypeSource,
}

impl<'a> DependencyClassifier<'a> {
    /// Creates a classifier backed by `types`.
    #[must_use]
    pub fn new(types: &'a dyn PackageTypeSource) -> Self {
        Self { types }
    }

    /// Classifies one dependency without touching the manifest.
    ///
    /// # Errors
    ///
    /// Propagates failures of the package type source.
    pub fn classify_dependency(&self, name: &str, constraint: &str) -> Result<DependencyRecord> {
        let record = |kind, package_type| DependencyRecord {
            name: name.to_owned(),
            constraint: constraint.to_owned(),
            package_type,
            kind,
        };

        if is_core_package(name) {
            return Ok(record(DependencyKind::Core, None));
        }
        if is_legacy_namespace(name) {
            return Ok(record(DependencyKind::LegacyNamespace, None));
        }

        let package_type = self
            .types
            .package_type(name, constraint)?
            .unwrap_or_else(|| DEFAULT_PACKAGE_TYPE.to_owned());
        let kind = if is_legacy_module_type(&package_type) {
            DependencyKind::LegacyModule
        } else {
            DependencyKind::Library
        };
        Ok(record(kind, Some(package_type)))
    }

    /// Classifies every `require` entry and moves legacy modules from
    /// `require` to `replace`.
    ///
    /// Running it again on the rewritten manifest changes nothing.
    ///
    /// # Errors
    ///
    /// Propagates failures of the package type source.
    pub fn classify(&self, manifest: &mut Manifest) -> Result<Classification> {
        manifest.ensure_replace();

        let mut classification = Classification::default();
        for (name, constraint) in manifest.require() {
            let record = self.classify_dependency(&name, &constraint)?;
            log::debug!("{name} {constraint} classified as {:?}", record.kind);
            if record.kind.is_external() {
                manifest.remove_require(&name);
                manifest.add_replace(&name);
            }
            classification.dependencies.push(record);
        }
        manifest.drop_empty_require();

        Ok(classification)
    }
}

/// Drops host packages and legacy modules from `composer.lock` and declares
/// them replaced. Returns the removed package names.
///
/// Does nothing when the repository has no lock file.
///
/// # Errors
///
/// Returns an error when the lock file cannot be read, parsed or written.
pub fn rewrite_lock(repository_dir: &Utf8Path, manifest: &mut Manifest) -> Result<Vec<String>> {
    let Some(mut lock) = LockFile::load_if_present(repository_dir)? else {
        return Ok(Vec::new());
    };

    let removed = lock.remove_packages(is_replaced_lock_package);
    for name in &removed {
        manifest.add_replace(name);
    }
    lock.write()?;
    log::debug!("rewrote {} without {} package(s)", lock.path(), removed.len());

    Ok(removed)
}

/// Tries several sources in order and returns the first known type.
pub struct ChainedTypeSource<'a> {
    sources: Vec<&'a dyn PackageTypeSource>,
}

impl<'a> ChainedTypeSource<'a> {
    /// Creates a chain querying `sources` in order.
    #[must_use]
    pub fn new(sources: Vec<&'a dyn PackageTypeSource>) -> Self {
        Self { sources }
    }
}

impl PackageTypeSource for ChainedTypeSource<'_> {
    fn package_type(&self, package: &str, constraint: &str) -> Result<Option<String>> {
        for source in &self.sources {
            if let Some(package_type) = source.package_type(package, constraint)? {
                return Ok(Some(package_type));
            }
        }
        Ok(None)
    }
}

/// Looks packages up via `composer show`.
pub struct ComposerShowSource<'a> {
    composer: &'a Composer,
    executor: &'a dyn CommandExecutor,
    repository_dir: &'a Utf8Path,
}

impl<'a> ComposerShowSource<'a> {
    /// Creates a source that runs `composer show` inside `repository_dir`.
    #[must_use]
    pub fn new(
        composer: &'a Composer,
        executor: &'a dyn CommandExecutor,
        repository_dir: &'a Utf8Path,
    ) -> Self {
        Self {
            composer,
            executor,
            repository_dir,
        }
    }
}

impl PackageTypeSource for ComposerShowSource<'_> {
    fn package_type(&self, package: &str, constraint: &str) -> Result<Option<String>> {
        self.composer
            .show_package_type(self.executor, self.repository_dir, package, constraint)
    }
}

/// A package advertised by a version-control repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryPackage {
    /// Package name from the repository's manifest.
    pub name: String,
    /// Package type from the repository's manifest.
    pub package_type: String,
}

/// Looks packages up in the manifest's version-control repositories.
///
/// Each repository is shallow-cloned once per run into a temporary
/// directory and its `composer.json` read; the package list is cached for
/// the remaining lookups.
pub struct VcsRepositorySource<'a> {
    repositories: Vec<RepositoryConfig>,
    executor: &'a dyn CommandExecutor,
    packages: RefCell<Option<Vec<RepositoryPackage>>>,
}

impl<'a> VcsRepositorySource<'a> {
    /// Creates a source over the version-control entries of `repositories`.
    #[must_use]
    pub fn new(repositories: &[RepositoryConfig], executor: &'a dyn CommandExecutor) -> Self {
        Self {
            repositories: repositories
                .iter()
                .filter(|r| r.is_version_control())
                .cloned()
                .collect(),
            executor,
            packages: RefCell::new(None),
        }
    }

    /// Builds the package list of every repository, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::ExternalProcess`] when a clone fails.
    pub fn package_list(&self) -> Result<Vec<RepositoryPackage>> {
        if let Some(packages) = self.packages.borrow().as_ref() {
            return Ok(packages.clone());
        }

        let mut packages = Vec::new();
        for repository in &self.repositories {
            packages.extend(self.repository_packages(repository)?);
        }
        self.packages.replace(Some(packages.clone()));
        Ok(packages)
    }

    fn repository_packages(&self, repository: &RepositoryConfig) -> Result<Vec<RepositoryPackage>> {
        let temp = tempfile::Builder::new().prefix("composer_").tempdir()?;
        let checkout = Utf8Path::from_path(temp.path())
            .map(|dir| dir.join("checkout"))
            .ok_or_else(|| {
                PackagerError::Io(std::io::Error::other("temporary directory is not UTF-8"))
            })?;

        let args = ["clone", "--depth", "1", "--quiet", repository.url.as_str(), checkout.as_str()];
        let output = self.executor.run("git", &args, None)?;
        ensure_success("git", &args, output)?;

        Ok(read_repository_package(&checkout)?.into_iter().collect())
    }
}

impl PackageTypeSource for VcsRepositorySource<'_> {
    fn package_type(&self, package: &str, _constraint: &str) -> Result<Option<String>> {
        if self.repositories.is_empty() {
            return Ok(None);
        }
        Ok(self
            .package_list()?
            .into_iter()
            .find(|candidate| candidate.name == package)
            .map(|found| found.package_type))
    }
}

fn read_repository_package(checkout: &Utf8Path) -> Result<Option<RepositoryPackage>> {
    let manifest_path = checkout.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        log::debug!("{checkout} has no {MANIFEST_FILE}; skipping");
        return Ok(None);
    }

    let document = read_json_object(&manifest_path)?;
    let text = |key: &str| document.get(key).and_then(Value::as_str).map(str::to_owned);
    Ok(text("name").map(|name| RepositoryPackage {
        name,
        package_type: text("type")
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_PACKAGE_TYPE.to_owned()),
    }))
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
