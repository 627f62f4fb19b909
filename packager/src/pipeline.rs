//! Packaging pipeline orchestration.
//!
//! [`run`] is the single entry point. It drives the stages in order: load
//! the manifest, validate its type, resolve the module path, classify and
//! rewrite dependencies, let Composer install the rest, assemble the package
//! tree, merge autoloading and record the release. Every stage is a hard
//! checkpoint; the first failure aborts the run.

use crate::assemble::{AssemblyReport, TreeAssembler};
use crate::autoload::{AutoloadMerger, AutoloadReport};
use crate::classify::{
    ChainedTypeSource, Classification, ComposerShowSource, DependencyClassifier,
    VcsRepositorySource, rewrite_lock,
};
use crate::classmap::ClassCollision;
use crate::composer::Composer;
use crate::config::RunConfig;
use crate::error::{PackagerError, Result};
use crate::host::MODULE_TYPE;
use crate::manifest::Manifest;
use crate::manifest::loader::load_manifest;
use crate::module_path::{ResolutionSource, ResolvedModule, resolve_module_path};
use crate::output::{DryRunInfo, StatusWriter, success_message};
use crate::process::{CommandExecutor, SystemCommandExecutor};
use crate::release::{ReleaseDescriptor, dependency_reminder};
use crate::template::{ContaoTemplate, HostTemplate};
use std::io::Write;

/// What a run produced.
///
/// A dry run stops after module path resolution, leaving the later stages
/// empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Declared package name.
    pub package_name: String,
    /// Resolved module path and copy mappings.
    pub module: ResolvedModule,
    /// Dependency classification, including lock rewrites.
    pub classification: Classification,
    /// Files copied into the package.
    pub assembly: Option<AssemblyReport>,
    /// Class map and overlay files.
    pub autoload: Option<AutoloadReport>,
    /// Recorded provenance.
    pub release: Option<ReleaseDescriptor>,
}

impl RunReport {
    /// Returns true when the run only reported its plan.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.release.is_none()
    }

    /// Number of classes primed in the host's class cache.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.autoload.as_ref().map_or(0, |report| report.class_map.len())
    }

    /// Classes declared by more than one autoload root.
    #[must_use]
    pub fn collisions(&self) -> &[ClassCollision] {
        self.autoload
            .as_ref()
            .map_or(&[], |report| report.class_map.collisions())
    }
}

/// Runs the pipeline with the system executor and the Contao templates.
///
/// # Errors
///
/// See [`run`].
pub fn run_with_system(config: &RunConfig, stderr: &mut dyn Write) -> Result<RunReport> {
    let executor = SystemCommandExecutor::new(config.timeout());
    run(config, &executor, &ContaoTemplate, stderr)
}

/// Packages the component described by `config`.
///
/// Status lines go to `stderr` unless the configuration is quiet.
///
/// # Errors
///
/// Returns [`PackagerError::NotAModule`] before touching anything when the
/// manifest does not declare the module type; otherwise the first I/O or
/// external process failure of any stage.
pub fn run(
    config: &RunConfig,
    executor: &dyn CommandExecutor,
    template: &dyn HostTemplate,
    stderr: &mut dyn Write,
) -> Result<RunReport> {
    let mut status = StatusWriter::new(stderr, config.quiet());

    let mut manifest = load_manifest(config.repository_dir(), config.config_file())?;
    status.line("Validate project");
    validate_module_type(&manifest)?;

    let module = resolve_module_path(manifest.name(), &manifest.contao_hints())?;
    if module.source == ResolutionSource::PackageName {
        status.line(format!(
            "  * Module path not found, guessing the module path from name: {}",
            module.path
        ));
    }

    if config.dry_run() {
        let dependencies: Vec<String> =
            manifest.require().into_iter().map(|(name, _)| name).collect();
        let info = DryRunInfo {
            package_name: manifest.name(),
            repository_dir: config.repository_dir(),
            package_dir: config.package_dir(),
            composer_dir: config.composer_dir(),
            config_file: config.config_file(),
            timeout: config.timeout(),
            module: &module,
            dependencies: &dependencies,
        };
        status.notice(info.display_text());
        return Ok(RunReport {
            package_name: manifest.name().to_owned(),
            module,
            classification: Classification::default(),
            assembly: None,
            autoload: None,
            release: None,
        });
    }

    let composer = Composer::new(config.php(), config.composer_dir());
    status.line("  - Remove unneeded dependencies");
    let classification = classify_dependencies(config, &composer, executor, &mut manifest)?;

    status.line("Install dependencies");
    composer.install(executor, config.repository_dir(), status.stream())?;

    status.line("Copy files into package");
    let assembly = TreeAssembler::new(config.repository_dir(), config.package_dir(), &module.path)
        .assemble(&module.mappings, &manifest.contao_hints().runonce, template)?;

    status.line(format!("Create autoload ({} templates)", template.version()));
    let autoload = AutoloadMerger::new(config.repository_dir(), config.package_dir(), &module.path)
        .merge(&manifest.autoload(), template)?;
    if !autoload.class_map.collisions().is_empty() {
        status.line(format!(
            "  * {} class(es) declared more than once; later autoload roots win",
            autoload.class_map.collisions().len()
        ));
    }

    status.line("  - Write release file");
    let release = ReleaseDescriptor::capture(
        executor,
        config.repository_dir(),
        config.repository_url(),
    )?;
    release.write(config.package_dir(), &module.path)?;

    for line in dependency_reminder(classification.external()) {
        status.line(line);
    }
    status.line(success_message(module.path.as_str(), config.package_dir()));

    Ok(RunReport {
        package_name: manifest.name().to_owned(),
        module,
        classification,
        assembly: Some(assembly),
        autoload: Some(autoload),
        release: Some(release),
    })
}

/// Rejects manifests that do not declare the Contao module type or whose
/// name cannot name the module directory.
///
/// # Errors
///
/// Returns [`PackagerError::NotAModule`] naming the declared type, or
/// `<missing>`, and [`PackagerError::InvalidPackageName`] when the last
/// segment of the name is empty, `.` or `..`.
pub fn validate_module_type(manifest: &Manifest) -> Result<()> {
    let found = manifest.package_type();
    if found != Some(MODULE_TYPE) {
        return Err(PackagerError::NotAModule {
            name: manifest.name().to_owned(),
            found: found.unwrap_or("<missing>").to_owned(),
        });
    }

    let name = manifest.name();
    let segment = name.rsplit('/').next().unwrap_or_default().trim();
    if matches!(segment, "" | "." | "..") {
        return Err(PackagerError::InvalidPackageName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

/// Classifies `require`, rewrites the lock file and writes the manifest
/// back to the repository.
///
/// # Errors
///
/// Returns the first type lookup, lock or manifest write failure.
pub fn classify_dependencies(
    config: &RunConfig,
    composer: &Composer,
    executor: &dyn CommandExecutor,
    manifest: &mut Manifest,
) -> Result<Classification> {
    let repository_dir = config.repository_dir();
    let vcs = VcsRepositorySource::new(&manifest.repositories(), executor);
    let show = ComposerShowSource::new(composer, executor, repository_dir);
    let types = ChainedTypeSource::new(vec![&vcs, &show]);

    let mut classification = DependencyClassifier::new(&types).classify(manifest)?;
    classification.lock_replaced = rewrite_lock(repository_dir, manifest)?;
    let written = manifest.write_to(repository_dir)?;
    log::debug!("rewrote {written}");

    Ok(classification)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
