//! Contao host conventions.
//!
//! Constants describing how the legacy Contao host finds modules and which
//! Composer packages belong to the host itself.

use regex::Regex;
use std::sync::LazyLock;

/// Manifest `type` a component must declare to be packaged.
pub const MODULE_TYPE: &str = "contao-module";

/// Host directory holding legacy modules, relative to the host root.
pub const MODULE_ROOT: &str = "system/modules";

/// Package types that mark a dependency as a legacy module.
pub const LEGACY_MODULE_TYPES: &[&str] = &["legacy-contao-module", "contao-module"];

/// Package type assumed when no source reports one.
pub const DEFAULT_PACKAGE_TYPE: &str = "library";

/// Core and installer packages provided by the host system itself.
pub const CORE_PACKAGES: &[&str] = &[
    "contao",
    "contao/core",
    "contao-community-alliance/composer",
    "contao-community-alliance/composer-installer",
    "contao-community-alliance/composer-plugin",
];

/// Name prefix of legacy modules mirrored into Composer.
pub const LEGACY_NAMESPACE_PREFIX: &str = "contao-legacy/";

/// Directory of the module that receives Composer's installed vendor tree.
pub const VENDOR_DIR: &str = "classes/vendor";

static MODULE_PATH_PATTERN: LazyLock<Regex> = LazyLock::new(module_path_pattern);

#[expect(clippy::expect_used, reason = "the pattern is a compile-time constant")]
fn module_path_pattern() -> Regex {
    Regex::new(r"^system/modules/[^/]+").expect("module path pattern is valid")
}

/// Returns the module path prefix of `target`, if it lies inside the host's
/// module directory.
///
/// # Examples
///
/// ```
/// use contao_packager::host::module_path_prefix;
///
/// assert_eq!(
///     module_path_prefix("system/modules/widget/config"),
///     Some("system/modules/widget")
/// );
/// assert_eq!(module_path_prefix("files/widget"), None);
/// ```
#[must_use]
pub fn module_path_prefix(target: &str) -> Option<&str> {
    MODULE_PATH_PATTERN.find(target).map(|m| m.as_str())
}

/// Returns true when `name` is one of the host's own packages.
#[must_use]
pub fn is_core_package(name: &str) -> bool {
    CORE_PACKAGES.contains(&name)
}

/// Returns true when `name` lives in the legacy module namespace.
#[must_use]
pub fn is_legacy_namespace(name: &str) -> bool {
    name.starts_with(LEGACY_NAMESPACE_PREFIX)
}

/// Returns true when `package_type` identifies a legacy module.
#[must_use]
pub fn is_legacy_module_type(package_type: &str) -> bool {
    LEGACY_MODULE_TYPES.contains(&package_type)
}

/// Returns true when a locked package must be dropped from the lock file.
///
/// The bare `contao` meta package is not matched here; it never appears in
/// lock files.
#[must_use]
pub fn is_replaced_lock_package(name: &str, package_type: &str) -> bool {
    (is_core_package(name) && name != "contao") || is_legacy_module_type(package_type)
}
