//! Unit tests for the manifest model.

use super::*;
use rstest::{fixture, rstest};

#[fixture]
fn manifest() -> Manifest {
    Manifest::parse(
        r#"{
            "name": "acme/widget",
            "type": "contao-module",
            "description": "kept verbatim",
            "require": {"acme/legacy": "1.0", "acme/util": "2.0"},
            "repositories": [
                {"type": "vcs", "url": "https://example.com/acme/legacy.git"},
                {"type": "composer", "url": "https://legacy-packages-via.contao-community-alliance.org"}
            ],
            "autoload": {
                "psr-0": {"Acme\\": ["src", "lib"], "Other_": "legacy"},
                "psr-4": {"Acme\\Widget\\": "src4"},
                "classmap": ["classes/", "helpers.php"]
            },
            "extra": {
                "contao": {
                    "symlinks": {"assets": "system/modules/widget/assets"},
                    "sources": {"module": "system/modules/widget"},
                    "runonce": ["runonce/update.php", "runonce/cleanup.php"]
                }
            }
        }"#,
        Utf8Path::new("composer.json"),
    )
    .expect("fixture manifest should parse")
}

#[rstest]
fn typed_accessors_read_declared_sections(manifest: Manifest) {
    assert_eq!(manifest.name(), "acme/widget");
    assert_eq!(manifest.package_type(), Some("contao-module"));
    assert_eq!(manifest.require().len(), 2);
    assert!(manifest.replace().is_empty());
    assert!(manifest.requires("acme/legacy"));
}

#[rstest]
fn repositories_keep_kind_and_url(manifest: Manifest) {
    let repositories = manifest.repositories();
    assert_eq!(repositories.len(), 2);
    assert!(repositories.first().is_some_and(RepositoryConfig::is_version_control));
    assert!(!repositories.get(1).is_some_and(RepositoryConfig::is_version_control));
}

#[rstest]
fn autoload_roots_follow_scan_order(manifest: Manifest) {
    let autoload = manifest.autoload();
    assert_eq!(
        autoload.source_paths(),
        vec!["src", "lib", "legacy", "src4", "classes/", "helpers.php"]
    );
}

#[rstest]
fn contao_hints_preserve_declaration_order(manifest: Manifest) {
    let hints = manifest.contao_hints();
    assert_eq!(
        hints.symlinks,
        vec![("assets".to_owned(), "system/modules/widget/assets".to_owned())]
    );
    assert_eq!(
        hints.runonce,
        vec!["runonce/update.php", "runonce/cleanup.php"]
    );
}

#[rstest]
fn moving_a_dependency_updates_require_and_replace(mut manifest: Manifest) {
    let constraint = manifest.remove_require("acme/legacy");
    manifest.add_replace("acme/legacy");

    assert_eq!(constraint.as_deref(), Some("1.0"));
    assert_eq!(
        manifest.require(),
        vec![("acme/util".to_owned(), "2.0".to_owned())]
    );
    assert_eq!(
        manifest.replace(),
        vec![("acme/legacy".to_owned(), "*".to_owned())]
    );
}

#[rstest]
fn empty_require_is_dropped(mut manifest: Manifest) {
    manifest.remove_require("acme/legacy");
    manifest.drop_empty_require();
    assert!(manifest.document().contains_key("require"));

    manifest.remove_require("acme/util");
    manifest.drop_empty_require();
    assert!(!manifest.document().contains_key("require"));
}

#[rstest]
fn pretty_json_keeps_key_order_and_unknown_keys(manifest: Manifest) {
    let text = manifest
        .to_pretty_json(Utf8Path::new("composer.json"))
        .expect("serialisation should succeed");

    let name_at = text.find("\"name\"").expect("name key present");
    let extra_at = text.find("\"extra\"").expect("extra key present");
    assert!(name_at < extra_at);
    assert!(text.contains("kept verbatim"));
    assert!(text.contains("\n    \"type\""));
    assert!(text.ends_with('\n'));
}

#[test]
fn missing_sections_yield_empty_views() {
    let manifest = Manifest::parse(r#"{"name": "acme/bare"}"#, Utf8Path::new("composer.json"))
        .expect("manifest should parse");

    assert_eq!(manifest.package_type(), None);
    assert!(manifest.require().is_empty());
    assert!(manifest.repositories().is_empty());
    assert!(manifest.autoload().is_empty());
    assert_eq!(manifest.contao_hints(), ContaoHints::default());
}

#[test]
fn list_shaped_symlinks_map_onto_themselves() {
    let manifest = Manifest::parse(
        r#"{"extra": {"contao": {"sources": ["system/modules/bare"], "symlinks": []}}}"#,
        Utf8Path::new("composer.json"),
    )
    .expect("manifest should parse");

    let hints = manifest.contao_hints();
    assert!(hints.symlinks.is_empty());
    assert_eq!(
        hints.sources,
        vec![(
            "system/modules/bare".to_owned(),
            "system/modules/bare".to_owned()
        )]
    );
}
