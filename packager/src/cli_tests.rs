//! Tests for packager CLI parsing and configuration conversion.

use super::*;
use rstest::rstest;
use tempfile::TempDir;

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["contao-packager", "--package-dir", "build"]);
    assert_eq!(cli.repository_dir, Utf8PathBuf::from("."));
    assert_eq!(cli.package_dir, Utf8PathBuf::from("build"));
    assert!(cli.config_file.is_none());
    assert!(cli.repository.is_none());
    assert!(cli.composer_dir.is_none());
    assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
    assert_eq!(cli.php, DEFAULT_PHP);
    assert!(!cli.dry_run);
    assert!(!cli.quiet);
}

#[test]
fn cli_requires_package_dir() {
    let result = Cli::try_parse_from(["contao-packager"]);
    assert!(result.is_err());
}

#[test]
fn cli_parses_every_flag() {
    let cli = Cli::parse_from([
        "contao-packager",
        "-r",
        "/src/widget",
        "-p",
        "/build/widget",
        "-c",
        "/src/override.json",
        "--repository",
        "https://github.com/acme/widget",
        "--composer-dir",
        "/opt/composer",
        "--timeout",
        "60",
        "--php",
        "php5.6",
        "--dry-run",
        "--quiet",
    ]);

    assert_eq!(cli.repository_dir, Utf8PathBuf::from("/src/widget"));
    assert_eq!(cli.package_dir, Utf8PathBuf::from("/build/widget"));
    assert_eq!(cli.config_file, Some(Utf8PathBuf::from("/src/override.json")));
    assert_eq!(cli.repository.as_deref(), Some("https://github.com/acme/widget"));
    assert_eq!(cli.composer_dir, Some(Utf8PathBuf::from("/opt/composer")));
    assert_eq!(cli.timeout, 60);
    assert_eq!(cli.php, "php5.6");
    assert!(cli.dry_run);
    assert!(cli.quiet);
}

#[rstest]
#[case::negative("-5")]
#[case::word("soon")]
fn cli_rejects_invalid_timeout(#[case] value: &str) {
    let result = Cli::try_parse_from(["contao-packager", "-p", "build", "--timeout", value]);
    assert!(result.is_err());
}

#[test]
fn to_config_carries_every_setting() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("temp dir path not UTF-8");
    let cli = Cli {
        repository_dir: root.clone(),
        package_dir: root.join("package"),
        repository: Some("git@example.com:acme/widget.git".to_owned()),
        timeout: 42,
        quiet: true,
        ..Cli::default()
    };

    let config = cli.to_config().expect("valid config");

    assert_eq!(config.repository_dir(), root);
    assert_eq!(config.composer_dir(), root);
    assert_eq!(config.repository_url(), Some("git@example.com:acme/widget.git"));
    assert_eq!(config.timeout(), Duration::from_secs(42));
    assert!(config.quiet());
}

#[rstest]
#[case::zero_timeout(Cli { timeout: 0, ..Cli::default() })]
#[case::missing_repository(Cli {
    repository_dir: Utf8PathBuf::from("/definitely/not/here"),
    ..Cli::default()
})]
fn to_config_rejects_invalid_settings(#[case] cli: Cli) {
    let err = cli.to_config().expect_err("expected rejection");
    assert!(err.is_validation());
}
