//! Contao packager CLI entrypoint.
//!
//! This binary repackages a Composer-managed Contao component as a legacy
//! `system/modules` package. Progress is reported on stderr.

use clap::Parser;
use contao_packager::cli::Cli;
use contao_packager::error::Result;
use contao_packager::output::write_stderr_line;
use contao_packager::pipeline::run_with_system;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let config = cli.to_config()?;
    run_with_system(&config, stderr)?;
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use contao_packager::error::PackagerError;
    use tempfile::TempDir;

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_error_and_returns_one() {
        let err = PackagerError::NotAModule {
            name: "acme/lib".to_owned(),
            found: "library".to_owned(),
        };

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.contains("project acme/lib does not seem to be a contao module"));
    }

    #[test]
    fn run_rejects_invalid_configuration_before_packaging() {
        let cli = Cli {
            repository_dir: Utf8PathBuf::from("/definitely/not/here"),
            ..Cli::default()
        };

        let mut stderr = Vec::new();
        let err = run(&cli, &mut stderr).expect_err("expected rejection");
        assert!(matches!(err, PackagerError::InvalidConfig { .. }));
        assert!(stderr.is_empty());
    }

    #[test]
    fn dry_run_reports_without_side_effects() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("temp dir path not UTF-8");
        std::fs::write(
            root.join("composer.json"),
            r#"{"name": "acme/widget", "type": "contao-module"}"#,
        )
        .expect("failed to write manifest");
        let cli = Cli {
            repository_dir: root.clone(),
            package_dir: root.join("package"),
            dry_run: true,
            ..Cli::default()
        };

        let mut stderr = Vec::new();
        run(&cli, &mut stderr).expect("dry run should succeed");

        let text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(text.contains("Module path: system/modules/widget"));
        assert!(!root.join("package").exists());
    }
}
