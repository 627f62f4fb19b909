//! Build provenance.
//!
//! Captures which revision of the component was packaged and writes it to
//! the module's `RELEASE` file.

use crate::assemble::write_file;
use crate::classify::DependencyRecord;
use crate::error::Result;
use crate::module_path::ModulePath;
use crate::process::{CommandExecutor, run_for_stdout};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// Name of the provenance file inside the module directory.
pub const RELEASE_FILE: &str = "RELEASE";

/// Provenance of one packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    /// Source repository identifier; empty when not configured.
    pub url: String,
    /// `git describe --all HEAD`.
    pub head: String,
    /// Commit hash of `HEAD`.
    pub commit: String,
    /// Commit date of `HEAD` in RFC 2822 form.
    pub datetime: String,
}

impl ReleaseDescriptor {
    /// Reads the provenance of the repository checked out in
    /// `repository_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PackagerError::ExternalProcess`] when any git
    /// command fails or times out.
    pub fn capture(
        executor: &dyn CommandExecutor,
        repository_dir: &Utf8Path,
        url: Option<&str>,
    ) -> Result<Self> {
        let git = |args: &[&str]| run_for_stdout(executor, "git", args, Some(repository_dir));

        Ok(Self {
            url: url.unwrap_or_default().to_owned(),
            head: git(&["describe", "--all", "HEAD"])?,
            commit: git(&["rev-parse", "HEAD"])?,
            datetime: git(&["log", "-1", "--format=format:%cD", "HEAD"])?,
        })
    }

    /// Writes `<package>/<module>/RELEASE`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PackagerError::WriteFailed`] if the file cannot
    /// be written.
    pub fn write(&self, package_dir: &Utf8Path, module: &ModulePath) -> Result<Utf8PathBuf> {
        let path = module.join_in(package_dir, RELEASE_FILE);
        write_file(&path, &self.to_string())?;
        Ok(path)
    }
}

impl fmt::Display for ReleaseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "url: {}\nhead: {}\ncommit: {}\ndatetime: {}",
            self.url, self.head, self.commit, self.datetime
        )
    }
}

/// Lines reminding the operator to declare the folded dependencies by hand.
///
/// Empty when nothing was folded.
#[must_use]
pub fn dependency_reminder<'a>(
    external: impl IntoIterator<Item = &'a DependencyRecord>,
) -> Vec<String> {
    let lines: Vec<String> = external
        .into_iter()
        .map(|dependency| format!("  * {} {}", dependency.name, dependency.constraint))
        .collect();
    if lines.is_empty() {
        return lines;
    }
    std::iter::once("  - Remember to define the dependencies".to_owned())
        .chain(lines)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::DependencyKind;
    use crate::error::PackagerError;
    use crate::module_path::name_derived_path;
    use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, stdout_output};
    use tempfile::TempDir;

    fn git_calls(describe: crate::error::Result<std::process::Output>) -> Vec<ExpectedCall> {
        vec![
            ExpectedCall::new("git", &["describe", "--all", "HEAD"], describe),
            ExpectedCall::new("git", &["rev-parse", "HEAD"], Ok(stdout_output("0123abcd\n"))),
            ExpectedCall::new(
                "git",
                &["log", "-1", "--format=format:%cD", "HEAD"],
                Ok(stdout_output("Tue, 3 Mar 2015 10:00:00 +0100")),
            ),
        ]
    }

    #[test]
    fn capture_reads_three_git_facts() {
        let executor = StubExecutor::new(git_calls(Ok(stdout_output("heads/master\n"))));

        let release = ReleaseDescriptor::capture(
            &executor,
            Utf8Path::new("/repo"),
            Some("https://github.com/acme/widget"),
        )
        .expect("capture");

        assert_eq!(
            release.to_string(),
            "url: https://github.com/acme/widget\nhead: heads/master\ncommit: 0123abcd\ndatetime: Tue, 3 Mar 2015 10:00:00 +0100"
        );
        executor.assert_finished();
    }

    #[test]
    fn failing_git_command_aborts() {
        let executor = StubExecutor::new(git_calls(Ok(failure_output("fatal: not a git repository"))));

        let err = ReleaseDescriptor::capture(&executor, Utf8Path::new("/repo"), None)
            .expect_err("expected failure");
        assert!(matches!(
            err,
            PackagerError::ExternalProcess { ref command, .. } if command == "git describe --all HEAD"
        ));
        assert_eq!(executor.remaining(), 2);
    }

    #[test]
    fn write_places_release_in_module() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let package = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("temp dir path not UTF-8");
        let release = ReleaseDescriptor {
            url: String::new(),
            head: "heads/main".to_owned(),
            commit: "abc".to_owned(),
            datetime: "now".to_owned(),
        };

        let path = release
            .write(&package, &name_derived_path("acme/widget"))
            .expect("write");

        assert_eq!(path, package.join("system/modules/widget/RELEASE"));
        let content = std::fs::read_to_string(path).expect("read");
        assert_eq!(content.lines().count(), 4);
        assert!(content.starts_with("url: \nhead: heads/main\n"));
    }

    #[test]
    fn reminder_lists_each_external_dependency() {
        let records = [DependencyRecord {
            name: "acme/legacy".to_owned(),
            constraint: "1.0".to_owned(),
            package_type: Some("legacy-contao-module".to_owned()),
            kind: DependencyKind::LegacyModule,
        }];

        assert_eq!(
            dependency_reminder(&records),
            vec!["  - Remember to define the dependencies", "  * acme/legacy 1.0"]
        );
        assert!(dependency_reminder(std::iter::empty()).is_empty());
    }
}
