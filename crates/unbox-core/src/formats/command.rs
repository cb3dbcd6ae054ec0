//! 7z codec driving an external `7z` binary.
//!
//! The binary is started directly with an argument vector, never through a
//! shell, and with stdin closed so a password prompt cannot block.
//!
//! Exit codes: 0 is success, 2 is reported as a credential failure (7-Zip
//! uses it for every fatal error, wrong passwords included), anything else
//! is unclassified.

use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use tracing::debug;
use walkdir::WalkDir;

use crate::Credential;
use crate::ExtractError;
use crate::ExtractionReport;
use crate::ProgressCallback;
use crate::Result;
use crate::types::ProtectionStatus;

use super::ArchiveKind;
use super::traits::ArchiveCodec;

/// Exit code 7-Zip returns for fatal errors, including a wrong password.
pub const EXIT_FATAL: i32 = 2;

/// Longest stderr excerpt kept in error messages.
const STDERR_EXCERPT: usize = 512;

/// Outcome of one external command run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard error.
    pub stderr: String,
}

/// Runs an external program.
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args` to completion.
    fn run(&self, program: &Path, args: &[OsString]) -> std::io::Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> std::io::Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;

        Ok(CommandOutput {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Builds the argument vector for extracting `source` into `dest`.
///
/// Each value is a separate argument, so paths and passwords are passed
/// verbatim without quoting.
#[must_use]
pub fn extract_args(source: &Path, dest: &Path, credential: Option<&Credential>) -> Vec<OsString> {
    let mut args = vec![OsString::from("x"), source.as_os_str().to_owned()];

    let mut output = OsString::from("-o");
    output.push(dest.as_os_str());
    args.push(output);

    if let Some(credential) = credential {
        args.push(OsString::from(format!("-p{}", credential.expose())));
    }

    args.push(OsString::from("-y"));
    args
}

/// Builds the argument vector for testing `source` without a password.
#[must_use]
pub fn test_args(source: &Path) -> Vec<OsString> {
    vec![
        OsString::from("t"),
        source.as_os_str().to_owned(),
        OsString::from("-y"),
    ]
}

/// 7z codec over a command line binary.
#[derive(Debug, Clone)]
pub struct SevenZipCommand<R = ProcessRunner> {
    binary: PathBuf,
    runner: R,
}

impl SevenZipCommand<ProcessRunner> {
    /// Uses `binary`, started with [`ProcessRunner`].
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self::with_runner(binary, ProcessRunner)
    }
}

impl<R: CommandRunner> SevenZipCommand<R> {
    /// Uses `binary`, started with a custom runner.
    pub fn with_runner(binary: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }

    /// Path of the binary this adapter runs.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn run(&self, args: &[OsString]) -> Result<CommandOutput> {
        debug!(binary = %self.binary.display(), command = ?args.first(), "running 7z");
        self.runner.run(&self.binary, args).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExtractError::unsupported(format!(
                    "7z binary not found: {}",
                    self.binary.display()
                ))
            } else {
                ExtractError::unknown_with(
                    format!("failed to run {}", self.binary.display()),
                    e,
                )
            }
        })
    }
}

/// Maps a 7z exit status onto the extraction taxonomy.
///
/// # Errors
///
/// Returns `WrongCredential` for exit code 2 and `Unknown` for any other
/// non-zero code or a signal.
pub fn check_exit(output: &CommandOutput, credential_given: bool) -> Result<()> {
    match output.code {
        Some(0) => Ok(()),
        Some(EXIT_FATAL) => {
            let message = if credential_given {
                "credential rejected by 7z"
            } else {
                "7z failed; the archive may require a credential"
            };
            Err(ExtractError::WrongCredential {
                message: message.into(),
                source: None,
            })
        }
        Some(code) => Err(ExtractError::unknown(format!(
            "7z exited with code {code}: {}",
            excerpt(&output.stderr)
        ))),
        None => Err(ExtractError::unknown("7z was terminated by a signal")),
    }
}

fn excerpt(stderr: &str) -> &str {
    let trimmed = stderr.trim();
    match trimmed.char_indices().nth(STDERR_EXCERPT) {
        Some((end, _)) => &trimmed[..end],
        None => trimmed,
    }
}

impl<R: CommandRunner> ArchiveCodec for SevenZipCommand<R> {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::SevenZip
    }

    fn probe(&self, source: &Path) -> Result<ProtectionStatus> {
        let output = self.run(&test_args(source))?;
        match output.code {
            Some(0) => Ok(ProtectionStatus::Unprotected),
            Some(EXIT_FATAL) => Ok(ProtectionStatus::Protected),
            _ => check_exit(&output, false).map(|()| ProtectionStatus::Indeterminate),
        }
    }

    fn entries(
        &self,
        _source: &Path,
        _credential: Option<&Credential>,
    ) -> Result<Option<Vec<PathBuf>>> {
        Ok(None)
    }

    fn extract_all(
        &self,
        source: &Path,
        dest: &Path,
        credential: Option<&Credential>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionReport> {
        let output = self.run(&extract_args(source, dest, credential))?;
        check_exit(&output, credential.is_some())?;

        let mut report = ExtractionReport::new(ArchiveKind::SevenZip);
        for entry in WalkDir::new(dest).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| ExtractError::unknown_with("failed to scan 7z output", e))?;
            if entry.file_type().is_dir() {
                report.directories_created += 1;
            } else {
                let relative = entry.path().strip_prefix(dest).unwrap_or(entry.path());
                let len = entry.metadata().map(|m| m.len()).unwrap_or(0);
                report.files_extracted += 1;
                report.bytes_written = report.bytes_written.saturating_add(len);
                progress.on_entry_start(relative, 0, report.files_extracted);
                progress.on_bytes_written(len);
                progress.on_entry_complete(relative);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::NoopProgress;
    use crate::test_utils::RecordingRunner;
    use tempfile::TempDir;

    #[test]
    fn test_extract_args_without_credential() {
        let args = extract_args(Path::new("/in/a b.7z"), Path::new("/out dir"), None);
        assert_eq!(
            args,
            vec![
                OsString::from("x"),
                OsString::from("/in/a b.7z"),
                OsString::from("-o/out dir"),
                OsString::from("-y"),
            ]
        );
    }

    #[test]
    fn test_extract_args_keep_quotes_verbatim() {
        let credential = Credential::new("it's \"quoted\"");
        let args = extract_args(Path::new("x'.7z"), Path::new("o"), Some(&credential));
        assert_eq!(args[1], OsString::from("x'.7z"));
        assert_eq!(args[3], OsString::from("-pit's \"quoted\""));
    }

    #[test]
    fn test_exit_code_mapping() {
        let out = |code| CommandOutput {
            code,
            stderr: "ERROR: something".into(),
        };

        assert!(check_exit(&out(Some(0)), false).is_ok());
        assert_eq!(
            check_exit(&out(Some(2)), true).unwrap_err().kind(),
            ErrorKind::WrongCredential
        );
        assert_eq!(
            check_exit(&out(Some(2)), false).unwrap_err().kind(),
            ErrorKind::WrongCredential
        );
        let err = check_exit(&out(Some(7)), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.to_string().contains("code 7"));
        assert_eq!(
            check_exit(&out(None), false).unwrap_err().kind(),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn test_extract_runs_binary_with_argv() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::exiting_with(0);
        let codec = SevenZipCommand::with_runner("/usr/bin/7z", runner.clone());
        let credential = Credential::new("pw");

        let report = codec
            .extract_all(
                Path::new("in.7z"),
                temp.path(),
                Some(&credential),
                &mut NoopProgress,
            )
            .unwrap();

        assert_eq!(report.files_extracted, 0);
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PathBuf::from("/usr/bin/7z"));
        assert_eq!(calls[0].1[0], OsString::from("x"));
        assert!(calls[0].1.contains(&OsString::from("-ppw")));
    }

    #[test]
    fn test_extract_counts_output_written_by_binary() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::exiting_with(0).writing(&[("dir/a.txt", "abc")]);
        let codec = SevenZipCommand::with_runner("7z", runner);

        let report = codec
            .extract_all(Path::new("in.7z"), temp.path(), None, &mut NoopProgress)
            .unwrap();

        assert_eq!(report.files_extracted, 1);
        assert_eq!(report.directories_created, 1);
        assert_eq!(report.bytes_written, 3);
    }

    #[test]
    fn test_extract_wrong_password() {
        let temp = TempDir::new().unwrap();
        let codec = SevenZipCommand::with_runner("7z", RecordingRunner::exiting_with(2));
        let credential = Credential::new("bad");

        let err = codec
            .extract_all(Path::new("in.7z"), temp.path(), Some(&credential), &mut NoopProgress)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongCredential);
    }

    #[test]
    fn test_probe_uses_test_command() {
        let runner = RecordingRunner::exiting_with(2);
        let codec = SevenZipCommand::with_runner("7z", runner.clone());

        assert_eq!(
            codec.probe(Path::new("in.7z")).unwrap(),
            ProtectionStatus::Protected
        );
        assert_eq!(runner.calls()[0].1[0], OsString::from("t"));
        assert!(codec.entries(Path::new("in.7z"), None).unwrap().is_none());
    }

    #[test]
    fn test_missing_binary_is_unsupported() {
        let temp = TempDir::new().unwrap();
        let codec = SevenZipCommand::new(temp.path().join("no-such-7z-binary"));

        let err = codec.probe(Path::new("in.7z")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
}
