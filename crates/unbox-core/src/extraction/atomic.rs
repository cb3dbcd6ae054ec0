//! Atomic extraction through a staging directory.
//!
//! Output is first written to a hidden per-run directory inside the
//! destination. [`Staging::commit`] moves the staged tree into place only
//! after checking that nothing it contains already exists in the
//! destination. Dropping an uncommitted [`Staging`] removes it with all its
//! content.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use tempfile::TempDir;
use tracing::debug;
use tracing::warn;
use walkdir::WalkDir;

use crate::ExtractError;
use crate::ExtractionReport;
use crate::Result;
use crate::types::DestDir;

/// Name prefix of staging directories.
pub const STAGING_PREFIX: &str = ".unbox-staging-";

/// What a commit moved into the destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Regular files moved into the destination.
    pub files: usize,
    /// Directories that did not exist before and were created.
    pub directories: usize,
    /// Non-fatal cleanup failures after the output was in place.
    pub warnings: Vec<String>,
}

impl CommitSummary {
    /// Records the committed counts and warnings in `report`.
    pub fn apply_to(self, report: &mut ExtractionReport) {
        report.files_extracted = self.files;
        report.directories_created = self.directories;
        for warning in self.warnings {
            report.add_warning(warning);
        }
    }
}

/// Per-run staging directory.
#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
    dest: PathBuf,
}

impl Staging {
    /// Creates an empty staging directory inside `dest`.
    pub fn create(dest: &DestDir) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(dest.as_path())
            .map_err(|e| {
                ExtractError::unknown_with(
                    format!(
                        "failed to create staging directory in {}",
                        dest.as_path().display()
                    ),
                    e,
                )
            })?;

        debug!(staging = %dir.path().display(), "created staging directory");
        Ok(Self {
            dir,
            dest: dest.as_path().to_path_buf(),
        })
    }

    /// Directory that receives staged output.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Moves the staged tree into the destination.
    ///
    /// Nothing is moved if any staged file already exists in the
    /// destination, or if a staged directory exists there as a non-directory.
    /// Existing directories are merged into. Files are moved without
    /// replacement, so a file that appears in the destination after the
    /// check still fails the commit. If a move fails part way, files already
    /// moved are taken back out of the destination.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` naming the first collision, or `Unknown` if a
    /// filesystem operation fails.
    pub fn commit(self) -> Result<CommitSummary> {
        let staged = self.staged_entries()?;

        for (relative, is_dir) in &staged {
            let target = self.dest.join(relative);
            let Ok(existing) = fs::symlink_metadata(&target) else {
                continue;
            };
            if !*is_dir || !existing.is_dir() {
                return Err(ExtractError::AlreadyExists { path: target });
            }
        }

        let mut created_dirs: Vec<PathBuf> = Vec::new();
        let mut moved_files: Vec<PathBuf> = Vec::new();

        for (relative, is_dir) in &staged {
            let target = self.dest.join(relative);
            let outcome = if *is_dir {
                ensure_directory(&target, &mut created_dirs)
            } else {
                move_no_replace(&self.dir.path().join(relative), &target, &mut moved_files)
            };

            if let Err(e) = outcome {
                rollback(&moved_files, &created_dirs);
                return Err(if e.kind() == std::io::ErrorKind::AlreadyExists {
                    ExtractError::AlreadyExists { path: target }
                } else {
                    ExtractError::unknown_with(
                        format!("failed to move {} into place", target.display()),
                        e,
                    )
                });
            }
        }

        let mut summary = CommitSummary {
            files: moved_files.len(),
            directories: created_dirs.len(),
            warnings: Vec::new(),
        };
        if let Some(warning) = remove_staging(self.dir) {
            summary.warnings.push(warning);
        }

        debug!(files = summary.files, directories = summary.directories, "committed staged output");
        Ok(summary)
    }

    /// Staged paths relative to the staging root, parents before children.
    fn staged_entries(&self) -> Result<Vec<(PathBuf, bool)>> {
        let root = self.dir.path();
        let mut entries = Vec::new();

        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = entry
                .map_err(|e| ExtractError::unknown_with("failed to scan staging directory", e))?;
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| ExtractError::unknown_with("staged path outside staging root", e))?
                .to_path_buf();
            entries.push((relative, entry.file_type().is_dir()));
        }

        Ok(entries)
    }
}

/// Removes the emptied staging directory. A failure leaves the committed
/// output intact and is returned as a warning.
fn remove_staging(dir: TempDir) -> Option<String> {
    let path = dir.path().to_path_buf();
    let error = dir.close().err()?;
    warn!(staging = %path.display(), error = %error, "failed to remove staging directory");
    Some(format!(
        "failed to remove staging directory {}: {error}",
        path.display()
    ))
}

/// Creates `target` unless a directory is already there, which may have
/// been created by a concurrent commit.
fn ensure_directory(target: &Path, created_dirs: &mut Vec<PathBuf>) -> std::io::Result<()> {
    match fs::create_dir(target) {
        Ok(()) => {
            created_dirs.push(target.to_path_buf());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && target.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Moves a staged file to `target`, failing with `AlreadyExists` instead of
/// replacing an existing file. The link is created atomically, so two
/// commits racing for the same path cannot both succeed.
fn move_no_replace(
    staged: &Path,
    target: &Path,
    moved_files: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    fs::hard_link(staged, target)?;
    moved_files.push(target.to_path_buf());
    fs::remove_file(staged)
}

fn rollback(moved_files: &[PathBuf], created_dirs: &[PathBuf]) {
    for file in moved_files.iter().rev() {
        if let Err(e) = fs::remove_file(file) {
            warn!(path = %file.display(), error = %e, "failed to roll back moved file");
        }
    }
    for dir in created_dirs.iter().rev() {
        if let Err(e) = fs::remove_dir(dir) {
            warn!(path = %dir.display(), error = %e, "failed to roll back created directory");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn staging_dirs(dest: &Path) -> usize {
        fs::read_dir(dest)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .starts_with(STAGING_PREFIX)
            })
            .count()
    }

    #[test]
    fn test_staging_is_inside_destination() {
        let temp = TempDir::new().unwrap();
        let dest = DestDir::new(temp.path()).unwrap();
        let staging = Staging::create(&dest).unwrap();

        assert!(staging.path().starts_with(dest.as_path()));
        assert_eq!(staging_dirs(dest.as_path()), 1);
    }

    #[test]
    fn test_drop_removes_staging() {
        let temp = TempDir::new().unwrap();
        let dest = DestDir::new(temp.path()).unwrap();
        {
            let staging = Staging::create(&dest).unwrap();
            fs::write(staging.path().join("partial.bin"), b"half").unwrap();
        }

        assert_eq!(fs::read_dir(dest.as_path()).unwrap().count(), 0);
    }

    #[test]
    fn test_commit_moves_tree_and_merges_directories() {
        let temp = TempDir::new().unwrap();
        let dest = DestDir::new(temp.path()).unwrap();
        fs::create_dir(dest.as_path().join("shared")).unwrap();
        fs::write(dest.as_path().join("shared/keep.txt"), b"keep").unwrap();

        let staging = Staging::create(&dest).unwrap();
        fs::create_dir_all(staging.path().join("shared/new")).unwrap();
        fs::write(staging.path().join("shared/new/a.txt"), b"a").unwrap();
        fs::write(staging.path().join("top.txt"), b"top").unwrap();

        let summary = staging.commit().unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(summary.directories, 1);
        assert_eq!(fs::read(dest.as_path().join("shared/new/a.txt")).unwrap(), b"a");
        assert_eq!(fs::read(dest.as_path().join("shared/keep.txt")).unwrap(), b"keep");
        assert_eq!(staging_dirs(dest.as_path()), 0);
    }

    #[test]
    fn test_commit_refuses_existing_file() {
        let temp = TempDir::new().unwrap();
        let dest = DestDir::new(temp.path()).unwrap();
        fs::write(dest.as_path().join("b.txt"), b"original").unwrap();

        let staging = Staging::create(&dest).unwrap();
        fs::write(staging.path().join("a.txt"), b"new a").unwrap();
        fs::write(staging.path().join("b.txt"), b"new b").unwrap();

        let err = staging.commit().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert!(err.to_string().contains("b.txt"));

        // Nothing moved, nothing left behind.
        assert!(!dest.as_path().join("a.txt").exists());
        assert_eq!(fs::read(dest.as_path().join("b.txt")).unwrap(), b"original");
        assert_eq!(staging_dirs(dest.as_path()), 0);
    }

    #[test]
    fn test_commit_refuses_file_where_directory_is_staged() {
        let temp = TempDir::new().unwrap();
        let dest = DestDir::new(temp.path()).unwrap();
        fs::write(dest.as_path().join("dir"), b"a file").unwrap();

        let staging = Staging::create(&dest).unwrap();
        fs::create_dir(staging.path().join("dir")).unwrap();
        fs::write(staging.path().join("dir/inner.txt"), b"x").unwrap();

        let err = staging.commit().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_move_does_not_replace_existing_file() {
        let temp = TempDir::new().unwrap();
        let staged = temp.path().join("staged.txt");
        let target = temp.path().join("target.txt");
        fs::write(&staged, b"new").unwrap();
        fs::write(&target, b"original").unwrap();
        let mut moved = Vec::new();

        let err = move_no_replace(&staged, &target, &mut moved).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert!(moved.is_empty());
        assert_eq!(fs::read(&target).unwrap(), b"original");
        assert!(staged.exists());
    }

    #[test]
    fn test_racing_commits_never_overwrite() {
        let temp = TempDir::new().unwrap();

        for round in 0..20 {
            let dest = DestDir::prepare(&temp.path().join(format!("round-{round}"))).unwrap();
            let stagings: Vec<Staging> = (0..2)
                .map(|writer| {
                    let staging = Staging::create(&dest).unwrap();
                    for page in 0..50 {
                        fs::write(
                            staging.path().join(format!("{page}.jpg")),
                            format!("writer {writer}"),
                        )
                        .unwrap();
                    }
                    staging
                })
                .collect();
            let barrier = std::sync::Barrier::new(2);

            let results: Vec<Result<CommitSummary>> = std::thread::scope(|scope| {
                let handles: Vec<_> = stagings
                    .into_iter()
                    .map(|staging| {
                        let barrier = &barrier;
                        scope.spawn(move || {
                            barrier.wait();
                            staging.commit()
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            let committed = results.iter().filter(|r| r.is_ok()).count();
            assert_eq!(committed, 1, "round {round}");
            let refused = results.iter().find_map(|r| r.as_ref().err()).unwrap();
            assert_eq!(refused.kind(), ErrorKind::AlreadyExists, "round {round}");

            let first = fs::read(dest.as_path().join("0.jpg")).unwrap();
            for page in 1..50 {
                let content = fs::read(dest.as_path().join(format!("{page}.jpg"))).unwrap();
                assert_eq!(content, first, "round {round} mixed output");
            }
            assert_eq!(staging_dirs(dest.as_path()), 0);
        }
    }

    #[test]
    fn test_staging_removal_failure_becomes_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::remove_dir(dir.path()).unwrap();

        let warning = remove_staging(dir).unwrap();
        assert!(warning.contains("failed to remove staging directory"));
    }

    #[test]
    fn test_summary_applies_to_report() {
        let summary = CommitSummary {
            files: 3,
            directories: 1,
            warnings: vec!["left behind".to_string()],
        };
        let mut report = ExtractionReport::new(crate::formats::ArchiveKind::Zip);

        summary.apply_to(&mut report);

        assert_eq!(report.files_extracted, 3);
        assert_eq!(report.directories_created, 1);
        assert_eq!(report.warnings, ["left behind"]);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_rollback_warns_when_directory_stays() {
        let temp = TempDir::new().unwrap();
        let created = temp.path().join("shared");
        fs::create_dir(&created).unwrap();
        fs::write(created.join("foreign.txt"), b"not ours").unwrap();

        rollback(&[], &[created.clone()]);

        assert!(created.join("foreign.txt").exists());
        assert!(logs_contain("failed to roll back created directory"));
    }
}
