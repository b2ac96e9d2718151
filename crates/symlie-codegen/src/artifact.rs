//! Rendered functions and the files they are written to.
//!
//! Writing is staged: every file is first written into a temporary
//! directory created inside the output directory, then moved into place.
//! Nothing lands in the output directory unless every file was rendered and
//! staged. If a move fails, files moved before it are removed or restored
//! from a backup, and directories created for them are removed again.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::Language;
use crate::error::{CodegenError, CodegenResult};

/// One file of a rendered function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path relative to the output directory.
    pub path: PathBuf,
    /// Full file contents.
    pub contents: String,
    /// Package index files (`__init__.py`, `mod.rs`) are merged line by line
    /// with an existing file instead of replacing it.
    pub merge: bool,
}

/// A function rendered in memory, before anything touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFunction {
    /// Name as spelled in the target language.
    pub name: String,
    /// Target language.
    pub language: Language,
    /// Namespace the function was rendered into.
    pub namespace: String,
    /// Declaration line of the function.
    pub signature: String,
    /// Statements between the braces (or below the `def`).
    pub body: String,
    /// Files to write, the function's own source first.
    pub files: Vec<GeneratedFile>,
}

impl GeneratedFunction {
    /// Contents of the file holding the function.
    pub fn source(&self) -> &str {
        self.files.first().map_or("", |f| f.contents.as_str())
    }
}

/// Result of writing a function to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    /// Root the files were written under.
    pub output_dir: PathBuf,
    /// Absolute paths of every file written.
    pub generated_files: Vec<PathBuf>,
    /// `output_dir/<language>/<namespace>`.
    pub function_dir: PathBuf,
    /// The rendered function.
    pub function: GeneratedFunction,
}

fn merged(target: &Path, contents: &str) -> CodegenResult<String> {
    if !target.exists() {
        return Ok(contents.to_string());
    }
    let existing = fs::read_to_string(target)?;
    let mut lines: Vec<&str> = existing.lines().collect();
    for line in contents.lines() {
        if !line.trim().is_empty() && !lines.contains(&line) {
            lines.push(line);
        }
    }
    Ok(lines.join("\n") + "\n")
}

/// Stages `files` inside `output_dir`, then moves them into place.
pub(crate) fn write_staged(output_dir: &Path, files: &[GeneratedFile]) -> CodegenResult<Vec<PathBuf>> {
    let mut created_root: Vec<PathBuf> = output_dir
        .ancestors()
        .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !ancestor.exists())
        .map(Path::to_path_buf)
        .collect();
    created_root.reverse();
    let made = fs::create_dir_all(output_dir).map_err(CodegenError::from);
    match made.and_then(|()| stage_and_commit(output_dir, files)) {
        Ok(written) => Ok(written),
        Err(error) => Err(roll_back(error, &[], &created_root)),
    }
}

fn stage_and_commit(output_dir: &Path, files: &[GeneratedFile]) -> CodegenResult<Vec<PathBuf>> {
    let staging = tempfile::Builder::new()
        .prefix(".symlie_staging_")
        .tempdir_in(output_dir)?;

    let mut staged = Vec::with_capacity(files.len());
    for file in files {
        let target = output_dir.join(&file.path);
        let contents = if file.merge {
            merged(&target, &file.contents)?
        } else {
            file.contents.clone()
        };
        let mut temporary = NamedTempFile::new_in(staging.path())?;
        temporary.write_all(contents.as_bytes())?;
        temporary.flush()?;
        staged.push((temporary, target));
    }

    let mut committed = Vec::with_capacity(staged.len());
    let mut created_dirs = Vec::new();
    for (i, (temporary, target)) in staged.into_iter().enumerate() {
        let backup = staging.path().join(format!("backup_{i}"));
        match commit(temporary, &target, backup, output_dir, &mut created_dirs) {
            Ok(entry) => {
                debug!(path = %target.display(), "wrote generated file");
                committed.push(entry);
            }
            Err(error) => return Err(roll_back(error, &committed, &created_dirs)),
        }
    }
    Ok(committed.into_iter().map(Committed::into_target).collect())
}

/// A file moved into the output directory.
enum Committed {
    /// Nothing was there before.
    Created(PathBuf),
    /// An existing file was overwritten; its old contents are in `backup`.
    Replaced { target: PathBuf, backup: PathBuf },
}

impl Committed {
    fn into_target(self) -> PathBuf {
        match self {
            Self::Created(target) | Self::Replaced { target, .. } => target,
        }
    }
}

/// Directories from `output_dir` down to `dir` that do not exist yet,
/// outermost first.
fn missing_dirs(output_dir: &Path, dir: &Path) -> Vec<PathBuf> {
    let mut missing: Vec<PathBuf> = dir
        .ancestors()
        .take_while(|ancestor| *ancestor != output_dir && !ancestor.exists())
        .map(Path::to_path_buf)
        .collect();
    missing.reverse();
    missing
}

fn commit(
    temporary: NamedTempFile,
    target: &Path,
    backup: PathBuf,
    output_dir: &Path,
    created_dirs: &mut Vec<PathBuf>,
) -> CodegenResult<Committed> {
    if let Some(parent) = target.parent() {
        let missing = missing_dirs(output_dir, parent);
        let made = fs::create_dir_all(parent);
        created_dirs.extend(missing);
        made?;
    }
    let entry = if target.is_file() {
        fs::copy(target, &backup)?;
        Committed::Replaced {
            target: target.to_path_buf(),
            backup,
        }
    } else {
        Committed::Created(target.to_path_buf())
    };
    temporary
        .persist(target)
        .map_err(|e| CodegenError::from(e.error))?;
    Ok(entry)
}

/// Undoes `committed` newest first, then removes the directories made for
/// it. Anything that cannot be undone is logged and appended to the error.
fn roll_back(error: CodegenError, committed: &[Committed], created_dirs: &[PathBuf]) -> CodegenError {
    let mut failures = Vec::new();
    for entry in committed.iter().rev() {
        let (path, undone) = match entry {
            Committed::Created(target) => (target, fs::remove_file(target)),
            Committed::Replaced { target, backup } => (target, fs::rename(backup, target)),
        };
        if let Err(e) = undone {
            warn!(path = %path.display(), error = %e, "could not roll back generated file");
            failures.push(format!("{}: {e}", path.display()));
        }
    }
    for dir in created_dirs.iter().rev() {
        match fs::remove_dir(dir) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                warn!(path = %dir.display(), error = %e, "could not remove generated directory");
                failures.push(format!("{}: {e}", dir.display()));
            }
            _ => {}
        }
    }
    if failures.is_empty() {
        return error;
    }
    let cause = match error {
        CodegenError::Io { message } => message,
        other => other.to_string(),
    };
    CodegenError::Io {
        message: format!("{cause}; rollback incomplete: {}", failures.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file(path: &str, contents: &str, merge: bool) -> GeneratedFile {
        GeneratedFile {
            path: PathBuf::from(path),
            contents: contents.to_string(),
            merge,
        }
    }

    #[test]
    fn test_files_land_and_staging_is_removed() {
        let dir = TempDir::new().unwrap();
        let written = write_staged(dir.path(), &[file("a/b/f.h", "x\n", false)]).unwrap();
        assert_eq!(written, [dir.path().join("a/b/f.h")]);
        assert_eq!(fs::read_to_string(&written[0]).unwrap(), "x\n");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".symlie_staging_"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_index_files_merge() {
        let dir = TempDir::new().unwrap();
        write_staged(dir.path(), &[file("pkg/__init__.py", "from .f import f\n", true)]).unwrap();
        write_staged(dir.path(), &[file("pkg/__init__.py", "from .g import g\n", true)]).unwrap();
        let init = fs::read_to_string(dir.path().join("pkg/__init__.py")).unwrap();
        assert_eq!(init, "from .f import f\nfrom .g import g\n");
    }

    #[test]
    fn test_output_dir_that_is_a_file_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "keep").unwrap();
        let result = write_staged(&blocker, &[file("f.h", "x", false)]);
        assert!(matches!(result, Err(CodegenError::Io { .. })));
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "keep");
    }

    #[test]
    fn test_failed_move_restores_previous_state() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/old.h"), "old\n").unwrap();
        fs::create_dir_all(dir.path().join("taken/inner")).unwrap();

        let result = write_staged(
            dir.path(),
            &[
                file("fresh.h", "fresh\n", false),
                file("sub/old.h", "new\n", false),
                file("deep/er/f.h", "f\n", false),
                file("taken", "cannot replace a directory", false),
            ],
        );
        assert!(matches!(result, Err(CodegenError::Io { .. })));

        assert!(!dir.path().join("fresh.h").exists());
        assert_eq!(fs::read_to_string(dir.path().join("sub/old.h")).unwrap(), "old\n");
        assert!(!dir.path().join("deep").exists());
        assert!(dir.path().join("taken/inner").is_dir());
        let mut left: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        left.sort();
        assert_eq!(left, ["sub", "taken"]);
    }

    #[test]
    fn test_failed_write_removes_created_output_dir() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out/nested");
        fs::create_dir_all(dir.path().join("taken")).unwrap();
        let result = write_staged(&output, &[file("../../taken", "x", false)]);
        assert!(result.is_err());
        assert!(!dir.path().join("out").exists());
        assert!(dir.path().join("taken").is_dir());
    }

    #[test]
    fn test_missing_dirs_are_listed_outermost_first() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        let missing = missing_dirs(dir.path(), &dir.path().join("a/b/c"));
        assert_eq!(missing, [dir.path().join("a/b"), dir.path().join("a/b/c")]);
        assert!(missing_dirs(dir.path(), dir.path()).is_empty());
    }
}
