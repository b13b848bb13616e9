/// Relocation of classified files into their category directories.
///
/// This module ensures category directories exist, moves files under their
/// original name, and applies an explicit policy when the destination name is
/// already taken.
use crate::classifier::ClassificationResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// What to do when the destination already holds an entry with the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Move under a timestamped name, e.g. `report-20251109-143052.pdf`.
    #[default]
    Rename,
    /// Leave the file where it is and report the collision.
    Skip,
    /// Replace the existing entry.
    Overwrite,
}

/// Records a single completed move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relocation {
    /// Path of the file before the move.
    pub original_path: PathBuf,
    /// Path of the file after the move.
    pub new_path: PathBuf,
    /// Name of the category the file was moved for.
    pub category: String,
    /// True if the file was given a new name to avoid a collision.
    pub renamed: bool,
}

/// Errors that can occur while moving a file.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// Failed to create a category directory.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The destination already exists and the policy forbids replacing it.
    #[error("Destination {} already exists", .destination.display())]
    Collision { destination: PathBuf },
    /// Failed to move a file to its category directory.
    #[error("Failed to move {} to {}: {cause}", .from.display(), .to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        cause: std::io::Error,
    },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Moves classified files into their category directories.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Makes sure `dir` exists as a directory.
    ///
    /// Idempotent and safe when another process creates the directory
    /// concurrently. New directories get mode `0o777` (minus umask) on unix.
    ///
    /// # Arguments
    ///
    /// * `dir` - The category directory to create
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::DirectoryCreationFailed` if the directory cannot
    /// be created, including when a non-directory entry already has its name.
    pub fn ensure_dir(dir: &Path) -> OrganizeResult<()> {
        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o777);
        }

        match builder.create(dir) {
            Ok(()) => {
                info!(dir = %dir.display(), "created category directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
            Err(e) => Err(OrganizeError::DirectoryCreationFailed {
                path: dir.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Works out where a classified file would be moved, without touching
    /// the filesystem.
    ///
    /// This is the same destination `move_into_category` uses, so a dry run
    /// can report it faithfully.
    ///
    /// # Arguments
    ///
    /// * `result` - The classified file
    /// * `policy` - What to do if the destination name is already taken
    ///
    /// # Returns
    ///
    /// The destination path. Under `CollisionPolicy::Rename` a taken name is
    /// replaced with a timestamped one.
    ///
    /// # Errors
    ///
    /// * `OrganizeError::Collision` if the name is taken and the policy is `Skip`
    /// * `OrganizeError::DirectoryCreationFailed` if a non-directory entry
    ///   occupies the category directory's name
    /// * `OrganizeError::FileMoveFailure` if the file path has no name
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortbox::classifier::{Category, Classifier};
    /// use sortbox::file_organizer::{CollisionPolicy, FileOrganizer};
    /// use std::path::Path;
    ///
    /// let docs = Classifier::new("document", 9, Category::new("Document", "/inbox/7-Docs"));
    /// let result = docs.classify(Path::new("/inbox/cv.pdf"));
    /// let target = FileOrganizer::planned_destination(&result, CollisionPolicy::Skip);
    /// ```
    pub fn planned_destination(
        result: &ClassificationResult,
        policy: CollisionPolicy,
    ) -> OrganizeResult<PathBuf> {
        plan(result, policy).map(|(destination, _)| destination)
    }

    /// Moves a classified file into its category directory.
    ///
    /// Creates the category directory if needed, then moves the file under
    /// its own name, resolving a taken name according to `policy`.
    ///
    /// # Arguments
    ///
    /// * `result` - The classified file; `file_path` is updated to the new
    ///   location on success
    /// * `policy` - What to do if the destination name is already taken
    ///
    /// # Returns
    ///
    /// The completed `Relocation`.
    ///
    /// # Errors
    ///
    /// Returns an `OrganizeError` if the directory cannot be created, the
    /// name collides under `CollisionPolicy::Skip`, or the move itself fails.
    /// The file stays where it was in every error case.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortbox::classifier::{Category, Classifier};
    /// use sortbox::file_organizer::{CollisionPolicy, FileOrganizer};
    /// use std::path::Path;
    ///
    /// let docs = Classifier::new("document", 9, Category::new("Document", "/inbox/7-Docs"));
    /// let mut result = docs.classify(Path::new("/inbox/report.pdf"));
    ///
    /// match FileOrganizer::move_into_category(&mut result, CollisionPolicy::Rename) {
    ///     Ok(op) => println!("Moved to {}", op.new_path.display()),
    ///     Err(e) => eprintln!("Organization failed: {}", e),
    /// }
    /// ```
    pub fn move_into_category(
        result: &mut ClassificationResult,
        policy: CollisionPolicy,
    ) -> OrganizeResult<Relocation> {
        Self::ensure_dir(result.category.dir())?;

        let (destination_path, renamed) = plan(result, policy)?;
        if policy == CollisionPolicy::Overwrite && entry_exists(&destination_path) {
            warn!(destination = %destination_path.display(), "overwriting existing entry");
        }

        fs::rename(&result.file_path, &destination_path).map_err(|e| {
            OrganizeError::FileMoveFailure {
                from: result.file_path.clone(),
                to: destination_path.clone(),
                cause: e,
            }
        })?;
        info!(
            from = %result.file_path.display(),
            to = %destination_path.display(),
            "moved"
        );

        let original_path = std::mem::replace(&mut result.file_path, destination_path.clone());
        Ok(Relocation {
            original_path,
            new_path: destination_path,
            category: result.category.name().to_string(),
            renamed,
        })
    }
}

/// Destination for `result` under `policy`, and whether it was renamed.
fn plan(
    result: &ClassificationResult,
    policy: CollisionPolicy,
) -> OrganizeResult<(PathBuf, bool)> {
    let category_path = result.category.dir();

    let file_name = result
        .file_path
        .file_name()
        .ok_or_else(|| OrganizeError::FileMoveFailure {
            from: result.file_path.clone(),
            to: category_path.to_path_buf(),
            cause: std::io::Error::new(ErrorKind::InvalidInput, "file has no name component"),
        })?;

    if entry_exists(category_path) && !category_path.is_dir() {
        return Err(OrganizeError::DirectoryCreationFailed {
            path: category_path.to_path_buf(),
            source: std::io::Error::new(ErrorKind::AlreadyExists, "not a directory"),
        });
    }

    let destination_path = category_path.join(file_name);
    if !entry_exists(&destination_path) {
        return Ok((destination_path, false));
    }

    match policy {
        CollisionPolicy::Skip => Err(OrganizeError::Collision {
            destination: destination_path,
        }),
        CollisionPolicy::Overwrite => Ok((destination_path, false)),
        CollisionPolicy::Rename => {
            let renamed = unique_destination(category_path, Path::new(file_name));
            Ok((renamed, true))
        }
    }
}

/// True for anything at `path`, including dangling symlinks.
fn entry_exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Picks a free name in `dir` by inserting a local timestamp before the
/// extension, then a counter if that is taken too.
///
/// Example: `file.txt` becomes `file-20251109-143052.txt`
fn unique_destination(dir: &Path, file_name: &Path) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let extension = file_name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut candidate = dir.join(format!("{stem}-{timestamp}{extension}"));
    let mut counter = 1;
    while entry_exists(&candidate) {
        candidate = dir.join(format!("{stem}-{timestamp}-{counter}{extension}"));
        counter += 1;
    }
    candidate
}
