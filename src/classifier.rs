//! Classifiers and the categories they resolve to.
//!
//! A [`Classifier`] pairs a match predicate with a fixed [`Category`]. The
//! predicate has two halves, either of which may be empty:
//! - an extension set, compared case-insensitively and without any I/O;
//! - a coarse content type, checked through a [`ContentInspector`] and never
//!   for directories.
//!
//! A file matches when either half matches.

use crate::action::{Action, NoAction};
use crate::inspector::ContentInspector;
use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Destination for a classified file: its directory and post-move action.
#[derive(Clone)]
pub struct Category {
    name: String,
    dir: PathBuf,
    action: Arc<dyn Action>,
}

impl Category {
    /// Creates a category with no follow-up action.
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            action: Arc::new(NoAction),
        }
    }

    pub fn with_action(mut self, action: Arc<dyn Action>) -> Self {
        self.action = action;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory files of this category are moved into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn action(&self) -> &dyn Action {
        self.action.as_ref()
    }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Category")
            .field("name", &self.name)
            .field("dir", &self.dir)
            .field("action", &self.action.name())
            .finish()
    }
}

/// A file bound to the category it was resolved to.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub file_path: PathBuf,
    pub category: Category,
}

/// A file under evaluation.
///
/// File-type metadata and the content probe are computed on first use and
/// shared by every classifier tested against the same candidate.
pub struct Candidate<'a> {
    path: &'a Path,
    inspector: &'a dyn ContentInspector,
    is_dir: OnceCell<bool>,
    coarse_type: OnceCell<Option<String>>,
}

impl<'a> Candidate<'a> {
    pub fn new(path: &'a Path, inspector: &'a dyn ContentInspector) -> Self {
        Self {
            path,
            inspector,
            is_dir: OnceCell::new(),
            coarse_type: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.path
    }

    /// Lowercase extension without the leading dot.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    pub fn is_dir(&self) -> bool {
        *self.is_dir.get_or_init(|| self.path.is_dir())
    }

    /// Coarse content type; probed at most once per candidate.
    pub fn coarse_type(&self) -> Option<&str> {
        self.coarse_type
            .get_or_init(|| self.inspector.inspect(self.path))
            .as_deref()
    }
}

/// A rule claiming ownership of files by extension and/or coarse content type.
#[derive(Debug, Clone)]
pub struct Classifier {
    id: String,
    extensions: BTreeSet<String>,
    coarse_type: Option<String>,
    priority: i32,
    category: Category,
}

impl Classifier {
    /// Creates a classifier that matches nothing until extensions or a
    /// coarse type are added.
    pub fn new(id: impl Into<String>, priority: i32, category: Category) -> Self {
        Self {
            id: id.into(),
            extensions: BTreeSet::new(),
            coarse_type: None,
            priority,
            category,
        }
    }

    /// Adds extensions; a leading dot and letter case are ignored.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions.extend(
            extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase()),
        );
        self
    }

    pub fn with_coarse_type(mut self, coarse_type: impl Into<String>) -> Self {
        self.coarse_type = Some(coarse_type.into().to_lowercase());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn extensions(&self) -> &BTreeSet<String> {
        &self.extensions
    }

    pub fn coarse_type(&self) -> Option<&str> {
        self.coarse_type.as_deref()
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    /// Whether this classifier claims the candidate.
    ///
    /// The extension check runs first so the content probe is skipped for
    /// files already claimed by extension.
    pub fn matches(&self, candidate: &Candidate<'_>) -> bool {
        if let Some(ext) = candidate.extension()
            && self.extensions.contains(&ext)
        {
            return true;
        }

        match &self.coarse_type {
            Some(expected) if !candidate.is_dir() => {
                candidate.coarse_type() == Some(expected.as_str())
            }
            _ => false,
        }
    }

    /// Binds a file to this classifier's category.
    pub fn classify(&self, file_path: &Path) -> ClassificationResult {
        ClassificationResult {
            file_path: file_path.to_path_buf(),
            category: self.category.clone(),
        }
    }
}
