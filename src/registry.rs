//! The classifier registry and the standard category table.
//!
//! # Arbitration
//!
//! [`ClassifierRegistry::classify`] tests every classifier in registration
//! order. When several match, the highest priority wins; among classifiers
//! tied at that priority the one registered first wins. The result is
//! therefore fully determined by registration order and priorities.
//!
//! # Examples
//!
//! ```
//! use sortbox::classifier::{Category, Classifier};
//! use sortbox::inspector::InferInspector;
//! use sortbox::registry::ClassifierRegistry;
//! use std::path::Path;
//!
//! let mut registry = ClassifierRegistry::new(Box::new(InferInspector));
//! registry
//!     .register(
//!         Classifier::new("torrent", 9, Category::new("Torrent", "/inbox/4-Torrents"))
//!             .with_extensions([".torrent"]),
//!     )
//!     .unwrap();
//!
//! let result = registry.classify(Path::new("/inbox/linux.torrent")).unwrap();
//! assert_eq!(result.category.name(), "Torrent");
//! ```

use crate::action::Action;
use crate::classifier::{Candidate, Category, ClassificationResult, Classifier};
use crate::inspector::ContentInspector;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Priority of every specific category in the standard table.
pub const STANDARD_PRIORITY: i32 = 9;
/// Priority of the catch-all category.
pub const CATCH_ALL_PRIORITY: i32 = 1;

pub const APPLICATIONS_DIR: &str = "1-Applications";
pub const ARCHIVES_DIR: &str = "2-Archives";
pub const AUDIOS_DIR: &str = "3-Audios";
pub const TORRENTS_DIR: &str = "4-Torrents";
pub const VIDEOS_DIR: &str = "5-Videos";
pub const IMAGES_DIR: &str = "6-Images";
pub const DOCS_DIR: &str = "7-Docs";
pub const OTHERS_DIR: &str = "8-Others";

/// Every category folder of the standard table, in numbered order.
pub const CATEGORY_DIRS: [&str; 8] = [
    APPLICATIONS_DIR,
    ARCHIVES_DIR,
    AUDIOS_DIR,
    TORRENTS_DIR,
    VIDEOS_DIR,
    IMAGES_DIR,
    DOCS_DIR,
    OTHERS_DIR,
];

/// Errors raised while building a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("classifier `{0}` is already registered")]
    DuplicateClassifier(String),
}

/// Ordered set of classifiers sharing one content inspector.
///
/// Built once at startup, then only read.
#[derive(Debug)]
pub struct ClassifierRegistry {
    classifiers: Vec<Classifier>,
    registered: HashSet<String>,
    inspector: Box<dyn ContentInspector>,
}

impl ClassifierRegistry {
    pub fn new(inspector: Box<dyn ContentInspector>) -> Self {
        Self {
            classifiers: Vec::new(),
            registered: HashSet::new(),
            inspector,
        }
    }

    /// Appends a classifier, rejecting a second classifier with the same id.
    pub fn register(&mut self, classifier: Classifier) -> Result<(), RegistryError> {
        if !self.registered.insert(classifier.id().to_string()) {
            return Err(RegistryError::DuplicateClassifier(classifier.id().to_string()));
        }
        self.classifiers.push(classifier);
        Ok(())
    }

    pub fn classifiers(&self) -> &[Classifier] {
        &self.classifiers
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    /// All classifiers claiming `file_path`, in registration order.
    pub fn matching(&self, file_path: &Path) -> Vec<&Classifier> {
        let candidate = Candidate::new(file_path, self.inspector.as_ref());
        self.classifiers
            .iter()
            .filter(|classifier| classifier.matches(&candidate))
            .collect()
    }

    /// Resolves `file_path` to a single category, or `None` if nothing claims it.
    pub fn classify(&self, file_path: &Path) -> Option<ClassificationResult> {
        let matches = self.matching(file_path);

        let winner = match matches.as_slice() {
            [] => {
                info!(path = %file_path.display(), "no classifier matched");
                return None;
            }
            [only] => *only,
            _ => {
                let winner = arbitrate(&matches)?;
                let ids: Vec<&str> = matches.iter().map(|c| c.id()).collect();
                info!(
                    path = %file_path.display(),
                    candidates = ?ids,
                    winner = winner.id(),
                    "several classifiers matched"
                );
                winner
            }
        };

        info!(path = %file_path.display(), classifier = winner.id(), "classified");
        Some(winner.classify(file_path))
    }
}

/// Highest priority wins; the earliest entry wins a tie.
fn arbitrate<'a>(matches: &[&'a Classifier]) -> Option<&'a Classifier> {
    matches.iter().copied().fold(None, |best, classifier| match best {
        Some(current) if current.priority() >= classifier.priority() => Some(current),
        _ => Some(classifier),
    })
}

/// Builds the standard eight-category registry rooted at `base_dir`.
///
/// Torrent files get `torrent_action`; every other category has no action.
/// Registration order doubles as the tie-break order.
pub fn standard_registry(
    base_dir: &Path,
    inspector: Box<dyn ContentInspector>,
    torrent_action: Arc<dyn Action>,
) -> Result<ClassifierRegistry, RegistryError> {
    let category = |name: &str, dir: &str| Category::new(name, base_dir.join(dir));

    let mut registry = ClassifierRegistry::new(inspector);

    registry.register(
        Classifier::new(
            "torrent",
            STANDARD_PRIORITY,
            category("Torrent", TORRENTS_DIR).with_action(torrent_action),
        )
        .with_extensions([".torrent"]),
    )?;
    registry.register(
        Classifier::new("archive", STANDARD_PRIORITY, category("Archive", ARCHIVES_DIR))
            .with_extensions([".dmg", ".zip", ".gz", ".tar", ".rpm", ".iso", ".rar", ".7z"]),
    )?;
    registry.register(
        Classifier::new("video", STANDARD_PRIORITY, category("Video", VIDEOS_DIR))
            .with_extensions([".mp4", ".avi", ".wmv", ".flv", ".mpg"])
            .with_coarse_type("video"),
    )?;
    registry.register(
        Classifier::new("image", STANDARD_PRIORITY, category("Image", IMAGES_DIR))
            .with_extensions([".gif", ".jpg", ".ico", ".icns", ".png", ".tiff", ".svg"])
            .with_coarse_type("image"),
    )?;
    registry.register(
        Classifier::new("audio", STANDARD_PRIORITY, category("Audio", AUDIOS_DIR))
            .with_extensions([".mp3", ".m4a", ".flac", ".alac"])
            .with_coarse_type("audio"),
    )?;
    registry.register(
        Classifier::new(
            "application",
            STANDARD_PRIORITY,
            category("Application", APPLICATIONS_DIR),
        )
        .with_extensions([".app", ".exe"]),
    )?;
    registry.register(
        Classifier::new("document", STANDARD_PRIORITY, category("Document", DOCS_DIR))
            .with_extensions([
                ".djvu", ".pdf", ".doc", ".xlsx", ".txt", ".epub", ".rtf", ".docx",
            ]),
    )?;
    registry.register(
        Classifier::new("other", CATCH_ALL_PRIORITY, category("Other", OTHERS_DIR))
            .with_coarse_type("text"),
    )?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{NoAction, OpenWithAction};
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// Answers by file name so tests never touch disk or spawn a probe.
    #[derive(Debug, Default)]
    struct NamedInspector(HashMap<String, String>);

    impl NamedInspector {
        fn with(mut self, name: &str, coarse: &str) -> Self {
            self.0.insert(name.to_string(), coarse.to_string());
            self
        }
    }

    impl ContentInspector for NamedInspector {
        fn inspect(&self, path: &Path) -> Option<String> {
            let name = path.file_name()?.to_string_lossy();
            self.0.get(name.as_ref()).cloned()
        }
    }

    fn standard(inspector: NamedInspector) -> ClassifierRegistry {
        standard_registry(Path::new("/inbox"), Box::new(inspector), Arc::new(NoAction))
            .expect("standard table has unique ids")
    }

    fn classified_dir(registry: &ClassifierRegistry, path: &str) -> Option<PathBuf> {
        registry
            .classify(Path::new(path))
            .map(|result| result.category.dir().to_path_buf())
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = ClassifierRegistry::new(Box::new(NamedInspector::default()));
        registry
            .register(Classifier::new("video", 9, Category::new("Video", "/v")))
            .unwrap();

        let err = registry
            .register(Classifier::new("video", 3, Category::new("Clips", "/c")))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateClassifier(ref id) if id == "video"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_standard_table_by_extension() {
        let registry = standard(NamedInspector::default());
        assert_eq!(registry.len(), 8);

        let cases = [
            ("/inbox/ubuntu.torrent", TORRENTS_DIR),
            ("/inbox/backup.ZIP", ARCHIVES_DIR),
            ("/inbox/movie.mp4", VIDEOS_DIR),
            ("/inbox/photo.jpg", IMAGES_DIR),
            ("/inbox/song.mp3", AUDIOS_DIR),
            ("/inbox/setup.exe", APPLICATIONS_DIR),
            ("/inbox/readme.docx", DOCS_DIR),
        ];
        for (path, dir) in cases {
            assert_eq!(
                classified_dir(&registry, path),
                Some(Path::new("/inbox").join(dir)),
                "{path}"
            );
        }
    }

    #[test]
    fn test_content_type_without_known_extension() {
        let registry = standard(
            NamedInspector::default()
                .with("clip.mkv", "video")
                .with("notes", "text"),
        );

        assert_eq!(
            classified_dir(&registry, "/inbox/clip.mkv"),
            Some(PathBuf::from("/inbox/5-Videos"))
        );
        assert_eq!(
            classified_dir(&registry, "/inbox/notes"),
            Some(PathBuf::from("/inbox/8-Others"))
        );
    }

    #[test]
    fn test_unrecognized_file_unclassified() {
        let registry = standard(NamedInspector::default().with("blob.bin", "application"));
        assert!(registry.classify(Path::new("/inbox/blob.bin")).is_none());
        assert!(registry.classify(Path::new("/inbox/mystery")).is_none());
    }

    #[test]
    fn test_higher_priority_wins_over_catch_all() {
        // a .txt file is both a document by extension and text by content
        let registry = standard(NamedInspector::default().with("todo.txt", "text"));

        let ids: Vec<&str> = registry
            .matching(Path::new("/inbox/todo.txt"))
            .iter()
            .map(|c| c.id())
            .collect();
        assert_eq!(ids, vec!["document", "other"]);

        let result = registry.classify(Path::new("/inbox/todo.txt")).unwrap();
        assert_eq!(result.category.name(), "Document");
    }

    #[test]
    fn test_higher_priority_wins_regardless_of_order() {
        let mut registry = ClassifierRegistry::new(Box::new(NamedInspector::default()));
        registry
            .register(
                Classifier::new("low", 1, Category::new("Low", "/low")).with_extensions(["zip"]),
            )
            .unwrap();
        registry
            .register(
                Classifier::new("high", 5, Category::new("High", "/high"))
                    .with_extensions(["zip"]),
            )
            .unwrap();

        let result = registry.classify(Path::new("bundle.zip")).unwrap();
        assert_eq!(result.category.name(), "High");
    }

    #[test]
    fn test_tie_goes_to_first_registered() {
        // .zip is an archive by extension and, hypothetically, video by content
        let registry = standard(NamedInspector::default().with("weird.zip", "video"));

        let result = registry.classify(Path::new("/inbox/weird.zip")).unwrap();
        assert_eq!(result.category.name(), "Archive");
        assert_eq!(result.file_path, PathBuf::from("/inbox/weird.zip"));
    }

    #[test]
    fn test_arbitrate_is_stable() {
        let a = Classifier::new("a", 4, Category::new("A", "/a"));
        let b = Classifier::new("b", 7, Category::new("B", "/b"));
        let c = Classifier::new("c", 7, Category::new("C", "/c"));

        assert_eq!(arbitrate(&[&a, &b, &c]).map(|w| w.id()), Some("b"));
        assert_eq!(arbitrate(&[&c, &b, &a]).map(|w| w.id()), Some("c"));
        assert!(arbitrate(&[]).is_none());
    }

    #[test]
    fn test_torrent_category_carries_action() {
        let launcher = OpenWithAction::new(
            "open",
            "/Applications/Client.app",
            std::time::Duration::from_secs(1),
        );
        let registry = standard_registry(
            Path::new("/inbox"),
            Box::new(NamedInspector::default()),
            Arc::new(launcher),
        )
        .unwrap();

        let torrent = registry.classify(Path::new("/inbox/a.torrent")).unwrap();
        assert_eq!(torrent.category.action().name(), "open-with");

        let archive = registry.classify(Path::new("/inbox/a.rar")).unwrap();
        assert_eq!(archive.category.action().name(), "none");
    }
}
