//! The inbox driver.
//!
//! Lists the inbox (non-recursively), drops excluded entries, sorts the rest
//! by name and takes each one through classify, move and action in turn.
//! A failure on one entry is recorded in the [`RunReport`] and never stops the
//! run; only an unreadable inbox is fatal.

use crate::action::ActionStatus;
use crate::config::ExcludeFilter;
use crate::file_organizer::{CollisionPolicy, FileOrganizer};
use crate::registry::ClassifierRegistry;
use chrono::{DateTime, Local};
use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, info_span, warn};

/// Fatal errors that stop a run before any entry is touched.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read inbox {}: {source}", .path.display())]
    InboxUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What happened to a single inbox entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Moved into its category directory; the action then ran.
    Moved {
        category: String,
        destination: PathBuf,
        renamed: bool,
        action: ActionStatus,
    },
    /// Dry run: where the entry would have gone.
    WouldMove {
        category: String,
        destination: PathBuf,
        renamed: bool,
    },
    /// No classifier claimed the entry; it was left in place.
    Unclassified,
    /// Classified, but the directory could not be prepared or the move failed.
    MoveFailed { category: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Summary of one pass over the inbox.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub inbox: PathBuf,
    /// Local time the inbox was listed.
    pub started_at: DateTime<Local>,
    pub dry_run: bool,
    /// Names skipped by the exclusion rules.
    pub excluded: Vec<String>,
    /// Processed entries, in processing order.
    pub entries: Vec<EntryReport>,
}

impl RunReport {
    fn new(inbox: &Path, dry_run: bool) -> Self {
        Self {
            inbox: inbox.to_path_buf(),
            started_at: Local::now(),
            dry_run,
            excluded: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn outcome_of(&self, name: &str) -> Option<&FileOutcome> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.outcome)
    }

    pub fn unclassified(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries
            .iter()
            .filter(|entry| entry.outcome == FileOutcome::Unclassified)
    }

    pub fn move_failures(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, FileOutcome::MoveFailed { .. }))
    }

    pub fn action_failures(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(|entry| {
            matches!(
                entry.outcome,
                FileOutcome::Moved {
                    action: ActionStatus::Error,
                    ..
                }
            )
        })
    }

    /// Moved (or, in a dry run, movable) entries per category name.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            if let FileOutcome::Moved { category, .. } | FileOutcome::WouldMove { category, .. } =
                &entry.outcome
            {
                *counts.entry(category.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn sorted_count(&self) -> usize {
        self.category_counts().values().sum()
    }

    /// True when every entry found a home and every action succeeded.
    pub fn is_clean(&self) -> bool {
        self.unclassified().next().is_none()
            && self.move_failures().next().is_none()
            && self.action_failures().next().is_none()
    }
}

/// Sequential classify, move and act driver over one inbox.
#[derive(Clone)]
pub struct Pipeline<'a> {
    registry: &'a ClassifierRegistry,
    excludes: &'a ExcludeFilter,
    collision_policy: CollisionPolicy,
    dry_run: bool,
    progress: ProgressBar,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a ClassifierRegistry, excludes: &'a ExcludeFilter) -> Self {
        Self {
            registry,
            excludes,
            collision_policy: CollisionPolicy::default(),
            dry_run: false,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    /// Classify and report without moving anything or running actions.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Processes every eligible entry directly inside `inbox`.
    pub fn run(&self, inbox: &Path) -> Result<RunReport, PipelineError> {
        let listing = fs::read_dir(inbox).map_err(|source| PipelineError::InboxUnreadable {
            path: inbox.to_path_buf(),
            source,
        })?;

        let mut report = RunReport::new(inbox, self.dry_run);
        let mut candidates: Vec<(String, PathBuf)> = Vec::new();

        for entry in listing {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(inbox = %inbox.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.excludes.is_excluded(&name) {
                report.excluded.push(name);
            } else {
                candidates.push((name, entry.path()));
            }
        }

        candidates.sort();
        report.excluded.sort();

        self.progress.set_length(candidates.len() as u64);
        for (name, path) in candidates {
            self.progress.set_message(name.clone());
            let outcome = self.process(&name, &path);
            report.entries.push(EntryReport {
                name,
                path,
                outcome,
            });
            self.progress.inc(1);
        }
        self.progress.finish_and_clear();

        Ok(report)
    }

    fn process(&self, name: &str, path: &Path) -> FileOutcome {
        let _span = info_span!("entry", name).entered();

        let Some(mut result) = self.registry.classify(path) else {
            warn!(path = %path.display(), "no category found, leaving in place");
            return FileOutcome::Unclassified;
        };
        let category = result.category.name().to_string();

        if self.dry_run {
            return match FileOrganizer::planned_destination(&result, self.collision_policy) {
                Ok(destination) => FileOutcome::WouldMove {
                    renamed: destination.file_name() != path.file_name(),
                    destination,
                    category,
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "move would fail");
                    FileOutcome::MoveFailed {
                        category,
                        reason: e.to_string(),
                    }
                }
            };
        }

        let relocation =
            match FileOrganizer::move_into_category(&mut result, self.collision_policy) {
                Ok(relocation) => relocation,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "move failed");
                    return FileOutcome::MoveFailed {
                        category,
                        reason: e.to_string(),
                    };
                }
            };

        let action = result.category.action().perform(&result.file_path);
        info!(category = %category, %action, "done");

        FileOutcome::Moved {
            category,
            destination: relocation.new_path,
            renamed: relocation.renamed,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::NoAction;
    use crate::config::SortConfig;
    use crate::inspector::InferInspector;
    use crate::registry::standard_registry;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn registry_for(base: &Path) -> ClassifierRegistry {
        standard_registry(base, Box::new(InferInspector), Arc::new(NoAction)).unwrap()
    }

    #[test]
    fn test_missing_inbox_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let inbox = temp_dir.path().join("nope");
        let registry = registry_for(&inbox);
        let excludes = SortConfig::default().compile_excludes().unwrap();

        let result = Pipeline::new(&registry, &excludes).run(&inbox);
        assert!(matches!(result, Err(PipelineError::InboxUnreadable { .. })));
    }

    #[test]
    fn test_entries_processed_in_name_order() {
        let temp_dir = TempDir::new().unwrap();
        let inbox = temp_dir.path();
        for name in ["c.pdf", "a.zip", "b.mp3"] {
            fs::write(inbox.join(name), "x").unwrap();
        }
        let registry = registry_for(inbox);
        let excludes = SortConfig::default().compile_excludes().unwrap();

        let report = Pipeline::new(&registry, &excludes).run(inbox).unwrap();
        let names: Vec<&str> = report.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.zip", "b.mp3", "c.pdf"]);
        assert!(report.is_clean());
        assert_eq!(report.sorted_count(), 3);
    }

    #[test]
    fn test_second_run_skips_category_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let inbox = temp_dir.path();
        fs::write(inbox.join("a.zip"), "x").unwrap();
        let registry = registry_for(inbox);
        let excludes = SortConfig::default().compile_excludes().unwrap();
        let pipeline = Pipeline::new(&registry, &excludes);

        pipeline.run(inbox).unwrap();
        let second = pipeline.run(inbox).unwrap();

        assert!(second.entries.is_empty());
        assert_eq!(second.excluded, vec!["2-Archives".to_string()]);
    }

    #[test]
    fn test_dry_run_reports_destination() {
        let temp_dir = TempDir::new().unwrap();
        let inbox = temp_dir.path();
        fs::write(inbox.join("setup.exe"), "MZ").unwrap();
        let registry = registry_for(inbox);
        let excludes = SortConfig::default().compile_excludes().unwrap();

        let report = Pipeline::new(&registry, &excludes)
            .dry_run(true)
            .run(inbox)
            .unwrap();

        assert_eq!(
            report.outcome_of("setup.exe"),
            Some(&FileOutcome::WouldMove {
                category: "Application".to_string(),
                destination: inbox.join("1-Applications").join("setup.exe"),
                renamed: false,
            })
        );
        assert!(inbox.join("setup.exe").exists());
        assert!(!inbox.join("1-Applications").exists());
    }

    fn inbox_with_taken_cv(inbox: &Path) {
        fs::create_dir(inbox.join("7-Docs")).unwrap();
        fs::write(inbox.join("7-Docs").join("cv.pdf"), "old").unwrap();
        fs::write(inbox.join("cv.pdf"), "new").unwrap();
    }

    #[test]
    fn test_dry_run_matches_real_run_on_skip_collision() {
        let temp_dir = TempDir::new().unwrap();
        let inbox = temp_dir.path();
        inbox_with_taken_cv(inbox);
        let registry = registry_for(inbox);
        let excludes = SortConfig::default().compile_excludes().unwrap();
        let pipeline =
            Pipeline::new(&registry, &excludes).with_collision_policy(CollisionPolicy::Skip);

        let preview = pipeline.clone().dry_run(true).run(inbox).unwrap();
        let real = pipeline.run(inbox).unwrap();

        assert!(matches!(
            preview.outcome_of("cv.pdf"),
            Some(FileOutcome::MoveFailed { category, .. }) if category == "Document"
        ));
        assert_eq!(preview.outcome_of("cv.pdf"), real.outcome_of("cv.pdf"));
        assert!(inbox.join("cv.pdf").exists());
    }

    #[test]
    fn test_dry_run_reports_renamed_destination() {
        let temp_dir = TempDir::new().unwrap();
        let inbox = temp_dir.path();
        inbox_with_taken_cv(inbox);
        let registry = registry_for(inbox);
        let excludes = SortConfig::default().compile_excludes().unwrap();

        let preview = Pipeline::new(&registry, &excludes)
            .with_collision_policy(CollisionPolicy::Rename)
            .dry_run(true)
            .run(inbox)
            .unwrap();

        match preview.outcome_of("cv.pdf") {
            Some(FileOutcome::WouldMove {
                destination,
                renamed,
                ..
            }) => {
                assert!(*renamed);
                assert_ne!(destination, &inbox.join("7-Docs").join("cv.pdf"));
                assert_eq!(destination.parent(), Some(inbox.join("7-Docs").as_path()));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(inbox.join("cv.pdf").exists());
        assert_eq!(fs::read_to_string(inbox.join("7-Docs").join("cv.pdf")).unwrap(), "old");
    }

    #[test]
    fn test_report_serializes_with_status_tag() {
        let report = RunReport {
            inbox: PathBuf::from("/inbox"),
            started_at: Local::now(),
            dry_run: false,
            excluded: vec![".DS_Store".to_string()],
            entries: vec![EntryReport {
                name: "blob".to_string(),
                path: PathBuf::from("/inbox/blob"),
                outcome: FileOutcome::Unclassified,
            }],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["status"], "unclassified");
        assert_eq!(json["entries"][0]["name"], "blob");
        assert_eq!(json["excluded"][0], ".DS_Store");
        let started = json["started_at"].as_str().expect("timestamp is a string");
        assert!(started.parse::<DateTime<chrono::FixedOffset>>().is_ok(), "{started}");
    }
}
