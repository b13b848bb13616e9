//! Coarse content-type detection.
//!
//! A coarse type is the major half of a `major/minor` media type, e.g.
//! `video` for `video/mp4`. Content-based classifiers compare against it.
//!
//! Two backends are provided:
//! - [`FileCommandInspector`] runs `<probe> -b --mime-type <path>` (the `file`
//!   utility by default) under a timeout.
//! - [`InferInspector`] sniffs magic bytes in-process with the `infer` crate and
//!   falls back to a UTF-8 heuristic for plain text.
//!
//! Probe failures never propagate: the inspector logs them and reports the
//! type as unknown, which callers treat as "no match".

use crate::process::{ProcessError, run_with_timeout};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// How many leading bytes [`InferInspector`] reads from a file.
const SNIFF_LEN: u64 = 8192;

/// Reasons a probe produced no coarse type.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("probe exited with {0}")]
    Failed(std::process::ExitStatus),
    #[error("unparseable probe output {0:?}")]
    Unparseable(String),
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

/// Determines the coarse content type of a file.
pub trait ContentInspector: fmt::Debug + Send + Sync {
    /// Returns the coarse type of `path`, or `None` when it cannot be determined.
    fn inspect(&self, path: &Path) -> Option<String>;
}

/// Extracts the lowercase major type from `major/minor` probe output.
///
/// Anything after the first `/` is ignored. The major part must be a single
/// media-type token, which rejects error messages that merely contain a path.
///
/// ```
/// use sortbox::inspector::coarse_type_of;
///
/// assert_eq!(coarse_type_of("video/mp4\n").unwrap(), "video");
/// assert!(coarse_type_of("cannot open `/tmp/x'").is_err());
/// ```
pub fn coarse_type_of(output: &str) -> Result<String, ProbeError> {
    let trimmed = output.trim();
    let (major, _) = trimmed
        .split_once('/')
        .ok_or_else(|| ProbeError::Unparseable(trimmed.to_string()))?;

    let is_token = !major.is_empty()
        && major
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.'));
    if !is_token {
        return Err(ProbeError::Unparseable(trimmed.to_string()));
    }

    Ok(major.to_ascii_lowercase())
}

/// Inspector backed by an external `file`-compatible command.
#[derive(Debug, Clone)]
pub struct FileCommandInspector {
    command: String,
    timeout: Duration,
}

impl FileCommandInspector {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    fn probe(&self, path: &Path) -> Result<String, ProbeError> {
        let mut command = Command::new(&self.command);
        command.arg("-b").arg("--mime-type").arg(path);

        let output = run_with_timeout(command, self.timeout)?;
        if !output.status.success() {
            return Err(ProbeError::Failed(output.status));
        }
        debug!(path = %path.display(), output = output.stdout.trim(), "probe output");
        coarse_type_of(&output.stdout)
    }
}

impl Default for FileCommandInspector {
    fn default() -> Self {
        Self::new("file", Duration::from_secs(10))
    }
}

impl ContentInspector for FileCommandInspector {
    fn inspect(&self, path: &Path) -> Option<String> {
        match self.probe(path) {
            Ok(coarse) => Some(coarse),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "content probe unavailable");
                None
            }
        }
    }
}

/// In-process inspector using magic-byte signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferInspector;

impl InferInspector {
    fn sniff(path: &Path) -> Result<Option<String>, ProbeError> {
        let mut head = Vec::new();
        File::open(path)?.take(SNIFF_LEN).read_to_end(&mut head)?;

        if head.is_empty() {
            return Ok(None);
        }
        if let Some(kind) = infer::get(&head) {
            return coarse_type_of(kind.mime_type()).map(Some);
        }
        Ok(looks_like_text(&head).then(|| "text".to_string()))
    }
}

impl ContentInspector for InferInspector {
    fn inspect(&self, path: &Path) -> Option<String> {
        match Self::sniff(path) {
            Ok(coarse) => {
                debug!(path = %path.display(), coarse = ?coarse, "sniffed content");
                coarse
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "content sniffing failed");
                None
            }
        }
    }
}

/// UTF-8 without NUL bytes. A multibyte sequence cut off by the sniff window
/// still counts as text.
fn looks_like_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}
