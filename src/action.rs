//! Follow-up actions run on a file after it reaches its category directory.
//!
//! Actions never raise: a failure is logged and reported as
//! [`ActionStatus::Error`] so the caller can record it and move on.

use crate::process::run_with_timeout;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of an action, mapped from the launcher's exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Ok,
    Error,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Ok => f.write_str("OK"),
            ActionStatus::Error => f.write_str("ERROR"),
        }
    }
}

/// A side effect performed on a relocated file.
pub trait Action: fmt::Debug + Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Runs the action against the file's new path.
    fn perform(&self, file_path: &Path) -> ActionStatus;
}

/// The default action: does nothing and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAction;

impl Action for NoAction {
    fn name(&self) -> &str {
        "none"
    }

    fn perform(&self, _file_path: &Path) -> ActionStatus {
        ActionStatus::Ok
    }
}

/// Opens the file in a specific application via an external launcher.
///
/// Runs `<opener> <application> <file>`; exit code 0 is success.
#[derive(Debug, Clone)]
pub struct OpenWithAction {
    opener: String,
    application: PathBuf,
    timeout: Duration,
}

impl OpenWithAction {
    pub fn new(
        opener: impl Into<String>,
        application: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            opener: opener.into(),
            application: application.into(),
            timeout,
        }
    }

    pub fn application(&self) -> &Path {
        &self.application
    }
}

impl Action for OpenWithAction {
    fn name(&self) -> &str {
        "open-with"
    }

    fn perform(&self, file_path: &Path) -> ActionStatus {
        info!(
            file = %file_path.display(),
            application = %self.application.display(),
            "opening file"
        );

        let mut command = Command::new(&self.opener);
        command.arg(&self.application).arg(file_path);

        let status = match run_with_timeout(command, self.timeout) {
            Ok(output) if output.status.success() => ActionStatus::Ok,
            Ok(output) => {
                warn!(
                    file = %file_path.display(),
                    status = %output.status,
                    "launcher reported failure"
                );
                ActionStatus::Error
            }
            Err(e) => {
                warn!(file = %file_path.display(), error = %e, "launcher could not run");
                ActionStatus::Error
            }
        };
        info!(file = %file_path.display(), %status, "action finished");
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_action_always_ok() {
        assert_eq!(NoAction.perform(Path::new("anything")), ActionStatus::Ok);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ActionStatus::Ok.to_string(), "OK");
        assert_eq!(ActionStatus::Error.to_string(), "ERROR");
    }

    #[cfg(unix)]
    #[test]
    fn test_open_with_exit_codes() {
        let ok = OpenWithAction::new("true", "/Applications/Client.app", Duration::from_secs(5));
        assert_eq!(ok.perform(Path::new("/tmp/a.torrent")), ActionStatus::Ok);

        let failing =
            OpenWithAction::new("false", "/Applications/Client.app", Duration::from_secs(5));
        assert_eq!(failing.perform(Path::new("/tmp/a.torrent")), ActionStatus::Error);
    }

    #[test]
    fn test_open_with_missing_launcher_is_error() {
        let action = OpenWithAction::new(
            "sortbox-no-such-opener",
            "/Applications/Client.app",
            Duration::from_secs(5),
        );
        assert_eq!(action.perform(Path::new("a.torrent")), ActionStatus::Error);
    }
}
