//! Bounded execution of external commands.
//!
//! Both the content probe and the action launcher shell out to tools that may
//! hang (a network-mounted file, an application waiting on a dialog). Every
//! invocation goes through [`run_with_timeout`], which polls the child and
//! kills it once the deadline passes.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Errors raised while running an external command.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be started at all.
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The program was still running when the deadline passed and was killed.
    #[error("`{program}` did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
    /// Waiting on the child failed.
    #[error("failed waiting on `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Exit status and captured standard output of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
}

/// Runs `command` to completion, killing it if it outlives `timeout`.
///
/// Stdin and stderr are detached; stdout is captured and decoded lossily.
/// Output is read after the child exits, so this is only suitable for
/// commands with small output.
pub fn run_with_timeout(
    mut command: Command,
    timeout: Duration,
) -> Result<CommandOutput, ProcessError> {
    let program = command.get_program().to_string_lossy().into_owned();

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProcessError::TimedOut { program, timeout });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => return Err(ProcessError::Wait { program, source }),
        }
    };

    let mut raw = Vec::new();
    if let Some(mut pipe) = child.stdout.take() {
        let _ = pipe.read_to_end(&mut raw);
    }

    Ok(CommandOutput {
        status,
        stdout: String::from_utf8_lossy(&raw).into_owned(),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout() {
        let mut command = Command::new("echo");
        command.arg("video/mp4");

        let output = run_with_timeout(command, Duration::from_secs(5)).unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout.trim(), "video/mp4");
    }

    #[test]
    fn test_reports_non_zero_exit() {
        let output = run_with_timeout(Command::new("false"), Duration::from_secs(5)).unwrap();
        assert!(!output.status.success());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let result = run_with_timeout(
            Command::new("sortbox-definitely-not-installed"),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }

    #[test]
    fn test_slow_program_is_killed() {
        let mut command = Command::new("sleep");
        command.arg("5");

        let started = Instant::now();
        let result = run_with_timeout(command, Duration::from_millis(100));
        assert!(matches!(result, Err(ProcessError::TimedOut { .. })));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
