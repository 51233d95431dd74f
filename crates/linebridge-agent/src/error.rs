use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Why an invocation landed in the timeout category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutCause {
    /// Our own deadline expired and we killed the child.
    Timer,
    /// The child was terminated by SIGTERM (exit code 143) from outside.
    Signal,
}

impl fmt::Display for TimeoutCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutCause::Timer => f.write_str("killed after the deadline"),
            TimeoutCause::Signal => f.write_str("terminated by signal"),
        }
    }
}

/// Errors from a single assistant invocation.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The process could not be started (missing binary, bad cwd, no pid).
    #[error("failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },

    /// The invocation hit the wall-clock limit or was terminated.
    #[error("claude execution timed out after {} ({cause})", format_limit(.limit))]
    Timeout { cause: TimeoutCause, limit: Duration },

    /// The CLI exited unsuccessfully; carries its stderr.
    #[error("claude exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    /// Reading the child's pipes or waiting on it failed.
    #[error("I/O error while running claude: {0}")]
    Io(#[from] std::io::Error),
}

/// `600s`, or `1500ms` when the limit is not a whole number of seconds.
fn format_limit(limit: &Duration) -> String {
    if limit.subsec_millis() == 0 {
        format!("{}s", limit.as_secs())
    } else {
        format!("{}ms", limit.as_millis())
    }
}

impl RunnerError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RunnerError::Timeout { .. })
    }

    /// Exit code of the child when one was observed.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunnerError::NonZeroExit { code, .. } => Some(*code),
            RunnerError::Timeout {
                cause: TimeoutCause::Signal,
                ..
            } => Some(crate::claude_cli::SIGTERM_EXIT_CODE),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_messages_mention_timed_out() {
        for cause in [TimeoutCause::Timer, TimeoutCause::Signal] {
            let err = RunnerError::Timeout {
                cause,
                limit: Duration::from_secs(600),
            };
            assert!(err.to_string().contains("timed out"), "{err}");
            assert!(err.is_timeout());
        }
    }

    #[test]
    fn timeout_limit_keeps_millisecond_precision() {
        let whole = RunnerError::Timeout {
            cause: TimeoutCause::Timer,
            limit: Duration::from_secs(600),
        };
        assert_eq!(
            whole.to_string(),
            "claude execution timed out after 600s (killed after the deadline)"
        );

        let short = RunnerError::Timeout {
            cause: TimeoutCause::Timer,
            limit: Duration::from_millis(300),
        };
        assert!(short.to_string().contains("after 300ms"), "{short}");
    }

    #[test]
    fn non_zero_exit_carries_stderr() {
        let err = RunnerError::NonZeroExit {
            code: 2,
            stderr: "bad flag".to_string(),
        };
        assert_eq!(err.to_string(), "claude exited with code 2: bad flag");
        assert_eq!(err.exit_code(), Some(2));
        assert!(!err.is_timeout());
    }

    #[test]
    fn signal_timeout_reports_termination_code() {
        let err = RunnerError::Timeout {
            cause: TimeoutCause::Signal,
            limit: Duration::from_secs(600),
        };
        assert_eq!(err.exit_code(), Some(143));
    }
}
