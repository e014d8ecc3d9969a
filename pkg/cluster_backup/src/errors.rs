use std::fmt;

use common::errors::*;

/// Severity associated with a `BackupError`, used by the agent to decide
/// whether a failure is merely reported (and the agent keeps running, e.g.
/// pre-steady-state stalls) or is escalated into the caller-visible error
/// path (`do_work` returning `Err`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warn,
    Fatal,
}

/// Error taxonomy for the backup agent's interactions with the
/// archive/replication substrate (see spec §7).
#[derive(Debug, Clone)]
pub enum BackupError {
    /// The consensus subscription received a message whose schema id did not
    /// match the expected protocol.
    ProtocolMismatch { expected: u16, actual: u16 },

    /// An archive control response arrived with an error code.
    ArchiveError { message: String },

    /// No progress was made within `backup_progress_timeout_ms` while the
    /// agent had not yet reached steady state.
    Timeout { detail: String },

    /// A previously live resource (most commonly the live-log recording
    /// counter) disappeared from the counters registry.
    ResourceUnavailable { detail: String },

    /// A recording signal arrived at an unexpected position during snapshot
    /// retrieval.
    UnexpectedRecordingSignal { detail: String },
}

impl BackupError {
    pub fn severity(&self) -> Severity {
        match self {
            BackupError::ProtocolMismatch { .. } => Severity::Fatal,
            BackupError::ArchiveError { .. } => Severity::Fatal,
            BackupError::Timeout { .. } => Severity::Warn,
            BackupError::ResourceUnavailable { .. } => Severity::Warn,
            BackupError::UnexpectedRecordingSignal { .. } => Severity::Fatal,
        }
    }
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupError::ProtocolMismatch { expected, actual } => write!(
                f,
                "protocol mismatch: expected schema id {}, got {}",
                expected, actual
            ),
            BackupError::ArchiveError { message } => {
                write!(f, "error occurred while transferring snapshot: {}", message)
            }
            BackupError::Timeout { detail } => write!(f, "progress has stalled: {}", detail),
            BackupError::ResourceUnavailable { detail } => {
                write!(f, "resource unavailable: {}", detail)
            }
            BackupError::UnexpectedRecordingSignal { detail } => {
                write!(f, "unexpected recording signal: {}", detail)
            }
        }
    }
}

impl common::Fail for BackupError {}

impl From<BackupError> for Error {
    fn from(e: BackupError) -> Error {
        err_msg(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_match_spec() {
        assert_eq!(
            BackupError::Timeout {
                detail: "x".into()
            }
            .severity(),
            Severity::Warn
        );
        assert_eq!(
            BackupError::ProtocolMismatch {
                expected: 1,
                actual: 2
            }
            .severity(),
            Severity::Fatal
        );
    }

    #[test]
    fn display_matches_expected_wording() {
        let e = BackupError::UnexpectedRecordingSignal {
            detail: "unexpected stop position: expected 4096, got 2048".into(),
        };
        assert_eq!(
            e.to_string(),
            "unexpected recording signal: unexpected stop position: expected 4096, got 2048"
        );
    }
}
