use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Machine-readable error codes for operator-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidCommandInput,
    InvalidSummaryTime,
    StoreUnavailable,
    StoreCorrupt,
    StoreWriteFailed,
    StoreLockContention,
    ExternalTimeout,
    ExternalSendFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidCommandInput => "E1002",
            Self::InvalidSummaryTime => "E1003",
            Self::StoreUnavailable => "E2001",
            Self::StoreCorrupt => "E2002",
            Self::StoreWriteFailed => "E2003",
            Self::StoreLockContention => "E2004",
            Self::ExternalTimeout => "E3001",
            Self::ExternalSendFailed => "E3002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and chat replies.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidCommandInput => "Unrecognized command",
            Self::InvalidSummaryTime => "Unparseable summary time",
            Self::StoreUnavailable => "Room store unreadable at startup",
            Self::StoreCorrupt => "Room store contents are corrupt",
            Self::StoreWriteFailed => "Room store flush failed",
            Self::StoreLockContention => "Room store locked by another process",
            Self::ExternalTimeout => "External call timed out",
            Self::ExternalSendFailed => "External send failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in the config file and restart."),
            Self::InvalidCommandInput => Some("Send `help` to the bot for the command list."),
            Self::InvalidSummaryTime => Some("Use 24-hour `HH:MM` (UTC), e.g. `set summary time 07:30`."),
            Self::StoreUnavailable | Self::StoreCorrupt => {
                Some("Restore the room data file from its .bak backup, then restart.")
            }
            Self::StoreWriteFailed => Some("Check disk space and write permissions."),
            Self::StoreLockContention => {
                Some("Stop the other mscbot process holding the data file lock.")
            }
            Self::ExternalTimeout | Self::ExternalSendFailed => {
                Some("The affected room is retried on the next tick; no action needed.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by the room schedule store.
///
/// `Unreadable` and `Corrupt` are startup-fatal: the engine refuses to run
/// with ambiguous room state rather than silently resetting all rooms.
/// `WriteFailed` is not: the in-memory state stays authoritative and the
/// flush is retried on the next mutation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{code}: cannot read room store at {path}: {source}", code = ErrorCode::StoreUnavailable)]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{code}: room store at {path} is corrupt: {source}", code = ErrorCode::StoreCorrupt)]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{code}: failed to flush room store to {path}: {source}", code = ErrorCode::StoreWriteFailed)]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{code}: room store at {path} is locked by another process", code = ErrorCode::StoreLockContention)]
    Locked { path: PathBuf },
}

impl StoreError {
    /// Machine-readable code associated with this store error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unreadable { .. } => ErrorCode::StoreUnavailable,
            Self::Corrupt { .. } => ErrorCode::StoreCorrupt,
            Self::WriteFailed { .. } => ErrorCode::StoreWriteFailed,
            Self::Locked { .. } => ErrorCode::StoreLockContention,
        }
    }

    /// Returns `true` when the engine must refuse to start.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Unreadable { .. } | Self::Corrupt { .. } | Self::Locked { .. }
        )
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
