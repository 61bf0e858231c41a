//! Transaction error type

use crate::hardware::LinkError;

/// Failure of a single command/response exchange
///
/// Distinct from a transaction that completes without a reply, which is
/// reported as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Command text would be split into several commands on the wire
    #[error("command {command:?} contains a line break")]
    InvalidCommand { command: String },

    /// Link failure while sending or collecting the reply
    #[error("transaction for command {command:?} failed")]
    Link {
        command: String,
        #[source]
        source: LinkError,
    },
}

/// Result type for transactions
pub type TransactionResult<T> = Result<T, TransactionError>;

impl TransactionError {
    pub fn command(&self) -> &str {
        match self {
            TransactionError::InvalidCommand { command } => command,
            TransactionError::Link { command, .. } => command,
        }
    }

    /// Whether retrying the whole transaction could succeed
    ///
    /// Every variant leaves the caller free to continue; this only says
    /// whether the same call is worth repeating as is.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TransactionError::InvalidCommand { .. } => false,
            TransactionError::Link { source, .. } => !matches!(source, LinkError::NotOpen { .. }),
        }
    }
}
