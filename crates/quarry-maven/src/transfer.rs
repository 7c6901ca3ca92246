//! Per-item transfer outcomes.

use miette::Diagnostic;
use thiserror::Error;

/// Why a single artifact or metadata transfer failed.
///
/// Values are cloned when a cached failure is replayed and when one
/// connector failure is reported for every item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum TransferError {
    #[error("Could not find {item} in {repository} ({url}){}", cached_note(.cached, .repository))]
    #[diagnostic(help("Check the coordinates and that the repository hosts this artifact"))]
    NotFound {
        item: String,
        repository: String,
        url: String,
        cached: bool,
    },

    #[error("Could not transfer {item} from {repository} ({url}): {message}{}", cached_note(.cached, .repository))]
    Transfer {
        item: String,
        repository: String,
        url: String,
        message: String,
        cached: bool,
    },

    #[error("Checksum validation failed for {item} from {repository}: {message}")]
    #[diagnostic(help("The download may be corrupt; set checksum-policy to warn to continue anyway"))]
    Checksum {
        item: String,
        repository: String,
        message: String,
    },

    #[error("Transfer of {item} was interrupted")]
    Interrupted { item: String },

    #[error("Cannot access {repository} in offline mode and {item} has not been downloaded from it before")]
    #[diagnostic(help("Disable offline mode to download missing artifacts"))]
    Offline { item: String, repository: String },
}

fn cached_note(cached: &bool, repository: &str) -> String {
    if *cached {
        format!(
            " (failure cached in the local repository, not retried until the update interval of {repository} has elapsed)"
        )
    } else {
        String::new()
    }
}

impl TransferError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransferError::NotFound { .. })
    }

    /// The artifact or metadata the failure is about.
    pub fn item(&self) -> &str {
        match self {
            TransferError::NotFound { item, .. }
            | TransferError::Transfer { item, .. }
            | TransferError::Checksum { item, .. }
            | TransferError::Interrupted { item }
            | TransferError::Offline { item, .. } => item,
        }
    }

    /// Whether the failure was replayed from the local repository rather
    /// than observed now.
    pub fn is_cached(&self) -> bool {
        matches!(
            self,
            TransferError::NotFound { cached: true, .. } | TransferError::Transfer { cached: true, .. }
        )
    }

    /// The text recorded for this failure in a tracking file: empty for a
    /// missing item, the message otherwise.
    pub fn tracking_message(&self) -> String {
        match self {
            TransferError::NotFound { .. } => String::new(),
            TransferError::Transfer { message, .. } | TransferError::Checksum { message, .. }
                if !message.is_empty() =>
            {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}
