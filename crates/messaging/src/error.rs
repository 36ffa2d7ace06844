//! Error types for the messaging core.

use ebic_core::error::CoreError;

use crate::delivery::ChannelError;

/// Failure reported by a persistence port.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique key is already taken.
    #[error("Duplicate: {0}")]
    Conflict(String),

    /// A non-database backend refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Error type for messaging operations that abort a whole call.
///
/// Per-recipient and per-channel failures never surface here; they are
/// folded into counters and audit rows by the caller.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("Report generation failed: {0}")]
    Generation(String),
}

impl From<sqlx::Error> for MessagingError {
    fn from(err: sqlx::Error) -> Self {
        MessagingError::Persistence(StoreError::Database(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn core_errors_keep_their_message() {
        let err = MessagingError::from(CoreError::TemplateNotFound("welcome".into()));
        assert_eq!(err.to_string(), "Template not found: welcome");
    }

    #[test]
    fn sqlx_errors_become_persistence_errors() {
        let err = MessagingError::from(sqlx::Error::RowNotFound);
        assert_matches!(err, MessagingError::Persistence(StoreError::Database(_)));
    }
}
