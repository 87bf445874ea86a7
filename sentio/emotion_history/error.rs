use thiserror::Error;

/// Errors surfaced at the `record`/`summarize` boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// Malformed ingestion or query input; no state was mutated.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Offending input field.
        field: &'static str,
        /// Human-readable explanation.
        reason: String,
    },
    /// The user has never had an event recorded.
    #[error("no emotion history recorded for user {user_id}")]
    NoHistory {
        /// Queried user.
        user_id: String,
    },
}

impl HistoryError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// True for [`HistoryError::Validation`].
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Result alias for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;
