use chrono::NaiveDate;
use thiserror::Error;

use crate::model::TrackerId;

/// Failures reported by a persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("category '{title}' already exists")]
    DuplicateTitle { title: String },

    #[error("category '{title}' not found")]
    CategoryNotFound { title: String },

    #[error("tracker {id} not found")]
    TrackerNotFound { id: TrackerId },

    #[error("no completion for tracker {tracker_id} on {date}")]
    RecordNotFound { tracker_id: TrackerId, date: NaiveDate },

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage document is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Failures of core mutations. Read operations never fail.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("category '{title}' already exists")]
    DuplicateTitle { title: String },

    #[error("category '{title}' not found")]
    CategoryNotFound { title: String },

    #[error("tracker {id} not found")]
    TrackerNotFound { id: TrackerId },

    #[error("no completion for tracker {tracker_id} on {date}")]
    RecordNotFound { tracker_id: TrackerId, date: NaiveDate },

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl TrackerError {
    /// True when the failure came from the persistence collaborator rather
    /// than from validating the request against in-memory state.
    pub fn is_storage(&self) -> bool {
        matches!(self, TrackerError::Storage(_))
    }
}
