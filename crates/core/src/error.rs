use tokio::runtime::TryCurrentError;

/// Failures reported by a storage medium.
///
/// These never reach the caller of [PersistentValue](crate::PersistentValue),
/// they are logged and handed to the configured
/// [StoreEventHandler](crate::StoreEventHandler) instead.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage unavailable - {reason}")]
    Unavailable { reason: String },
    #[error("Quota exceeded writing {key} - needed {needed} bytes of {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },
    #[error("Storage IO Error - {error}")]
    Io {
        #[from]
        error: std::io::Error,
    },
    #[error("Stored data is corrupt - {reason}")]
    Corrupt { reason: String },
    #[error("Cookie Error - {reason}")]
    Cookie { reason: String },
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Corrupt {
            reason: e.to_string(),
        }
    }
}

/// Failure to turn a persisted string back into a value.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Parse Error - {reason}")]
    Parse { reason: String },
    #[error("JSON Error - {error}")]
    Json {
        #[from]
        error: serde_json::Error,
    },
}

impl CodecError {
    pub fn parse(reason: impl std::fmt::Display) -> Self {
        CodecError::Parse {
            reason: reason.to_string(),
        }
    }
}

/// Errors returned while setting up a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("A flush scheduler must be created from within a tokio runtime - {error}")]
    NoRuntime {
        #[from]
        error: TryCurrentError,
    },
    #[error("Failed to open storage - {error}")]
    Storage {
        #[from]
        error: StorageError,
    },
}
