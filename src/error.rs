use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or out-of-range input, rejected before any storage call.
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{op}: task {id} not found")]
    NotFound { op: &'static str, id: i64 },

    /// A lifecycle rule forbids the requested change.
    #[error("{op}: task {id}: {message}")]
    Conflict {
        op: &'static str,
        id: i64,
        message: String,
    },

    #[error("{op}: storage error: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn conflict(op: &'static str, id: i64, message: impl Into<String>) -> Self {
        Self::Conflict {
            op,
            id,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Short machine-readable code for front ends.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Storage { .. } => "storage_error",
            Self::Config { .. } => "config_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "serialization_error",
        }
    }
}

/// Attach the operation name to a rusqlite failure.
pub(crate) trait StorageContext<T> {
    fn storage(self, op: &'static str) -> Result<T>;
}

impl<T> StorageContext<T> for rusqlite::Result<T> {
    fn storage(self, op: &'static str) -> Result<T> {
        self.map_err(|source| Error::Storage { op, source })
    }
}
