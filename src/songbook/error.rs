use thiserror::Error;

#[derive(Debug, Error)]
pub enum SongbookError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("operation not allowed")]
    Forbidden,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl SongbookError {
    pub fn invalid<S: Into<String>>(field: &'static str, reason: S) -> Self {
        SongbookError::Invalid {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found<S: AsRef<str>>(kind: &str, id: S) -> Self {
        SongbookError::NotFound(format!("{} {}", kind, id.as_ref()))
    }
}

impl From<rusqlite::Error> for SongbookError {
    fn from(err: rusqlite::Error) -> Self {
        SongbookError::Store(err.into())
    }
}

pub type SongbookResult<T> = std::result::Result<T, SongbookError>;
