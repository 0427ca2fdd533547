use thiserror::Error;

use crate::LinkID;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("schema version changed from `{expected}` to `{found}` by another session, reload required")]
    VersionChange { expected: i64, found: i64 },
    #[error("store blocked: {0}")]
    Blocked(String),
    #[error("link `{0}` doesn't exist")]
    LinkNotExist(LinkID),
    #[error("url `{0}` already belongs to another link")]
    UrlConflict(String),
    #[error("title and content cannot both be empty")]
    EmptyNote,
    #[error("url cannot be empty")]
    EmptyUrl,
    #[error("stored data is corrupted: {0}")]
    Corrupted(String),
    #[error("io error")]
    IOError(#[from] std::io::Error),
    #[error("serde error")]
    SerdeError(#[from] serde_json::Error),
    #[error("SQLite error")]
    SQLiteError(#[from] sqlx::Error),
}

impl StoreError {
    /// Whether the backend that returned this error should no longer be used.
    ///
    /// The storage facade reacts to these by switching to the flat backend.
    pub fn is_unavailable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) | StoreError::IOError(_) => true,
            StoreError::SQLiteError(e) => matches!(
                e,
                sqlx::Error::PoolClosed
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::WorkerCrashed
                    | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }

    /// Whether the session has to be reloaded before the store can be used again.
    pub fn requires_reload(&self) -> bool {
        matches!(
            self,
            StoreError::VersionChange { .. } | StoreError::Blocked(_)
        )
    }
}

/// Error type for export and import.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Wrong password, or the payload was tampered with or truncated.
    #[error("decryption failed, the password is wrong or the file is corrupted")]
    Decryption,
    #[error("encryption failed")]
    Encryption,
    #[error("the file is encrypted, a password is required")]
    PasswordRequired,
    #[error("malformed import file: `{0}`")]
    Malformed(String),
    #[error("serde error")]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}
