use bindery_core::TraverseError;

/// Errors raised while storing, loading, or querying documents.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("document already exists: {collection}/{id}")]
    DuplicateId { collection: String, id: String },

    #[error("document in `{collection}` has no string `_id`")]
    MissingId { collection: String },

    #[error("corrupted store file {path}: {message}")]
    Corrupt { path: String, message: String },

    #[error("{path}: I/O error: {message}")]
    Io { path: String, message: String },

    #[error("store lock busy: {lock_path}")]
    LockBusy { lock_path: String },

    #[error(transparent)]
    Traverse(#[from] TraverseError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub(crate) fn io(path: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        StoreError::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}
