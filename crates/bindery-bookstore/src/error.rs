use crate::config::ConfigError;
use bindery_core::{SchemaError, TraverseError};
use bindery_store::StoreError;
use thiserror::Error;

/// Errors surfaced by handlers and the request loop.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Traverse(#[from] TraverseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unknown route: {0}")]
    UnknownRoute(String),
}

impl AppError {
    /// HTTP status reported for this error.
    pub fn status(&self) -> u16 {
        match self {
            AppError::Store(err) if err.is_not_found() => 404,
            AppError::UnknownRoute(_) => 404,
            AppError::BadRequest(_) => 400,
            AppError::Forbidden(_) => 403,
            AppError::Conflict(_) => 409,
            AppError::Store(_)
            | AppError::Traverse(_)
            | AppError::Schema(_)
            | AppError::Config(_) => 500,
        }
    }
}
