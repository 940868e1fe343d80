//! Error taxonomy for mutating operations.
//!
//! Mutations (ingest, delete, space changes) halt with a [`ServiceError`].
//! Query operations never return these; see [`crate::outcome`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// A mutation was attempted without a caller identity.
    #[error("authentication required")]
    AuthenticationRequired,

    /// The caller is known but lacks ownership or an accepted membership.
    #[error("access denied")]
    AccessDenied,

    /// The referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unexpected backend failure.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "unauthenticated",
            Self::AccessDenied => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::InvalidInput(_) => "bad_request",
            Self::Internal(_) => "internal",
        }
    }
}
