use thiserror::Error;
use trellis_types::Backend;

use crate::condition::Operator;

#[derive(Debug, Error)]
pub enum TrellisError {
    /// No resolver is registered for an operator on a backend
    #[error("Resolution error: no resolver for `{operator}` on the {backend} backend")]
    Resolution { operator: Operator, backend: Backend },

    /// A cast kind has no conversion registered for a backend
    #[error("Cast configuration error: cast kind `{kind}` has no conversion for the {backend} backend")]
    CastConfiguration { kind: String, backend: Backend },

    /// An attribute is declared with a cast kind nobody registered
    #[error("Cast configuration error: attribute `{attribute}` uses unknown cast kind `{kind}`")]
    UnknownCastKind { attribute: String, kind: String },

    /// A non-empty value could not be converted by a cast
    #[error("Cast error: {0}")]
    Cast(String),

    /// A command unit reached the execution layer of another backend
    #[error("Backend mismatch: expected a {expected} command unit, found {found}")]
    BackendMismatch { expected: Backend, found: Backend },

    /// The backend rejected a write (uniqueness, foreign key, ...)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Error executing a command
    #[error("Execution error: {0}")]
    Execution(String),

    /// Error mapping data
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Rusqlite specific errors
    #[cfg(feature = "rusqlite")]
    #[error("Rusqlite error: {0}")]
    Rusqlite(rusqlite::Error),
}

#[cfg(feature = "rusqlite")]
impl From<rusqlite::Error> for TrellisError {
    fn from(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                TrellisError::ConstraintViolation(
                    message.unwrap_or_else(|| failure.to_string()),
                )
            }
            other => TrellisError::Rusqlite(other),
        }
    }
}

/// Result type for trellis operations
pub type Result<T> = std::result::Result<T, TrellisError>;
