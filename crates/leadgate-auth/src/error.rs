//! Error types.

use thiserror::Error;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// No signing secret was configured. Fatal at startup.
    #[error("signing secret is not configured")]
    MissingSecret,

    /// Token failed verification. Carries no reason on purpose.
    #[error("invalid session token")]
    InvalidToken,

    /// The verified principal is not bound to a tenant.
    #[error("session is not bound to a tenant")]
    NoTenant,

    /// Configuration or input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A protected-route pattern did not compile.
    #[error("invalid route pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// jsonwebtoken error while signing.
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
}
