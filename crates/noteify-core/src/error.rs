//! Error types for noteify-core

use thiserror::Error;

use crate::remote::ApiError;

/// Result type alias using noteify-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in noteify-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Remote notes API failure
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
