//! Error types shared by every module of the crate.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PkiError>;

/// Represents errors that can occur while issuing, storing or loading PKI material.
///
/// `NotFound` is an expected outcome for callers probing the disk: it means the
/// material has to be generated. Every other variant should abort the caller's flow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PkiError {
    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during key generation or while drawing randomness.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// The key is weaker than the accepted minimum.
    #[error("Key too weak: {bits}-bit RSA-equivalent strength is below the {minimum}-bit minimum")]
    WeakKey { bits: usize, minimum: usize },

    /// The issuing key could not produce a valid signature.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// Error related to certificate contents or chain linkage.
    #[error("Certificate error: {0}")]
    CertificateError(String),

    /// A file or directory operation failed.
    #[error("I/O error on {path}: {message}")]
    IoError { path: String, message: String },

    /// The requested artifact does not exist on disk.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl PkiError {
    /// Returns true when the error only signals absent material.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PkiError::NotFound(_))
    }
}

impl From<der::Error> for PkiError {
    /// Converts a `der::Error` into a `PkiError`.
    fn from(err: der::Error) -> Self {
        PkiError::DecodingError(err.to_string())
    }
}
