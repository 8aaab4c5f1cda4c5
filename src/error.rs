//! use certsmith::error::CertError;

use std::convert::Infallible;

use thiserror::Error;

/// Represents errors that can occur while configuring, building or exporting
/// a certificate.
///
/// Validation failures recorded by the builder and operational failures from
/// key generation, signing, encoding or storage share this single type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CertError {
    /// A builder setter rejected its input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The secure random source failed.
    #[error("Random number generation failed: {0}")]
    RandomnessError(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error while signing the certificate.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// The requested export format is not supported.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Error while writing an artifact.
    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, CertError>;

impl From<der::Error> for CertError {
    fn from(err: der::Error) -> Self {
        CertError::EncodingError(err.to_string())
    }
}

impl From<rsa::Error> for CertError {
    fn from(err: rsa::Error) -> Self {
        CertError::KeyGenerationError(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for CertError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        CertError::EncodingError(err.to_string())
    }
}

impl From<rsa::pkcs8::Error> for CertError {
    fn from(err: rsa::pkcs8::Error) -> Self {
        CertError::EncodingError(err.to_string())
    }
}

impl From<x509_cert::spki::Error> for CertError {
    fn from(err: x509_cert::spki::Error) -> Self {
        CertError::EncodingError(err.to_string())
    }
}

impl From<time::error::ComponentRange> for CertError {
    fn from(err: time::error::ComponentRange) -> Self {
        CertError::InvalidInput(err.to_string())
    }
}

impl From<std::io::Error> for CertError {
    fn from(err: std::io::Error) -> Self {
        CertError::IoError(err.to_string())
    }
}

impl From<Infallible> for CertError {
    fn from(err: Infallible) -> Self {
        match err {}
    }
}
