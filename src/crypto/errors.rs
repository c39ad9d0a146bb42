use openssl::error::ErrorStack;
use thiserror::Error;

pub(crate) type CryptoResult<T> = Result<T, Error>;

/// Error type for cryptographic operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid data format or corrupted data
    #[error("Invalid data: {0}")]
    Invalid(String),

    /// Unsupported curve parameter set
    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(String),

    /// Internal OpenSSL error
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] ErrorStack),

    /// I/O error while digesting a stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
