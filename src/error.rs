use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error type for signature building and verification
#[derive(Error, Debug)]
pub enum Error {
    /// Algorithm identifier (OID, URI or name) not known to the registry
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Parameter-spec name not valid for the algorithm family
    #[error("Invalid parameter spec: {0}")]
    InvalidParameterSpec(String),

    /// Key does not match the requested algorithm family or curve
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Carrier document lacks the required structure
    #[error("Malformed carrier document: {0}")]
    MalformedCarrier(String),

    /// Document carries no signature element
    #[error("No signature found in document")]
    SignatureNotFound,

    /// Signature could not be produced
    #[error("Signing failed: {0}")]
    SigningFailure(#[source] crate::crypto::Error),

    /// Verification could not be carried out (distinct from a mismatch)
    #[error("Verification failed: {0}")]
    VerificationFailure(String),

    /// Crypto provider error
    #[error("Crypto error: {0}")]
    Crypto(#[from] crate::crypto::Error),

    /// XML processing error
    #[error("XML error: {0}")]
    Xml(String),

    /// Base64 decoding error
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// UTF-8 decoding error
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// ASN.1 encoding/decoding error
    #[error("ASN.1 error: {0}")]
    Asn1(#[from] der::Error),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::SeError> for Error {
    fn from(err: quick_xml::SeError) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Utf8(err.utf8_error())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Xml(err.to_string())
    }
}
