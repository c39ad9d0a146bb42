//! XML digital signatures for the GOST R 34.10 algorithm families, with an
//! RSA fallback for interoperability.
//!
//! The crate signs and verifies SOAP envelopes (WS-Security profile),
//! arbitrary XML documents (enveloped profile) and attachment content
//! (detached CMS). Signature methods are pluggable behind
//! [`dsig::SignatureMethodPlugin`]; the supported families and their wire
//! identifiers live in [`algorithm`].

pub mod algorithm;
pub mod attachment;
pub mod c14n;
pub mod crypto;
pub mod dsig;
pub mod error;
pub mod pki;
pub mod xml;

pub use algorithm::{AlgorithmDescriptor, SignAlgorithm};
pub use crypto::{KeyPair, PublicKey, generate_key_pair};
pub use dsig::{VerificationOutcome, sign_enveloped, sign_soap, verify};
pub use error::{Error, Result};
pub use pki::Certificate;
