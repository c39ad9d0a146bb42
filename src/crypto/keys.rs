use crate::algorithm::SignAlgorithm;
use crate::crypto::errors::CryptoResult;
use crate::crypto::gost::{GostKeyPair, GostPublicKey};
use crate::crypto::rsa::{RsaKeyPair, RsaKeySize, RsaPublicKey};
use crate::error::Result;
use secrecy::{ExposeSecret, SecretSlice};
use std::fmt;

/// Secure wrapper for sensitive byte data that zeroizes on drop
#[derive(Clone)]
pub struct SecureBytes(SecretSlice<u8>);

impl SecureBytes {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(SecretSlice::new(data.into().into()))
    }

    pub fn expose_secret(&self) -> &[u8] {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureBytes([REDACTED])")
    }
}

impl From<Vec<u8>> for SecureBytes {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl From<&[u8]> for SecureBytes {
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

/// Symmetric key for the keyed-MAC signature method
#[derive(Debug, Clone)]
pub struct MacKey {
    data: SecureBytes,
}

impl MacKey {
    /// Generate a random key of the given byte length.
    pub fn generate(len: usize) -> CryptoResult<Self> {
        let mut data = vec![0u8; len];
        openssl::rand::rand_bytes(&mut data)?;
        Ok(Self {
            data: SecureBytes::new(data),
        })
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: SecureBytes::new(data),
        }
    }

    pub fn expose_secret(&self) -> &[u8] {
        self.data.expose_secret()
    }
}

/// A signing key of any supported method: the asymmetric families plus the
/// shared-key MAC method.
#[derive(Debug)]
pub enum KeyPair {
    Rsa(RsaKeyPair),
    Gost(GostKeyPair),
    Mac(MacKey),
}

impl KeyPair {
    /// The signature family, `None` for the MAC method.
    pub fn algorithm(&self) -> Option<SignAlgorithm> {
        match self {
            KeyPair::Rsa(_) => Some(SignAlgorithm::Rsa),
            KeyPair::Gost(key) => Some(key.algorithm()),
            KeyPair::Mac(_) => None,
        }
    }

    /// The curve parameter-set name, for EC families.
    pub fn parameter_spec(&self) -> Option<&'static str> {
        match self {
            KeyPair::Gost(key) => Some(key.curve().name),
            _ => None,
        }
    }

    pub fn public_key(&self) -> CryptoResult<PublicKey> {
        Ok(match self {
            KeyPair::Rsa(key) => PublicKey::Rsa(key.public_key().clone()),
            KeyPair::Gost(key) => PublicKey::Gost(key.public_key().clone()),
            KeyPair::Mac(key) => PublicKey::Mac(key.clone()),
        })
    }
}

/// A verification key. For the MAC method this is the same shared key used
/// for signing.
#[derive(Debug, Clone)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    Gost(GostPublicKey),
    Mac(MacKey),
}

impl PublicKey {
    pub fn algorithm(&self) -> Option<SignAlgorithm> {
        match self {
            PublicKey::Rsa(_) => Some(SignAlgorithm::Rsa),
            PublicKey::Gost(key) => Some(key.algorithm()),
            PublicKey::Mac(_) => None,
        }
    }
}

/// Generate a key pair for the family, resolving the parameter spec through
/// the registry (`None` selects the family default).
pub fn generate_key_pair(
    algorithm: SignAlgorithm,
    parameter_spec: Option<&str>,
) -> Result<KeyPair> {
    let spec = algorithm.resolve_parameter_spec(parameter_spec)?;
    match algorithm {
        SignAlgorithm::Rsa => Ok(KeyPair::Rsa(RsaKeyPair::generate(RsaKeySize::Rsa2048)?)),
        _ => {
            let curve = spec.ok_or_else(|| {
                crate::error::Error::InvalidParameterSpec(format!(
                    "{algorithm} requires a curve parameter set"
                ))
            })?;
            Ok(KeyPair::Gost(GostKeyPair::generate(algorithm, curve)?))
        }
    }
}
