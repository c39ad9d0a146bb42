//! RSA keys and raw PKCS#1 v1.5 signing over a precomputed digest.

use crate::crypto::errors::{CryptoResult, Error};
use openssl::pkey::{PKey, Private, Public};
use openssl::rsa::Rsa;
use openssl::sign::{Signer, Verifier};

/// RSA key sizes supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaKeySize {
    Rsa2048,
    Rsa3072,
    Rsa4096,
}

impl RsaKeySize {
    pub fn bits(&self) -> u32 {
        match self {
            RsaKeySize::Rsa2048 => 2048,
            RsaKeySize::Rsa3072 => 3072,
            RsaKeySize::Rsa4096 => 4096,
        }
    }

    pub fn all() -> &'static [RsaKeySize] {
        &[
            RsaKeySize::Rsa2048,
            RsaKeySize::Rsa3072,
            RsaKeySize::Rsa4096,
        ]
    }
}

impl TryFrom<u32> for RsaKeySize {
    type Error = Error;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            2048 => Ok(Self::Rsa2048),
            3072 => Ok(Self::Rsa3072),
            4096 => Ok(Self::Rsa4096),
            _ => Err(Error::Invalid("Unsupported RSA key size".into())),
        }
    }
}

/// RSA private key wrapper
#[derive(Debug, Clone)]
pub struct RsaPrivateKey {
    key: PKey<Private>,
    key_size: RsaKeySize,
}

impl RsaPrivateKey {
    pub fn generate(key_size: RsaKeySize) -> CryptoResult<Self> {
        let rsa = Rsa::generate(key_size.bits())?;
        let key = PKey::from_rsa(rsa)?;
        Ok(Self { key, key_size })
    }

    /// Load from PEM-encoded PKCS#1/PKCS#8.
    pub fn from_pem(pem_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let key = PKey::private_key_from_pem(pem_bytes.as_ref())?;
        Self::from_pkey(key)
    }

    /// Load from DER-encoded PKCS#1/PKCS#8.
    pub fn from_der(der_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let key = PKey::private_key_from_der(der_bytes.as_ref())?;
        Self::from_pkey(key)
    }

    fn from_pkey(key: PKey<Private>) -> CryptoResult<Self> {
        let rsa = key.rsa()?;
        let key_size = RsaKeySize::try_from(rsa.size() * 8)?;
        Ok(Self { key, key_size })
    }

    /// Serialize as DER-encoded PKCS#8.
    pub fn to_der(&self) -> CryptoResult<Vec<u8>> {
        Ok(self.key.private_key_to_pkcs8()?)
    }

    /// Serialize as PEM-encoded PKCS#8.
    pub fn to_pem(&self) -> CryptoResult<String> {
        let pem_bytes = self.key.private_key_to_pem_pkcs8()?;
        Ok(String::from_utf8_lossy(&pem_bytes).to_string())
    }

    pub fn public_key(&self) -> CryptoResult<RsaPublicKey> {
        let pub_key = PKey::public_key_from_der(&self.key.public_key_to_der()?)?;
        Ok(RsaPublicKey {
            key: pub_key,
            key_size: self.key_size,
        })
    }

    pub fn key_size(&self) -> RsaKeySize {
        self.key_size
    }

    pub(crate) fn pkey(&self) -> &PKey<Private> {
        &self.key
    }
}

/// RSA public key wrapper
#[derive(Debug, Clone)]
pub struct RsaPublicKey {
    key: PKey<Public>,
    key_size: RsaKeySize,
}

impl RsaPublicKey {
    /// Load from SubjectPublicKeyInfo DER.
    pub fn from_der(der_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let key = PKey::public_key_from_der(der_bytes.as_ref())?;
        let key_size = RsaKeySize::try_from(key.rsa()?.size() * 8)?;
        Ok(Self { key, key_size })
    }

    /// Export as SubjectPublicKeyInfo DER.
    pub fn to_der(&self) -> CryptoResult<Vec<u8>> {
        Ok(self.key.public_key_to_der()?)
    }

    /// Export as DER-encoded PKCS#1 RSAPublicKey (the SPKI bit-string body).
    pub fn to_pkcs1_der(&self) -> CryptoResult<Vec<u8>> {
        Ok(self.key.rsa()?.public_key_to_der_pkcs1()?)
    }

    pub fn key_size(&self) -> RsaKeySize {
        self.key_size
    }

    pub(crate) fn pkey(&self) -> &PKey<Public> {
        &self.key
    }
}

/// An RSA key pair
#[derive(Debug, Clone)]
pub struct RsaKeyPair {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl RsaKeyPair {
    pub fn generate(key_size: RsaKeySize) -> CryptoResult<Self> {
        Self::from_private_key(RsaPrivateKey::generate(key_size)?)
    }

    pub fn from_private_key(private_key: RsaPrivateKey) -> CryptoResult<Self> {
        let public_key = private_key.public_key()?;
        Ok(Self {
            private_key,
            public_key,
        })
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub fn key_size(&self) -> RsaKeySize {
        self.private_key.key_size()
    }
}

/// Raw PKCS#1 v1.5 signature over an externally computed digest.
pub fn sign_digest(private_key: &RsaPrivateKey, digest: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut signer = Signer::new_without_digest(private_key.pkey())?;
    Ok(signer.sign_oneshot_to_vec(digest)?)
}

/// Verify a raw PKCS#1 v1.5 signature over an externally computed digest.
pub fn verify_digest(
    public_key: &RsaPublicKey,
    digest: &[u8],
    signature: &[u8],
) -> CryptoResult<bool> {
    let mut verifier = Verifier::new_without_digest(public_key.pkey())?;
    Ok(verifier.verify_oneshot(signature, digest)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsa_key_pair_generation() {
        let key_pair = RsaKeyPair::generate(RsaKeySize::Rsa2048).unwrap();
        assert_eq!(key_pair.key_size(), RsaKeySize::Rsa2048);
        assert_eq!(key_pair.public_key().key_size(), RsaKeySize::Rsa2048);
    }

    #[test]
    fn test_rsa_sign_verify_digest() {
        let key_pair = RsaKeyPair::generate(RsaKeySize::Rsa2048).unwrap();
        let digest = [0x5Au8; 20];

        let signature = sign_digest(key_pair.private_key(), &digest).unwrap();
        assert_eq!(signature.len(), 256);
        assert!(verify_digest(key_pair.public_key(), &digest, &signature).unwrap());

        let wrong = [0xA5u8; 20];
        assert!(!verify_digest(key_pair.public_key(), &wrong, &signature).unwrap());
    }

    #[test]
    fn test_key_codec_round_trip() {
        let key = RsaPrivateKey::generate(RsaKeySize::Rsa2048).unwrap();

        let der = key.to_der().unwrap();
        let from_der = RsaPrivateKey::from_der(&der).unwrap();
        assert_eq!(from_der.to_der().unwrap(), der);

        let pem = key.to_pem().unwrap();
        let from_pem = RsaPrivateKey::from_pem(&pem).unwrap();
        assert_eq!(from_pem.to_der().unwrap(), der);

        let pub_der = key.public_key().unwrap().to_der().unwrap();
        let pub_key = RsaPublicKey::from_der(&pub_der).unwrap();
        assert_eq!(pub_key.to_der().unwrap(), pub_der);
    }

    #[test]
    fn test_cross_key_verification_fails() {
        let key1 = RsaKeyPair::generate(RsaKeySize::Rsa2048).unwrap();
        let key2 = RsaKeyPair::generate(RsaKeySize::Rsa2048).unwrap();
        let digest = [0x11u8; 20];
        let signature = sign_digest(key1.private_key(), &digest).unwrap();
        assert!(!verify_digest(key2.public_key(), &digest, &signature).unwrap());
    }
}
