//! Signature methods behind a common trait, so the builder and verifier
//! stay agnostic of the key family.

use crate::algorithm::SignAlgorithm;
use crate::crypto::gost::{self, GostKeyPair, GostPublicKey};
use crate::crypto::{KeyPair, PublicKey, digest, mac, rsa};
use crate::error::{Error, Result};

pub const HMAC_GOSTR3411_URI: &str = "http://www.w3.org/2001/04/xmldsig-more#hmac-gostr3411";

/// A pluggable SignatureMethod. Implementations hash the canonical bytes
/// with their family's digest before signing, as the method URIs require.
pub trait SignatureMethodPlugin {
    /// The Algorithm URI this method signs under.
    fn algorithm_uri(&self) -> &str;

    /// Curve parameter-set name bound to this instance, for EC methods.
    fn parameter_spec(&self) -> Option<&str> {
        None
    }

    /// Accept or reject method parameters before use. Methods without
    /// parameters reject any value.
    fn check_params(&mut self, params: Option<&str>) -> Result<()> {
        match params {
            None => Ok(()),
            Some(value) => Err(Error::InvalidParameterSpec(format!(
                "{} takes no parameters, got {value:?}",
                self.algorithm_uri()
            ))),
        }
    }

    /// Parameters to carry inside the SignatureMethod element, if any.
    fn marshal_params(&self) -> Result<Option<String>> {
        Ok(None)
    }

    /// Adopt parameters found in a document's SignatureMethod element.
    fn unmarshal_params(&mut self, params: Option<&str>) -> Result<()> {
        self.check_params(params)
    }

    fn sign(&self, key: &KeyPair, data: &[u8]) -> Result<Vec<u8>>;

    fn verify(&self, key: &PublicKey, data: &[u8], signature: &[u8]) -> Result<bool>;

    /// Two instances are the same method when URI and parameter spec agree.
    fn same_method(&self, other: &dyn SignatureMethodPlugin) -> bool {
        self.algorithm_uri() == other.algorithm_uri()
            && self.parameter_spec() == other.parameter_spec()
    }
}

fn wrong_key(expected: impl std::fmt::Display) -> Error {
    Error::InvalidKey(format!("Key does not match signature method {expected}"))
}

fn gost_pair<'a>(
    expected: SignAlgorithm,
    spec: Option<&str>,
    key: &'a KeyPair,
) -> Result<&'a GostKeyPair> {
    match key {
        KeyPair::Gost(pair) if pair.algorithm() == expected => {
            if let Some(name) = spec {
                if pair.curve().name != name {
                    return Err(Error::InvalidKey(format!(
                        "Key uses curve {}, method is bound to {name}",
                        pair.curve().name
                    )));
                }
            }
            Ok(pair)
        }
        _ => Err(wrong_key(expected)),
    }
}

fn gost_public<'a>(
    expected: SignAlgorithm,
    spec: Option<&str>,
    key: &'a PublicKey,
) -> Result<&'a GostPublicKey> {
    match key {
        PublicKey::Gost(public) if public.algorithm() == expected => {
            if let Some(name) = spec {
                if public.curve().name != name {
                    return Err(Error::InvalidKey(format!(
                        "Key uses curve {}, method is bound to {name}",
                        public.curve().name
                    )));
                }
            }
            Ok(public)
        }
        _ => Err(wrong_key(expected)),
    }
}

fn gost_sign(
    expected: SignAlgorithm,
    spec: Option<&str>,
    key: &KeyPair,
    data: &[u8],
) -> Result<Vec<u8>> {
    let pair = gost_pair(expected, spec, key)?;
    let hashed = digest::digest(expected, data);
    gost::sign(pair, &hashed).map_err(Error::SigningFailure)
}

fn gost_verify(
    expected: SignAlgorithm,
    spec: Option<&str>,
    key: &PublicKey,
    data: &[u8],
    signature: &[u8],
) -> Result<bool> {
    let public = gost_public(expected, spec, key)?;
    let hashed = digest::digest(expected, data);
    gost::verify(public, &hashed, signature)
        .map_err(|e| Error::VerificationFailure(e.to_string()))
}

/// Curve-bound GOST methods share this shape; the family is fixed per type.
macro_rules! gost_method {
    ($name:ident, $family:expr) => {
        #[derive(Debug, Default)]
        pub struct $name {
            parameter_spec: Option<String>,
        }

        impl $name {
            pub fn new(parameter_spec: Option<&str>) -> Result<Self> {
                let spec = $family.resolve_parameter_spec(parameter_spec)?;
                Ok(Self {
                    parameter_spec: spec.map(str::to_owned),
                })
            }
        }

        impl SignatureMethodPlugin for $name {
            fn algorithm_uri(&self) -> &str {
                $family.descriptor().sign_uri
            }

            fn parameter_spec(&self) -> Option<&str> {
                self.parameter_spec.as_deref()
            }

            fn check_params(&mut self, params: Option<&str>) -> Result<()> {
                let spec = $family.resolve_parameter_spec(params)?;
                self.parameter_spec = spec.map(str::to_owned);
                Ok(())
            }

            fn sign(&self, key: &KeyPair, data: &[u8]) -> Result<Vec<u8>> {
                gost_sign($family, self.parameter_spec(), key, data)
            }

            fn verify(&self, key: &PublicKey, data: &[u8], signature: &[u8]) -> Result<bool> {
                gost_verify($family, self.parameter_spec(), key, data, signature)
            }
        }
    };
}

gost_method!(Gost2001Method, SignAlgorithm::Gost2001);
gost_method!(Gost2012_256Method, SignAlgorithm::Gost2012_256);
gost_method!(Gost2012_512Method, SignAlgorithm::Gost2012_512);

/// RSA with SHA-1, the interoperability fallback.
#[derive(Debug, Default)]
pub struct RsaMethod;

impl SignatureMethodPlugin for RsaMethod {
    fn algorithm_uri(&self) -> &str {
        SignAlgorithm::Rsa.descriptor().sign_uri
    }

    fn sign(&self, key: &KeyPair, data: &[u8]) -> Result<Vec<u8>> {
        let KeyPair::Rsa(pair) = key else {
            return Err(wrong_key(SignAlgorithm::Rsa));
        };
        let hashed = digest::digest(SignAlgorithm::Rsa, data);
        rsa::sign_digest(pair.private_key(), &hashed).map_err(Error::SigningFailure)
    }

    fn verify(&self, key: &PublicKey, data: &[u8], signature: &[u8]) -> Result<bool> {
        let PublicKey::Rsa(public) = key else {
            return Err(wrong_key(SignAlgorithm::Rsa));
        };
        let hashed = digest::digest(SignAlgorithm::Rsa, data);
        rsa::verify_digest(public, &hashed, signature)
            .map_err(|e| Error::VerificationFailure(e.to_string()))
    }
}

/// Keyed MAC over the 2012 256-bit hash. The optional parameter is the
/// HMACOutputLength in bits; the tag is truncated to it on both sides.
#[derive(Debug, Default)]
pub struct GostMacMethod {
    output_bits: Option<usize>,
}

impl GostMacMethod {
    fn tag_len(&self) -> usize {
        self.output_bits.map(|bits| bits / 8).unwrap_or(32)
    }
}

impl SignatureMethodPlugin for GostMacMethod {
    fn algorithm_uri(&self) -> &str {
        HMAC_GOSTR3411_URI
    }

    fn check_params(&mut self, params: Option<&str>) -> Result<()> {
        match params {
            None => {
                self.output_bits = None;
                Ok(())
            }
            Some(value) => {
                let bits: usize = value.trim().parse().map_err(|_| {
                    Error::InvalidParameterSpec(format!("Bad HMACOutputLength {value:?}"))
                })?;
                if bits == 0 || bits > 256 || bits % 8 != 0 {
                    return Err(Error::InvalidParameterSpec(format!(
                        "HMACOutputLength must be a multiple of 8 in 8..=256, got {bits}"
                    )));
                }
                self.output_bits = Some(bits);
                Ok(())
            }
        }
    }

    fn marshal_params(&self) -> Result<Option<String>> {
        Ok(self.output_bits.map(|bits| bits.to_string()))
    }

    fn sign(&self, key: &KeyPair, data: &[u8]) -> Result<Vec<u8>> {
        let KeyPair::Mac(mac_key) = key else {
            return Err(wrong_key(HMAC_GOSTR3411_URI));
        };
        let mut tag = mac::sign(mac_key, data).map_err(Error::SigningFailure)?;
        tag.truncate(self.tag_len());
        Ok(tag)
    }

    fn verify(&self, key: &PublicKey, data: &[u8], signature: &[u8]) -> Result<bool> {
        let PublicKey::Mac(mac_key) = key else {
            return Err(wrong_key(HMAC_GOSTR3411_URI));
        };
        let full = mac::sign(mac_key, data).map_err(|e| Error::VerificationFailure(e.to_string()))?;
        let len = self.tag_len();
        if signature.len() != len {
            return Ok(false);
        }
        Ok(openssl::memcmp::eq(&full[..len], signature))
    }
}

/// Build the method instance for the family, with the curve spec resolved
/// through the registry.
pub fn plugin_for(
    algorithm: SignAlgorithm,
    parameter_spec: Option<&str>,
) -> Result<Box<dyn SignatureMethodPlugin>> {
    Ok(match algorithm {
        SignAlgorithm::Rsa => Box::new(RsaMethod),
        SignAlgorithm::Gost2001 => Box::new(Gost2001Method::new(parameter_spec)?),
        SignAlgorithm::Gost2012_256 => Box::new(Gost2012_256Method::new(parameter_spec)?),
        SignAlgorithm::Gost2012_512 => Box::new(Gost2012_512Method::new(parameter_spec)?),
    })
}
