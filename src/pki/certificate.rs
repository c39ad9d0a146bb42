//! DER-backed X.509 certificate with the introspection the signature engine
//! needs: algorithm family, public key, validity window and thumbprint.

use crate::algorithm::SignAlgorithm;
use crate::crypto::gost::GostPublicKey;
use crate::crypto::rsa::RsaPublicKey;
use crate::crypto::{self, PublicKey, curves};
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use der::asn1::{ObjectIdentifier, OctetString};
use der::{Decode, Encode, Sequence, ValueOrd};
use sha1::{Digest, Sha1};
use std::fmt;
use x509_parser::prelude::FromDer;

const RSA_OID_ROOT: &str = "1.2.840.113549.1.1";

/// GOST SPKI algorithm parameters: the curve parameter-set OID and the
/// companion digest OID.
#[derive(Clone, Debug, Sequence, ValueOrd)]
pub(crate) struct GostKeyParameters {
    pub public_key_param_set: ObjectIdentifier,
    pub digest_param_set: ObjectIdentifier,
}

/// An X.509 certificate kept in DER form and parsed on demand.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
}

fn parse_err(err: impl fmt::Display) -> Error {
    Error::Crypto(crypto::Error::Invalid(format!(
        "Certificate parse error: {err}"
    )))
}

impl Certificate {
    /// Wrap DER bytes, validating that they parse as a certificate.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self> {
        let der = der.into();
        x509_parser::certificate::X509Certificate::from_der(&der).map_err(parse_err)?;
        Ok(Self { der })
    }

    /// Decode from base64 DER; whitespace (line wraps) is tolerated.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let compact: String = encoded.split_whitespace().collect();
        Self::from_der(BASE64.decode(compact.as_bytes())?)
    }

    /// Load from a PEM `CERTIFICATE` block.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let body: String = pem
            .lines()
            .filter(|line| !line.starts_with("-----"))
            .collect();
        Self::from_der(BASE64.decode(body.as_bytes())?)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Single-line base64 of the DER, as carried in a BinarySecurityToken.
    pub fn base64(&self) -> String {
        BASE64.encode(&self.der)
    }

    pub fn to_pem(&self) -> String {
        let mut out = String::from("-----BEGIN CERTIFICATE-----\n");
        let encoded = self.base64();
        for chunk in encoded.as_bytes().chunks(64) {
            // chunks of a valid base64 string stay valid UTF-8
            out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
            out.push('\n');
        }
        out.push_str("-----END CERTIFICATE-----\n");
        out
    }

    fn parsed(&self) -> Result<x509_parser::certificate::X509Certificate<'_>> {
        let (_, cert) = x509_parser::certificate::X509Certificate::from_der(&self.der)
            .map_err(parse_err)?;
        Ok(cert)
    }

    /// Signature family, resolved from the certificate's signature-algorithm
    /// OID. The whole `pkcs-1` arc maps to RSA.
    pub fn algorithm(&self) -> Result<SignAlgorithm> {
        let cert = self.parsed()?;
        let oid = cert.signature_algorithm.algorithm.to_id_string();
        if oid.starts_with(RSA_OID_ROOT) {
            return Ok(SignAlgorithm::Rsa);
        }
        SignAlgorithm::from_oid(&oid)
    }

    /// Decode the subject public key. GOST keys carry their curve in the
    /// SPKI algorithm parameters.
    pub fn public_key(&self) -> Result<PublicKey> {
        let cert = x509_cert::Certificate::from_der(&self.der)?;
        let spki = &cert.tbs_certificate.subject_public_key_info;
        let alg_oid = spki.algorithm.oid.to_string();

        if alg_oid.starts_with(RSA_OID_ROOT) {
            let spki_der = spki.to_der()?;
            return Ok(PublicKey::Rsa(RsaPublicKey::from_der(&spki_der)?));
        }

        let algorithm = SignAlgorithm::from_oid(&alg_oid)?;
        let params = spki.algorithm.parameters.as_ref().ok_or_else(|| {
            Error::InvalidKey("GOST certificate lacks key parameters".into())
        })?;
        let key_params: GostKeyParameters = params.decode_as()?;
        let curve = curves::find_by_oid(&key_params.public_key_param_set.to_string())
            .ok_or_else(|| {
                Error::InvalidKey(format!(
                    "Unknown curve parameter set {}",
                    key_params.public_key_param_set
                ))
            })?;
        // RFC 4491 wraps the little-endian coordinates in an OCTET STRING
        let wrapped = OctetString::from_der(spki.subject_public_key.raw_bytes())?;
        Ok(PublicKey::Gost(GostPublicKey::from_spki_bytes(
            algorithm,
            curve.name,
            wrapped.as_bytes(),
        )?))
    }

    pub fn subject(&self) -> Result<String> {
        Ok(self.parsed()?.subject().to_string())
    }

    pub fn issuer(&self) -> Result<String> {
        Ok(self.parsed()?.issuer().to_string())
    }

    pub fn serial(&self) -> Result<String> {
        Ok(self.parsed()?.raw_serial_as_string())
    }

    /// True when the current time falls inside the validity window.
    pub fn is_valid_now(&self) -> Result<bool> {
        Ok(self.parsed()?.validity().is_valid())
    }

    /// SHA-1 thumbprint of the DER, lowercase hex.
    pub fn thumbprint(&self) -> String {
        hex::encode(Sha1::digest(&self.der))
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("thumbprint", &self.thumbprint())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_key_pair;
    use crate::pki;

    #[test]
    fn test_codec_round_trip() {
        let key = generate_key_pair(SignAlgorithm::Gost2012_256, None).unwrap();
        let cert = pki::self_signed(&key, "test").unwrap();

        let b64 = cert.base64();
        let from_b64 = Certificate::from_base64(&b64).unwrap();
        assert_eq!(from_b64.der(), cert.der());

        let pem = cert.to_pem();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----"));
        let from_pem = Certificate::from_pem(&pem).unwrap();
        assert_eq!(from_pem.der(), cert.der());
    }

    #[test]
    fn test_thumbprint_is_sha1_hex() {
        let key = generate_key_pair(SignAlgorithm::Gost2001, None).unwrap();
        let cert = pki::self_signed(&key, "test").unwrap();
        let thumb = cert.thumbprint();
        assert_eq!(thumb.len(), 40);
        assert!(thumb.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_garbage_der_rejected() {
        assert!(Certificate::from_der(vec![0x30, 0x01, 0x00]).is_err());
        assert!(Certificate::from_base64("not base64 !!!").is_err());
    }
}
