//! Self-signed certificate generation, used by tests and key tooling.

use crate::crypto::{self, KeyPair, PublicKey, digest, gost, rsa};
use crate::error::{Error, Result};
use crate::pki::certificate::{Certificate, GostKeyParameters};
use crate::pki::oid;
use der::asn1::{Any, BitString, Null, OctetString, UtcTime};
use der::Encode;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use x509_cert::certificate::{TbsCertificate, Version};
use x509_cert::name::{Name, RdnSequence};
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::{Time, Validity};

const VALIDITY_DAYS: u64 = 365;

fn subject_name(common_name: &str) -> Result<Name> {
    Ok(RdnSequence::from_str(&format!("CN={common_name}"))?)
}

fn validity_from_now() -> Result<Validity> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Crypto(crypto::Error::Invalid(e.to_string())))?;
    let not_after = now + Duration::from_secs(VALIDITY_DAYS * 24 * 3600);
    Ok(Validity {
        not_before: Time::UtcTime(UtcTime::from_unix_duration(now)?),
        not_after: Time::UtcTime(UtcTime::from_unix_duration(not_after)?),
    })
}

fn spki_for(key: &KeyPair) -> Result<SubjectPublicKeyInfoOwned> {
    let algorithm = key
        .algorithm()
        .ok_or_else(|| Error::InvalidKey("Certificates require an asymmetric key".into()))?;
    let descriptor = algorithm.descriptor();

    match key.public_key()? {
        PublicKey::Rsa(public) => Ok(SubjectPublicKeyInfoOwned {
            algorithm: AlgorithmIdentifierOwned {
                oid: oid(descriptor.encryption_oid)?,
                parameters: Some(Any::encode_from(&Null)?),
            },
            subject_public_key: BitString::from_bytes(&public.to_pkcs1_der()?)?,
        }),
        PublicKey::Gost(public) => {
            let params = GostKeyParameters {
                public_key_param_set: oid(public.curve().oid)?,
                digest_param_set: oid(descriptor.hash_oid)?,
            };
            // RFC 4491: the bit string wraps an OCTET STRING of the
            // little-endian coordinates
            let point = OctetString::new(public.spki_bytes())?.to_der()?;
            Ok(SubjectPublicKeyInfoOwned {
                algorithm: AlgorithmIdentifierOwned {
                    oid: oid(descriptor.encryption_oid)?,
                    parameters: Some(Any::encode_from(&params)?),
                },
                subject_public_key: BitString::from_bytes(&point)?,
            })
        }
        PublicKey::Mac(_) => Err(Error::InvalidKey(
            "Certificates require an asymmetric key".into(),
        )),
    }
}

fn sign_tbs(key: &KeyPair, tbs_der: &[u8]) -> Result<Vec<u8>> {
    match key {
        KeyPair::Rsa(pair) => {
            let hashed = digest::digest(crate::algorithm::SignAlgorithm::Rsa, tbs_der);
            rsa::sign_digest(pair.private_key(), &hashed).map_err(Error::SigningFailure)
        }
        KeyPair::Gost(pair) => {
            let hashed = digest::digest(pair.algorithm(), tbs_der);
            gost::sign(pair, &hashed).map_err(Error::SigningFailure)
        }
        KeyPair::Mac(_) => Err(Error::InvalidKey(
            "Certificates require an asymmetric key".into(),
        )),
    }
}

/// Build a self-signed certificate over the key pair: `CN=<name>`, serial 1,
/// valid for one year from now.
pub fn self_signed(key: &KeyPair, common_name: &str) -> Result<Certificate> {
    let algorithm = key
        .algorithm()
        .ok_or_else(|| Error::InvalidKey("Certificates require an asymmetric key".into()))?;
    let descriptor = algorithm.descriptor();

    let signature_algorithm = AlgorithmIdentifierOwned {
        oid: oid(descriptor.signature_oid)?,
        parameters: match algorithm {
            crate::algorithm::SignAlgorithm::Rsa => Some(Any::encode_from(&Null)?),
            _ => None,
        },
    };

    let name = subject_name(common_name)?;
    let tbs = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&[1u8])?,
        signature: signature_algorithm.clone(),
        issuer: name.clone(),
        validity: validity_from_now()?,
        subject: name,
        subject_public_key_info: spki_for(key)?,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: None,
    };

    let tbs_der = tbs.to_der()?;
    let signature = sign_tbs(key, &tbs_der)?;
    let cert = x509_cert::Certificate {
        tbs_certificate: tbs,
        signature_algorithm,
        signature: BitString::from_bytes(&signature)?,
    };
    Certificate::from_der(cert.to_der()?)
}
