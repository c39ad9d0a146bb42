//! Detached CMS signatures over attachment content. The content itself is
//! never embedded; the SignedData carries the signer certificate and signed
//! attributes only.

use crate::algorithm::SignAlgorithm;
use crate::crypto::{KeyPair, PublicKey, digest, gost, rsa};
use crate::dsig::VerificationOutcome;
use crate::error::{Error, Result};
use crate::pki::{Certificate, oid};
use der::asn1::{Any, ObjectIdentifier, OctetString, SetOfVec, UtcTime};
use der::{Decode, Encode, Enumerated, Sequence, ValueOrd};
use std::cmp::Ordering;
use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use x509_cert::attr::Attribute;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::AlgorithmIdentifierOwned;

const ID_SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
const ID_DATA: &str = "1.2.840.113549.1.7.1";
const ATTR_CONTENT_TYPE: &str = "1.2.840.113549.1.9.3";
const ATTR_MESSAGE_DIGEST: &str = "1.2.840.113549.1.9.4";
const ATTR_SIGNING_TIME: &str = "1.2.840.113549.1.9.5";

#[derive(Clone, Copy, Debug, Enumerated, Eq, Ord, PartialEq, PartialOrd)]
#[asn1(type = "INTEGER")]
#[repr(u8)]
enum CmsVersion {
    V1 = 1,
    V3 = 3,
}

impl ValueOrd for CmsVersion {
    fn value_cmp(&self, other: &Self) -> der::Result<Ordering> {
        Ok(self.cmp(other))
    }
}

#[derive(Clone, Debug, Sequence)]
struct ContentInfo {
    content_type: ObjectIdentifier,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT")]
    content: Any,
}

#[derive(Clone, Debug, Sequence, ValueOrd)]
struct EncapsulatedContentInfo {
    econtent_type: ObjectIdentifier,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    econtent: Option<Any>,
}

#[derive(Clone, Debug, Sequence, ValueOrd)]
struct IssuerAndSerialNumber {
    issuer: Name,
    serial_number: SerialNumber,
}

#[derive(Clone, Debug, Sequence, ValueOrd)]
struct SignerInfo {
    version: CmsVersion,
    sid: IssuerAndSerialNumber,
    digest_algorithm: AlgorithmIdentifierOwned,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    signed_attrs: Option<SetOfVec<Attribute>>,
    signature_algorithm: AlgorithmIdentifierOwned,
    signature: OctetString,
}

#[derive(Clone, Debug, Sequence)]
struct SignedData {
    version: CmsVersion,
    digest_algorithms: SetOfVec<AlgorithmIdentifierOwned>,
    encap_content_info: EncapsulatedContentInfo,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    certificates: Option<SetOfVec<x509_cert::Certificate>>,
    signer_infos: SetOfVec<SignerInfo>,
}

fn attribute(type_oid: &str, value: Any) -> Result<Attribute> {
    Ok(Attribute {
        oid: oid(type_oid)?,
        values: SetOfVec::try_from(vec![value])?,
    })
}

fn signed_attributes(message_digest: &[u8]) -> Result<SetOfVec<Attribute>> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Crypto(crate::crypto::Error::Invalid(e.to_string())))?;
    let attrs = vec![
        attribute(ATTR_CONTENT_TYPE, Any::encode_from(&oid(ID_DATA)?)?)?,
        attribute(
            ATTR_SIGNING_TIME,
            Any::encode_from(&UtcTime::from_unix_duration(now)?)?,
        )?,
        attribute(
            ATTR_MESSAGE_DIGEST,
            Any::encode_from(&OctetString::new(message_digest)?)?,
        )?,
    ];
    Ok(SetOfVec::try_from(attrs)?)
}

fn digest_algorithm_identifier(algorithm: SignAlgorithm) -> Result<AlgorithmIdentifierOwned> {
    let descriptor = algorithm.descriptor();
    Ok(AlgorithmIdentifierOwned {
        oid: oid(descriptor.hash_oid)?,
        parameters: match algorithm {
            SignAlgorithm::Rsa => Some(Any::encode_from(&der::asn1::Null)?),
            _ => None,
        },
    })
}

fn sign_bytes(key: &KeyPair, algorithm: SignAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
    let hashed = digest::digest(algorithm, data);
    match key {
        KeyPair::Rsa(pair) => {
            rsa::sign_digest(pair.private_key(), &hashed).map_err(Error::SigningFailure)
        }
        KeyPair::Gost(pair) => gost::sign(pair, &hashed).map_err(Error::SigningFailure),
        KeyPair::Mac(_) => Err(Error::InvalidKey(
            "Detached signatures require an asymmetric key".into(),
        )),
    }
}

fn verify_bytes(
    key: &PublicKey,
    algorithm: SignAlgorithm,
    data: &[u8],
    signature: &[u8],
) -> Result<bool> {
    let hashed = digest::digest(algorithm, data);
    match key {
        PublicKey::Rsa(public) => rsa::verify_digest(public, &hashed, signature)
            .map_err(|e| Error::VerificationFailure(e.to_string())),
        PublicKey::Gost(public) => gost::verify(public, &hashed, signature)
            .map_err(|e| Error::VerificationFailure(e.to_string())),
        PublicKey::Mac(_) => Err(Error::InvalidKey(
            "Detached signatures require an asymmetric key".into(),
        )),
    }
}

/// Produce a detached CMS SignedData over the content, DER-encoded. The
/// digest, signing time and content type travel as signed attributes.
pub fn sign_detached(
    data: impl Read,
    key: &KeyPair,
    certificate: &Certificate,
) -> Result<Vec<u8>> {
    let algorithm = certificate.algorithm()?;
    if key.algorithm() != Some(algorithm) {
        return Err(Error::InvalidKey(format!(
            "Key family does not match certificate family {algorithm}"
        )));
    }
    let descriptor = algorithm.descriptor();

    let message_digest = digest::digest_stream(algorithm, data)?;
    let signed_attrs = signed_attributes(&message_digest)?;
    // The signature covers the attributes under their explicit SET tag
    let signature = sign_bytes(key, algorithm, &signed_attrs.to_der()?)?;
    debug!(%algorithm, "detached attributes signed");

    let signer_cert = x509_cert::Certificate::from_der(certificate.der())?;
    let signer_info = SignerInfo {
        version: CmsVersion::V1,
        sid: IssuerAndSerialNumber {
            issuer: signer_cert.tbs_certificate.issuer.clone(),
            serial_number: signer_cert.tbs_certificate.serial_number.clone(),
        },
        digest_algorithm: digest_algorithm_identifier(algorithm)?,
        signed_attrs: Some(signed_attrs),
        signature_algorithm: AlgorithmIdentifierOwned {
            oid: oid(descriptor.encryption_oid)?,
            parameters: match algorithm {
                SignAlgorithm::Rsa => Some(Any::encode_from(&der::asn1::Null)?),
                _ => None,
            },
        },
        signature: OctetString::new(signature)?,
    };

    let signed_data = SignedData {
        version: CmsVersion::V1,
        digest_algorithms: SetOfVec::try_from(vec![digest_algorithm_identifier(algorithm)?])?,
        encap_content_info: EncapsulatedContentInfo {
            econtent_type: oid(ID_DATA)?,
            econtent: None,
        },
        certificates: Some(SetOfVec::try_from(vec![signer_cert])?),
        signer_infos: SetOfVec::try_from(vec![signer_info])?,
    };

    let content_info = ContentInfo {
        content_type: oid(ID_SIGNED_DATA)?,
        content: Any::encode_from(&signed_data)?,
    };
    info!(
        %algorithm,
        thumbprint = %certificate.thumbprint(),
        "detached signature produced"
    );
    Ok(content_info.to_der()?)
}

fn structural(msg: impl Into<String>) -> Error {
    Error::VerificationFailure(msg.into())
}

fn attribute_value<'a>(attrs: &'a SetOfVec<Attribute>, type_oid: &str) -> Option<&'a Any> {
    attrs
        .iter()
        .find(|attr| attr.oid.to_string() == type_oid)
        .and_then(|attr| attr.values.iter().next())
}

/// Verify a detached CMS signature over the content. With no certificate
/// supplied, the one embedded in the SignedData is used. The digest and
/// signature checks both always run.
pub fn verify_detached(
    data: impl Read,
    signature_der: &[u8],
    certificate: Option<&Certificate>,
) -> Result<VerificationOutcome> {
    let content_info = ContentInfo::from_der(signature_der)
        .map_err(|e| structural(format!("Not a CMS structure: {e}")))?;
    if content_info.content_type.to_string() != ID_SIGNED_DATA {
        return Err(structural(format!(
            "Unexpected content type {}",
            content_info.content_type
        )));
    }
    let signed_data: SignedData = content_info
        .content
        .decode_as()
        .map_err(|e| structural(format!("Malformed SignedData: {e}")))?;
    let signer_info = signed_data
        .signer_infos
        .iter()
        .next()
        .ok_or_else(|| structural("SignedData carries no SignerInfo"))?;

    let certificate = match certificate {
        Some(cert) => cert.clone(),
        None => {
            let embedded = signed_data
                .certificates
                .as_ref()
                .and_then(|certs| certs.iter().next())
                .ok_or_else(|| structural("SignedData carries no certificate"))?;
            Certificate::from_der(embedded.to_der()?)?
        }
    };
    let algorithm = certificate.algorithm()?;
    let descriptor = algorithm.descriptor();
    debug!(%algorithm, thumbprint = %certificate.thumbprint(), "verifying detached signature");

    // Downgrade guard: declared digest algorithm must be the family's hash
    if signer_info.digest_algorithm.oid.to_string() != descriptor.hash_oid {
        warn!(
            declared = %signer_info.digest_algorithm.oid,
            "digest algorithm does not match key family"
        );
        return Ok(VerificationOutcome::AlgorithmMismatch);
    }

    let signed_attrs = signer_info
        .signed_attrs
        .as_ref()
        .ok_or_else(|| structural("SignerInfo carries no signed attributes"))?;
    let declared_digest: OctetString = attribute_value(signed_attrs, ATTR_MESSAGE_DIGEST)
        .ok_or_else(|| structural("Signed attributes carry no message digest"))?
        .decode_as()
        .map_err(|e| structural(format!("Malformed message digest attribute: {e}")))?;

    let computed = digest::digest_stream(algorithm, data)?;
    let digest_ok = declared_digest.as_bytes() == computed.as_slice();

    let public = certificate.public_key()?;
    let signature_ok = verify_bytes(
        &public,
        algorithm,
        &signed_attrs.to_der()?,
        signer_info.signature.as_bytes(),
    )?;

    let outcome = match (digest_ok, signature_ok) {
        (true, true) => VerificationOutcome::Valid,
        (false, _) => VerificationOutcome::DigestMismatch,
        (_, false) => VerificationOutcome::SignatureMismatch,
    };
    debug!(?outcome, digest_ok, signature_ok, "detached verification finished");
    Ok(outcome)
}
