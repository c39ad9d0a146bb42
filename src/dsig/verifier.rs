//! Signature verification over documents produced by either profile.
//!
//! The digest and signature checks always both run, so a caller can see
//! every failing aspect at once; structural problems surface as errors
//! instead of an outcome.

use crate::c14n;
use crate::crypto::{PublicKey, digest};
use crate::dsig::method;
use crate::dsig::skeleton;
use crate::error::{Error, Result};
use crate::pki::Certificate;
use crate::xml::{self, NsContext};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::{debug, warn};

/// Verification verdict. Anything but `Valid` names the first aspect a
/// caller should look at; both checks have still been run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Valid,
    /// DigestMethod or SignatureMethod does not belong to the key's family
    AlgorithmMismatch,
    DigestMismatch,
    SignatureMismatch,
}

impl VerificationOutcome {
    pub fn is_valid(self) -> bool {
        self == VerificationOutcome::Valid
    }
}

fn structural(msg: impl Into<String>) -> Error {
    Error::VerificationFailure(msg.into())
}

fn uri_matches(found: &str, uri: &str, urn: &str) -> bool {
    found == uri || found == urn
}

/// Find the certificate to verify against: the supplied one wins, then the
/// BinarySecurityToken, then an X509Certificate inside KeyInfo.
fn resolve_certificate(
    document: &str,
    signature_xml: &str,
    supplied: Option<&Certificate>,
) -> Result<Certificate> {
    if let Some(cert) = supplied {
        return Ok(cert.clone());
    }
    let encoded = xml::element_text(document, "BinarySecurityToken")
        .or_else(|_| xml::element_text(signature_xml, "X509Certificate"))
        .map_err(|_| structural("Document carries no certificate and none was supplied"))?;
    Certificate::from_base64(&encoded)
}

fn referenced_content(document: &str, signature_xml: &str) -> Result<(String, NsContext)> {
    // ds:Reference precedes wsse:Reference in document order, so the first
    // URI found is the SignedInfo one
    let uri = xml::element_attribute(signature_xml, "Reference", "URI")
        .map_err(|_| structural("Signature carries no Reference URI"))?;
    match uri.strip_prefix('#') {
        Some(id) => xml::extract_scoped_by_id(document, id)
            .map_err(|_| structural(format!("Referenced element '{id}' not found"))),
        None if uri.is_empty() => Ok((document.to_owned(), NsContext::default())),
        None => Err(structural(format!("Unsupported reference URI {uri:?}"))),
    }
}

fn apply_transforms(signature_xml: &str, content: String) -> Result<String> {
    let transforms = xml::attribute_values(signature_xml, "Transform", "Algorithm")
        .map_err(|_| structural("Signature carries no Transforms"))?;
    let mut content = content;
    for uri in transforms {
        match uri.as_str() {
            skeleton::ENVELOPED_SIGNATURE => {
                content = xml::remove_elements(&content, "Signature")?;
            }
            // Canonicalization happens once, after the transform chain
            skeleton::EXCLUSIVE_C14N => {}
            other => return Err(structural(format!("Unsupported transform {other:?}"))),
        }
    }
    Ok(content)
}

fn verification_spec(key: &PublicKey) -> Option<&str> {
    match key {
        PublicKey::Gost(public) => Some(public.curve().name),
        _ => None,
    }
}

/// Verify the first signature in the document against the certificate, or
/// against the certificate the document itself carries.
pub fn verify(
    document: &str,
    certificate: Option<&Certificate>,
) -> Result<VerificationOutcome> {
    let (signature_xml, signature_scope) =
        xml::extract_scoped(document, "Signature").map_err(|_| Error::SignatureNotFound)?;

    let certificate = resolve_certificate(document, &signature_xml, certificate)?;
    let algorithm = certificate.algorithm()?;
    let descriptor = algorithm.descriptor();
    debug!(%algorithm, thumbprint = %certificate.thumbprint(), "verifying signature");

    let c14n_uri = xml::element_attribute(signature_xml.as_str(), "CanonicalizationMethod", "Algorithm")
        .map_err(|_| structural("Signature carries no CanonicalizationMethod"))?;
    if c14n_uri != skeleton::EXCLUSIVE_C14N {
        return Err(structural(format!(
            "Unsupported canonicalization {c14n_uri:?}"
        )));
    }

    // Downgrade guard: both declared methods must belong to the family the
    // certificate's key belongs to
    let digest_uri = xml::element_attribute(&signature_xml, "DigestMethod", "Algorithm")
        .map_err(|_| structural("Signature carries no DigestMethod"))?;
    let sign_uri = xml::element_attribute(&signature_xml, "SignatureMethod", "Algorithm")
        .map_err(|_| structural("Signature carries no SignatureMethod"))?;
    if !uri_matches(&digest_uri, descriptor.digest_uri, descriptor.digest_urn)
        || !uri_matches(&sign_uri, descriptor.sign_uri, descriptor.sign_urn)
    {
        warn!(%algorithm, digest_uri, sign_uri, "declared methods do not match key family");
        return Ok(VerificationOutcome::AlgorithmMismatch);
    }

    // Reference digest check
    let (content, content_scope) = referenced_content(document, &signature_xml)?;
    let content = apply_transforms(&signature_xml, content)?;
    let canonical = c14n::canonicalize_within(&content, &content_scope, None)?;
    let expected_digest = xml::element_text(&signature_xml, "DigestValue")
        .map_err(|_| structural("Signature carries no DigestValue"))?;
    let digest_ok =
        digest::base64_digest(algorithm, canonical.as_bytes()) == expected_digest.trim();

    // Signature value check. SignedInfo is cut out of an already-extracted
    // fragment, so its scope is the signature's scope plus whatever the
    // fragment declares in between.
    let (signed_info, inner_scope) = xml::extract_scoped(&signature_xml, "SignedInfo")
        .map_err(|_| structural("Signature carries no SignedInfo"))?;
    let canonical_info =
        c14n::canonicalize_within(&signed_info, &signature_scope.overlay(&inner_scope), None)?;
    let encoded_value = xml::element_text(&signature_xml, "SignatureValue")
        .map_err(|_| structural("Signature carries no SignatureValue"))?;
    let compact: String = encoded_value.split_whitespace().collect();
    let signature_value = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| structural(format!("SignatureValue is not base64: {e}")))?;

    let public = certificate.public_key()?;
    let plugin = method::plugin_for(algorithm, verification_spec(&public))?;
    let signature_ok = plugin.verify(&public, canonical_info.as_bytes(), &signature_value)?;

    let outcome = match (digest_ok, signature_ok) {
        (true, true) => VerificationOutcome::Valid,
        (false, _) => VerificationOutcome::DigestMismatch,
        (_, false) => VerificationOutcome::SignatureMismatch,
    };
    debug!(?outcome, digest_ok, signature_ok, "verification finished");
    Ok(outcome)
}
