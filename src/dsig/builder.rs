//! Staged signature construction. Each profile builds an unsigned skeleton,
//! then the digest and signature phases fill it in; the types make skipping
//! a phase impossible.

use crate::algorithm::SignAlgorithm;
use crate::c14n;
use crate::crypto::{KeyPair, digest};
use crate::dsig::method;
use crate::dsig::skeleton::{
    self, AlgorithmAttr, BinarySecurityToken, KeyInfo, Reference, SecurityHeader,
    SecurityTokenReference, Signature, SignedInfo, TokenReference, Transforms, X509Data, ns,
};
use crate::error::{Error, Result};
use crate::pki::Certificate;
use crate::xml;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::se::to_string_with_root;
use tracing::{debug, info};

/// Skeleton in place, digest and signature still empty.
#[derive(Debug)]
pub struct SkeletonBuilt {
    document: String,
    algorithm: SignAlgorithm,
    reference_id: Option<String>,
}

/// DigestValue filled in, SignatureValue still empty.
#[derive(Debug)]
pub struct DigestComputed {
    document: String,
    algorithm: SignAlgorithm,
}

/// Finished document.
#[derive(Debug)]
pub struct Signed {
    document: String,
}

fn signed_info(algorithm: SignAlgorithm, reference: Reference) -> SignedInfo {
    SignedInfo {
        canonicalization_method: AlgorithmAttr::new(skeleton::EXCLUSIVE_C14N),
        signature_method: AlgorithmAttr::new(algorithm.descriptor().sign_uri),
        reference,
    }
}

impl SkeletonBuilt {
    /// Insert a WS-Security header into a SOAP envelope: the Signature over
    /// the Body by reference, followed by the certificate token. The
    /// envelope must already carry a Header and a Body.
    pub fn ws_security(
        envelope: &str,
        certificate: &Certificate,
        actor: Option<&str>,
    ) -> Result<Self> {
        if xml::root_local_name(envelope)? != "Envelope" {
            return Err(Error::MalformedCarrier(
                "Document root is not a SOAP Envelope".into(),
            ));
        }
        xml::extract_element(envelope, "Header")
            .map_err(|_| Error::MalformedCarrier("Envelope has no Header".into()))?;
        xml::extract_element(envelope, "Body")
            .map_err(|_| Error::MalformedCarrier("Envelope has no Body".into()))?;

        let algorithm = certificate.algorithm()?;
        let descriptor = algorithm.descriptor();

        let (document, body_id) = xml::ensure_id_attribute(
            envelope,
            "Body",
            "wsu:Id",
            Some(("xmlns:wsu", ns::WSU)),
            skeleton::DEFAULT_BODY_ID,
        )?;
        debug!(%algorithm, body_id, "building WS-Security skeleton");

        let header = SecurityHeader {
            xmlns_wsse: ns::WSSE,
            xmlns_wsu: ns::WSU,
            signature: Signature {
                xmlns_ds: ns::DS,
                signed_info: signed_info(
                    algorithm,
                    Reference {
                        uri: format!("#{body_id}"),
                        transforms: Transforms {
                            transforms: vec![AlgorithmAttr::new(skeleton::EXCLUSIVE_C14N)],
                        },
                        digest_method: AlgorithmAttr::new(descriptor.digest_uri),
                        digest_value: String::new(),
                    },
                ),
                signature_value: String::new(),
                key_info: KeyInfo {
                    security_token_reference: Some(SecurityTokenReference {
                        reference: TokenReference {
                            uri: format!("#{}", skeleton::CERT_ID),
                            value_type: skeleton::X509_V3_TYPE,
                        },
                    }),
                    x509_data: None,
                },
            },
            binary_security_token: BinarySecurityToken {
                encoding_type: skeleton::BASE64_ENCODING,
                value_type: skeleton::X509_V3_TYPE,
                id: skeleton::CERT_ID.into(),
                value: certificate.base64(),
            },
        };

        let mut fragment = to_string_with_root("wsse:Security", &header)?;
        if let Some(value) = actor {
            // The actor attribute lives in the SOAP envelope namespace, so
            // its qualified name reuses the envelope's own prefix
            fragment = match xml::root_namespace(&document)? {
                (Some(prefix), _) => {
                    xml::add_root_attributes(&fragment, &[(&format!("{prefix}:actor"), value)])?
                }
                (None, uri) => {
                    let uri = uri.unwrap_or_else(|| ns::SOAP_ENV.to_string());
                    xml::add_root_attributes(
                        &fragment,
                        &[("xmlns:soapenv", uri.as_str()), ("soapenv:actor", value)],
                    )?
                }
            };
        }
        let document = xml::insert_before_close(&document, "Header", &fragment)?;
        // Digest what a receiver will parse, not what we concatenated
        let document = xml::normalize(&document)?;

        Ok(Self {
            document,
            algorithm,
            reference_id: Some(body_id),
        })
    }

    /// Append an enveloped ds:Signature over the whole document, as the last
    /// child of the root.
    pub fn enveloped(document: &str, certificate: &Certificate) -> Result<Self> {
        let root = xml::root_local_name(document)?;
        let algorithm = certificate.algorithm()?;
        let descriptor = algorithm.descriptor();
        debug!(%algorithm, root, "building enveloped skeleton");

        let signature = Signature {
            xmlns_ds: ns::DS,
            signed_info: signed_info(
                algorithm,
                Reference {
                    uri: String::new(),
                    transforms: Transforms {
                        transforms: vec![
                            AlgorithmAttr::new(skeleton::ENVELOPED_SIGNATURE),
                            AlgorithmAttr::new(skeleton::EXCLUSIVE_C14N),
                        ],
                    },
                    digest_method: AlgorithmAttr::new(descriptor.digest_uri),
                    digest_value: String::new(),
                },
            ),
            signature_value: String::new(),
            key_info: KeyInfo {
                security_token_reference: None,
                x509_data: Some(X509Data {
                    certificate: certificate.base64(),
                }),
            },
        };

        let fragment = to_string_with_root("ds:Signature", &signature)?;
        let document = xml::insert_before_close(document, &root, &fragment)?;
        let document = xml::normalize(&document)?;

        Ok(Self {
            document,
            algorithm,
            reference_id: None,
        })
    }

    /// Canonicalize the referenced content and fill in DigestValue.
    pub fn compute_digest(self) -> Result<DigestComputed> {
        let (target, scope) = match &self.reference_id {
            Some(id) => xml::extract_scoped_by_id(&self.document, id)?,
            // Enveloped profile: the whole document minus the signature
            None => (
                xml::remove_elements(&self.document, "Signature")?,
                xml::NsContext::default(),
            ),
        };
        let canonical = c14n::canonicalize_within(&target, &scope, None)?;
        let value = digest::base64_digest(self.algorithm, canonical.as_bytes());
        debug!(digest = %value, "reference digest computed");

        let document = xml::set_element_text(&self.document, "DigestValue", &value)?;
        Ok(DigestComputed {
            document,
            algorithm: self.algorithm,
        })
    }

    pub fn document(&self) -> &str {
        &self.document
    }
}

impl DigestComputed {
    /// Canonicalize SignedInfo, sign it and fill in SignatureValue. The key
    /// must belong to the family announced by the certificate.
    pub fn compute_signature(self, key: &KeyPair) -> Result<Signed> {
        if key.algorithm() != Some(self.algorithm) {
            return Err(Error::InvalidKey(format!(
                "Key family does not match certificate family {}",
                self.algorithm
            )));
        }

        let (signed_info, scope) = xml::extract_scoped(&self.document, "SignedInfo")?;
        let canonical = c14n::canonicalize_within(&signed_info, &scope, None)?;
        let plugin = method::plugin_for(self.algorithm, key.parameter_spec())?;
        let signature = plugin.sign(key, canonical.as_bytes())?;
        debug!(len = signature.len(), "signature value computed");

        let document =
            xml::set_element_text(&self.document, "SignatureValue", &BASE64.encode(signature))?;
        Ok(Signed { document })
    }

    pub fn document(&self) -> &str {
        &self.document
    }
}

impl Signed {
    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn into_document(self) -> String {
        self.document
    }
}

/// Sign a SOAP envelope end to end with the WS-Security profile.
pub fn sign_soap(
    envelope: &str,
    key: &KeyPair,
    certificate: &Certificate,
    actor: Option<&str>,
) -> Result<String> {
    let signed = SkeletonBuilt::ws_security(envelope, certificate, actor)?
        .compute_digest()?
        .compute_signature(key)?;
    info!(
        algorithm = %certificate.algorithm()?,
        thumbprint = %certificate.thumbprint(),
        "SOAP envelope signed"
    );
    Ok(signed.into_document())
}

/// Sign an arbitrary XML document end to end with the enveloped profile.
pub fn sign_enveloped(document: &str, key: &KeyPair, certificate: &Certificate) -> Result<String> {
    let signed = SkeletonBuilt::enveloped(document, certificate)?
        .compute_digest()?
        .compute_signature(key)?;
    info!(
        algorithm = %certificate.algorithm()?,
        thumbprint = %certificate.thumbprint(),
        "document signed with enveloped profile"
    );
    Ok(signed.into_document())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_key_pair;
    use crate::pki;

    const ENVELOPE: &str = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Header></soapenv:Header><soapenv:Body><ns:op xmlns:ns="urn:test">hello</ns:op></soapenv:Body></soapenv:Envelope>"#;

    fn test_identity() -> (KeyPair, Certificate) {
        let key = generate_key_pair(SignAlgorithm::Gost2012_256, None).unwrap();
        let cert = pki::self_signed(&key, "builder-test").unwrap();
        (key, cert)
    }

    #[test]
    fn test_skeleton_has_empty_slots() {
        let (_, cert) = test_identity();
        let skeleton = SkeletonBuilt::ws_security(ENVELOPE, &cert, None).unwrap();
        let doc = skeleton.document();
        assert!(doc.contains("<ds:DigestValue></ds:DigestValue>"));
        assert!(doc.contains("<ds:SignatureValue></ds:SignatureValue>"));
        assert!(doc.contains(r#"wsu:Id="body""#));
        assert!(doc.contains("<wsse:BinarySecurityToken"));
    }

    #[test]
    fn test_existing_body_id_is_kept() {
        let envelope = ENVELOPE.replace("<soapenv:Body>", r#"<soapenv:Body wsu:Id="msg-1">"#);
        let (_, cert) = test_identity();
        let skeleton = SkeletonBuilt::ws_security(&envelope, &cert, None).unwrap();
        assert!(skeleton.document().contains(r##"URI="#msg-1""##));
    }

    #[test]
    fn test_actor_uses_envelope_prefix() {
        let envelope = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Header></s:Header><s:Body><op>x</op></s:Body></s:Envelope>"#;
        let (_, cert) = test_identity();
        let skeleton = SkeletonBuilt::ws_security(envelope, &cert, Some("urn:actor")).unwrap();
        assert!(skeleton.document().contains(r#"s:actor="urn:actor""#));
        assert!(!skeleton.document().contains("soapenv:actor"));
    }

    #[test]
    fn test_actor_on_default_namespace_envelope() {
        let envelope = r#"<Envelope xmlns="http://schemas.xmlsoap.org/soap/envelope/"><Header></Header><Body><op>x</op></Body></Envelope>"#;
        let (_, cert) = test_identity();
        let skeleton = SkeletonBuilt::ws_security(envelope, &cert, Some("urn:actor")).unwrap();
        let doc = skeleton.document();
        assert!(doc.contains(r#"soapenv:actor="urn:actor""#));
        assert!(doc.contains(r#"xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/""#));
    }

    #[test]
    fn test_digest_fills_value() {
        let (_, cert) = test_identity();
        let digested = SkeletonBuilt::ws_security(ENVELOPE, &cert, None)
            .unwrap()
            .compute_digest()
            .unwrap();
        assert!(!digested.document().contains("<ds:DigestValue></ds:DigestValue>"));
        assert!(digested.document().contains("<ds:SignatureValue></ds:SignatureValue>"));
    }

    #[test]
    fn test_rejects_non_envelope() {
        let (_, cert) = test_identity();
        let result = SkeletonBuilt::ws_security("<doc><child/></doc>", &cert, None);
        assert!(matches!(result, Err(Error::MalformedCarrier(_))));
    }

    #[test]
    fn test_rejects_missing_header() {
        let envelope = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body><op/></soapenv:Body></soapenv:Envelope>"#;
        let (_, cert) = test_identity();
        let result = SkeletonBuilt::ws_security(envelope, &cert, None);
        assert!(matches!(result, Err(Error::MalformedCarrier(_))));
    }

    #[test]
    fn test_rejects_key_family_mismatch() {
        let (_, cert) = test_identity();
        let other = generate_key_pair(SignAlgorithm::Gost2012_512, None).unwrap();
        let result = SkeletonBuilt::ws_security(ENVELOPE, &cert, None)
            .unwrap()
            .compute_digest()
            .unwrap()
            .compute_signature(&other);
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_enveloped_signature_is_last_child() {
        let (key, cert) = test_identity();
        let signed = sign_enveloped("<doc><payload>x</payload></doc>", &key, &cert).unwrap();
        let sig_end = signed.find("</ds:Signature>").unwrap();
        assert!(signed.ends_with("</doc>"));
        assert!(sig_end < signed.rfind("</doc>").unwrap());
        assert!(signed.contains("<ds:X509Data>"));
    }
}
