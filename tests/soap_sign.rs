mod common;

use gost_sign::dsig::skeleton;
use gost_sign::{Error, SignAlgorithm, VerificationOutcome, sign_soap, verify, xml};

#[test]
fn test_signed_envelope_structure() {
    common::init_tracing();
    let (key, cert) = common::identity(SignAlgorithm::Gost2012_256, None);
    let signed = sign_soap(common::ENVELOPE, &key, &cert, None).unwrap();

    assert!(signed.contains("<wsse:Security"));
    assert!(signed.contains(r#"wsu:Id="body""#));
    assert_eq!(signed.matches("<wsse:BinarySecurityToken").count(), 1);
    assert!(signed.contains(&format!(r##"URI="#{}""##, skeleton::CERT_ID)));

    // The security header sits inside the Header, before the Body
    let security = signed.find("<wsse:Security").unwrap();
    let header_end = signed.find("</soapenv:Header>").unwrap();
    let body = signed.find("<soapenv:Body").unwrap();
    assert!(security < header_end && header_end < body);

    // The token carries the certificate itself
    let token = xml::element_text(&signed, "BinarySecurityToken").unwrap();
    assert_eq!(token, cert.base64());
}

#[test]
fn test_sign_then_verify() {
    let (key, cert) = common::identity(SignAlgorithm::Gost2012_256, None);
    let signed = sign_soap(common::ENVELOPE, &key, &cert, None).unwrap();
    assert_eq!(verify(&signed, None).unwrap(), VerificationOutcome::Valid);
    assert!(verify(&signed, None).unwrap().is_valid());
}

#[test]
fn test_verify_survives_reserialization() {
    let (key, cert) = common::identity(SignAlgorithm::Gost2012_512, None);
    let signed = sign_soap(common::ENVELOPE, &key, &cert, None).unwrap();
    let reparsed = xml::normalize(&signed).unwrap();
    assert_eq!(verify(&reparsed, None).unwrap(), VerificationOutcome::Valid);
}

#[test]
fn test_all_families_and_curves_round_trip() {
    for (key, cert) in common::all_identities() {
        let signed = sign_soap(common::ENVELOPE, &key, &cert, None).unwrap();
        assert_eq!(
            verify(&signed, None).unwrap(),
            VerificationOutcome::Valid,
            "round trip failed for {:?} / {:?}",
            cert.algorithm().unwrap(),
            key.parameter_spec()
        );
    }
}

#[test]
fn test_actor_attribute() {
    let (key, cert) = common::identity(SignAlgorithm::Gost2001, None);
    let actor = "http://smev.gosuslugi.ru/actors/smev";
    let signed = sign_soap(common::ENVELOPE, &key, &cert, Some(actor)).unwrap();
    assert!(signed.contains(&format!(r#"soapenv:actor="{actor}""#)));
    assert_eq!(verify(&signed, None).unwrap(), VerificationOutcome::Valid);
}

#[test]
fn test_extracted_body_keeps_envelope_bindings() {
    use gost_sign::c14n;

    let envelope = r#"<s:Envelope xmlns:s="urn:envelope"><s:Header></s:Header><s:Body wsu:Id="b" xmlns:wsu="urn:wsu"><op>1</op></s:Body></s:Envelope>"#;
    let (fragment, scope) = xml::extract_scoped_by_id(envelope, "b").unwrap();
    let canonical = c14n::canonicalize_within(&fragment, &scope, None).unwrap();
    // The s prefix is declared on the Envelope, outside the extracted
    // fragment, and must still render on the Body
    assert!(canonical.starts_with(r#"<s:Body xmlns:s="urn:envelope""#));
}

#[test]
fn test_payload_prefix_declared_on_envelope_round_trips() {
    let envelope = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:m="urn:market"><soapenv:Header></soapenv:Header><soapenv:Body><m:Order><m:Qty>3</m:Qty></m:Order></soapenv:Body></soapenv:Envelope>"#;
    let (key, cert) = common::identity(SignAlgorithm::Gost2012_256, None);
    let signed = sign_soap(envelope, &key, &cert, None).unwrap();
    assert_eq!(verify(&signed, None).unwrap(), VerificationOutcome::Valid);
}

#[test]
fn test_tampered_body_fails_digest() {
    let (key, cert) = common::identity(SignAlgorithm::Gost2012_256, None);
    let signed = sign_soap(common::ENVELOPE, &key, &cert, None).unwrap();
    let tampered = signed.replace("hello", "goodbye");
    assert_eq!(
        verify(&tampered, None).unwrap(),
        VerificationOutcome::DigestMismatch
    );
}

#[test]
fn test_tampered_signature_value_fails() {
    let (key, cert) = common::identity(SignAlgorithm::Gost2012_256, None);
    let signed = sign_soap(common::ENVELOPE, &key, &cert, None).unwrap();

    let value = xml::element_text(&signed, "SignatureValue").unwrap();
    let mut bytes = base64_decode(&value);
    bytes[0] ^= 0xff;
    let tampered = signed.replace(&value, &base64_encode(&bytes));

    assert_eq!(
        verify(&tampered, None).unwrap(),
        VerificationOutcome::SignatureMismatch
    );
}

#[test]
fn test_tampered_digest_value_fails() {
    let (key, cert) = common::identity(SignAlgorithm::Gost2012_256, None);
    let signed = sign_soap(common::ENVELOPE, &key, &cert, None).unwrap();

    let value = xml::element_text(&signed, "DigestValue").unwrap();
    let mut bytes = base64_decode(&value);
    bytes[0] ^= 0x01;
    let tampered = signed.replace(&value, &base64_encode(&bytes));

    // The body no longer matches DigestValue; SignedInfo changed too
    assert_ne!(
        verify(&tampered, None).unwrap(),
        VerificationOutcome::Valid
    );
}

#[test]
fn test_digest_method_downgrade_is_flagged() {
    let (key, cert) = common::identity(SignAlgorithm::Gost2012_256, None);
    let signed = sign_soap(common::ENVELOPE, &key, &cert, None).unwrap();
    let downgraded = signed.replace(
        SignAlgorithm::Gost2012_256.descriptor().digest_uri,
        SignAlgorithm::Rsa.descriptor().digest_uri,
    );
    assert_eq!(
        verify(&downgraded, None).unwrap(),
        VerificationOutcome::AlgorithmMismatch
    );
}

#[test]
fn test_verify_against_supplied_certificate() {
    let (key, cert) = common::identity(SignAlgorithm::Gost2012_256, None);
    let (_, other_cert) = common::identity(SignAlgorithm::Gost2012_256, None);
    let signed = sign_soap(common::ENVELOPE, &key, &cert, None).unwrap();

    assert_eq!(
        verify(&signed, Some(&cert)).unwrap(),
        VerificationOutcome::Valid
    );
    // A different key's certificate fails the signature check
    assert_eq!(
        verify(&signed, Some(&other_cert)).unwrap(),
        VerificationOutcome::SignatureMismatch
    );
}

#[test]
fn test_unsigned_document_reports_no_signature() {
    assert!(matches!(
        verify(common::ENVELOPE, None),
        Err(Error::SignatureNotFound)
    ));
}

#[test]
fn test_envelope_without_body_is_rejected() {
    let (key, cert) = common::identity(SignAlgorithm::Gost2012_256, None);
    let envelope = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Header></soapenv:Header></soapenv:Envelope>"#;
    assert!(matches!(
        sign_soap(envelope, &key, &cert, None),
        Err(Error::MalformedCarrier(_))
    ));
}

fn base64_decode(value: &str) -> Vec<u8> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .unwrap()
}

fn base64_encode(value: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(value)
}
