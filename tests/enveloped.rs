mod common;

use gost_sign::dsig::skeleton;
use gost_sign::{SignAlgorithm, VerificationOutcome, sign_enveloped, verify, xml};

const DOCUMENT: &str =
    r#"<request xmlns="urn:registry:v2"><id>42</id><payload>content</payload></request>"#;

#[test]
fn test_signature_appended_to_root() {
    common::init_tracing();
    let (key, cert) = common::identity(SignAlgorithm::Gost2012_256, None);
    let signed = sign_enveloped(DOCUMENT, &key, &cert).unwrap();

    assert!(signed.ends_with("</request>"));
    assert!(signed.contains(r#"URI="""#));
    assert!(signed.contains(skeleton::ENVELOPED_SIGNATURE));
    // The certificate travels in KeyInfo, not in a security token
    assert!(signed.contains("<ds:X509Certificate>"));
    assert!(!signed.contains("BinarySecurityToken"));
    assert_eq!(
        xml::element_text(&signed, "X509Certificate").unwrap(),
        cert.base64()
    );
}

#[test]
fn test_sign_then_verify() {
    for algorithm in [
        SignAlgorithm::Gost2001,
        SignAlgorithm::Gost2012_256,
        SignAlgorithm::Gost2012_512,
        SignAlgorithm::Rsa,
    ] {
        let (key, cert) = common::identity(algorithm, None);
        let signed = sign_enveloped(DOCUMENT, &key, &cert).unwrap();
        assert_eq!(
            verify(&signed, None).unwrap(),
            VerificationOutcome::Valid,
            "enveloped round trip failed for {algorithm:?}"
        );
    }
}

#[test]
fn test_verify_survives_reserialization() {
    let (key, cert) = common::identity(SignAlgorithm::Gost2012_256, None);
    let signed = sign_enveloped(DOCUMENT, &key, &cert).unwrap();
    let reparsed = xml::normalize(&signed).unwrap();
    assert_eq!(verify(&reparsed, None).unwrap(), VerificationOutcome::Valid);
}

#[test]
fn test_tampered_content_fails_digest() {
    let (key, cert) = common::identity(SignAlgorithm::Gost2012_256, None);
    let signed = sign_enveloped(DOCUMENT, &key, &cert).unwrap();
    let tampered = signed.replace("<id>42</id>", "<id>43</id>");
    assert_eq!(
        verify(&tampered, None).unwrap(),
        VerificationOutcome::DigestMismatch
    );
}

#[test]
fn test_nested_content_is_covered() {
    // Whitespace and nesting inside the document feed into the digest
    let (key, cert) = common::identity(SignAlgorithm::Gost2012_512, None);
    let document = "<doc><a><b>x</b></a> <a><b>y</b></a></doc>";
    let signed = sign_enveloped(document, &key, &cert).unwrap();
    assert_eq!(verify(&signed, None).unwrap(), VerificationOutcome::Valid);

    let tampered = signed.replace("<b>y</b>", "<b>z</b>");
    assert_eq!(
        verify(&tampered, None).unwrap(),
        VerificationOutcome::DigestMismatch
    );
}
