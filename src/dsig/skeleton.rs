//! Serde shapes and wire constants for the signature skeleton.
//!
//! Serialize-side renames carry the `ds:`/`wsse:` prefixes; the verifier
//! never deserializes these structs, it reads the document through the
//! event-based helpers instead.

use serde::Serialize;

pub mod ns {
    pub const WSSE: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
    pub const WSU: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
    pub const DS: &str = "http://www.w3.org/2000/09/xmldsig#";
    pub const SOAP_ENV: &str = "http://schemas.xmlsoap.org/soap/envelope/";
}

pub const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
pub const BASE64_ENCODING: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";
pub const X509_V3_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-x509-token-profile-1.0#X509v3";

/// wsu:Id given to the BinarySecurityToken
pub const CERT_ID: &str = "CertId";
/// wsu:Id given to the Body when it has none
pub const DEFAULT_BODY_ID: &str = "body";

// The SOAP actor attribute is not part of this shape: its qualified name
// depends on the envelope's own prefix, so the builder injects it after
// serialization.
#[derive(Debug, Serialize)]
pub struct SecurityHeader {
    #[serde(rename = "@xmlns:wsse")]
    pub xmlns_wsse: &'static str,
    #[serde(rename = "@xmlns:wsu")]
    pub xmlns_wsu: &'static str,
    #[serde(rename = "ds:Signature")]
    pub signature: Signature,
    #[serde(rename = "wsse:BinarySecurityToken")]
    pub binary_security_token: BinarySecurityToken,
}

#[derive(Debug, Serialize)]
pub struct Signature {
    #[serde(rename = "@xmlns:ds")]
    pub xmlns_ds: &'static str,
    #[serde(rename = "ds:SignedInfo")]
    pub signed_info: SignedInfo,
    #[serde(rename = "ds:SignatureValue")]
    pub signature_value: String,
    #[serde(rename = "ds:KeyInfo")]
    pub key_info: KeyInfo,
}

#[derive(Debug, Serialize)]
pub struct SignedInfo {
    #[serde(rename = "ds:CanonicalizationMethod")]
    pub canonicalization_method: AlgorithmAttr,
    #[serde(rename = "ds:SignatureMethod")]
    pub signature_method: AlgorithmAttr,
    #[serde(rename = "ds:Reference")]
    pub reference: Reference,
}

#[derive(Debug, Serialize)]
pub struct AlgorithmAttr {
    #[serde(rename = "@Algorithm")]
    pub algorithm: String,
}

impl AlgorithmAttr {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Reference {
    #[serde(rename = "@URI")]
    pub uri: String,
    #[serde(rename = "ds:Transforms")]
    pub transforms: Transforms,
    #[serde(rename = "ds:DigestMethod")]
    pub digest_method: AlgorithmAttr,
    #[serde(rename = "ds:DigestValue")]
    pub digest_value: String,
}

#[derive(Debug, Serialize)]
pub struct Transforms {
    #[serde(rename = "ds:Transform")]
    pub transforms: Vec<AlgorithmAttr>,
}

#[derive(Debug, Serialize)]
pub struct KeyInfo {
    #[serde(
        rename = "wsse:SecurityTokenReference",
        skip_serializing_if = "Option::is_none"
    )]
    pub security_token_reference: Option<SecurityTokenReference>,
    #[serde(rename = "ds:X509Data", skip_serializing_if = "Option::is_none")]
    pub x509_data: Option<X509Data>,
}

#[derive(Debug, Serialize)]
pub struct SecurityTokenReference {
    #[serde(rename = "wsse:Reference")]
    pub reference: TokenReference,
}

#[derive(Debug, Serialize)]
pub struct TokenReference {
    #[serde(rename = "@URI")]
    pub uri: String,
    #[serde(rename = "@ValueType")]
    pub value_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct X509Data {
    #[serde(rename = "ds:X509Certificate")]
    pub certificate: String,
}

#[derive(Debug, Serialize)]
pub struct BinarySecurityToken {
    #[serde(rename = "@EncodingType")]
    pub encoding_type: &'static str,
    #[serde(rename = "@ValueType")]
    pub value_type: &'static str,
    #[serde(rename = "@wsu:Id")]
    pub id: String,
    #[serde(rename = "$text")]
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::se::to_string_with_root;

    #[test]
    fn test_signature_serialization_shape() {
        let signature = Signature {
            xmlns_ds: ns::DS,
            signed_info: SignedInfo {
                canonicalization_method: AlgorithmAttr::new(EXCLUSIVE_C14N),
                signature_method: AlgorithmAttr::new("urn:sig"),
                reference: Reference {
                    uri: "#body".into(),
                    transforms: Transforms {
                        transforms: vec![AlgorithmAttr::new(EXCLUSIVE_C14N)],
                    },
                    digest_method: AlgorithmAttr::new("urn:digest"),
                    digest_value: String::new(),
                },
            },
            signature_value: String::new(),
            key_info: KeyInfo {
                security_token_reference: Some(SecurityTokenReference {
                    reference: TokenReference {
                        uri: format!("#{CERT_ID}"),
                        value_type: X509_V3_TYPE,
                    },
                }),
                x509_data: None,
            },
        };

        let xml = to_string_with_root("ds:Signature", &signature).unwrap();
        assert!(xml.starts_with(r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">"#));
        // Fixed child order
        let si = xml.find("<ds:SignedInfo>").unwrap();
        let c14n = xml.find("ds:CanonicalizationMethod").unwrap();
        let sm = xml.find("ds:SignatureMethod").unwrap();
        let r = xml.find("<ds:Reference").unwrap();
        let sv = xml.find("<ds:SignatureValue").unwrap();
        let ki = xml.find("<ds:KeyInfo>").unwrap();
        assert!(si < c14n && c14n < sm && sm < r && r < sv && sv < ki);
        assert!(!xml.contains("X509Data"));
    }

    #[test]
    fn test_security_header_token_is_last() {
        let header = SecurityHeader {
            xmlns_wsse: ns::WSSE,
            xmlns_wsu: ns::WSU,
            signature: Signature {
                xmlns_ds: ns::DS,
                signed_info: SignedInfo {
                    canonicalization_method: AlgorithmAttr::new(EXCLUSIVE_C14N),
                    signature_method: AlgorithmAttr::new("urn:sig"),
                    reference: Reference {
                        uri: "#body".into(),
                        transforms: Transforms {
                            transforms: vec![AlgorithmAttr::new(EXCLUSIVE_C14N)],
                        },
                        digest_method: AlgorithmAttr::new("urn:digest"),
                        digest_value: String::new(),
                    },
                },
                signature_value: String::new(),
                key_info: KeyInfo {
                    security_token_reference: None,
                    x509_data: None,
                },
            },
            binary_security_token: BinarySecurityToken {
                encoding_type: BASE64_ENCODING,
                value_type: X509_V3_TYPE,
                id: CERT_ID.into(),
                value: "AAAA".into(),
            },
        };

        let xml = to_string_with_root("wsse:Security", &header).unwrap();
        let sig = xml.find("<ds:Signature").unwrap();
        let token = xml.find("<wsse:BinarySecurityToken").unwrap();
        assert!(sig < token);
        assert!(xml.contains(">AAAA</wsse:BinarySecurityToken>"));
    }
}
