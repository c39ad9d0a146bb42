use crate::error::{Error, Result};
use std::fmt;

/// Signature algorithm families supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignAlgorithm {
    /// RSA with SHA-1
    Rsa,
    /// GOST R 34.10-2001 with GOST R 34.11-94
    Gost2001,
    /// GOST R 34.10-2012 (256 bit) with GOST R 34.11-2012 (256 bit)
    Gost2012_256,
    /// GOST R 34.10-2012 (512 bit) with GOST R 34.11-2012 (512 bit)
    Gost2012_512,
}

/// Static wire-level identifiers for one algorithm family
#[derive(Debug)]
pub struct AlgorithmDescriptor {
    pub algorithm: SignAlgorithm,
    /// JCA-style key algorithm name
    pub key_algorithm_name: &'static str,
    /// JCA-style signature algorithm name
    pub signature_algorithm_name: &'static str,
    /// xmldsig SignatureMethod URI
    pub sign_uri: &'static str,
    /// cpxmlsec SignatureMethod URN
    pub sign_urn: &'static str,
    /// xmldsig DigestMethod URI
    pub digest_uri: &'static str,
    /// cpxmlsec DigestMethod URN
    pub digest_urn: &'static str,
    /// Digest output length in bytes
    pub digest_size: usize,
    /// Hash algorithm OID used in built artifacts
    pub hash_oid: &'static str,
    /// Public-key (encryption) algorithm OID used in built artifacts
    pub encryption_oid: &'static str,
    /// Hash-with-sign OID used as the certificate signature algorithm
    pub signature_oid: &'static str,
    /// All OIDs associated with this family, for reverse lookup
    pub known_oids: &'static [&'static str],
    /// Named parameter specs, default first
    pub parameter_specs: &'static [&'static str],
}

static RSA: AlgorithmDescriptor = AlgorithmDescriptor {
    algorithm: SignAlgorithm::Rsa,
    key_algorithm_name: "RSA",
    signature_algorithm_name: "SHA1WITHRSA",
    sign_uri: "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
    sign_urn: "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
    digest_uri: "http://www.w3.org/2000/09/xmldsig#sha1",
    digest_urn: "http://www.w3.org/2000/09/xmldsig#sha1",
    digest_size: 20,
    hash_oid: "1.3.14.3.2.26",
    encryption_oid: "1.2.840.113549.1.1.1",
    signature_oid: "1.2.840.113549.1.1.5",
    known_oids: &[],
    parameter_specs: &[],
};

static GOST2001: AlgorithmDescriptor = AlgorithmDescriptor {
    algorithm: SignAlgorithm::Gost2001,
    key_algorithm_name: "ECGOST3410",
    signature_algorithm_name: "GOST3411WITHECGOST3410",
    sign_uri: "http://www.w3.org/2001/04/xmldsig-more#gostr34102001-gostr3411",
    sign_urn: "urn:ietf:params:xml:ns:cpxmlsec:algorithms:gostr34102001-gostr3411",
    digest_uri: "http://www.w3.org/2001/04/xmldsig-more#gostr3411",
    digest_urn: "urn:ietf:params:xml:ns:cpxmlsec:algorithms:gostr3411",
    digest_size: 32,
    hash_oid: "1.2.643.2.2.9",
    encryption_oid: "1.2.643.2.2.19",
    signature_oid: "1.2.643.2.2.3",
    known_oids: &[
        "1.2.643.2.2.3",
        "1.2.643.2.2.9",
        "1.2.643.2.2.19",
        "1.2.643.2.2.98",
    ],
    parameter_specs: &[
        "GostR3410-2001-CryptoPro-A",
        "GostR3410-2001-CryptoPro-B",
        "GostR3410-2001-CryptoPro-C",
        "GostR3410-2001-CryptoPro-XchA",
        "GostR3410-2001-CryptoPro-XchB",
    ],
};

static GOST2012_256: AlgorithmDescriptor = AlgorithmDescriptor {
    algorithm: SignAlgorithm::Gost2012_256,
    key_algorithm_name: "ECGOST3410-2012",
    signature_algorithm_name: "GOST3411-2012-256WITHECGOST3410-2012-256",
    sign_uri: "http://www.w3.org/2001/04/xmldsig-more#gostr34102012-gostr34112012-256",
    sign_urn: "urn:ietf:params:xml:ns:cpxmlsec:algorithms:gostr34102012-gostr34112012-256",
    digest_uri: "http://www.w3.org/2001/04/xmldsig-more#gostr34112012-256",
    digest_urn: "urn:ietf:params:xml:ns:cpxmlsec:algorithms:gostr34112012-256",
    digest_size: 32,
    hash_oid: "1.2.643.7.1.1.2.2",
    encryption_oid: "1.2.643.7.1.1.1.1",
    signature_oid: "1.2.643.7.1.1.3.2",
    known_oids: &[
        "1.2.643.7.1.1.1.1",
        "1.2.643.7.1.1.2.2",
        "1.2.643.7.1.1.3.2",
        "1.2.643.7.1.1.6.1",
    ],
    parameter_specs: &["Tc26-Gost-3410-12-256-paramSetA"],
};

static GOST2012_512: AlgorithmDescriptor = AlgorithmDescriptor {
    algorithm: SignAlgorithm::Gost2012_512,
    key_algorithm_name: "ECGOST3410-2012",
    signature_algorithm_name: "GOST3411-2012-512WITHECGOST3410-2012-512",
    sign_uri: "http://www.w3.org/2001/04/xmldsig-more#gostr34102012-gostr34112012-512",
    sign_urn: "urn:ietf:params:xml:ns:cpxmlsec:algorithms:gostr34102012-gostr34112012-512",
    digest_uri: "http://www.w3.org/2001/04/xmldsig-more#gostr34112012-512",
    digest_urn: "urn:ietf:params:xml:ns:cpxmlsec:algorithms:gostr34112012-512",
    digest_size: 64,
    hash_oid: "1.2.643.7.1.1.2.3",
    encryption_oid: "1.2.643.7.1.1.1.2",
    signature_oid: "1.2.643.7.1.1.3.3",
    known_oids: &[
        "1.2.643.7.1.1.1.2",
        "1.2.643.7.1.1.2.3",
        "1.2.643.7.1.1.3.3",
        "1.2.643.7.1.1.6.2",
    ],
    parameter_specs: &[
        "Tc26-Gost-3410-12-512-paramSetA",
        "Tc26-Gost-3410-12-512-paramSetB",
        "Tc26-Gost-3410-12-512-paramSetC",
    ],
};

impl SignAlgorithm {
    /// All supported families, in name-lookup order
    pub fn all() -> &'static [SignAlgorithm] {
        &[
            SignAlgorithm::Rsa,
            SignAlgorithm::Gost2001,
            SignAlgorithm::Gost2012_256,
            SignAlgorithm::Gost2012_512,
        ]
    }

    /// Get the wire-level descriptor for this family
    pub fn descriptor(self) -> &'static AlgorithmDescriptor {
        match self {
            SignAlgorithm::Rsa => &RSA,
            SignAlgorithm::Gost2001 => &GOST2001,
            SignAlgorithm::Gost2012_256 => &GOST2012_256,
            SignAlgorithm::Gost2012_512 => &GOST2012_512,
        }
    }

    /// Resolve a family from any of its associated GOST OIDs.
    ///
    /// RSA OIDs are handled by the PKI layer and deliberately absent here.
    pub fn from_oid(oid: &str) -> Result<Self> {
        for &alg in Self::all() {
            if alg.descriptor().known_oids.contains(&oid) {
                return Ok(alg);
            }
        }
        Err(Error::UnsupportedAlgorithm(format!("OID {oid}")))
    }

    /// Resolve a family from a JCA-style signature algorithm name.
    ///
    /// Matching is a case-insensitive suffix check in fixed order, so
    /// provider-prefixed names resolve to the same family.
    pub fn from_signature_algorithm_name(name: &str) -> Result<Self> {
        let upper = name.to_ascii_uppercase();
        for &alg in Self::all() {
            if upper.ends_with(alg.descriptor().signature_algorithm_name) {
                return Ok(alg);
            }
        }
        Err(Error::UnsupportedAlgorithm(name.to_string()))
    }

    /// Resolve a parameter-spec name for this family.
    ///
    /// `None` selects the default (first listed) spec; an explicit name must
    /// be one of the listed specs.
    pub fn resolve_parameter_spec(self, requested: Option<&str>) -> Result<Option<&'static str>> {
        let specs = self.descriptor().parameter_specs;
        match requested {
            None => Ok(specs.first().copied()),
            Some(name) => specs
                .iter()
                .find(|&&spec| spec == name)
                .map(|&spec| Some(spec))
                .ok_or_else(|| {
                    Error::InvalidParameterSpec(format!("{name} is not valid for {self}"))
                }),
        }
    }
}

impl fmt::Display for SignAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descriptor().signature_algorithm_name)
    }
}
