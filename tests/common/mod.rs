use gost_sign::pki::{self, Certificate};
use gost_sign::{KeyPair, SignAlgorithm, generate_key_pair};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a log subscriber once per test binary; RUST_LOG controls it.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub const ENVELOPE: &str = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Header></soapenv:Header><soapenv:Body><ns:GetResponse xmlns:ns="urn:service:v1"><ns:Payload>hello</ns:Payload></ns:GetResponse></soapenv:Body></soapenv:Envelope>"#;

/// Key pair plus matching self-signed certificate.
pub fn identity(algorithm: SignAlgorithm, spec: Option<&str>) -> (KeyPair, Certificate) {
    let key = generate_key_pair(algorithm, spec).unwrap();
    let cert = pki::self_signed(&key, "integration-test").unwrap();
    (key, cert)
}

/// Every family and parameter spec the registry knows.
pub fn all_identities() -> Vec<(KeyPair, Certificate)> {
    let mut out = Vec::new();
    for &algorithm in SignAlgorithm::all() {
        let specs = algorithm.descriptor().parameter_specs;
        if specs.is_empty() {
            out.push(identity(algorithm, None));
        } else {
            for &spec in specs {
                out.push(identity(algorithm, Some(spec)));
            }
        }
    }
    out
}
