pub mod builder;
pub mod certificate;

pub use builder::self_signed;
pub use certificate::Certificate;

use crate::error::{Error, Result};
use der::asn1::ObjectIdentifier;

pub(crate) fn oid(value: &str) -> Result<ObjectIdentifier> {
    ObjectIdentifier::new(value)
        .map_err(|_| Error::Crypto(crate::crypto::Error::Invalid(format!("Bad OID: {value}"))))
}
