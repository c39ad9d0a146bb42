//! Keyed MAC over Streebog-256, used by the reserved MAC signature method.

use crate::crypto::errors::{CryptoResult, Error};
use crate::crypto::keys::MacKey;
use hmac::{Hmac, Mac};
use streebog::Streebog256;

type HmacStreebog256 = Hmac<Streebog256>;

fn mac_for(key: &MacKey) -> CryptoResult<HmacStreebog256> {
    HmacStreebog256::new_from_slice(key.expose_secret())
        .map_err(|_| Error::Invalid("Unusable MAC key length".into()))
}

/// Compute the 32-byte tag over the data.
pub fn sign(key: &MacKey, data: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut mac = mac_for(key)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Constant-time tag comparison.
pub fn verify(key: &MacKey, data: &[u8], tag: &[u8]) -> CryptoResult<bool> {
    let mut mac = mac_for(key)?;
    mac.update(data);
    Ok(mac.verify_slice(tag).is_ok())
}
