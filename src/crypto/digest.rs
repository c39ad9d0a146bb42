//! Message digest dispatch per signature family.

use crate::algorithm::SignAlgorithm;
use crate::crypto::errors::CryptoResult;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use gost94::Gost94CryptoPro;
use sha1::{Digest, Sha1};
use std::io::Read;
use streebog::{Streebog256, Streebog512};

/// Digest a byte slice with the family's hash function.
pub fn digest(algorithm: SignAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        SignAlgorithm::Rsa => Sha1::digest(data).to_vec(),
        SignAlgorithm::Gost2001 => Gost94CryptoPro::digest(data).to_vec(),
        SignAlgorithm::Gost2012_256 => Streebog256::digest(data).to_vec(),
        SignAlgorithm::Gost2012_512 => Streebog512::digest(data).to_vec(),
    }
}

/// Digest an arbitrary stream with a fixed 1024-byte read buffer.
pub fn digest_stream<R: Read>(algorithm: SignAlgorithm, reader: R) -> CryptoResult<Vec<u8>> {
    match algorithm {
        SignAlgorithm::Rsa => hash_stream::<Sha1, R>(reader),
        SignAlgorithm::Gost2001 => hash_stream::<Gost94CryptoPro, R>(reader),
        SignAlgorithm::Gost2012_256 => hash_stream::<Streebog256, R>(reader),
        SignAlgorithm::Gost2012_512 => hash_stream::<Streebog512, R>(reader),
    }
}

fn hash_stream<D: Digest, R: Read>(mut reader: R) -> CryptoResult<Vec<u8>> {
    let mut hasher = D::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_vec())
}

/// Base64 of the digest, as written into DigestValue.
pub fn base64_digest(algorithm: SignAlgorithm, data: &[u8]) -> String {
    BASE64.encode(digest(algorithm, data))
}
