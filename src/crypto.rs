pub mod curves;
pub mod digest;
mod errors;
pub mod gost;
pub mod keys;
pub mod mac;
pub mod rsa;

pub use errors::Error;
pub use keys::{KeyPair, MacKey, PublicKey, SecureBytes, generate_key_pair};
