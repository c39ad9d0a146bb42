pub mod builder;
pub mod method;
pub mod skeleton;
pub mod verifier;

pub use builder::{DigestComputed, Signed, SkeletonBuilt, sign_enveloped, sign_soap};
pub use method::{SignatureMethodPlugin, plugin_for};
pub use verifier::{VerificationOutcome, verify};
