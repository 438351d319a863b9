//! Webhook verification and envelope decoding.

pub mod envelope;
pub mod verifier;

pub use envelope::*;
pub use verifier::*;
