//! Inbound webhook authentication.
//!
//! Partner deliveries carry `X-Event-Timestamp` (ISO-8601) and `X-Event-Signature` (base64
//! RSA-PSS/SHA-256 over the timestamp bytes followed by the raw body). [`SignatureVerifier`]
//! checks both before a handler is allowed to parse the body; the body must reach it exactly as
//! received.

pub mod digest;
pub mod headers;
pub mod key;
pub mod verifier;

pub use digest::*;
pub use headers::*;
pub use key::*;
pub use verifier::*;
