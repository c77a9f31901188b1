//! Credential models: the cached bearer token, redacted secrets, and token claim helpers.

pub mod claims;
pub mod credential;
pub mod secret;

pub use claims::*;
pub use credential::*;
pub use secret::*;
