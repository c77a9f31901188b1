//! Storage contract for the process-wide cached credential.
//!
//! The store only holds the current value; it performs no refreshes and no locking beyond
//! what a single atomic read or write needs. Refresh mutual exclusion belongs to
//! [`CredentialLifecycleManager`](crate::flows::CredentialLifecycleManager), which is the only
//! writer in normal operation.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::Credential};

/// Holder of the current credential.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the stored credential, if one has been saved.
	fn load(&self) -> Option<Credential>;

	/// Replaces the stored credential.
	fn save(&self, credential: Credential);

	/// Drops the stored credential, returning it.
	fn clear(&self) -> Option<Credential>;
}
