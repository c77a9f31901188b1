//! Thread-safe in-memory [`CredentialStore`].

// self
use crate::{_prelude::*, auth::Credential, store::CredentialStore};

/// In-process credential cell; one instance per process, shared through `Arc`.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<Credential>>>);
impl MemoryStore {
	/// Creates a store seeded with `credential`.
	pub fn with_credential(credential: Credential) -> Self {
		Self(Arc::new(RwLock::new(Some(credential))))
	}
}
impl CredentialStore for MemoryStore {
	fn load(&self) -> Option<Credential> {
		self.0.read().clone()
	}

	fn save(&self, credential: Credential) {
		*self.0.write() = Some(credential);
	}

	fn clear(&self) -> Option<Credential> {
		self.0.write().take()
	}
}
