//! Partner token endpoint description shared by the acquisition flow.
//!
//! The descriptor is validated once at construction and read-only afterwards; the token
//! acquirer never mutates it.

/// Builder and validation for partner descriptors.
pub mod builder;

pub use builder::*;

// std
use std::collections::BTreeMap;
// self
use crate::_prelude::*;

/// Immutable description of the partner's OAuth token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PartnerDescriptorBuilder")]
pub struct PartnerDescriptor {
	/// Token endpoint receiving the client-credentials exchange.
	pub token_endpoint: Url,
	/// Fixed scope requested with every exchange.
	pub scope: String,
	/// Additional form parameters appended after `grant_type` and `scope`.
	pub extra_params: BTreeMap<String, String>,
}
impl PartnerDescriptor {
	/// Scope requested when none is configured.
	pub const DEFAULT_SCOPE: &'static str = "k1_integration_api";

	/// Creates a new builder for the provided token endpoint.
	pub fn builder(token_endpoint: Url) -> PartnerDescriptorBuilder {
		PartnerDescriptorBuilder::new().token_endpoint(token_endpoint)
	}

	/// Form fields for the client-credentials exchange, in submission order.
	pub fn token_form(&self) -> Vec<(&str, &str)> {
		let mut form = vec![("grant_type", "client_credentials"), ("scope", self.scope.as_str())];

		form.extend(
			self.extra_params
				.iter()
				.filter(|(key, _)| key.as_str() != "grant_type" && key.as_str() != "scope")
				.map(|(key, value)| (key.as_str(), value.as_str())),
		);

		form
	}
}
