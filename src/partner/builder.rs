// std
use std::collections::BTreeMap;
// self
use crate::{_prelude::*, partner::PartnerDescriptor};

/// Errors raised while constructing or validating descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PartnerDescriptorError {
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Scope must be a single non-empty printable token.
	#[error("Scope `{scope}` must be non-empty and free of whitespace or control characters.")]
	InvalidScope {
		/// Scope value that failed validation.
		scope: String,
	},
}

/// Builder for [`PartnerDescriptor`] values; also the serde shape of a descriptor.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PartnerDescriptorBuilder {
	/// Token endpoint receiving the client-credentials exchange.
	pub token_endpoint: Option<Url>,
	/// Requested scope; defaults to [`PartnerDescriptor::DEFAULT_SCOPE`].
	pub scope: Option<String>,
	/// Additional form parameters.
	pub extra_params: BTreeMap<String, String>,
}
impl PartnerDescriptorBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the requested scope.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Adds a form parameter sent with every exchange. `grant_type` and `scope` are reserved
	/// and ignored here.
	pub fn extra_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.extra_params.insert(key.into(), value.into());

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<PartnerDescriptor, PartnerDescriptorError> {
		let token_endpoint =
			self.token_endpoint.ok_or(PartnerDescriptorError::MissingTokenEndpoint)?;
		let scope = self.scope.unwrap_or_else(|| PartnerDescriptor::DEFAULT_SCOPE.into());
		let descriptor =
			PartnerDescriptor { token_endpoint, scope, extra_params: self.extra_params };

		descriptor.validate()?;

		Ok(descriptor)
	}
}
impl TryFrom<PartnerDescriptorBuilder> for PartnerDescriptor {
	type Error = PartnerDescriptorError;

	fn try_from(builder: PartnerDescriptorBuilder) -> Result<Self, Self::Error> {
		builder.build()
	}
}

impl PartnerDescriptor {
	fn validate(&self) -> Result<(), PartnerDescriptorError> {
		validate_endpoint("token", &self.token_endpoint)?;

		if self.scope.is_empty()
			|| self.scope.chars().any(|c| c.is_whitespace() || c.is_control())
		{
			return Err(PartnerDescriptorError::InvalidScope { scope: self.scope.clone() });
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), PartnerDescriptorError> {
	if url.scheme() != "https" {
		Err(PartnerDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}
