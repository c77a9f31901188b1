//! Client-credentials acquisition with bounded retries.

// self
use crate::{
	_prelude::*,
	auth::{ApiKey, Credential},
	clock::{Clock, SystemClock},
	error::ConfigError,
	flows::RetryPolicy,
	http::TokenHttpClient,
	oauth::{self, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	partner::PartnerDescriptor,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Boxed future returned by [`CredentialSource::acquire`].
pub type AcquireFuture<'a> = Pin<Box<dyn Future<Output = Result<Credential>> + 'a + Send>>;

/// Anything able to mint a fresh credential; the lifecycle manager only talks to this seam.
pub trait CredentialSource
where
	Self: Send + Sync,
{
	/// Obtains a brand-new credential, retrying internally as configured.
	fn acquire(&self) -> AcquireFuture<'_>;
}

#[cfg(feature = "reqwest")]
/// Acquirer specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenAcquirer = TokenAcquirer<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Performs the client-credentials exchange against one partner token endpoint.
pub struct TokenAcquirer<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every exchange.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before classification.
	pub transport_mapper: Arc<M>,
	/// Endpoint and form parameters.
	pub descriptor: PartnerDescriptor,
	retry: RetryPolicy,
	api_key: ApiKey,
	clock: Arc<dyn Clock>,
}
impl<C, M> TokenAcquirer<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an acquirer that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		descriptor: PartnerDescriptor,
		api_key: ApiKey,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		if api_key.is_empty() {
			return Err(ConfigError::InvalidApiKey.into());
		}

		Ok(Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor,
			retry: RetryPolicy::default(),
			api_key,
			clock: Arc::new(SystemClock),
		})
	}

	/// Replaces the retry policy.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Replaces the clock used for acquisition timestamps and backoff waits.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Retry policy in effect.
	pub fn retry_policy(&self) -> &RetryPolicy {
		&self.retry
	}

	/// Performs the exchange, retrying transient failures with bounded backoff.
	///
	/// Permanent failures (rejections and unusable 2xx bodies) return immediately. The last
	/// transient error is returned once the retry budget is exhausted.
	pub async fn acquire(&self) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::TokenAcquisition;

		let span = FlowSpan::new(KIND, "acquire");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.acquire_with_retries()).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn acquire_with_retries(&self) -> Result<Credential> {
		let mut retry = 0;

		loop {
			let request = oauth::token_request(&self.descriptor, &self.api_key)?;
			let err = match oauth::exchange(
				self.http_client.as_ref(),
				self.transport_mapper.as_ref(),
				request,
				|| self.clock.now(),
			)
			.await
			{
				Ok(credential) => {
					obs::token_acquired(credential.expires_at, retry + 1);

					return Ok(credential);
				},
				Err(err) => err,
			};

			if !err.is_transient() || retry >= self.retry.max_retries {
				return Err(err);
			}

			let hint = match &err {
				Error::Acquisition(inner) => inner.retry_after(),
				_ => None,
			};
			let delay = self.retry.delay_for(retry, hint);

			obs::acquisition_retry(retry + 1, delay, &err);
			self.clock.sleep(delay).await;

			retry += 1;
		}
	}
}
#[cfg(feature = "reqwest")]
impl TokenAcquirer<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates an acquirer with its own reqwest transport bounded by
	/// [`ReqwestHttpClient::DEFAULT_TIMEOUT`].
	pub fn new(descriptor: PartnerDescriptor, api_key: ApiKey) -> Result<Self> {
		Self::with_http_client(
			descriptor,
			api_key,
			ReqwestHttpClient::with_timeout(ReqwestHttpClient::DEFAULT_TIMEOUT)?,
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> CredentialSource for TokenAcquirer<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn acquire(&self) -> AcquireFuture<'_> {
		Box::pin(TokenAcquirer::acquire(self))
	}
}
impl<C, M> Debug for TokenAcquirer<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenAcquirer")
			.field("descriptor", &self.descriptor)
			.field("retry", &self.retry)
			.field("api_key", &self.api_key)
			.finish()
	}
}
