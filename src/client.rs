//! Signed upstream calls built on the key provider, the signer, and the reqwest transport.
//!
//! [`WbiClient`] signs every request with the current mixin key, attaches the
//! browser-identification and referer headers the platform expects, and unwraps the
//! `{code, message, data}` envelope every web-interface endpoint returns.

pub mod video;

pub use video::*;

#[cfg(feature = "reqwest")]
use crate::{
	_prelude::*,
	config::SignerConfig,
	http::{KeyFetcher, ReqwestHttpClient, ReqwestKeyFetcher},
	keys::KeyProvider,
	obs::{self, Op, OpOutcome, OpSpan},
	sign::IntoParamValue,
};

#[cfg(feature = "reqwest")]
#[derive(Deserialize)]
struct ApiEnvelope {
	code: i64,
	#[serde(default)]
	message: String,
	#[serde(default)]
	data: serde_json::Value,
}

/// Client for signed web-interface endpoints.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct WbiClient<F = ReqwestKeyFetcher>
where
	F: ?Sized + KeyFetcher,
{
	/// HTTP client used for every signed request.
	pub http_client: ReqwestHttpClient,
	/// Shared key provider; clone the `Arc` to sign from other components.
	pub keys: Arc<KeyProvider<F>>,
	/// Endpoints and header values.
	pub config: Arc<SignerConfig>,
}
#[cfg(feature = "reqwest")]
impl WbiClient<ReqwestKeyFetcher> {
	/// Creates a client whose key provider fetches fragments over `http_client`.
	pub fn with_http_client(http_client: ReqwestHttpClient, config: SignerConfig) -> Self {
		let config = Arc::new(config);
		let fetcher = ReqwestKeyFetcher::new(http_client.clone(), config.clone());
		let keys = Arc::new(KeyProvider::from_config(fetcher, &config));

		Self { http_client, keys, config }
	}

	/// Creates a client with a default reqwest transport.
	pub fn new(config: SignerConfig) -> Self {
		Self::with_http_client(ReqwestHttpClient::default(), config)
	}

	/// Creates a client with a dedicated reqwest transport built from `config`.
	pub fn try_new(config: SignerConfig) -> Result<Self> {
		let http_client = ReqwestHttpClient::from_config(&config)?;

		Ok(Self::with_http_client(http_client, config))
	}
}
#[cfg(feature = "reqwest")]
impl<F> WbiClient<F>
where
	F: ?Sized + KeyFetcher,
{
	/// Creates a client around an existing key provider.
	pub fn with_key_provider(
		http_client: ReqwestHttpClient,
		keys: Arc<KeyProvider<F>>,
		config: impl Into<Arc<SignerConfig>>,
	) -> Self {
		Self { http_client, keys, config: config.into() }
	}

	/// Signs `params`, issues a GET to `endpoint`, and returns the envelope's `data`.
	///
	/// Any query already present on `endpoint` is replaced by the signed query.
	pub async fn signed_get<I, K, V>(&self, endpoint: &Url, params: I) -> Result<serde_json::Value>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: IntoParamValue,
	{
		const OP: Op = Op::SignedGet;

		let span = OpSpan::new(OP, "signed_get");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span.instrument(self.signed_get_inner(endpoint, params)).await;

		match &result {
			Ok(_) => obs::record_op_outcome(OP, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OP, OpOutcome::Failure),
		}

		result
	}

	/// Fetches static metadata for one video from the video-detail endpoint.
	pub async fn video_info(&self, video: &VideoRef) -> Result<VideoStatic> {
		const OP: Op = Op::VideoInfo;

		let span = OpSpan::new(OP, "video_info");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let data = self
					.signed_get_inner(&self.config.video_detail_endpoint, [video.to_param()])
					.await?;
				let detail: VideoDetail = serde_path_to_error::deserialize(data)
					.map_err(|source| Error::Decode { source })?;

				Ok(VideoStatic::from(detail))
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(OP, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OP, OpOutcome::Failure),
		}

		result
	}

	async fn signed_get_inner<I, K, V>(
		&self,
		endpoint: &Url,
		params: I,
	) -> Result<serde_json::Value>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: IntoParamValue,
	{
		let signed = self.keys.sign(params).await?;
		let mut url = endpoint.clone();

		signed.apply_to_url(&mut url);

		let (status, body) = self.http_client.get_with_headers(url, &self.config).await?;

		if !(200..300).contains(&status) {
			return Err(Error::Status { status });
		}

		let mut de = serde_json::Deserializer::from_slice(&body);
		let envelope: ApiEnvelope = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { source })?;

		if envelope.code != 0 {
			return Err(Error::Api { code: envelope.code, message: envelope.message });
		}

		Ok(envelope.data)
	}
}
#[cfg(feature = "reqwest")]
impl<F> Debug for WbiClient<F>
where
	F: ?Sized + KeyFetcher,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WbiClient")
			.field("config", &self.config)
			.field("keys", &self.keys)
			.finish()
	}
}
