//! Transport primitives for key fetching and signed upstream calls.
//!
//! The module exposes [`KeyFetcher`], the only seam between the key provider and the network.
//! [`ReqwestKeyFetcher`] implements it against the navigation endpoint; tests and alternative
//! transports implement it directly with fixed fragments or simulated failures.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::{REFERER, USER_AGENT};
// self
use crate::{
	_prelude::*,
	error::FetchError,
	keys::{KeyFragment, KeyFragments},
};
#[cfg(feature = "reqwest")]
use crate::{
	config::SignerConfig,
	error::{ConfigError, TransportError},
};

/// Boxed future returned by [`KeyFetcher::fetch_key_fragments`].
pub type FetchFuture<'a> =
	Pin<Box<dyn Future<Output = Result<KeyFragments, FetchError>> + 'a + Send>>;

/// Source of raw key fragments.
///
/// Implementations perform exactly one upstream attempt per call; retries are left to the
/// transport's own policy. The returned future must be `Send` so key providers can be shared
/// across executors.
pub trait KeyFetcher
where
	Self: Send + Sync,
{
	/// Fetches the current image and subtitle fragments.
	fn fetch_key_fragments(&self) -> FetchFuture<'_>;
}

#[derive(Deserialize)]
struct NavEnvelope {
	#[serde(default)]
	data: Option<NavData>,
}
#[derive(Deserialize)]
struct NavData {
	#[serde(default)]
	wbi_img: Option<WbiImg>,
}
#[derive(Deserialize)]
struct WbiImg {
	#[serde(default)]
	img_url: Option<String>,
	#[serde(default)]
	sub_url: Option<String>,
}

/// Extracts both fragments from a navigation response body.
///
/// The envelope `code` is ignored: anonymous callers receive a "not logged in" code while the key
/// URLs are still present.
pub fn parse_nav_body(body: &[u8]) -> Result<KeyFragments, FetchError> {
	const IMG_URL: &str = "data.wbi_img.img_url";
	const SUB_URL: &str = "data.wbi_img.sub_url";

	let mut de = serde_json::Deserializer::from_slice(body);
	let envelope: NavEnvelope = serde_path_to_error::deserialize(&mut de)
		.map_err(|source| FetchError::Decode { source })?;
	let wbi_img = envelope
		.data
		.and_then(|data| data.wbi_img)
		.ok_or(FetchError::MissingField { field: "data.wbi_img" })?;
	let image_key = fragment_from(IMG_URL, wbi_img.img_url)?;
	let subtitle_key = fragment_from(SUB_URL, wbi_img.sub_url)?;

	Ok(KeyFragments::new(image_key, subtitle_key))
}

fn fragment_from(field: &'static str, url: Option<String>) -> Result<KeyFragment, FetchError> {
	let url = url.filter(|u| !u.is_empty()).ok_or(FetchError::MissingField { field })?;

	KeyFragment::from_url(&url).map_err(|source| FetchError::MalformedFragment { field, source })
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a dedicated client that identifies itself with the configured user agent.
	pub fn from_config(config: &SignerConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().user_agent(config.user_agent.as_str()).build()?;

		Ok(Self(client))
	}

	/// Issues a GET with the configured browser-identification headers and returns the status
	/// and body.
	pub(crate) async fn get_with_headers(
		&self,
		url: Url,
		config: &SignerConfig,
	) -> Result<(u16, Vec<u8>), TransportError> {
		let response = self
			.0
			.get(url)
			.header(USER_AGENT, config.user_agent.as_str())
			.header(REFERER, config.referer.as_str())
			.send()
			.await?;
		let status = response.status().as_u16();
		let body = response.bytes().await?.to_vec();

		Ok((status, body))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// [`KeyFetcher`] that reads fragments from the navigation endpoint over reqwest.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestKeyFetcher {
	http_client: ReqwestHttpClient,
	config: Arc<SignerConfig>,
}
#[cfg(feature = "reqwest")]
impl ReqwestKeyFetcher {
	/// Creates a fetcher that shares `config` with the rest of the client.
	pub fn new(http_client: ReqwestHttpClient, config: impl Into<Arc<SignerConfig>>) -> Self {
		Self { http_client, config: config.into() }
	}

	async fn fetch(&self) -> Result<KeyFragments, FetchError> {
		let (status, body) = self
			.http_client
			.get_with_headers(self.config.nav_endpoint.clone(), &self.config)
			.await?;

		if !(200..300).contains(&status) {
			return Err(FetchError::Status { status });
		}

		parse_nav_body(&body)
	}
}
#[cfg(feature = "reqwest")]
impl KeyFetcher for ReqwestKeyFetcher {
	fn fetch_key_fragments(&self) -> FetchFuture<'_> {
		Box::pin(self.fetch())
	}
}
