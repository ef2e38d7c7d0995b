//! Endpoint and tunable configuration shared by the key fetcher, key provider, and client.

// self
use crate::{_prelude::*, error::ConfigError};

/// Navigation endpoint that publishes the key URLs.
pub const DEFAULT_NAV_ENDPOINT: &str = "https://api.bilibili.com/x/web-interface/nav";
/// Signed video-detail endpoint.
pub const DEFAULT_VIDEO_DETAIL_ENDPOINT: &str =
	"https://api.bilibili.com/x/web-interface/wbi/view/detail";
/// Desktop browser identification sent with every upstream request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
/// Referer sent with every upstream request.
pub const DEFAULT_REFERER: &str = "https://www.bilibili.com/";

/// Runtime configuration for signing and signed upstream calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignerConfig {
	/// Endpoint returning the key URLs.
	pub nav_endpoint: Url,
	/// Signed video-detail endpoint.
	pub video_detail_endpoint: Url,
	/// How long fetched key fragments are reused before a refresh.
	pub freshness_window: Duration,
	/// `User-Agent` header value.
	pub user_agent: String,
	/// `Referer` header value.
	pub referer: String,
}
impl SignerConfig {
	/// Default key freshness window.
	///
	/// Fragments rotate roughly daily; the exact cadence is not published.
	pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::hours(6);

	/// Returns a builder seeded with the platform defaults.
	pub fn builder() -> SignerConfigBuilder {
		SignerConfigBuilder::new()
	}

	fn validate(&self) -> Result<(), ConfigError> {
		validate_endpoint("navigation", &self.nav_endpoint)?;
		validate_endpoint("video detail", &self.video_detail_endpoint)?;
		validate_header("User-Agent", &self.user_agent)?;
		validate_header("Referer", &self.referer)?;

		Ok(())
	}
}
impl Default for SignerConfig {
	fn default() -> Self {
		SignerConfigBuilder::new().into_config()
	}
}

/// Builder for [`SignerConfig`] values.
#[derive(Debug)]
pub struct SignerConfigBuilder {
	nav_endpoint: Option<Url>,
	video_detail_endpoint: Option<Url>,
	freshness_window: Duration,
	user_agent: String,
	referer: String,
}
impl SignerConfigBuilder {
	/// Creates a builder seeded with the platform defaults.
	pub fn new() -> Self {
		Self {
			nav_endpoint: None,
			video_detail_endpoint: None,
			freshness_window: SignerConfig::DEFAULT_FRESHNESS_WINDOW,
			user_agent: DEFAULT_USER_AGENT.into(),
			referer: DEFAULT_REFERER.into(),
		}
	}

	/// Overrides the navigation endpoint.
	pub fn nav_endpoint(mut self, url: Url) -> Self {
		self.nav_endpoint = Some(url);

		self
	}

	/// Overrides the video-detail endpoint.
	pub fn video_detail_endpoint(mut self, url: Url) -> Self {
		self.video_detail_endpoint = Some(url);

		self
	}

	/// Overrides the freshness window; negative values clamp to zero.
	pub fn freshness_window(mut self, window: Duration) -> Self {
		self.freshness_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Overrides the `User-Agent` header.
	pub fn user_agent(mut self, value: impl Into<String>) -> Self {
		self.user_agent = value.into();

		self
	}

	/// Overrides the `Referer` header.
	pub fn referer(mut self, value: impl Into<String>) -> Self {
		self.referer = value.into();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<SignerConfig, ConfigError> {
		let config = self.into_config();

		config.validate()?;

		Ok(config)
	}

	fn into_config(self) -> SignerConfig {
		SignerConfig {
			nav_endpoint: self.nav_endpoint.unwrap_or_else(|| default_url(DEFAULT_NAV_ENDPOINT)),
			video_detail_endpoint: self
				.video_detail_endpoint
				.unwrap_or_else(|| default_url(DEFAULT_VIDEO_DETAIL_ENDPOINT)),
			freshness_window: self.freshness_window,
			user_agent: self.user_agent,
			referer: self.referer,
		}
	}
}
impl Default for SignerConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn default_url(raw: &'static str) -> Url {
	Url::parse(raw).expect("Built-in endpoint constants must parse.")
}

fn validate_endpoint(endpoint: &'static str, url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"http" | "https" => Ok(()),
		_ => Err(ConfigError::UnsupportedScheme { endpoint, url: url.to_string() }),
	}
}

fn validate_header(header: &'static str, value: &str) -> Result<(), ConfigError> {
	if value.trim().is_empty() {
		return Err(ConfigError::EmptyHeader { header });
	}
	if value.bytes().any(|b| b.is_ascii_control()) {
		return Err(ConfigError::InvalidHeader { header });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_point_at_platform_endpoints() {
		let config = SignerConfig::builder().build().expect("Default configuration should build.");

		assert_eq!(config.nav_endpoint.as_str(), DEFAULT_NAV_ENDPOINT);
		assert_eq!(config.video_detail_endpoint.as_str(), DEFAULT_VIDEO_DETAIL_ENDPOINT);
		assert_eq!(config.freshness_window, SignerConfig::DEFAULT_FRESHNESS_WINDOW);
		assert_eq!(config, SignerConfig::default());
	}

	#[test]
	fn negative_window_clamps_to_zero() {
		let config = SignerConfig::builder()
			.freshness_window(Duration::minutes(-5))
			.build()
			.expect("Clamped configuration should build.");

		assert_eq!(config.freshness_window, Duration::ZERO);
	}

	#[test]
	fn rejects_non_http_endpoints_and_bad_headers() {
		let err = SignerConfig::builder()
			.nav_endpoint(Url::parse("ftp://example.com/nav").expect("Fixture URL should parse."))
			.build()
			.expect_err("Non-HTTP endpoints should be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedScheme { endpoint: "navigation", .. }));

		let err = SignerConfig::builder()
			.referer("  ")
			.build()
			.expect_err("Blank headers should be rejected.");

		assert!(matches!(err, ConfigError::EmptyHeader { header: "Referer" }));

		let err = SignerConfig::builder()
			.user_agent("agent\r\nX-Injected: 1")
			.build()
			.expect_err("Control characters should be rejected.");

		assert!(matches!(err, ConfigError::InvalidHeader { header: "User-Agent" }));
	}
}
