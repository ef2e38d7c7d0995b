//! Crate-level error types shared across key fetching, signing, and signed upstream calls.

// self
use crate::{_prelude::*, keys::FragmentError, sign::ParamValueError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Key fragments could not be fetched and no cached keys exist.
	///
	/// Callers that waited on the same failed refresh share one `source`.
	#[error("Signing keys are unavailable and no cached keys exist.")]
	UpstreamUnavailable {
		/// Failure raised by the key fetch.
		#[source]
		source: Arc<FetchError>,
	},
	/// A caller-supplied parameter has no canonical string form.
	#[error("Parameter `{key}` cannot be signed: {reason}.")]
	InvalidParameterValue {
		/// Parameter name.
		key: String,
		/// Why the value was rejected.
		reason: ParamValueError,
	},
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Upstream answered with a non-zero envelope code.
	#[error("Upstream API rejected the request with code {code}: {message}.")]
	Api {
		/// Envelope code reported by the upstream.
		code: i64,
		/// Envelope message reported by the upstream.
		message: String,
	},
	/// Upstream answered with a non-success HTTP status.
	#[error("Upstream API returned HTTP status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
	},
	/// Upstream responded with JSON that does not match the expected shape.
	#[error("Upstream API returned malformed JSON.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Endpoint must be an HTTP(S) URL.
	#[error("The {endpoint} endpoint must use http or https: {url}.")]
	UnsupportedScheme {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Header values must not be empty.
	#[error("The {header} header must not be empty.")]
	EmptyHeader {
		/// Header name.
		header: &'static str,
	},
	/// Header values must be valid HTTP header text.
	#[error("The {header} header contains characters that are not allowed in HTTP headers.")]
	InvalidHeader {
		/// Header name.
		header: &'static str,
	},
	/// Video lookups need an `aid` or a `bvid`.
	#[error("A video reference needs either an aid or a bvid.")]
	MissingVideoId,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures raised while fetching raw key fragments from the navigation endpoint.
#[derive(Debug, ThisError)]
pub enum FetchError {
	/// Network-level failure.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Navigation endpoint answered with a non-success HTTP status.
	#[error("Navigation endpoint returned HTTP status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
	},
	/// Navigation endpoint returned malformed JSON.
	#[error("Navigation endpoint returned malformed JSON.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
	},
	/// A key URL field is absent or empty.
	#[error("Navigation response is missing `{field}`.")]
	MissingField {
		/// JSON field name.
		field: &'static str,
	},
	/// A key URL does not carry a valid fragment.
	#[error("Navigation response field `{field}` does not carry a valid key fragment.")]
	MalformedFragment {
		/// JSON field name.
		field: &'static str,
		/// Fragment validation failure.
		#[source]
		source: FragmentError,
	},
}

/// Transport-level failures.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
