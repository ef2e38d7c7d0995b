//! Request signing for the web-interface API—rotating key fragments, singleflight key caching,
//! and byte-exact canonical signatures in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod keys;
pub mod obs;
pub mod sign;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{client::WbiClient, config::SignerConfig, http::ReqwestHttpClient};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a [`SignerConfig`] whose endpoints point at `nav` and `video_detail`.
	pub fn test_signer_config(nav: &str, video_detail: &str) -> SignerConfig {
		SignerConfig::builder()
			.nav_endpoint(Url::parse(nav).expect("Mock navigation endpoint should parse."))
			.video_detail_endpoint(
				Url::parse(video_detail).expect("Mock video-detail endpoint should parse."),
			)
			.build()
			.expect("Mock signer configuration should build.")
	}

	/// Constructs a [`WbiClient`] backed by the reqwest transport used across integration tests.
	pub fn build_reqwest_test_client(config: SignerConfig) -> WbiClient {
		WbiClient::with_http_client(test_reqwest_http_client(), config)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
