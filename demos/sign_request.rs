//! Demonstrates signing a parameter set with keys fetched from a mocked navigation endpoint and
//! reusing the cached mixin key for a second request.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::macros::datetime;
// self
use wbi_signer::{
	config::SignerConfig,
	http::{ReqwestHttpClient, ReqwestKeyFetcher},
	keys::KeyProvider,
	reqwest::Client,
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let nav_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/nav");
			then.status(200).header("content-type", "application/json").body(
				"{\"code\":-101,\"data\":{\"wbi_img\":{\
				\"img_url\":\"https://i0.hdslb.com/bfs/wbi/7cd084941338484aae1ad9425b84077c.png\",\
				\"sub_url\":\"https://i0.hdslb.com/bfs/wbi/4932caff0ff746eab6f01bf08b70ac45.png\"}}}",
			);
		})
		.await;
	let config =
		SignerConfig::builder().nav_endpoint(Url::parse(&server.url("/nav"))?).build()?;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let fetcher = ReqwestKeyFetcher::new(http_client, config.clone());
	let keys = <Arc<KeyProvider<ReqwestKeyFetcher>>>::new(KeyProvider::from_config(
		fetcher, &config,
	));
	let now = datetime!(2023-12-10 10:29:29 UTC);
	let signed = keys.sign_at([("foo", "114"), ("bar", "514"), ("zab", "1919810")], now).await?;

	println!("Canonical query: {}.", signed.canonical_query());
	println!("Signed query: {}.", signed.to_query_string());

	let mut url = Url::parse("https://api.bilibili.com/x/web-interface/wbi/view/detail")?;
	let signed = keys.sign_at([("bvid", "BV17x411w7KC")], now).await?;

	signed.apply_to_url(&mut url);

	println!("Signed URL: {url}.");

	nav_mock.assert_calls_async(1).await;

	Ok(())
}
