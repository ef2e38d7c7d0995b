//! Demonstrates fetching video metadata through the signing client against mocked endpoints.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use wbi_signer::{
	client::{VideoRef, WbiClient},
	config::SignerConfig,
	http::ReqwestHttpClient,
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
	let detail_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/detail")
				.query_param("bvid", "BV17x411w7KC")
				.query_param_exists("w_rid");
			then.status(200).header("content-type", "application/json").body(
				"{\"code\":0,\"data\":{\"View\":{\"aid\":170001,\"bvid\":\"BV17x411w7KC\",\
				\"pubdate\":1257951516,\"title\":\"Demo\"},\"Tags\":[{\"tag_name\":\"music\"}]}}",
			);
		})
		.await;
	let config = SignerConfig::builder()
		.nav_endpoint(Url::parse(&server.url("/nav"))?)
		.video_detail_endpoint(Url::parse(&server.url("/detail"))?)
		.build()?;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let client = WbiClient::with_http_client(http_client, config);
	let video = client.video_info(&VideoRef::from_parts(None, Some("BV17x411w7KC"))?).await?;

	println!("Fetched {} ({}): {}.", video.bvid, video.aid, video.title);

	nav_mock.assert_async().await;
	detail_mock.assert_async().await;

	Ok(())
}
