// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use time::{Duration, OffsetDateTime, macros};
// self
use wbi_signer::{
	error::{Error, FetchError},
	http::{FetchFuture, KeyFetcher},
	keys::{KeyFragment, KeyFragments, KeyProvider, MixinKey},
};

const PAIRS: [(&str, &str); 3] = [
	("7cd084941338484aae1ad9425b84077c", "4932caff0ff746eab6f01bf08b70ac45"),
	("0123456789abcdef0123456789abcdef", "fedcba9876543210fedcba9876543210"),
	("aaaabbbbccccddddeeeeffff00001111", "22223333444455556666777788889999"),
];

fn pair(idx: usize) -> KeyFragments {
	let (image, subtitle) = PAIRS[idx % PAIRS.len()];

	KeyFragments::new(
		KeyFragment::new(image).expect("Image fragment fixture should be valid."),
		KeyFragment::new(subtitle).expect("Subtitle fragment fixture should be valid."),
	)
}

/// Hands out a new pair on every call after a short delay, optionally failing.
struct RotatingFetcher {
	calls: AtomicUsize,
	delay: StdDuration,
	fail_after: Option<usize>,
}
impl RotatingFetcher {
	fn new(delay: StdDuration) -> Self {
		Self { calls: AtomicUsize::new(0), delay, fail_after: None }
	}

	fn failing_after(delay: StdDuration, successes: usize) -> Self {
		Self { calls: AtomicUsize::new(0), delay, fail_after: Some(successes) }
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl KeyFetcher for RotatingFetcher {
	fn fetch_key_fragments(&self) -> FetchFuture<'_> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst);
		let fail = self.fail_after.is_some_and(|successes| call >= successes);

		Box::pin(async move {
			tokio::time::sleep(self.delay).await;

			if fail { Err(FetchError::Status { status: 503 }) } else { Ok(pair(call)) }
		})
	}
}

fn start() -> OffsetDateTime {
	macros::datetime!(2026-05-20 12:00 UTC)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cold_lookups_fetch_once() {
	let fetcher = Arc::new(RotatingFetcher::new(StdDuration::from_millis(50)));
	let provider =
		Arc::new(<KeyProvider<RotatingFetcher>>::new(fetcher.clone(), Duration::hours(1)));
	let tasks: Vec<_> = (0..16)
		.map(|_| {
			let provider = provider.clone();

			tokio::spawn(async move { provider.get_mixin_key_at(start()).await })
		})
		.collect();
	let mut keys = Vec::new();

	for task in tasks {
		keys.push(
			task.await
				.expect("Lookup task should not panic.")
				.expect("Lookup should succeed."),
		);
	}

	assert_eq!(fetcher.calls(), 1);
	assert!(keys.iter().all(|key| *key == MixinKey::derive(&pair(0))));
	assert_eq!(provider.metrics().fetches(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lookups_after_expiry_fetch_once() {
	let fetcher = Arc::new(RotatingFetcher::new(StdDuration::from_millis(30)));
	let provider =
		Arc::new(<KeyProvider<RotatingFetcher>>::new(fetcher.clone(), Duration::hours(1)));

	provider.get_mixin_key_at(start()).await.expect("Warm-up lookup should succeed.");

	let later = start() + Duration::hours(2);
	let tasks: Vec<_> = (0..16)
		.map(|_| {
			let provider = provider.clone();

			tokio::spawn(async move { provider.get_mixin_key_at(later).await })
		})
		.collect();

	for task in tasks {
		let key = task
			.await
			.expect("Lookup task should not panic.")
			.expect("Lookup should succeed.");

		assert_eq!(key, MixinKey::derive(&pair(1)));
	}

	assert_eq!(fetcher.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn published_contexts_are_never_torn() {
	let fetcher = Arc::new(RotatingFetcher::new(StdDuration::from_millis(5)));
	// A zero window forces a refresh decision on every lookup.
	let provider = Arc::new(<KeyProvider<RotatingFetcher>>::new(fetcher.clone(), Duration::ZERO));
	let tasks: Vec<_> = (0..32)
		.map(|i| {
			let provider = provider.clone();

			tokio::spawn(async move {
				provider.context_at(start() + Duration::seconds(i)).await
			})
		})
		.collect();

	for task in tasks {
		let context = task
			.await
			.expect("Lookup task should not panic.")
			.expect("Lookup should succeed.");

		assert_eq!(*context.mixin_key(), MixinKey::derive(context.raw().fragments()));
		assert!(
			PAIRS.iter().any(|(image, subtitle)| {
				context.raw().image_key().expose() == *image
					&& context.raw().subtitle_key().expose() == *subtitle
			}),
			"Published fragments must come from a single fetched pair."
		);
	}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lookups_share_stale_fallback() {
	let fetcher = Arc::new(RotatingFetcher::failing_after(StdDuration::from_millis(100), 1));
	let provider =
		Arc::new(<KeyProvider<RotatingFetcher>>::new(fetcher.clone(), Duration::hours(1)));
	let warm = provider.get_mixin_key_at(start()).await.expect("Warm-up lookup should succeed.");
	let later = start() + Duration::days(1);
	let tasks: Vec<_> = (0..8)
		.map(|_| {
			let provider = provider.clone();

			tokio::spawn(async move { provider.get_mixin_key_at(later).await })
		})
		.collect();

	for task in tasks {
		let key = task
			.await
			.expect("Lookup task should not panic.")
			.expect("Stale key should be served.");

		assert_eq!(key, warm);
	}

	assert_eq!(fetcher.calls(), 2);
	assert_eq!(provider.metrics().stale_fallbacks(), 1);
}

#[tokio::test]
async fn cold_failure_surfaces_upstream_unavailable() {
	let fetcher = Arc::new(RotatingFetcher::failing_after(StdDuration::ZERO, 0));
	let provider = <KeyProvider<RotatingFetcher>>::new(fetcher.clone(), Duration::hours(1));
	let err = provider
		.sign_at([("aid", 170001_u64)], start())
		.await
		.expect_err("Signing without any key material should fail.");

	assert!(matches!(err, Error::UpstreamUnavailable { .. }));
	assert_eq!(fetcher.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cold_failures_fetch_once() {
	let fetcher = Arc::new(RotatingFetcher::failing_after(StdDuration::from_millis(50), 0));
	let provider =
		Arc::new(<KeyProvider<RotatingFetcher>>::new(fetcher.clone(), Duration::hours(1)));
	let tasks: Vec<_> = (0..8)
		.map(|_| {
			let provider = provider.clone();

			tokio::spawn(async move { provider.get_mixin_key_at(start()).await })
		})
		.collect();
	let mut sources = Vec::new();

	for task in tasks {
		let err = task
			.await
			.expect("Lookup task should not panic.")
			.expect_err("Lookups without key material should fail.");

		match err {
			Error::UpstreamUnavailable { source } => sources.push(source),
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	assert_eq!(fetcher.calls(), 1);
	assert_eq!(provider.metrics().failures(), 1);
	assert!(sources.iter().all(|source| Arc::ptr_eq(source, &sources[0])));
	assert!(matches!(*sources[0], FetchError::Status { status: 503 }));
}

#[tokio::test]
async fn later_lookup_retries_after_cold_failure() {
	let fetcher = Arc::new(RotatingFetcher::failing_after(StdDuration::ZERO, 0));
	let provider = <KeyProvider<RotatingFetcher>>::new(fetcher.clone(), Duration::hours(1));

	provider.get_mixin_key_at(start()).await.expect_err("First lookup should fail.");
	provider.get_mixin_key_at(start()).await.expect_err("Second lookup should fail again.");

	assert_eq!(fetcher.calls(), 2);
}
