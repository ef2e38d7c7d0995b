//! Mixin key caching with singleflight refreshes and atomic publication.
//!
//! [`KeyProvider`] owns the only shared mutable state in the crate: the published
//! [`SigningContext`]. Lookups read it without I/O while it is fresh. Once it is stale (or absent),
//! callers queue on a single async guard; the first one fetches new fragments and publishes a new
//! context by swapping one `Arc`, so a fragment pair and its mixin key are always observed
//! together. Callers that queued behind that attempt reuse whatever it left behind instead of
//! fetching again: the new context, the stale one it kept, or its failure when nothing was ever
//! published. When a fetch fails but an older context exists, the older mixin key keeps being
//! served and the failure is logged.

mod metrics;

pub use metrics::KeyProviderMetrics;

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	config::SignerConfig,
	error::FetchError,
	http::KeyFetcher,
	keys::{MixinKey, RawKeyPair},
	obs::{self, Op, OpOutcome, OpSpan},
	sign::{self, IntoParamValue, SignedRequest},
};

/// A fragment pair together with the mixin key derived from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningContext {
	raw: RawKeyPair,
	mixin_key: MixinKey,
}
impl SigningContext {
	/// Derives the mixin key for `raw`.
	pub fn new(raw: RawKeyPair) -> Self {
		let mixin_key = MixinKey::derive(raw.fragments());

		Self { raw, mixin_key }
	}

	/// Fragment pair this context was derived from.
	pub fn raw(&self) -> &RawKeyPair {
		&self.raw
	}

	/// Derived mixin key.
	pub fn mixin_key(&self) -> &MixinKey {
		&self.mixin_key
	}
}

/// Process-wide owner of the cached [`SigningContext`].
///
/// Share one instance (behind `Arc`) between every caller that signs requests.
pub struct KeyProvider<F>
where
	F: ?Sized + KeyFetcher,
{
	fetcher: Arc<F>,
	freshness_window: Duration,
	context: RwLock<Option<Arc<SigningContext>>>,
	refresh_guard: AsyncMutex<()>,
	completed_refreshes: AtomicU64,
	// Failure of the latest attempt when it left nothing published; written under `refresh_guard`.
	last_failure: Mutex<Option<Arc<FetchError>>>,
	metrics: Arc<KeyProviderMetrics>,
}
impl<F> KeyProvider<F>
where
	F: ?Sized + KeyFetcher,
{
	/// Creates an empty provider; the first lookup fetches fragments.
	///
	/// Negative windows clamp to zero, which makes every lookup refresh.
	pub fn new(fetcher: impl Into<Arc<F>>, freshness_window: Duration) -> Self {
		Self {
			fetcher: fetcher.into(),
			freshness_window: if freshness_window.is_negative() {
				Duration::ZERO
			} else {
				freshness_window
			},
			context: RwLock::new(None),
			refresh_guard: AsyncMutex::new(()),
			completed_refreshes: AtomicU64::new(0),
			last_failure: Mutex::new(None),
			metrics: Default::default(),
		}
	}

	/// Creates an empty provider using the freshness window from `config`.
	pub fn from_config(fetcher: impl Into<Arc<F>>, config: &SignerConfig) -> Self {
		Self::new(fetcher, config.freshness_window)
	}

	/// Window during which a published context is reused without I/O.
	pub fn freshness_window(&self) -> Duration {
		self.freshness_window
	}

	/// Counters describing cache behavior.
	pub fn metrics(&self) -> &Arc<KeyProviderMetrics> {
		&self.metrics
	}

	/// Returns the currently published context, fresh or not.
	pub fn snapshot(&self) -> Option<Arc<SigningContext>> {
		self.context.read().clone()
	}

	/// Drops the published context so the next lookup must fetch.
	pub fn invalidate(&self) {
		*self.context.write() = None;
	}

	/// Returns the current mixin key using the wall clock.
	pub async fn get_mixin_key(&self) -> Result<MixinKey> {
		self.get_mixin_key_at(OffsetDateTime::now_utc()).await
	}

	/// Returns the current mixin key as observed at `now`.
	pub async fn get_mixin_key_at(&self, now: OffsetDateTime) -> Result<MixinKey> {
		Ok(self.context_at(now).await?.mixin_key().clone())
	}

	/// Returns the context to sign with at `now`, refreshing it when stale or absent.
	///
	/// Fails with [`Error::UpstreamUnavailable`] only when the fetch fails and nothing was ever
	/// published.
	pub async fn context_at(&self, now: OffsetDateTime) -> Result<Arc<SigningContext>> {
		const OP: Op = Op::KeyRefresh;

		let span = OpSpan::new(OP, "context_at");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				if let Some(context) = self.fresh_context(now) {
					self.record_cache_hit();

					return Ok(context);
				}

				let observed = self.completed_refreshes.load(Ordering::Acquire);
				let _singleflight = self.refresh_guard.lock().await;

				if let Some(context) = self.fresh_context(now) {
					self.record_cache_hit();

					return Ok(context);
				}
				// Another caller finished an attempt while this one waited; share its outcome.
				if self.completed_refreshes.load(Ordering::Acquire) != observed {
					if let Some(context) = self.snapshot() {
						self.record_cache_hit();

						return Ok(context);
					}
					if let Some(source) = self.last_failure.lock().clone() {
						return Err(Error::UpstreamUnavailable { source });
					}
				}

				self.refresh_locked(now).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(OP, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OP, OpOutcome::Failure),
		}

		result
	}

	/// Fetches new fragments regardless of freshness.
	///
	/// Still serialized with every other refresh, and still falls back to the published context
	/// when the fetch fails.
	pub async fn refresh_at(&self, now: OffsetDateTime) -> Result<Arc<SigningContext>> {
		const OP: Op = Op::KeyRefresh;

		let span = OpSpan::new(OP, "refresh_at");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _singleflight = self.refresh_guard.lock().await;

				self.refresh_locked(now).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(OP, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OP, OpOutcome::Failure),
		}

		result
	}

	/// Signs `params` with the mixin key current at `now`.
	pub async fn sign_at<I, K, V>(&self, params: I, now: OffsetDateTime) -> Result<SignedRequest>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: IntoParamValue,
	{
		let context = self.context_at(now).await?;

		sign::sign(params, context.mixin_key(), now)
	}

	/// Signs `params` with the current mixin key using the wall clock.
	pub async fn sign<I, K, V>(&self, params: I) -> Result<SignedRequest>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: IntoParamValue,
	{
		self.sign_at(params, OffsetDateTime::now_utc()).await
	}

	fn fresh_context(&self, now: OffsetDateTime) -> Option<Arc<SigningContext>> {
		self.context
			.read()
			.as_ref()
			.filter(|context| context.raw().is_fresh_at(now, self.freshness_window))
			.cloned()
	}

	fn record_cache_hit(&self) {
		self.metrics.record_cache_hit();

		obs::record_op_outcome(Op::KeyRefresh, OpOutcome::CacheHit);
	}

	// Caller must hold `refresh_guard`.
	async fn refresh_locked(&self, now: OffsetDateTime) -> Result<Arc<SigningContext>> {
		self.metrics.record_fetch();

		let fetched = self.fetcher.fetch_key_fragments().await;
		let result = match fetched {
			Ok(fragments) => {
				let context = Arc::new(SigningContext::new(fragments.stamp(now)));

				*self.context.write() = Some(context.clone());
				*self.last_failure.lock() = None;

				obs::log_keys_published(now);

				Ok(context)
			},
			Err(err) => match self.snapshot() {
				Some(stale) => {
					*self.last_failure.lock() = None;

					self.metrics.record_stale_fallback();

					obs::log_stale_fallback(&err, stale.raw().fetched_at());
					obs::record_op_outcome(Op::KeyRefresh, OpOutcome::StaleFallback);

					Ok(stale)
				},
				None => {
					let source = Arc::new(err);

					*self.last_failure.lock() = Some(source.clone());

					self.metrics.record_failure();

					Err(Error::UpstreamUnavailable { source })
				},
			},
		};

		self.completed_refreshes.fetch_add(1, Ordering::AcqRel);

		result
	}
}
impl<F> Debug for KeyProvider<F>
where
	F: ?Sized + KeyFetcher,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("KeyProvider")
			.field("freshness_window", &self.freshness_window)
			.field("context", &self.snapshot())
			.field("metrics", &self.metrics)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{collections::VecDeque, sync::atomic::AtomicUsize};
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		http::FetchFuture,
		keys::{KeyFragment, KeyFragments},
	};

	const IMAGE_KEY: &str = "7cd084941338484aae1ad9425b84077c";
	const SUBTITLE_KEY: &str = "4932caff0ff746eab6f01bf08b70ac45";
	const ROTATED_IMAGE_KEY: &str = "0123456789abcdef0123456789abcdef";

	fn fragments(image: &str) -> KeyFragments {
		KeyFragments::new(
			KeyFragment::new(image).expect("Image fragment fixture should be valid."),
			KeyFragment::new(SUBTITLE_KEY).expect("Subtitle fragment fixture should be valid."),
		)
	}

	/// Replays scripted outcomes, repeating the last one once the script runs out.
	struct ScriptedFetcher {
		script: Mutex<VecDeque<Option<&'static str>>>,
		calls: AtomicUsize,
	}
	impl ScriptedFetcher {
		fn new(script: impl IntoIterator<Item = Option<&'static str>>) -> Self {
			Self { script: Mutex::new(script.into_iter().collect()), calls: AtomicUsize::new(0) }
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl KeyFetcher for ScriptedFetcher {
		fn fetch_key_fragments(&self) -> FetchFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let next = {
				let mut script = self.script.lock();

				if script.len() > 1 {
					script.pop_front().flatten()
				} else {
					script.front().copied().flatten()
				}
			};

			Box::pin(async move {
				match next {
					Some(image) => Ok(fragments(image)),
					None => Err(FetchError::Status { status: 503 }),
				}
			})
		}
	}

	fn start() -> OffsetDateTime {
		macros::datetime!(2026-03-01 08:00 UTC)
	}

	#[tokio::test]
	async fn fresh_cache_skips_fetch() {
		let fetcher = Arc::new(ScriptedFetcher::new([Some(IMAGE_KEY)]));
		let provider = <KeyProvider<ScriptedFetcher>>::new(fetcher.clone(), Duration::hours(1));
		let first = provider
			.get_mixin_key_at(start())
			.await
			.expect("First lookup should fetch fragments.");
		let second = provider
			.get_mixin_key_at(start() + Duration::minutes(30))
			.await
			.expect("Second lookup should hit the cache.");

		assert_eq!(first.expose(), "ea1db124af3c7062474693fa704f4ff8");
		assert_eq!(first, second);
		assert_eq!(fetcher.calls(), 1);
		assert_eq!(provider.metrics().fetches(), 1);
		assert_eq!(provider.metrics().cache_hits(), 1);
	}

	#[tokio::test]
	async fn expired_cache_fetches_exactly_once() {
		let fetcher = Arc::new(ScriptedFetcher::new([Some(IMAGE_KEY), Some(ROTATED_IMAGE_KEY)]));
		let provider = <KeyProvider<ScriptedFetcher>>::new(fetcher.clone(), Duration::hours(1));
		let first =
			provider.get_mixin_key_at(start()).await.expect("First lookup should succeed.");
		let later = start() + Duration::hours(1);
		let rotated = provider.get_mixin_key_at(later).await.expect("Refresh should succeed.");
		let again = provider.get_mixin_key_at(later).await.expect("Cache should be fresh again.");

		assert_ne!(first, rotated);
		assert_eq!(rotated, again);
		assert_eq!(fetcher.calls(), 2);
		assert_eq!(
			provider.snapshot().map(|context| context.raw().fetched_at()),
			Some(later),
		);
	}

	#[tokio::test]
	async fn failed_fetch_without_cache_is_fatal() {
		let fetcher = Arc::new(ScriptedFetcher::new([None]));
		let provider = <KeyProvider<ScriptedFetcher>>::new(fetcher.clone(), Duration::hours(1));
		let err = provider
			.get_mixin_key_at(start())
			.await
			.expect_err("A failed first fetch should surface.");

		match err {
			Error::UpstreamUnavailable { source } => {
				assert!(matches!(*source, FetchError::Status { status: 503 }));
			},
			other => panic!("Unexpected error: {other:?}"),
		}
		assert!(provider.snapshot().is_none());
		assert_eq!(provider.metrics().failures(), 1);
	}

	#[tokio::test]
	async fn failed_refresh_falls_back_to_stale_key() {
		let fetcher = Arc::new(ScriptedFetcher::new([Some(IMAGE_KEY), None]));
		let provider = <KeyProvider<ScriptedFetcher>>::new(fetcher.clone(), Duration::hours(1));
		let first =
			provider.get_mixin_key_at(start()).await.expect("First lookup should succeed.");
		let stale = provider
			.get_mixin_key_at(start() + Duration::hours(2))
			.await
			.expect("Stale key should be served after a failed refresh.");

		assert_eq!(first, stale);
		assert_eq!(fetcher.calls(), 2);
		assert_eq!(provider.metrics().stale_fallbacks(), 1);
		assert_eq!(
			provider.snapshot().map(|context| context.raw().fetched_at()),
			Some(start()),
		);
	}

	#[tokio::test]
	async fn invalidate_and_forced_refresh_fetch_again() {
		let fetcher = Arc::new(ScriptedFetcher::new([Some(IMAGE_KEY), Some(ROTATED_IMAGE_KEY)]));
		let provider = <KeyProvider<ScriptedFetcher>>::new(fetcher.clone(), Duration::hours(1));

		provider.get_mixin_key_at(start()).await.expect("First lookup should succeed.");
		provider.invalidate();

		assert!(provider.snapshot().is_none());

		provider.get_mixin_key_at(start()).await.expect("Lookup after invalidate should fetch.");

		let forced = provider.refresh_at(start()).await.expect("Forced refresh should succeed.");

		assert_eq!(forced.raw().image_key().expose(), ROTATED_IMAGE_KEY);
		assert_eq!(fetcher.calls(), 3);
	}

	#[tokio::test]
	async fn sign_at_uses_published_key() {
		let fetcher = Arc::new(ScriptedFetcher::new([Some(IMAGE_KEY)]));
		let provider = <KeyProvider<ScriptedFetcher>>::new(fetcher, Duration::hours(1));
		let now = OffsetDateTime::from_unix_timestamp(1_702_204_169)
			.expect("Timestamp fixture should be in range.");
		let signed = provider
			.sign_at([("aid", 170001_u64)], now)
			.await
			.expect("Signing through the provider should succeed.");

		assert_eq!(signed.canonical_query(), "aid=170001&wts=1702204169");
	}
}
