// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for key provider lookups.
#[derive(Debug, Default)]
pub struct KeyProviderMetrics {
	fetches: AtomicU64,
	cache_hits: AtomicU64,
	stale_fallbacks: AtomicU64,
	failures: AtomicU64,
}
impl KeyProviderMetrics {
	/// Returns the number of fragment fetches issued.
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}

	/// Returns the number of lookups answered without I/O.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of failed fetches that reused a stale context.
	pub fn stale_fallbacks(&self) -> u64 {
		self.stale_fallbacks.load(Ordering::Relaxed)
	}

	/// Returns the number of failed fetches with nothing to fall back to.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_fetch(&self) {
		self.fetches.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_stale_fallback(&self) {
		self.stale_fallbacks.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
