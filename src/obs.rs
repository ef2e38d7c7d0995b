//! Optional observability helpers for key refreshes, signing, and signed upstream calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `wbi_signer.op` with the `op` and `stage`
//!   (call site) fields, and to log stale-key fallbacks at `warn` level.
//! - Enable `metrics` to increment the `wbi_signer_op_total` counter for every
//!   attempt/success/failure/cache hit/stale fallback, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
	/// Mixin key lookup, including any fragment fetch it triggers.
	KeyRefresh,
	/// Parameter signing.
	Sign,
	/// Signed GET against an arbitrary upstream endpoint.
	SignedGet,
	/// Video metadata lookup.
	VideoInfo,
}
impl Op {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Op::KeyRefresh => "key_refresh",
			Op::Sign => "sign",
			Op::SignedGet => "signed_get",
			Op::VideoInfo => "video_info",
		}
	}
}
impl Display for Op {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Cached key material was fresh; no I/O happened.
	CacheHit,
	/// A fetch failed and stale key material was reused.
	StaleFallback,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
			OpOutcome::CacheHit => "cache_hit",
			OpOutcome::StaleFallback => "stale_fallback",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
