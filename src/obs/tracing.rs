// self
use crate::{_prelude::*, error::FetchError, obs::Op};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by crate operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(op: Op, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("wbi_signer.op", op = op.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (op, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> OpSpanGuard {
		#[cfg(feature = "tracing")]
		{
			OpSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			OpSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`OpSpan::entered`].
pub struct OpSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for OpSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OpSpanGuard(..)")
	}
}

/// Logs that a key fetch failed and the previous mixin key stays in use.
pub fn log_stale_fallback(err: &FetchError, fetched_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			error = %err,
			fetched_at = %fetched_at,
			"Key fragment fetch failed; signing with the previous mixin key."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (err, fetched_at);
	}
}

/// Logs that fresh key fragments were published.
pub fn log_keys_published(fetched_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(fetched_at = %fetched_at, "Published new key fragments.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = fetched_at;
	}
}
