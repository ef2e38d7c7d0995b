//! Canonical parameter signing.
//!
//! [`sign`] turns a parameter mapping into a [`SignedRequest`] the upstream accepts:
//!
//! 1. every value is rendered and stripped of `!'()*`;
//! 2. `wts` is set to the Unix timestamp of `now`;
//! 3. pairs are ordered by byte-wise key comparison;
//! 4. keys and values are percent-encoded, leaving only `[0-9A-Za-z-_.~]` bare (space is `%20`);
//! 5. the joined query string is suffixed with the mixin key and hashed with MD5;
//! 6. the lowercase hex digest becomes `w_rid`.
//!
//! The function is pure: identical inputs always produce byte-identical output.

pub mod param;

pub use param::*;

// crates.io
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
// self
use crate::{
	_prelude::*,
	keys::MixinKey,
	obs::{self, Op, OpOutcome, OpSpan},
};

/// Name of the timestamp parameter.
pub const WTS: &str = "wts";
/// Name of the signature parameter.
pub const W_RID: &str = "w_rid";

const STRIPPED_CHARS: [char; 5] = ['!', '\'', '(', ')', '*'];
const QUERY_ENCODE_SET: &AsciiSet =
	&NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Signed parameter set ready to be sent as a query string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedRequest {
	params: BTreeMap<String, String>,
	query: String,
	wts: i64,
	w_rid: String,
}
impl SignedRequest {
	/// Sanitized parameters, including `wts`, in canonical order.
	pub fn params(&self) -> &BTreeMap<String, String> {
		&self.params
	}

	/// Percent-encoded, sorted query string that was hashed (without `w_rid`).
	pub fn canonical_query(&self) -> &str {
		&self.query
	}

	/// Timestamp placed in `wts`.
	pub fn wts(&self) -> i64 {
		self.wts
	}

	/// Signature placed in `w_rid`.
	pub fn w_rid(&self) -> &str {
		&self.w_rid
	}

	/// Pairs to transmit: the canonical parameters followed by `w_rid`.
	pub fn query_pairs(&self) -> Vec<(&str, &str)> {
		self.params
			.iter()
			.map(|(k, v)| (k.as_str(), v.as_str()))
			.chain([(W_RID, self.w_rid.as_str())])
			.collect()
	}

	/// Full query string: the canonical query with `&w_rid=<digest>` appended.
	pub fn to_query_string(&self) -> String {
		format!("{}&{W_RID}={}", self.query, self.w_rid)
	}

	/// Replaces the query of `url` with [`SignedRequest::to_query_string`].
	pub fn apply_to_url(&self, url: &mut Url) {
		url.set_query(Some(&self.to_query_string()));
	}
}

/// Signs `params` with `mixin_key` at the instant `now`.
///
/// A caller-supplied `wts` is overwritten and a caller-supplied `w_rid` is dropped.
pub fn sign<I, K, V>(params: I, mixin_key: &MixinKey, now: OffsetDateTime) -> Result<SignedRequest>
where
	I: IntoIterator<Item = (K, V)>,
	K: Into<String>,
	V: IntoParamValue,
{
	const OP: Op = Op::Sign;

	let _span = OpSpan::new(OP, "sign").entered();

	obs::record_op_outcome(OP, OpOutcome::Attempt);

	let result = sign_inner(params, mixin_key, now);

	match &result {
		Ok(_) => obs::record_op_outcome(OP, OpOutcome::Success),
		Err(_) => obs::record_op_outcome(OP, OpOutcome::Failure),
	}

	result
}

fn sign_inner<I, K, V>(
	params: I,
	mixin_key: &MixinKey,
	now: OffsetDateTime,
) -> Result<SignedRequest>
where
	I: IntoIterator<Item = (K, V)>,
	K: Into<String>,
	V: IntoParamValue,
{
	let mut sanitized = BTreeMap::new();

	for (key, value) in params {
		let key = key.into();
		let rendered = value
			.into_param_value()
			.and_then(|v| v.canonical())
			.map_err(|reason| Error::InvalidParameterValue { key: key.clone(), reason })?;

		if key == W_RID {
			continue;
		}

		sanitized.insert(key, sanitize(&rendered));
	}

	let wts = now.unix_timestamp();

	sanitized.insert(WTS.to_owned(), wts.to_string());

	let query = canonical_query(&sanitized);
	let w_rid = digest(&query, mixin_key);

	Ok(SignedRequest { params: sanitized, query, wts, w_rid })
}

/// Removes `!`, `'`, `(`, `)` and `*` from `value`.
pub fn sanitize(value: &str) -> String {
	value.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect()
}

/// Percent-encodes everything except ASCII alphanumerics and `-_.~`.
pub fn encode_component(value: &str) -> String {
	utf8_percent_encode(value, QUERY_ENCODE_SET).to_string()
}

/// Joins `params` as `key=value` pairs with `&`, in map order, encoding each side.
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
	let mut buf = String::new();

	for (idx, (key, value)) in params.iter().enumerate() {
		if idx > 0 {
			buf.push('&');
		}

		buf.push_str(&encode_component(key));
		buf.push('=');
		buf.push_str(&encode_component(value));
	}

	buf
}

fn digest(query: &str, mixin_key: &MixinKey) -> String {
	let mut input = String::with_capacity(query.len() + mixin_key.expose().len());

	input.push_str(query);
	input.push_str(mixin_key.expose());

	format!("{:x}", md5::compute(input.as_bytes()))
}
