//! Validated key fragments and the timestamped pair published by the key provider.

// self
use crate::_prelude::*;

/// Character count of every key fragment issued by the platform.
pub const FRAGMENT_LEN: usize = 32;

/// Error returned when a key fragment fails validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum FragmentError {
	/// The URL has no file name segment to extract.
	#[error("Key URL `{url}` has no file name.")]
	MissingStem {
		/// URL that was inspected.
		url: String,
	},
	/// The fragment does not have the expected length.
	#[error("Key fragment must be {expected} characters, got {actual}.")]
	WrongLength {
		/// Required length.
		expected: usize,
		/// Observed length.
		actual: usize,
	},
	/// The fragment contains characters outside `[0-9A-Za-z]`.
	#[error("Key fragment contains non-alphanumeric characters.")]
	NonAlphanumeric,
}

/// One of the two secret fragments issued by the navigation endpoint.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyFragment(String);
impl KeyFragment {
	/// Creates a fragment after validating its shape.
	pub fn new(value: impl AsRef<str>) -> Result<Self, FragmentError> {
		let view = value.as_ref();

		validate_fragment(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Extracts the fragment from a key URL.
	///
	/// The fragment is the last path segment with everything from the first `.` stripped, so
	/// `https://i0.hdslb.com/bfs/wbi/7cd0...077c.png` yields `7cd0...077c`.
	pub fn from_url(url: &str) -> Result<Self, FragmentError> {
		let file = url.rsplit('/').next().unwrap_or_default();
		let stem = file.split('.').next().unwrap_or_default();

		if stem.is_empty() {
			return Err(FragmentError::MissingStem { url: url.to_owned() });
		}

		Self::new(stem)
	}

	/// Returns the raw fragment. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl FromStr for KeyFragment {
	type Err = FragmentError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for KeyFragment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("KeyFragment").field(&"<redacted>").finish()
	}
}

/// Image and subtitle fragments as returned by a single fetch.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyFragments {
	/// Fragment taken from the image URL.
	pub image_key: KeyFragment,
	/// Fragment taken from the subtitle URL.
	pub subtitle_key: KeyFragment,
}
impl KeyFragments {
	/// Pairs two fragments.
	pub fn new(image_key: KeyFragment, subtitle_key: KeyFragment) -> Self {
		Self { image_key, subtitle_key }
	}

	/// Stamps the pair with its retrieval instant.
	pub fn stamp(self, fetched_at: OffsetDateTime) -> RawKeyPair {
		RawKeyPair { fragments: self, fetched_at }
	}
}

/// Key fragments together with the instant they were fetched.
///
/// Both fragments always travel together; there is no way to replace only one of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawKeyPair {
	fragments: KeyFragments,
	fetched_at: OffsetDateTime,
}
impl RawKeyPair {
	/// Fragment taken from the image URL.
	pub fn image_key(&self) -> &KeyFragment {
		&self.fragments.image_key
	}

	/// Fragment taken from the subtitle URL.
	pub fn subtitle_key(&self) -> &KeyFragment {
		&self.fragments.subtitle_key
	}

	/// Both fragments.
	pub fn fragments(&self) -> &KeyFragments {
		&self.fragments
	}

	/// Instant the pair was fetched.
	pub fn fetched_at(&self) -> OffsetDateTime {
		self.fetched_at
	}

	/// Returns `true` while `now - fetched_at` is strictly below `window`.
	///
	/// A `fetched_at` in the future (clock skew) counts as fresh.
	pub fn is_fresh_at(&self, now: OffsetDateTime, window: Duration) -> bool {
		now - self.fetched_at < window
	}
}

fn validate_fragment(view: &str) -> Result<(), FragmentError> {
	if view.len() != FRAGMENT_LEN {
		return Err(FragmentError::WrongLength {
			expected: FRAGMENT_LEN,
			actual: view.chars().count(),
		});
	}
	if !view.bytes().all(|b| b.is_ascii_alphanumeric()) {
		return Err(FragmentError::NonAlphanumeric);
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn from_url_takes_stem_of_last_segment() {
		let fragment =
			KeyFragment::from_url("https://i0.hdslb.com/bfs/wbi/7cd084941338484aae1ad9425b84077c.png")
				.expect("Image URL should carry a valid fragment.");

		assert_eq!(fragment.expose(), "7cd084941338484aae1ad9425b84077c");

		let fragment = KeyFragment::from_url("4932caff0ff746eab6f01bf08b70ac45.tar.gz")
			.expect("Stem should stop at the first dot.");

		assert_eq!(fragment.expose(), "4932caff0ff746eab6f01bf08b70ac45");
	}

	#[test]
	fn from_url_rejects_bad_shapes() {
		assert!(matches!(
			KeyFragment::from_url("https://i0.hdslb.com/bfs/wbi/"),
			Err(FragmentError::MissingStem { .. })
		));
		assert!(matches!(
			KeyFragment::from_url("https://i0.hdslb.com/bfs/wbi/short.png"),
			Err(FragmentError::WrongLength { expected: 32, actual: 5 })
		));
		assert_eq!(
			KeyFragment::new("7cd084941338484aae1ad9425b84077-"),
			Err(FragmentError::NonAlphanumeric)
		);
	}

	#[test]
	fn debug_redacts_fragment() {
		let fragment = KeyFragment::new("7cd084941338484aae1ad9425b84077c")
			.expect("Fragment fixture should be valid.");

		assert_eq!(format!("{fragment:?}"), "KeyFragment(\"<redacted>\")");
	}

	#[test]
	fn freshness_is_strict_at_window_edge() {
		let fetched = macros::datetime!(2026-01-01 00:00 UTC);
		let pair = KeyFragments::new(
			KeyFragment::new("7cd084941338484aae1ad9425b84077c")
				.expect("Image fragment fixture should be valid."),
			KeyFragment::new("4932caff0ff746eab6f01bf08b70ac45")
				.expect("Subtitle fragment fixture should be valid."),
		)
		.stamp(fetched);
		let window = Duration::hours(1);

		assert!(pair.is_fresh_at(fetched, window));
		assert!(pair.is_fresh_at(fetched + Duration::minutes(59), window));
		assert!(!pair.is_fresh_at(fetched + window, window));
		assert!(pair.is_fresh_at(fetched - Duration::minutes(5), window));
	}
}
