//! Mixin key derivation from a fragment pair.

// self
use crate::{
	_prelude::*,
	keys::{FRAGMENT_LEN, FragmentError, KeyFragments},
};

/// Positions into `image_key + subtitle_key` picked, in order, to build the mixin key.
///
/// Protocol constant issued by the platform.
pub const MIXIN_KEY_ENC_TAB: [usize; MIXIN_KEY_LEN] = [
	46, 47, 18, 2, 53, 8, 23, 32, 15, 50, 10, 31, 58, 3, 45, 35, 27, 43, 5, 49, 33, 9, 42, 19, 29,
	28, 14, 39, 12, 38, 41, 13,
];

/// Character count of a mixin key.
pub const MIXIN_KEY_LEN: usize = 32;

/// Salt appended to the canonical query string before hashing.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MixinKey(String);
impl MixinKey {
	/// Derives the mixin key for a fragment pair.
	pub fn derive(fragments: &KeyFragments) -> Self {
		let mut raw = [0_u8; FRAGMENT_LEN * 2];

		raw[..FRAGMENT_LEN].copy_from_slice(fragments.image_key.expose().as_bytes());
		raw[FRAGMENT_LEN..].copy_from_slice(fragments.subtitle_key.expose().as_bytes());

		// Fragments are validated ASCII, so every byte maps to one char.
		Self(MIXIN_KEY_ENC_TAB.iter().map(|&idx| char::from(raw[idx])).collect())
	}

	/// Wraps an already derived mixin key.
	pub fn new(value: impl AsRef<str>) -> Result<Self, FragmentError> {
		let view = value.as_ref();

		if view.len() != MIXIN_KEY_LEN {
			return Err(FragmentError::WrongLength {
				expected: MIXIN_KEY_LEN,
				actual: view.chars().count(),
			});
		}
		if !view.bytes().all(|b| b.is_ascii_alphanumeric()) {
			return Err(FragmentError::NonAlphanumeric);
		}

		Ok(Self(view.to_owned()))
	}

	/// Returns the raw key. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl From<&KeyFragments> for MixinKey {
	fn from(fragments: &KeyFragments) -> Self {
		Self::derive(fragments)
	}
}
impl Debug for MixinKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("MixinKey").field(&"<redacted>").finish()
	}
}
impl Display for MixinKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
