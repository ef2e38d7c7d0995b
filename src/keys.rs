//! Rotating key material: raw fragments, the derived mixin key, and the caching key provider.

pub mod fragment;
pub mod mixin;
pub mod provider;

pub use fragment::*;
pub use mixin::*;
pub use provider::*;
