//! Remote content store adapters.

#[cfg(feature = "wordpress")]
pub mod wordpress;

#[cfg(feature = "wordpress")]
pub use wordpress::WordPressStore;
