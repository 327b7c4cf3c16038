//! Adaptive frame extraction and DCT perceptual hashing.
//!
//! Frame decoding itself is delegated to a [`dedup_common::FrameSource`];
//! this crate computes the selection policy handed to it, applies the
//! uniform-downsample fallback, and turns raw grayscale tiles into
//! [`dedup_common::FrameHash`]es.

mod config;
mod dct;
mod extract;

pub use config::{FrameSelectConfig, HashConfig};
pub use dct::hash_tile;
pub use extract::{build_select_policy, hash_image, hash_video};
