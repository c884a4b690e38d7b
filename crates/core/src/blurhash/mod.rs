//! BlurHash fingerprinting for downloaded images.
//!
//! [`BlurhashPipeline`] attaches a compact perceptual fingerprint to
//! every image descriptor a record references, memoizing computations in
//! a bounded per-instance cache so repeated references to the same file
//! are decoded at most once per run.

mod encode;
mod pipeline;

pub use encode::calculate_blurhash;
pub use pipeline::{BLURHASH_KEY, BlurhashConfig, BlurhashPipeline};
