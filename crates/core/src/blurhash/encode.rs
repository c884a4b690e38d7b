use crate::{GleanerError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::path::Path;

/// Pixels per fingerprint component on each axis.
const RESAMPLE_FACTOR: u32 = 32;

/// Computes the BlurHash of the image stored at `path`.
///
/// The image is resampled to a `(32·x, 32·y)` frame cropped at the top
/// center, so portrait and landscape sources contribute comparable
/// fingerprints, then handed to the encoder as RGBA pixel data. Every
/// failure in the chain (unreadable file, decode error, encoder
/// rejection) surfaces as an explicit error for the caller to downgrade.
pub fn calculate_blurhash(path: &Path, x_components: u32, y_components: u32) -> Result<String> {
    let image = image::open(path)?;

    let width = RESAMPLE_FACTOR * x_components;
    let height = RESAMPLE_FACTOR * y_components;
    let frame = fit_top_center(&image, width, height);
    let rgba = frame.to_rgba8();

    blurhash::encode(x_components, y_components, width, height, rgba.as_raw()).map_err(|err| {
        GleanerError::FingerprintEncode { path: path.to_path_buf(), reason: format!("{err:?}") }
    })
}

/// Scales to cover `width × height` preserving aspect ratio, then crops
/// anchored at the top center.
fn fit_top_center(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (source_w, source_h) = image.dimensions();

    let scale = f64::max(
        f64::from(width) / f64::from(source_w),
        f64::from(height) / f64::from(source_h),
    );
    let scaled_w = ((f64::from(source_w) * scale).round() as u32).max(width);
    let scaled_h = ((f64::from(source_h) * scale).round() as u32).max(height);

    let resized = image.resize_exact(scaled_w, scaled_h, FilterType::Triangle);
    let left = (scaled_w - width) / 2;
    resized.crop_imm(left, 0, width, height)
}
