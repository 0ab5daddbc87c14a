use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView, imageops::FilterType};
use ndarray::Array4;

/// Load an image from disk into memory.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path_ref = path.as_ref();
    image::open(path_ref).with_context(|| format!("failed to open image {}", path_ref.display()))
}

/// Decode an in-memory encoded image (PNG, JPEG, ...), guessing the format from its header.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    anyhow::ensure!(!bytes.is_empty(), "image payload is empty");
    image::load_from_memory(bytes).context("failed to decode image bytes")
}

/// Stretch an image to exactly `width` x `height`, ignoring its aspect ratio.
///
/// The colour type is narrowed to its 8-bit equivalent so the result can be read as raw
/// `0..=255` samples.
pub fn resize_exact(
    image: &DynamicImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> DynamicImage {
    let narrowed = narrow_to_8bit(image);
    if narrowed.dimensions() == (width, height) {
        return narrowed;
    }
    narrowed.resize_exact(width, height, filter)
}

/// Convert an 8-bit image into a `[1, H, W, C]` array of raw sample values.
///
/// `C` follows the image's colour type (1 for luma, 2 for luma+alpha, 3 for RGB, 4 for RGBA).
pub fn to_nhwc_array(image: &DynamicImage) -> Array4<f32> {
    let narrowed = narrow_to_8bit(image);
    let (width, height) = narrowed.dimensions();
    let channels = usize::from(narrowed.color().channel_count());
    let samples: &[u8] = narrowed.as_bytes();
    debug_assert_eq!(
        samples.len(),
        width as usize * height as usize * channels,
        "8-bit image buffer must be tightly packed"
    );

    Array4::from_shape_fn(
        (1, height as usize, width as usize, channels),
        |(_, y, x, c)| f32::from(samples[(y * width as usize + x) * channels + c]),
    )
}

fn narrow_to_8bit(image: &DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => image.clone(),
        DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(image.to_luma8()),
        DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgb32F(_) => {
            DynamicImage::ImageRgb8(image.to_rgb8())
        }
        _ => DynamicImage::ImageRgba8(image.to_rgba8()),
    }
}
