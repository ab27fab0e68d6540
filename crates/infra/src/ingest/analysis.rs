//! Page analysis: dimensions, a preview thumbnail and blank-page metrics.
//!
//! Decoding is CPU-bound, so it runs on the blocking pool.

use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbaImage};
use panelpost_domain::{ComicImage, DisplayRegistry, ImageAnalysis, PanelPostError, Result, Thumbnail};
use tracing::{debug, warn};

use super::compression::encode_jpeg;
use crate::errors::domain;

/// Average luminance above which a page may be blank, and the per-pixel
/// luminance counted as white.
const LUMINANCE_THRESHOLD: f64 = 0.92;
const WHITE_ALPHA_MIN: f64 = 0.85;
const TRANSPARENT_ALPHA_MAX: f64 = 0.05;
const WHITE_RATIO_THRESHOLD: f64 = 0.75;
const TRANSPARENT_RATIO_THRESHOLD: f64 = 0.6;

/// Thumbnail bounds. Images are never upscaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self { max_width: 480, max_height: 480, quality: 80 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WhitePageMetrics {
    average_luminance: f64,
    white_pixel_ratio: f64,
    transparent_pixel_ratio: f64,
    is_likely_blank: bool,
}

fn white_page_metrics(pixels: &RgbaImage) -> WhitePageMetrics {
    let pixel_count = f64::from(pixels.width()) * f64::from(pixels.height());
    let mut luminance_sum = 0.0;
    let mut white = 0u64;
    let mut transparent = 0u64;

    for pixel in pixels.pixels() {
        let [r, g, b, a] = pixel.0.map(|channel| f64::from(channel) / 255.0);
        let luminance = 0.2126 * r + 0.7152 * g + 0.0722 * b;
        luminance_sum += luminance;
        if luminance > LUMINANCE_THRESHOLD && a > WHITE_ALPHA_MIN {
            white += 1;
        }
        if a < TRANSPARENT_ALPHA_MAX {
            transparent += 1;
        }
    }

    if pixel_count == 0.0 {
        return WhitePageMetrics {
            average_luminance: 0.0,
            white_pixel_ratio: 0.0,
            transparent_pixel_ratio: 0.0,
            is_likely_blank: false,
        };
    }

    #[allow(clippy::cast_precision_loss)]
    let (white_pixel_ratio, transparent_pixel_ratio) =
        (white as f64 / pixel_count, transparent as f64 / pixel_count);
    let average_luminance = luminance_sum / pixel_count;
    WhitePageMetrics {
        average_luminance,
        white_pixel_ratio,
        transparent_pixel_ratio,
        is_likely_blank: average_luminance > LUMINANCE_THRESHOLD
            && (white_pixel_ratio > WHITE_RATIO_THRESHOLD
                || transparent_pixel_ratio > TRANSPARENT_RATIO_THRESHOLD),
    }
}

/// Target size for a thumbnail of a `width` x `height` image.
fn thumbnail_size(width: u32, height: u32, options: ThumbnailOptions) -> (u32, u32) {
    let scale = 1f64
        .min(f64::from(options.max_width) / f64::from(width.max(1)))
        .min(f64::from(options.max_height) / f64::from(height.max(1)));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

fn analyze_bytes(data: &[u8], options: ThumbnailOptions) -> Result<ImageAnalysis> {
    let decoded: DynamicImage = image::load_from_memory(data).map_err(domain)?;
    let (width, height) = decoded.dimensions();
    let (thumb_width, thumb_height) = thumbnail_size(width, height, options);

    let resized = decoded.resize_exact(thumb_width, thumb_height, FilterType::Triangle);
    let metrics = white_page_metrics(&resized.to_rgba8());
    let thumbnail = encode_jpeg(&resized, options.quality).map_err(domain)?;

    Ok(ImageAnalysis {
        width,
        height,
        thumbnail: Some(Thumbnail {
            data: thumbnail.into(),
            mime_type: "image/jpeg".to_string(),
            width: thumb_width,
            height: thumb_height,
            display: None,
        }),
        average_luminance: Some(metrics.average_luminance),
        white_pixel_ratio: Some(metrics.white_pixel_ratio),
        transparent_pixel_ratio: Some(metrics.transparent_pixel_ratio),
        is_likely_blank: metrics.is_likely_blank,
    })
}

/// Decode `image` off the async runtime and measure it.
pub async fn analyze_image(image: &ComicImage, options: ThumbnailOptions) -> Result<ImageAnalysis> {
    let data: Arc<[u8]> = Arc::clone(&image.data);
    tokio::task::spawn_blocking(move || analyze_bytes(&data, options))
        .await
        .map_err(|err| PanelPostError::Internal(format!("image analysis task failed: {err}")))?
}

/// Analyse every page in place. A page that cannot be decoded keeps its
/// previous metadata.
pub async fn analyze_pages(
    images: &mut [ComicImage],
    registry: &DisplayRegistry,
    options: ThumbnailOptions,
) {
    for image in images.iter_mut() {
        match analyze_image(image, options).await {
            Ok(analysis) => {
                debug!(image = %image.id, blank = analysis.is_likely_blank, "analysed page");
                image.apply_analysis(analysis, registry);
            }
            Err(err) => warn!(image = %image.id, error = %err, "page analysis failed"),
        }
    }
}
