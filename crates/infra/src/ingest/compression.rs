//! Re-encoding pages that exceed the upload byte budget.
//!
//! PNG stays PNG; everything else becomes JPEG. Quality is lowered first
//! (JPEG only), then the page is downscaled until it fits or its shorter
//! side reaches 512 px. A result that is not smaller than the original is
//! discarded.

use std::sync::Arc;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageResult};
use panelpost_core::ImageCompressor;
use panelpost_domain::{ComicImage, CompressionMode, PanelPostError, Result};
use tracing::{debug, info, instrument};

use crate::errors::domain;

const START_QUALITY: u8 = 92;
const QUALITY_STEP: u8 = 5;
const DOWNSCALE_FACTOR: f64 = 0.9;
const MIN_DOWNSCALE_SIDE: u32 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Png,
    Jpeg,
}

impl Target {
    fn for_mime(mime_type: &str) -> Self {
        if mime_type.eq_ignore_ascii_case("image/png") {
            Self::Png
        } else {
            Self::Jpeg
        }
    }

    fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    fn encode(self, image: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
        match self {
            Self::Png => {
                let mut out = Vec::new();
                image.write_with_encoder(PngEncoder::new(&mut out))?;
                Ok(out)
            }
            Self::Jpeg => encode_jpeg(image, quality),
        }
    }
}

/// JPEG bytes at `quality` (1-100). Alpha is dropped.
pub(crate) fn encode_jpeg(image: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
    Ok(out)
}

fn quality_floor(mode: CompressionMode) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let floor = (mode.quality_floor() * 100.0).round() as u8;
    floor.min(START_QUALITY)
}

/// Output of one shrink run.
#[derive(Debug)]
struct Shrunk {
    target: Target,
    data: Vec<u8>,
    quality: u8,
    width: u32,
    height: u32,
}

fn shrink(data: &[u8], mime_type: &str, max_bytes: u64, floor: u8) -> Result<Shrunk> {
    let target = Target::for_mime(mime_type);
    let mut working = image::load_from_memory(data).map_err(domain)?;
    let fits = |bytes: &[u8]| bytes.len() as u64 <= max_bytes;

    let mut quality = START_QUALITY;
    let mut encoded = target.encode(&working, quality).map_err(domain)?;

    if target == Target::Jpeg {
        while !fits(&encoded) && quality > floor {
            quality = quality.saturating_sub(QUALITY_STEP).max(floor);
            encoded = target.encode(&working, quality).map_err(domain)?;
        }
    }

    while !fits(&encoded) && working.width().min(working.height()) > MIN_DOWNSCALE_SIDE {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scale = |side: u32| ((f64::from(side) * DOWNSCALE_FACTOR).floor() as u32).max(1);
        working = working.resize_exact(
            scale(working.width()),
            scale(working.height()),
            FilterType::Lanczos3,
        );
        encoded = target.encode(&working, quality).map_err(domain)?;
    }

    let (width, height) = working.dimensions();
    Ok(Shrunk { target, data: encoded, quality, width, height })
}

/// [`ImageCompressor`] backed by the `image` codecs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageReencoder;

#[async_trait]
impl ImageCompressor for ImageReencoder {
    #[instrument(skip_all, fields(image = %image.id, bytes = image.size, max_bytes))]
    async fn compress(
        &self,
        image: &ComicImage,
        max_bytes: u64,
        mode: CompressionMode,
    ) -> Result<ComicImage> {
        if mode == CompressionMode::Disabled || image.size <= max_bytes {
            return Ok(image.clone());
        }

        let data: Arc<[u8]> = Arc::clone(&image.data);
        let mime_type = image.mime_type.clone();
        let floor = quality_floor(mode);
        let shrunk = tokio::task::spawn_blocking(move || shrink(&data, &mime_type, max_bytes, floor))
            .await
            .map_err(|err| PanelPostError::Internal(format!("compression task failed: {err}")))??;

        if shrunk.data.len() as u64 >= image.size {
            debug!(result = shrunk.data.len(), "re-encoding did not help; keeping original");
            return Ok(image.clone());
        }

        let name = match image.extension() {
            Some(_) => format!("{}.{}", image.stem(), shrunk.target.extension()),
            None => image.name.clone(),
        };
        info!(
            from = image.size,
            to = shrunk.data.len(),
            quality = shrunk.quality,
            width = shrunk.width,
            height = shrunk.height,
            "compressed page"
        );
        let mut next =
            image.with_payload(name, shrunk.target.mime_type().to_string(), shrunk.data);
        next.width = Some(shrunk.width);
        next.height = Some(shrunk.height);
        Ok(next)
    }
}
