//! Comic pages as they move from intake to upload.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Tracks how many display references are alive.
///
/// Every [`DisplayRef`] handed out by a registry decrements the live count
/// exactly once, when its last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct DisplayRegistry {
    live: Arc<AtomicUsize>,
}

impl DisplayRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh display reference.
    #[must_use]
    pub fn acquire(&self) -> DisplayRef {
        self.live.fetch_add(1, Ordering::SeqCst);
        DisplayRef {
            inner: Arc::new(DisplayRefInner {
                uri: format!("blob:panelpost/{}", uuid::Uuid::new_v4()),
                live: Arc::clone(&self.live),
            }),
        }
    }

    /// Number of references not yet released.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Transient handle used to preview an image.
#[derive(Clone)]
pub struct DisplayRef {
    inner: Arc<DisplayRefInner>,
}

struct DisplayRefInner {
    uri: String,
    live: Arc<AtomicUsize>,
}

impl Drop for DisplayRefInner {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DisplayRef {
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.inner.uri
    }
}

impl fmt::Debug for DisplayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DisplayRef").field(&self.inner.uri).finish()
    }
}

impl PartialEq for DisplayRef {
    fn eq(&self, other: &Self) -> bool {
        self.inner.uri == other.inner.uri
    }
}

/// Downscaled preview produced by image analysis.
#[derive(Clone, PartialEq)]
pub struct Thumbnail {
    pub data: Arc<[u8]>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub display: Option<DisplayRef>,
}

impl fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thumbnail")
            .field("bytes", &self.data.len())
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Result of analysing one page: dimensions, thumbnail and blank metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAnalysis {
    pub width: u32,
    pub height: u32,
    pub thumbnail: Option<Thumbnail>,
    pub average_luminance: Option<f64>,
    pub white_pixel_ratio: Option<f64>,
    pub transparent_pixel_ratio: Option<f64>,
    pub is_likely_blank: bool,
}

/// How aggressively oversized uploads are re-encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionMode {
    /// Quality may drop to 0.5 before downscaling.
    #[default]
    Standard,
    /// Quality stays at or above 0.8; size is recovered by downscaling.
    HighQuality,
    /// Upload bytes as-is.
    Disabled,
}

impl_domain_status_conversions!(CompressionMode {
    Standard => "standard",
    HighQuality => "high-quality",
    Disabled => "disabled",
});

impl CompressionMode {
    /// Lowest encoder quality the mode accepts.
    #[must_use]
    pub fn quality_floor(self) -> f32 {
        match self {
            Self::Standard | Self::Disabled => 0.5,
            Self::HighQuality => 0.8,
        }
    }
}

/// One page of the comic
#[derive(Clone, PartialEq)]
pub struct ComicImage {
    pub id: String,
    pub data: Arc<[u8]>,
    pub name: String,
    /// Zero-based position in the sequence.
    pub index: usize,
    pub size: u64,
    pub mime_type: String,
    pub display: Option<DisplayRef>,
    pub thumbnail: Option<Thumbnail>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub average_luminance: Option<f64>,
    pub transparent_pixel_ratio: Option<f64>,
    pub blank_candidate: bool,
    pub marked_for_removal: bool,
    pub alt_text: String,
}

impl ComicImage {
    /// Create an image from raw bytes with no display reference.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        index: usize,
        mime_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        let data = data.into();
        Self {
            id: id.into(),
            size: data.len() as u64,
            data,
            name: name.into(),
            index,
            mime_type: mime_type.into(),
            display: None,
            thumbnail: None,
            width: None,
            height: None,
            average_luminance: None,
            transparent_pixel_ratio: None,
            blank_candidate: false,
            marked_for_removal: false,
            alt_text: String::new(),
        }
    }

    #[must_use]
    pub fn with_display(mut self, registry: &DisplayRegistry) -> Self {
        self.display = Some(registry.acquire());
        self
    }

    #[must_use]
    pub fn with_alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = alt_text.into();
        self
    }

    #[must_use]
    pub fn with_dimensions(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// File name without its final extension.
    #[must_use]
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(pos) if pos > 0 => &self.name[..pos],
            _ => &self.name,
        }
    }

    /// Replace the payload, keeping identity and metadata.
    #[must_use]
    pub fn with_payload(&self, name: String, mime_type: String, data: Vec<u8>) -> Self {
        let mut next = self.clone();
        next.size = data.len() as u64;
        next.data = data.into();
        next.name = name;
        next.mime_type = mime_type;
        next
    }

    /// Fold an analysis result into this image.
    pub fn apply_analysis(&mut self, analysis: ImageAnalysis, registry: &DisplayRegistry) {
        self.width = Some(analysis.width);
        self.height = Some(analysis.height);
        self.average_luminance = analysis.average_luminance;
        self.transparent_pixel_ratio = analysis.transparent_pixel_ratio;
        self.blank_candidate = analysis.is_likely_blank;
        self.thumbnail = analysis.thumbnail.map(|mut thumb| {
            thumb.display = Some(registry.acquire());
            thumb
        });
    }

    /// Drop the display and thumbnail references held by this image.
    pub fn release_display(&mut self) {
        self.display = None;
        if let Some(thumbnail) = self.thumbnail.as_mut() {
            thumbnail.display = None;
        }
    }

    /// Extension implied by the file name, lowercased.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name).extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
    }
}

impl fmt::Debug for ComicImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComicImage")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("index", &self.index)
            .field("size", &self.size)
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("marked_for_removal", &self.marked_for_removal)
            .field("alt_text", &self.alt_text)
            .finish_non_exhaustive()
    }
}
