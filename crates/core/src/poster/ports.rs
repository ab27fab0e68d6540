//! Port interfaces for posting
//!
//! The orchestrator talks to the remote repository and to the image
//! re-encoder only through these traits.

use async_trait::async_trait;
use panelpost_domain::{
    BlobRef, ComicImage, CompressionMode, CreateRecordRequest, Result, StrongRef,
};

use crate::auth::AuthContext;

/// Remote repository calls needed to build a thread.
#[async_trait]
pub trait PostingApi: Send + Sync {
    /// Upload the image bytes, returning the blob reference to embed.
    async fn upload_blob(&self, context: &AuthContext, image: &ComicImage) -> Result<BlobRef>;

    /// Create one record, returning its `{uri, cid}`.
    async fn create_record(
        &self,
        context: &AuthContext,
        request: &CreateRecordRequest,
    ) -> Result<StrongRef>;
}

/// Shrinks images that exceed the upload byte budget.
#[async_trait]
pub trait ImageCompressor: Send + Sync {
    /// Return `image` unchanged when it already fits, otherwise a re-encoded
    /// copy with the same id.
    async fn compress(
        &self,
        image: &ComicImage,
        max_bytes: u64,
        mode: CompressionMode,
    ) -> Result<ComicImage>;
}

/// Compressor that never re-encodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughCompressor;

#[async_trait]
impl ImageCompressor for PassThroughCompressor {
    async fn compress(
        &self,
        image: &ComicImage,
        _max_bytes: u64,
        _mode: CompressionMode,
    ) -> Result<ComicImage> {
        Ok(image.clone())
    }
}
