//! Poster service - uploads every image of a plan, then posts the thread
//!
//! Uploads run concurrently behind an [`AdmissionGate`]; each image retries
//! on its own with a linear back-off. Posting is strictly sequential because
//! every reply embeds the identifiers of the posts before it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::try_join_all;
use panelpost_common::AdmissionGate;
use panelpost_domain::constants::{
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_UPLOAD_CONCURRENCY, UPLOAD_MAX_ATTEMPTS, UPLOAD_RETRY_STEP_MS,
};
use panelpost_domain::{
    AspectRatio, ComicImage, CompressionMode, CreateRecordRequest, ImageEmbed, ImagesEmbed,
    PanelPostError, PostPlan, PostPlanEntry, PostProgress, PostRecord, PostingConfig, ReplyRef,
    Result, StrongRef, ThreadResult, UploadProgress, UploadedImageRef,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::ports::{ImageCompressor, PostingApi};
use crate::auth::AuthContext;
use crate::errors::map_common;

/// Callback receiving per-image upload progress.
pub type UploadProgressFn = Arc<dyn Fn(UploadProgress) + Send + Sync>;
/// Callback receiving per-post progress.
pub type PostProgressFn = Arc<dyn Fn(PostProgress) + Send + Sync>;

/// Options for one [`PosterService::post_plan`] call.
#[derive(Clone)]
pub struct PostOptions {
    pub concurrency: usize,
    pub max_upload_bytes: u64,
    pub compression_mode: CompressionMode,
    /// Cancelling stops in-flight uploads and posts; completed work stays.
    pub cancellation: CancellationToken,
    pub on_upload_progress: Option<UploadProgressFn>,
    pub on_post_progress: Option<PostProgressFn>,
}

impl Default for PostOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            compression_mode: CompressionMode::Standard,
            cancellation: CancellationToken::new(),
            on_upload_progress: None,
            on_post_progress: None,
        }
    }
}

impl From<&PostingConfig> for PostOptions {
    fn from(config: &PostingConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            max_upload_bytes: config.max_upload_bytes,
            compression_mode: config.compression_mode,
            ..Self::default()
        }
    }
}

impl PostOptions {
    #[must_use]
    pub fn with_upload_progress(mut self, callback: UploadProgressFn) -> Self {
        self.on_upload_progress = Some(callback);
        self
    }

    #[must_use]
    pub fn with_post_progress(mut self, callback: PostProgressFn) -> Self {
        self.on_post_progress = Some(callback);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    fn emit_upload(&self, progress: UploadProgress) {
        if let Some(callback) = &self.on_upload_progress {
            callback(progress);
        }
    }

    fn emit_post(&self, progress: PostProgress) {
        if let Some(callback) = &self.on_post_progress {
            callback(progress);
        }
    }

    async fn guard<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(PanelPostError::Cancelled),
            result = future => result,
        }
    }
}

/// Uploads a plan's images and creates the reply chain.
pub struct PosterService {
    context: AuthContext,
    api: Arc<dyn PostingApi>,
    compressor: Arc<dyn ImageCompressor>,
}

impl PosterService {
    pub fn new(
        context: AuthContext,
        api: Arc<dyn PostingApi>,
        compressor: Arc<dyn ImageCompressor>,
    ) -> Self {
        Self { context, api, compressor }
    }

    /// Upload every image, then post the entries as one thread.
    ///
    /// Any upload that exhausts its attempts aborts the whole call before
    /// anything is posted. A failed post aborts the rest of the thread;
    /// posts already created are left in place.
    #[instrument(skip_all, fields(posts = plan.total_posts(), images = plan.total_images()))]
    pub async fn post_plan(&self, plan: &PostPlan, options: &PostOptions) -> Result<ThreadResult> {
        let uploaded = self.upload_all(plan, options).await?;
        info!(uploaded = uploaded.len(), "All images uploaded");

        let mut root: Option<StrongRef> = None;
        let mut previous: Option<StrongRef> = None;
        let mut uris = Vec::with_capacity(plan.total_posts());

        for entry in plan.entries() {
            options.emit_post(PostProgress::posting(&entry.id));
            let reply = match (&root, &previous) {
                (Some(root), Some(parent)) => {
                    Some(ReplyRef { root: root.clone(), parent: parent.clone() })
                }
                _ => None,
            };

            let created = match self.post_entry(entry, &uploaded, reply, options).await {
                Ok(created) => created,
                Err(err) => {
                    warn!(post_id = %entry.id, error = %err, "Posting failed, aborting thread");
                    options.emit_post(PostProgress::error(&entry.id, err.to_string()));
                    return Err(err);
                }
            };

            debug!(post_id = %entry.id, uri = %created.uri, "Post created");
            options.emit_post(PostProgress::success(&entry.id, &created.uri));
            uris.push(created.uri.clone());
            if root.is_none() {
                root = Some(created.clone());
            }
            previous = Some(created);
        }

        let root = root.ok_or(PanelPostError::EmptyPlan)?;
        info!(root_uri = %root.uri, posts = uris.len(), "Thread posted");
        Ok(ThreadResult { root_uri: root.uri, uris })
    }

    async fn upload_all(
        &self,
        plan: &PostPlan,
        options: &PostOptions,
    ) -> Result<HashMap<String, UploadedImageRef>> {
        let gate = AdmissionGate::new(options.concurrency).map_err(map_common)?;
        let uploads = plan.images().map(|image| {
            let gate = gate.clone();
            async move { gate.run(self.upload_with_retry(image, options)).await.map_err(map_common)? }
        });

        let uploaded = try_join_all(uploads).await?;
        Ok(uploaded.into_iter().map(|upload| (upload.image.id.clone(), upload)).collect())
    }

    async fn upload_with_retry(
        &self,
        image: &ComicImage,
        options: &PostOptions,
    ) -> Result<UploadedImageRef> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            options.emit_upload(UploadProgress::uploading(&image.id, attempt));

            match self.upload_once(image, options).await {
                Ok(uploaded) => {
                    options.emit_upload(UploadProgress::success(&image.id, attempt));
                    return Ok(uploaded);
                }
                Err(err) => {
                    options.emit_upload(UploadProgress::error(&image.id, attempt, err.to_string()));
                    if attempt >= UPLOAD_MAX_ATTEMPTS || err == PanelPostError::Cancelled {
                        return Err(err);
                    }
                    warn!(image_id = %image.id, attempt, error = %err, "Upload failed, retrying");
                    let delay = Duration::from_millis(UPLOAD_RETRY_STEP_MS * u64::from(attempt));
                    options
                        .guard(async {
                            tokio::time::sleep(delay).await;
                            Ok(())
                        })
                        .await?;
                }
            }
        }
    }

    async fn upload_once(
        &self,
        image: &ComicImage,
        options: &PostOptions,
    ) -> Result<UploadedImageRef> {
        let target = options
            .guard(self.compressor.compress(image, options.max_upload_bytes, options.compression_mode))
            .await?;
        let blob = options.guard(self.api.upload_blob(&self.context, &target)).await?;
        Ok(UploadedImageRef { image: target, blob })
    }

    async fn post_entry(
        &self,
        entry: &PostPlanEntry,
        uploaded: &HashMap<String, UploadedImageRef>,
        reply: Option<ReplyRef>,
        options: &PostOptions,
    ) -> Result<StrongRef> {
        let embeds = entry
            .images
            .iter()
            .map(|image| {
                let upload = uploaded
                    .get(&image.id)
                    .ok_or_else(|| PanelPostError::MissingBlob(image.id.clone()))?;
                Ok(ImageEmbed {
                    alt: image.alt_text.clone(),
                    image: upload.blob.clone(),
                    aspect_ratio: AspectRatio::reduced(upload.image.width, upload.image.height),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let record = PostRecord::new(entry.text.clone(), Utc::now(), ImagesEmbed::new(embeds), reply);
        let request = CreateRecordRequest::post(self.context.repo_did().to_string(), record);
        options.guard(self.api.create_record(&self.context, &request)).await
    }
}
