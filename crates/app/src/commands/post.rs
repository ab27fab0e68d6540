//! Posting a directory of pages now or later.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use panelpost_core::{
    build_post_plan, build_scheduler_entry, first_post_title, update_alt_texts, SchedulerStore,
};
use panelpost_domain::{
    ComicImage, PanelPostError, PlanOptions, PostPlan, PostProgress, Result, SchedulerEntry,
    ThreadResult, UploadProgress,
};
use panelpost_infra::ingest::{
    analyze_pages, filter_image_files, read_image_dir, release_comic_images, to_comic_images,
    ThumbnailOptions,
};
use tracing::{debug, info, instrument, warn};

use crate::AppContext;

/// What to post and how to word it.
#[derive(Debug, Clone, Default)]
pub struct PostRequest {
    pub dir: PathBuf,
    pub text: String,
    /// Per-post counter such as `({i}/{n})`.
    pub template: Option<String>,
    /// Alt text such as `{name} ({i}/{n})`.
    pub alt_template: Option<String>,
    /// Leave out pages that look blank.
    pub skip_blank: bool,
}

impl PostRequest {
    fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            first_post_text: self.text.clone(),
            template: self.template.clone(),
            enable_template: self.template.is_some(),
            fallback_text: None,
        }
    }
}

/// Read, analyse and plan the pages in `request.dir`.
///
/// The returned images still hold their display references; release them
/// with [`release_comic_images`] once the plan is done with.
#[instrument(skip(context), fields(dir = %request.dir.display()))]
pub async fn prepare_plan(
    context: &AppContext,
    request: &PostRequest,
) -> Result<(PostPlan, Vec<ComicImage>)> {
    let files = filter_image_files(read_image_dir(&request.dir).await?);
    if files.is_empty() {
        return Err(PanelPostError::InvalidInput(format!(
            "No images found in {}",
            request.dir.display()
        )));
    }

    let mut images = to_comic_images(files, &context.registry);
    analyze_pages(&mut images, &context.registry, ThumbnailOptions::default()).await;

    if request.skip_blank {
        for image in images.iter_mut().filter(|image| image.blank_candidate) {
            warn!(image = %image.name, "Skipping page that looks blank");
            image.marked_for_removal = true;
        }
    }
    if let Some(template) = &request.alt_template {
        update_alt_texts(&mut images, template);
    }

    match build_post_plan(&images, &request.plan_options()) {
        Ok(plan) => {
            debug!(posts = plan.total_posts(), images = plan.total_images(), "plan built");
            Ok((plan, images))
        }
        Err(err) => {
            release_comic_images(&mut images);
            Err(err)
        }
    }
}

/// Post the directory as a thread right away.
#[instrument(skip_all)]
pub async fn post_now(context: &AppContext, request: &PostRequest) -> Result<ThreadResult> {
    let auth = context.fresh_auth_context().await?;
    let (plan, mut images) = prepare_plan(context, request).await?;

    let options = context
        .post_options()
        .with_upload_progress(Arc::new(|event: UploadProgress| {
            debug!(image = %event.image_id, status = ?event.status, attempt = event.attempt, "upload");
        }))
        .with_post_progress(Arc::new(|event: PostProgress| {
            info!(post = %event.post_id, status = ?event.status, uri = event.uri.as_deref().unwrap_or_default(), "post");
        }));

    let result = context.poster(auth).post_plan(&plan, &options).await;
    drop(plan);
    release_comic_images(&mut images);
    result
}

/// Persist the directory as an entry that fires at `at`.
#[instrument(skip_all, fields(at = %at))]
pub async fn schedule_post(
    context: &AppContext,
    request: &PostRequest,
    at: DateTime<Utc>,
) -> Result<SchedulerEntry> {
    let (plan, mut images) = prepare_plan(context, request).await?;

    let existing = context.scheduler_store.list().await?;
    let title = first_post_title(&plan, &existing);
    let entry = build_scheduler_entry(&plan, title, at, Utc::now()).map(|mut entry| {
        entry.text_template = request.template.clone();
        entry
    });
    drop(plan);
    release_comic_images(&mut images);

    let entry = entry?;
    context.scheduler_store.put(entry.clone()).await?;
    info!(entry = %entry.id, images = entry.image_count(), "Thread scheduled");
    Ok(entry)
}
