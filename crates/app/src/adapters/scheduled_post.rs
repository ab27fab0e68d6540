use std::sync::Arc;

use async_trait::async_trait;
use panelpost_core::{plan_from_groups, ScheduledPostHandler};
use panelpost_domain::{at_uri_to_bsky_app_url, ComicImage, Result, SchedulerEntry};
use tracing::{info, instrument};

use crate::AppContext;

/// Posts a due entry with whichever account is signed in when it fires.
pub struct ScheduledThreadHandler {
    context: Arc<AppContext>,
}

impl ScheduledThreadHandler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl ScheduledPostHandler for ScheduledThreadHandler {
    #[instrument(skip_all, fields(entry = %entry.id))]
    async fn handle(&self, entry: &SchedulerEntry, groups: Vec<Vec<ComicImage>>) -> Result<()> {
        let plan = plan_from_groups(entry, groups);

        let outcome = async {
            let auth = self.context.fresh_auth_context().await?;
            self.context.poster(auth).post_plan(&plan, &self.context.post_options()).await
        }
        .await;

        for mut image in plan.into_entries().into_iter().flat_map(|entry| entry.images) {
            image.release_display();
        }

        let thread = outcome?;
        info!(
            title = %entry.title,
            root = %thread.root_uri,
            url = at_uri_to_bsky_app_url(&thread.root_uri).as_deref().unwrap_or_default(),
            "Scheduled thread published"
        );
        Ok(())
    }
}
