//! Conversions between post plans and persisted scheduler entries.

use chrono::{DateTime, Utc};
use panelpost_domain::constants::DEFAULT_SCHEDULED_TITLE;
use panelpost_domain::{
    ComicImage, PanelPostError, PostPlan, PostPlanEntry, Result, ScheduledGroup, ScheduledImage,
    SchedulerEntry,
};
use uuid::Uuid;

/// Title shown for a new entry.
///
/// The first non-empty line of the first post, else the title of the most
/// recent existing entry, else a generic label.
#[must_use]
pub fn first_post_title(plan: &PostPlan, existing: &[SchedulerEntry]) -> String {
    plan.entries()
        .first()
        .and_then(|entry| entry.text.lines().map(str::trim).find(|line| !line.is_empty()))
        .map(str::to_string)
        .or_else(|| {
            existing.last().map(|entry| entry.title.clone()).filter(|title| !title.is_empty())
        })
        .unwrap_or_else(|| DEFAULT_SCHEDULED_TITLE.to_string())
}

/// Snapshot `plan` into a self-contained entry firing at `scheduled_at`.
///
/// Fails with `InvalidInput` unless `scheduled_at` is strictly after `now`.
pub fn build_scheduler_entry(
    plan: &PostPlan,
    title: impl Into<String>,
    scheduled_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<SchedulerEntry> {
    if scheduled_at <= now {
        return Err(PanelPostError::InvalidInput(format!(
            "Scheduled time {} is not in the future",
            scheduled_at.to_rfc3339()
        )));
    }
    if plan.is_empty() {
        return Err(PanelPostError::EmptyPlan);
    }

    let groups = plan
        .entries()
        .iter()
        .map(|entry| ScheduledGroup {
            id: entry.id.clone(),
            text: entry.text.clone(),
            images: entry.images.iter().map(to_scheduled_image).collect(),
        })
        .collect();

    Ok(SchedulerEntry {
        id: Uuid::new_v4().to_string(),
        title: title.into(),
        created_at: now,
        scheduled_at,
        groups,
        text_template: None,
    })
}

fn to_scheduled_image(image: &ComicImage) -> ScheduledImage {
    ScheduledImage {
        id: image.id.clone(),
        name: image.name.clone(),
        mime_type: image.mime_type.clone(),
        size: image.size,
        alt_text: image.alt_text.clone(),
        file_data: image.data.to_vec(),
        width: image.width,
        height: image.height,
    }
}

/// Rebuild a plan from an entry and the images restored for each group.
///
/// Group ids and texts are kept; a group without restored images posts
/// with none.
#[must_use]
pub fn plan_from_groups(entry: &SchedulerEntry, groups: Vec<Vec<ComicImage>>) -> PostPlan {
    let mut groups = groups.into_iter();
    let entries = entry
        .groups
        .iter()
        .enumerate()
        .map(|(index, group)| PostPlanEntry {
            id: if group.id.is_empty() { (index + 1).to_string() } else { group.id.clone() },
            text: group.text.clone(),
            images: groups.next().unwrap_or_default(),
        })
        .collect();
    PostPlan::new(entries)
}
