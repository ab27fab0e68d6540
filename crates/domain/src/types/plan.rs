//! Post plans and thread results

use serde::{Deserialize, Serialize};

use super::image::ComicImage;

/// One post of the thread: its text and up to four images.
#[derive(Debug, Clone, PartialEq)]
pub struct PostPlanEntry {
    pub id: String,
    pub text: String,
    pub images: Vec<ComicImage>,
}

/// Ordered posts ready for upload.
///
/// Totals are derived from the entries, so they cannot drift.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPlan {
    entries: Vec<PostPlanEntry>,
}

impl PostPlan {
    #[must_use]
    pub fn new(entries: Vec<PostPlanEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[PostPlanEntry] {
        &self.entries
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<PostPlanEntry> {
        self.entries
    }

    #[must_use]
    pub fn total_posts(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn total_images(&self) -> usize {
        self.entries.iter().map(|entry| entry.images.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every image across all entries, in plan order.
    pub fn images(&self) -> impl Iterator<Item = &ComicImage> {
        self.entries.iter().flat_map(|entry| entry.images.iter())
    }
}

/// Text options for plan building.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanOptions {
    /// Free-text body of the first post.
    pub first_post_text: String,
    /// Template with `{i}`, `{n}`, `{from}`, `{to}` placeholders.
    pub template: Option<String>,
    pub enable_template: bool,
    /// Text for posts after the first when templating is off.
    pub fallback_text: Option<String>,
}

/// Outcome of a successful `post_plan` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadResult {
    pub root_uri: String,
    pub uris: Vec<String>,
}
