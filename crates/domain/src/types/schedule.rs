//! Persisted scheduler entries.
//!
//! Entries are self-contained: image bytes travel inside the entry so a
//! restart can rebuild the plan without the original files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;
use crate::utils::base64_serde;

/// What happens to an entry whose handler failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Keep the entry so the next tick retries it.
    RetainOnFailure,
    /// Drop the entry after the first failed attempt.
    #[default]
    DeleteOnFailure,
}

impl_domain_status_conversions!(FailurePolicy {
    RetainOnFailure => "retain-on-failure",
    DeleteOnFailure => "delete-on-failure",
});

/// Serialized image inside a scheduled group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledImage {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
    #[serde(default)]
    pub alt_text: String,
    #[serde(with = "base64_serde")]
    pub file_data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// One future post: its text and serialized images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledGroup {
    pub id: String,
    pub text: String,
    pub images: Vec<ScheduledImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerEntry {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: DateTime<Utc>,
    pub groups: Vec<ScheduledGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_template: Option<String>,
}

impl SchedulerEntry {
    /// True once `scheduled_at` has been reached.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at <= now
    }

    #[must_use]
    pub fn image_count(&self) -> usize {
        self.groups.iter().map(|group| group.images.len()).sum()
    }
}
