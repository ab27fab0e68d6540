//! Progress events emitted while a plan is uploaded and posted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Success,
    Error,
}

/// Per-image upload progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub image_id: String,
    pub status: UploadStatus,
    /// 1-based attempt number.
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Posting,
    Success,
    Error,
}

/// Per-post progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostProgress {
    pub post_id: String,
    pub status: PostStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadProgress {
    pub fn uploading(image_id: impl Into<String>, attempt: u32) -> Self {
        Self { image_id: image_id.into(), status: UploadStatus::Uploading, attempt, error: None }
    }

    pub fn success(image_id: impl Into<String>, attempt: u32) -> Self {
        Self { image_id: image_id.into(), status: UploadStatus::Success, attempt, error: None }
    }

    pub fn error(image_id: impl Into<String>, attempt: u32, error: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            status: UploadStatus::Error,
            attempt,
            error: Some(error.into()),
        }
    }
}

impl PostProgress {
    pub fn posting(post_id: impl Into<String>) -> Self {
        Self { post_id: post_id.into(), status: PostStatus::Posting, uri: None, error: None }
    }

    pub fn success(post_id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            status: PostStatus::Success,
            uri: Some(uri.into()),
            error: None,
        }
    }

    pub fn error(post_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            status: PostStatus::Error,
            uri: None,
            error: Some(error.into()),
        }
    }
}
