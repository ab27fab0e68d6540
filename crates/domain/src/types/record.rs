//! Wire shapes for blob uploads and feed post records.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::image::ComicImage;
use crate::constants::{BLOB_TYPE, IMAGES_EMBED_TYPE, POST_COLLECTION};

/// `{"$link": cid}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobLink {
    #[serde(rename = "$link")]
    pub link: String,
}

/// Reference to uploaded binary content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRef {
    #[serde(rename = "$type")]
    pub kind: String,
    #[serde(rename = "ref")]
    pub reference: BlobLink,
    pub mime_type: String,
    pub size: u64,
}

impl BlobRef {
    pub fn new(link: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Self {
        Self {
            kind: BLOB_TYPE.to_string(),
            reference: BlobLink { link: link.into() },
            mime_type: mime_type.into(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadBlobResponse {
    pub blob: BlobRef,
}

/// An image paired with the blob it was uploaded as. Lives for one
/// `post_plan` call only.
#[derive(Debug, Clone)]
pub struct UploadedImageRef {
    pub image: ComicImage,
    pub blob: BlobRef,
}

/// `{uri, cid}` pointer to an existing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongRef {
    pub uri: String,
    pub cid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRef {
    pub root: StrongRef,
    pub parent: StrongRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Reduce `width:height` to lowest terms; `None` for degenerate input.
    #[must_use]
    pub fn reduced(width: Option<u32>, height: Option<u32>) -> Option<Self> {
        let (width, height) = (width?, height?);
        if width == 0 || height == 0 {
            return None;
        }
        let divisor = gcd(width, height);
        Some(Self { width: width / divisor, height: height / divisor })
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEmbed {
    pub alt: String,
    pub image: BlobRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagesEmbed {
    #[serde(rename = "$type")]
    pub kind: String,
    pub images: Vec<ImageEmbed>,
}

impl ImagesEmbed {
    #[must_use]
    pub fn new(images: Vec<ImageEmbed>) -> Self {
        Self { kind: IMAGES_EMBED_TYPE.to_string(), images }
    }
}

/// `app.bsky.feed.post` record body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(rename = "$type")]
    pub kind: String,
    pub text: String,
    pub created_at: String,
    pub embed: ImagesEmbed,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyRef>,
}

impl PostRecord {
    #[must_use]
    pub fn new(
        text: String,
        created_at: DateTime<Utc>,
        embed: ImagesEmbed,
        reply: Option<ReplyRef>,
    ) -> Self {
        Self {
            kind: POST_COLLECTION.to_string(),
            text,
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            embed,
            reply,
        }
    }
}

/// Body of `com.atproto.repo.createRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRecordRequest {
    pub repo: String,
    pub collection: String,
    pub record: PostRecord,
}

impl CreateRecordRequest {
    #[must_use]
    pub fn post(repo: String, record: PostRecord) -> Self {
        Self { repo, collection: POST_COLLECTION.to_string(), record }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRecordResponse {
    pub uri: String,
    pub cid: String,
}

impl From<CreateRecordResponse> for StrongRef {
    fn from(value: CreateRecordResponse) -> Self {
        Self { uri: value.uri, cid: value.cid }
    }
}
