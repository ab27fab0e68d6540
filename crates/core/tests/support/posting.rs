use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use panelpost_core::{AuthContext, PostingApi};
use panelpost_domain::{
    BlobRef, ComicImage, CreateRecordRequest, PanelPostError, Result as DomainResult, StrongRef,
};

/// In-memory `PostingApi` that records every call.
///
/// Uploads return a blob whose link is derived from the image id; records
/// get sequential `at://` URIs.
#[derive(Default, Clone)]
pub struct RecordingPostingApi {
    uploads: Arc<Mutex<Vec<ComicImage>>>,
    records: Arc<Mutex<Vec<CreateRecordRequest>>>,
    reject_record_at: Option<usize>,
}

impl RecordingPostingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `index`-th createRecord call (0-based) with a 400.
    pub fn rejecting_record(mut self, index: usize) -> Self {
        self.reject_record_at = Some(index);
        self
    }

    pub fn uploads(&self) -> Vec<ComicImage> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<CreateRecordRequest> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostingApi for RecordingPostingApi {
    async fn upload_blob(&self, _context: &AuthContext, image: &ComicImage) -> DomainResult<BlobRef> {
        self.uploads.lock().unwrap().push(image.clone());
        Ok(BlobRef::new(format!("bafkrei-{}", image.id), image.mime_type.clone(), image.size))
    }

    async fn create_record(
        &self,
        context: &AuthContext,
        request: &CreateRecordRequest,
    ) -> DomainResult<StrongRef> {
        let mut records = self.records.lock().unwrap();
        let index = records.len();
        records.push(request.clone());
        if self.reject_record_at == Some(index) {
            return Err(PanelPostError::api("createRecord", 400, "InvalidRequest"));
        }
        Ok(StrongRef {
            uri: format!("at://{}/app.bsky.feed.post/rkey{index}", context.repo_did()),
            cid: format!("bafyrei{index}"),
        })
    }
}

/// Password-auth context for tests.
pub fn password_context() -> AuthContext {
    AuthContext::AppPassword {
        service: "https://bsky.social".into(),
        did: "did:plc:tester".into(),
        access_jwt: "access".into(),
        refresh_jwt: Some("refresh".into()),
    }
}

/// `count` sequential PNG pages named `page{n}.png`.
pub fn pages(count: usize) -> Vec<ComicImage> {
    (0..count)
        .map(|i| {
            ComicImage::new(format!("img-{i}"), format!("page{}.png", i + 1), i, "image/png", vec![i as u8; 32])
                .with_dimensions(Some(1200), Some(1600))
        })
        .collect()
}
