use std::time::Duration;

use async_trait::async_trait;
use panelpost_common::resilience::policies::PredicateRetry;
use panelpost_common::{RetryConfig, RetryExecutor};
use panelpost_core::{AuthContext, PostingApi};
use panelpost_domain::constants::{
    API_BACKOFF_FACTOR, API_BASE_DELAY_MS, API_MAX_JITTER_MS, API_RETRIES, XRPC_CREATE_RECORD,
    XRPC_UPLOAD_BLOB,
};
use panelpost_domain::{
    BlobRef, ComicImage, CreateRecordRequest, CreateRecordResponse, PanelPostError, Result,
    StrongRef, UploadBlobResponse,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response};
use tracing::{debug, instrument};

use crate::auth::oauth::endpoint;
use crate::errors::domain;
use crate::http::client::status_and_body;
use crate::http::HttpClient;

const UPLOAD_LABEL: &str = "Upload";
const CREATE_RECORD_LABEL: &str = "createRecord";

/// Backoff used for XRPC calls: 4 retries, 500 ms doubling, up to 250 ms
/// jitter.
#[must_use]
pub fn default_retry_config() -> RetryConfig {
    RetryConfig::builder()
        .retries(API_RETRIES)
        .exponential_backoff(
            Duration::from_millis(API_BASE_DELAY_MS),
            f64::from(API_BACKOFF_FACTOR),
        )
        .jitter(Duration::from_millis(API_MAX_JITTER_MS))
        .build()
}

#[derive(Debug, Clone)]
pub struct XrpcClient {
    http: HttpClient,
    retry: RetryConfig,
}

impl XrpcClient {
    /// Retries happen here rather than in `http` so that every attempt
    /// carries fresh auth headers.
    pub fn new(http: HttpClient) -> Self {
        Self { http, retry: default_retry_config() }
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Send the request built by `build` for `nsid`, retrying 5xx/429 and
    /// transport failures. Non-2xx responses become `Api` errors labelled
    /// `label`.
    async fn call<F>(
        &self,
        context: &AuthContext,
        nsid: &str,
        label: &str,
        build: F,
    ) -> Result<Response>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let url = endpoint(context.base_url(), &format!("/xrpc/{nsid}"))?;
        let executor =
            RetryExecutor::new(self.retry.clone(), PredicateRetry::new(PanelPostError::is_retryable));
        let (url, build) = (&url, &build);

        executor
            .execute(move || async move {
                let headers = context.build_headers(url.as_str(), "POST")?;
                let mut request = build(self.http.request(Method::POST, url.clone()));
                for (name, value) in headers.pairs() {
                    request = request.header(name, value);
                }

                let response = self.http.send(request).await?;
                if response.status().is_success() {
                    return Ok::<_, PanelPostError>(response);
                }
                let (status, body) = status_and_body(response).await;
                debug!(%url, status, "XRPC call rejected");
                Err(PanelPostError::api(label, status, body))
            })
            .await
    }
}

#[async_trait]
impl PostingApi for XrpcClient {
    #[instrument(skip_all, fields(image = %image.id, bytes = image.size))]
    async fn upload_blob(&self, context: &AuthContext, image: &ComicImage) -> Result<BlobRef> {
        let response = self
            .call(context, XRPC_UPLOAD_BLOB, UPLOAD_LABEL, |request| {
                request.header(CONTENT_TYPE, image.mime_type.as_str()).body(image.data.to_vec())
            })
            .await?;
        let uploaded: UploadBlobResponse = response.json().await.map_err(domain)?;
        Ok(uploaded.blob)
    }

    #[instrument(skip_all, fields(repo = %request.repo))]
    async fn create_record(
        &self,
        context: &AuthContext,
        request: &CreateRecordRequest,
    ) -> Result<StrongRef> {
        let response = self
            .call(context, XRPC_CREATE_RECORD, CREATE_RECORD_LABEL, |builder| builder.json(request))
            .await?;
        let created: CreateRecordResponse = response.json().await.map_err(domain)?;
        Ok(created.into())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::Utc;
    use panelpost_common::DpopKeyPair;
    use panelpost_domain::{ImageEmbed, ImagesEmbed, OAuthSession, PostRecord};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client() -> XrpcClient {
        XrpcClient::new(HttpClient::new().unwrap()).with_retry_config(
            RetryConfig::builder().retries(2).fixed_backoff(Duration::from_millis(1)).no_jitter().build(),
        )
    }

    fn password_context(service: &str) -> AuthContext {
        AuthContext::AppPassword {
            service: service.into(),
            did: "did:plc:bob".into(),
            access_jwt: "jwt-1".into(),
            refresh_jwt: None,
        }
    }

    fn oauth_context(pds_url: &str) -> AuthContext {
        AuthContext::OAuth {
            session: OAuthSession {
                access_token: "access-1".into(),
                refresh_token: None,
                active_did: "did:plc:alice".into(),
                expires_at: i64::MAX,
                pds_url: pds_url.into(),
            },
            key_pair: DpopKeyPair::generate(),
        }
    }

    fn image() -> ComicImage {
        ComicImage::new("img-1", "page1.png", 0, "image/png", vec![1u8, 2, 3])
    }

    fn blob_json() -> serde_json::Value {
        serde_json::json!({
            "blob": {"$type": "blob", "ref": {"$link": "bafyblob"}, "mimeType": "image/png", "size": 3}
        })
    }

    #[tokio::test]
    async fn upload_sends_raw_bytes_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.uploadBlob"))
            .and(header("Authorization", "Bearer jwt-1"))
            .and(header("Content-Type", "image/png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(blob_json()))
            .expect(1)
            .mount(&server)
            .await;

        let blob = client().upload_blob(&password_context(&server.uri()), &image()).await.unwrap();
        assert_eq!(blob, BlobRef::new("bafyblob", "image/png", 3));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].body, vec![1u8, 2, 3]);
    }

    #[tokio::test]
    async fn server_errors_are_retried_with_fresh_proofs() {
        let server = MockServer::start().await;
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.uploadBlob"))
            .respond_with(move |_req: &wiremock::Request| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    ResponseTemplate::new(503)
                } else {
                    ResponseTemplate::new(200).set_body_json(blob_json())
                }
            })
            .expect(2)
            .mount(&server)
            .await;

        client().upload_blob(&oauth_context(&server.uri()), &image()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let proofs: Vec<_> = requests
            .iter()
            .map(|r| r.headers.get("DPoP").unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(proofs.len(), 2);
        assert_ne!(proofs[0], proofs[1]);
        assert!(requests
            .iter()
            .all(|r| r.headers.get("Authorization").unwrap() == "DPoP access-1"));
    }

    #[tokio::test]
    async fn client_errors_fail_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(413).set_body_string("BlobTooLarge"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client().upload_blob(&password_context(&server.uri()), &image()).await.unwrap_err();
        assert_eq!(err, PanelPostError::api("Upload", 413, "BlobTooLarge"));
    }

    #[tokio::test]
    async fn exhausted_retries_return_last_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .expect(3)
            .mount(&server)
            .await;

        let request = CreateRecordRequest::post(
            "did:plc:bob".into(),
            PostRecord::new("hi".into(), Utc::now(), ImagesEmbed::new(Vec::<ImageEmbed>::new()), None),
        );
        let err = client().create_record(&password_context(&server.uri()), &request).await.unwrap_err();
        assert_eq!(err, PanelPostError::api("createRecord", 500, "down"));
    }

    #[tokio::test]
    async fn create_record_posts_json_and_returns_strong_ref() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.createRecord"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "uri": "at://did:plc:bob/app.bsky.feed.post/3k", "cid": "bafyrec"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = CreateRecordRequest::post(
            "did:plc:bob".into(),
            PostRecord::new("hello".into(), Utc::now(), ImagesEmbed::new(Vec::new()), None),
        );
        let created =
            client().create_record(&password_context(&server.uri()), &request).await.unwrap();
        assert_eq!(created.uri, "at://did:plc:bob/app.bsky.feed.post/3k");
        assert_eq!(created.cid, "bafyrec");

        let body: serde_json::Value =
            serde_json::from_slice(&server.received_requests().await.unwrap()[0].body).unwrap();
        assert_eq!(body["repo"], "did:plc:bob");
        assert_eq!(body["collection"], "app.bsky.feed.post");
        assert_eq!(body["record"]["text"], "hello");
    }
}
