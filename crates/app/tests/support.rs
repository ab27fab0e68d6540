//! Shared fixtures for app integration tests
//!
//! Builds contexts over temporary directories and a wiremock PDS that
//! accepts app password logins, blob uploads and record creation.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage};
use panelpost_app::AppContext;
use panelpost_domain::{Config, PasswordAuthConfig, StorageConfig};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const DID: &str = "did:plc:artist";
pub const HANDLE: &str = "artist.example";

/// Config rooted in `root` and pointed at `service`.
pub fn config(root: &Path, service: &str) -> Config {
    Config {
        password: PasswordAuthConfig { service: service.to_string() },
        storage: StorageConfig {
            data_dir: root.join("data"),
            session_dir: root.join("session"),
        },
        ..Config::default()
    }
}

/// Context over file stores in `root`, with persisted sessions restored.
pub async fn context(root: &Path, service: &str) -> Arc<AppContext> {
    Arc::new(AppContext::new_with_config(config(root, service)).await.expect("context"))
}

/// Opaque access token and no refresh token, so no refresh is attempted.
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.createSession"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessJwt": "access-jwt",
            "did": DID,
            "handle": HANDLE
        })))
        .mount(server)
        .await;
}

/// Accept uploads and number created records `.../post/1`, `.../post/2`...
pub async fn mount_pds(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.repo.uploadBlob"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "blob": {"$type": "blob", "ref": {"$link": "bafyblob"}, "mimeType": "image/png", "size": 64}
        })))
        .mount(server)
        .await;

    let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.repo.createRecord"))
        .respond_with(move |_: &wiremock::Request| {
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "uri": format!("at://{DID}/app.bsky.feed.post/{n}"),
                "cid": format!("cid{n}")
            }))
        })
        .mount(server)
        .await;
}

fn png(image: &RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).expect("encode");
    out.into_inner()
}

/// Diagonal ink strokes on white; never blank.
fn inked(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if (x + y) % 4 < 2 {
            Rgb([20, 20, 20])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

/// Write `count` inked pages named `page1.png`... into a new `pages` dir.
pub fn write_pages(root: &TempDir, count: usize) -> PathBuf {
    let dir = root.path().join("pages");
    std::fs::create_dir_all(&dir).expect("pages dir");
    for i in 1..=count {
        std::fs::write(dir.join(format!("page{i}.png")), png(&inked(40, 60))).expect("write page");
    }
    dir
}

pub fn write_blank_page(dir: &Path, name: &str) {
    let white = RgbImage::from_pixel(40, 60, Rgb([255, 255, 255]));
    std::fs::write(dir.join(name), png(&white)).expect("write blank page");
}

/// Bodies of every createRecord request, in arrival order.
pub async fn created_records(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .expect("recording enabled")
        .into_iter()
        .filter(|request| request.url.path() == "/xrpc/com.atproto.repo.createRecord")
        .map(|request| serde_json::from_slice(&request.body).expect("json body"))
        .collect()
}
