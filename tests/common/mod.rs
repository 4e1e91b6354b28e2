// Each integration test file is a separate binary; helpers not used in every
// binary would otherwise trigger dead_code warnings from clippy.
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    routing::get,
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;
use wiremock::ResponseTemplate;

use preview_server::{
    archive::Archiver,
    handlers,
    preview::{build_client, Identity, ImagePolicy, ImageValidator, PageFetcher, PreviewEngine},
    state::AppState,
};

/// Build an engine that tries `identities` in order with the default policy.
/// Private hosts are allowed because mock sites live on 127.0.0.1.
pub fn engine_with(identities: Vec<Identity>) -> PreviewEngine {
    build_engine(identities, false)
}

/// Same as [`engine_with`] but with the private address guard on, as in
/// production. The page itself is still fetched from 127.0.0.1; only image
/// candidates and redirect hops are checked.
pub fn guarded_engine_with(identities: Vec<Identity>) -> PreviewEngine {
    build_engine(identities, true)
}

fn build_engine(identities: Vec<Identity>, block_private_hosts: bool) -> PreviewEngine {
    let client = build_client(block_private_hosts).expect("Failed to build HTTP client");
    PreviewEngine::new(
        PageFetcher::new(client.clone()),
        ImageValidator::new(client, ImagePolicy::default(), block_private_hosts),
        identities,
        vec!["maps.gstatic.com".to_string()],
    )
}

/// Two identities whose User-Agent strings are easy to match in mocks.
pub fn two_identities() -> Vec<Identity> {
    vec![
        Identity::new("a", "identity-a"),
        Identity::new("b", "identity-b"),
    ]
}

/// State for router tests. The private address guard is off because mock
/// sites live on 127.0.0.1.
pub fn test_state(engine: PreviewEngine, archiver: Archiver) -> AppState {
    AppState {
        engine: Arc::new(engine),
        archiver: Arc::new(archiver),
        block_private_hosts: false,
    }
}

/// Default rotation, and an archiver pointing at a binary that does not exist.
pub fn default_state() -> AppState {
    test_state(
        engine_with(Identity::default_rotation()),
        Archiver::new("no-such-archive-tool", Vec::new(), Duration::from_secs(5)),
    )
}

/// Build the application router the same way `main` does, minus metrics.
pub fn create_test_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/preview", get(handlers::preview::get_preview))
        .route("/archive", get(handlers::archive::archive_page))
        .with_state(state)
}

/// Percent-encode a URL for use as a query parameter value.
pub fn encode(url: &str) -> String {
    url::form_urlencoded::byte_serialize(url.as_bytes()).collect()
}

// ── Request helpers ──────────────────────────────────────────────────────────

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

pub fn json_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "application/json")
}

pub fn png(width: u32, height: u32) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(png_bytes(width, height), "image/png")
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::RgbImage::new(width, height)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// A decodable 200x200 PNG padded past the 10 MiB image cap.
pub fn oversized_png_bytes() -> Vec<u8> {
    let mut bytes = png_bytes(200, 200);
    bytes.resize(11 * 1024 * 1024, 0);
    bytes
}

/// Serve `body` to every connection without a `Content-Length`, so the
/// client only learns the size by streaming until the socket closes.
pub async fn serve_unsized_body(body: Vec<u8>, content_type: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nConnection: close\r\n\r\n"
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}
