//! A trivial static file server for the generated site.
//!
//! Serves the output directory over HTTP so a freshly generated site can
//! be checked locally. No caching, no directory listings, no range
//! requests; directories resolve to their `index.html`.

use axum::{
    Router,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use std::{
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tokio::net::TcpListener;

/// Serves `root` at the `bind` address until interrupted.
#[tokio::main]
pub async fn serve(bind: &str, root: PathBuf) -> Result<(), std::io::Error> {
    let app = Router::new()
        .fallback(serve_path)
        .with_state(Arc::new(root));

    let listener = TcpListener::bind(bind).await?;
    log::info!("Serving at http://{bind}/");
    axum::serve(listener, app).await
}

/// Resolves one request path inside the served root.
async fn serve_path(State(root): State<Arc<PathBuf>>, uri: Uri) -> Response {
    let Some(rel) = sanitize(uri.path()) else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };

    let mut path = root.join(rel);
    if path.is_dir() {
        path.push("index.html");
    }

    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, mime_for(&path))], bytes).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

/// Decodes a request path and rejects anything that could escape the
/// served root.
fn sanitize(path: &str) -> Option<PathBuf> {
    let decoded = percent_encoding::percent_decode_str(path).decode_utf8_lossy();
    let rel = Path::new(decoded.trim_start_matches('/'));
    if rel
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        Some(rel.to_path_buf())
    } else {
        None
    }
}

/// Content type by file extension.
fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match ext {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" | "md" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
