//! Static file serving.
//!
//! Everything not matched by another route is looked up under the public
//! directory, which holds the upload directory and the client page.

use std::path::{Path, PathBuf};

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::fs;
use tracing::warn;

use crate::state::AppState;

/// Add static file serving as the fallback of `router`.
pub fn fallback(router: Router<AppState>) -> Router<AppState> {
    router.fallback(get(serve_static))
}

/// Serve a static file.
async fn serve_static(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(file_path) = resolve(&state.config().public_dir, uri.path()) else {
        return not_found();
    };

    match fs::metadata(&file_path).await {
        Ok(meta) if meta.is_file() => {}
        _ => return not_found(),
    }

    let content = match fs::read(&file_path).await {
        Ok(content) => content,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %file_path.display(), error = %e, "failed to read static file");
            }
            return not_found();
        }
    };

    (
        [
            (header::CONTENT_TYPE, mime_from_path(&file_path)),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        Body::from(content),
    )
        .into_response()
}

/// Map a request path to a file under `root`.
///
/// The path is percent-decoded first, so `%20` and encoded UTF-8 name real
/// files and `%2e%2e` counts as `..`. Returns `None` for traversal attempts
/// and invalid encodings. Directory paths map to their `index.html`.
fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(request_path).ok()?;
    let path = decoded.trim_start_matches('/');
    if path.contains("..") || path.contains('\0') || path.contains('\\') {
        return None;
    }

    if path.is_empty() || path.ends_with('/') {
        Some(root.join(path).join("index.html"))
    } else {
        Some(root.join(path))
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("html") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}
