//! Static file serving module
//!
//! The shared error page and the assets referenced by the sample pages.

use crate::http::{self, mime, HttpResponse};
use crate::logger;
use hyper::body::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;

const ERROR_PAGE: &str = "error.html";

const FALLBACK_ERROR_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Page not found</title>
</head>
<body>
    <h1>Page not found</h1>
    <p>The sample you are looking for does not exist.</p>
</body>
</html>"#;

/// The 404 page, falling back to a built-in one when the file is absent
pub async fn error_page(static_dir: &str) -> String {
    let path = Path::new(static_dir).join(ERROR_PAGE);
    match fs::read_to_string(&path).await {
        Ok(html) => html,
        Err(e) => {
            logger::log_warning(&format!(
                "Error page '{}' unavailable: {e}",
                path.display()
            ));
            FALLBACK_ERROR_PAGE.to_string()
        }
    }
}

pub async fn not_found(static_dir: &str, is_head: bool) -> HttpResponse {
    http::build_404_response(error_page(static_dir).await, is_head)
}

/// Serve a file below the static directory, or the 404 page
pub async fn serve_asset(static_dir: &str, path: &str, is_head: bool) -> HttpResponse {
    let Some(file_path) = resolve_asset(static_dir, path) else {
        return not_found(static_dir, is_head).await;
    };

    match fs::read(&file_path).await {
        Ok(content) => {
            http::build_asset_response(Bytes::from(content), mime::content_type_for(&file_path), is_head)
        }
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path.display()
            ));
            not_found(static_dir, is_head).await
        }
    }
}

/// Map a request path to a regular file inside `static_dir`
fn resolve_asset(static_dir: &str, path: &str) -> Option<PathBuf> {
    let relative = path.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }

    let root = match Path::new(static_dir).canonicalize() {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static directory not found or inaccessible '{static_dir}': {e}"
            ));
            return None;
        }
    };

    // File not found is common (404), no need to log it
    let file = root.join(relative).canonicalize().ok()?;
    if !file.starts_with(&root) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {path} -> {}",
            file.display()
        ));
        return None;
    }
    file.is_file().then_some(file)
}
