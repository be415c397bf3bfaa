//! Response construction for static content and errors.
//!
//! # Responsibilities
//! - Serve file bytes with content type, ranges and conditional requests
//! - Render directory listings
//! - Plain-text status responses for errors
//!
//! # Design Decisions
//! - File serving is delegated to tower-http's `ServeFile`
//! - A directory URL without a trailing '/' is redirected before listing,
//!   so relative links in the listing resolve inside the directory

use std::fmt::Write as _;
use std::path::Path;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use html_escape::{encode_double_quoted_attribute, encode_text};
use tower::ServiceExt;
use tower_http::services::ServeFile;

/// Status code with its reason phrase as a plain-text body.
pub fn status_response(status: StatusCode) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("{}\n", status.canonical_reason().unwrap_or_default()),
    )
        .into_response()
}

/// Serve a regular file. Any method other than HEAD is answered like GET.
pub async fn serve_file(path: &Path, mut request: Request<Body>) -> Response {
    if request.method() != Method::HEAD {
        *request.method_mut() = Method::GET;
    }
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// List `dir`, or redirect to the slash-terminated URL first.
pub async fn directory_listing(dir: &Path, uri: &Uri) -> std::io::Result<Response> {
    let url_path = uri.path();
    if !url_path.ends_with('/') {
        let last = url_path.rsplit('/').next().unwrap_or_default();
        let location = match uri.query() {
            Some(query) => format!("{last}/?{query}"),
            None => format!("{last}/"),
        };
        return Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response());
    }

    let mut entries = Vec::new();
    let mut dir_entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = dir_entries.next_entry().await? {
        let is_dir = entry.file_type().await?.is_dir();
        entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
    }
    entries.sort();

    Ok(Html(render_listing(&entries)).into_response())
}

fn render_listing(entries: &[(String, bool)]) -> String {
    let mut html = String::from("<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n");
    for (name, is_dir) in entries {
        let slash = if *is_dir { "/" } else { "" };
        let _ = writeln!(
            html,
            "<a href=\"{}{slash}\">{}{slash}</a>",
            encode_double_quoted_attribute(&urlencoding::encode(name)),
            encode_text(name)
        );
    }
    html.push_str("</pre>\n");
    html
}
