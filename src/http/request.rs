//! Request inspection helpers.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for tracing
//! - Extract the basic-auth principal handed to handlers
//! - Sanitize the principal before it enters a handler environment
//!
//! # Design Decisions
//! - Request ID added as early as possible and echoed on the response
//! - Credentials are never verified here; the password is discarded

use axum::http::{header, HeaderMap, HeaderValue, Request};
use base64::{engine::general_purpose, Engine as _};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of an incoming request, or "unknown".
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// User name from `Authorization: Basic ...`, if well formed.
pub fn basic_auth_user(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, credentials) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = general_purpose::STANDARD.decode(credentials.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, _password) = decoded.split_once(':')?;
    Some(user.to_string())
}

/// Strip the characters that could smuggle extra `NAME=value` pairs into
/// a handler environment.
pub fn sanitize_remote_user(user: &str) -> String {
    user.chars().filter(|c| !matches!(c, ':' | '=')).collect()
}
