//! CGI response parsing (RFC 3875 section 6).
//!
//! The handler prints a header block, a blank line, then the body. Only the
//! header block is read here; the body is streamed by the caller. Two
//! pseudo-headers are interpreted: `Status` sets the response status, and a
//! `Location` without `Status` turns the answer into a `302 Found`.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::cgi::process::InvokeError;

/// Largest header block accepted from a handler.
pub const MAX_HEADER_BYTES: usize = 64 * 1024;

const MAX_HEADERS: usize = 64;

/// Read up to and including the first empty line (LF or CRLF).
///
/// At end of output the whole of it is the header block.
pub async fn read_header_block<R>(reader: &mut R) -> Result<Vec<u8>, InvokeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = Vec::new();
    loop {
        let start = head.len();
        let budget = (MAX_HEADER_BYTES + 1 - head.len()) as u64;
        let read = (&mut *reader)
            .take(budget)
            .read_until(b'\n', &mut head)
            .await
            .map_err(InvokeError::Read)?;
        if read == 0 {
            return Ok(head);
        }
        if head.len() > MAX_HEADER_BYTES {
            return Err(InvokeError::HeaderTooLarge(MAX_HEADER_BYTES));
        }
        if matches!(&head[start..], b"\n" | b"\r\n") {
            return Ok(head);
        }
    }
}

/// Status and headers of a header block.
pub fn parse_header_block(head: &[u8]) -> Result<(StatusCode, HeaderMap), InvokeError> {
    let block = terminated(head);
    let mut storage = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let parsed = match httparse::parse_headers(&block, &mut storage)? {
        httparse::Status::Complete((_, parsed)) => parsed,
        httparse::Status::Partial => return Err(InvokeError::NoHeaders),
    };

    let mut status = None;
    let mut headers = HeaderMap::new();
    for field in parsed {
        let value = field.value.trim_ascii();
        if field.name.eq_ignore_ascii_case("status") {
            status = Some(parse_status(value)?);
            continue;
        }
        match (HeaderName::from_bytes(field.name.as_bytes()), HeaderValue::from_bytes(value)) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::warn!(header = %field.name, "Invalid header from handler"),
        }
    }

    if status.is_none() && headers.is_empty() {
        return Err(InvokeError::NoHeaders);
    }

    let status = match status {
        Some(status) => status,
        None if headers.contains_key(header::LOCATION) => StatusCode::FOUND,
        None if !headers.contains_key(header::CONTENT_TYPE) => {
            return Err(InvokeError::MissingContentType)
        }
        None => StatusCode::OK,
    };
    Ok((status, headers))
}

/// `Status: 404 Not Found` → 404. Only the leading code is significant.
fn parse_status(value: &[u8]) -> Result<StatusCode, InvokeError> {
    value
        .get(..3)
        .and_then(|code| StatusCode::from_bytes(code).ok())
        .ok_or_else(|| InvokeError::BogusStatus(String::from_utf8_lossy(value).into_owned()))
}

/// A block that ended with the output still needs its empty line.
fn terminated(head: &[u8]) -> Vec<u8> {
    let mut block = head.to_vec();
    let complete = matches!(head, b"\n" | b"\r\n") || head.ends_with(b"\n\n") || head.ends_with(b"\n\r\n");
    if !complete {
        if !block.ends_with(b"\n") {
            block.push(b'\n');
        }
        block.push(b'\n');
    }
    block
}
