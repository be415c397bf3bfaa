//! URL path normalization and filesystem mapping.
//!
//! # Responsibilities
//! - Percent-decode the raw request path
//! - Clean URL paths ("." and ".." collapsed, always rooted)
//! - Convert a clean URL path into a fragment relative to the document root
//!
//! # Design Decisions
//! - ".." never climbs above the first segment, so a fragment joined to the
//!   document root cannot escape it lexically
//! - Only normal components are kept when building the fragment; roots,
//!   prefixes and separators embedded in a segment are dropped

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use std::string::FromUtf8Error;

/// Percent-decode a raw request path.
pub fn decode_url_path(raw: &str) -> Result<Cow<'_, str>, FromUtf8Error> {
    urlencoding::decode(raw)
}

/// Clean a URL path: ensure a leading "/", drop empty and "." segments,
/// and apply ".." lexically. The trailing "/" is not kept.
pub fn normalize_url_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Join two URL paths and clean the result.
pub fn join_url_path(base: &str, rest: &str) -> String {
    normalize_url_path(&format!("{base}/{rest}"))
}

/// Map a URL path onto a native path fragment relative to the document root.
pub fn to_fs_fragment(url_path: &str) -> PathBuf {
    let mut fragment = PathBuf::new();
    for segment in url_path.split('/') {
        for component in Path::new(segment).components() {
            match component {
                Component::Normal(name) => fragment.push(name),
                Component::ParentDir => {
                    fragment.pop();
                }
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }
    }
    fragment
}
