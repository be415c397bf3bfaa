//! Filesystem resolution of a request path.
//!
//! # Responsibilities
//! - Decide which existing file or directory answers a candidate path
//! - Probe directory index files
//! - Fall back to a handler named by a parent directory's extension
//! - Fall back to the nearest ancestor default handler
//!
//! # Design Decisions
//! - Stateless between requests: nothing is cached
//! - Parents are clamped to the document root, resolution never climbs above it
//! - The ancestor climb is a loop; index probing and handler-parent checks
//!   recurse with a visited set so every walk terminates
//! - Any stat failure counts as "does not exist"

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::routing::site::Site;

/// Resolution failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no resource for {}", .0.display())]
    NotFound(PathBuf),
}

/// Resolves candidate paths against one [`Site`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    site: &'a Site,
}

impl<'a> Resolver<'a> {
    pub fn new(site: &'a Site) -> Self {
        Self { site }
    }

    /// Resolve `path` with CGI fallback enabled.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf, ResolveError> {
        self.resolve_with(path, true)
    }

    /// Resolve `path`, allowing handler fallback only if `cgi_fallback` is set.
    pub fn resolve_with(&self, path: &Path, cgi_fallback: bool) -> Result<PathBuf, ResolveError> {
        let mut visited = HashSet::new();
        let found = self.find(path.to_path_buf(), cgi_fallback, &mut visited);
        tracing::debug!(
            path = %path.display(),
            resolved = ?found.as_ref().map(|p| p.display().to_string()),
            "Resolved path"
        );
        found.ok_or_else(|| ResolveError::NotFound(path.to_path_buf()))
    }

    fn find(
        &self,
        mut path: PathBuf,
        cgi_fallback: bool,
        visited: &mut HashSet<(PathBuf, bool)>,
    ) -> Option<PathBuf> {
        loop {
            if !visited.insert((path.clone(), cgi_fallback)) {
                tracing::trace!(path = %path.display(), "Resolution cycle");
                return None;
            }

            match fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => return self.find_index(path, visited),
                Ok(_) => return Some(path),
                Err(_) if !cgi_fallback => return None,
                Err(_) => {}
            }

            let parent = self.parent_within_root(&path);
            if self.handler_directory(&parent) {
                // The parent is the script; the rest of the path is path info.
                return self.find(parent, false, visited);
            }

            let candidate = self
                .parent_within_root(&parent)
                .join(&self.site.default_handler);
            if candidate == path {
                return None;
            }
            tracing::trace!(
                missing = %path.display(),
                candidate = %candidate.display(),
                "Trying default handler"
            );
            path = candidate;
        }
    }

    fn find_index(&self, dir: PathBuf, visited: &mut HashSet<(PathBuf, bool)>) -> Option<PathBuf> {
        let cgi_fallback = !self.site.directory_listing;
        for index in &self.site.directory_index {
            if let Some(found) = self.find(dir.join(index), cgi_fallback, visited) {
                return Some(found);
            }
        }
        // No index: a listing, if enabled.
        self.site.directory_listing.then_some(dir)
    }

    /// Parent of `path`, or the document root if the parent lies outside it.
    fn parent_within_root(&self, path: &Path) -> PathBuf {
        let root = &self.site.document_root;
        match path.parent() {
            Some(parent) if parent.starts_with(root) => parent.to_path_buf(),
            _ => root.clone(),
        }
    }

    /// The root never carries an extension, even if its own name has one.
    fn handler_directory(&self, dir: &Path) -> bool {
        dir != self.site.document_root && self.site.handlers.for_path(dir).is_some()
    }
}
