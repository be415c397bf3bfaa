//! File extension to handler executable table.
//!
//! Handler names are located once at startup, the way a shell would find
//! them: names containing a '/' are taken as paths, bare names are searched
//! on `PATH`. Every entry of a built table is an absolute path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::HandlerConfig;

/// Failure to locate a handler executable.
#[derive(Debug, thiserror::Error)]
#[error("cannot locate executable `{name}`: {source}")]
pub struct LookupError {
    pub name: String,
    #[source]
    pub source: which::Error,
}

/// A handler that failed to resolve during prefetch.
#[derive(Debug, thiserror::Error)]
#[error("handler for extension `{file_ext}`: {source}")]
pub struct HandlerError {
    pub file_ext: String,
    #[source]
    pub source: LookupError,
}

/// Extension (with leading '.') to absolute executable path.
#[derive(Debug, Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, PathBuf>,
}

impl HandlerTable {
    /// Locate every configured handler. The first failure aborts.
    pub fn prefetch(configs: &[HandlerConfig]) -> Result<Self, HandlerError> {
        let mut table = Self::default();
        for config in configs {
            let executable = lookup_executable(&config.handler).map_err(|source| HandlerError {
                file_ext: config.file_ext.clone(),
                source,
            })?;
            tracing::info!(
                handler = %executable.display(),
                file_ext = %config.file_ext,
                "Using handler for file extension"
            );
            table.insert(config.file_ext.clone(), executable);
        }
        Ok(table)
    }

    /// Bind an already resolved executable.
    pub fn insert(&mut self, file_ext: impl Into<String>, executable: impl Into<PathBuf>) {
        self.handlers.insert(file_ext.into(), executable.into());
    }

    pub fn get(&self, file_ext: &str) -> Option<&Path> {
        self.handlers.get(file_ext).map(PathBuf::as_path)
    }

    /// Handler bound to the extension of `path`'s last component.
    pub fn for_path(&self, path: &Path) -> Option<&Path> {
        file_extension(path).and_then(|ext| self.get(ext))
    }

}

/// Suffix of the last path component starting at its last '.', if any.
///
/// Unlike [`Path::extension`], a leading dot counts: `.cgi` has extension `.cgi`.
pub fn file_extension(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    name.rfind('.').map(|idx| &name[idx..])
}

/// Locate an executable by name or path.
pub fn lookup_executable(name: &str) -> Result<PathBuf, LookupError> {
    which::which(name).map_err(|source| LookupError {
        name: name.to_string(),
        source,
    })
}

/// Regular file the server may execute.
pub fn is_executable(path: &Path) -> bool {
    which::which(path).is_ok()
}
