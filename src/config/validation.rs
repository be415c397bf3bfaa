//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value shapes (extensions, file names, addresses, levels)
//! - Detect duplicate aliases and handler bindings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Filesystem checks (document root, handler lookup) belong to startup, not here

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`")]
    BindAddress(String),

    #[error("document root must not be empty")]
    EmptyDocumentRoot,

    #[error("handler extension `{0}` must start with '.' and contain no '/'")]
    HandlerExtension(String),

    #[error("handler for extension `{0}` is empty")]
    EmptyHandler(String),

    #[error("extension `{0}` is bound to more than one handler")]
    DuplicateExtension(String),

    #[error("alias source `{0}` must start with '/'")]
    AliasSource(String),

    #[error("alias source `{0}` is declared more than once")]
    DuplicateAlias(String),

    #[error("directory index entry `{0}` must be a plain file name")]
    DirectoryIndex(String),

    #[error("default handler `{0}` must be a plain file name")]
    DefaultHandler(String),

    #[error("unknown log level `{0}`")]
    LogLevel(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.document_root.is_empty() {
        errors.push(ValidationError::EmptyDocumentRoot);
    }

    let mut extensions = HashSet::new();
    for handler in &config.handlers {
        if !handler.file_ext.starts_with('.') || handler.file_ext.contains('/') {
            errors.push(ValidationError::HandlerExtension(handler.file_ext.clone()));
        }
        if handler.handler.trim().is_empty() {
            errors.push(ValidationError::EmptyHandler(handler.file_ext.clone()));
        }
        if !extensions.insert(handler.file_ext.as_str()) {
            errors.push(ValidationError::DuplicateExtension(handler.file_ext.clone()));
        }
    }

    let mut sources = HashSet::new();
    for alias in &config.aliases {
        if !alias.source.starts_with('/') {
            errors.push(ValidationError::AliasSource(alias.source.clone()));
        }
        if !sources.insert(alias.source.as_str()) {
            errors.push(ValidationError::DuplicateAlias(alias.source.clone()));
        }
    }

    for index in &config.directory_index {
        if !is_plain_file_name(index) {
            errors.push(ValidationError::DirectoryIndex(index.clone()));
        }
    }

    if !is_plain_file_name(&config.default_handler) {
        errors.push(ValidationError::DefaultHandler(config.default_handler.clone()));
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::LogLevel(config.logging.level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
