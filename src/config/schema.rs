//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the CGI server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Directory all requests are confined to.
    pub document_root: String,

    /// Names of variables copied from the server environment into handlers.
    pub inherit_env: Vec<String>,

    /// List directories that have no index file.
    pub directory_listing: bool,

    /// Index file names, tried in order.
    pub directory_index: Vec<String>,

    /// File name of the fallback handler searched in ancestor directories.
    pub default_handler: String,

    /// URL prefix substitutions applied before filesystem mapping.
    pub aliases: Vec<AliasConfig>,

    /// File extension to handler executable mapping.
    pub handlers: Vec<HandlerConfig>,

    /// Request limits.
    pub limits: LimitsConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            document_root: ".".to_string(),
            inherit_env: Vec::new(),
            directory_listing: false,
            directory_index: vec!["index.html".to_string()],
            default_handler: "index.cgi".to_string(),
            aliases: Vec::new(),
            handlers: Vec::new(),
            limits: LimitsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A URL prefix rewrite.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AliasConfig {
    /// URL path prefix to match (e.g., "/static").
    pub source: String,

    /// Replacement prefix (e.g., "/assets").
    pub target: String,
}

/// A handler binding for one file extension.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HandlerConfig {
    /// Extension including the leading dot (e.g., ".cgi").
    pub file_ext: String,

    /// Executable name or path; bare names are searched on `PATH`.
    pub handler: String,
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes passed to a handler.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
