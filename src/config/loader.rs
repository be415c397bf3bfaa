//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// File name searched for in the standard configuration directories.
pub const CONFIG_FILE_NAME: &str = "cgi-server.toml";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no cgi-server.toml found in /etc/cgi-server, ~/.cgi-server or the working directory")]
    NotFound,

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Candidate configuration files, in lookup order.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![Path::new("/etc/cgi-server").join(CONFIG_FILE_NAME)];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(Path::new(&home).join(".cgi-server").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

/// Pick the configuration file: an explicit path wins, otherwise the first
/// existing file of [`config_search_paths`].
pub fn find_config(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    config_search_paths()
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or(ConfigError::NotFound)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}
