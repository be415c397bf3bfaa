//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated [`ServerConfig`] into the immutable [`Site`]
//! - Locate handler executables once, before traffic arrives
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The document root is canonical, so resolution never sees symlinks
//!   or relative components above it

use std::path::PathBuf;

use crate::config::ServerConfig;
use crate::routing::alias::AliasTable;
use crate::routing::handlers::HandlerError;
use crate::routing::{HandlerTable, Site};

/// Errors that prevent the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("document root {}: {source}", path.display())]
    DocumentRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Build the site described by `config`.
pub fn build_site(config: &ServerConfig) -> Result<Site, StartupError> {
    let configured = PathBuf::from(&config.document_root);
    let document_root = configured
        .canonicalize()
        .map_err(|source| StartupError::DocumentRoot {
            path: configured.clone(),
            source,
        })?;
    if !document_root.is_dir() {
        return Err(StartupError::NotADirectory(document_root));
    }
    tracing::info!(document_root = %document_root.display(), "Serving document root");

    let handlers = HandlerTable::prefetch(&config.handlers)?;
    let aliases = AliasTable::from_config(&config.aliases);
    tracing::debug!(
        aliases = config.aliases.len(),
        handlers = config.handlers.len(),
        "Site built"
    );

    Ok(Site {
        document_root,
        aliases,
        handlers,
        directory_index: config.directory_index.clone(),
        default_handler: config.default_handler.clone(),
        directory_listing: config.directory_listing,
        inherit_env: config.inherit_env.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AliasConfig, HandlerConfig};

    fn config_for(root: &std::path::Path) -> ServerConfig {
        ServerConfig {
            document_root: root.display().to_string(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_document_root_is_canonical() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("www")).unwrap();
        let config = config_for(&dir.path().join("www/../www"));

        let site = build_site(&config).unwrap();
        assert_eq!(site.document_root, dir.path().join("www").canonicalize().unwrap());
        assert_eq!(site.directory_index, vec!["index.html".to_string()]);
        assert_eq!(site.default_handler, "index.cgi");
    }

    #[test]
    fn test_missing_document_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_site(&config_for(&dir.path().join("nope"))).unwrap_err();
        assert!(matches!(err, StartupError::DocumentRoot { .. }));
    }

    #[test]
    fn test_document_root_must_be_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, "").unwrap();

        let err = build_site(&config_for(&file)).unwrap_err();
        assert!(matches!(err, StartupError::NotADirectory(_)));
    }

    #[test]
    fn test_unknown_handler_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path());
        config.handlers.push(HandlerConfig {
            file_ext: ".php".into(),
            handler: "definitely-not-a-real-handler-binary".into(),
        });

        let err = build_site(&config).unwrap_err();
        match err {
            StartupError::Handler(e) => assert_eq!(e.file_ext, ".php"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_handlers_and_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path());
        config.handlers.push(HandlerConfig {
            file_ext: ".sh".into(),
            handler: "/bin/sh".into(),
        });
        config.aliases.push(AliasConfig {
            source: "/static".into(),
            target: "/assets".into(),
        });

        let site = build_site(&config).unwrap();
        assert_eq!(site.handlers.get(".sh"), Some(std::path::Path::new("/bin/sh")));
        assert_eq!(site.aliases.rewrite("/static/a.png"), "/assets/a.png");
    }
}
