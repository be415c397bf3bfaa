//! The immutable runtime view of the configuration.

use std::path::PathBuf;

use crate::routing::alias::AliasTable;
use crate::routing::handlers::HandlerTable;
use crate::routing::mapper::{normalize_url_path, to_fs_fragment};
use crate::routing::resolver::{ResolveError, Resolver};

/// Everything request handling reads, built once at startup and shared via `Arc`.
#[derive(Debug, Clone)]
pub struct Site {
    /// Absolute, canonical document root.
    pub document_root: PathBuf,
    pub aliases: AliasTable,
    pub handlers: HandlerTable,
    pub directory_index: Vec<String>,
    pub default_handler: String,
    pub directory_listing: bool,
    /// Environment variable names passed through to handlers.
    pub inherit_env: Vec<String>,
}

impl Site {
    /// A site rooted at `document_root` with the default index and handler names.
    pub fn new(document_root: impl Into<PathBuf>) -> Self {
        Self {
            document_root: document_root.into(),
            aliases: AliasTable::default(),
            handlers: HandlerTable::default(),
            directory_index: vec!["index.html".to_string()],
            default_handler: "index.cgi".to_string(),
            directory_listing: false,
            inherit_env: Vec::new(),
        }
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self)
    }

    /// Map a decoded URL path to its candidate filesystem path:
    /// normalize, apply aliases, then join the fragment to the document root.
    pub fn map_url_path(&self, url_path: &str) -> PathBuf {
        let rewritten = self.aliases.rewrite(&normalize_url_path(url_path));
        self.document_root.join(to_fs_fragment(&rewritten))
    }

    /// Map and resolve a decoded URL path.
    pub fn locate(&self, url_path: &str) -> Result<PathBuf, ResolveError> {
        let candidate = self.map_url_path(url_path);
        self.resolver().resolve(&candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::alias::Alias;

    #[test]
    fn test_map_url_path_applies_alias() {
        let mut site = Site::new("/site");
        site.aliases = AliasTable::new(vec![Alias::new("/static", "/assets")]);
        assert_eq!(site.map_url_path("/static/img.png"), PathBuf::from("/site/assets/img.png"));
        assert_eq!(site.map_url_path("/"), PathBuf::from("/site"));
    }

    #[test]
    fn test_map_url_path_stays_under_root() {
        let site = Site::new("/site");
        for url in ["/../../etc/passwd", "/a/../../..", "//x/./y/"] {
            assert!(site.map_url_path(url).starts_with(&site.document_root), "{url} escaped");
        }
    }

    #[test]
    fn test_locate_alias_target() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir(root.join("assets")).unwrap();
        std::fs::write(root.join("assets/img.png"), b"png").unwrap();

        let mut site = Site::new(root.clone());
        site.aliases = AliasTable::new(vec![Alias::new("/static", "/assets")]);
        assert_eq!(site.locate("/static/img.png").unwrap(), root.join("assets/img.png"));
    }
}
