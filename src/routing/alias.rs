//! URL alias rewriting.
//!
//! # Responsibilities
//! - Match the request path against configured alias prefixes
//! - Substitute the matched prefix with the alias target
//!
//! # Design Decisions
//! - Prefix matching is a plain, case-sensitive string prefix
//! - Longest source wins; ties cannot both match one path
//! - A single rewrite per request (aliases do not chain)

use crate::config::AliasConfig;
use crate::routing::mapper::join_url_path;

/// One configured prefix substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    source: String,
    target: String,
}

impl Alias {
    /// Create a new alias.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Returns true if `path` starts with this alias' source prefix.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.source)
    }

    fn apply(&self, path: &str) -> String {
        join_url_path(&self.target, &path[self.source.len()..])
    }
}

/// Alias table, ordered longest source first.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: Vec<Alias>,
}

impl AliasTable {
    pub fn new(mut aliases: Vec<Alias>) -> Self {
        aliases.sort_by(|a, b| b.source.len().cmp(&a.source.len()));
        Self { aliases }
    }

    pub fn from_config(configs: &[AliasConfig]) -> Self {
        Self::new(
            configs
                .iter()
                .map(|alias| Alias::new(alias.source.clone(), alias.target.clone()))
                .collect(),
        )
    }

    /// Rewrite a normalized URL path. Unmatched paths are returned unchanged.
    pub fn rewrite(&self, path: &str) -> String {
        match self.aliases.iter().find(|alias| alias.matches(path)) {
            Some(alias) => {
                let rewritten = alias.apply(path);
                tracing::debug!(from = %path, to = %rewritten, "Alias applied");
                rewritten
            }
            None => path.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_substitution() {
        let table = AliasTable::new(vec![Alias::new("/static", "/assets")]);
        assert_eq!(table.rewrite("/static/img.png"), "/assets/img.png");
        assert_eq!(table.rewrite("/static"), "/assets");
        assert_eq!(table.rewrite("/other/img.png"), "/other/img.png");
    }

    #[test]
    fn test_string_prefix_semantics() {
        let table = AliasTable::new(vec![Alias::new("/static", "/assets")]);
        assert_eq!(table.rewrite("/staticfiles/a"), "/assets/files/a");
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = AliasTable::new(vec![
            Alias::new("/a", "/short"),
            Alias::new("/a/b", "/long"),
        ]);
        assert_eq!(table.rewrite("/a/b/c"), "/long/c");
        assert_eq!(table.rewrite("/a/x"), "/short/x");
    }

    #[test]
    fn test_result_is_normalized() {
        let table = AliasTable::new(vec![Alias::new("/files/", "share/")]);
        assert_eq!(table.rewrite("/files/doc.txt"), "/share/doc.txt");
    }

    #[test]
    fn test_idempotent_once_nothing_matches() {
        let table = AliasTable::new(vec![
            Alias::new("/static", "/assets"),
            Alias::new("/old", "/new"),
        ]);
        for path in ["/static/x", "/old", "/plain/file", "/"] {
            let once = table.rewrite(path);
            if !table.aliases.iter().any(|a| a.matches(&once)) {
                assert_eq!(table.rewrite(&once), once);
            }
        }
    }
}
