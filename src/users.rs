//! Author lookup
//!
//! Queue entries only carry the author's account id. Rendering asks a
//! `UserResolver` for a display name and falls back to the raw id.

use std::collections::{HashMap, HashSet};

pub trait UserResolver {
    fn display_name(&self, aaid: &str) -> Option<String>;
}

/// Display names from config plus whatever has been fetched from the backend
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    names: HashMap<String, String>,
    requested: HashSet<String>,
}

impl UserDirectory {
    pub fn new(configured: &HashMap<String, String>) -> Self {
        Self {
            names: configured.clone(),
            requested: HashSet::new(),
        }
    }

    pub fn insert(&mut self, aaid: impl Into<String>, name: impl Into<String>) {
        self.names.insert(aaid.into(), name.into());
    }

    /// Returns true the first time an unknown id is seen, so the caller fetches it once
    pub fn should_fetch(&mut self, aaid: &str) -> bool {
        if self.names.contains_key(aaid) {
            return false;
        }
        self.requested.insert(aaid.to_string())
    }
}

impl UserResolver for UserDirectory {
    fn display_name(&self, aaid: &str) -> Option<String> {
        self.names.get(aaid).cloned()
    }
}

/// Name to show for an author, falling back to the id itself
pub fn author_name(resolver: &dyn UserResolver, aaid: &str) -> String {
    resolver
        .display_name(aaid)
        .unwrap_or_else(|| aaid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_names_resolve() {
        let mut configured = HashMap::new();
        configured.insert("aaid-1".to_string(), "Ada Lovelace".to_string());
        let directory = UserDirectory::new(&configured);

        assert_eq!(author_name(&directory, "aaid-1"), "Ada Lovelace");
        assert_eq!(author_name(&directory, "aaid-2"), "aaid-2");
    }

    #[test]
    fn test_unknown_ids_are_fetched_once() {
        let mut directory = UserDirectory::default();
        assert!(directory.should_fetch("aaid-9"));
        assert!(!directory.should_fetch("aaid-9"));

        directory.insert("aaid-3", "Grace Hopper");
        assert!(!directory.should_fetch("aaid-3"));
        assert_eq!(directory.display_name("aaid-3").as_deref(), Some("Grace Hopper"));
    }
}
