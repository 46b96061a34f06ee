//! Global project-name registry.
//!
//! Registration and lookup are separate phases: a [`RegistryBuilder`]
//! collects names from every project, and [`RegistryBuilder::build`] turns it
//! into an immutable [`NameRegistry`]. Lookups are only possible on the
//! frozen registry, so every classification sees the complete set of names.

use std::collections::{HashMap, HashSet};

use crate::report::Warning;

/// Map a project name to a CMake-safe identifier.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`. An empty name maps
/// to `_`.
pub fn sanitize(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

/// Case-insensitive registry key of a name.
pub fn registry_key(name: &str) -> String {
    sanitize(name).to_ascii_lowercase()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Registration phase.
///
/// Register every project's authoritative name first, then its aliases:
/// when two projects claim the same key the first registration wins, so
/// registering in that order gives in-document names precedence over
/// solution-declared ones.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: HashMap<String, String>,
    claimed: HashSet<String>,
    collisions: Vec<Warning>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a target identifier.
    ///
    /// Identifiers must be unique case-insensitively. When `identifier` is
    /// already taken, `_2`, `_3`, ... is appended until it is not. Returns
    /// the identifier actually reserved.
    pub fn claim(&mut self, identifier: &str) -> String {
        let mut candidate = identifier.to_string();
        let mut suffix = 2;
        while !self.claimed.insert(registry_key(&candidate)) {
            candidate = format!("{identifier}_{suffix}");
            suffix += 1;
        }
        candidate
    }

    /// Register `name` as an alias of the target `identifier`.
    ///
    /// Returns `false` when the key was already taken by another target.
    pub fn register(&mut self, identifier: &str, name: &str) -> bool {
        let key = registry_key(name);
        match self.entries.get(&key) {
            Some(existing) if existing == identifier => true,
            Some(existing) => {
                tracing::debug!("registry key '{key}' already maps to '{existing}'");
                self.collisions.push(Warning::NameCollision {
                    key,
                    kept: existing.clone(),
                    ignored: identifier.to_string(),
                });
                false
            }
            None => {
                self.entries.insert(key, identifier.to_string());
                true
            }
        }
    }

    /// Freeze the registry. Collisions found while registering are
    /// returned alongside it.
    pub fn build(self) -> (NameRegistry, Vec<Warning>) {
        (
            NameRegistry {
                entries: self.entries,
            },
            self.collisions,
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Frozen registry
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only lookup from any registered name to a target identifier.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    entries: HashMap<String, String>,
}

impl NameRegistry {
    /// Resolve a name (case-insensitively, after sanitizing) to the
    /// identifier of the target that owns it.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.entries.get(&registry_key(name)).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&registry_key(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_non_identifier_chars() {
        assert_eq!(sanitize("Net-Lib"), "Net_Lib");
        assert_eq!(sanitize("My Project.Core"), "My_Project_Core");
        assert_eq!(sanitize("already_ok42"), "already_ok42");
        assert_eq!(sanitize(""), "_");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for name in ["a b-c", "Σ-lib", "x.y.z", "_"] {
            let once = sanitize(name);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut builder = RegistryBuilder::new();
        builder.register("MyLib", "MyLib");
        let (registry, collisions) = builder.build();

        assert!(collisions.is_empty());
        assert_eq!(registry.resolve("mylib"), Some("MyLib"));
        assert_eq!(registry.resolve("MYLIB"), Some("MyLib"));
        assert_eq!(registry.resolve("other"), None);
    }

    #[test]
    fn aliases_resolve_to_identifier() {
        let mut builder = RegistryBuilder::new();
        builder.register("Net_Lib", "Net-Lib");
        builder.register("Net_Lib", "Net");
        let (registry, _) = builder.build();

        assert_eq!(registry.resolve("net"), Some("Net_Lib"));
        assert_eq!(registry.resolve("Net Lib"), Some("Net_Lib"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn first_registration_wins() {
        let mut builder = RegistryBuilder::new();
        assert!(builder.register("Core", "Core"));
        assert!(builder.register("Core", "core"));
        assert!(!builder.register("Legacy", "CORE"));
        let (registry, collisions) = builder.build();

        assert_eq!(registry.resolve("core"), Some("Core"));
        assert_eq!(
            collisions,
            [Warning::NameCollision {
                key: "core".to_string(),
                kept: "Core".to_string(),
                ignored: "Legacy".to_string(),
            }]
        );
    }

    #[test]
    fn claimed_identifiers_are_unique() {
        let mut builder = RegistryBuilder::new();
        assert_eq!(builder.claim("Net_Lib"), "Net_Lib");
        assert_eq!(builder.claim("net_lib"), "net_lib_2");
        assert_eq!(builder.claim("Net_Lib"), "Net_Lib_3");
        assert_eq!(builder.claim("Core"), "Core");
    }

    #[test]
    fn empty_registry() {
        let (registry, _) = RegistryBuilder::new().build();
        assert!(registry.is_empty());
        assert!(!registry.contains("anything"));
    }

    #[test]
    fn frozen_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NameRegistry>();
    }
}
