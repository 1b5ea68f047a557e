//! Registry mapping type identifiers to providers.
//!
//! A registry is assembled once through [`RegistryBuilder`] and then frozen;
//! the built [`TypeRegistry`] is immutable and can be shared freely between
//! document workers.

use crate::provider::TypeProvider;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Read-only lookup from short name, alias or canonical URI to a provider.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    by_id: HashMap<String, Arc<dyn TypeProvider>>,
}

impl TypeRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Resolve a short name, alias or URI.
    pub fn resolve(&self, id: &str) -> Option<Arc<dyn TypeProvider>> {
        self.by_id.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Canonical URI for any registered identifier.
    pub fn canonical_uri(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(|provider| provider.uri())
    }

    /// Canonical URIs of every registered provider.
    pub fn uris(&self) -> BTreeSet<&str> {
        self.by_id.values().map(|provider| provider.uri()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.by_id.keys().collect();
        ids.sort();
        f.debug_struct("TypeRegistry").field("ids", &ids).finish()
    }
}

/// Populates a [`TypeRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    by_id: HashMap<String, Arc<dyn TypeProvider>>,
    aliases: Vec<(String, String)>,
}

impl RegistryBuilder {
    /// Register a provider under its short name and canonical URI.
    pub fn register(mut self, provider: impl TypeProvider + 'static) -> Self {
        let provider: Arc<dyn TypeProvider> = Arc::new(provider);
        self.by_id.insert(provider.name().to_string(), provider.clone());
        self.by_id.insert(provider.uri().to_string(), provider);
        self
    }

    /// Register an extra short name for an already known identifier.
    /// Aliases are resolved at build time, so order does not matter.
    pub fn alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), target.into()));
        self
    }

    pub fn build(mut self) -> TypeRegistry {
        for (alias, target) in std::mem::take(&mut self.aliases) {
            if let Some(provider) = self.by_id.get(&target).cloned() {
                self.by_id.insert(alias, provider);
            }
        }
        TypeRegistry { by_id: self.by_id }
    }
}
