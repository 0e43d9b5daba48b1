//! Extension registry.
//!
//! Extensions are loaded by the host. The core only looks them up by
//! capability and identifier. The registry is populated at startup and read
//! for the lifetime of the process; it is passed explicitly to the operations
//! that need it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// An entry of a list supplied by a [`ListProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListItem {
    pub id: String,
    pub label: String,
}

impl ListItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

impl fmt::Display for ListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Supplies the legal values of list-backed property types.
///
/// Implementations must be safe to call repeatedly for the same context and
/// return the same items each time.
pub trait ListProvider: Send + Sync {
    /// Stable identifier, stored in property types that use this provider.
    fn id(&self) -> &str;

    fn available_items(&self, context: Option<&str>) -> Vec<ListItem>;
}

/// What an extension can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ListProvider,
}

/// A loaded extension, as returned by [`ExtensionRegistry::lookup`].
#[derive(Clone)]
pub enum Extension {
    ListProvider(Arc<dyn ListProvider>),
}

impl Extension {
    pub fn capability(&self) -> Capability {
        match self {
            Extension::ListProvider(_) => Capability::ListProvider,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Extension::ListProvider(provider) => provider.id(),
        }
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("capability", &self.capability())
            .field("id", &self.id())
            .finish()
    }
}

/// Name-keyed lookup from (capability, identifier) to a loaded extension.
#[derive(Default)]
pub struct ExtensionRegistry {
    entries: RwLock<HashMap<(Capability, String), Extension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extension, replacing any previous one with the same
    /// capability and identifier.
    pub fn register(&self, extension: Extension) {
        let key = (extension.capability(), extension.id().to_string());
        debug!(capability = ?key.0, id = %key.1, "registering extension");
        // A poisoned lock only means a writer panicked; the map itself is intact.
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, extension);
    }

    pub fn register_list_provider(&self, provider: Arc<dyn ListProvider>) {
        self.register(Extension::ListProvider(provider));
    }

    pub fn lookup(&self, capability: Capability, id: &str) -> Option<Extension> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(&(capability, id.to_string())).cloned()
    }

    pub fn list_provider(&self, id: &str) -> Option<Arc<dyn ListProvider>> {
        match self.lookup(Capability::ListProvider, id)? {
            Extension::ListProvider(provider) => Some(provider),
        }
    }

    pub fn contains(&self, capability: Capability, id: &str) -> bool {
        self.lookup(capability, id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("len", &self.len())
            .finish()
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A provider returning a fixed list and counting how often it is asked.
    pub struct StaticListProvider {
        id: String,
        items: Vec<ListItem>,
        calls: AtomicUsize,
    }

    impl StaticListProvider {
        pub fn new(id: &str, items: &[(&str, &str)]) -> Self {
            Self {
                id: id.to_string(),
                items: items
                    .iter()
                    .map(|(id, label)| ListItem::new(*id, *label))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ListProvider for StaticListProvider {
        fn id(&self) -> &str {
            &self.id
        }

        fn available_items(&self, context: Option<&str>) -> Vec<ListItem> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match context {
                // A context narrows the list to items whose id starts with it.
                Some(prefix) => self
                    .items
                    .iter()
                    .filter(|item| item.id.starts_with(prefix))
                    .cloned()
                    .collect(),
                None => self.items.clone(),
            }
        }
    }
}
