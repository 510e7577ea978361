//! Registry of views used to render nested resources
//!
//! When an item field holds an identity (or an object carrying one) and a view
//! is registered under the field's lower-cased name, the field is rendered as
//! a nested element of that view instead of being copied verbatim.
//!
//! The global registry is meant to be populated while the application wires
//! up its resource types and only read afterwards. Tests and multi-tenant
//! setups can pass their own [`ViewRegistry`] through the view options.
//!
//! # Example
//!
//! ```rust
//! use resource_view::registry::ViewRegistry;
//! use resource_view::view::ResourceView;
//!
//! let registry = ViewRegistry::new();
//! registry.register("Owner", ResourceView::builder("/users").type_tag("User").build());
//!
//! assert!(registry.contains("owner"));
//! assert!(registry.get("OWNER").is_some());
//! ```

use std::fmt;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use crate::view::ResourceView;

/// Process-wide default registry
static GLOBAL_REGISTRY: LazyLock<ViewRegistry> = LazyLock::new(ViewRegistry::new);

/// Shared, cheaply clonable mapping from lower-cased name to view
#[derive(Clone, Default)]
pub struct ViewRegistry {
    views: Arc<DashMap<String, Arc<ResourceView>>>,
}

impl fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewRegistry")
            .field("views", &self.names())
            .finish()
    }
}

impl ViewRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default registry
    pub fn global() -> &'static ViewRegistry {
        &GLOBAL_REGISTRY
    }

    /// Register a view under a name, replacing any previous view of that name
    pub fn register(&self, name: impl AsRef<str>, view: Arc<ResourceView>) {
        let name = name.as_ref().to_lowercase();
        tracing::debug!(view = %name, "Registering view");
        self.views.insert(name, view);
    }

    /// Look up a view by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<Arc<ResourceView>> {
        self.views
            .get(&name.to_lowercase())
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Check whether a view is registered under a name (case-insensitive)
    pub fn contains(&self, name: &str) -> bool {
        self.views.contains_key(&name.to_lowercase())
    }

    /// Remove a view, returning it if it was registered
    pub fn remove(&self, name: &str) -> Option<Arc<ResourceView>> {
        self.views.remove(&name.to_lowercase()).map(|(_, view)| view)
    }

    /// Number of registered views
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Check whether no views are registered
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.views.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

/// Register a view in the global registry
pub fn register_view(name: impl AsRef<str>, view: Arc<ResourceView>) {
    ViewRegistry::global().register(name, view);
}
