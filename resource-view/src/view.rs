//! Resource view definitions
//!
//! A [`ResourceView`] describes how one resource type is rendered: its path
//! template, the keys read off each item, the type tag stamped into `$type`,
//! which keys may appear in the output and three optional maps of computed
//! keys. Views are built once at startup and shared across requests.
//!
//! # Example
//!
//! ```rust
//! use resource_view::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> resource_view::error::Result<()> {
//! let view = ResourceView::builder("/widgets")
//!     .keys(["$id", "$type", "name"])
//!     .type_tag("Widget")
//!     .build();
//!
//! let req = RequestContext::builder("https://api.example.com").build();
//! let body = view
//!     .element(req, ResponseContext::new(), None)
//!     .render(json!({ "$id": "11111111-1111-1111-1111-111111111111", "name": "Bolt" }))
//!     .await?;
//!
//! assert_eq!(
//!     serde_json::Value::Object(body),
//!     json!({ "$id": "11111111-1111-1111-1111-111111111111", "$type": "Widget", "name": "Bolt" })
//! );
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::collection::CollectionBuilder;
use crate::compute::{Computation, ComputeKeys};
use crate::context::{RequestContext, ResponseContext};
use crate::element::ElementBuilder;
use crate::ids::DEFAULT_KEYS;
use crate::options::{resolve_keys, unique_keys, RenderKind, ViewOptions, ViewOverrides};
use crate::path::PathTemplate;
use crate::registry::ViewRegistry;

/// Rendering configuration for one resource type
#[derive(Debug)]
pub struct ResourceView {
    options: ViewOptions,
    type_tag: Option<String>,
    compute_keys: Option<ComputeKeys>,
    element_keys: Option<ComputeKeys>,
    collection_keys: Option<ComputeKeys>,
}

impl ResourceView {
    /// Start building a view for the given path template
    pub fn builder(path: impl Into<PathTemplate>) -> ResourceViewBuilder {
        ResourceViewBuilder {
            options: ViewOptions {
                path: path.into(),
                ..ViewOptions::default()
            },
            keys: None,
            type_tag: None,
            compute_keys: ComputeKeys::new(),
            element_keys: ComputeKeys::new(),
            collection_keys: ComputeKeys::new(),
        }
    }

    /// Path template of the resource
    pub fn path(&self) -> &PathTemplate {
        &self.options.path
    }

    /// Keys read directly off each item
    pub fn keys(&self) -> &[String] {
        &self.options.keys
    }

    /// Value stamped into `$type` when an item has none
    pub fn type_tag(&self) -> Option<&str> {
        self.type_tag.as_deref()
    }

    /// Output whitelist, already widened by computed keys and stripped of secrets
    pub fn accepted_keys(&self) -> &[String] {
        self.options.accepted()
    }

    /// Output blacklist
    pub fn secret_keys(&self) -> &[String] {
        &self.options.secret_keys
    }

    /// Base options every render call starts from
    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    /// Computations run on elements and collections
    pub fn compute_keys(&self) -> Option<&ComputeKeys> {
        self.compute_keys.as_ref()
    }

    /// Computations run on elements only, after `compute_keys`
    pub fn element_keys(&self) -> Option<&ComputeKeys> {
        self.element_keys.as_ref()
    }

    /// Computations run on collection bodies only, after `compute_keys`
    pub fn collection_keys(&self) -> Option<&ComputeKeys> {
        self.collection_keys.as_ref()
    }

    /// Create a builder rendering single items of this view
    pub fn element(
        &self,
        req: RequestContext,
        res: ResponseContext,
        overrides: Option<ViewOverrides>,
    ) -> ElementBuilder<'_> {
        let mut options = self.options.merge(overrides.unwrap_or_default());
        resolve_keys(
            &mut options,
            RenderKind::Element,
            &[self.compute_keys(), self.element_keys()],
        );
        ElementBuilder::new(self, req, res, options)
    }

    /// Create a builder rendering lists of items of this view
    pub fn collection(
        &self,
        req: RequestContext,
        res: ResponseContext,
        overrides: Option<ViewOverrides>,
    ) -> CollectionBuilder<'_> {
        let mut options = self.options.merge(overrides.unwrap_or_default());
        resolve_keys(
            &mut options,
            RenderKind::Collection,
            &[self.compute_keys(), self.element_keys(), self.collection_keys()],
        );
        CollectionBuilder::new(self, req, res, options)
    }

    /// Registry used for nested views under the given options
    pub(crate) fn registry_for(options: &ViewOptions) -> ViewRegistry {
        options
            .registry
            .clone()
            .unwrap_or_else(|| ViewRegistry::global().clone())
    }
}

/// Builder for [`ResourceView`]
pub struct ResourceViewBuilder {
    options: ViewOptions,
    keys: Option<Vec<String>>,
    type_tag: Option<String>,
    compute_keys: ComputeKeys,
    element_keys: ComputeKeys,
    collection_keys: ComputeKeys,
}

impl ResourceViewBuilder {
    /// Keys read directly off each item (default `$id`, `$type`, `$ref`)
    #[must_use]
    pub fn keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Type discriminator stamped into `$type` when an item has none
    #[must_use]
    pub fn type_tag(mut self, tag: impl Into<String>) -> Self {
        self.type_tag = Some(tag.into());
        self
    }

    /// Add a computation run on both elements and collections
    #[must_use]
    pub fn compute_key(mut self, key: impl Into<String>, f: Arc<dyn Computation>) -> Self {
        self.compute_keys.insert(key, f);
        self
    }

    /// Add a computation run on elements only
    #[must_use]
    pub fn element_key(mut self, key: impl Into<String>, f: Arc<dyn Computation>) -> Self {
        self.element_keys.insert(key, f);
        self
    }

    /// Add a computation run on collection bodies only
    #[must_use]
    pub fn collection_key(mut self, key: impl Into<String>, f: Arc<dyn Computation>) -> Self {
        self.collection_keys.insert(key, f);
        self
    }

    /// Explicit output whitelist (defaults to the declared keys)
    #[must_use]
    pub fn accepted_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.accepted_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Keys never emitted, even when accepted or computed
    #[must_use]
    pub fn secret_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.secret_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Path template for element self-references
    #[must_use]
    pub fn element_path(mut self, path: impl Into<PathTemplate>) -> Self {
        self.options.element_path = Some(path.into());
        self
    }

    /// Default path parameters
    #[must_use]
    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.options.params = params;
        self
    }

    /// Default collection limit
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Registry for nested views (defaults to the global registry)
    #[must_use]
    pub fn registry(mut self, registry: ViewRegistry) -> Self {
        self.options.registry = Some(registry);
        self
    }

    /// Finish the view
    ///
    /// The accepted keys are widened by every computed key name and then
    /// stripped of secret keys.
    pub fn build(self) -> Arc<ResourceView> {
        let non_empty = |keys: ComputeKeys| (!keys.is_empty()).then_some(keys);

        let mut options = self.options;
        options.keys = self
            .keys
            .unwrap_or_else(|| DEFAULT_KEYS.iter().map(|k| k.to_string()).collect());

        let view_keys = [&self.compute_keys, &self.element_keys, &self.collection_keys];
        let secret = unique_keys(options.secret_keys.drain(..));
        let accepted = options
            .accepted_keys
            .take()
            .unwrap_or_else(|| options.keys.clone());
        let computed = view_keys
            .iter()
            .flat_map(|map| map.names().map(str::to_string))
            .collect::<Vec<_>>();

        options.accepted_keys = Some(
            unique_keys(accepted.into_iter().chain(computed))
                .into_iter()
                .filter(|key| !secret.contains(key))
                .collect(),
        );
        options.secret_keys = secret;

        Arc::new(ResourceView {
            options,
            type_tag: self.type_tag,
            compute_keys: non_empty(self.compute_keys),
            element_keys: non_empty(self.element_keys),
            collection_keys: non_empty(self.collection_keys),
        })
    }
}
