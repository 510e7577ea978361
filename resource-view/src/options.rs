//! View options and per-call overrides
//!
//! A [`ResourceView`](crate::view::ResourceView) carries base [`ViewOptions`].
//! Every `element()` / `collection()` call may pass [`ViewOverrides`]; the two
//! are merged field by field with the override winning, producing a fresh
//! options value for that call. The view's own options are never mutated.

use serde_json::{Map, Value};

use crate::compute::ComputeKeys;
use crate::ids::ELEMENTS_KEY;
use crate::path::PathTemplate;
use crate::registry::ViewRegistry;

/// Options controlling one render call
#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    /// Path template of the resource (collection path for collection renders)
    pub path: PathTemplate,

    /// Path template used for element self-references instead of `path` + id
    pub element_path: Option<PathTemplate>,

    /// Keys read directly off each item, in order
    pub keys: Vec<String>,

    /// Output whitelist; `None` means "same as `keys`"
    pub accepted_keys: Option<Vec<String>>,

    /// Output blacklist, always wins over `accepted_keys`
    pub secret_keys: Vec<String>,

    /// Call-site computations run after the view's own computations
    pub compute_keys: Option<ComputeKeys>,

    /// Parameters substituted into path templates
    pub params: Map<String, Value>,

    /// Page size echoed into collection bodies
    pub limit: Option<u64>,

    /// Registry for nested views; `None` uses the global registry
    pub registry: Option<ViewRegistry>,
}

/// Per-call overrides merged over a view's base options
#[derive(Debug, Clone, Default)]
pub struct ViewOverrides {
    /// Replaces `path`
    pub path: Option<PathTemplate>,
    /// Replaces `element_path`
    pub element_path: Option<PathTemplate>,
    /// Replaces `keys`
    pub keys: Option<Vec<String>>,
    /// Replaces `accepted_keys`
    pub accepted_keys: Option<Vec<String>>,
    /// Replaces `secret_keys`
    pub secret_keys: Option<Vec<String>>,
    /// Replaces `compute_keys`
    pub compute_keys: Option<ComputeKeys>,
    /// Replaces `params`
    pub params: Option<Map<String, Value>>,
    /// Replaces `limit`
    pub limit: Option<u64>,
    /// Replaces `registry`
    pub registry: Option<ViewRegistry>,
}

impl ViewOverrides {
    /// Create empty overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the path template
    #[must_use]
    pub fn path(mut self, path: impl Into<PathTemplate>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Override the element path template
    #[must_use]
    pub fn element_path(mut self, path: impl Into<PathTemplate>) -> Self {
        self.element_path = Some(path.into());
        self
    }

    /// Override the keys read off each item
    #[must_use]
    pub fn keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Override the accepted output keys
    #[must_use]
    pub fn accepted_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Override the secret keys
    #[must_use]
    pub fn secret_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secret_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Set call-site computations
    #[must_use]
    pub fn compute_keys(mut self, keys: ComputeKeys) -> Self {
        self.compute_keys = Some(keys);
        self
    }

    /// Set path parameters
    #[must_use]
    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    /// Set a single path parameter, keeping any already set
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    /// Set the collection limit
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Use a specific registry for nested views
    #[must_use]
    pub fn registry(mut self, registry: ViewRegistry) -> Self {
        self.registry = Some(registry);
        self
    }
}

impl ViewOptions {
    /// Merge overrides over these options; override wins on every set field
    #[must_use]
    pub fn merge(&self, overrides: ViewOverrides) -> ViewOptions {
        let base = self.clone();
        ViewOptions {
            path: overrides.path.unwrap_or(base.path),
            element_path: overrides.element_path.or(base.element_path),
            keys: overrides.keys.unwrap_or(base.keys),
            accepted_keys: overrides.accepted_keys.or(base.accepted_keys),
            secret_keys: overrides.secret_keys.unwrap_or(base.secret_keys),
            compute_keys: overrides.compute_keys.or(base.compute_keys),
            params: overrides.params.unwrap_or(base.params),
            limit: overrides.limit.or(base.limit),
            registry: overrides.registry.or(base.registry),
        }
    }

    /// Convert resolved options back into overrides that reproduce them exactly
    pub(crate) fn into_overrides(self) -> ViewOverrides {
        ViewOverrides {
            path: Some(self.path),
            element_path: self.element_path,
            keys: Some(self.keys),
            accepted_keys: self.accepted_keys,
            secret_keys: Some(self.secret_keys),
            compute_keys: self.compute_keys,
            params: Some(self.params),
            limit: self.limit,
            registry: self.registry,
        }
    }

    /// Accepted keys after resolution, or an empty slice before it
    pub fn accepted(&self) -> &[String] {
        self.accepted_keys.as_deref().unwrap_or(&[])
    }
}

/// Deduplicate keys keeping the first occurrence of each
pub fn unique_keys<I, S>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for key in keys {
        let key = key.into();
        if !out.contains(&key) {
            out.push(key);
        }
    }
    out
}

/// Which render an accepted-key set is being resolved for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenderKind {
    Element,
    Collection,
}

/// Resolve the final accepted and secret keys of a render call
///
/// Accepted keys default to `keys`, are widened by every computation map that
/// can run in this render and are narrowed by the secret keys. Collections
/// always accept the `$` element slot.
pub(crate) fn resolve_keys(
    options: &mut ViewOptions,
    kind: RenderKind,
    view_maps: &[Option<&ComputeKeys>],
) {
    let secret = unique_keys(options.secret_keys.drain(..));
    let base = options
        .accepted_keys
        .take()
        .unwrap_or_else(|| options.keys.clone());

    let leading = match kind {
        RenderKind::Collection => vec![ELEMENTS_KEY.to_string()],
        RenderKind::Element => Vec::new(),
    };

    let computed = options
        .compute_keys
        .iter()
        .chain(view_maps.iter().flatten().copied())
        .flat_map(|map| map.names().map(str::to_string))
        .collect::<Vec<_>>();

    let accepted = unique_keys(leading.into_iter().chain(base).chain(computed))
        .into_iter()
        .filter(|key| !secret.contains(key))
        .collect();

    options.accepted_keys = Some(accepted);
    options.secret_keys = secret;
}
