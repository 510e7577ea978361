//! Computed keys
//!
//! A computed key is an output field whose value comes from a function run
//! against the body being assembled instead of being copied from the source
//! item. Computations in one [`ComputeKeys`] map run strictly one after the
//! other, in insertion order, so a later computation can read what an earlier
//! one wrote into the body.
//!
//! # Example
//!
//! ```rust
//! use resource_view::compute::{computed, computed_sync, ComputeKeys};
//! use futures::FutureExt;
//! use serde_json::json;
//!
//! let keys = ComputeKeys::new()
//!     .with("total", computed_sync(|body, _req, _res| {
//!         let qty = body.get("qty").and_then(|v| v.as_u64()).unwrap_or(0);
//!         let price = body.get("price").and_then(|v| v.as_u64()).unwrap_or(0);
//!         Ok(Some(json!(qty * price)))
//!     }))
//!     .with("label", computed(|body, _req, _res| {
//!         let total = body.get("total").cloned();
//!         async move { Ok(total.map(|t| json!(format!("total: {t}")))) }.boxed()
//!     }));
//!
//! assert_eq!(keys.names().collect::<Vec<_>>(), vec!["total", "label"]);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::body::Body;
use crate::context::{RequestContext, ResponseContext};
use crate::error::{Error, Result};

/// Future returned by closure-based computations
pub type ComputeFuture = BoxFuture<'static, anyhow::Result<Option<Value>>>;

/// A function producing the value of one computed key
///
/// `Ok(None)` means "no value": the body keeps whatever it already holds for
/// the key.
#[async_trait]
pub trait Computation: Send + Sync {
    /// Compute the value from the in-progress body and the request/response contexts
    async fn compute(
        &self,
        body: &Body,
        req: &RequestContext,
        res: &ResponseContext,
    ) -> anyhow::Result<Option<Value>>;
}

struct AsyncFn<F>(F);

#[async_trait]
impl<F> Computation for AsyncFn<F>
where
    F: Fn(&Body, &RequestContext, &ResponseContext) -> ComputeFuture + Send + Sync,
{
    async fn compute(
        &self,
        body: &Body,
        req: &RequestContext,
        res: &ResponseContext,
    ) -> anyhow::Result<Option<Value>> {
        (self.0)(body, req, res).await
    }
}

struct SyncFn<F>(F);

#[async_trait]
impl<F> Computation for SyncFn<F>
where
    F: Fn(&Body, &RequestContext, &ResponseContext) -> anyhow::Result<Option<Value>> + Send + Sync,
{
    async fn compute(
        &self,
        body: &Body,
        req: &RequestContext,
        res: &ResponseContext,
    ) -> anyhow::Result<Option<Value>> {
        (self.0)(body, req, res)
    }
}

/// Wrap a closure returning a boxed future as a computation
///
/// The closure reads what it needs from the body synchronously and returns
/// a `'static` future that produces the value.
pub fn computed<F>(f: F) -> Arc<dyn Computation>
where
    F: Fn(&Body, &RequestContext, &ResponseContext) -> ComputeFuture + Send + Sync + 'static,
{
    Arc::new(AsyncFn(f))
}

/// Wrap a synchronous closure as a computation
pub fn computed_sync<F>(f: F) -> Arc<dyn Computation>
where
    F: Fn(&Body, &RequestContext, &ResponseContext) -> anyhow::Result<Option<Value>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(SyncFn(f))
}

/// Insertion-ordered map from key name to computation
#[derive(Clone, Default)]
pub struct ComputeKeys {
    entries: Vec<(String, Arc<dyn Computation>)>,
}

impl fmt::Debug for ComputeKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl ComputeKeys {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a computation, replacing any existing one of the same name in place
    pub fn insert(&mut self, key: impl Into<String>, computation: Arc<dyn Computation>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(name, _)| *name == key) {
            Some(entry) => entry.1 = computation,
            None => self.entries.push((key, computation)),
        }
    }

    /// Builder-style [`insert`](Self::insert)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, computation: Arc<dyn Computation>) -> Self {
        self.insert(key, computation);
        self
    }

    /// Key names in execution order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Number of computations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, computation)` pairs in execution order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Computation>)> {
        self.entries.iter().map(|(name, c)| (name.as_str(), c))
    }
}

/// Run every computation against the body, one at a time, in map order
///
/// Each defined result is written into the body before the next computation
/// starts. The first failure aborts the pass.
pub async fn compute_keys(
    mut body: Body,
    computations: &ComputeKeys,
    req: &RequestContext,
    res: &ResponseContext,
) -> Result<Body> {
    for (key, computation) in computations.iter() {
        let started = Instant::now();
        let value = computation
            .compute(&body, req, res)
            .await
            .map_err(|source| Error::Computation {
                key: key.to_string(),
                source,
            })?;

        tracing::trace!(
            key = %key,
            elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
            defined = value.is_some(),
            "Computed key"
        );

        if let Some(value) = value {
            body.insert(key.to_string(), value);
        }
    }

    Ok(body)
}
