//! Collection rendering
//!
//! A [`CollectionBuilder`] wraps a list of raw items into
//! `{ "$ref": <collection reference>, "$": [elements...], "limit": n }`.
//! Elements are rendered one at a time through an
//! [`ElementBuilder`](crate::element::ElementBuilder) so `$` mirrors the input
//! order exactly. The collection body then goes through its own computation
//! passes and the same accepted/secret filter as elements, so `$ref` and
//! `limit` only appear when they are accepted keys.

use serde_json::Value;

use crate::body::{filter_keys, Body};
use crate::compute::compute_keys;
use crate::context::{RequestContext, ResponseContext};
use crate::error::{Error, Result};
use crate::ids::{ELEMENTS_KEY, REF_KEY};
use crate::options::ViewOptions;
use crate::path::render_path;
use crate::view::ResourceView;

/// Key holding the page size in collection bodies
pub const LIMIT_KEY: &str = "limit";

/// Renders lists of items of a view for one request
pub struct CollectionBuilder<'v> {
    view: &'v ResourceView,
    req: RequestContext,
    res: ResponseContext,
    options: ViewOptions,
}

impl<'v> CollectionBuilder<'v> {
    pub(crate) fn new(
        view: &'v ResourceView,
        req: RequestContext,
        res: ResponseContext,
        options: ViewOptions,
    ) -> Self {
        Self {
            view,
            req,
            res,
            options,
        }
    }

    /// Resolved options of this render call
    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    /// Keys allowed in the collection body
    pub fn accepted_keys(&self) -> &[String] {
        self.options.accepted()
    }

    /// Render an untyped value, which must be an array of items
    pub async fn render_value(&self, items: Value) -> Result<Body> {
        match items {
            Value::Array(items) => self.render(items).await,
            other => Err(Error::precondition(format!(
                "collection items must be an array, got {other}"
            ))),
        }
    }

    /// Render a list of items into a collection body
    pub async fn render(&self, items: Vec<Value>) -> Result<Body> {
        let mut body = Body::new();
        let segments = render_path(&self.options.path, &self.options.params);
        body.insert(REF_KEY.to_string(), self.req.reference(&segments));

        if let Some(limit) = self.limit() {
            body.insert(LIMIT_KEY.to_string(), Value::from(limit));
        }

        let element_builder = self.view.element(
            self.req.clone(),
            self.res.clone(),
            Some(self.element_options().into_overrides()),
        );

        let mut elements = Vec::with_capacity(items.len());
        for item in items {
            elements.push(Value::Object(element_builder.render(item).await?));
        }
        tracing::debug!(count = elements.len(), "Rendered collection elements");
        body.insert(ELEMENTS_KEY.to_string(), Value::Array(elements));

        if let Some(computations) = self.view.compute_keys() {
            body = compute_keys(body, computations, &self.req, &self.res).await?;
        }
        if let Some(computations) = self.view.collection_keys() {
            body = compute_keys(body, computations, &self.req, &self.res).await?;
        }
        if let Some(computations) = &self.options.compute_keys {
            body = compute_keys(body, computations, &self.req, &self.res).await?;
        }

        filter_keys(&mut body, self.options.accepted(), &self.options.secret_keys);
        Ok(body)
    }

    /// Options handed to each element: the collection's own, with the element
    /// path standing in for the collection path
    fn element_options(&self) -> ViewOptions {
        let mut options = self.options.clone();
        if let Some(element_path) = &self.options.element_path {
            options.path = element_path.clone();
        }
        options
    }

    fn limit(&self) -> Option<u64> {
        self.options.limit.filter(|limit| *limit != 0)
    }
}
