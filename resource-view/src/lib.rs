//! # resource-view
//!
//! Filtered, reference-annotated JSON views of domain objects for REST APIs.
//!
//! A [`ResourceView`](view::ResourceView) describes how one resource type is
//! presented: which keys are copied off each item, which are computed, which
//! may never leave the service, and how the `$ref` self-reference is built.
//! Fields holding the identity of another resource are rendered through the
//! view registered under the field name, so related resources come out as
//! nested elements.
//!
//! ## Features
//!
//! - **Elements and collections**: `{ $id, $type, $ref, ... }` bodies and
//!   `{ $ref, $: [...], limit }` envelopes
//! - **Computed keys**: ordered async computations with access to the request
//!   and response contexts
//! - **Accepted and secret keys**: whitelist per call, blacklist always wins
//! - **Nested views**: case-insensitive registry lookup by field name
//! - **axum integration**: `RequestContext` extractor, `ViewResponse` and
//!   `IntoResponse` for errors
//!
//! ## Example
//!
//! ```rust,no_run
//! use axum::{routing::get, Router};
//! use resource_view::prelude::*;
//! use serde_json::json;
//!
//! async fn list_widgets(req: RequestContext) -> Result<ViewResponse> {
//!     let view = ViewRegistry::global()
//!         .get("widget")
//!         .ok_or_else(|| Error::Internal("widget view not registered".to_string()))?;
//!
//!     let items = vec![json!({ "$id": "11111111-1111-1111-1111-111111111111", "name": "Bolt" })];
//!     let body = view
//!         .collection(req, ResponseContext::new(), Some(ViewOverrides::new().limit(20)))
//!         .render(items)
//!         .await?;
//!
//!     Ok(ViewResponse::new(body))
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     register_view(
//!         "widget",
//!         ResourceView::builder("/widgets")
//!             .keys(["$id", "$type", "$ref", "name"])
//!             .accepted_keys(["$id", "$type", "$ref", "name", "limit"])
//!             .type_tag("Widget")
//!             .build(),
//!     );
//!
//!     let app = Router::new().route("/widgets", get(list_widgets));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod body;
pub mod collection;
pub mod compute;
pub mod config;
pub mod context;
pub mod element;
pub mod error;
pub mod ids;
pub mod observability;
pub mod options;
pub mod path;
pub mod registry;
pub mod response;
pub mod view;

/// Commonly used types
pub mod prelude {
    pub use crate::body::Body;
    pub use crate::collection::CollectionBuilder;
    pub use crate::compute::{computed, computed_sync, Computation, ComputeKeys};
    pub use crate::config::Config;
    pub use crate::context::{
        ReferenceBuilder, RequestContext, ResponseContext, UrlReferenceBuilder,
    };
    pub use crate::element::ElementBuilder;
    pub use crate::error::{Error, Result};
    pub use crate::observability::init_tracing;
    pub use crate::options::{ViewOptions, ViewOverrides};
    pub use crate::path::{render_path, PathTemplate};
    pub use crate::registry::{register_view, ViewRegistry};
    pub use crate::response::ViewResponse;
    pub use crate::view::ResourceView;
}
