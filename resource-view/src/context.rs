//! Request and response contexts threaded through view rendering
//!
//! Views never interpret these contexts themselves. They are handed unchanged
//! to every key computation and to the [`ReferenceBuilder`] that produces
//! `$ref` values. Both contexts are cheap to clone so element and collection
//! builders can own them across `await` points.
//!
//! # Example
//!
//! ```rust
//! use resource_view::context::RequestContext;
//!
//! let req = RequestContext::builder("https://api.example.com")
//!     .prefix("/v1")
//!     .build();
//!
//! let reference = req.reference(&["widgets".to_string(), "42".to_string()]);
//! assert_eq!(reference, "https://api.example.com/v1/widgets/42");
//! ```

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use http::{header, Extensions, HeaderMap};
use serde_json::Value;

use crate::config::ViewsConfig;
use crate::error::Error;

/// Builds self-reference values from a request context and path segments
pub trait ReferenceBuilder: Send + Sync {
    /// Produce the reference value for the given path segments
    fn build(&self, req: &RequestContext, segments: &[String]) -> Value;
}

/// Default reference builder producing absolute URL strings
///
/// Joins the request origin, the mount prefix and every segment with single
/// slashes, so `["/widgets/", "42"]` under `https://api.example.com` becomes
/// `https://api.example.com/widgets/42`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlReferenceBuilder;

impl ReferenceBuilder for UrlReferenceBuilder {
    fn build(&self, req: &RequestContext, segments: &[String]) -> Value {
        let mut url = req.origin().trim_end_matches('/').to_string();
        let parts = std::iter::once(req.prefix())
            .chain(segments.iter().map(String::as_str))
            .flat_map(|s| s.split('/'))
            .filter(|s| !s.is_empty());

        for part in parts {
            url.push('/');
            url.push_str(part);
        }

        if url.is_empty() {
            url.push('/');
        }

        Value::String(url)
    }
}

struct RequestInner {
    origin: String,
    prefix: String,
    headers: HeaderMap,
    extensions: Extensions,
    references: Arc<dyn ReferenceBuilder>,
}

/// Opaque request context handed to computations and reference builders
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<RequestInner>,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("origin", &self.inner.origin)
            .field("prefix", &self.inner.prefix)
            .finish_non_exhaustive()
    }
}

impl RequestContext {
    /// Start building a context for the given origin (`scheme://host[:port]`)
    pub fn builder(origin: impl Into<String>) -> RequestContextBuilder {
        RequestContextBuilder {
            origin: origin.into(),
            prefix: String::new(),
            headers: HeaderMap::new(),
            extensions: Extensions::new(),
            references: Arc::new(UrlReferenceBuilder),
        }
    }

    /// Build a context from HTTP request parts
    ///
    /// The origin comes from the `Host` header (or `X-Forwarded-Host` /
    /// `X-Forwarded-Proto` when `trust_forwarded_headers` is set), falling
    /// back to the configured `base_url`. Request extensions are copied so
    /// computations can read application data attached by middleware.
    pub fn from_parts(parts: &Parts, config: &ViewsConfig) -> Self {
        let origin = origin_from_parts(parts, config);
        let mut builder = Self::builder(origin);
        builder.headers = parts.headers.clone();
        builder.extensions = parts.extensions.clone();
        builder.build()
    }

    /// Origin of the request, used as the base for self-references
    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    /// Mount prefix inserted between the origin and rendered paths
    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    /// Request headers
    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Application data attached to the request
    pub fn extensions(&self) -> &Extensions {
        &self.inner.extensions
    }

    /// Get a typed value from the request extensions
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.inner.extensions.get::<T>()
    }

    /// Build a self-reference for the given path segments
    pub fn reference(&self, segments: &[String]) -> Value {
        self.inner.references.build(self, segments)
    }
}

/// Builder for [`RequestContext`]
pub struct RequestContextBuilder {
    origin: String,
    prefix: String,
    headers: HeaderMap,
    extensions: Extensions,
    references: Arc<dyn ReferenceBuilder>,
}

impl RequestContextBuilder {
    /// Set the mount prefix (e.g. `/api/v1`)
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the request headers
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Attach a typed value readable by computations
    #[must_use]
    pub fn extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    /// Replace the reference builder used for `$ref` values
    #[must_use]
    pub fn reference_builder(mut self, references: impl ReferenceBuilder + 'static) -> Self {
        self.references = Arc::new(references);
        self
    }

    /// Finish building the context
    pub fn build(self) -> RequestContext {
        RequestContext {
            inner: Arc::new(RequestInner {
                origin: self.origin,
                prefix: self.prefix,
                headers: self.headers,
                extensions: self.extensions,
                references: self.references,
            }),
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Middleware may attach a ViewsConfig; otherwise use the defaults
        let config = parts
            .extensions
            .get::<ViewsConfig>()
            .cloned()
            .unwrap_or_default();

        Ok(Self::from_parts(parts, &config))
    }
}

/// First non-empty value of a (possibly comma-separated) header
fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn origin_from_parts(parts: &Parts, config: &ViewsConfig) -> String {
    let forwarded_host = config
        .trust_forwarded_headers
        .then(|| header_str(parts, "x-forwarded-host"))
        .flatten();
    let host = forwarded_host
        .or_else(|| header_str(parts, header::HOST.as_str()))
        .or_else(|| parts.uri.authority().map(|a| a.as_str()));

    let Some(host) = host else {
        return config.base_url.clone();
    };

    let forwarded_proto = config
        .trust_forwarded_headers
        .then(|| header_str(parts, "x-forwarded-proto"))
        .flatten();
    let scheme = forwarded_proto
        .or_else(|| parts.uri.scheme_str())
        .unwrap_or_else(|| {
            config
                .base_url
                .split_once("://")
                .map_or("http", |(scheme, _)| scheme)
        });

    format!("{scheme}://{host}")
}

/// Opaque response context handed to computations
#[derive(Clone, Default)]
pub struct ResponseContext {
    extensions: Arc<Extensions>,
}

impl std::fmt::Debug for ResponseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseContext").finish_non_exhaustive()
    }
}

impl ResponseContext {
    /// Create an empty response context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a response context carrying the given extensions
    pub fn with_extensions(extensions: Extensions) -> Self {
        Self {
            extensions: Arc::new(extensions),
        }
    }

    /// Application data attached to the response
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Get a typed value from the response extensions
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }
}
