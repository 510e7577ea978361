//! HTTP responses for rendered views
//!
//! # Example
//!
//! ```rust
//! use axum::http::StatusCode;
//! use resource_view::response::ViewResponse;
//! use serde_json::{json, Map};
//!
//! let mut body = Map::new();
//! body.insert("$ref".to_string(), json!("https://api.example.com/widgets"));
//!
//! let response = ViewResponse::new(body).status(StatusCode::CREATED);
//! assert_eq!(response.status_code(), StatusCode::CREATED);
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::body::Body;

/// A rendered element or collection body sent as JSON
#[derive(Debug, Clone)]
pub struct ViewResponse {
    body: Body,
    status: StatusCode,
}

impl ViewResponse {
    /// Respond with `200 OK`
    pub fn new(body: Body) -> Self {
        Self {
            body,
            status: StatusCode::OK,
        }
    }

    /// Override the status code
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Status code that will be sent
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// The rendered body
    pub fn body(&self) -> &Body {
        &self.body
    }
}

impl From<Body> for ViewResponse {
    fn from(body: Body) -> Self {
        Self::new(body)
    }
}

impl IntoResponse for ViewResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
