//! Path template rendering
//!
//! Templates name their parameters with a leading colon (`/users/:user/posts`).
//! Rendering replaces every placeholder with the matching parameter and leaves
//! unknown placeholders untouched, colon included, so a missing parameter shows
//! up in the rendered path instead of failing the render.
//!
//! # Example
//!
//! ```rust
//! use resource_view::path::{render_path, PathTemplate};
//! use serde_json::json;
//!
//! let params = json!({ "user": { "$id": "abc-123" }, "page": 2 });
//! let rendered = render_path(
//!     &PathTemplate::from("/users/:user/posts/:page/:missing"),
//!     params.as_object().unwrap(),
//! );
//! assert_eq!(rendered, vec!["/users/abc-123/posts/2/:missing"]);
//! ```

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::IDENTITY_KEY;

/// Regex for `:name` placeholders
static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":([A-Za-z0-9_:$\-]+)").expect("placeholder regex is valid")
});

/// One or more path templates rendered as consecutive reference segments
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "TemplateRepr", into = "TemplateRepr")]
pub struct PathTemplate(Vec<String>);

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TemplateRepr {
    One(String),
    Many(Vec<String>),
}

impl From<TemplateRepr> for PathTemplate {
    fn from(repr: TemplateRepr) -> Self {
        match repr {
            TemplateRepr::One(s) => Self(vec![s]),
            TemplateRepr::Many(v) => Self(v),
        }
    }
}

impl From<PathTemplate> for TemplateRepr {
    fn from(template: PathTemplate) -> Self {
        match <[String; 1]>::try_from(template.0) {
            Ok([one]) => Self::One(one),
            Err(many) => Self::Many(many),
        }
    }
}

impl PathTemplate {
    /// Template segments in order
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Check whether the template has no segments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render the template with the given parameters
    pub fn render(&self, params: &Map<String, Value>) -> Vec<String> {
        render_path(self, params)
    }
}

impl From<&str> for PathTemplate {
    fn from(s: &str) -> Self {
        Self(vec![s.to_string()])
    }
}

impl From<String> for PathTemplate {
    fn from(s: String) -> Self {
        Self(vec![s])
    }
}

impl From<Vec<String>> for PathTemplate {
    fn from(v: Vec<String>) -> Self {
        Self(v)
    }
}

impl From<Vec<&str>> for PathTemplate {
    fn from(v: Vec<&str>) -> Self {
        Self(v.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PathTemplate {
    fn from(v: [&str; N]) -> Self {
        Self(v.iter().map(|s| s.to_string()).collect())
    }
}

/// Render every template segment, substituting `:name` placeholders from `params`
pub fn render_path(template: &PathTemplate, params: &Map<String, Value>) -> Vec<String> {
    template
        .segments()
        .iter()
        .map(|segment| render_segment(segment, params))
        .collect()
}

fn render_segment(segment: &str, params: &Map<String, Value>) -> String {
    PLACEHOLDER_REGEX
        .replace_all(segment, |caps: &Captures<'_>| match params.get(&caps[1]) {
            Some(value) => param_text(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Text substituted for a parameter value
///
/// Objects carrying an identity field stand in for their identity.
fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => match obj.get(IDENTITY_KEY) {
            Some(Value::String(id)) => id.clone(),
            Some(id @ Value::Number(_)) => id.to_string(),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}
