//! Element rendering
//!
//! An [`ElementBuilder`] turns one raw item into an element body:
//!
//! 1. A bare identity string becomes `{ "$id": <identity> }`.
//! 2. The item is merged over the call's `params` for path rendering.
//! 3. The body starts as the item without its `$`-prefixed properties.
//! 4. Every declared key is resolved (see [`KeySource`]); resolutions run
//!    concurrently and are written back in declared order.
//! 5. `$type` is stamped with the view's type tag when missing.
//! 6. The view's `compute_keys`, then `element_keys`, then the call-site
//!    `compute_keys` run, each pass seeing the previous passes' output.
//! 7. Keys that are not accepted, or are secret, are dropped.
//!
//! Any failure aborts the render; no partial body is returned.

use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture};
use serde_json::{json, Map, Value};

use crate::body::{filter_keys, strip_specials, Body};
use crate::compute::compute_keys;
use crate::context::{RequestContext, ResponseContext};
use crate::error::{Error, Result};
use crate::ids::{identity_of, is_identity, is_identity_str, IDENTITY_KEY, REF_KEY, TYPE_KEY};
use crate::options::{ViewOptions, ViewOverrides};
use crate::path::render_path;
use crate::registry::ViewRegistry;
use crate::view::ResourceView;

/// Where the value of a declared key comes from
///
/// Branches are tried in declaration order and the first match wins.
#[derive(Debug)]
pub enum KeySource<'a> {
    /// `$ref` on an item with a valid identity: the item's self-reference
    SelfReference,
    /// The field is an identity and a view is registered under the key name
    NestedIdentity(Arc<ResourceView>, &'a Value),
    /// The field is an unrendered object with an identity and a registered view
    NestedObject(Arc<ResourceView>, &'a Value),
    /// The field is copied as is
    Verbatim(&'a Value),
    /// The item has no such field; the key is left out
    Omitted,
}

/// Renders single items of a view for one request
pub struct ElementBuilder<'v> {
    view: &'v ResourceView,
    req: RequestContext,
    res: ResponseContext,
    options: ViewOptions,
    registry: ViewRegistry,
}

impl<'v> ElementBuilder<'v> {
    pub(crate) fn new(
        view: &'v ResourceView,
        req: RequestContext,
        res: ResponseContext,
        options: ViewOptions,
    ) -> Self {
        let registry = ResourceView::registry_for(&options);
        Self {
            view,
            req,
            res,
            options,
            registry,
        }
    }

    /// Resolved options of this render call
    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    /// Keys allowed in the output
    pub fn accepted_keys(&self) -> &[String] {
        self.options.accepted()
    }

    /// Render one item into an element body
    pub fn render(&self, item: Value) -> BoxFuture<'_, Result<Body>> {
        Box::pin(self.render_item(item))
    }

    /// Render several items in order, one at a time
    pub async fn render_many(&self, items: Vec<Value>) -> Result<Vec<Body>> {
        let mut bodies = Vec::with_capacity(items.len());
        for item in items {
            bodies.push(self.render(item).await?);
        }
        Ok(bodies)
    }

    async fn render_item(&self, item: Value) -> Result<Body> {
        let item = normalize_item(item)?;

        let mut params = self.options.params.clone();
        params.extend(item_params(&item));

        let mut body = strip_specials(&item);

        let resolved = try_join_all(
            self.options
                .keys
                .iter()
                .map(|key| self.resolve_key(key, &item, &params)),
        )
        .await?;

        for (key, value) in self.options.keys.iter().zip(resolved) {
            if let Some(value) = value {
                body.insert(key.clone(), value);
            }
        }

        if is_falsy(body.get(TYPE_KEY)) {
            if let Some(tag) = self.view.type_tag() {
                body.insert(TYPE_KEY.to_string(), Value::String(tag.to_string()));
            }
        }

        if let Some(computations) = self.view.compute_keys() {
            body = compute_keys(body, computations, &self.req, &self.res).await?;
        }
        if let Some(computations) = self.view.element_keys() {
            body = compute_keys(body, computations, &self.req, &self.res).await?;
        }
        if let Some(computations) = &self.options.compute_keys {
            body = compute_keys(body, computations, &self.req, &self.res).await?;
        }

        filter_keys(&mut body, self.options.accepted(), &self.options.secret_keys);
        Ok(body)
    }

    /// Decide where the value of `key` comes from for this item
    pub fn classify<'a>(&self, key: &str, item: &'a Value) -> KeySource<'a> {
        if key == REF_KEY && identity_of(item).is_some() {
            return KeySource::SelfReference;
        }

        let Some(value) = item.get(key) else {
            return KeySource::Omitted;
        };

        if is_identity(value) {
            if let Some(view) = self.registry.get(key) {
                return KeySource::NestedIdentity(view, value);
            }
        }

        if identity_of(value).is_some() && value.get(REF_KEY).is_none() {
            if let Some(view) = self.registry.get(key) {
                return KeySource::NestedObject(view, value);
            }
        }

        KeySource::Verbatim(value)
    }

    async fn resolve_key(
        &self,
        key: &str,
        item: &Value,
        params: &Map<String, Value>,
    ) -> Result<Option<Value>> {
        match self.classify(key, item) {
            KeySource::SelfReference => Ok(Some(self.self_reference(item, params))),
            KeySource::NestedIdentity(view, value) | KeySource::NestedObject(view, value) => {
                tracing::debug!(key = %key, "Rendering nested view");
                let overrides = view
                    .options()
                    .registry
                    .is_none()
                    .then(|| ViewOverrides::new().registry(self.registry.clone()));
                let nested = view
                    .element(self.req.clone(), self.res.clone(), overrides)
                    .render(value.clone())
                    .await
                    .map_err(|e| Error::nested(key, e))?;
                Ok(Some(Value::Object(nested)))
            }
            KeySource::Verbatim(value) => Ok(Some(value.clone())),
            KeySource::Omitted => Ok(None),
        }
    }

    /// Self-reference of an item
    ///
    /// With an element path, that path alone is rendered. Otherwise the view
    /// path is rendered and the item's identity appended.
    fn self_reference(&self, item: &Value, params: &Map<String, Value>) -> Value {
        let segments = match &self.options.element_path {
            Some(element_path) => render_path(element_path, params),
            None => {
                let mut segments = render_path(&self.options.path, params);
                if let Some(id) = identity_of(item) {
                    segments.push(id.to_string());
                }
                segments
            }
        };
        self.req.reference(&segments)
    }
}

/// Turn a raw item into an object-shaped value
fn normalize_item(item: Value) -> Result<Value> {
    match item {
        Value::String(s) if is_identity_str(&s) => Ok(json!({ IDENTITY_KEY: s })),
        Value::String(s) => Err(Error::precondition(format!(
            "item string '{s}' is not a valid identity"
        ))),
        Value::Object(_) => Ok(item),
        Value::Array(_) => {
            tracing::warn!("Element render called with an array item; rendering it as an object");
            Ok(item)
        }
        other => Err(Error::precondition(format!(
            "item must be an object or an identity, got {other}"
        ))),
    }
}

/// Every property of an item, specials included, as path parameters
fn item_params(item: &Value) -> Map<String, Value> {
    match item {
        Value::Object(obj) => obj.clone(),
        Value::Array(_) => strip_specials(item),
        _ => Map::new(),
    }
}

fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{computed, computed_sync, ComputeKeys};
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WIDGET_ID: &str = "11111111-1111-1111-1111-111111111111";
    const OWNER_ID: &str = "22222222-2222-2222-2222-222222222222";

    fn contexts() -> (RequestContext, ResponseContext) {
        (
            RequestContext::builder("https://api.example.com").build(),
            ResponseContext::new(),
        )
    }

    fn owner_view() -> Arc<ResourceView> {
        ResourceView::builder("/users")
            .keys(["$id", "$type", "$ref", "name"])
            .type_tag("User")
            .build()
    }

    fn registry_with_owner() -> ViewRegistry {
        let registry = ViewRegistry::new();
        registry.register("owner", owner_view());
        registry
    }

    #[tokio::test]
    async fn test_end_to_end_widget() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/widgets")
            .keys(["$id", "$type", "name"])
            .type_tag("Widget")
            .registry(ViewRegistry::new())
            .build();

        let body = view
            .element(req, res, None)
            .render(json!({ "$id": WIDGET_ID, "name": "Bolt", "weight": 3 }))
            .await
            .unwrap();

        assert_eq!(
            Value::Object(body),
            json!({ "$id": WIDGET_ID, "$type": "Widget", "name": "Bolt" })
        );
    }

    #[tokio::test]
    async fn test_self_reference_appends_identity() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/widgets")
            .registry(ViewRegistry::new())
            .build();

        let body = view
            .element(req, res, None)
            .render(json!({ "$id": WIDGET_ID }))
            .await
            .unwrap();

        assert_eq!(
            body["$ref"],
            json!(format!("https://api.example.com/widgets/{WIDGET_ID}"))
        );
    }

    #[tokio::test]
    async fn test_element_path_is_rendered_alone() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/shops/:shop/widgets")
            .element_path("/widgets/:$id")
            .registry(ViewRegistry::new())
            .build();

        let body = view
            .element(req, res, Some(ViewOverrides::new().param("shop", "s1")))
            .render(json!({ "$id": WIDGET_ID }))
            .await
            .unwrap();

        assert_eq!(
            body["$ref"],
            json!(format!("https://api.example.com/widgets/{WIDGET_ID}"))
        );
    }

    #[tokio::test]
    async fn test_path_params_come_from_item_and_options() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/shops/:shop/widgets")
            .registry(ViewRegistry::new())
            .build();

        let body = view
            .element(req, res, Some(ViewOverrides::new().param("shop", "s1")))
            .render(json!({ "$id": WIDGET_ID, "shop": { "$id": "s2" } }))
            .await
            .unwrap();

        assert_eq!(
            body["$ref"],
            json!(format!("https://api.example.com/shops/s2/widgets/{WIDGET_ID}"))
        );
    }

    #[tokio::test]
    async fn test_no_self_reference_without_identity() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/widgets")
            .keys(["$ref", "name"])
            .registry(ViewRegistry::new())
            .build();

        let body = view
            .element(req, res, None)
            .render(json!({ "$id": "not-a-uuid", "name": "Bolt" }))
            .await
            .unwrap();

        assert!(!body.contains_key("$ref"));
        assert_eq!(body["name"], json!("Bolt"));
    }

    #[tokio::test]
    async fn test_bare_identity_item() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/widgets")
            .type_tag("Widget")
            .registry(ViewRegistry::new())
            .build();

        let body = view
            .element(req, res, None)
            .render(json!(WIDGET_ID))
            .await
            .unwrap();

        assert_eq!(body["$id"], json!(WIDGET_ID));
        assert_eq!(body["$type"], json!("Widget"));
        assert!(body.contains_key("$ref"));
    }

    #[tokio::test]
    async fn test_invalid_items_are_rejected() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/widgets")
            .registry(ViewRegistry::new())
            .build();
        let builder = view.element(req, res, None);

        let err = builder.render(json!("widget-1")).await.unwrap_err();
        assert!(err.is_precondition());

        let err = builder.render(json!(12)).await.unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_array_item_is_rendered_with_warning() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/widgets")
            .keys(["0"])
            .registry(ViewRegistry::new())
            .build();

        let body = view
            .element(req, res, None)
            .render(json!(["first", "second"]))
            .await
            .unwrap();

        assert_eq!(Value::Object(body), json!({ "0": "first" }));
    }

    #[tokio::test]
    async fn test_existing_type_is_kept() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/widgets")
            .keys(["$type"])
            .type_tag("Widget")
            .registry(ViewRegistry::new())
            .build();

        let body = view
            .element(req, res, None)
            .render(json!({ "$type": "Gadget" }))
            .await
            .unwrap();

        assert_eq!(body["$type"], json!("Gadget"));
    }

    #[tokio::test]
    async fn test_nested_identity_is_rendered_through_registry() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/widgets")
            .keys(["$id", "owner"])
            .registry(registry_with_owner())
            .build();

        let body = view
            .element(req, res, None)
            .render(json!({ "$id": WIDGET_ID, "owner": OWNER_ID }))
            .await
            .unwrap();

        assert_eq!(
            body["owner"],
            json!({
                "$id": OWNER_ID,
                "$type": "User",
                "$ref": format!("https://api.example.com/users/{OWNER_ID}"),
            })
        );
    }

    #[tokio::test]
    async fn test_nested_object_is_rendered_through_registry() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/widgets")
            .keys(["Owner"])
            .registry(registry_with_owner())
            .build();

        let body = view
            .element(req, res, None)
            .render(json!({ "Owner": { "$id": OWNER_ID, "name": "Ada", "secret": 1 } }))
            .await
            .unwrap();

        assert_eq!(body["Owner"]["name"], json!("Ada"));
        assert_eq!(body["Owner"]["$type"], json!("User"));
        assert!(!body["Owner"].as_object().unwrap().contains_key("secret"));
    }

    #[tokio::test]
    async fn test_already_rendered_object_is_copied() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/widgets")
            .keys(["owner"])
            .registry(registry_with_owner())
            .build();
        let rendered = json!({ "$id": OWNER_ID, "$ref": "https://elsewhere/users/x" });

        let body = view
            .element(req, res, None)
            .render(json!({ "owner": rendered.clone() }))
            .await
            .unwrap();

        assert_eq!(body["owner"], rendered);
    }

    #[tokio::test]
    async fn test_identity_without_registered_view_is_copied() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/widgets")
            .keys(["maker"])
            .registry(registry_with_owner())
            .build();

        let body = view
            .element(req, res, None)
            .render(json!({ "maker": OWNER_ID }))
            .await
            .unwrap();

        assert_eq!(body["maker"], json!(OWNER_ID));
    }

    #[tokio::test]
    async fn test_nested_failure_aborts_item() {
        let (req, res) = contexts();
        let failing_owner = ResourceView::builder("/users")
            .compute_key(
                "broken",
                computed_sync(|_, _, _| Err(anyhow::anyhow!("lookup failed"))),
            )
            .build();
        let registry = ViewRegistry::new();
        registry.register("owner", failing_owner);
        let view = ResourceView::builder("/widgets")
            .keys(["owner"])
            .registry(registry)
            .build();

        let err = view
            .element(req, res, None)
            .render(json!({ "owner": OWNER_ID }))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NestedView { ref key, .. } if key == "owner"));
    }

    #[tokio::test]
    async fn test_computation_passes_run_in_order() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/widgets")
            .keys(["$id", "qty"])
            .compute_key(
                "double",
                computed_sync(|body, _, _| {
                    let qty = body.get("qty").and_then(Value::as_i64).unwrap_or(0);
                    Ok(Some(json!(qty * 2)))
                }),
            )
            .element_key(
                "label",
                computed(|body, _, _| {
                    let double = body.get("double").cloned();
                    async move { Ok(double.map(|d| json!(format!("x{d}")))) }.boxed()
                }),
            )
            .registry(ViewRegistry::new())
            .build();

        let call_site = ComputeKeys::new().with(
            "summary",
            computed_sync(|body, _, _| {
                Ok(Some(json!([body.get("double").cloned(), body.get("label").cloned()])))
            }),
        );

        let body = view
            .element(req, res, Some(ViewOverrides::new().compute_keys(call_site)))
            .render(json!({ "$id": WIDGET_ID, "qty": 4 }))
            .await
            .unwrap();

        assert_eq!(body["double"], json!(8));
        assert_eq!(body["label"], json!("x8"));
        assert_eq!(body["summary"], json!([8, "x8"]));
    }

    #[tokio::test]
    async fn test_secret_keys_never_emitted() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/users")
            .keys(["$id", "email", "password"])
            .secret_keys(["password", "token"])
            .compute_key("token", computed_sync(|_, _, _| Ok(Some(json!("t")))))
            .registry(ViewRegistry::new())
            .build();

        let overrides = ViewOverrides::new().accepted_keys(["$id", "email", "password", "token"]);
        let body = view
            .element(req, res, Some(overrides))
            .render(json!({ "$id": WIDGET_ID, "email": "a@b.c", "password": "pw" }))
            .await
            .unwrap();

        assert_eq!(Value::Object(body), json!({ "$id": WIDGET_ID, "email": "a@b.c" }));
    }

    #[tokio::test]
    async fn test_override_secret_keys_apply() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/users")
            .keys(["$id", "email"])
            .registry(ViewRegistry::new())
            .build();

        let body = view
            .element(req, res, Some(ViewOverrides::new().secret_keys(["email"])))
            .render(json!({ "$id": WIDGET_ID, "email": "a@b.c" }))
            .await
            .unwrap();

        assert!(!body.contains_key("email"));
    }

    #[tokio::test]
    async fn test_render_many_runs_computations_per_item() {
        let (req, res) = contexts();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let view = ResourceView::builder("/widgets")
            .compute_key(
                "n",
                computed_sync(move |_, _, _| {
                    Ok(Some(json!(counter.fetch_add(1, Ordering::SeqCst))))
                }),
            )
            .registry(ViewRegistry::new())
            .build();

        let bodies = view
            .element(req, res, None)
            .render_many(vec![json!({}), json!({}), json!({})])
            .await
            .unwrap();

        let ns: Vec<_> = bodies.iter().map(|b| b["n"].clone()).collect();
        assert_eq!(ns, vec![json!(0), json!(1), json!(2)]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_classify_branches() {
        let (req, res) = contexts();
        let view = ResourceView::builder("/widgets")
            .registry(registry_with_owner())
            .build();
        let builder = view.element(req, res, None);
        let item = json!({
            "$id": WIDGET_ID,
            "owner": OWNER_ID,
            "name": "Bolt",
            "nothing": null,
        });

        assert!(matches!(builder.classify("$ref", &item), KeySource::SelfReference));
        assert!(matches!(builder.classify("owner", &item), KeySource::NestedIdentity(..)));
        assert!(matches!(builder.classify("name", &item), KeySource::Verbatim(_)));
        assert!(matches!(builder.classify("nothing", &item), KeySource::Verbatim(Value::Null)));
        assert!(matches!(builder.classify("missing", &item), KeySource::Omitted));
    }

    #[test]
    fn test_is_falsy() {
        assert!(is_falsy(None));
        assert!(is_falsy(Some(&json!(""))));
        assert!(is_falsy(Some(&json!(0))));
        assert!(is_falsy(Some(&json!(false))));
        assert!(!is_falsy(Some(&json!("Widget"))));
        assert!(!is_falsy(Some(&json!({}))));
    }
}
