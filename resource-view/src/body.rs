//! Response bodies and the helpers that shape them

use serde_json::{Map, Value};

/// A body being assembled for an element or collection
pub type Body = Map<String, Value>;

/// Copy an item into a fresh body without its framework-reserved properties
///
/// Reserved properties are the `$`-prefixed fields (`$id`, `$type`, `$ref`,
/// `$events`, ...). They only reach an output body through a view's declared
/// keys. Arrays become index-keyed bodies; scalars produce an empty body.
pub fn strip_specials(item: &Value) -> Body {
    match item {
        Value::Object(obj) => obj
            .iter()
            .filter(|(key, _)| !is_special(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        Value::Array(values) => values
            .iter()
            .enumerate()
            .map(|(index, value)| (index.to_string(), value.clone()))
            .collect(),
        _ => Body::new(),
    }
}

/// Check whether a property name is framework-reserved
pub fn is_special(key: &str) -> bool {
    key.starts_with('$')
}

/// Drop every key that is not accepted, or that is secret
///
/// Secret keys win over accepted keys. Returns the number of removed keys.
pub fn filter_keys(body: &mut Body, accepted: &[String], secret: &[String]) -> usize {
    let before = body.len();
    body.retain(|key, _| {
        let keep = accepted.iter().any(|k| k == key) && !secret.iter().any(|k| k == key);
        if !keep {
            tracing::trace!(key = %key, "Dropping key not accepted by view");
        }
        keep
    });
    before - body.len()
}
