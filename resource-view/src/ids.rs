//! Resource identity detection
//!
//! A resource identity is a hyphenated UUID string such as
//! `11111111-1111-1111-1111-111111111111`. Identities decide whether an item
//! gets a self-reference and whether a field is rendered through a nested view.
//!
//! ```rust
//! use resource_view::ids::{identity_of, is_identity};
//! use serde_json::json;
//!
//! assert!(is_identity(&json!("11111111-1111-1111-1111-111111111111")));
//! assert!(!is_identity(&json!("widget-1")));
//!
//! let item = json!({ "$id": "11111111-1111-1111-1111-111111111111" });
//! assert_eq!(identity_of(&item), Some("11111111-1111-1111-1111-111111111111"));
//! ```

use serde_json::Value;
use uuid::Uuid;

/// Field holding a resource identity
pub const IDENTITY_KEY: &str = "$id";

/// Field holding the type discriminator
pub const TYPE_KEY: &str = "$type";

/// Field holding the self-reference
pub const REF_KEY: &str = "$ref";

/// Collection field holding the rendered element bodies
pub const ELEMENTS_KEY: &str = "$";

/// Keys a view reads off an item when none are declared
pub const DEFAULT_KEYS: [&str; 3] = [IDENTITY_KEY, TYPE_KEY, REF_KEY];

/// Check whether a string is a valid resource identity
#[must_use]
pub fn is_identity_str(value: &str) -> bool {
    // Only the canonical hyphenated form counts; `Uuid::parse_str` also
    // accepts simple, braced and urn forms.
    value.len() == 36 && Uuid::try_parse(value).is_ok()
}

/// Check whether a JSON value is a valid resource identity
#[must_use]
pub fn is_identity(value: &Value) -> bool {
    value.as_str().is_some_and(is_identity_str)
}

/// Return the identity of an object value, if it carries a valid one
#[must_use]
pub fn identity_of(value: &Value) -> Option<&str> {
    value
        .as_object()
        .and_then(|obj| obj.get(IDENTITY_KEY))
        .and_then(Value::as_str)
        .filter(|id| is_identity_str(id))
}
