//! Reference resolver: property value → identity of the original image.
//!
//! Variants are derived data and are never live on their own; a variant
//! keeps only its original alive. A variant whose original is gone
//! contributes nothing.

use crate::model::{IdentityPolicy, ImageRef, ResourceIdentity, Value};

/// Resolve one property value to the identity of the image it keeps alive.
///
/// Never fails: values that are not media references (including `Null`)
/// simply resolve to `None`. Does not look inside lists or maps; see
/// [`resolve_nested`] for that.
pub fn resolve(value: &Value, policy: IdentityPolicy) -> Option<ResourceIdentity> {
    original_of(value).map(|image| policy.identity_of(image))
}

/// The original image a single value points at, if any.
pub fn original_of(value: &Value) -> Option<&ImageRef> {
    match value {
        Value::Image(image) => Some(&**image),
        Value::ImageVariant(variant) => variant.original.as_ref(),
        _ => None,
    }
}

/// [`resolve`] applied to `value` and to everything nested in its lists
/// and maps. Duplicates are yielded as often as they occur.
pub fn resolve_nested(value: &Value, policy: IdentityPolicy) -> Vec<ResourceIdentity> {
    let mut out = Vec::new();
    collect(value, policy, &mut out);
    out
}

fn collect(value: &Value, policy: IdentityPolicy, out: &mut Vec<ResourceIdentity>) {
    match value {
        Value::List(items) => items.iter().for_each(|v| collect(v, policy, out)),
        Value::Map(entries) => entries.values().for_each(|v| collect(v, policy, out)),
        other => out.extend(resolve(other, policy)),
    }
}
