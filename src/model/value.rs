//! Property value type for content nodes.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AssetId;

/// A property value as handed over by the content graph provider.
///
/// The provider resolves media references once, at its boundary, so the
/// collector pattern-matches a closed set instead of probing types:
/// - Scalars: Bool, Int, Float, String, Bytes, DateTime
/// - Containers: List, Map
/// - Media: Image, ImageVariant
/// - Other: a value of a type this crate does not model, kept by type name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    DateTime(DateTime<Utc>),

    // Media types
    Image(Box<ImageRef>),
    ImageVariant(Box<VariantRef>),

    /// Opaque value; never a media reference.
    Other(String),
}

/// Graph-side view of a stored image: enough to key it in the live set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    pub identifier: AssetId,
    /// Content token of the underlying binary (sha1 of the stored blob).
    pub resource_hash: String,
}

impl ImageRef {
    pub fn new(identifier: impl Into<AssetId>, resource_hash: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            resource_hash: resource_hash.into(),
        }
    }
}

/// Graph-side view of a derived rendering.
///
/// `original` is a non-owning back-reference; `None` means the variant is
/// dangling (its original was removed or never loaded).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantRef {
    pub identifier: AssetId,
    #[serde(default)]
    pub original: Option<ImageRef>,
}

impl VariantRef {
    pub fn new(identifier: impl Into<AssetId>, original: Option<ImageRef>) -> Self {
        Self {
            identifier: identifier.into(),
            original,
        }
    }
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::Bytes(_) => "BYTES",
            Value::List(_) => "LIST",
            Value::Map(_) => "MAP",
            Value::DateTime(_) => "DATETIME",
            Value::Image(_) => "IMAGE",
            Value::ImageVariant(_) => "IMAGE_VARIANT",
            Value::Other(_) => "OTHER",
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl From<ImageRef> for Value { fn from(v: ImageRef) -> Self { Value::Image(Box::new(v)) } }
impl From<VariantRef> for Value { fn from(v: VariantRef) -> Self { Value::ImageVariant(Box::new(v)) } }
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::List(v.into_iter().map(Into::into).collect()) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::Bytes(b) => write!(f, "<bytes[{}]>", b.len()),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Image(img) => write!(f, "image({})", img.identifier),
            Value::ImageVariant(v) => match &v.original {
                Some(orig) => write!(f, "variant({} -> {})", v.identifier, orig.identifier),
                None => write!(f, "variant({} -> ?)", v.identifier),
            },
            Value::Other(type_name) => write!(f, "<{type_name}>"),
        }
    }
}
