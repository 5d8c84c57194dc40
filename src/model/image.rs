//! Stored image records and their derived variants.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{ImageRef, TagId};

/// Opaque, system-assigned identifier of a stored asset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self { AssetId(s.to_owned()) }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self { AssetId(s) }
}

/// The binary behind an image or variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub filename: String,
    pub byte_size: u64,
    /// Content hash of the blob; byte-identical uploads share it.
    pub sha1: String,
}

impl Resource {
    pub fn new(filename: impl Into<String>, byte_size: u64, sha1: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            byte_size,
            sha1: sha1.into(),
        }
    }

    /// Size in kB (1024 bytes).
    pub fn kilobytes(&self) -> f64 {
        self.byte_size as f64 / 1024.0
    }
}

/// A cropped or resized rendering of an original image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageVariant {
    pub identifier: AssetId,
    pub width: u32,
    pub height: u32,
    pub resource: Resource,
    /// Back-reference to the originating record. The variant does not own it.
    #[serde(default)]
    pub original: Option<AssetId>,
}

impl ImageVariant {
    /// Width divided by height; 0.0 for a degenerate zero-height rendering.
    pub fn aspect_ratio(&self) -> f64 {
        aspect_ratio(self.width, self.height)
    }
}

/// A stored original image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub identifier: AssetId,
    #[serde(default)]
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub resource: Resource,
    #[serde(default)]
    pub variants: SmallVec<[ImageVariant; 4]>,
    #[serde(default)]
    pub tags: Vec<TagId>,
}

impl ImageRecord {
    pub fn new(identifier: impl Into<AssetId>, width: u32, height: u32, resource: Resource) -> Self {
        Self {
            identifier: identifier.into(),
            label: String::new(),
            width,
            height,
            resource,
            variants: SmallVec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<TagId>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Attach a derived rendering; its back-reference is pointed at `self`.
    pub fn with_variant(
        mut self,
        identifier: impl Into<AssetId>,
        width: u32,
        height: u32,
        resource: Resource,
    ) -> Self {
        self.variants.push(ImageVariant {
            identifier: identifier.into(),
            width,
            height,
            resource,
            original: Some(self.identifier.clone()),
        });
        self
    }

    pub fn aspect_ratio(&self) -> f64 {
        aspect_ratio(self.width, self.height)
    }

    pub fn has_tag(&self, tag: &TagId) -> bool {
        self.tags.contains(tag)
    }

    /// Bytes held by all variants of this image.
    pub fn variants_byte_size(&self) -> u64 {
        self.variants.iter().map(|v| v.resource.byte_size).sum()
    }

    /// Bytes held by the original plus every variant.
    pub fn total_byte_size(&self) -> u64 {
        self.resource.byte_size + self.variants_byte_size()
    }

    /// The reference a content node would hold to point at this image.
    pub fn to_ref(&self) -> ImageRef {
        ImageRef::new(self.identifier.clone(), self.resource.sha1.clone())
    }
}

fn aspect_ratio(width: u32, height: u32) -> f64 {
    if height == 0 {
        0.0
    } else {
        width as f64 / height as f64
    }
}
