//! # Media Model
//!
//! Clean DTOs shared by the content graph, the asset store and the collector.
//! These types cross every boundary: storage ↔ scanner ↔ sweeper ↔ report.
//!
//! This module holds data only: no I/O and no async.

pub mod node;
pub mod value;
pub mod property_map;
pub mod image;
pub mod tag;
pub mod identity;

pub use node::{ContentNode, NodeId, NodeSlot};
pub use value::{ImageRef, Value, VariantRef};
pub use property_map::{PropertyMap, map_of};
pub use image::{AssetId, ImageRecord, ImageVariant, Resource};
pub use tag::{Tag, TagId};
pub use identity::{IdentityPolicy, LiveSet, ResourceIdentity, ResourceOwner};
