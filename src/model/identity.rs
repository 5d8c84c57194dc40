//! Resource identity: the key that decides whether a stored image is live.
//!
//! Two observations of "the same binary" can be compared by the record's
//! opaque identifier or by the content hash of its blob. Whichever is chosen,
//! the key that fills the live set and the key that tests a stored record
//! must be derived the same way. This module makes that structural:
//!
//! - [`ResourceIdentity`] can only be produced by [`IdentityPolicy::identity_of`].
//! - [`LiveSet`] owns its policy and derives keys itself on insert and lookup,
//!   so callers hand it records, never strings.

use std::fmt;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use super::{AssetId, ImageRecord, ImageRef};

/// How two image observations are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityPolicy {
    /// Stable, system-assigned record identifier.
    #[default]
    Identifier,
    /// Content hash of the underlying blob. Byte-identical uploads collapse
    /// to one identity: referencing either keeps both.
    ResourceHash,
}

impl IdentityPolicy {
    pub fn identity_of<R: ResourceOwner + ?Sized>(self, owner: &R) -> ResourceIdentity {
        match self {
            IdentityPolicy::Identifier => ResourceIdentity(owner.asset_id().0.clone()),
            IdentityPolicy::ResourceHash => ResourceIdentity(owner.resource_hash().to_owned()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IdentityPolicy::Identifier => "identifier",
            IdentityPolicy::ResourceHash => "resource-hash",
        }
    }
}

impl fmt::Display for IdentityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IdentityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identifier" => Ok(IdentityPolicy::Identifier),
            "resource-hash" => Ok(IdentityPolicy::ResourceHash),
            other => Err(format!("unknown identity policy '{other}' (expected identifier or resource-hash)")),
        }
    }
}

/// Anything that names a stored original image: the graph-side [`ImageRef`]
/// and the store-side [`ImageRecord`].
pub trait ResourceOwner {
    fn asset_id(&self) -> &AssetId;
    fn resource_hash(&self) -> &str;
}

impl ResourceOwner for ImageRef {
    fn asset_id(&self) -> &AssetId { &self.identifier }
    fn resource_hash(&self) -> &str { &self.resource_hash }
}

impl ResourceOwner for ImageRecord {
    fn asset_id(&self) -> &AssetId { &self.identifier }
    fn resource_hash(&self) -> &str { &self.resource.sha1 }
}

/// Liveness key. Opaque outside this module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity(String);

impl ResourceIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identities reachable from the content graph in the current run.
#[derive(Debug, Clone)]
pub struct LiveSet {
    policy: IdentityPolicy,
    keys: HashSet<ResourceIdentity>,
}

impl LiveSet {
    pub fn new(policy: IdentityPolicy) -> Self {
        Self { policy, keys: HashSet::new() }
    }

    pub fn policy(&self) -> IdentityPolicy {
        self.policy
    }

    /// Returns true if the identity was not present yet.
    pub fn insert<R: ResourceOwner + ?Sized>(&mut self, owner: &R) -> bool {
        self.keys.insert(self.policy.identity_of(owner))
    }

    /// Insert an identity already derived by the resolver.
    ///
    /// Only identities derived under this set's policy may be passed.
    pub(crate) fn insert_identity(&mut self, identity: ResourceIdentity) -> bool {
        self.keys.insert(identity)
    }

    pub fn contains<R: ResourceOwner + ?Sized>(&self, owner: &R) -> bool {
        self.keys.contains(&self.policy.identity_of(owner))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceIdentity> {
        self.keys.iter()
    }
}
