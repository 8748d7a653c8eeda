//! Core types for the permission engine.
//!
//! Provides principals, access tiers, registry entries, and the `GrantStore`
//! and `CatalogStore` traits that storage backends implement.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::StoreError;

/// A set of capability strings.
///
/// Used both for a principal's grants and for the permission catalog. Kept
/// as raw strings: stored grants are not trusted to be well-formed.
pub type CapabilitySet = BTreeSet<String>;

/// A principal that can hold grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Principal {
    User(String),
    Role(String),
}

impl Principal {
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    pub fn role(id: impl Into<String>) -> Self {
        Self::Role(id.into())
    }

    pub fn id(&self) -> &str {
        match self {
            Principal::User(id) | Principal::Role(id) => id,
        }
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Principal::User(id) => write!(f, "user '{id}'"),
            Principal::Role(id) => write!(f, "role '{id}'"),
        }
    }
}

/// Outcome of an authorization check.
///
/// Ordered: `None < Own < All`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// The operation is rejected.
    #[default]
    None,
    /// Permitted on resources owned by the requesting principal.
    Own,
    /// Permitted on any resource.
    All,
}

impl AccessType {
    pub fn is_permitted(self) -> bool {
        self > AccessType::None
    }

    /// Translate the tier into the scope the caller must apply.
    ///
    /// `None` yields no scope: the caller rejects the operation.
    pub fn scope_for(self, principal: &Principal) -> Option<AccessScope> {
        match self {
            AccessType::None => None,
            AccessType::Own => Some(AccessScope::Owned {
                owner: principal.clone(),
            }),
            AccessType::All => Some(AccessScope::Unrestricted),
        }
    }
}

impl std::fmt::Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AccessType::None => "none",
            AccessType::Own => "own",
            AccessType::All => "all",
        };
        f.write_str(name)
    }
}

/// How a permitted operation must be constrained.
///
/// The engine never applies this itself. Callers turn `Owned` into an
/// owner predicate on whatever read or write they perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    /// Restrict to resources whose owner is `owner`.
    Owned { owner: Principal },
    /// No restriction.
    Unrestricted,
}

impl AccessScope {
    /// The owner the caller must filter on, if any.
    pub fn owner(&self) -> Option<&Principal> {
        match self {
            AccessScope::Owned { owner } => Some(owner),
            AccessScope::Unrestricted => None,
        }
    }

    /// Whether a resource owned by `owner` falls inside this scope.
    pub fn admits(&self, owner: &Principal) -> bool {
        match self {
            AccessScope::Owned { owner: required } => required == owner,
            AccessScope::Unrestricted => true,
        }
    }
}

/// One gated operation exposed by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub entity: String,
    pub action: String,
    /// Whether the operation is gated at all. Ungated entries contribute
    /// nothing to the legal set.
    pub requires_permission: bool,
    /// Whether an all-scope (`:*`) grant is meaningful for the operation.
    pub multilevel: bool,
}

impl RegistryEntry {
    /// A gated, single-level operation.
    pub fn gated(entity: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            action: action.into(),
            requires_permission: true,
            multilevel: false,
        }
    }

    /// An operation that anyone may perform.
    pub fn open(entity: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            requires_permission: false,
            ..Self::gated(entity, action)
        }
    }

    /// Mark the operation as supporting all-scope grants.
    pub fn multilevel(mut self) -> Self {
        self.multilevel = true;
        self
    }
}

/// Summary of a synchronize run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Capabilities inserted into the catalog.
    pub added: CapabilitySet,
    /// Capabilities deleted from the catalog. Grants naming them stop
    /// taking effect.
    pub removed: CapabilitySet,
    /// True when the delta was computed but not applied.
    pub dry_run: bool,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Per-principal grant storage.
///
/// Implementations must be `Send + Sync`; reads happen on every
/// authorization check.
pub trait GrantStore: Send + Sync {
    /// The principal's effective grants: direct grants merged with those of
    /// every role the principal belongs to.
    fn grants(&self, principal: &Principal) -> Result<CapabilitySet, StoreError>;

    /// Add a grant. Returns `false` if the principal already held it.
    fn assign(&self, principal: &Principal, capability: &Capability) -> Result<bool, StoreError>;

    /// Remove a grant by its stored string. Returns `false` if absent.
    ///
    /// Takes a raw string so that malformed or stale rows can be cleaned up.
    fn revoke(&self, principal: &Principal, capability: &str) -> Result<bool, StoreError>;

    /// Replace the principal's direct grants wholesale.
    fn replace(&self, principal: &Principal, grants: &[Capability]) -> Result<(), StoreError>;
}

/// The persisted catalog of legal capabilities.
///
/// Add and remove are separate batches so either can be retried on its own.
pub trait CatalogStore: Send + Sync {
    /// Read the full catalog.
    fn load(&self) -> Result<CapabilitySet, StoreError>;

    /// Insert every capability in the batch. Already-present entries are
    /// not an error.
    fn add_all(&self, capabilities: &CapabilitySet) -> Result<(), StoreError>;

    /// Delete every capability in the batch. Absent entries are not an
    /// error.
    fn remove_all(&self, capabilities: &CapabilitySet) -> Result<(), StoreError>;

    /// Whether a single capability is in the catalog.
    fn contains(&self, capability: &str) -> Result<bool, StoreError> {
        Ok(self.load()?.contains(capability))
    }
}
