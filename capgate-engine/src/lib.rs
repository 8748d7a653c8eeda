//! # capgate engine
//!
//! Core permission engine for capgate.
//!
//! This crate provides:
//! - A grammar for hierarchical, wildcard-bearing capability strings
//!   (`entity:action` and `entity:action:*`)
//! - A pure matcher resolving a grant set to an [`AccessType`] tier
//! - A [`Registry`] of gated operations and derivation of the legal
//!   capability set from it
//! - Reconciliation of the legal set against a persisted catalog
//! - `GrantStore` and `CatalogStore` traits for pluggable storage
//! - [`PermissionEngine`], which ties these together

pub mod capability;
pub mod engine;
pub mod error;
pub mod grants;
pub mod matcher;
pub mod reconcile;
pub mod registry;
pub mod types;

pub use capability::{Capability, GLOBAL, WILDCARD};
pub use engine::PermissionEngine;
pub use error::{CapabilityError, EngineError, StoreError};
pub use grants::{merge_grants, partition_effective};
pub use matcher::resolve_access;
pub use reconcile::{ReconcileDelta, reconcile};
pub use registry::{RegisterPermissions, Registry, derive_legal_permissions};
pub use types::{
    AccessScope, AccessType, CapabilitySet, CatalogStore, GrantStore, Principal, RegistryEntry,
    SyncReport,
};
