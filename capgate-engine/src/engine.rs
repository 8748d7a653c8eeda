//! The permission engine: orchestrates grant lookup, access resolution,
//! grant administration, and catalog synchronization.

use std::sync::{Mutex, TryLockError};

use crate::capability::Capability;
use crate::error::EngineError;
use crate::grants::partition_effective;
use crate::matcher::resolve_access;
use crate::reconcile::{ReconcileDelta, reconcile};
use crate::registry::Registry;
use crate::types::{
    AccessScope, AccessType, CapabilitySet, CatalogStore, GrantStore, Principal, SyncReport,
};

/// The permission engine.
///
/// Generic over the grant store and the catalog store so that in-memory,
/// file-backed, or database-backed storage can be plugged in.
///
/// Nothing is cached between checks: every call to
/// [`resolve_access`](Self::resolve_access) reads the principal's grants and
/// the catalog afresh, since either may change between requests.
pub struct PermissionEngine<G: GrantStore, C: CatalogStore> {
    grants: G,
    catalog: C,
    sync_lock: Mutex<()>,
}

impl<G: GrantStore, C: CatalogStore> PermissionEngine<G, C> {
    /// Create a new engine over a grant store and a catalog store.
    pub fn new(grants: G, catalog: C) -> Self {
        Self {
            grants,
            catalog,
            sync_lock: Mutex::new(()),
        }
    }

    /// Get a reference to the grant store.
    pub fn grant_store(&self) -> &G {
        &self.grants
    }

    /// Get a reference to the catalog store.
    pub fn catalog_store(&self) -> &C {
        &self.catalog
    }

    // =========================================================================
    // Authorization
    // =========================================================================

    /// Resolve the principal's tier for `(entity, action)`.
    ///
    /// Grants that are malformed or no longer in the catalog are ignored.
    pub fn resolve_access(
        &self,
        principal: &Principal,
        entity: &str,
        action: &str,
    ) -> Result<AccessType, EngineError> {
        let grants = self.grants.grants(principal)?;
        let catalog = self.catalog.load()?;
        let (effective, ignored) = partition_effective(grants, &catalog);

        if !ignored.is_empty() {
            tracing::warn!(
                %principal,
                ignored = ?ignored,
                "engine: ignoring grants that are malformed or not in the catalog"
            );
        }

        let tier = resolve_access(&effective, entity, action);
        tracing::debug!(%principal, entity, action, %tier, "engine: access resolved");
        Ok(tier)
    }

    /// Resolve access and turn [`AccessType::None`] into an error.
    ///
    /// On success the returned scope tells the caller whether to restrict the
    /// operation to resources owned by `principal`.
    pub fn authorize(
        &self,
        principal: &Principal,
        entity: &str,
        action: &str,
    ) -> Result<AccessScope, EngineError> {
        self.resolve_access(principal, entity, action)?
            .scope_for(principal)
            .ok_or_else(|| EngineError::AccessDenied {
                principal: principal.clone(),
                entity: entity.to_string(),
                action: action.to_string(),
            })
    }

    // =========================================================================
    // Grant administration
    // =========================================================================

    /// Grant a capability to a user or role.
    ///
    /// The capability must parse and must be present in the catalog.
    /// Returns `false` if the principal already held it.
    pub fn assign(&self, principal: &Principal, capability: &str) -> Result<bool, EngineError> {
        let capability = self.checked(capability)?;
        let added = self.grants.assign(principal, &capability)?;
        if added {
            tracing::info!(%principal, %capability, "engine: capability assigned");
        }
        Ok(added)
    }

    /// Remove a capability from a user or role.
    ///
    /// Not validated, so stale or malformed grants can always be removed.
    pub fn revoke(&self, principal: &Principal, capability: &str) -> Result<bool, EngineError> {
        let removed = self.grants.revoke(principal, capability)?;
        if removed {
            tracing::info!(%principal, capability, "engine: capability revoked");
        }
        Ok(removed)
    }

    /// Replace a principal's direct grants.
    ///
    /// Every capability is validated before anything is written; one bad
    /// entry rejects the whole batch.
    pub fn replace<S: AsRef<str>>(
        &self,
        principal: &Principal,
        capabilities: &[S],
    ) -> Result<(), EngineError> {
        let catalog = self.catalog.load()?;
        let validated = capabilities
            .iter()
            .map(|c| Self::validate(c.as_ref(), &catalog))
            .collect::<Result<Vec<_>, _>>()?;

        self.grants.replace(principal, &validated)?;
        tracing::info!(%principal, count = validated.len(), "engine: grants replaced");
        Ok(())
    }

    fn checked(&self, capability: &str) -> Result<Capability, EngineError> {
        let parsed = Capability::parse(capability)?;
        if !self.catalog.contains(capability)? {
            return Err(EngineError::UnknownCapability(capability.to_string()));
        }
        Ok(parsed)
    }

    fn validate(capability: &str, catalog: &CapabilitySet) -> Result<Capability, EngineError> {
        let parsed = Capability::parse(capability)?;
        if !catalog.contains(capability) {
            return Err(EngineError::UnknownCapability(capability.to_string()));
        }
        Ok(parsed)
    }

    // =========================================================================
    // Catalog synchronization
    // =========================================================================

    /// Compute the delta between the registry and the catalog without
    /// applying it.
    pub fn plan_sync(&self, registry: &Registry) -> Result<ReconcileDelta, EngineError> {
        let legal = registry.legal_permissions();
        let persisted = self.catalog.load()?;
        Ok(reconcile(&legal, &persisted))
    }

    /// Synchronize the catalog with the registry.
    ///
    /// Derives the legal set, reconciles it against the catalog, applies the
    /// delta, and reports what changed. Runs are serialized within this
    /// engine; a second concurrent call fails with
    /// [`EngineError::SyncInProgress`] instead of racing the first.
    ///
    /// After a failure, calling this again completes the outstanding work.
    pub fn synchronize(&self, registry: &Registry) -> Result<SyncReport, EngineError> {
        self.run_sync(registry, false)
    }

    /// Like [`synchronize`](Self::synchronize), but leaves the catalog
    /// untouched.
    pub fn preview_sync(&self, registry: &Registry) -> Result<SyncReport, EngineError> {
        self.run_sync(registry, true)
    }

    fn run_sync(&self, registry: &Registry, dry_run: bool) -> Result<SyncReport, EngineError> {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        let _guard = match self.sync_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(EngineError::SyncInProgress),
        };

        let delta = self.plan_sync(registry)?;
        if !dry_run {
            delta.apply(&self.catalog)?;
        }

        tracing::info!(
            added = delta.to_add.len(),
            removed = delta.to_remove.len(),
            dry_run,
            "engine: permission catalog synchronized"
        );

        Ok(SyncReport {
            added: delta.to_add,
            removed: delta.to_remove,
            dry_run,
        })
    }
}
