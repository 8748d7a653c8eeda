//! Catalog reconciliation.
//!
//! Diffs the derived legal set against the persisted catalog. The delta is
//! plain data; applying it to a [`CatalogStore`] is the only step that does
//! I/O. The add batch and the remove batch are independent: either can fail
//! and be retried without the other, and running [`reconcile`] again after a
//! partial apply yields exactly the work still outstanding.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::{CapabilitySet, CatalogStore};

/// Changes needed to bring a catalog in line with the legal set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileDelta {
    /// Legal capabilities missing from the catalog.
    pub to_add: CapabilitySet,
    /// Catalog entries that are no longer legal.
    pub to_remove: CapabilitySet,
}

impl ReconcileDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Whether applying the delta drops capabilities principals may hold.
    ///
    /// Removed capabilities are not migrated: a renamed action shows up as
    /// one addition and one removal, and every grant on the old name stops
    /// taking effect.
    pub fn is_lossy(&self) -> bool {
        !self.to_remove.is_empty()
    }

    /// Apply the delta to an in-memory catalog snapshot.
    pub fn apply_to(&self, catalog: &mut CapabilitySet) {
        catalog.extend(self.to_add.iter().cloned());
        catalog.retain(|cap| !self.to_remove.contains(cap));
    }

    /// Apply the delta to a catalog store: additions first, then removals.
    ///
    /// If either batch fails the error is returned as-is. The catalog is then
    /// in one of the states "some additions applied" or "all additions and
    /// some removals applied", and reconciling again finishes the job.
    pub fn apply(&self, catalog: &dyn CatalogStore) -> Result<(), StoreError> {
        if self.is_lossy() {
            tracing::warn!(
                removed = self.to_remove.len(),
                added = self.to_add.len(),
                capabilities = ?self.to_remove,
                "reconcile: removing capabilities from catalog; grants on them lose effect"
            );
        }

        if !self.to_add.is_empty() {
            catalog.add_all(&self.to_add)?;
            tracing::debug!(count = self.to_add.len(), "reconcile: add batch applied");
        }
        if !self.to_remove.is_empty() {
            catalog.remove_all(&self.to_remove)?;
            tracing::debug!(count = self.to_remove.len(), "reconcile: remove batch applied");
        }
        Ok(())
    }
}

/// Compute `legal − persisted` and `persisted − legal`.
pub fn reconcile(legal: &CapabilitySet, persisted: &CapabilitySet) -> ReconcileDelta {
    ReconcileDelta {
        to_add: legal.difference(persisted).cloned().collect(),
        to_remove: persisted.difference(legal).cloned().collect(),
    }
}
