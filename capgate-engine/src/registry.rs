//! The registry of gated operations and derivation of the legal capability set.
//!
//! The host application builds a [`Registry`] at startup. Each module that
//! exposes gated operations implements [`RegisterPermissions`] and is
//! installed into the registry explicitly; nothing is discovered at runtime.
//!
//! ```
//! use capgate_engine::{RegisterPermissions, Registry, RegistryEntry};
//!
//! struct Posts;
//!
//! impl RegisterPermissions for Posts {
//!     fn register(registry: &mut Registry) {
//!         registry
//!             .register(RegistryEntry::gated("post", "delete").multilevel())
//!             .register(RegistryEntry::open("post", "view"));
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! registry.install::<Posts>();
//! assert!(registry.legal_permissions().contains("post:delete:*"));
//! ```

use crate::capability::{Capability, GLOBAL, WILDCARD};
use crate::types::{CapabilitySet, RegistryEntry};

/// Implemented by host modules that expose gated operations.
pub trait RegisterPermissions {
    fn register(registry: &mut Registry);
}

/// Every operation the application exposes, gated or not.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one operation.
    pub fn register(&mut self, entry: RegistryEntry) -> &mut Self {
        self.entries.push(entry);
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, entry: RegistryEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Let a module add its operations.
    pub fn install<M: RegisterPermissions>(&mut self) -> &mut Self {
        M::register(self);
        self
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The legal capability set for this registry.
    pub fn legal_permissions(&self) -> CapabilitySet {
        derive_legal_permissions(&self.entries)
    }
}

impl FromIterator<RegistryEntry> for Registry {
    fn from_iter<T: IntoIterator<Item = RegistryEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<RegistryEntry> for Registry {
    fn extend<T: IntoIterator<Item = RegistryEntry>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a RegistryEntry;
    type IntoIter = std::slice::Iter<'a, RegistryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Derive every legal capability string from registry entries.
///
/// For each gated `entity`/`action`:
/// - `entity:action` and `entity:*`
/// - if multilevel, also `entity:action:*`
///
/// Any multilevel entry, gated or not, makes `entity:*:*` legal. `*:*:*` is
/// always present. An ungated single-level entry contributes nothing, so an
/// entity with no gated or multilevel actions gets no blanket capability.
/// Entries whose names cannot form a capability (empty, or containing `:`)
/// are skipped.
///
/// The result depends only on the set of entries, not their order.
pub fn derive_legal_permissions<'a, I>(entries: I) -> CapabilitySet
where
    I: IntoIterator<Item = &'a RegistryEntry>,
{
    let mut legal = CapabilitySet::new();
    legal.insert(GLOBAL.to_string());

    for entry in entries {
        if !entry.requires_permission && !entry.multilevel {
            continue;
        }
        let exact = match Capability::new(&entry.entity, &entry.action) {
            Ok(cap) => cap,
            Err(e) => {
                tracing::warn!(
                    entity = %entry.entity,
                    action = %entry.action,
                    error = %e,
                    "registry: skipping entry that cannot form a capability"
                );
                continue;
            }
        };

        if entry.multilevel {
            legal.insert(format!("{}:{WILDCARD}:{WILDCARD}", entry.entity));
        }
        if !entry.requires_permission {
            continue;
        }
        legal.insert(exact.to_string());
        legal.insert(format!("{}:{WILDCARD}", entry.entity));
        if entry.multilevel {
            legal.insert(format!("{exact}:{WILDCARD}"));
        }
    }

    legal
}
