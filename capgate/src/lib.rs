//! # capgate
//!
//! Convenience crate that re-exports the capgate permission engine together
//! with the default storage backends.
//!
//! For custom storage, depend on `capgate-engine` directly and implement
//! `GrantStore` and `CatalogStore`.
//!
//! # Quick Start
//!
//! ```rust
//! use capgate::{
//!     AccessScope, AccessType, MemoryCatalogStore, MemoryGrantStore, PermissionConfig,
//!     PermissionEngine, Principal,
//! };
//!
//! let config = PermissionConfig::parse(r#"
//!     [[entities]]
//!     name = "post"
//!     actions = [{ name = "delete", multilevel = true }]
//!
//!     [[roles]]
//!     id = "author"
//!     grants = ["post:delete"]
//!
//!     [[users]]
//!     id = "alice"
//!     roles = ["author"]
//! "#).expect("Failed to parse config");
//!
//! let engine = PermissionEngine::new(
//!     MemoryGrantStore::from_config(&config),
//!     MemoryCatalogStore::new(),
//! );
//!
//! // Bring the catalog in line with the declared operations.
//! let report = engine.synchronize(&config.registry()).expect("Failed to sync");
//! assert!(report.added.contains("post:delete:*"));
//!
//! // Alice may delete her own posts only.
//! let alice = Principal::user("alice");
//! assert_eq!(
//!     engine.resolve_access(&alice, "post", "delete").expect("Failed to resolve"),
//!     AccessType::Own,
//! );
//! let scope = engine.authorize(&alice, "post", "delete").expect("Should be permitted");
//! assert_eq!(scope, AccessScope::Owned { owner: alice });
//! ```

// Re-export everything from the engine crate
pub use capgate_engine::*;

// Re-export the default storage backends
pub use capgate_store::{
    ConfigError, FileCatalogStore, MemoryCatalogStore, MemoryGrantStore, PermissionConfig,
};
