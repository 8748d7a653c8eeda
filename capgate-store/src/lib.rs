//! # capgate store
//!
//! Storage backends and configuration for the capgate permission engine.
//!
//! Provides TOML configuration for declaring entities, roles, and users, an
//! in-memory grant store, and in-memory and JSON-file catalog stores.

mod catalog;
mod config;
mod memory;

pub use catalog::{FileCatalogStore, MemoryCatalogStore};
pub use config::{
    ActionConfig, ConfigError, EntityConfig, PermissionConfig, RoleConfig, UserConfig,
};
pub use memory::MemoryGrantStore;
