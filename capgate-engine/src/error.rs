//! Error types for the permission engine.

use crate::types::Principal;
use thiserror::Error;

/// Errors from parsing a capability string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The string did not have two or three colon-delimited segments.
    #[error("capability '{capability}' has {found} segments, expected 2 or 3")]
    SegmentCount { capability: String, found: usize },

    /// One of the segments was empty (e.g. `post:` or `:delete`).
    #[error("capability '{capability}' has an empty segment")]
    EmptySegment { capability: String },

    /// An entity or action name passed to a constructor contains `:`.
    #[error("segment '{segment}' contains the ':' separator")]
    SeparatorInSegment { segment: String },

    /// The third segment was present but not the wildcard token.
    #[error("capability '{capability}' has scope '{scope}', only '*' is allowed")]
    InvalidScope { capability: String, scope: String },
}

/// Errors from store backends.
///
/// Backends map their own failures (I/O, serialization, poisoned locks)
/// into a message so the engine stays independent of any storage crate.
#[derive(Error, Debug)]
#[error("{backend} store error: {message}")]
pub struct StoreError {
    pub backend: &'static str,
    pub message: String,
}

impl StoreError {
    pub fn new(backend: &'static str, message: impl Into<String>) -> Self {
        Self {
            backend,
            message: message.into(),
        }
    }
}

/// Errors from the permission engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A grant was rejected at the write boundary because it does not parse.
    #[error("malformed capability: {0}")]
    Malformed(#[from] CapabilityError),

    /// A well-formed grant names a capability the catalog does not contain.
    #[error("unknown capability '{0}': not present in the permission catalog")]
    UnknownCapability(String),

    /// The principal holds no grant covering the requested operation.
    #[error("access denied: {principal} cannot perform '{action}' on '{entity}'")]
    AccessDenied {
        principal: Principal,
        entity: String,
        action: String,
    },

    /// Reading or writing a grant or catalog store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Synchronize was invoked while another run held the catalog.
    #[error("permission synchronization already in progress")]
    SyncInProgress,
}
