//! Capability string grammar.
//!
//! A capability is `entity:action` or `entity:action:*`. The entity and
//! action segments are concrete identifiers or the wildcard `*`. The optional
//! third segment is the scope: when present it must be `*` and broadens the
//! grant from the principal's own resources to all resources.
//!
//! ```text
//! post:delete        delete own posts
//! post:delete:*      delete any post
//! post:*             every action on own posts
//! *:*:*              everything, unscoped
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;
use crate::types::AccessType;

/// The wildcard token, valid in every segment.
pub const WILDCARD: &str = "*";

/// Segment separator.
pub const SEPARATOR: char = ':';

/// The global catch-all capability.
pub const GLOBAL: &str = "*:*:*";

/// Borrowed view of a well-formed capability string.
///
/// Used on the authorization path so that matching never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Parts<'a> {
    pub entity: &'a str,
    pub action: &'a str,
    pub broad: bool,
}

impl<'a> Parts<'a> {
    pub(crate) fn split(capability: &'a str) -> Result<Self, CapabilityError> {
        let mut segments = capability.split(SEPARATOR);
        let entity = segments.next().unwrap_or_default();
        let action = segments.next();
        let scope = segments.next();
        let rest = segments.count();

        let Some(action) = action else {
            return Err(CapabilityError::SegmentCount {
                capability: capability.to_string(),
                found: 1,
            });
        };
        if rest > 0 {
            return Err(CapabilityError::SegmentCount {
                capability: capability.to_string(),
                found: 3 + rest,
            });
        }
        if entity.is_empty() || action.is_empty() || scope.is_some_and(str::is_empty) {
            return Err(CapabilityError::EmptySegment {
                capability: capability.to_string(),
            });
        }
        if let Some(scope) = scope {
            if scope != WILDCARD {
                return Err(CapabilityError::InvalidScope {
                    capability: capability.to_string(),
                    scope: scope.to_string(),
                });
            }
        }

        Ok(Self {
            entity,
            action,
            broad: scope.is_some(),
        })
    }

    pub(crate) fn covers(&self, entity: &str, action: &str) -> bool {
        (self.entity == WILDCARD || self.entity == entity)
            && (self.action == WILDCARD || self.action == action)
    }

    pub(crate) fn tier(&self) -> AccessType {
        if self.broad {
            AccessType::All
        } else {
            AccessType::Own
        }
    }
}

/// A validated capability.
///
/// Serializes as its string form, so stores and configuration files only
/// ever see `entity:action[:*]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Capability {
    entity: String,
    action: String,
    broad: bool,
}

impl Capability {
    /// A narrow capability: `entity:action`.
    pub fn new(
        entity: impl Into<String>,
        action: impl Into<String>,
    ) -> Result<Self, CapabilityError> {
        Self::build(entity.into(), action.into(), false)
    }

    /// A broadened capability: `entity:action:*`.
    pub fn broad(
        entity: impl Into<String>,
        action: impl Into<String>,
    ) -> Result<Self, CapabilityError> {
        Self::build(entity.into(), action.into(), true)
    }

    /// The global catch-all `*:*:*`.
    pub fn global() -> Self {
        Self {
            entity: WILDCARD.to_string(),
            action: WILDCARD.to_string(),
            broad: true,
        }
    }

    /// Parse a capability string, rejecting anything malformed.
    pub fn parse(capability: &str) -> Result<Self, CapabilityError> {
        let parts = Parts::split(capability)?;
        Ok(Self {
            entity: parts.entity.to_string(),
            action: parts.action.to_string(),
            broad: parts.broad,
        })
    }

    fn build(entity: String, action: String, broad: bool) -> Result<Self, CapabilityError> {
        if entity.is_empty() || action.is_empty() {
            return Err(CapabilityError::EmptySegment {
                capability: format!("{entity}{SEPARATOR}{action}"),
            });
        }
        if let Some(segment) = [&entity, &action].into_iter().find(|s| s.contains(SEPARATOR)) {
            return Err(CapabilityError::SeparatorInSegment {
                segment: segment.clone(),
            });
        }
        Ok(Self {
            entity,
            action,
            broad,
        })
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Whether the scope segment is present.
    pub fn is_broad(&self) -> bool {
        self.broad
    }

    /// The tier this capability contributes when it matches a request.
    pub fn tier(&self) -> AccessType {
        self.parts().tier()
    }

    /// Whether some registry could derive this capability.
    ///
    /// Derivation only ever emits concrete-entity capabilities plus `*:*:*`,
    /// so `*:delete` or `*:*` are grammatical yet can never be catalogued.
    pub fn is_derivable(&self) -> bool {
        self.entity != WILDCARD || (self.action == WILDCARD && self.broad)
    }

    /// Whether this capability applies to the requested entity and action.
    pub fn covers(&self, entity: &str, action: &str) -> bool {
        self.parts().covers(entity, action)
    }

    fn parts(&self) -> Parts<'_> {
        Parts {
            entity: &self.entity,
            action: &self.action,
            broad: self.broad,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.entity, self.action)?;
        if self.broad {
            write!(f, "{SEPARATOR}{WILDCARD}")?;
        }
        Ok(())
    }
}

impl FromStr for Capability {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Capability {
    type Error = CapabilityError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Capability> for String {
    fn from(capability: Capability) -> Self {
        capability.to_string()
    }
}
