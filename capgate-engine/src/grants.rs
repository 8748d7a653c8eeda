//! Grant set helpers shared by store backends.

use crate::capability::Parts;
use crate::types::CapabilitySet;

/// Merge a principal's direct grants with the grants of its roles.
///
/// Stores call this when answering [`GrantStore::grants`] so the matcher
/// always sees one flat, duplicate-free set.
///
/// [`GrantStore::grants`]: crate::GrantStore::grants
pub fn merge_grants<'a, R>(direct: &CapabilitySet, roles: R) -> CapabilitySet
where
    R: IntoIterator<Item = &'a CapabilitySet>,
{
    let mut merged = direct.clone();
    for role in roles {
        merged.extend(role.iter().cloned());
    }
    merged
}

/// Split grants into the ones still in effect and the ones that are not.
///
/// A grant is in effect when it parses and the catalog still lists it.
/// Returns `(effective, ignored)`.
pub fn partition_effective(
    grants: CapabilitySet,
    catalog: &CapabilitySet,
) -> (CapabilitySet, CapabilitySet) {
    grants
        .into_iter()
        .partition(|grant| Parts::split(grant).is_ok() && catalog.contains(grant))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> CapabilitySet {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_unions_direct_and_roles() {
        let direct = set(&["comment:delete"]);
        let editor = set(&["post:*", "comment:delete"]);
        let reviewer = set(&["post:publish:*"]);

        let merged = merge_grants(&direct, [&editor, &reviewer]);
        assert_eq!(merged, set(&["comment:delete", "post:*", "post:publish:*"]));
    }

    #[test]
    fn test_merge_without_roles() {
        let direct = set(&["post:delete"]);
        let no_roles: [&CapabilitySet; 0] = [];
        assert_eq!(merge_grants(&direct, no_roles), direct);
    }

    #[test]
    fn test_partition_drops_stale_and_malformed() {
        let grants = set(&["post:delete", "post:publish", "garbage", "*:*:*"]);
        let catalog = set(&["post:delete", "post:*", "*:*:*"]);

        let (effective, ignored) = partition_effective(grants, &catalog);
        assert_eq!(effective, set(&["post:delete", "*:*:*"]));
        assert_eq!(ignored, set(&["garbage", "post:publish"]));
    }
}
