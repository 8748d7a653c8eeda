//! Access-tier resolution.

use crate::capability::Parts;
use crate::types::AccessType;

/// Resolve the tier a grant set yields for `(entity, action)`.
///
/// A grant matches when its entity segment equals `entity` or is `*`, and
/// its action segment equals `action` or is `*`. A matching grant with the
/// scope segment contributes [`AccessType::All`], without it
/// [`AccessType::Own`]. The result is the highest contribution, or
/// [`AccessType::None`] when nothing matches.
///
/// Malformed grants never match. They are rejected when written, so a
/// corrupt row seen here must not fail the whole check.
pub fn resolve_access<I, S>(grants: I, entity: &str, action: &str) -> AccessType
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut best = AccessType::None;
    for grant in grants {
        let Ok(parts) = Parts::split(grant.as_ref()) else {
            continue;
        };
        if parts.covers(entity, action) {
            best = best.max(parts.tier());
            if best == AccessType::All {
                break;
            }
        }
    }
    best
}
