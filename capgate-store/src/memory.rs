//! In-memory grant store.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use capgate_engine::{Capability, CapabilitySet, GrantStore, Principal, StoreError, merge_grants};

use crate::config::PermissionConfig;

const BACKEND: &str = "memory";

/// Thread-safe, in-memory grant store.
///
/// Holds direct grants for users and roles, plus each user's role
/// memberships. [`GrantStore::grants`] for a user returns the user's direct
/// grants merged with those of every role it belongs to.
#[derive(Debug, Default)]
pub struct MemoryGrantStore {
    /// Direct grants, keyed by principal.
    direct: RwLock<HashMap<Principal, CapabilitySet>>,
    /// Role memberships: user id -> role ids.
    memberships: RwLock<HashMap<String, BTreeSet<String>>>,
}

fn poisoned<T>(context: &'static str) -> impl FnOnce(PoisonError<T>) -> StoreError {
    move |e| {
        tracing::error!("grant_store: {context} lock poisoned: {e}");
        StoreError::new(BACKEND, format!("{context} lock poisoned"))
    }
}

impl MemoryGrantStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the roles, users, and grants of a configuration.
    pub fn from_config(config: &PermissionConfig) -> Self {
        let mut direct = HashMap::new();
        let mut memberships = HashMap::new();

        for role in &config.roles {
            direct.insert(
                Principal::role(role.id.as_str()),
                role.grants.iter().cloned().collect::<CapabilitySet>(),
            );
        }
        for user in &config.users {
            direct.insert(
                Principal::user(user.id.as_str()),
                user.grants.iter().cloned().collect::<CapabilitySet>(),
            );
            memberships.insert(user.id.clone(), user.roles.iter().cloned().collect());
        }

        Self {
            direct: RwLock::new(direct),
            memberships: RwLock::new(memberships),
        }
    }

    /// Add a user to a role. Returns `false` if already a member.
    pub fn add_role(&self, user: &str, role: &str) -> Result<bool, StoreError> {
        let mut memberships = self.memberships.write().map_err(poisoned("memberships"))?;
        Ok(memberships
            .entry(user.to_string())
            .or_default()
            .insert(role.to_string()))
    }

    /// Remove a user from a role. Returns `false` if not a member.
    pub fn remove_role(&self, user: &str, role: &str) -> Result<bool, StoreError> {
        let mut memberships = self.memberships.write().map_err(poisoned("memberships"))?;
        Ok(memberships
            .get_mut(user)
            .is_some_and(|roles| roles.remove(role)))
    }

    /// The roles a user belongs to.
    pub fn roles_of(&self, user: &str) -> Result<BTreeSet<String>, StoreError> {
        let memberships = self.memberships.read().map_err(poisoned("memberships"))?;
        Ok(memberships.get(user).cloned().unwrap_or_default())
    }

    /// A principal's direct grants, without role expansion.
    pub fn direct_grants(&self, principal: &Principal) -> Result<CapabilitySet, StoreError> {
        let direct = self.direct.read().map_err(poisoned("grants"))?;
        Ok(direct.get(principal).cloned().unwrap_or_default())
    }
}

impl GrantStore for MemoryGrantStore {
    fn grants(&self, principal: &Principal) -> Result<CapabilitySet, StoreError> {
        let Principal::User(user) = principal else {
            return self.direct_grants(principal);
        };

        let roles = self.roles_of(user)?;
        let direct = self.direct.read().map_err(poisoned("grants"))?;
        let own = direct.get(principal).cloned().unwrap_or_default();
        let role_grants = roles
            .iter()
            .filter_map(|role| direct.get(&Principal::role(role.as_str())));

        Ok(merge_grants(&own, role_grants))
    }

    fn assign(&self, principal: &Principal, capability: &Capability) -> Result<bool, StoreError> {
        let mut direct = self.direct.write().map_err(poisoned("grants"))?;
        Ok(direct
            .entry(principal.clone())
            .or_default()
            .insert(capability.to_string()))
    }

    fn revoke(&self, principal: &Principal, capability: &str) -> Result<bool, StoreError> {
        let mut direct = self.direct.write().map_err(poisoned("grants"))?;
        Ok(direct
            .get_mut(principal)
            .is_some_and(|grants| grants.remove(capability)))
    }

    fn replace(&self, principal: &Principal, grants: &[Capability]) -> Result<(), StoreError> {
        let mut direct = self.direct.write().map_err(poisoned("grants"))?;
        direct.insert(
            principal.clone(),
            grants.iter().map(ToString::to_string).collect(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> MemoryGrantStore {
        let config = PermissionConfig::parse(
            r#"
[[roles]]
id = "editor"
grants = ["post:*", "comment:delete"]

[[roles]]
id = "moderator"
grants = ["comment:delete:*"]

[[users]]
id = "alice"
roles = ["editor", "moderator"]
grants = ["post:delete:*"]

[[users]]
id = "bob"
"#,
        )
        .expect("Failed to parse test config");

        MemoryGrantStore::from_config(&config)
    }

    fn set(items: &[&str]) -> CapabilitySet {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_user_grants_include_roles() {
        let store = test_store();
        let grants = store.grants(&Principal::user("alice")).expect("grants");
        assert_eq!(
            grants,
            set(&["post:delete:*", "post:*", "comment:delete", "comment:delete:*"])
        );
    }

    #[test]
    fn test_role_grants_are_its_own() {
        let store = test_store();
        let grants = store.grants(&Principal::role("editor")).expect("grants");
        assert_eq!(grants, set(&["post:*", "comment:delete"]));
    }

    #[test]
    fn test_unknown_principal_is_empty() {
        let store = test_store();
        assert!(store.grants(&Principal::user("ghost")).expect("grants").is_empty());
        assert!(store.grants(&Principal::user("bob")).expect("grants").is_empty());
    }

    #[test]
    fn test_role_membership_changes() {
        let store = test_store();
        let bob = Principal::user("bob");

        assert!(store.add_role("bob", "editor").expect("add"));
        assert!(!store.add_role("bob", "editor").expect("add"));
        assert!(store.grants(&bob).expect("grants").contains("post:*"));

        assert!(store.remove_role("bob", "editor").expect("remove"));
        assert!(!store.remove_role("bob", "editor").expect("remove"));
        assert!(store.grants(&bob).expect("grants").is_empty());
    }

    #[test]
    fn test_role_grant_changes_reach_members() {
        let store = test_store();
        let cap = Capability::parse("tag:create").expect("valid");
        store
            .assign(&Principal::role("editor"), &cap)
            .expect("assign");
        assert!(
            store
                .grants(&Principal::user("alice"))
                .expect("grants")
                .contains("tag:create")
        );
    }

    #[test]
    fn test_assign_revoke_replace() {
        let store = MemoryGrantStore::new();
        let bob = Principal::user("bob");
        let cap = Capability::parse("post:delete").expect("valid");

        assert!(store.assign(&bob, &cap).expect("assign"));
        assert!(!store.assign(&bob, &cap).expect("assign"));
        assert!(store.revoke(&bob, "post:delete").expect("revoke"));
        assert!(!store.revoke(&bob, "post:delete").expect("revoke"));

        let batch = [
            Capability::parse("post:*").expect("valid"),
            Capability::parse("comment:edit:*").expect("valid"),
        ];
        store.replace(&bob, &batch).expect("replace");
        assert_eq!(
            store.direct_grants(&bob).expect("direct"),
            set(&["post:*", "comment:edit:*"])
        );
    }
}
