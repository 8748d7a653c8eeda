//! TOML configuration: the operation registry, roles, and users.

use std::collections::HashSet;

use capgate_engine::{Capability, CapabilityError, Registry, RegistryEntry};
use serde::Deserialize;
use thiserror::Error;

/// Errors from configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid grant for {principal}: {source}")]
    InvalidGrant {
        principal: String,
        #[source]
        source: CapabilityError,
    },
    #[error("grant '{capability}' for {principal} can never be in the catalog")]
    UnreachableGrant {
        principal: String,
        capability: String,
    },
    #[error("user '{user}' references undefined role '{role}'")]
    UnknownRole { user: String, role: String },
    #[error("{kind} '{id}' is declared more than once")]
    DuplicatePrincipal { kind: &'static str, id: String },
    #[error("invalid operation '{action}' on entity '{entity}': {source}")]
    InvalidOperation {
        entity: String,
        action: String,
        #[source]
        source: CapabilityError,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionConfig {
    /// Entities and the operations they expose.
    #[serde(default)]
    pub entities: Vec<EntityConfig>,

    /// Roles and their grants.
    #[serde(default)]
    pub roles: Vec<RoleConfig>,

    /// Users, their role memberships, and direct grants.
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// An entity and its operations.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityConfig {
    /// The entity name (e.g., "post", "comment").
    pub name: String,

    #[serde(default)]
    pub actions: Vec<ActionConfig>,
}

/// A single operation on an entity.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    pub name: String,

    /// Whether the operation is gated. Defaults to true.
    #[serde(default = "default_requires_permission")]
    pub requires_permission: bool,

    /// Whether an all-scope grant is meaningful. Defaults to false.
    #[serde(default)]
    pub multilevel: bool,
}

fn default_requires_permission() -> bool {
    true
}

/// A role and the capabilities it grants to its members.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleConfig {
    pub id: String,
    #[serde(default)]
    pub grants: Vec<String>,
}

/// A user, its roles, and its direct grants.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub grants: Vec<String>,
}

impl PermissionConfig {
    /// Load configuration from a TOML file path.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// Every operation must form a capability, every grant must be one a
    /// registry can make legal, role and user ids must be unique, and every
    /// role a user names must be defined.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: PermissionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for entity in &self.entities {
            for action in &entity.actions {
                Capability::new(&entity.name, &action.name).map_err(|source| {
                    ConfigError::InvalidOperation {
                        entity: entity.name.clone(),
                        action: action.name.clone(),
                        source,
                    }
                })?;
            }
        }

        unique("role", self.roles.iter().map(|r| r.id.as_str()))?;
        unique("user", self.users.iter().map(|u| u.id.as_str()))?;

        for role in &self.roles {
            check_grants(format!("role '{}'", role.id), &role.grants)?;
        }

        let known: HashSet<&str> = self.roles.iter().map(|r| r.id.as_str()).collect();
        for user in &self.users {
            check_grants(format!("user '{}'", user.id), &user.grants)?;
            if let Some(role) = user.roles.iter().find(|r| !known.contains(r.as_str())) {
                return Err(ConfigError::UnknownRole {
                    user: user.id.clone(),
                    role: role.clone(),
                });
            }
        }
        Ok(())
    }

    /// Build the operation registry declared by `[[entities]]`.
    pub fn registry(&self) -> Registry {
        self.entities
            .iter()
            .flat_map(|entity| {
                entity.actions.iter().map(|action| RegistryEntry {
                    entity: entity.name.clone(),
                    action: action.name.clone(),
                    requires_permission: action.requires_permission,
                    multilevel: action.multilevel,
                })
            })
            .collect()
    }
}

fn unique<'a>(
    kind: &'static str,
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    match ids.into_iter().find(|id| !seen.insert(*id)) {
        Some(id) => Err(ConfigError::DuplicatePrincipal {
            kind,
            id: id.to_string(),
        }),
        None => Ok(()),
    }
}

fn check_grants(principal: String, grants: &[String]) -> Result<(), ConfigError> {
    for grant in grants {
        let capability = match Capability::parse(grant) {
            Ok(capability) => capability,
            Err(source) => return Err(ConfigError::InvalidGrant { principal, source }),
        };
        if !capability.is_derivable() {
            return Err(ConfigError::UnreachableGrant {
                principal,
                capability: grant.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[entities]]
name = "post"
actions = [
    { name = "delete", multilevel = true },
    { name = "publish" },
    { name = "view", requires_permission = false },
]

[[roles]]
id = "editor"
grants = ["post:*"]

[[users]]
id = "alice"
roles = ["editor"]
grants = ["post:delete:*"]
"#;

    #[test]
    fn test_parse_sample() {
        let config = PermissionConfig::parse(SAMPLE).expect("Failed to parse sample");
        assert_eq!(config.entities.len(), 1);
        assert_eq!(config.entities[0].actions.len(), 3);
        assert!(config.entities[0].actions[0].multilevel);
        assert!(config.entities[0].actions[1].requires_permission);
        assert!(!config.entities[0].actions[2].requires_permission);
        assert_eq!(config.users[0].roles, vec!["editor".to_string()]);
    }

    #[test]
    fn test_registry_from_config() {
        let config = PermissionConfig::parse(SAMPLE).expect("parse");
        let registry = config.registry();
        assert_eq!(registry.len(), 3);

        let legal = registry.legal_permissions();
        assert!(legal.contains("post:delete:*"));
        assert!(legal.contains("post:publish"));
        assert!(!legal.contains("post:view"));
    }

    #[test]
    fn test_empty_config() {
        let config = PermissionConfig::parse("").expect("parse");
        assert!(config.registry().is_empty());
    }

    #[test]
    fn test_rejects_malformed_grant() {
        let err = PermissionConfig::parse(
            r#"
[[roles]]
id = "editor"
grants = ["post:delete:own"]
"#,
        )
        .expect_err("Should reject");
        assert!(matches!(err, ConfigError::InvalidGrant { .. }));
        assert!(err.to_string().contains("role 'editor'"));
    }

    #[test]
    fn test_rejects_unknown_role() {
        let err = PermissionConfig::parse(
            r#"
[[users]]
id = "bob"
roles = ["ghost"]
"#,
        )
        .expect_err("Should reject");
        assert!(matches!(err, ConfigError::UnknownRole { ref role, .. } if role == "ghost"));
    }

    #[test]
    fn test_rejects_grants_no_registry_derives() {
        for grant in ["*:delete", "*:delete:*", "*:*"] {
            let err = PermissionConfig::parse(&format!(
                "[[users]]\nid = \"bob\"\ngrants = [\"{grant}\"]\n"
            ))
            .expect_err("Should reject");
            assert!(
                matches!(err, ConfigError::UnreachableGrant { ref capability, .. } if capability == grant),
                "{grant}: {err}"
            );
            assert!(err.to_string().contains("user 'bob'"));
        }

        let config = PermissionConfig::parse("[[users]]\nid = \"root\"\ngrants = [\"*:*:*\"]\n")
            .expect("global grant is always legal");
        assert_eq!(config.users[0].grants, vec!["*:*:*".to_string()]);
    }

    #[test]
    fn test_rejects_duplicate_principals() {
        let err = PermissionConfig::parse(
            r#"
[[roles]]
id = "editor"
grants = ["post:*"]

[[roles]]
id = "editor"
grants = ["post:delete"]
"#,
        )
        .expect_err("Should reject");
        assert!(matches!(
            err,
            ConfigError::DuplicatePrincipal { kind: "role", ref id } if id == "editor"
        ));

        let err = PermissionConfig::parse(
            r#"
[[users]]
id = "alice"
grants = ["post:delete"]

[[users]]
id = "alice"
"#,
        )
        .expect_err("Should reject");
        assert!(matches!(err, ConfigError::DuplicatePrincipal { kind: "user", .. }));
        assert_eq!(err.to_string(), "user 'alice' is declared more than once");
    }

    #[test]
    fn test_role_and_user_may_share_an_id() {
        let config = PermissionConfig::parse(
            r#"
[[roles]]
id = "admin"

[[users]]
id = "admin"
roles = ["admin"]
"#,
        )
        .expect("roles and users are separate namespaces");
        assert_eq!(config.users.len(), 1);
    }

    #[test]
    fn test_rejects_invalid_operation_names() {
        let cases = [
            (r#"name = "po:st""#, r#"[{ name = "delete" }]"#),
            (r#"name = """#, r#"[{ name = "delete" }]"#),
            (r#"name = "post""#, r#"[{ name = "a:b" }]"#),
            (r#"name = "post""#, r#"[{ name = "", requires_permission = false }]"#),
        ];
        for (name, actions) in cases {
            let toml = format!("[[entities]]\n{name}\nactions = {actions}\n");
            let err = PermissionConfig::parse(&toml).expect_err("Should reject");
            assert!(
                matches!(err, ConfigError::InvalidOperation { .. }),
                "{toml}: {err}"
            );
        }
    }

    #[test]
    fn test_rejects_bad_toml() {
        let err = PermissionConfig::parse("[[entities]\nname = 1").expect_err("Should reject");
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
