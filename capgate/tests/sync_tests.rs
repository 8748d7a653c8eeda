//! End-to-end tests: TOML config, file-backed catalog, and the engine.

use capgate::{
    AccessType, CatalogStore, EngineError, FileCatalogStore, MemoryGrantStore, PermissionConfig,
    PermissionEngine, Principal,
};

const CONFIG: &str = r#"
[[entities]]
name = "post"
actions = [
    { name = "delete", multilevel = true },
    { name = "publish" },
    { name = "view", requires_permission = false },
]

[[entities]]
name = "comment"
actions = [{ name = "delete", multilevel = true }]

[[roles]]
id = "author"
grants = ["post:delete", "post:publish"]

[[roles]]
id = "moderator"
grants = ["comment:*:*"]

[[users]]
id = "alice"
roles = ["author"]

[[users]]
id = "mod"
roles = ["author", "moderator"]
grants = ["post:delete:*"]

[[users]]
id = "root"
grants = ["*:*:*"]
"#;

fn engine_with(
    config: &PermissionConfig,
    dir: &tempfile::TempDir,
) -> PermissionEngine<MemoryGrantStore, FileCatalogStore> {
    PermissionEngine::new(
        MemoryGrantStore::from_config(config),
        FileCatalogStore::new(dir.path().join("catalog.json")),
    )
}

#[test]
fn test_tiers_after_sync() {
    let config = PermissionConfig::parse(CONFIG).expect("Failed to parse config");
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_with(&config, &dir);
    engine.synchronize(&config.registry()).expect("Should sync");

    let alice = Principal::user("alice");
    let moderator = Principal::user("mod");
    let root = Principal::user("root");

    let cases = [
        (&alice, "post", "delete", AccessType::Own),
        (&alice, "post", "publish", AccessType::Own),
        (&alice, "comment", "delete", AccessType::None),
        (&moderator, "post", "delete", AccessType::All),
        (&moderator, "post", "publish", AccessType::Own),
        (&moderator, "comment", "delete", AccessType::All),
        (&root, "anything", "at-all", AccessType::All),
    ];
    for (principal, entity, action, expected) in cases {
        assert_eq!(
            engine
                .resolve_access(principal, entity, action)
                .expect("Should resolve"),
            expected,
            "{principal} {entity}:{action}"
        );
    }
}

#[test]
fn test_unsynced_catalog_grants_nothing() {
    let config = PermissionConfig::parse(CONFIG).expect("parse");
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_with(&config, &dir);

    let tier = engine
        .resolve_access(&Principal::user("root"), "post", "delete")
        .expect("Should resolve");
    assert_eq!(tier, AccessType::None);
}

#[test]
fn test_catalog_file_survives_restart() {
    let config = PermissionConfig::parse(CONFIG).expect("parse");
    let dir = tempfile::tempdir().expect("tempdir");

    let first = engine_with(&config, &dir);
    let report = first.synchronize(&config.registry()).expect("Should sync");
    assert_eq!(report.added, config.registry().legal_permissions());

    let second = engine_with(&config, &dir);
    let report = second.synchronize(&config.registry()).expect("Should sync");
    assert!(report.is_noop());
    assert_eq!(
        second.catalog_store().load().expect("load"),
        config.registry().legal_permissions()
    );
}

#[test]
fn test_dropping_an_action_revokes_its_grants() {
    let config = PermissionConfig::parse(CONFIG).expect("parse");
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_with(&config, &dir);
    engine.synchronize(&config.registry()).expect("Should sync");

    let trimmed = PermissionConfig::parse(&CONFIG.replace("    { name = \"publish\" },\n", ""))
        .expect("parse trimmed");
    let report = engine.synchronize(&trimmed.registry()).expect("Should sync");

    assert!(report.added.is_empty());
    assert!(report.removed.contains("post:publish"));
    assert_eq!(report.removed.len(), 1);
    assert_eq!(
        engine
            .resolve_access(&Principal::user("alice"), "post", "publish")
            .expect("resolve"),
        AccessType::None
    );
}

#[test]
fn test_assign_requires_catalog_entry() {
    let config = PermissionConfig::parse(CONFIG).expect("parse");
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_with(&config, &dir);
    engine.synchronize(&config.registry()).expect("Should sync");

    let bob = Principal::user("bob");
    let err = engine
        .assign(&bob, "post:view")
        .expect_err("ungated action has no capability");
    assert!(matches!(err, EngineError::UnknownCapability(_)));

    engine.assign(&bob, "comment:delete").expect("Should assign");
    assert_eq!(
        engine.resolve_access(&bob, "comment", "delete").expect("resolve"),
        AccessType::Own
    );
}

#[test]
fn test_open_multilevel_action_makes_entity_blanket_legal() {
    let config = PermissionConfig::parse(
        r#"
[[entities]]
name = "report"
actions = [{ name = "view", requires_permission = false, multilevel = true }]
"#,
    )
    .expect("parse");
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_with(&config, &dir);
    let report = engine.synchronize(&config.registry()).expect("Should sync");

    let expected: std::collections::BTreeSet<String> =
        ["report:*:*", "*:*:*"].iter().map(|s| s.to_string()).collect();
    assert_eq!(report.added, expected);

    let auditor = Principal::role("auditor");
    engine.assign(&auditor, "report:*:*").expect("Should assign");
    let err = engine
        .assign(&auditor, "report:*")
        .expect_err("no gated action on report");
    assert!(matches!(err, EngineError::UnknownCapability(_)));
}
