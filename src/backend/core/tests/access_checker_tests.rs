//! Integration tests for role compilation and access evaluation.
//!
//! Tests cover:
//! - Inheritance along a role chain
//! - Wildcard grants
//! - Predicate-guarded rules (sync, fallible and async)
//! - Default role fallback
//! - Predicate faults kept apart from denials
//! - Concurrent evaluation against shared tables
//! - Configuration errors at construction

use paricha_core::acl::{
    compile, AccessChecker, AccessDecision, ActionName, ConfigError, RoleDefinition, Rule,
    ServiceCall,
};
use paricha_core::error::{ErrorCode, ParichaError};
use serde_json::{json, Value};
use std::time::Duration;

fn owner_matches(params: &Value, _call: &ServiceCall) -> bool {
    let owner = params.pointer("/bookmark/user");
    owner.is_some() && owner == params.pointer("/user/id")
}

/// guest -> user -> agent, plus officer -> admin.
fn sample_roles() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition::new("guest").allow("session:create"),
        RoleDefinition::new("user")
            .parent("guest")
            .allow("bookmark:create")
            .allow(Rule::when("bookmark:update", owner_matches)),
        RoleDefinition::new("agent").parent("user").allow("report:list"),
        RoleDefinition::new("officer").allow("case:read"),
        RoleDefinition::new("admin").parent("officer").allow("*"),
    ]
}

fn sample_checker() -> AccessChecker {
    AccessChecker::new(sample_roles()).unwrap()
}

fn call_as(role: &str, method: &str) -> ServiceCall {
    ServiceCall::new(method, json!({ "user": { "role": role } }))
}

async fn decide(checker: &AccessChecker, role: &str, action: &str) -> AccessDecision {
    let call = call_as(role, "unused");
    checker
        .evaluate(role, &ActionName::from(action), &call.params, &call)
        .await
        .unwrap()
}

// ============================================================================
// Inheritance Tests
// ============================================================================

#[tokio::test]
async fn test_grandchild_inherits_root_action() {
    let checker = sample_checker();
    assert_eq!(decide(&checker, "agent", "session:create").await, AccessDecision::Allow);
    assert_eq!(decide(&checker, "agent", "bookmark:create").await, AccessDecision::Allow);
    assert_eq!(decide(&checker, "agent", "report:list").await, AccessDecision::Allow);
}

#[tokio::test]
async fn test_parent_does_not_see_child_actions() {
    let checker = sample_checker();
    let decision = decide(&checker, "guest", "bookmark:create").await;
    assert_eq!(decision, AccessDecision::Deny("Access Denied".to_string()));
    assert_eq!(decision.message(), "Access Denied");
}

#[tokio::test]
async fn test_ancestor_rule_wins_on_shared_action() {
    let checker = AccessChecker::new(vec![
        RoleDefinition::new("guest").allow(Rule::when("post:edit", |_, _| false)),
        RoleDefinition::new("user").parent("guest").allow("post:edit"),
    ])
    .unwrap();

    // The child's unconditional grant is replaced by the parent's guarded one.
    assert!(checker.acl().table("user").unwrap().get("post:edit").unwrap().is_conditional());
    assert!(decide(&checker, "user", "post:edit").await.is_denied());
}

#[test]
fn test_every_role_gets_a_table() {
    let acl = compile(sample_roles()).unwrap();
    let roles: Vec<&str> = acl.roles().into_iter().map(|r| r.as_str()).collect();
    assert_eq!(roles, vec!["admin", "agent", "guest", "officer", "user"]);
    assert_eq!(acl.table("agent").unwrap().len(), 4);
}

// ============================================================================
// Wildcard Tests
// ============================================================================

#[tokio::test]
async fn test_wildcard_grants_any_action() {
    let checker = sample_checker();
    assert!(decide(&checker, "admin", "anything:atall").await.is_granted());
    assert!(decide(&checker, "admin", "case:read").await.is_granted());
    assert!(decide(&checker, "officer", "anything:atall").await.is_denied());
}

#[tokio::test]
async fn test_specific_rule_takes_precedence_over_wildcard() {
    let checker = AccessChecker::new(vec![RoleDefinition::new("ops")
        .allow("*")
        .allow(Rule::when("db:drop", |_, _| false))])
    .unwrap();

    assert!(decide(&checker, "ops", "db:migrate").await.is_granted());
    assert!(decide(&checker, "ops", "db:drop").await.is_denied());
}

#[tokio::test]
async fn test_unknown_role_is_denied_everything() {
    let checker = sample_checker();
    assert!(decide(&checker, "intruder", "session:create").await.is_denied());
}

// ============================================================================
// Conditional Rule Tests
// ============================================================================

#[tokio::test]
async fn test_bookmark_update_requires_ownership() {
    let checker = sample_checker();

    let own = ServiceCall::new(
        "update",
        json!({ "user": { "role": "user", "id": 7 }, "bookmark": { "user": 7 } }),
    );
    assert!(checker.get_permission("bookmark", &own).await.unwrap().is_granted());

    let foreign = ServiceCall::new(
        "update",
        json!({ "user": { "role": "user", "id": 7 }, "bookmark": { "user": 8 } }),
    );
    let decision = checker.get_permission("bookmark", &foreign).await.unwrap();
    assert_eq!(decision, AccessDecision::Deny("Access Denied".to_string()));
}

#[tokio::test]
async fn test_sync_and_async_predicates_decide_alike() {
    for expected in [true, false] {
        let sync = AccessChecker::new(vec![
            RoleDefinition::new("guest").allow(Rule::when("doc:read", move |_, _| expected)),
        ])
        .unwrap();
        let deferred = AccessChecker::new(vec![RoleDefinition::new("guest").allow(
            Rule::when_async("doc:read", move |_, _| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                anyhow::Ok(expected)
            }),
        )])
        .unwrap();

        let call = ServiceCall::new("read", json!({}));
        let a = sync.get_permission("doc", &call).await.unwrap();
        let b = deferred.get_permission("doc", &call).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.is_granted(), expected);
    }
}

#[tokio::test]
async fn test_predicate_receives_params_and_call() {
    let checker = AccessChecker::new(vec![RoleDefinition::new("guest").allow(Rule::when(
        "doc:read",
        |params, call| params["token"] == "abc" && call.method == "read",
    ))])
    .unwrap();

    let call = ServiceCall::new("read", json!({ "token": "abc" }));
    assert!(checker.get_permission("doc", &call).await.unwrap().is_granted());
}

// ============================================================================
// Default Role Tests
// ============================================================================

#[tokio::test]
async fn test_missing_role_behaves_as_guest() {
    let checker = sample_checker();
    let anonymous = ServiceCall::new("create", json!({}));
    let guest = call_as("guest", "create");

    for service in ["session", "bookmark", "report"] {
        assert_eq!(
            checker.get_permission(service, &anonymous).await.unwrap(),
            checker.get_permission(service, &guest).await.unwrap(),
        );
    }
}

#[tokio::test]
async fn test_falsy_role_behaves_as_guest() {
    let checker = sample_checker();
    for role in [json!(null), json!(""), json!(false), json!(0)] {
        let call = ServiceCall::new("create", json!({ "user": { "role": role } }));
        assert!(checker.get_permission("session", &call).await.unwrap().is_granted());
        assert_eq!(checker.role_of(&call), "guest");
    }
}

#[tokio::test]
async fn test_non_string_role_is_an_unknown_role() {
    let checker = sample_checker();
    for role in [json!(7), json!(true), json!({ "name": "guest" })] {
        let call = ServiceCall::new("create", json!({ "user": { "role": role } }));
        let decision = checker.get_permission("session", &call).await.unwrap();
        assert_eq!(decision, AccessDecision::Deny("Access Denied".to_string()));
    }
}

#[tokio::test]
async fn test_configured_default_role_and_message() {
    let checker = sample_checker()
        .with_default_role("user")
        .with_denied_message("Forbidden");

    let anonymous = ServiceCall::new("create", json!({ "user": {} }));
    assert!(checker.get_permission("bookmark", &anonymous).await.unwrap().is_granted());

    let decision = checker.get_permission("report", &anonymous).await.unwrap();
    assert_eq!(decision.message(), "Forbidden");
}

// ============================================================================
// Gate Tests
// ============================================================================

#[tokio::test]
async fn test_gate_passes_call_through_unchanged() {
    let gate = sample_checker().check_access("session");
    let call = ServiceCall::new("create", json!({ "payload": [1, 2, 3] }));

    let passed = gate.check(call.clone()).await.unwrap();
    assert_eq!(passed, call);
}

#[tokio::test]
async fn test_gate_rejects_with_message() {
    let gate = sample_checker().check_access("bookmark");
    let err = gate.check(ServiceCall::new("create", json!({}))).await.unwrap_err();

    assert!(err.is_denied());
    assert_eq!(err.to_string(), "Access Denied");
}

#[tokio::test]
async fn test_predicate_fault_is_not_a_denial() {
    let checker = AccessChecker::new(vec![RoleDefinition::new("guest")
        .allow(Rule::try_when("doc:read", |_, _| Err(anyhow::anyhow!("record store offline"))))
        .allow(Rule::when_async("doc:write", |_, _| async {
            Err::<bool, _>(anyhow::anyhow!("lookup timed out"))
        }))])
    .unwrap();
    let gate = checker.check_access("doc");

    for (method, cause) in [("read", "record store offline"), ("write", "lookup timed out")] {
        let err = gate.check(ServiceCall::new(method, json!({}))).await.unwrap_err();
        assert!(err.is_predicate_failure());
        assert!(!err.is_denied());
        assert!(err.to_string().contains(cause));

        let err = ParichaError::from(err);
        assert_eq!(err.code(), ErrorCode::PredicateFailed);
    }
}

// ============================================================================
// Idempotence & Concurrency Tests
// ============================================================================

#[tokio::test]
async fn test_compiling_twice_decides_identically() {
    let first = sample_checker();
    let second = sample_checker();
    let roles = ["guest", "user", "agent", "officer", "admin", "nobody"];
    let actions = [
        "session:create",
        "bookmark:create",
        "bookmark:update",
        "report:list",
        "case:read",
        "anything:atall",
    ];

    for role in roles {
        for action in actions {
            assert_eq!(
                decide(&first, role, action).await,
                decide(&second, role, action).await,
                "{} on {}",
                role,
                action
            );
        }
    }
}

#[tokio::test]
async fn test_concurrent_evaluations_share_tables() {
    let checker = AccessChecker::new(vec![
        RoleDefinition::new("guest").allow("session:create"),
        RoleDefinition::new("user").parent("guest").allow(Rule::when_async(
            "bookmark:update",
            |params, _| async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                anyhow::Ok(params["owner"] == params["user"]["id"])
            },
        )),
    ])
    .unwrap();

    let handles: Vec<_> = (0..64)
        .map(|i| {
            let gate = checker.check_access("bookmark");
            tokio::spawn(async move {
                let owner = if i % 2 == 0 { i } else { i + 1 };
                let call = ServiceCall::new(
                    "update",
                    json!({ "user": { "role": "user", "id": i }, "owner": owner }),
                );
                (i, gate.check(call).await.is_ok())
            })
        })
        .collect();

    for handle in handles {
        let (i, granted) = handle.await.unwrap();
        assert_eq!(granted, i % 2 == 0);
    }
}

#[tokio::test]
async fn test_interleaved_checks_on_one_task() {
    let gate = sample_checker().check_access("session");
    let calls = ["create", "remove", "create"]
        .into_iter()
        .map(|method| gate.check(ServiceCall::new(method, json!({}))));

    let outcomes: Vec<bool> = futures::future::join_all(calls)
        .await
        .into_iter()
        .map(|result| result.is_ok())
        .collect();
    assert_eq!(outcomes, vec![true, false, true]);
}

// ============================================================================
// Configuration Error Tests
// ============================================================================

#[test]
fn test_unknown_parent_is_fatal() {
    let err = AccessChecker::new(vec![RoleDefinition::new("user").parent("ghost")]).unwrap_err();
    assert_eq!(
        err,
        ConfigError::UnknownParent {
            role: "user".to_string(),
            parent: "ghost".to_string()
        }
    );
}

#[test]
fn test_duplicate_role_is_fatal() {
    let err = compile(vec![RoleDefinition::new("guest"), RoleDefinition::new("guest")]).unwrap_err();
    assert_eq!(err, ConfigError::DuplicateRole("guest".to_string()));
}

#[test]
fn test_missing_name_is_fatal() {
    let err = compile(vec![RoleDefinition::new("")]).unwrap_err();
    assert_eq!(err, ConfigError::EmptyRoleName);
}

#[test]
fn test_cycle_is_fatal() {
    let err = compile(vec![
        RoleDefinition::new("guest"),
        RoleDefinition::new("a").parent("b"),
        RoleDefinition::new("b").parent("a"),
    ])
    .unwrap_err();

    assert_eq!(
        err,
        ConfigError::InheritanceCycle {
            roles: vec!["a".to_string(), "b".to_string()]
        }
    );
    assert_eq!(ParichaError::from(err).code(), ErrorCode::InheritanceCycle);
}
