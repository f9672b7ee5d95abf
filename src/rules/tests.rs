//! Integration tests for the rule grammar translator
//!
//! End-to-end coverage over the parsers, the serializer, and the facade:
//! - Round-trips from structured rules through the raw grammar and back
//! - Whole-rule rejection vs. single-action drop policies
//! - Batch ordering and per-index error correspondence

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::folders::{FolderRef, StaticLabelResolver};
use crate::rules::actions::{Action, ActionSet, Recipient};
use crate::rules::conditions::{parse_conditions, Combinator, Condition, ConditionKind, ConditionSet};
use crate::rules::engine::RuleEngine;
use crate::rules::serializer::build_raw_rule;
use crate::rules::{OperationError, OperationErrorCode, RawRule, Rule, RuleOperation, FIELD_RULE_ID};
use crate::store::{RuleStore, StoreError, StoreResult};

// ============================================================================
// Test doubles
// ============================================================================

/// In-memory stand-in for the backend storage API. Records every call so
/// tests can assert that a batch never short-circuits.
#[derive(Default)]
struct MemoryStore {
    rules: Mutex<Vec<(String, RawRule)>>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl MemoryStore {
    fn with_rule(rule_id: &str, raw: RawRule) -> Self {
        let store = Self::default();
        store
            .rules
            .lock()
            .unwrap()
            .push((rule_id.to_string(), raw));
        store
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn list_rules(&self, _user_id: &str) -> StoreResult<Vec<RawRule>> {
        self.calls.lock().unwrap().push("list".to_string());
        Ok(self
            .rules
            .lock()
            .unwrap()
            .iter()
            .map(|(id, raw)| RawRule {
                id: Some(id.clone()),
                ..raw.clone()
            })
            .collect())
    }

    async fn create_rule(&self, _user_id: &str, rule: &RawRule) -> StoreResult<String> {
        self.calls.lock().unwrap().push("create".to_string());
        let id = format!("r{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.rules.lock().unwrap().push((id.clone(), rule.clone()));
        Ok(id)
    }

    async fn update_rule(&self, _user_id: &str, rule_id: &str, rule: &RawRule) -> StoreResult<()> {
        self.calls.lock().unwrap().push(format!("update {rule_id}"));
        let mut rules = self.rules.lock().unwrap();
        match rules.iter_mut().find(|(id, _)| id == rule_id) {
            Some(entry) => {
                entry.1 = rule.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(rule_id.to_string())),
        }
    }

    async fn delete_rule(&self, _user_id: &str, rule_id: &str) -> StoreResult<()> {
        self.calls.lock().unwrap().push(format!("delete {rule_id}"));
        let mut rules = self.rules.lock().unwrap();
        let before = rules.len();
        rules.retain(|(id, _)| id != rule_id);
        if rules.len() == before {
            Err(StoreError::NotFound(rule_id.to_string()))
        } else {
            Ok(())
        }
    }
}

fn resolver() -> Arc<StaticLabelResolver> {
    let mut resolver = StaticLabelResolver::new();
    resolver.insert(FolderRef {
        id: "fld-inbox".to_string(),
        name: "Inbox".to_string(),
    });
    resolver.insert(FolderRef {
        id: "fld-receipts".to_string(),
        name: "Receipts".to_string(),
    });
    Arc::new(resolver)
}

fn engine_with(store: Arc<MemoryStore>) -> RuleEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    RuleEngine::new(store, resolver())
}

fn complete_rule(name: &str) -> Rule {
    Rule {
        id: None,
        display_name: name.to_string(),
        priority: 1,
        enabled: true,
        conditions: Some(ConditionSet {
            conditions: vec![Condition {
                kind: ConditionKind::SubjectContains,
                values: vec!["receipt".to_string()],
                combinator: Combinator::And,
            }],
        }),
        actions: Some(ActionSet {
            actions: vec![Action::MoveToFolder(FolderRef {
                id: "fld-receipts".to_string(),
                name: "Receipts".to_string(),
            })],
        }),
    }
}

// ============================================================================
// Round-trips
// ============================================================================

#[test]
fn test_condition_round_trip_every_variant() {
    let variants = [
        ConditionKind::SubjectContains,
        ConditionKind::BodyOrSubjectContains,
        ConditionKind::SenderContains,
        ConditionKind::SenderIs,
    ];
    for kind in variants {
        let set = ConditionSet {
            conditions: vec![Condition {
                kind,
                values: vec!["probe".to_string()],
                combinator: Combinator::And,
            }],
        };
        let raw = build_raw_rule(&Rule {
            id: None,
            display_name: "probe".to_string(),
            priority: 0,
            enabled: true,
            conditions: Some(set.clone()),
            actions: None,
        });
        let parsed = parse_conditions(raw.condition_phrase.as_deref().unwrap()).unwrap();
        assert_eq!(parsed, set, "round trip failed for {kind:?}");
    }
}

#[test]
fn test_condition_round_trip_merged_values() {
    let set = ConditionSet {
        conditions: vec![Condition {
            kind: ConditionKind::SubjectContains,
            values: vec!["a".to_string(), "b".to_string()],
            combinator: Combinator::And,
        }],
    };
    let raw = build_raw_rule(&Rule {
        id: None,
        display_name: "probe".to_string(),
        priority: 0,
        enabled: true,
        conditions: Some(set.clone()),
        actions: None,
    });
    assert_eq!(
        parse_conditions(raw.condition_phrase.as_deref().unwrap()).unwrap(),
        set
    );
}

#[tokio::test]
async fn test_rule_round_trip_through_engine() {
    let store = Arc::new(MemoryStore::default());
    let engine = engine_with(store.clone());

    let errors = engine
        .apply_operations(
            "u1",
            vec![RuleOperation::Create {
                rule: complete_rule("Receipts"),
            }],
        )
        .await;
    assert!(errors.is_empty());

    let rules = engine.get_rules("u1").await.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].display_name, "Receipts");
    assert_eq!(
        rules[0].conditions.as_ref().unwrap().conditions[0].values,
        vec!["receipt"]
    );
    assert_eq!(
        rules[0].actions.as_ref().unwrap().actions[0],
        Action::MoveToFolder(FolderRef {
            id: "fld-receipts".to_string(),
            name: "Receipts".to_string(),
        })
    );
}

// ============================================================================
// Rejection policies
// ============================================================================

#[tokio::test]
async fn test_same_field_and_rejection_excludes_rule_from_get() {
    let raw = RawRule {
        display_name: "Broken".to_string(),
        priority: 1,
        enabled: true,
        condition_phrase: Some("Subject contains a\r\nAND Subject contains b".to_string()),
        action_phrase: Some("delete".to_string()),
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::with_rule("r1", raw));
    let engine = engine_with(store);

    assert!(engine.get_rules("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_operator_excludes_rule_from_get() {
    let raw = RawRule {
        display_name: "Unsupported".to_string(),
        priority: 1,
        enabled: true,
        condition_phrase: Some("Subject is Foo".to_string()),
        action_phrase: Some("delete".to_string()),
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::with_rule("r1", raw));
    let engine = engine_with(store);

    assert!(engine.get_rules("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unresolved_folder_only_action_excludes_rule_from_get() {
    // The folder miss drops the single action, leaving an empty action set;
    // the facade then excludes the rule for lacking actions.
    let raw = RawRule {
        display_name: "Ghost folder".to_string(),
        priority: 1,
        enabled: true,
        condition_phrase: Some("Subject contains a".to_string()),
        action_phrase: Some("move to folder Nonexistent".to_string()),
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::with_rule("r1", raw));
    let engine = engine_with(store);

    assert!(engine.get_rules("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unresolved_folder_among_others_keeps_rule() {
    let raw = RawRule {
        display_name: "Partial".to_string(),
        priority: 1,
        enabled: true,
        condition_phrase: Some("Subject contains a".to_string()),
        action_phrase: Some("move to folder Nonexistent\r\nthen delete".to_string()),
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::with_rule("r1", raw));
    let engine = engine_with(store);

    let rules = engine.get_rules("u1").await.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].actions.as_ref().unwrap().actions, vec![Action::Delete]);
}

#[tokio::test]
async fn test_empty_rule_excluded_from_get() {
    let raw = RawRule {
        display_name: "Empty".to_string(),
        priority: 1,
        enabled: true,
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::with_rule("r1", raw));
    let engine = engine_with(store);

    assert!(engine.get_rules("u1").await.unwrap().is_empty());
}

// ============================================================================
// Batch semantics
// ============================================================================

#[tokio::test]
async fn test_batch_failure_keeps_index_and_never_short_circuits() {
    let store = Arc::new(MemoryStore::with_rule("r-c", build_raw_rule(&complete_rule("C"))));
    let engine = engine_with(store.clone());

    let errors = engine
        .apply_operations(
            "u1",
            vec![
                RuleOperation::Create {
                    rule: complete_rule("A"),
                },
                RuleOperation::Set {
                    rule_id: Some("bad-id".to_string()),
                    rule: complete_rule("B"),
                },
                RuleOperation::Delete {
                    rule_id: Some("r-c".to_string()),
                },
            ],
        )
        .await;

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].index, 1);
    assert_eq!(errors[0].code, OperationErrorCode::RuleNotFound);
    assert_eq!(errors[0].value, "bad-id");

    // All three operations reached the store, in input order.
    assert_eq!(
        store.calls(),
        vec!["create", "update bad-id", "delete r-c"]
    );
}

#[tokio::test]
async fn test_missing_rule_id_is_validation_error_at_index() {
    let store = Arc::new(MemoryStore::default());
    let engine = engine_with(store.clone());

    let errors = engine
        .apply_operations(
            "u1",
            vec![
                RuleOperation::Delete { rule_id: None },
                RuleOperation::Create {
                    rule: complete_rule("A"),
                },
            ],
        )
        .await;

    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0],
        OperationError {
            index: 0,
            field: FIELD_RULE_ID.to_string(),
            code: OperationErrorCode::UnsupportedRule,
            message: "operation requires a rule id".to_string(),
            value: String::new(),
        }
    );
    // The store never saw the invalid delete, but the create still ran.
    assert_eq!(store.calls(), vec!["create"]);
}

#[tokio::test]
async fn test_incomplete_rule_rejected_before_store_call() {
    let store = Arc::new(MemoryStore::default());
    let engine = engine_with(store.clone());

    let mut rule = complete_rule("No actions");
    rule.actions = None;
    let errors = engine
        .apply_operations("u1", vec![RuleOperation::Create { rule }])
        .await;

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, OperationErrorCode::UnsupportedRule);
    assert_eq!(errors[0].field, crate::rules::FIELD_NOT_SUPPORTED);
    assert!(store.calls().is_empty());
}

// ============================================================================
// Wire shapes
// ============================================================================

#[test]
fn test_raw_rule_serializes_camel_case() {
    let raw = build_raw_rule(&complete_rule("Receipts"));
    let json = serde_json::to_value(&raw).unwrap();

    assert_eq!(json["displayName"], "Receipts");
    assert_eq!(json["conditionPhrase"], "Subject contains receipt");
    assert_eq!(json["actionPhrase"], "move to folder Receipts");
    assert_eq!(json["conditionTokens"][0], "2\u{a6}1\u{a6}receipt\u{a6}0");
    assert_eq!(json["actionTokens"][0], "1\u{a6}fld-receipts");
    // Absent id stays off the wire entirely.
    assert!(json.get("id").is_none());
}

#[test]
fn test_operation_error_serializes_kebab_case_code() {
    let error = OperationError {
        index: 2,
        field: FIELD_RULE_ID.to_string(),
        code: OperationErrorCode::RuleNotFound,
        message: "gone".to_string(),
        value: "r9".to_string(),
    };
    let json = serde_json::to_value(&error).unwrap();
    assert_eq!(json["code"], "rule-not-found");
    assert_eq!(json["index"], 2);
}

#[test]
fn test_rule_operation_wire_shape() {
    let json = r#"{"op": "delete", "ruleId": "r7"}"#;
    let operation: RuleOperation = serde_json::from_str(json).unwrap();
    assert_eq!(
        operation,
        RuleOperation::Delete {
            rule_id: Some("r7".to_string())
        }
    );
}

#[test]
fn test_forward_recipients_join_shapes() {
    let rule = Rule {
        actions: Some(ActionSet {
            actions: vec![Action::ForwardFullCopy(vec![
                Recipient::new("a@x.com"),
                Recipient::new("b@x.com"),
            ])],
        }),
        ..complete_rule("Forward")
    };
    let raw = build_raw_rule(&rule);
    assert_eq!(
        raw.action_phrase.as_deref(),
        Some("send full copy to a@x.com, b@x.com")
    );
    assert_eq!(
        raw.action_tokens.unwrap(),
        vec!["B\u{a6}1\u{a6}a@x.com;b@x.com".to_string()]
    );
}
