//! Mailbox rule model and the legacy grammar translator
//!
//! The backend stores each rule as two raw strings in a legacy mini-language
//! (a condition phrase and an action phrase) plus a token-encoded mirror of
//! each. This module owns the typed rule model, the parsers producing it
//! from the raw strings, the serializer producing the raw strings from it,
//! and the facade orchestrating both directions against the storage and
//! folder-directory boundaries.

pub mod actions;
pub mod conditions;
pub mod engine;
pub mod grammar;
pub mod serializer;

#[cfg(test)]
mod tests;

pub use actions::{Action, ActionKind, ActionSet, Importance, Recipient};
pub use conditions::{Combinator, Condition, ConditionKind, ConditionSet};
pub use engine::RuleEngine;
pub use serializer::build_raw_rule;

use serde::{Deserialize, Serialize};

/// Error field identifier for rule id validation failures.
pub const FIELD_RULE_ID: &str = "rule id";
/// Error field identifier for rules the translator cannot express.
pub const FIELD_NOT_SUPPORTED: &str = "is-not-supported";

/// Structured mailbox rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Backend-assigned identity; absent on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub display_name: String,
    /// Execution order, lower first.
    pub priority: i32,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<ConditionSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<ActionSet>,
}

impl Rule {
    /// Whether the rule carries both conditions and actions. Incomplete
    /// rules are omitted from Get responses and rejected on Create/Set.
    pub fn is_complete(&self) -> bool {
        self.conditions.as_ref().is_some_and(|c| !c.is_empty())
            && self.actions.as_ref().is_some_and(|a| !a.is_empty())
    }
}

/// Backend-facing projection of a rule: the two raw phrases for legacy
/// display plus the token-encoded mirror of each. Always rebuilt fresh from
/// structured data, never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub display_name: String,
    pub priority: i32,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_phrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_phrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_tokens: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_tokens: Option<Vec<String>>,
}

/// One mutation of the rule list. Matched exhaustively so a new operation
/// kind cannot be silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum RuleOperation {
    Create {
        rule: Rule,
    },
    Set {
        #[serde(rename = "ruleId")]
        rule_id: Option<String>,
        rule: Rule,
    },
    Delete {
        #[serde(rename = "ruleId")]
        rule_id: Option<String>,
    },
}

/// Error code attached to a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationErrorCode {
    RuleNotFound,
    UnsupportedRule,
    UnexpectedError,
}

/// Per-operation failure record. `index` is the operation's position in the
/// original request list; the batch never reorders, so callers correlate
/// errors by index alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationError {
    pub index: usize,
    pub field: String,
    pub code: OperationErrorCode,
    pub message: String,
    /// Echo of the offending field value.
    pub value: String,
}

impl OperationError {
    pub(crate) fn missing_rule_id(index: usize) -> Self {
        Self {
            index,
            field: FIELD_RULE_ID.to_string(),
            code: OperationErrorCode::UnsupportedRule,
            message: "operation requires a rule id".to_string(),
            value: String::new(),
        }
    }

    pub(crate) fn unsupported_rule(index: usize, display_name: &str) -> Self {
        Self {
            index,
            field: FIELD_NOT_SUPPORTED.to_string(),
            code: OperationErrorCode::UnsupportedRule,
            message: "rule must carry both conditions and actions".to_string(),
            value: display_name.to_string(),
        }
    }

    pub(crate) fn store_failure(
        index: usize,
        rule_id: &str,
        err: crate::store::StoreError,
    ) -> Self {
        let code = if matches!(err, crate::store::StoreError::NotFound(_)) {
            OperationErrorCode::RuleNotFound
        } else {
            OperationErrorCode::UnexpectedError
        };
        Self {
            index,
            field: FIELD_RULE_ID.to_string(),
            code,
            message: err.to_string(),
            value: rule_id.to_string(),
        }
    }
}
