//! # Inbox Rules
//!
//! Translator between the legacy string-encoded mailbox rule grammar and a
//! structured, typed rule model.
//!
//! The backend stores each mail-filtering rule as two raw strings in a
//! domain-specific mini-language: a condition phrase ("Subject contains
//! invoice") and an action phrase ("move to folder Receipts"). This crate
//! parses those strings into typed condition/action trees, and serializes
//! structured update requests back into the backend's two parallel
//! representations: the human-readable phrase list and the compact
//! token-encoded list rendered by the legacy UI.
//!
//! Network transport, session handling, the folder directory, and rule
//! persistence are external collaborators, reached through the
//! [`store::RuleStore`] and [`folders::LabelResolver`] boundaries.

pub mod folders;
pub mod rules;
pub mod store;

// Re-export commonly used types
pub use folders::{CachingResolver, FolderRef, LabelResolver, StaticLabelResolver};
pub use rules::{
    build_raw_rule, Action, ActionSet, Combinator, Condition, ConditionKind, ConditionSet,
    Importance, OperationError, OperationErrorCode, RawRule, Recipient, Rule, RuleEngine,
    RuleOperation,
};
pub use store::{HttpRuleStore, RuleStore, StoreConfig, StoreError, StoreResult};
