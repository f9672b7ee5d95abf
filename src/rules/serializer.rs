//! Rule structure builder
//!
//! Turns a structured rule back into the backend's two parallel
//! representations: the human-readable phrase (one clause per condition
//! value / action, joined with the clause separator) and the compact
//! token-encoded list rendered directly by the legacy UI. The token output
//! is a stable wire format; every code character comes from the frozen
//! tables in [`grammar`](super::grammar).

use super::actions::{Action, ActionSet, Recipient};
use super::conditions::{Combinator, ConditionSet};
use super::grammar;
use super::{RawRule, Rule};

/// Build a fresh backend projection of a structured rule. Conditions and
/// actions are emitted strictly in the order they appear on the rule.
pub fn build_raw_rule(rule: &Rule) -> RawRule {
    let (condition_phrase, condition_tokens) = match &rule.conditions {
        Some(set) if !set.is_empty() => {
            let (phrase, tokens) = encode_conditions(set);
            (Some(phrase), Some(tokens))
        }
        _ => (None, None),
    };
    let (action_phrase, action_tokens) = match &rule.actions {
        Some(set) if !set.is_empty() => {
            let (phrase, tokens) = encode_actions(set);
            (Some(phrase), Some(tokens))
        }
        _ => (None, None),
    };

    RawRule {
        id: rule.id.clone(),
        display_name: rule.display_name.clone(),
        priority: rule.priority,
        enabled: rule.enabled,
        condition_phrase,
        action_phrase,
        condition_tokens,
        action_tokens,
    }
}

fn encode_conditions(set: &ConditionSet) -> (String, Vec<String>) {
    let sep = grammar::TOKEN_SEPARATOR;
    let mut fragments = Vec::new();
    let mut tokens = Vec::new();

    for condition in &set.conditions {
        let (field, operator) = grammar::condition_spec(condition.kind);
        for (index, value) in condition.values.iter().enumerate() {
            // The condition's own combinator joins its first value to the
            // previous clause; merged values are always OR.
            let combinator = if index == 0 {
                condition.combinator
            } else {
                Combinator::Or
            };
            let fragment = if fragments.is_empty() {
                format!("{} {} {}", field.text, operator.text, value)
            } else {
                format!(
                    "{} {} {} {}",
                    combinator.keyword(),
                    field.text,
                    operator.text,
                    value
                )
            };
            fragments.push(fragment);
            tokens.push(format!(
                "{}{sep}{}{sep}{}{sep}{}",
                field.code,
                operator.code,
                value,
                combinator.flag()
            ));
        }
    }

    (fragments.join(grammar::CLAUSE_SEPARATOR), tokens)
}

fn encode_actions(set: &ActionSet) -> (String, Vec<String>) {
    let sep = grammar::TOKEN_SEPARATOR;
    let mut fragments = Vec::new();
    let mut tokens = Vec::new();

    for action in &set.actions {
        let spec = grammar::action_spec(action.kind());
        let (fragment, token) = match action {
            Action::MoveToFolder(folder) | Action::CopyToFolder(folder) => (
                format!("{} {}", spec.text, folder.name),
                format!("{}{sep}{}", spec.code, folder.id),
            ),
            Action::Delete | Action::StopProcessing => {
                (spec.text.to_string(), spec.code.to_string())
            }
            Action::ChangeImportance(level) => (
                format!("{} {}", spec.text, level.as_str()),
                format!("{}{sep}{}", spec.code, level.code()),
            ),
            Action::ForwardFullCopy(recipients) => (
                format!("{} {}", spec.text, join_phrase(recipients)),
                format!(
                    "{}{sep}{}{sep}{}",
                    spec.code,
                    grammar::FORWARD_FULL_SUB,
                    join_token(recipients)
                ),
            ),
            Action::ForwardHeadersCopy(recipients) => (
                format!("{} {}", spec.text, join_phrase(recipients)),
                format!(
                    "{}{sep}{}{sep}{}",
                    spec.code,
                    grammar::FORWARD_HEADERS_SUB,
                    join_token(recipients)
                ),
            ),
        };
        if fragments.is_empty() {
            fragments.push(fragment);
        } else {
            fragments.push(format!("{} {}", grammar::KW_THEN, fragment));
        }
        tokens.push(token);
    }

    (fragments.join(grammar::CLAUSE_SEPARATOR), tokens)
}

fn join_phrase(recipients: &[Recipient]) -> String {
    recipients
        .iter()
        .map(|r| r.address.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_token(recipients: &[Recipient]) -> String {
    recipients
        .iter()
        .map(|r| r.address.as_str())
        .collect::<Vec<_>>()
        .join(";")
}
