//! Condition model and the condition phrase parser

use serde::{Deserialize, Serialize};

use super::grammar;

/// Supported condition kinds. `SenderIs` (exact address) is a distinct kind
/// from `SenderContains`, never merged with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    SubjectContains,
    BodyOrSubjectContains,
    SenderContains,
    SenderIs,
}

/// AND/OR relationship between a clause and its predecessor in the phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn keyword(&self) -> &'static str {
        match self {
            Combinator::And => grammar::KW_AND,
            Combinator::Or => grammar::KW_OR,
        }
    }

    /// Operator flag character used in token encoding.
    pub fn flag(&self) -> char {
        match self {
            Combinator::And => '0',
            Combinator::Or => '1',
        }
    }
}

/// One condition of a rule, carrying every value accumulated for its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub values: Vec<String>,
    pub combinator: Combinator,
}

/// Ordered set of conditions, as they appeared in the raw phrase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSet {
    pub conditions: Vec<Condition>,
}

impl ConditionSet {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Fold one parsed clause into the set. Values of an already-seen kind
    /// may only accumulate under OR; the same kind under AND is a hard
    /// failure for the whole rule (returns false). This mirrors the legacy
    /// constraint that a field could not require two values at once.
    fn accumulate(&mut self, kind: ConditionKind, value: String, combinator: Combinator) -> bool {
        if let Some(existing) = self.conditions.iter_mut().find(|c| c.kind == kind) {
            if combinator == Combinator::Or {
                existing.values.push(value);
                true
            } else {
                false
            }
        } else {
            self.conditions.push(Condition {
                kind,
                values: vec![value],
                combinator,
            });
            true
        }
    }
}

/// Parse one raw condition phrase into a condition set.
///
/// Iterates clause by clause over a cursor instead of re-entering itself on
/// the remainder; the empty remainder is the loop guard. Any unrecognized
/// field or operator keyword aborts the whole parse; the rule is never
/// imported with only the clauses that happened to match.
pub fn parse_conditions(phrase: &str) -> Option<ConditionSet> {
    let mut rest = grammar::trim_brackets(phrase);
    if let Some(after) = grammar::strip_keyword_ci(rest, grammar::KW_WHEN) {
        rest = after;
    }

    let mut set = ConditionSet::default();
    while !rest.trim().is_empty() {
        let mut combinator = Combinator::And;
        if let Some(after) = grammar::strip_keyword_ci(rest, grammar::KW_AND) {
            rest = after;
        } else if let Some(after) = grammar::strip_keyword_ci(rest, grammar::KW_OR) {
            rest = after;
            combinator = Combinator::Or;
        }

        let (clause, remainder) = grammar::split_clause(rest);
        let (kind, value) = match_clause(clause.trim())?;
        // An empty value contributes nothing but is not an error.
        if !value.is_empty() && !set.accumulate(kind, value, combinator) {
            log::debug!("rejecting condition phrase: repeated {kind:?} joined with AND");
            return None;
        }
        rest = remainder;
    }

    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}

/// Match one clause against the field table. Returns the kind and the raw
/// value substring, or None when the clause uses anything outside the
/// supported field/operator set.
fn match_clause(clause: &str) -> Option<(ConditionKind, String)> {
    for field in grammar::CONDITION_FIELDS {
        if let Some(rest) = grammar::strip_keyword_ci(clause, field.text) {
            for operator in field.operators {
                if let Some(value) = grammar::strip_keyword_ci(rest, operator.text) {
                    return Some((operator.kind, value.trim().to_string()));
                }
            }
            log::debug!("unsupported operator for {:?} in clause {clause:?}", field.text);
            return None;
        }
    }
    log::debug!("unrecognized condition clause {clause:?}");
    None
}
