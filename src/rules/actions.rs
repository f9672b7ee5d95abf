//! Action model and the action phrase parser
//!
//! Parsing is asynchronous because folder actions resolve their display
//! "view" name through the label resolver. A resolution miss drops that one
//! action and parsing continues; this is deliberately looser than the
//! all-or-nothing condition parser and must stay that way for behavioral
//! compatibility with the legacy importer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::grammar;
use crate::folders::{FolderRef, LabelResolver};

/// Discriminant for the action table; payloads live on [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    MoveToFolder,
    CopyToFolder,
    Delete,
    StopProcessing,
    ChangeImportance,
    ForwardFullCopy,
    ForwardHeadersCopy,
}

/// Importance level applied by a `change importance to` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    Normal,
    Low,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::High => "High",
            Importance::Normal => "Normal",
            Importance::Low => "Low",
        }
    }

    /// Sub-value character used in token encoding.
    pub fn code(&self) -> char {
        match self {
            Importance::High => '1',
            Importance::Normal => '2',
            Importance::Low => '3',
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Importance::High),
            "normal" => Some(Importance::Normal),
            "low" => Some(Importance::Low),
            _ => None,
        }
    }
}

/// One forward recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub address: String,
}

impl Recipient {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

/// One action of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum Action {
    MoveToFolder(FolderRef),
    CopyToFolder(FolderRef),
    Delete,
    StopProcessing,
    ChangeImportance(Importance),
    ForwardFullCopy(Vec<Recipient>),
    ForwardHeadersCopy(Vec<Recipient>),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::MoveToFolder(_) => ActionKind::MoveToFolder,
            Action::CopyToFolder(_) => ActionKind::CopyToFolder,
            Action::Delete => ActionKind::Delete,
            Action::StopProcessing => ActionKind::StopProcessing,
            Action::ChangeImportance(_) => ActionKind::ChangeImportance,
            Action::ForwardFullCopy(_) => ActionKind::ForwardFullCopy,
            Action::ForwardHeadersCopy(_) => ActionKind::ForwardHeadersCopy,
        }
    }
}

/// Ordered set of actions, as they appeared in the raw phrase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSet {
    pub actions: Vec<Action>,
}

impl ActionSet {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Parse one raw action phrase into an action set.
///
/// Returns None when a clause uses an unknown keyword (whole-parse abort) or
/// when the phrase contains no clause at all. A phrase whose every action
/// was dropped by folder resolution returns `Some` with an empty set; the
/// facade excludes such a rule for lacking actions.
pub async fn parse_actions(
    phrase: &str,
    user_id: &str,
    resolver: &dyn LabelResolver,
) -> Option<ActionSet> {
    let mut rest = grammar::trim_brackets(phrase);
    let mut set = ActionSet::default();
    let mut matched_any = false;
    // Each view name resolves at most once per parse, so a repeated name
    // cannot get two different answers within one invocation.
    let mut memo: HashMap<String, Option<FolderRef>> = HashMap::new();

    while !rest.trim().is_empty() {
        rest = strip_connectors(rest);
        if rest.trim().is_empty() {
            break;
        }

        let (clause, remainder) = grammar::split_clause(rest);
        rest = remainder;

        let Some((spec, value)) = match_clause(clause.trim()) else {
            log::debug!("unrecognized action clause {:?}", clause.trim());
            return None;
        };
        matched_any = true;

        match spec.kind {
            ActionKind::MoveToFolder | ActionKind::CopyToFolder => {
                if value.is_empty() {
                    continue;
                }
                match resolve_memoized(&mut memo, resolver, user_id, &value).await {
                    Some(folder) => {
                        if spec.kind == ActionKind::MoveToFolder {
                            set.actions.push(Action::MoveToFolder(folder));
                        } else {
                            set.actions.push(Action::CopyToFolder(folder));
                        }
                    }
                    None => {
                        log::warn!("folder view {value:?} did not resolve; dropping action");
                    }
                }
            }
            ActionKind::Delete => set.actions.push(Action::Delete),
            ActionKind::StopProcessing => set.actions.push(Action::StopProcessing),
            ActionKind::ChangeImportance => {
                // An unknown level is an unsupported construct, not a miss.
                let level = Importance::from_keyword(&value)?;
                set.actions.push(Action::ChangeImportance(level));
            }
            ActionKind::ForwardFullCopy | ActionKind::ForwardHeadersCopy => {
                let mut recipients = Vec::new();
                if !value.is_empty() {
                    recipients.push(Recipient::new(value));
                }
                // Lookahead: following segments are more recipients until one
                // of them reads as the start of a new action. This is the one
                // place the grammar is not strictly clause-by-clause.
                while !rest.trim().is_empty() {
                    let (segment, tail) = grammar::split_clause(rest);
                    let candidate = strip_connectors(segment.trim());
                    if is_action_clause(candidate) {
                        break;
                    }
                    if !candidate.is_empty() {
                        recipients.push(Recipient::new(candidate));
                    }
                    rest = tail;
                }
                if !recipients.is_empty() {
                    if spec.kind == ActionKind::ForwardFullCopy {
                        set.actions.push(Action::ForwardFullCopy(recipients));
                    } else {
                        set.actions.push(Action::ForwardHeadersCopy(recipients));
                    }
                }
            }
        }
    }

    if matched_any {
        Some(set)
    } else {
        None
    }
}

/// Strip any leading "then"/"AND" connector keywords.
fn strip_connectors(mut s: &str) -> &str {
    loop {
        if let Some(rest) = grammar::strip_keyword_ci(s, grammar::KW_THEN) {
            s = rest;
            continue;
        }
        if let Some(rest) = grammar::strip_keyword_ci(s, grammar::KW_AND) {
            s = rest;
            continue;
        }
        return s;
    }
}

/// Match one clause against the action table, returning the spec and the
/// value substring after the keyword.
fn match_clause(clause: &str) -> Option<(&'static grammar::ActionSpec, String)> {
    for spec in grammar::ACTION_SPECS {
        if let Some(value) = grammar::strip_keyword_ci(clause, spec.text) {
            return Some((spec, value.trim().to_string()));
        }
    }
    None
}

/// Whether a lookahead segment starts a new action.
fn is_action_clause(s: &str) -> bool {
    grammar::ACTION_SPECS
        .iter()
        .any(|spec| grammar::strip_keyword_ci(s, spec.text).is_some())
}

async fn resolve_memoized(
    memo: &mut HashMap<String, Option<FolderRef>>,
    resolver: &dyn LabelResolver,
    user_id: &str,
    view_name: &str,
) -> Option<FolderRef> {
    let key = view_name.to_lowercase();
    if let Some(cached) = memo.get(&key) {
        return cached.clone();
    }
    let resolved = resolver.resolve(user_id, view_name).await;
    memo.insert(key, resolved.clone());
    resolved
}
