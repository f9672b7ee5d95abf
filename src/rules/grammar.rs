//! Frozen grammar tables for the legacy rule phrase language
//!
//! Every separator, keyword, and backend code character lives here so the
//! parser and the serializer cannot drift apart. The token-encoded output is
//! a stable wire format rendered directly by the legacy UI, so the code
//! characters and the field separator must never change.

use super::actions::ActionKind;
use super::conditions::ConditionKind;

// ============================================================================
// Separators
// ============================================================================

/// Field separator inside token-encoded strings (U+00A6, broken bar).
pub const TOKEN_SEPARATOR: char = '\u{00A6}';

/// Marker between clauses in a raw phrase.
pub const CLAUSE_SEPARATOR: &str = "\r\n";

/// Bracket markers wrapping a whole phrase, present only on stored rules.
pub const PHRASE_OPEN: char = '[';
pub const PHRASE_CLOSE: char = ']';

// ============================================================================
// Keywords
// ============================================================================

pub const KW_WHEN: &str = "when";
pub const KW_AND: &str = "AND";
pub const KW_OR: &str = "OR";
pub const KW_THEN: &str = "then";

// ============================================================================
// Condition field table
// ============================================================================

/// One operator accepted by a condition field.
pub struct OperatorSpec {
    pub text: &'static str,
    pub code: char,
    pub kind: ConditionKind,
}

/// One filterable field of the legacy grammar.
pub struct FieldSpec {
    pub text: &'static str,
    pub code: char,
    pub operators: &'static [OperatorSpec],
}

pub const LOGIC_CONTAINS: char = '1';
pub const LOGIC_IS: char = '3';

pub const FIELD_SENDER: char = '1';
pub const FIELD_SUBJECT: char = '2';
/// Body-only matching; reserved by the backend, not in the supported set.
pub const FIELD_BODY: char = '3';
pub const FIELD_BODY_OR_SUBJECT: char = '9';

/// Supported condition fields, in clause matching order. "Subject" must come
/// before "Body or Subject" in this list only for readability; their texts
/// are not prefixes of each other.
pub static CONDITION_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        text: "Subject",
        code: FIELD_SUBJECT,
        operators: &[OperatorSpec {
            text: "contains",
            code: LOGIC_CONTAINS,
            kind: ConditionKind::SubjectContains,
        }],
    },
    FieldSpec {
        text: "Body or Subject",
        code: FIELD_BODY_OR_SUBJECT,
        operators: &[OperatorSpec {
            text: "contains",
            code: LOGIC_CONTAINS,
            kind: ConditionKind::BodyOrSubjectContains,
        }],
    },
    FieldSpec {
        text: "Sender",
        code: FIELD_SENDER,
        operators: &[
            OperatorSpec {
                text: "contains",
                code: LOGIC_CONTAINS,
                kind: ConditionKind::SenderContains,
            },
            OperatorSpec {
                text: "is",
                code: LOGIC_IS,
                kind: ConditionKind::SenderIs,
            },
        ],
    },
];

/// Look up the field and operator specs backing a condition kind.
pub fn condition_spec(kind: ConditionKind) -> (&'static FieldSpec, &'static OperatorSpec) {
    for field in CONDITION_FIELDS {
        for operator in field.operators {
            if operator.kind == kind {
                return (field, operator);
            }
        }
    }
    // Every ConditionKind variant has a table entry.
    unreachable!("condition kind missing from grammar table")
}

// ============================================================================
// Action table
// ============================================================================

/// One action keyword of the legacy grammar.
pub struct ActionSpec {
    pub text: &'static str,
    pub code: char,
    pub kind: ActionKind,
}

pub const ACTION_MOVE: char = '1';
pub const ACTION_IMPORTANCE: char = '2';
pub const ACTION_DELETE: char = '3';
pub const ACTION_COPY: char = '4';
pub const ACTION_FORWARD: char = 'B';
pub const ACTION_STOP: char = 'C';

/// Sub-values distinguishing the two forward flavors in token form.
pub const FORWARD_FULL_SUB: char = '1';
pub const FORWARD_HEADERS_SUB: char = '4';

pub static ACTION_SPECS: &[ActionSpec] = &[
    ActionSpec {
        text: "move to folder",
        code: ACTION_MOVE,
        kind: ActionKind::MoveToFolder,
    },
    ActionSpec {
        text: "copy to folder",
        code: ACTION_COPY,
        kind: ActionKind::CopyToFolder,
    },
    ActionSpec {
        text: "delete",
        code: ACTION_DELETE,
        kind: ActionKind::Delete,
    },
    ActionSpec {
        text: "stop processing further rules",
        code: ACTION_STOP,
        kind: ActionKind::StopProcessing,
    },
    ActionSpec {
        text: "change importance to",
        code: ACTION_IMPORTANCE,
        kind: ActionKind::ChangeImportance,
    },
    ActionSpec {
        text: "send full copy to",
        code: ACTION_FORWARD,
        kind: ActionKind::ForwardFullCopy,
    },
    ActionSpec {
        text: "send copy of headers to",
        code: ACTION_FORWARD,
        kind: ActionKind::ForwardHeadersCopy,
    },
];

/// Look up the spec backing an action kind.
pub fn action_spec(kind: ActionKind) -> &'static ActionSpec {
    ACTION_SPECS
        .iter()
        .find(|spec| spec.kind == kind)
        .expect("action kind missing from grammar table")
}

// ============================================================================
// Cursor helpers
// ============================================================================

/// Case-insensitive prefix strip. Keywords are ASCII; a non-ASCII boundary
/// in the input simply fails to match.
fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    match s.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => Some(&s[prefix.len()..]),
        _ => None,
    }
}

/// Strip a whole keyword: the prefix must be followed by whitespace or the
/// end of the string, so "Sender" does not match "Senders".
pub fn strip_keyword_ci<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = strip_prefix_ci(s, keyword)?;
    if rest.is_empty() {
        Some(rest)
    } else if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Split off the clause before the next separator; the second half is the
/// unconsumed remainder (empty on the last clause).
pub fn split_clause(s: &str) -> (&str, &str) {
    match s.find(CLAUSE_SEPARATOR) {
        Some(at) => (&s[..at], &s[at + CLAUSE_SEPARATOR.len()..]),
        None => (s, ""),
    }
}

/// Trim the surrounding bracket markers of a stored phrase.
pub fn trim_brackets(s: &str) -> &str {
    let s = s.trim();
    let s = s.strip_prefix(PHRASE_OPEN).unwrap_or(s);
    let s = s.strip_suffix(PHRASE_CLOSE).unwrap_or(s);
    s.trim()
}
