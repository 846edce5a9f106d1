//! Cross-type comparison protocol
//!
//! Decides equality, ordering and containment between two runtime values whose
//! kinds may differ. Every operator walks the same ladder and stops at the first
//! rung that applies:
//!
//! ```text
//! same kind ─▶ char vs 1-char string ─▶ GUID pairing ─▶ numeric reduction ─▶ parse text ─▶ unsupported
//! ```
//!
//! Null handling happens before this module is reached (see
//! [`Condition::evaluate_nulls`](crate::condition::Condition::evaluate_nulls)).
//! "Unsupported" is not "unequal": callers fold it into the operator's own null
//! policy.

use std::cmp::Ordering;

use crate::geometry::{compare_components, VectorLike};
use crate::guid_or_id::GuidOrId;
use crate::scalar::Scalar;
use crate::types::PropertyType;

/// Tri-state outcome of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Matched,
    Unmatched,
    Unsupported,
}

impl Comparison {
    pub fn from_bool(b: bool) -> Self {
        if b {
            Comparison::Matched
        } else {
            Comparison::Unmatched
        }
    }

    pub fn is_matched(self) -> bool {
        self == Comparison::Matched
    }

    pub fn is_supported(self) -> bool {
        self != Comparison::Unsupported
    }

    /// `None` when unsupported.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Comparison::Matched => Some(true),
            Comparison::Unmatched => Some(false),
            Comparison::Unsupported => None,
        }
    }
}

/// Declared type of a runtime value, used to pick a parser for the other side.
fn parser_type(value: &Scalar) -> Option<PropertyType> {
    match value {
        Scalar::Enum(e) => Some(PropertyType::Enum(e.ty.clone())),
        Scalar::List(_) => None,
        other => Some(other.kind().into()),
    }
}

fn lower(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

fn str_eq(a: &str, b: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        lower(a).eq(lower(b))
    } else {
        a == b
    }
}

fn str_cmp(a: &str, b: &str, case_insensitive: bool) -> Ordering {
    if case_insensitive {
        lower(a).cmp(lower(b))
    } else {
        a.cmp(b)
    }
}

fn char_eq(a: char, b: char, case_insensitive: bool) -> bool {
    a == b || (case_insensitive && a.to_lowercase().eq(b.to_lowercase()))
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

fn vector_components(value: &Scalar) -> Option<smallvec::SmallVec<[f32; 4]>> {
    Some(match value {
        Scalar::Vector2(v) => v.components(),
        Scalar::Vector3(v) => v.components(),
        Scalar::Vector4(v) => v.components(),
        Scalar::Color(v) => v.components(),
        Scalar::Color32(v) => v.components(),
        _ => return None,
    })
}

/// Equality between two non-null values.
pub fn equals(left: &Scalar, right: &Scalar, case_insensitive: bool) -> Comparison {
    // same kind
    if left.kind() == right.kind() {
        return Comparison::from_bool(match (left, right) {
            (Scalar::String(a), Scalar::String(b)) => str_eq(a, b, case_insensitive),
            (Scalar::Character(a), Scalar::Character(b)) => char_eq(*a, *b, case_insensitive),
            (Scalar::Enum(a), Scalar::Enum(b)) => {
                if a.ty.name() == b.ty.name() {
                    a.index == b.index
                } else {
                    str_eq(a.name(), b.name(), case_insensitive)
                }
            }
            (Scalar::List(a), Scalar::List(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(x, y)| equals(x, y, case_insensitive).is_matched())
            }
            _ => match (vector_components(left), vector_components(right)) {
                (Some(a), Some(b)) => compare_components(&a, &b) == Ordering::Equal,
                _ => left == right,
            },
        });
    }

    // char vs single-character string
    match (left, right) {
        (Scalar::Character(c), Scalar::String(s)) | (Scalar::String(s), Scalar::Character(c)) => {
            return Comparison::from_bool(
                single_char(s).is_some_and(|sc| char_eq(*c, sc, case_insensitive)),
            );
        }
        _ => {}
    }

    // GUIDs never reduce numerically
    match (left, right) {
        (Scalar::Guid(g), Scalar::GuidOrId(k)) | (Scalar::GuidOrId(k), Scalar::Guid(g)) => {
            return match k {
                GuidOrId::Guid(other) => Comparison::from_bool(g == other),
                GuidOrId::Id { .. } => Comparison::Unsupported,
            };
        }
        _ => {}
    }

    // numeric reduction
    if let (Some(a), Some(b)) = (left.to_number(), right.to_number()) {
        return match a.compare(b) {
            Some(ord) => Comparison::from_bool(ord == Ordering::Equal),
            None => Comparison::Unmatched,
        };
    }

    // parse the textual side into the other side's type
    parse_and_apply(left, right, case_insensitive, |a, b| equals(a, b, case_insensitive))
}

/// Member names in the textual side match exactly unless `case_insensitive`.
fn parse_and_apply(
    left: &Scalar,
    right: &Scalar,
    case_insensitive: bool,
    apply: impl FnOnce(&Scalar, &Scalar) -> Comparison,
) -> Comparison {
    match (left, right) {
        (Scalar::String(text), other) if !matches!(other, Scalar::String(_)) => {
            match parser_type(other).and_then(|ty| Scalar::parse_typed_case(&ty, text, case_insensitive)) {
                Some(parsed) => apply(&parsed, other),
                None => Comparison::Unsupported,
            }
        }
        (other, Scalar::String(text)) => {
            match parser_type(other).and_then(|ty| Scalar::parse_typed_case(&ty, text, case_insensitive)) {
                Some(parsed) => apply(other, &parsed),
                None => Comparison::Unsupported,
            }
        }
        _ => Comparison::Unsupported,
    }
}

/// Ordering between two non-null values, `None` when the pair is unsupported.
pub fn compare(left: &Scalar, right: &Scalar, case_insensitive: bool) -> Option<Ordering> {
    if left.kind() == right.kind() {
        return match (left, right) {
            (Scalar::String(a), Scalar::String(b)) => Some(str_cmp(a, b, case_insensitive)),
            (Scalar::Character(a), Scalar::Character(b)) => {
                if char_eq(*a, *b, case_insensitive) {
                    Some(Ordering::Equal)
                } else {
                    Some(a.cmp(b))
                }
            }
            (Scalar::Boolean(a), Scalar::Boolean(b)) => Some(a.cmp(b)),
            (Scalar::DateTime(a), Scalar::DateTime(b)) => Some(a.cmp(b)),
            (Scalar::DateTimeOffset(a), Scalar::DateTimeOffset(b)) => Some(a.cmp(b)),
            (Scalar::Guid(a), Scalar::Guid(b)) => Some(a.cmp(b)),
            (Scalar::GuidOrId(a), Scalar::GuidOrId(b)) => match (a, b) {
                (GuidOrId::Guid(x), GuidOrId::Guid(y)) => Some(x.cmp(y)),
                (GuidOrId::Id { id: x, .. }, GuidOrId::Id { id: y, .. }) => Some(x.cmp(y)),
                _ => None,
            },
            (Scalar::List(_), Scalar::List(_)) => None,
            _ => match (vector_components(left), vector_components(right)) {
                (Some(a), Some(b)) => Some(compare_components(&a, &b)),
                _ => left.to_number()?.compare(right.to_number()?),
            },
        };
    }

    match (left, right) {
        (Scalar::Character(c), Scalar::String(s)) => {
            let sc = single_char(s)?;
            return compare(&Scalar::Character(*c), &Scalar::Character(sc), case_insensitive);
        }
        (Scalar::String(s), Scalar::Character(c)) => {
            let sc = single_char(s)?;
            return compare(&Scalar::Character(sc), &Scalar::Character(*c), case_insensitive);
        }
        (Scalar::Guid(_), Scalar::GuidOrId(_)) | (Scalar::GuidOrId(_), Scalar::Guid(_)) => {
            let left = left.convert(&crate::types::ValueKind::Guid.into())?;
            let right = right.convert(&crate::types::ValueKind::Guid.into())?;
            return compare(&left, &right, case_insensitive);
        }
        _ => {}
    }

    if let (Some(a), Some(b)) = (left.to_number(), right.to_number()) {
        return a.compare(b);
    }

    let mut result = None;
    let outcome = parse_and_apply(left, right, case_insensitive, |a, b| {
        result = compare(a, b, case_insensitive);
        Comparison::Matched
    });
    if outcome.is_supported() {
        result
    } else {
        None
    }
}

/// Substring, element or subset containment of `needle` in `haystack`.
pub fn contains(haystack: &Scalar, needle: &Scalar, case_insensitive: bool) -> Comparison {
    match (haystack, needle) {
        (Scalar::List(items), Scalar::List(wanted)) => Comparison::from_bool(
            wanted
                .iter()
                .all(|w| items.iter().any(|i| equals(i, w, case_insensitive).is_matched())),
        ),
        (Scalar::List(items), needle) => Comparison::from_bool(
            items
                .iter()
                .any(|i| equals(i, needle, case_insensitive).is_matched()),
        ),
        (Scalar::String(text), needle) => {
            let needle = needle_text(needle);
            Comparison::from_bool(if case_insensitive {
                text.to_lowercase().contains(&needle.to_lowercase())
            } else {
                text.contains(needle.as_str())
            })
        }
        _ => Comparison::Unsupported,
    }
}

/// Ordered prefix of a string or sequence.
pub fn starts_with(haystack: &Scalar, needle: &Scalar, case_insensitive: bool) -> Comparison {
    affix(haystack, needle, case_insensitive, true)
}

/// Ordered suffix of a string or sequence.
pub fn ends_with(haystack: &Scalar, needle: &Scalar, case_insensitive: bool) -> Comparison {
    affix(haystack, needle, case_insensitive, false)
}

fn affix(haystack: &Scalar, needle: &Scalar, case_insensitive: bool, prefix: bool) -> Comparison {
    match (haystack, needle) {
        (Scalar::List(items), Scalar::List(wanted)) => {
            if wanted.len() > items.len() {
                return Comparison::Unmatched;
            }
            let offset = if prefix { 0 } else { items.len() - wanted.len() };
            Comparison::from_bool(
                wanted
                    .iter()
                    .zip(items[offset..].iter())
                    .all(|(w, i)| equals(i, w, case_insensitive).is_matched()),
            )
        }
        (Scalar::List(items), needle) => {
            let edge = if prefix { items.first() } else { items.last() };
            Comparison::from_bool(
                edge.is_some_and(|i| equals(i, needle, case_insensitive).is_matched()),
            )
        }
        (Scalar::String(text), needle) => {
            let needle = needle_text(needle);
            let (text, needle) = if case_insensitive {
                (text.to_lowercase(), needle.to_lowercase())
            } else {
                (text.to_string(), needle)
            };
            Comparison::from_bool(if prefix {
                text.starts_with(&needle)
            } else {
                text.ends_with(&needle)
            })
        }
        _ => Comparison::Unsupported,
    }
}

fn needle_text(needle: &Scalar) -> String {
    match needle {
        Scalar::String(s) => s.to_string(),
        other => other.to_string(),
    }
}
