//! Condition operations and their textual names

use std::fmt;
use std::str::FromStr;

use phf::phf_map;

use crate::error::Error;

/// An operator applied between a value and a comparand.
///
/// Declaration order matches the schema JSON operation codes; `ValueIncluded` and
/// `Excluded` have no textual form and are only produced programmatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConditionOperation {
    LessThan = 0,
    GreaterThan = 1,
    LessThanOrEqual = 2,
    GreaterThanOrEqual = 3,
    Equal = 4,
    NotEqual = 5,
    NotEqualCaseInsensitive = 6,
    Containing = 7,
    StartingWith = 8,
    EndingWith = 9,
    Matching = 10,
    ContainingCaseInsensitive = 11,
    EqualCaseInsensitive = 12,
    StartingWithCaseInsensitive = 13,
    EndingWithCaseInsensitive = 14,
    AssignableTo = 15,
    AssignableFrom = 16,
    Included = 17,
    ReferenceIsOfType = 18,
    ValueIncluded = 19,
    Excluded = 20,
}

static OPERATION_NAMES: phf::Map<&'static str, ConditionOperation> = phf_map! {
    "lt" => ConditionOperation::LessThan,
    "gt" => ConditionOperation::GreaterThan,
    "lte" => ConditionOperation::LessThanOrEqual,
    "gte" => ConditionOperation::GreaterThanOrEqual,
    "eq" => ConditionOperation::Equal,
    "neq" => ConditionOperation::NotEqual,
    "neq-i" => ConditionOperation::NotEqualCaseInsensitive,
    "contains" => ConditionOperation::Containing,
    "starts with" => ConditionOperation::StartingWith,
    "ends with" => ConditionOperation::EndingWith,
    "matches" => ConditionOperation::Matching,
    "contains-i" => ConditionOperation::ContainingCaseInsensitive,
    "eq-i" => ConditionOperation::EqualCaseInsensitive,
    "starts with-i" => ConditionOperation::StartingWithCaseInsensitive,
    "ends with-i" => ConditionOperation::EndingWithCaseInsensitive,
    "assignable-to" => ConditionOperation::AssignableTo,
    "assignable-from" => ConditionOperation::AssignableFrom,
    "included" => ConditionOperation::Included,
    "is-type" => ConditionOperation::ReferenceIsOfType,
};

impl ConditionOperation {
    /// Textual name, `None` for operations without one.
    pub fn name(self) -> Option<&'static str> {
        use ConditionOperation::*;
        Some(match self {
            LessThan => "lt",
            GreaterThan => "gt",
            LessThanOrEqual => "lte",
            GreaterThanOrEqual => "gte",
            Equal => "eq",
            NotEqual => "neq",
            NotEqualCaseInsensitive => "neq-i",
            Containing => "contains",
            StartingWith => "starts with",
            EndingWith => "ends with",
            Matching => "matches",
            ContainingCaseInsensitive => "contains-i",
            EqualCaseInsensitive => "eq-i",
            StartingWithCaseInsensitive => "starts with-i",
            EndingWithCaseInsensitive => "ends with-i",
            AssignableTo => "assignable-to",
            AssignableFrom => "assignable-from",
            Included => "included",
            ReferenceIsOfType => "is-type",
            ValueIncluded | Excluded => return None,
        })
    }

    pub fn is_case_insensitive(self) -> bool {
        use ConditionOperation::*;
        matches!(
            self,
            NotEqualCaseInsensitive
                | ContainingCaseInsensitive
                | EqualCaseInsensitive
                | StartingWithCaseInsensitive
                | EndingWithCaseInsensitive
        )
    }

    /// Operations satisfied by two equal operands.
    pub fn is_equality(self) -> bool {
        use ConditionOperation::*;
        matches!(
            self,
            LessThanOrEqual
                | GreaterThanOrEqual
                | Equal
                | Containing
                | StartingWith
                | EndingWith
                | ContainingCaseInsensitive
                | EqualCaseInsensitive
                | StartingWithCaseInsensitive
                | EndingWithCaseInsensitive
                | AssignableTo
                | AssignableFrom
        )
    }

    /// Operations satisfiable by two different operands.
    pub fn is_inequality(self) -> bool {
        use ConditionOperation::*;
        !matches!(
            self,
            Equal | EqualCaseInsensitive | Included | ValueIncluded | Excluded
        )
    }

    /// The case-sensitive counterpart of a `-i` operation.
    pub fn case_sensitive(self) -> Self {
        use ConditionOperation::*;
        match self {
            NotEqualCaseInsensitive => NotEqual,
            ContainingCaseInsensitive => Containing,
            EqualCaseInsensitive => Equal,
            StartingWithCaseInsensitive => StartingWith,
            EndingWithCaseInsensitive => EndingWith,
            other => other,
        }
    }

    /// The operation that is true exactly when this one is false.
    pub fn opposite(self) -> Option<Self> {
        use ConditionOperation::*;
        Some(match self {
            Included => Excluded,
            Excluded => Included,
            Equal => NotEqual,
            NotEqual => Equal,
            EqualCaseInsensitive => NotEqualCaseInsensitive,
            NotEqualCaseInsensitive => EqualCaseInsensitive,
            GreaterThan => LessThanOrEqual,
            LessThanOrEqual => GreaterThan,
            LessThan => GreaterThanOrEqual,
            GreaterThanOrEqual => LessThan,
            _ => return None,
        })
    }
}

impl FromStr for ConditionOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OPERATION_NAMES
            .get(s)
            .copied()
            .ok_or_else(|| Error::UnknownOperation(s.to_string()))
    }
}

impl fmt::Display for ConditionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:?}", self),
        }
    }
}
