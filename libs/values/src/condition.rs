//! Conditions over dynamic values
//!
//! A [`Condition`] pairs a variable (any [`DynamicValue`]) with an operation and
//! an optional literal comparand. Variables decide how they resolve; once both
//! sides are scalars, [`Condition::evaluate_scalar`] applies the comparison
//! protocol and the null policy.

use std::cmp::Ordering;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Mutex, OnceLock, PoisonError};

use lru::LruCache;
use regex::{Regex, RegexBuilder};

use crate::compare;
use crate::context::{EvaluationContext, TypeDatabase};
use crate::operation::ConditionOperation;
use crate::scalar::Scalar;
use crate::value::DynamicValue;

/// `variable <operation> comparand`, optionally inverted.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// `None` when the variable could not be resolved against the schema.
    pub variable: Option<DynamicValue>,
    pub operation: ConditionOperation,
    pub comparand: Option<Scalar>,
    pub case_insensitive: bool,
    pub inverted: bool,
}

impl Condition {
    pub fn new(
        variable: DynamicValue,
        operation: ConditionOperation,
        comparand: impl Into<Option<Scalar>>,
    ) -> Self {
        Self {
            variable: Some(variable),
            operation,
            comparand: comparand.into(),
            case_insensitive: operation.is_case_insensitive(),
            inverted: false,
        }
    }

    /// A condition that always evaluates to `value`.
    pub fn constant(value: bool) -> Self {
        Self::new(
            DynamicValue::from(value),
            ConditionOperation::Equal,
            Scalar::Boolean(true),
        )
    }

    /// `variable eq true`, the shorthand for naming a boolean property.
    pub fn is_true(variable: DynamicValue) -> Self {
        Self::new(variable, ConditionOperation::Equal, Scalar::Boolean(true))
    }

    pub fn with_inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive || self.operation.is_case_insensitive()
    }

    /// Apply the inversion flag to a raw result.
    pub fn invert(&self, value: bool) -> bool {
        value != self.inverted
    }

    /// Outcome when at least one side is null.
    pub fn evaluate_nulls(&self, value_is_null: bool, comparand_is_null: bool) -> bool {
        self.invert(null_policy(
            self.operation,
            value_is_null,
            comparand_is_null,
        ))
    }

    /// Evaluate against the ambient context.
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> bool {
        match &self.variable {
            Some(variable) => variable.evaluate_condition(ctx, self),
            None => self.evaluate_nulls(true, self.comparand.is_none()),
        }
    }

    /// Evaluate with the variable already reduced to a scalar (`None` is null).
    pub fn evaluate_scalar(&self, value: Option<&Scalar>, types: &dyn TypeDatabase) -> bool {
        self.evaluate_against(value, self.comparand.as_ref(), types)
    }

    /// Like [`Condition::evaluate_scalar`], with the comparand already converted
    /// into the value's domain.
    pub(crate) fn evaluate_against(
        &self,
        value: Option<&Scalar>,
        comparand: Option<&Scalar>,
        types: &dyn TypeDatabase,
    ) -> bool {
        let Some(value) = value else {
            return self.evaluate_nulls(true, comparand.is_none());
        };
        let Some(comparand) = comparand else {
            return self.evaluate_nulls(false, true);
        };
        match self.apply(value, comparand, types) {
            Some(result) => self.invert(result),
            None => self.evaluate_nulls(false, true),
        }
    }

    /// `None` when the operands cannot be compared.
    fn apply(&self, value: &Scalar, comparand: &Scalar, types: &dyn TypeDatabase) -> Option<bool> {
        use ConditionOperation::*;

        let ci = self.is_case_insensitive();
        let ordering = |pred: fn(Ordering) -> bool| compare::compare(value, comparand, ci).map(pred);

        match self.operation.case_sensitive() {
            LessThan => ordering(Ordering::is_lt),
            GreaterThan => ordering(Ordering::is_gt),
            LessThanOrEqual => ordering(Ordering::is_le),
            GreaterThanOrEqual => ordering(Ordering::is_ge),
            Equal => compare::equals(value, comparand, ci).as_bool(),
            NotEqual => compare::equals(value, comparand, ci).as_bool().map(|b| !b),
            Containing => compare::contains(value, comparand, ci).as_bool(),
            StartingWith => compare::starts_with(value, comparand, ci).as_bool(),
            EndingWith => compare::ends_with(value, comparand, ci).as_bool(),
            Matching => {
                let regex = compiled_pattern(comparand.as_str()?, ci)?;
                Some(regex.is_match(&value.to_string()))
            }
            AssignableTo => Some(types.is_assignable(&comparand.to_string(), &value.to_string())),
            AssignableFrom => Some(types.is_assignable(&value.to_string(), &comparand.to_string())),
            ReferenceIsOfType => Some(types.is_assignable(&comparand.to_string(), &value.to_string())),
            Included | ValueIncluded => Some(true),
            Excluded => Some(false),
            NotEqualCaseInsensitive
            | ContainingCaseInsensitive
            | EqualCaseInsensitive
            | StartingWithCaseInsensitive
            | EndingWithCaseInsensitive => None,
        }
    }

    /// The condition that holds exactly when this one does not.
    pub fn opposite(&self) -> Condition {
        let mut opposite = self.clone();
        if self.inverted {
            opposite.inverted = false;
            return opposite;
        }
        match self.operation.opposite() {
            Some(operation) => {
                opposite.operation = operation;
                opposite.case_insensitive = self.case_insensitive && operation.is_case_insensitive();
            }
            None => opposite.inverted = true,
        }
        opposite
    }
}

/// The null table, before inversion.
fn null_policy(op: ConditionOperation, value_is_null: bool, comparand_is_null: bool) -> bool {
    use ConditionOperation::*;

    match op {
        Included => return true,
        Excluded => return false,
        ValueIncluded => return !value_is_null,
        _ => {}
    }

    if value_is_null {
        if comparand_is_null {
            return op.is_equality() || matches!(op, Matching | ReferenceIsOfType);
        }
        return op.is_inequality()
            && !matches!(
                op,
                GreaterThan
                    | GreaterThanOrEqual
                    | StartingWith
                    | EndingWith
                    | Containing
                    | StartingWithCaseInsensitive
                    | EndingWithCaseInsensitive
                    | ContainingCaseInsensitive
                    | AssignableFrom
                    | ReferenceIsOfType
            );
    }

    op.is_inequality() && !matches!(op, LessThan | LessThanOrEqual | AssignableTo)
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverted {
            f.write_str("!")?;
        }
        match &self.variable {
            Some(v) => write!(f, "{}", v)?,
            None => f.write_str("null")?,
        }
        write!(f, " {}", self.operation)?;
        if self.operation == ConditionOperation::Included {
            return Ok(());
        }
        match &self.comparand {
            Some(c) => write!(f, " {}", c),
            None => f.write_str(" null"),
        }
    }
}

const PATTERN_CACHE_SIZE: usize = 128;

type PatternCache = Mutex<LruCache<(String, bool), Regex>>;

fn pattern_cache() -> &'static PatternCache {
    static CACHE: OnceLock<PatternCache> = OnceLock::new();
    CACHE.get_or_init(|| {
        let capacity = NonZeroUsize::new(PATTERN_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Mutex::new(LruCache::new(capacity))
    })
}

/// Compiled `matches` pattern, shared across evaluations. `None` if the pattern is invalid.
fn compiled_pattern(pattern: &str, case_insensitive: bool) -> Option<Regex> {
    let key = (pattern.to_string(), case_insensitive);
    let mut cache = pattern_cache().lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(regex) = cache.get(&key) {
        return Some(regex.clone());
    }
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .dot_matches_new_line(true)
        .build()
        .ok()?;
    cache.put(key, regex.clone());
    Some(regex)
}
