//! Ordered switch/case selection
//!
//! A [`SwitchValue`] tries its cases in declaration order and takes the value
//! of the first case whose conditions hold. No matching case is a null value.
//!
//! Besides runtime evaluation, [`SwitchValue::try_match_given`] answers a
//! static question used when one switch is read in the shape of another: if
//! a set of earlier cases is known false and one case is known true, which
//! case of this switch is guaranteed to match?

use std::fmt;

use crate::condition::Condition;
use crate::context::EvaluationContext;
use crate::error::{Error, Result};
use crate::json;
use crate::types::PropertyType;

use super::{DynamicValue, Evaluated};

/// One entry in a case's condition list: a plain condition or a nested case.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseOrCondition {
    Condition(Condition),
    Case(Box<SwitchCase>),
}

impl CaseOrCondition {
    pub fn is_met(&self, ctx: &EvaluationContext<'_>) -> bool {
        match self {
            CaseOrCondition::Condition(c) => c.evaluate(ctx),
            CaseOrCondition::Case(c) => c.is_case_met(ctx),
        }
    }

    fn as_condition(&self) -> Option<&Condition> {
        match self {
            CaseOrCondition::Condition(c) => Some(c),
            CaseOrCondition::Case(_) => None,
        }
    }
}

impl From<Condition> for CaseOrCondition {
    fn from(condition: Condition) -> Self {
        CaseOrCondition::Condition(condition)
    }
}

impl From<SwitchCase> for CaseOrCondition {
    fn from(case: SwitchCase) -> Self {
        CaseOrCondition::Case(Box::new(case))
    }
}

/// A case of a [`SwitchValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchCase {
    /// When `guard` holds, the nested switch decides the value.
    When { guard: Condition, switch: SwitchValue },
    /// Every condition must hold. No conditions is the default case.
    And {
        conditions: Vec<CaseOrCondition>,
        value: DynamicValue,
    },
    /// At least one condition must hold.
    Or {
        conditions: Vec<CaseOrCondition>,
        value: DynamicValue,
    },
}

impl SwitchCase {
    pub fn when(guard: Condition, switch: SwitchValue) -> Self {
        SwitchCase::When { guard, switch }
    }

    pub fn and(conditions: Vec<CaseOrCondition>, value: impl Into<DynamicValue>) -> Self {
        SwitchCase::And {
            conditions,
            value: value.into(),
        }
    }

    /// A single-condition `Or` is stored as `And`.
    pub fn or(conditions: Vec<CaseOrCondition>, value: impl Into<DynamicValue>) -> Self {
        if conditions.len() == 1 {
            return Self::and(conditions, value);
        }
        SwitchCase::Or {
            conditions,
            value: value.into(),
        }
    }

    /// Case that always matches.
    pub fn default_case(value: impl Into<DynamicValue>) -> Self {
        Self::and(Vec::new(), value)
    }

    pub fn conditions(&self) -> &[CaseOrCondition] {
        match self {
            SwitchCase::When { .. } => &[],
            SwitchCase::And { conditions, .. } | SwitchCase::Or { conditions, .. } => conditions,
        }
    }

    /// Leaf value, `None` for `when` cases.
    pub fn value(&self) -> Option<&DynamicValue> {
        match self {
            SwitchCase::When { .. } => None,
            SwitchCase::And { value, .. } | SwitchCase::Or { value, .. } => Some(value),
        }
    }

    pub fn is_default(&self) -> bool {
        !matches!(self, SwitchCase::When { .. }) && self.conditions().is_empty()
    }

    pub fn is_case_met(&self, ctx: &EvaluationContext<'_>) -> bool {
        match self {
            SwitchCase::When { guard, .. } => guard_is_met(guard, ctx),
            SwitchCase::And { conditions, .. } => conditions.iter().all(|c| c.is_met(ctx)),
            SwitchCase::Or { conditions, .. } => {
                conditions.is_empty() || conditions.iter().any(|c| c.is_met(ctx))
            }
        }
    }

    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Option<Evaluated> {
        match self {
            SwitchCase::When { switch, .. } => switch.evaluate(ctx),
            SwitchCase::And { value, .. } | SwitchCase::Or { value, .. } => {
                value.try_evaluate_boxed(ctx)
            }
        }
    }

    pub fn evaluate_condition(&self, ctx: &EvaluationContext<'_>, condition: &Condition) -> bool {
        match self {
            SwitchCase::When { switch, .. } => switch.evaluate_condition(ctx, condition),
            SwitchCase::And { value, .. } | SwitchCase::Or { value, .. } => {
                value.evaluate_condition(ctx, condition)
            }
        }
    }

    fn value_type(&self) -> Option<PropertyType> {
        match self {
            SwitchCase::When { switch, .. } => switch.value_type(),
            SwitchCase::And { value, .. } | SwitchCase::Or { value, .. } => value.value_type(),
        }
    }
}

/// A `when` guard over a reference the schema does not know holds.
fn guard_is_met(guard: &Condition, ctx: &EvaluationContext<'_>) -> bool {
    match &guard.variable {
        None => true,
        Some(DynamicValue::PropertyRef(r)) if r.resolve_property(ctx).is_none() => true,
        Some(variable) => variable.evaluate_condition(ctx, guard),
    }
}

/// An ordered, non-empty list of cases.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchValue {
    cases: Vec<SwitchCase>,
    value_type: Option<PropertyType>,
}

impl SwitchValue {
    pub fn new(cases: Vec<SwitchCase>) -> Result<Self> {
        if cases.is_empty() {
            return Err(Error::InvalidOperation(
                "a switch needs at least one case".to_string(),
            ));
        }
        Ok(Self {
            cases,
            value_type: None,
        })
    }

    /// Declare the value type instead of inferring it from the cases.
    pub fn with_value_type(mut self, value_type: PropertyType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    pub fn cases(&self) -> &[SwitchCase] {
        &self.cases
    }

    /// The declared type, or the first case value with a known type.
    pub fn value_type(&self) -> Option<PropertyType> {
        self.value_type
            .clone()
            .or_else(|| self.cases.iter().find_map(SwitchCase::value_type))
    }

    /// First case whose conditions hold.
    pub fn match_case(&self, ctx: &EvaluationContext<'_>) -> Option<&SwitchCase> {
        self.cases.iter().find(|c| c.is_case_met(ctx))
    }

    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Option<Evaluated> {
        match self.match_case(ctx) {
            Some(case) => case.evaluate(ctx),
            None => Some(Evaluated::Null),
        }
    }

    pub fn evaluate_condition(&self, ctx: &EvaluationContext<'_>, condition: &Condition) -> bool {
        match self.match_case(ctx) {
            Some(case) => case.evaluate_condition(ctx, condition),
            None => condition.evaluate_nulls(true, condition.comparand.is_none()),
        }
    }

    /// Assuming every case in `previous` is false and `case` is true, the case
    /// of this switch that must match. `None` when that cannot be decided
    /// without evaluating.
    pub fn try_match_given(&self, previous: &[SwitchCase], case: &SwitchCase) -> Option<&SwitchCase> {
        let mut known = Knowledge::default();
        known.gather_true(case);
        for c in known.truths.clone() {
            push_unique(&mut known.falsehoods, c.opposite());
        }
        for c in previous {
            known.gather_false(c);
        }
        for c in known.falsehoods.clone() {
            push_unique(&mut known.truths, c.opposite());
        }
        known.eliminate_groups();
        self.match_known(&known)
    }

    fn match_known(&self, known: &Knowledge) -> Option<&SwitchCase> {
        let mut sure = true;
        for case in &self.cases {
            if case.is_default() {
                return sure.then_some(case);
            }
            match case {
                SwitchCase::When { guard, switch } => match known.check_condition(guard) {
                    None => sure = false,
                    Some(true) if sure => return switch.match_known(known),
                    _ => {}
                },
                SwitchCase::And { conditions, .. } => {
                    if conditions.len() > 1 && contains_group(&known.false_groups, conditions) {
                        continue;
                    }
                    let mut any_false = false;
                    for c in conditions {
                        match known.check(c) {
                            None => sure = false,
                            Some(false) => {
                                any_false = true;
                                break;
                            }
                            Some(true) => {}
                        }
                    }
                    if !any_false && sure {
                        return Some(case);
                    }
                }
                SwitchCase::Or { conditions, .. } => {
                    if sure && conditions.len() > 1 && contains_group(&known.true_groups, conditions) {
                        return Some(case);
                    }
                    let was_sure = sure;
                    for c in conditions {
                        match known.check(c) {
                            None => sure = false,
                            Some(true) if was_sure => return Some(case),
                            _ => {}
                        }
                    }
                }
            }
        }
        None
    }
}

/// Conditions known to be true or false, plus groups of which at least one
/// member is true (`true_groups`) or at least one is false (`false_groups`).
#[derive(Debug, Default)]
struct Knowledge {
    truths: Vec<Condition>,
    falsehoods: Vec<Condition>,
    true_groups: Vec<Vec<Condition>>,
    false_groups: Vec<Vec<Condition>>,
}

impl Knowledge {
    fn gather_true(&mut self, case: &SwitchCase) {
        match case {
            SwitchCase::When { guard, .. } => push_unique(&mut self.truths, guard.clone()),
            SwitchCase::And { conditions, .. } => {
                for c in conditions.iter().filter_map(CaseOrCondition::as_condition) {
                    push_unique(&mut self.truths, c.clone());
                }
            }
            SwitchCase::Or { conditions, .. } => {
                if let Some(group) = plain_conditions(conditions) {
                    push_unique(&mut self.true_groups, group);
                }
            }
        }
    }

    fn gather_false(&mut self, case: &SwitchCase) {
        match case {
            SwitchCase::When { guard, .. } => push_unique(&mut self.falsehoods, guard.clone()),
            SwitchCase::Or { conditions, .. } => {
                for c in conditions.iter().filter_map(CaseOrCondition::as_condition) {
                    push_unique(&mut self.falsehoods, c.clone());
                }
            }
            SwitchCase::And { conditions, .. } if conditions.len() == 1 => {
                if let Some(c) = conditions[0].as_condition() {
                    push_unique(&mut self.falsehoods, c.clone());
                }
            }
            SwitchCase::And { conditions, .. } => {
                if let Some(group) = plain_conditions(conditions).filter(|g| !g.is_empty()) {
                    push_unique(&mut self.false_groups, group);
                }
            }
        }
    }

    /// Resolve groups whose members are all decided, and groups where every
    /// member but one is decided against the group.
    fn eliminate_groups(&mut self) {
        let mut groups = std::mem::take(&mut self.true_groups);
        groups.retain(|group| self.settle_group(group, true));
        self.true_groups = groups;

        let mut groups = std::mem::take(&mut self.false_groups);
        groups.retain(|group| self.settle_group(group, false));
        self.false_groups = groups;
    }

    /// Returns whether the group is still undecided.
    fn settle_group(&mut self, group: &[Condition], truthy: bool) -> bool {
        let (mut trues, mut falses) = (0usize, 0usize);
        let mut undecided = None;
        for (i, c) in group.iter().enumerate() {
            match self.check_condition(c) {
                Some(true) => trues += 1,
                Some(false) => falses += 1,
                None => undecided = Some(i),
            }
        }

        if trues == group.len() || falses == group.len() {
            return false;
        }
        let (against, toward) = if truthy { (falses, trues) } else { (trues, falses) };
        match undecided {
            Some(i) if toward == 0 && against == group.len() - 1 => {
                let forced = group[i].clone();
                let opposite = forced.opposite();
                if truthy {
                    push_unique(&mut self.truths, forced);
                    push_unique(&mut self.falsehoods, opposite);
                } else {
                    push_unique(&mut self.falsehoods, forced);
                    push_unique(&mut self.truths, opposite);
                }
                false
            }
            _ => true,
        }
    }

    fn check_condition(&self, condition: &Condition) -> Option<bool> {
        condition.variable.as_ref()?;
        if self.truths.contains(condition) {
            Some(true)
        } else if self.falsehoods.contains(condition) {
            Some(false)
        } else {
            None
        }
    }

    fn check(&self, c: &CaseOrCondition) -> Option<bool> {
        self.check_condition(c.as_condition()?)
    }
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

/// The conditions of a list that holds no nested cases.
fn plain_conditions(conditions: &[CaseOrCondition]) -> Option<Vec<Condition>> {
    conditions
        .iter()
        .map(|c| c.as_condition().cloned())
        .collect()
}

/// Whether some group appears in full among `conditions`.
fn contains_group(groups: &[Vec<Condition>], conditions: &[CaseOrCondition]) -> bool {
    groups.iter().any(|group| {
        group
            .iter()
            .all(|g| conditions.iter().any(|c| c.as_condition() == Some(g)))
    })
}

impl fmt::Display for SwitchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match json::switch_to_json(self) {
            Ok(value) => write!(f, "{}", value),
            Err(_) => write!(f, "Switch [{} cases]", self.cases.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::ConditionOperation;
    use crate::scalar::Scalar;
    use crate::value::PropertyRef;

    fn included(name: &str) -> Condition {
        Condition::new(
            PropertyRef::named(name).into(),
            ConditionOperation::Included,
            None,
        )
    }

    fn eq(name: &str, value: i32) -> Condition {
        Condition::new(
            PropertyRef::named(name).into(),
            ConditionOperation::Equal,
            Scalar::Int32(value),
        )
    }

    #[test]
    fn test_switch_needs_cases() {
        assert!(SwitchValue::new(Vec::new()).is_err());
    }

    #[test]
    fn test_single_or_is_and() {
        let case = SwitchCase::or(vec![included("A").into()], true);
        assert!(matches!(case, SwitchCase::And { .. }));
    }

    #[test]
    fn test_value_type_from_cases() {
        let switch = SwitchValue::new(vec![
            SwitchCase::and(vec![included("A").into()], DynamicValue::Null),
            SwitchCase::default_case(DynamicValue::concrete(1.5f32)),
        ])
        .unwrap();
        assert_eq!(switch.value_type(), Some(PropertyType::FLOAT32));
        assert_eq!(
            switch.with_value_type(PropertyType::FLOAT64).value_type(),
            Some(PropertyType::FLOAT64)
        );
    }

    #[test]
    fn test_match_given_true_case() {
        // switch (Uniform_Scale included) { true => f32, default => vec3 }
        let type_switch = SwitchValue::new(vec![
            SwitchCase::and(vec![included("Uniform_Scale").into()], DynamicValue::concrete("Float32")),
            SwitchCase::default_case(DynamicValue::concrete("Vector3")),
        ])
        .unwrap();

        let same = SwitchCase::and(vec![included("Uniform_Scale").into()], DynamicValue::concrete(0i32));
        let matched = type_switch.try_match_given(&[], &same).unwrap();
        assert_eq!(matched.value(), Some(&DynamicValue::concrete("Float32")));

        let fallback = SwitchCase::default_case(DynamicValue::concrete(0i32));
        let matched = type_switch.try_match_given(&[same.clone()], &fallback).unwrap();
        assert_eq!(matched.value(), Some(&DynamicValue::concrete("Vector3")));
    }

    #[test]
    fn test_match_given_inconclusive() {
        let switch = SwitchValue::new(vec![
            SwitchCase::and(vec![eq("Mode", 1).into()], DynamicValue::concrete(1i32)),
            SwitchCase::default_case(DynamicValue::concrete(2i32)),
        ])
        .unwrap();
        let unrelated = SwitchCase::and(vec![eq("Other", 3).into()], DynamicValue::concrete(0i32));
        assert!(switch.try_match_given(&[], &unrelated).is_none());
    }

    #[test]
    fn test_match_given_uses_opposites() {
        let switch = SwitchValue::new(vec![
            SwitchCase::and(vec![eq("Mode", 1).into()], DynamicValue::concrete(1i32)),
            SwitchCase::and(
                vec![Condition::new(
                    PropertyRef::named("Mode").into(),
                    ConditionOperation::NotEqual,
                    Scalar::Int32(1),
                )
                .into()],
                DynamicValue::concrete(2i32),
            ),
        ])
        .unwrap();
        let previous = SwitchCase::and(vec![eq("Mode", 1).into()], DynamicValue::concrete(9i32));
        let current = SwitchCase::default_case(DynamicValue::concrete(0i32));
        let matched = switch.try_match_given(&[previous], &current).unwrap();
        assert_eq!(matched.value(), Some(&DynamicValue::concrete(2i32)));
    }

    #[test]
    fn test_or_group_elimination() {
        // Known: A or B. Previous case "A" was false, so B must be true.
        let switch = SwitchValue::new(vec![
            SwitchCase::and(vec![included("B").into()], DynamicValue::concrete(1i32)),
            SwitchCase::default_case(DynamicValue::concrete(2i32)),
        ])
        .unwrap();
        let previous = SwitchCase::and(vec![included("A").into()], DynamicValue::Null);
        let current = SwitchCase::or(
            vec![included("A").into(), included("B").into()],
            DynamicValue::Null,
        );
        let matched = switch.try_match_given(&[previous], &current).unwrap();
        assert_eq!(matched.value(), Some(&DynamicValue::concrete(1i32)));
    }
}
