//! Property-based tests using QuickCheck

use std::sync::Arc;

use assetlsp_values::compare::{self, Comparison};
use assetlsp_values::value::flags::{composite_of, deconstruct};
use assetlsp_values::{Condition, ConditionOperation, DynamicValue, EnumMember, EnumType, Scalar, ValueKind};
use quickcheck::{QuickCheck, TestResult};

mod test_support;

fn blades() -> EnumType {
    let members = ["SLASH", "STAB", "BLUNT", "PIERCE"]
        .iter()
        .enumerate()
        .map(|(i, name)| EnumMember {
            name: Arc::from(*name),
            value: 1 << i,
        })
        .collect();
    EnumType::new("EBladeType", members, true)
}

/// Property: every composite of named bits survives deconstruction
#[test]
fn prop_flags_round_trip_strict() {
    fn prop(bits: u8) -> TestResult {
        let ty = blades();
        let composite = u64::from(bits & 0x0F);
        match deconstruct(&ty, composite, true) {
            Ok(indices) => TestResult::from_bool(composite_of(&ty, &indices) == composite),
            Err(_) => TestResult::failed(),
        }
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(u8) -> TestResult);
}

/// Property: lenient deconstruction drops exactly the unnamed bits
#[test]
fn prop_flags_round_trip_lenient() {
    fn prop(composite: u64) -> TestResult {
        let ty = blades();
        let strict_ok = deconstruct(&ty, composite, true).is_ok();
        match deconstruct(&ty, composite, false) {
            Ok(indices) => TestResult::from_bool(
                composite_of(&ty, &indices) == composite & 0x0F
                    && strict_ok == (composite & !0x0F == 0),
            ),
            Err(_) => TestResult::failed(),
        }
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(u64) -> TestResult);
}

/// Property: equality across integer widths is symmetric and exact
#[test]
fn prop_cross_width_equality_symmetric() {
    fn prop(a: i16, b: i64) -> TestResult {
        let left = Scalar::Int16(a);
        let right = Scalar::Int64(b);
        let forward = compare::equals(&left, &right, false);
        let backward = compare::equals(&right, &left, false);
        TestResult::from_bool(
            forward == backward && forward.is_matched() == (i64::from(a) == b),
        )
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(i16, i64) -> TestResult);
}

/// Property: an integer equals its float widening
#[test]
fn prop_integer_equals_float() {
    fn prop(a: i32) -> TestResult {
        let matched = compare::equals(&Scalar::Int32(a), &Scalar::Float64(f64::from(a)), false);
        let ordered = compare::compare(&Scalar::Float64(f64::from(a) + 0.5), &Scalar::Int32(a), false);
        TestResult::from_bool(
            matched == Comparison::Matched && ordered == Some(std::cmp::Ordering::Greater),
        )
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(i32) -> TestResult);
}

/// Property: case-insensitive equality ignores ASCII case
#[test]
fn prop_case_insensitive_reflexive() {
    fn prop(s: String) -> TestResult {
        if !s.is_ascii() {
            return TestResult::discard();
        }
        let upper = Scalar::string(s.to_ascii_uppercase());
        let original = Scalar::string(s.as_str());
        TestResult::from_bool(
            compare::equals(&original, &upper, true).is_matched()
                && compare::equals(&original, &original, false).is_matched(),
        )
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(String) -> TestResult);
}

/// Property: integer text parses back to the same value
#[test]
fn prop_integer_text_round_trip() {
    fn prop(n: i64) -> TestResult {
        let value = DynamicValue::from_text(&ValueKind::Int64.into(), &n.to_string());
        TestResult::from_bool(value.ok() == Some(DynamicValue::concrete(n)))
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(i64) -> TestResult);
}

/// Property: inverting a condition flips it for any non-null operands
#[test]
fn prop_inversion_flips_comparisons() {
    fn prop(a: i32, b: i32) -> TestResult {
        let types = test_support::types();
        let condition = Condition::new(
            DynamicValue::concrete(a),
            ConditionOperation::LessThan,
            Scalar::Int32(b),
        );
        let value = Scalar::Int32(a);
        let plain = condition.evaluate_scalar(Some(&value), types);
        let inverted = condition
            .clone()
            .with_inverted(true)
            .evaluate_scalar(Some(&value), types);
        TestResult::from_bool(plain == (a < b) && inverted == !plain)
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(i32, i32) -> TestResult);
}
