//! Rounding and arithmetic functions
//!
//! Binary arithmetic computes in `f64` (vectors in `f32` per component) and
//! converts back to the result type with range checks. A null operand counts
//! as zero; two null operands produce null.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::scalar::Scalar;
use crate::types::{PropertyType, ValueKind};
use crate::value::Evaluated;

use super::{from_f64, map_components, number, zip_components, Function};

/// `ABS`, `ROUND`, `FLOOR` and `CEIL`. Rounding is half to even.
pub(super) fn unary(function: Function, arg: &Evaluated, ty: &PropertyType) -> Option<Evaluated> {
    let Evaluated::Value(value) = arg else {
        return Some(Evaluated::Null);
    };
    let kind = ty.kind();

    let result = if kind.is_vector() {
        map_components(&value.convert(ty)?, |c| round_f32(function, c))?
    } else if kind.is_integer() {
        match value.convert(ty) {
            Some(converted) if kind.is_unsigned_integer() => converted,
            Some(converted) => abs_signed(function, converted)?,
            // fractional operands round before narrowing
            None => from_f64(round_f64(function, number(arg)??), ty)?,
        }
    } else {
        match kind {
            ValueKind::Float32 => match value.convert(ty)? {
                Scalar::Float32(f) => Scalar::Float32(round_f32(function, f)),
                _ => return None,
            },
            ValueKind::Float64 => match value.convert(ty)? {
                Scalar::Float64(f) => Scalar::Float64(round_f64(function, f)),
                _ => return None,
            },
            ValueKind::Float128 => match value.convert(ty)? {
                Scalar::Float128(d) => Scalar::Float128(round_decimal(function, d)),
                _ => return None,
            },
            ValueKind::String => Scalar::string(unary_text(function, &value.to_string())?),
            _ => return None,
        }
    };
    Some(Evaluated::Value(result))
}

/// Numeric text keeps its integer form where it has one; unsigned text is untouched.
fn unary_text(function: Function, text: &str) -> Option<String> {
    let t = text.trim();
    if t.parse::<u64>().is_ok() {
        return Some(t.to_string());
    }
    if let Ok(i) = t.parse::<i64>() {
        return Some(match function {
            Function::Abs => i.checked_abs()?.to_string(),
            _ => i.to_string(),
        });
    }
    let f = t.parse::<f64>().ok()?;
    Some(round_f64(function, f).to_string())
}

fn abs_signed(function: Function, value: Scalar) -> Option<Scalar> {
    if function != Function::Abs {
        return Some(value);
    }
    Some(match value {
        Scalar::Int8(v) => Scalar::Int8(v.checked_abs()?),
        Scalar::Int16(v) => Scalar::Int16(v.checked_abs()?),
        Scalar::Int32(v) => Scalar::Int32(v.checked_abs()?),
        Scalar::Int64(v) => Scalar::Int64(v.checked_abs()?),
        other => other,
    })
}

fn round_f32(function: Function, v: f32) -> f32 {
    match function {
        Function::Abs => v.abs(),
        Function::Round => v.round_ties_even(),
        Function::Floor => v.floor(),
        Function::Ceil => v.ceil(),
        _ => v,
    }
}

fn round_f64(function: Function, v: f64) -> f64 {
    match function {
        Function::Abs => v.abs(),
        Function::Round => v.round_ties_even(),
        Function::Floor => v.floor(),
        Function::Ceil => v.ceil(),
        _ => v,
    }
}

fn round_decimal(function: Function, d: Decimal) -> Decimal {
    match function {
        Function::Abs => d.abs(),
        Function::Round => d.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven),
        Function::Floor => d.floor(),
        Function::Ceil => d.ceil(),
        _ => d,
    }
}

/// `ADD`, `SUB`, `MUL`, `DIV`, `MOD`, `MIN`, `MAX`, `AVG` and `POW`.
pub(super) fn binary(
    function: Function,
    left: &Evaluated,
    right: &Evaluated,
    ty: &PropertyType,
) -> Option<Evaluated> {
    if left.is_null() && right.is_null() {
        return Some(Evaluated::Null);
    }

    if ty.kind().is_vector() {
        let a = vector_operand(left, ty)?;
        let b = vector_operand(right, ty)?;
        let result = zip_components(&a, &b, |x, y| arithmetic_f32(function, x, y))?;
        return Some(Evaluated::Value(result));
    }

    let a = number(left)?.unwrap_or(0.0);
    let b = number(right)?.unwrap_or(0.0);
    from_f64(arithmetic_f64(function, a, b), ty).map(Evaluated::Value)
}

/// Vectors of the result kind pass through, numbers broadcast, null is the zero vector.
fn vector_operand(arg: &Evaluated, ty: &PropertyType) -> Option<Scalar> {
    match arg {
        Evaluated::Null => Scalar::Float32(0.0).convert(ty),
        Evaluated::Value(value) => value.convert(ty),
    }
}

fn arithmetic_f64(function: Function, a: f64, b: f64) -> f64 {
    match function {
        Function::Add => a + b,
        Function::Sub => a - b,
        Function::Mul => a * b,
        Function::Div => a / b,
        Function::Mod => a % b,
        Function::Min => a.min(b),
        Function::Max => a.max(b),
        Function::Avg => (a + b) / 2.0,
        Function::Pow => a.powf(b),
        _ => a,
    }
}

fn arithmetic_f32(function: Function, a: f32, b: f32) -> f32 {
    match function {
        Function::Add => a + b,
        Function::Sub => a - b,
        Function::Mul => a * b,
        Function::Div => a / b,
        Function::Mod => a % b,
        Function::Min => a.min(b),
        Function::Max => a.max(b),
        Function::Avg => (a + b) / 2.0,
        Function::Pow => a.powf(b),
        _ => a,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector2;

    fn value(v: impl Into<Scalar>) -> Evaluated {
        Evaluated::Value(v.into())
    }

    #[test]
    fn test_abs() {
        assert_eq!(
            unary(Function::Abs, &value(-3i32), &PropertyType::INT32),
            Some(value(3i32))
        );
        assert_eq!(
            unary(Function::Abs, &value(7u16), &ValueKind::UInt16.into()),
            Some(value(7u16))
        );
        assert_eq!(
            unary(Function::Abs, &value(i32::MIN), &PropertyType::INT32),
            None
        );
        assert_eq!(
            unary(Function::Abs, &value("-12"), &PropertyType::STRING),
            Some(value("12"))
        );
    }

    #[test]
    fn test_rounding_is_half_even() {
        let f64_ty = PropertyType::FLOAT64;
        assert_eq!(unary(Function::Round, &value(2.5f64), &f64_ty), Some(value(2.0f64)));
        assert_eq!(unary(Function::Round, &value(3.5f64), &f64_ty), Some(value(4.0f64)));
        assert_eq!(unary(Function::Floor, &value(-1.5f64), &f64_ty), Some(value(-2.0f64)));
        assert_eq!(unary(Function::Ceil, &value(1.2f32), &PropertyType::FLOAT32), Some(value(2.0f32)));

        let dec = Decimal::new(25, 1);
        assert_eq!(
            unary(Function::Round, &value(dec), &ValueKind::Float128.into()),
            Some(value(Decimal::new(2, 0)))
        );

        assert_eq!(unary(Function::Round, &value(2.5f64), &PropertyType::INT32), Some(value(2i32)));
        assert_eq!(
            unary(Function::Ceil, &value(0.2f64), &ValueKind::UInt8.into()),
            Some(value(1u8))
        );
    }

    #[test]
    fn test_unary_null_stays_null() {
        assert_eq!(
            unary(Function::Floor, &Evaluated::Null, &PropertyType::FLOAT64),
            Some(Evaluated::Null)
        );
    }

    #[test]
    fn test_arithmetic_converts_back_with_checks() {
        let i32_ty = PropertyType::INT32;
        assert_eq!(binary(Function::Add, &value(2i32), &value(3i32), &i32_ty), Some(value(5i32)));
        assert_eq!(binary(Function::Mod, &value(7i32), &value(3i32), &i32_ty), Some(value(1i32)));
        assert_eq!(binary(Function::Div, &value(5i32), &value(2i32), &i32_ty), Some(value(2i32)));
        assert_eq!(
            binary(Function::Mul, &value(200u8), &value(2u8), &ValueKind::UInt8.into()),
            None
        );
        assert_eq!(
            binary(Function::Pow, &value(2i32), &value(10i32), &PropertyType::FLOAT64),
            Some(value(1024.0f64))
        );
    }

    #[test]
    fn test_division_by_zero_is_ieee() {
        let result = binary(Function::Div, &value(1.0f64), &value(0.0f64), &PropertyType::FLOAT64);
        assert_eq!(result, Some(value(f64::INFINITY)));
        assert_eq!(
            binary(Function::Div, &value(1i32), &value(0i32), &PropertyType::INT32),
            None
        );
    }

    #[test]
    fn test_vector_null_is_zero() {
        let ty: PropertyType = ValueKind::Vector2.into();
        assert_eq!(
            binary(Function::Add, &Evaluated::Null, &value(Vector2::new(1.0, 2.0)), &ty),
            Some(value(Vector2::new(1.0, 2.0)))
        );
        assert_eq!(
            binary(Function::Max, &value(Vector2::new(1.0, 5.0)), &value(3.0f32), &ty),
            Some(value(Vector2::new(3.0, 5.0)))
        );
    }
}
