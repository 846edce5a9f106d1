//! Trigonometric functions and `SQRT`
//!
//! Single-precision results are computed in `f32`; every other result type
//! computes in `f64` and converts back.

use crate::scalar::Scalar;
use crate::types::{PropertyType, ValueKind};
use crate::value::Evaluated;

use super::{from_f64, map_components, number, Function};

pub(super) fn unary(function: Function, arg: &Evaluated, ty: &PropertyType) -> Option<Evaluated> {
    let Evaluated::Value(value) = arg else {
        return Some(Evaluated::Null);
    };
    let result = match ty.kind() {
        kind if kind.is_vector() => {
            map_components(&value.convert(ty)?, |c| eval_f32(function, c))?
        }
        ValueKind::Float32 => match value.convert(ty)? {
            Scalar::Float32(f) => Scalar::Float32(eval_f32(function, f)),
            _ => return None,
        },
        _ => from_f64(eval_f64(function, number(arg)??), ty)?,
    };
    Some(Evaluated::Value(result))
}

fn eval_f32(function: Function, x: f32) -> f32 {
    use std::f32::consts::PI;
    match function {
        Function::SinR => x.sin(),
        Function::CosR => x.cos(),
        Function::TanR => x.tan(),
        Function::AsinR => x.asin(),
        Function::AcosR => x.acos(),
        Function::AtanR => x.atan(),
        Function::SinD => (x * (PI / 180.0)).sin(),
        Function::CosD => (x * (PI / 180.0)).cos(),
        Function::TanD => (x * (PI / 180.0)).tan(),
        Function::AsinD => x.asin() * (180.0 / PI),
        Function::AcosD => x.acos() * (180.0 / PI),
        Function::AtanD => x.atan() * (180.0 / PI),
        Function::Sqrt => x.sqrt(),
        _ => x,
    }
}

fn eval_f64(function: Function, x: f64) -> f64 {
    use std::f64::consts::PI;
    match function {
        Function::SinR => x.sin(),
        Function::CosR => x.cos(),
        Function::TanR => x.tan(),
        Function::AsinR => x.asin(),
        Function::AcosR => x.acos(),
        Function::AtanR => x.atan(),
        Function::SinD => (x * (PI / 180.0)).sin(),
        Function::CosD => (x * (PI / 180.0)).cos(),
        Function::TanD => (x * (PI / 180.0)).tan(),
        Function::AsinD => x.asin() * (180.0 / PI),
        Function::AcosD => x.acos() * (180.0 / PI),
        Function::AtanD => x.atan() * (180.0 / PI),
        Function::Sqrt => x.sqrt(),
        _ => x,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector3;

    fn value(v: impl Into<Scalar>) -> Evaluated {
        Evaluated::Value(v.into())
    }

    fn as_f64(result: Option<Evaluated>) -> f64 {
        match result {
            Some(Evaluated::Value(Scalar::Float64(f))) => f,
            other => panic!("expected f64, got {:?}", other),
        }
    }

    #[test]
    fn test_degree_variants() {
        let ty = PropertyType::FLOAT64;
        assert!((as_f64(unary(Function::SinD, &value(90i32), &ty)) - 1.0).abs() < 1e-12);
        assert!((as_f64(unary(Function::AtanD, &value(1.0f64), &ty)) - 45.0).abs() < 1e-9);
        assert!(as_f64(unary(Function::CosR, &value(0i32), &ty)) == 1.0);
    }

    #[test]
    fn test_sqrt_precision_follows_result_type() {
        assert_eq!(
            unary(Function::Sqrt, &value(16.0f32), &PropertyType::FLOAT32),
            Some(value(4.0f32))
        );
        assert_eq!(
            unary(Function::Sqrt, &value("2.25"), &PropertyType::FLOAT64),
            Some(value(1.5f64))
        );
        assert_eq!(
            unary(Function::Sqrt, &value(9.0f32), &ValueKind::Vector3.into()),
            Some(value(Vector3::new(3.0, 3.0, 3.0)))
        );
    }

    #[test]
    fn test_non_numeric_argument_fails_softly() {
        assert_eq!(unary(Function::SinR, &value("abc"), &PropertyType::FLOAT64), None);
        assert_eq!(
            unary(Function::SinR, &Evaluated::Null, &PropertyType::FLOAT64),
            Some(Evaluated::Null)
        );
    }
}
