//! Expression function registry
//!
//! Maps function names to [`Function`] and provides arity and result-type
//! inference. Names are matched case-insensitively through a compile-time
//! perfect hash map keyed by the canonical upper-case spelling.
//!
//! Implementations are organized by category in submodules; [`apply`] is the
//! dispatcher used by expression nodes once their arguments are evaluated.

mod ballistics;
mod math;
mod string;
mod trig;

pub use ballistics::ballistic_gravity_multiplier;

use std::fmt;
use std::str::FromStr;

use phf::phf_map;

use crate::error::Error;
use crate::geometry::VectorLike;
use crate::scalar::Scalar;
use crate::types::{PropertyType, ValueKind};
use crate::value::{DynamicValue, Evaluated};

/// A function usable in `=NAME(args)` expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Abs,
    Round,
    Floor,
    Ceil,
    SinR,
    CosR,
    TanR,
    AsinR,
    AcosR,
    AtanR,
    SinD,
    CosD,
    TanD,
    AsinD,
    AcosD,
    AtanD,
    Sqrt,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
    Avg,
    Cat,
    Pow,
    Rep,
    BallisticGravity,
}

/// Function metadata
#[derive(Debug, Clone, Copy)]
pub struct FunctionMetadata {
    pub function: Function,
    pub name: &'static str,
    pub arity: usize,
}

macro_rules! meta {
    ($function:ident, $name:literal, $arity:literal) => {
        FunctionMetadata {
            function: Function::$function,
            name: $name,
            arity: $arity,
        }
    };
}

static FUNCTIONS_BY_NAME: phf::Map<&'static str, FunctionMetadata> = phf_map! {
    // Unary
    "ABS" => meta!(Abs, "ABS", 1),
    "ROUND" => meta!(Round, "ROUND", 1),
    "FLOOR" => meta!(Floor, "FLOOR", 1),
    "CEIL" => meta!(Ceil, "CEIL", 1),
    "SINR" => meta!(SinR, "SINR", 1),
    "COSR" => meta!(CosR, "COSR", 1),
    "TANR" => meta!(TanR, "TANR", 1),
    "ASINR" => meta!(AsinR, "ASINR", 1),
    "ACOSR" => meta!(AcosR, "ACOSR", 1),
    "ATANR" => meta!(AtanR, "ATANR", 1),
    "SIND" => meta!(SinD, "SIND", 1),
    "COSD" => meta!(CosD, "COSD", 1),
    "TAND" => meta!(TanD, "TAND", 1),
    "ASIND" => meta!(AsinD, "ASIND", 1),
    "ACOSD" => meta!(AcosD, "ACOSD", 1),
    "ATAND" => meta!(AtanD, "ATAND", 1),
    "SQRT" => meta!(Sqrt, "SQRT", 1),

    // Binary
    "ADD" => meta!(Add, "ADD", 2),
    "SUB" => meta!(Sub, "SUB", 2),
    "MUL" => meta!(Mul, "MUL", 2),
    "DIV" => meta!(Div, "DIV", 2),
    "MOD" => meta!(Mod, "MOD", 2),
    "MIN" => meta!(Min, "MIN", 2),
    "MAX" => meta!(Max, "MAX", 2),
    "AVG" => meta!(Avg, "AVG", 2),
    "CAT" => meta!(Cat, "CAT", 2),
    "POW" => meta!(Pow, "POW", 2),

    // Tertiary
    "REP" => meta!(Rep, "REP", 3),
    "CUSTOM_BALLISTIC_GRAV" => meta!(BallisticGravity, "CUSTOM_BALLISTIC_GRAV", 3),
};

impl Function {
    /// Case-insensitive lookup.
    pub fn lookup(name: &str) -> Option<Function> {
        FUNCTIONS_BY_NAME
            .get(name.to_ascii_uppercase().as_str())
            .map(|m| m.function)
    }

    pub fn name(self) -> &'static str {
        use Function::*;
        match self {
            Abs => "ABS",
            Round => "ROUND",
            Floor => "FLOOR",
            Ceil => "CEIL",
            SinR => "SINR",
            CosR => "COSR",
            TanR => "TANR",
            AsinR => "ASINR",
            AcosR => "ACOSR",
            AtanR => "ATANR",
            SinD => "SIND",
            CosD => "COSD",
            TanD => "TAND",
            AsinD => "ASIND",
            AcosD => "ACOSD",
            AtanD => "ATAND",
            Sqrt => "SQRT",
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            Div => "DIV",
            Mod => "MOD",
            Min => "MIN",
            Max => "MAX",
            Avg => "AVG",
            Cat => "CAT",
            Pow => "POW",
            Rep => "REP",
            BallisticGravity => "CUSTOM_BALLISTIC_GRAV",
        }
    }

    pub fn metadata(self) -> Option<&'static FunctionMetadata> {
        FUNCTIONS_BY_NAME.get(self.name())
    }

    pub fn arity(self) -> usize {
        use Function::*;
        match self {
            Add | Sub | Mul | Div | Mod | Min | Max | Avg | Cat | Pow => 2,
            Rep | BallisticGravity => 3,
            _ => 1,
        }
    }

    /// Trigonometric functions and `SQRT`, which always compute in floating point.
    pub fn is_trigonometric(self) -> bool {
        use Function::*;
        matches!(
            self,
            SinR | CosR | TanR | AsinR | AcosR | AtanR | SinD | CosD | TanD | AsinD | AcosD | AtanD | Sqrt
        )
    }
}

impl FromStr for Function {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Function::lookup(s).ok_or_else(|| Error::UnknownFunction(s.to_string()))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn is_arithmetic_target(ty: &PropertyType) -> bool {
    let kind = ty.kind();
    kind.is_vector() || kind.is_numeric() || kind == ValueKind::String
}

/// Result type of `function` applied to `args`, given the type the caller expects.
pub fn infer_result_type(
    function: Function,
    args: &[DynamicValue],
    expected: Option<&PropertyType>,
) -> PropertyType {
    let arg_type = |i: usize| args.get(i).and_then(DynamicValue::value_type);

    match function {
        Function::Cat | Function::Rep => match expected {
            Some(ty) if ty.is_enum_or_string() => ty.clone(),
            _ => PropertyType::STRING,
        },
        Function::BallisticGravity => match expected {
            Some(ty) if ty.kind().is_float() || ty.is_string() => ty.clone(),
            _ => PropertyType::FLOAT32,
        },
        f if f.is_trigonometric() => {
            if let Some(ty) = expected.filter(|t| t.kind().is_vector() || t.kind().is_float()) {
                return ty.clone();
            }
            match arg_type(0) {
                Some(ty) if ty.kind().is_float() || ty.is_string() => ty,
                _ => PropertyType::FLOAT64,
            }
        }
        f if f.arity() == 1 => match expected.filter(|t| is_arithmetic_target(t)) {
            Some(ty) => ty.clone(),
            None => arg_type(0).unwrap_or(PropertyType::FLOAT64),
        },
        _ => {
            if let Some(ty) = expected.filter(|t| is_arithmetic_target(t)) {
                return ty.clone();
            }
            match (arg_type(0), arg_type(1)) {
                (Some(left), Some(right)) if left == right => left,
                (Some(left), Some(right)) => {
                    match (left.kind().integer_width(), right.kind().integer_width()) {
                        (Some(l), Some(r)) if r > l => right,
                        (Some(_), Some(_)) => left,
                        _ => PropertyType::FLOAT64,
                    }
                }
                _ => PropertyType::FLOAT64,
            }
        }
    }
}

/// Apply `function` to already-evaluated arguments, producing a value of `ty`.
///
/// `None` is a soft failure: an argument could not be read as the operand type
/// the function needs, or the result does not fit `ty`.
pub fn apply(function: Function, args: &[Evaluated], ty: &PropertyType) -> Option<Evaluated> {
    if args.len() != function.arity() {
        return None;
    }
    match function {
        Function::Abs | Function::Round | Function::Floor | Function::Ceil => {
            math::unary(function, &args[0], ty)
        }
        f if f.is_trigonometric() => trig::unary(f, &args[0], ty),
        Function::Cat => string::concat(&args[0], &args[1], ty),
        Function::Rep => string::replace(&args[0], &args[1], &args[2], ty),
        Function::BallisticGravity => ballistics::evaluate(&args[0], &args[1], &args[2], ty),
        f => math::binary(f, &args[0], &args[1], ty),
    }
}

// Shared operand helpers

/// Numeric operand: `Some(None)` for null, `None` when the value is not numeric.
fn number(arg: &Evaluated) -> Option<Option<f64>> {
    let Evaluated::Value(value) = arg else {
        return Some(None);
    };
    match value {
        Scalar::String(s) => s.trim().parse::<f64>().ok().map(Some),
        Scalar::Boolean(b) => Some(Some(if *b { 1.0 } else { 0.0 })),
        other => other.to_number().map(|n| Some(n.to_f64())),
    }
}

/// Checked conversion of a computed number into `ty`. Integer targets round
/// half to even first.
pub(crate) fn from_f64(value: f64, ty: &PropertyType) -> Option<Scalar> {
    let value = if ty.kind().is_integer() {
        value.round_ties_even()
    } else {
        value
    };
    Scalar::Float64(value).convert(ty)
}

fn map_components(value: &Scalar, f: impl Fn(f32) -> f32) -> Option<Scalar> {
    Some(match value {
        Scalar::Vector2(v) => Scalar::Vector2(v.map(f)),
        Scalar::Vector3(v) => Scalar::Vector3(v.map(f)),
        Scalar::Vector4(v) => Scalar::Vector4(v.map(f)),
        Scalar::Color(v) => Scalar::Color(v.map(f)),
        Scalar::Color32(v) => Scalar::Color32(v.map(f)),
        _ => return None,
    })
}

fn zip_components(left: &Scalar, right: &Scalar, f: impl Fn(f32, f32) -> f32) -> Option<Scalar> {
    Some(match (left, right) {
        (Scalar::Vector2(a), Scalar::Vector2(b)) => Scalar::Vector2(a.zip(*b, f)),
        (Scalar::Vector3(a), Scalar::Vector3(b)) => Scalar::Vector3(a.zip(*b, f)),
        (Scalar::Vector4(a), Scalar::Vector4(b)) => Scalar::Vector4(a.zip(*b, f)),
        (Scalar::Color(a), Scalar::Color(b)) => Scalar::Color(a.zip(*b, f)),
        (Scalar::Color32(a), Scalar::Color32(b)) => Scalar::Color32(a.zip(*b, f)),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector3;

    fn value(v: impl Into<Scalar>) -> Evaluated {
        Evaluated::Value(v.into())
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(Function::lookup("abs"), Some(Function::Abs));
        assert_eq!(Function::lookup("Custom_Ballistic_Grav"), Some(Function::BallisticGravity));
        assert_eq!("rep".parse::<Function>().unwrap(), Function::Rep);
        assert!(matches!("nope".parse::<Function>(), Err(Error::UnknownFunction(_))));
    }

    #[test]
    fn test_every_function_has_metadata() {
        for meta in FUNCTIONS_BY_NAME.values() {
            assert_eq!(meta.function.name(), meta.name);
            assert_eq!(meta.function.arity(), meta.arity);
            assert_eq!(Function::lookup(meta.name), Some(meta.function));
        }
        assert_eq!(Function::Cat.arity(), 2);
        assert_eq!(Function::Sqrt.arity(), 1);
        assert_eq!(Function::Rep.arity(), 3);
    }

    #[test]
    fn test_infer_binary_types() {
        let u8_arg = DynamicValue::concrete(1u8);
        let i64_arg = DynamicValue::concrete(1i64);
        let f32_arg = DynamicValue::concrete(1.0f32);

        assert_eq!(
            infer_result_type(Function::Add, &[u8_arg.clone(), i64_arg.clone()], None),
            ValueKind::Int64.into()
        );
        assert_eq!(
            infer_result_type(Function::Add, &[f32_arg.clone(), f32_arg.clone()], None),
            PropertyType::FLOAT32
        );
        assert_eq!(
            infer_result_type(Function::Add, &[u8_arg.clone(), f32_arg], None),
            PropertyType::FLOAT64
        );
        assert_eq!(
            infer_result_type(Function::Add, &[u8_arg.clone(), i64_arg], Some(&PropertyType::BOOLEAN)),
            ValueKind::Int64.into()
        );
        assert_eq!(
            infer_result_type(Function::Cat, &[u8_arg.clone(), u8_arg], Some(&PropertyType::INT32)),
            PropertyType::STRING
        );
    }

    #[test]
    fn test_infer_trig_types() {
        let int_arg = DynamicValue::concrete(1i32);
        assert_eq!(
            infer_result_type(Function::SinR, &[int_arg.clone()], None),
            PropertyType::FLOAT64
        );
        assert_eq!(
            infer_result_type(Function::SinR, &[int_arg.clone()], Some(&PropertyType::INT32)),
            PropertyType::FLOAT64
        );
        assert_eq!(
            infer_result_type(Function::Sqrt, &[int_arg], Some(&PropertyType::FLOAT32)),
            PropertyType::FLOAT32
        );
    }

    #[test]
    fn test_apply_checks_arity() {
        assert_eq!(apply(Function::Add, &[value(1i32)], &PropertyType::INT32), None);
    }

    #[test]
    fn test_binary_nulls() {
        assert_eq!(
            apply(Function::Add, &[Evaluated::Null, Evaluated::Null], &PropertyType::INT32),
            Some(Evaluated::Null)
        );
        assert_eq!(
            apply(Function::Sub, &[Evaluated::Null, value(4i32)], &PropertyType::INT32),
            Some(value(-4i32))
        );
    }

    #[test]
    fn test_vector_broadcast() {
        let ty: PropertyType = ValueKind::Vector3.into();
        assert_eq!(
            apply(
                Function::Mul,
                &[value(Vector3::new(1.0, 2.0, 3.0)), value(2.0f64)],
                &ty
            ),
            Some(value(Vector3::new(2.0, 4.0, 6.0)))
        );
    }
}
