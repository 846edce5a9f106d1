//! Dynamic values
//!
//! A [`DynamicValue`] is a computed schema value: a literal, a reference into the
//! current (or a cross-referenced) asset file, an expression tree or a switch.
//! Values are immutable once built and may be shared across threads; everything
//! that varies between evaluations lives in the [`EvaluationContext`].
//!
//! Every variant answers the same two questions:
//!
//! - [`DynamicValue::evaluate_condition`]: does a [`Condition`] over this value hold?
//! - [`DynamicValue::try_evaluate_value`]: what is this value, as a given type?

use std::fmt;
use std::sync::Arc;

use crate::condition::Condition;
use crate::context::EvaluationContext;
use crate::error::Result;
use crate::parser::{self, ParseContext};
use crate::scalar::Scalar;
use crate::types::{PropertyType, ValueKind};

pub mod concrete;
pub mod data_ref;
pub mod enums;
pub mod expression;
pub mod flags;
pub mod property_ref;
pub mod switch;

pub use concrete::ConcreteValue;
pub use data_ref::{DataRef, DataRefProperty, DataRefTarget};
pub use enums::EnumValue;
pub use expression::{ExpressionNode, Function};
pub use flags::FlagsEnumValue;
pub use property_ref::{PropertyRef, PropertyRefInfo};
pub use switch::{CaseOrCondition, SwitchCase, SwitchValue};

/// Outcome of a successful evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
    Value(Scalar),
    Null,
}

impl Evaluated {
    pub fn is_null(&self) -> bool {
        matches!(self, Evaluated::Null)
    }

    pub fn value(&self) -> Option<&Scalar> {
        match self {
            Evaluated::Value(v) => Some(v),
            Evaluated::Null => None,
        }
    }

    pub fn into_value(self) -> Option<Scalar> {
        match self {
            Evaluated::Value(v) => Some(v),
            Evaluated::Null => None,
        }
    }
}

impl From<Option<Scalar>> for Evaluated {
    fn from(value: Option<Scalar>) -> Self {
        match value {
            Some(v) => Evaluated::Value(v),
            None => Evaluated::Null,
        }
    }
}

/// A computed schema value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DynamicValue {
    #[default]
    Null,
    Concrete(ConcreteValue),
    Enum(EnumValue),
    Flags(FlagsEnumValue),
    PropertyRef(PropertyRef),
    DataRef(DataRef),
    Expression(Arc<ExpressionNode>),
    Switch(Arc<SwitchValue>),
}

impl DynamicValue {
    pub fn concrete(value: impl Into<Scalar>) -> Self {
        DynamicValue::from(value.into())
    }

    /// Parse the literal form of a value of `ty`.
    pub fn from_text(ty: &PropertyType, text: &str) -> Result<Self> {
        Ok(match ty {
            PropertyType::Scalar(kind) => DynamicValue::Concrete(ConcreteValue::parse(*kind, text)?),
            PropertyType::Enum(e) => DynamicValue::Enum(EnumValue::parse(e.clone(), text)?),
            PropertyType::Flags(e) => DynamicValue::Flags(FlagsEnumValue::parse(e.clone(), text)?),
        })
    }

    /// Parse the full value grammar: references, expressions, `%(...)` escapes
    /// and literals of `expected`.
    pub fn parse(text: &str, expected: Option<&PropertyType>) -> Result<Self> {
        parser::parse_value(text, expected, ParseContext::Optional)
    }

    /// The literal `null` or a literal carrying no value.
    pub fn is_null(&self) -> bool {
        match self {
            DynamicValue::Null => true,
            DynamicValue::Concrete(c) => c.is_null(),
            DynamicValue::Enum(e) => e.is_null(),
            DynamicValue::Flags(f) => f.is_null(),
            _ => false,
        }
    }

    /// Declared type, when known without resolving anything.
    ///
    /// References whose type depends on the schema property they reach report
    /// `None`.
    pub fn value_type(&self) -> Option<PropertyType> {
        match self {
            DynamicValue::Null | DynamicValue::PropertyRef(_) => None,
            DynamicValue::Concrete(c) => Some(c.kind().into()),
            DynamicValue::Enum(e) => Some(PropertyType::Enum(e.enum_type().clone())),
            DynamicValue::Flags(f) => Some(PropertyType::Flags(f.enum_type().clone())),
            DynamicValue::DataRef(d) => d.value_type(),
            DynamicValue::Expression(e) => Some(e.result_type().clone()),
            DynamicValue::Switch(s) => s.value_type(),
        }
    }

    /// Whether `condition` (with this value as its variable) holds.
    pub fn evaluate_condition(&self, ctx: &EvaluationContext<'_>, condition: &Condition) -> bool {
        let types = ctx.types();
        match self {
            DynamicValue::Null => condition.evaluate_scalar(None, types),
            DynamicValue::Concrete(c) => condition.evaluate_scalar(c.value(), types),
            DynamicValue::Enum(e) => condition.evaluate_scalar(e.to_scalar().as_ref(), types),
            DynamicValue::Flags(f) => f.evaluate_condition(condition, types),
            DynamicValue::PropertyRef(r) => r.evaluate_condition(ctx, condition),
            DynamicValue::DataRef(d) => d.evaluate_condition(ctx, condition),
            DynamicValue::Switch(s) => s.evaluate_condition(ctx, condition),
            DynamicValue::Expression(_) => {
                let value = self.try_evaluate_boxed(ctx).and_then(Evaluated::into_value);
                condition.evaluate_scalar(value.as_ref(), types)
            }
        }
    }

    /// Evaluate as `ty`.
    ///
    /// `Ok(None)` means the value could not be produced as `ty`, which is
    /// expected for references, expressions and switches. Literal nodes assume
    /// the caller checked [`DynamicValue::value_type`] and return
    /// [`Error::TypeMismatch`](crate::Error::TypeMismatch) otherwise.
    pub fn try_evaluate_value(
        &self,
        ctx: &EvaluationContext<'_>,
        ty: &PropertyType,
    ) -> Result<Option<Evaluated>> {
        match self {
            DynamicValue::Null => Ok(Some(Evaluated::Null)),
            DynamicValue::Concrete(c) => c.try_evaluate_value(ty),
            DynamicValue::Enum(e) => e.try_evaluate_value(ty),
            DynamicValue::Flags(f) => f.try_evaluate_value(ty),
            _ => Ok(self.evaluate_as(ctx, ty)),
        }
    }

    /// Evaluate in the value's own type.
    pub fn try_evaluate_boxed(&self, ctx: &EvaluationContext<'_>) -> Option<Evaluated> {
        match self {
            DynamicValue::Null => Some(Evaluated::Null),
            DynamicValue::Concrete(c) => Some(Evaluated::from(c.value().cloned())),
            DynamicValue::Enum(e) => Some(Evaluated::from(e.to_scalar())),
            DynamicValue::Flags(f) => Some(Evaluated::from(f.to_scalar())),
            DynamicValue::PropertyRef(r) => r.evaluate(ctx),
            DynamicValue::DataRef(d) => d.evaluate(ctx),
            DynamicValue::Expression(e) => e.evaluate(ctx),
            DynamicValue::Switch(s) => s.evaluate(ctx),
        }
    }

    /// Evaluate and convert leniently, `None` when the conversion fails.
    pub(crate) fn evaluate_as(&self, ctx: &EvaluationContext<'_>, ty: &PropertyType) -> Option<Evaluated> {
        match self.try_evaluate_boxed(ctx)? {
            Evaluated::Null => Some(Evaluated::Null),
            Evaluated::Value(value) => coerce(&value, ty),
        }
    }
}

/// Lenient conversion used between expression operands and references.
///
/// Booleans accept numbers (nonzero is true) and text (anything but `false`
/// is true, blank text is null).
pub(crate) fn coerce(value: &Scalar, ty: &PropertyType) -> Option<Evaluated> {
    if let PropertyType::Scalar(ValueKind::Boolean) = ty {
        return match value {
            Scalar::Boolean(_) => Some(Evaluated::Value(value.clone())),
            Scalar::String(s) if s.trim().is_empty() => Some(Evaluated::Null),
            Scalar::String(s) => Some(Evaluated::Value(Scalar::Boolean(
                !s.trim().eq_ignore_ascii_case("false"),
            ))),
            other => {
                let n = other.to_number()?;
                Some(Evaluated::Value(Scalar::Boolean(n.to_f64() != 0.0)))
            }
        };
    }
    value.convert(ty).map(Evaluated::Value)
}

/// Text that must be escaped with `%(...)` to survive a parse.
fn needs_literal_escape(text: &str) -> bool {
    text.starts_with('#') || text.starts_with('@') || text.starts_with('=') || text.starts_with("%(")
}

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicValue::Null => f.write_str("null"),
            DynamicValue::Concrete(c) => match c.value() {
                Some(Scalar::String(s)) if needs_literal_escape(s) => write!(f, "%({})", s),
                _ => write!(f, "{}", c),
            },
            DynamicValue::Enum(e) => write!(f, "{}", e),
            DynamicValue::Flags(v) => write!(f, "{}", v),
            DynamicValue::PropertyRef(r) => write!(f, "{}", r),
            DynamicValue::DataRef(d) => write!(f, "{}", d),
            DynamicValue::Expression(e) => write!(f, "{}", e),
            DynamicValue::Switch(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for DynamicValue {
    fn from(value: bool) -> Self {
        DynamicValue::Concrete(ConcreteValue::new(Scalar::Boolean(value)))
    }
}

impl From<Scalar> for DynamicValue {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Enum(e) => DynamicValue::Enum(EnumValue::new(e.ty, e.index)),
            other => DynamicValue::Concrete(ConcreteValue::new(other)),
        }
    }
}

impl From<ConcreteValue> for DynamicValue {
    fn from(value: ConcreteValue) -> Self {
        DynamicValue::Concrete(value)
    }
}

impl From<EnumValue> for DynamicValue {
    fn from(value: EnumValue) -> Self {
        DynamicValue::Enum(value)
    }
}

impl From<FlagsEnumValue> for DynamicValue {
    fn from(value: FlagsEnumValue) -> Self {
        DynamicValue::Flags(value)
    }
}

impl From<PropertyRef> for DynamicValue {
    fn from(value: PropertyRef) -> Self {
        DynamicValue::PropertyRef(value)
    }
}

impl From<DataRef> for DynamicValue {
    fn from(value: DataRef) -> Self {
        DynamicValue::DataRef(value)
    }
}

impl From<ExpressionNode> for DynamicValue {
    fn from(value: ExpressionNode) -> Self {
        DynamicValue::Expression(Arc::new(value))
    }
}

impl From<SwitchValue> for DynamicValue {
    fn from(value: SwitchValue) -> Self {
        DynamicValue::Switch(Arc::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_escape_on_display() {
        assert_eq!(DynamicValue::concrete("#Self").to_string(), "%(#Self)");
        assert_eq!(DynamicValue::concrete("plain").to_string(), "plain");
        assert_eq!(DynamicValue::Null.to_string(), "null");
    }

    #[test]
    fn test_value_types() {
        assert_eq!(DynamicValue::Null.value_type(), None);
        assert_eq!(
            DynamicValue::concrete(4u16).value_type(),
            Some(ValueKind::UInt16.into())
        );
    }

    #[test]
    fn test_boolean_coercion() {
        let b = PropertyType::BOOLEAN;
        assert_eq!(
            coerce(&Scalar::Int32(2), &b),
            Some(Evaluated::Value(Scalar::Boolean(true)))
        );
        assert_eq!(
            coerce(&Scalar::string("FALSE"), &b),
            Some(Evaluated::Value(Scalar::Boolean(false)))
        );
        assert_eq!(coerce(&Scalar::string(" "), &b), Some(Evaluated::Null));
        assert_eq!(coerce(&Scalar::Guid(uuid::Uuid::nil()), &b), None);
    }
}
