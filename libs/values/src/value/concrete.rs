//! Literal values of one scalar kind

use std::fmt;

use crate::error::{Error, Result};
use crate::scalar::Scalar;
use crate::types::{PropertyType, ValueKind};

use super::Evaluated;

/// A literal of a declared scalar kind. Nullness is carried apart from the kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcreteValue {
    kind: ValueKind,
    value: Option<Scalar>,
}

impl ConcreteValue {
    pub fn new(value: Scalar) -> Self {
        Self {
            kind: value.kind(),
            value: Some(value),
        }
    }

    pub fn null(kind: ValueKind) -> Self {
        Self { kind, value: None }
    }

    /// Parse with the registered parser for `kind`. `null` is accepted for every
    /// kind except strings.
    pub fn parse(kind: ValueKind, text: &str) -> Result<Self> {
        if kind != ValueKind::String && text.trim().eq_ignore_ascii_case("null") {
            return Ok(Self::null(kind));
        }
        Scalar::parse(kind, text)
            .map(Self::new)
            .ok_or_else(|| Error::ParseError(format!("'{}' is not a valid {}", text, kind)))
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn value(&self) -> Option<&Scalar> {
        self.value.as_ref()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Strings and vector targets convert; any other kind must match exactly.
    pub(crate) fn try_evaluate_value(&self, ty: &PropertyType) -> Result<Option<Evaluated>> {
        let target = ty.kind();
        if target == self.kind {
            return Ok(Some(Evaluated::from(self.value.clone())));
        }
        if ty.is_string() || target.is_vector() {
            return Ok(match &self.value {
                Some(value) => value.convert(ty).map(Evaluated::Value),
                None => Some(Evaluated::Null),
            });
        }
        Err(Error::type_mismatch(ty, self.kind))
    }
}

impl fmt::Display for ConcreteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}", value),
            None => f.write_str("null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Vector3, VectorLike};

    #[test]
    fn test_parse_literals() {
        let v = ConcreteValue::parse(ValueKind::UInt16, "42").unwrap();
        assert_eq!(v.value(), Some(&Scalar::UInt16(42)));
        assert!(ConcreteValue::parse(ValueKind::UInt16, "-1").is_err());
        assert!(ConcreteValue::parse(ValueKind::Int32, "NULL").unwrap().is_null());
        assert_eq!(
            ConcreteValue::parse(ValueKind::String, "null").unwrap().value(),
            Some(&Scalar::string("null"))
        );
    }

    #[test]
    fn test_requested_type_must_match() {
        let v = ConcreteValue::new(Scalar::Int32(3));
        assert_eq!(
            v.try_evaluate_value(&PropertyType::INT32).unwrap(),
            Some(Evaluated::Value(Scalar::Int32(3)))
        );
        assert_eq!(
            v.try_evaluate_value(&PropertyType::STRING).unwrap(),
            Some(Evaluated::Value(Scalar::string("3")))
        );
        assert_eq!(
            v.try_evaluate_value(&ValueKind::Vector3.into()).unwrap(),
            Some(Evaluated::Value(Scalar::Vector3(Vector3::splat(3.0))))
        );
        assert!(matches!(
            v.try_evaluate_value(&PropertyType::FLOAT64),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_null_round_trip() {
        let v = ConcreteValue::null(ValueKind::Guid);
        assert_eq!(
            v.try_evaluate_value(&ValueKind::Guid.into()).unwrap(),
            Some(Evaluated::Null)
        );
        assert_eq!(v.to_string(), "null");
    }
}
