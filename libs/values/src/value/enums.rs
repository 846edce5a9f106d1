//! Enumeration values

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::scalar::{EnumScalar, Number, Scalar};
use crate::types::{EnumMember, EnumType, PropertyType, ValueKind};

use super::Evaluated;

/// An index into an enumeration's member table, or no value.
#[derive(Debug, Clone)]
pub struct EnumValue {
    ty: Arc<EnumType>,
    index: Option<usize>,
}

impl EnumValue {
    pub fn new(ty: Arc<EnumType>, index: usize) -> Self {
        let index = ty.member(index).map(|_| index);
        Self { ty, index }
    }

    pub fn null(ty: Arc<EnumType>) -> Self {
        Self { ty, index: None }
    }

    /// Member name (case-insensitive), or the member's backing value.
    pub fn parse(ty: Arc<EnumType>, text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("null") {
            return Ok(Self::null(ty));
        }
        let index = ty
            .find(trimmed, true)
            .or_else(|| trimmed.parse::<i64>().ok().and_then(|v| ty.find_by_value(v)))
            .ok_or_else(|| {
                Error::ParseError(format!("'{}' is not a member of {}", trimmed, ty.name()))
            })?;
        Ok(Self {
            ty,
            index: Some(index),
        })
    }

    pub fn enum_type(&self) -> &Arc<EnumType> {
        &self.ty
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn member(&self) -> Option<&EnumMember> {
        self.ty.member(self.index?)
    }

    pub fn is_null(&self) -> bool {
        self.index.is_none()
    }

    pub fn to_scalar(&self) -> Option<Scalar> {
        Some(Scalar::Enum(EnumScalar {
            ty: self.ty.clone(),
            index: self.index?,
        }))
    }

    pub(crate) fn try_evaluate_value(&self, ty: &PropertyType) -> Result<Option<Evaluated>> {
        let Some(member) = self.member() else {
            return Ok(Some(Evaluated::Null));
        };
        let value = match ty {
            PropertyType::Enum(e) if e.name().eq_ignore_ascii_case(self.ty.name()) => {
                self.to_scalar()
            }
            PropertyType::Enum(_) => Scalar::parse_typed(ty, &member.name),
            PropertyType::Scalar(ValueKind::String) => Some(Scalar::String(member.name.clone())),
            PropertyType::Scalar(kind) if kind.is_integer() => {
                Number::Int(member.value as i128).to_scalar(*kind)
            }
            _ => {
                return Err(Error::type_mismatch(
                    ty,
                    PropertyType::Enum(self.ty.clone()),
                ))
            }
        };
        Ok(value.map(Evaluated::Value))
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        PropertyType::Enum(self.ty.clone()) == PropertyType::Enum(other.ty.clone())
            && self.index == other.index
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.member() {
            Some(member) => f.write_str(&member.name),
            None => f.write_str("null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rarity() -> Arc<EnumType> {
        Arc::new(EnumType::from_names(
            "EItemRarity",
            ["COMMON", "UNCOMMON", "RARE", "EPIC", "LEGENDARY", "MYTHICAL"],
        ))
    }

    #[test]
    fn test_parse_by_name_or_value() {
        let ty = rarity();
        assert_eq!(EnumValue::parse(ty.clone(), "epic").unwrap().index(), Some(3));
        assert_eq!(EnumValue::parse(ty.clone(), "2").unwrap().index(), Some(2));
        assert!(EnumValue::parse(ty.clone(), "Null").unwrap().is_null());
        assert!(EnumValue::parse(ty, "SHINY").is_err());
    }

    #[test]
    fn test_out_of_range_index_is_null() {
        assert!(EnumValue::new(rarity(), 40).is_null());
    }

    #[test]
    fn test_try_evaluate_conversions() {
        let value = EnumValue::new(rarity(), 4);
        assert_eq!(
            value.try_evaluate_value(&PropertyType::STRING).unwrap(),
            Some(Evaluated::Value(Scalar::string("LEGENDARY")))
        );
        assert_eq!(
            value.try_evaluate_value(&PropertyType::INT32).unwrap(),
            Some(Evaluated::Value(Scalar::Int32(4)))
        );
        assert!(value.try_evaluate_value(&PropertyType::BOOLEAN).is_err());
    }
}
