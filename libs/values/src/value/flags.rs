//! Bit-flag enumeration values

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::condition::Condition;
use crate::context::TypeDatabase;
use crate::error::{Error, Result};
use crate::scalar::{EnumScalar, Number, Scalar};
use crate::types::{EnumType, PropertyType, ValueKind};

use super::Evaluated;

/// Member indices of a flags value, in ascending bit order.
pub type FlagIndices = SmallVec<[usize; 4]>;

/// Split `composite` into the members whose bits it sets.
///
/// The lowest set bit is cleared repeatedly and each isolated bit is matched
/// against the member table. A bit with no named member is an error when
/// `strict`, and is dropped otherwise.
pub fn deconstruct(ty: &EnumType, composite: u64, strict: bool) -> Result<FlagIndices> {
    let mut indices = FlagIndices::new();
    let mut remaining = composite;
    while remaining != 0 {
        let cleared = remaining & (remaining - 1);
        let bit = remaining ^ cleared;
        remaining = cleared;

        match ty.find_by_value(bit as i64) {
            Some(index) => {
                if !indices.contains(&index) {
                    indices.push(index);
                }
            }
            None if strict => {
                return Err(Error::FormatError(format!(
                    "bit {:#x} of {} has no member in {}",
                    bit,
                    composite,
                    ty.name()
                )))
            }
            None => {}
        }
    }
    Ok(indices)
}

/// Bitwise-OR of the members' codes.
pub fn composite_of(ty: &EnumType, indices: &[usize]) -> u64 {
    indices
        .iter()
        .filter_map(|i| ty.member(*i))
        .fold(0u64, |acc, m| acc | m.value as u64)
}

/// Parse comma-separated member names, or a numeric composite.
pub fn parse_flags(ty: &EnumType, text: &str, case_insensitive: bool) -> Result<FlagIndices> {
    let text = text.trim();
    if let Ok(composite) = text.parse::<u64>() {
        return deconstruct(ty, composite, true);
    }

    let mut indices = FlagIndices::new();
    for name in text.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let index = ty.find(name, case_insensitive).ok_or_else(|| {
            Error::ParseError(format!("'{}' is not a member of {}", name, ty.name()))
        })?;
        if !indices.contains(&index) {
            indices.push(index);
        }
    }
    sort_by_bit(ty, &mut indices);
    Ok(indices)
}

/// Runtime list form used by the comparison protocol.
pub fn to_list(ty: &Arc<EnumType>, indices: &[usize]) -> Scalar {
    let items: Vec<Scalar> = indices
        .iter()
        .map(|&index| {
            Scalar::Enum(EnumScalar {
                ty: ty.clone(),
                index,
            })
        })
        .collect();
    Scalar::List(Arc::from(items))
}

fn sort_by_bit(ty: &EnumType, indices: &mut FlagIndices) {
    indices.sort_by_key(|i| ty.member(*i).map(|m| m.value as u64).unwrap_or(u64::MAX));
}

/// A set of flags members plus their precomputed composite.
#[derive(Debug, Clone)]
pub struct FlagsEnumValue {
    ty: Arc<EnumType>,
    indices: FlagIndices,
    composite: u64,
    is_null: bool,
}

impl FlagsEnumValue {
    /// Build from member indices. Duplicates are removed and the order is
    /// normalized to ascending bits.
    pub fn new(ty: Arc<EnumType>, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut unique = FlagIndices::new();
        for index in indices {
            if ty.member(index).is_some() && !unique.contains(&index) {
                unique.push(index);
            }
        }
        sort_by_bit(&ty, &mut unique);
        let composite = composite_of(&ty, &unique);
        Self {
            ty,
            indices: unique,
            composite,
            is_null: false,
        }
    }

    pub fn null(ty: Arc<EnumType>) -> Self {
        Self {
            ty,
            indices: FlagIndices::new(),
            composite: 0,
            is_null: true,
        }
    }

    pub fn from_composite(ty: Arc<EnumType>, composite: u64, strict: bool) -> Result<Self> {
        let indices = deconstruct(&ty, composite, strict)?;
        Ok(Self::new(ty, indices))
    }

    pub fn parse(ty: Arc<EnumType>, text: &str) -> Result<Self> {
        if text.trim().eq_ignore_ascii_case("null") {
            return Ok(Self::null(ty));
        }
        let indices = parse_flags(&ty, text, true)?;
        Ok(Self::new(ty, indices))
    }

    pub fn enum_type(&self) -> &Arc<EnumType> {
        &self.ty
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn composite(&self) -> u64 {
        self.composite
    }

    pub fn is_null(&self) -> bool {
        self.is_null
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.indices
            .iter()
            .filter_map(|i| self.ty.member(*i))
            .map(|m| &*m.name)
    }

    pub fn to_scalar(&self) -> Option<Scalar> {
        (!self.is_null).then(|| to_list(&self.ty, &self.indices))
    }

    /// Compact form used by the schema JSON: names joined with `,`, `0` for null.
    pub fn to_json_text(&self) -> String {
        if self.is_null || self.indices.is_empty() {
            return "0".to_string();
        }
        self.names().collect::<Vec<_>>().join(",")
    }

    pub(crate) fn try_evaluate_value(&self, ty: &PropertyType) -> Result<Option<Evaluated>> {
        if self.is_null {
            return Ok(Some(Evaluated::Null));
        }
        let value = match ty {
            PropertyType::Flags(e) if e.name().eq_ignore_ascii_case(self.ty.name()) => {
                to_list(&self.ty, &self.indices)
            }
            PropertyType::Scalar(ValueKind::String) => Scalar::string(self.to_string()),
            PropertyType::Scalar(kind) if kind.is_integer() => {
                return Ok(Number::Int(self.composite as i128)
                    .to_scalar(*kind)
                    .map(Evaluated::Value))
            }
            _ => {
                return Err(Error::type_mismatch(
                    ty,
                    PropertyType::Flags(self.ty.clone()),
                ))
            }
        };
        Ok(Some(Evaluated::Value(value)))
    }

    /// Numeric comparands test the composite; text comparands parse as member
    /// names, matched exactly unless the condition is case-insensitive.
    pub(crate) fn evaluate_condition(&self, condition: &Condition, types: &dyn TypeDatabase) -> bool {
        let Some(list) = self.to_scalar() else {
            return condition.evaluate_scalar(None, types);
        };
        match &condition.comparand {
            Some(comparand) if comparand.to_number().is_some() => condition.evaluate_against(
                Some(&Scalar::UInt64(self.composite)),
                Some(comparand),
                types,
            ),
            Some(Scalar::String(text)) => match parse_flags(&self.ty, text, condition.is_case_insensitive()) {
                Ok(indices) => {
                    let comparand = to_list(&self.ty, &indices);
                    condition.evaluate_against(Some(&list), Some(&comparand), types)
                }
                Err(_) => condition.evaluate_nulls(false, true),
            },
            comparand => condition.evaluate_against(Some(&list), comparand.as_ref(), types),
        }
    }
}

impl PartialEq for FlagsEnumValue {
    fn eq(&self, other: &Self) -> bool {
        PropertyType::Flags(self.ty.clone()) == PropertyType::Flags(other.ty.clone())
            && self.is_null == other.is_null
            && self.composite == other.composite
    }
}

impl fmt::Display for FlagsEnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null || self.indices.is_empty() {
            return f.write_str("0");
        }
        f.write_str(&self.names().collect::<Vec<_>>().join(", "))
    }
}
