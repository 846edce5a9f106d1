//! Type system for dynamic values
//!
//! Every dynamic value declares a [`PropertyType`]. Scalar kinds are a closed set
//! ([`ValueKind`]); enumerations carry their own member table ([`EnumType`]).
//!
//! Kind names match the schema's type names (`UInt16`, `Float32`, `GuidOrId`, ...)
//! and are looked up case-insensitively.

use std::fmt;
use std::sync::Arc;

use phf::phf_map;

/// Scalar value kinds known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum ValueKind {
    Boolean = 1,
    UInt8 = 2,
    UInt16 = 3,
    UInt32 = 4,
    UInt64 = 5,
    Int8 = 6,
    Int16 = 7,
    Int32 = 8,
    Int64 = 9,
    Float32 = 10,
    Float64 = 11,
    Float128 = 12,
    Character = 13,
    String = 14,
    DateTime = 15,
    DateTimeOffset = 16,
    Guid = 17,
    GuidOrId = 18,
    Vector2 = 19,
    Vector3 = 20,
    Vector4 = 21,
    Color = 22,
    Color32 = 23,
    Enum = 24,
    Flags = 25,
    List = 26,
}

static KIND_NAMES: phf::Map<&'static str, ValueKind> = phf_map! {
    "bool" => ValueKind::Boolean,
    "boolean" => ValueKind::Boolean,
    "uint8" => ValueKind::UInt8,
    "byte" => ValueKind::UInt8,
    "uint16" => ValueKind::UInt16,
    "uint32" => ValueKind::UInt32,
    "uint64" => ValueKind::UInt64,
    "int8" => ValueKind::Int8,
    "sbyte" => ValueKind::Int8,
    "int16" => ValueKind::Int16,
    "int32" => ValueKind::Int32,
    "int64" => ValueKind::Int64,
    "float32" => ValueKind::Float32,
    "float64" => ValueKind::Float64,
    "float128" => ValueKind::Float128,
    "char" => ValueKind::Character,
    "character" => ValueKind::Character,
    "string" => ValueKind::String,
    "datetime" => ValueKind::DateTime,
    "datetimeoffset" => ValueKind::DateTimeOffset,
    "guid" => ValueKind::Guid,
    "guidorid" => ValueKind::GuidOrId,
    "vector2" => ValueKind::Vector2,
    "vector3" => ValueKind::Vector3,
    "vector4" => ValueKind::Vector4,
    "color" => ValueKind::Color,
    "colorrgb" => ValueKind::Color,
    "color32" => ValueKind::Color32,
    "color32rgb" => ValueKind::Color32,
};

impl ValueKind {
    /// Look up a scalar kind by its schema name (case-insensitive).
    pub fn from_name(name: &str) -> Option<ValueKind> {
        KIND_NAMES.get(name.to_ascii_lowercase().as_str()).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Boolean => "Boolean",
            ValueKind::UInt8 => "UInt8",
            ValueKind::UInt16 => "UInt16",
            ValueKind::UInt32 => "UInt32",
            ValueKind::UInt64 => "UInt64",
            ValueKind::Int8 => "Int8",
            ValueKind::Int16 => "Int16",
            ValueKind::Int32 => "Int32",
            ValueKind::Int64 => "Int64",
            ValueKind::Float32 => "Float32",
            ValueKind::Float64 => "Float64",
            ValueKind::Float128 => "Float128",
            ValueKind::Character => "Character",
            ValueKind::String => "String",
            ValueKind::DateTime => "DateTime",
            ValueKind::DateTimeOffset => "DateTimeOffset",
            ValueKind::Guid => "Guid",
            ValueKind::GuidOrId => "GuidOrId",
            ValueKind::Vector2 => "Vector2",
            ValueKind::Vector3 => "Vector3",
            ValueKind::Vector4 => "Vector4",
            ValueKind::Color => "Color",
            ValueKind::Color32 => "Color32",
            ValueKind::Enum => "Enum",
            ValueKind::Flags => "Flags",
            ValueKind::List => "List",
        }
    }

    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            ValueKind::UInt8 | ValueKind::UInt16 | ValueKind::UInt32 | ValueKind::UInt64
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_unsigned_integer()
            || matches!(
                self,
                ValueKind::Int8 | ValueKind::Int16 | ValueKind::Int32 | ValueKind::Int64
            )
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            ValueKind::Float32 | ValueKind::Float64 | ValueKind::Float128
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_vector(self) -> bool {
        matches!(
            self,
            ValueKind::Vector2
                | ValueKind::Vector3
                | ValueKind::Vector4
                | ValueKind::Color
                | ValueKind::Color32
        )
    }

    /// Byte width of an integer kind, used to pick the wider of two integer operands.
    pub fn integer_width(self) -> Option<u8> {
        match self {
            ValueKind::UInt8 | ValueKind::Int8 => Some(1),
            ValueKind::UInt16 | ValueKind::Int16 => Some(2),
            ValueKind::UInt32 | ValueKind::Int32 => Some(4),
            ValueKind::UInt64 | ValueKind::Int64 => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named member of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: Arc<str>,
    /// Backing integer. For flags enumerations this is the member's bit.
    pub value: i64,
}

/// A named enumeration and its member table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    name: Arc<str>,
    members: Vec<EnumMember>,
    flags: bool,
}

impl EnumType {
    pub fn new(name: impl Into<Arc<str>>, members: Vec<EnumMember>, flags: bool) -> Self {
        Self {
            name: name.into(),
            members,
            flags,
        }
    }

    /// Build an enumeration whose members take their index as backing value.
    pub fn from_names<I, S>(name: impl Into<Arc<str>>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let members = names
            .into_iter()
            .enumerate()
            .map(|(i, n)| EnumMember {
                name: n.into(),
                value: i as i64,
            })
            .collect();
        Self::new(name, members, false)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    pub fn is_flags(&self) -> bool {
        self.flags
    }

    pub fn member(&self, index: usize) -> Option<&EnumMember> {
        self.members.get(index)
    }

    pub fn find(&self, name: &str, case_insensitive: bool) -> Option<usize> {
        let name = name.trim();
        self.members.iter().position(|m| {
            if case_insensitive {
                m.name.eq_ignore_ascii_case(name)
            } else {
                &*m.name == name
            }
        })
    }

    pub fn find_by_value(&self, value: i64) -> Option<usize> {
        self.members.iter().position(|m| m.value == value)
    }
}

/// The declared type of a dynamic value.
#[derive(Debug, Clone)]
pub enum PropertyType {
    Scalar(ValueKind),
    Enum(Arc<EnumType>),
    Flags(Arc<EnumType>),
}

impl PropertyType {
    pub const BOOLEAN: PropertyType = PropertyType::Scalar(ValueKind::Boolean);
    pub const INT32: PropertyType = PropertyType::Scalar(ValueKind::Int32);
    pub const FLOAT32: PropertyType = PropertyType::Scalar(ValueKind::Float32);
    pub const FLOAT64: PropertyType = PropertyType::Scalar(ValueKind::Float64);
    pub const STRING: PropertyType = PropertyType::Scalar(ValueKind::String);

    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyType::Scalar(kind) => *kind,
            PropertyType::Enum(_) => ValueKind::Enum,
            PropertyType::Flags(_) => ValueKind::Flags,
        }
    }

    pub fn enum_type(&self) -> Option<&Arc<EnumType>> {
        match self {
            PropertyType::Enum(e) | PropertyType::Flags(e) => Some(e),
            PropertyType::Scalar(_) => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, PropertyType::Scalar(ValueKind::String))
    }

    pub fn is_enum_or_string(&self) -> bool {
        matches!(self, PropertyType::Enum(_)) || self.is_string()
    }

    pub fn name(&self) -> &str {
        match self {
            PropertyType::Scalar(kind) => kind.name(),
            PropertyType::Enum(e) | PropertyType::Flags(e) => e.name(),
        }
    }
}

impl From<ValueKind> for PropertyType {
    fn from(kind: ValueKind) -> Self {
        PropertyType::Scalar(kind)
    }
}

impl PartialEq for PropertyType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyType::Scalar(a), PropertyType::Scalar(b)) => a == b,
            (PropertyType::Enum(a), PropertyType::Enum(b))
            | (PropertyType::Flags(a), PropertyType::Flags(b)) => {
                Arc::ptr_eq(a, b) || a.name.eq_ignore_ascii_case(&b.name)
            }
            _ => false,
        }
    }
}

impl Eq for PropertyType {}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_lookup_is_case_insensitive() {
        assert_eq!(ValueKind::from_name("uint16"), Some(ValueKind::UInt16));
        assert_eq!(ValueKind::from_name("GuidOrId"), Some(ValueKind::GuidOrId));
        assert_eq!(ValueKind::from_name("Float128"), Some(ValueKind::Float128));
        assert_eq!(ValueKind::from_name("Quaternion"), None);
    }

    #[test]
    fn test_enum_types_compare_by_name() {
        let a = PropertyType::Enum(Arc::new(EnumType::from_names("EItemRarity", ["COMMON"])));
        let b = PropertyType::Enum(Arc::new(EnumType::from_names("eitemrarity", ["RARE"])));
        assert_eq!(a, b);
        assert_ne!(a, PropertyType::STRING);
    }

    #[test]
    fn test_integer_widths() {
        assert_eq!(ValueKind::UInt16.integer_width(), Some(2));
        assert_eq!(ValueKind::Int64.integer_width(), Some(8));
        assert_eq!(ValueKind::Float32.integer_width(), None);
    }
}
