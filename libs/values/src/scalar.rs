//! Runtime scalar values
//!
//! [`Scalar`] is the tagged union every evaluation produces. Conversions between
//! kinds are explicit and checked: narrowing a number that does not fit, or
//! dropping a fractional part, fails instead of truncating.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::geometry::{self, Color, Color32, Vector2, Vector3, Vector4, VectorLike};
use crate::guid_or_id::GuidOrId;
use crate::types::{EnumType, PropertyType, ValueKind};
use crate::value::flags;

/// A member of an enumeration, carried as a runtime value.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumScalar {
    pub ty: Arc<EnumType>,
    pub index: usize,
}

impl EnumScalar {
    pub fn name(&self) -> &str {
        self.ty.member(self.index).map(|m| &*m.name).unwrap_or("")
    }

    pub fn value(&self) -> i64 {
        self.ty.member(self.index).map(|m| m.value).unwrap_or(-1)
    }
}

/// A runtime value of one [`ValueKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Boolean(bool),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Float128(Decimal),
    Character(char),
    String(Arc<str>),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Guid(Uuid),
    GuidOrId(GuidOrId),
    Vector2(Vector2),
    Vector3(Vector3),
    Vector4(Vector4),
    Color(Color),
    Color32(Color32),
    Enum(EnumScalar),
    List(Arc<[Scalar]>),
}

/// A scalar reduced to a number for cross-width comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i128),
    Float(f64),
    Decimal(Decimal),
}

impl Number {
    pub fn to_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
            Number::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
        }
    }

    fn to_decimal(self) -> Option<Decimal> {
        match self {
            Number::Int(i) => Decimal::try_from_i128_with_scale(i, 0).ok(),
            Number::Float(f) => Decimal::try_from(f).ok(),
            Number::Decimal(d) => Some(d),
        }
    }

    /// Integral value, if this number has no fractional part.
    fn to_integral(self) -> Option<i128> {
        match self {
            Number::Int(i) => Some(i),
            Number::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1.7e38 {
                    Some(f as i128)
                } else {
                    None
                }
            }
            Number::Decimal(d) => {
                if d.fract().is_zero() {
                    d.to_i128()
                } else {
                    None
                }
            }
        }
    }

    /// `None` when either side is NaN.
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (Number::Float(_), _) | (_, Number::Float(_)) => {
                self.to_f64().partial_cmp(&other.to_f64())
            }
            _ => match (self.to_decimal(), other.to_decimal()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => self.to_f64().partial_cmp(&other.to_f64()),
            },
        }
    }

    /// Checked conversion into a numeric kind.
    pub fn to_scalar(self, kind: ValueKind) -> Option<Scalar> {
        if kind.is_integer() {
            let i = self.to_integral()?;
            return match kind {
                ValueKind::UInt8 => u8::try_from(i).ok().map(Scalar::UInt8),
                ValueKind::UInt16 => u16::try_from(i).ok().map(Scalar::UInt16),
                ValueKind::UInt32 => u32::try_from(i).ok().map(Scalar::UInt32),
                ValueKind::UInt64 => u64::try_from(i).ok().map(Scalar::UInt64),
                ValueKind::Int8 => i8::try_from(i).ok().map(Scalar::Int8),
                ValueKind::Int16 => i16::try_from(i).ok().map(Scalar::Int16),
                ValueKind::Int32 => i32::try_from(i).ok().map(Scalar::Int32),
                _ => i64::try_from(i).ok().map(Scalar::Int64),
            };
        }
        match kind {
            ValueKind::Float32 => {
                let f = self.to_f64();
                let narrowed = f as f32;
                (narrowed.is_finite() || !f.is_finite()).then_some(Scalar::Float32(narrowed))
            }
            ValueKind::Float64 => Some(Scalar::Float64(self.to_f64())),
            ValueKind::Float128 => self.to_decimal().map(Scalar::Float128),
            ValueKind::Boolean => Some(Scalar::Boolean(self.to_f64() != 0.0)),
            ValueKind::String => Some(Scalar::String(Arc::from(self.to_string()))),
            _ => None,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(v) => write!(f, "{}", v),
            Number::Decimal(d) => write!(f, "{}", d),
        }
    }
}

impl Scalar {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Scalar::String(s.into())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Scalar::Boolean(_) => ValueKind::Boolean,
            Scalar::UInt8(_) => ValueKind::UInt8,
            Scalar::UInt16(_) => ValueKind::UInt16,
            Scalar::UInt32(_) => ValueKind::UInt32,
            Scalar::UInt64(_) => ValueKind::UInt64,
            Scalar::Int8(_) => ValueKind::Int8,
            Scalar::Int16(_) => ValueKind::Int16,
            Scalar::Int32(_) => ValueKind::Int32,
            Scalar::Int64(_) => ValueKind::Int64,
            Scalar::Float32(_) => ValueKind::Float32,
            Scalar::Float64(_) => ValueKind::Float64,
            Scalar::Float128(_) => ValueKind::Float128,
            Scalar::Character(_) => ValueKind::Character,
            Scalar::String(_) => ValueKind::String,
            Scalar::DateTime(_) => ValueKind::DateTime,
            Scalar::DateTimeOffset(_) => ValueKind::DateTimeOffset,
            Scalar::Guid(_) => ValueKind::Guid,
            Scalar::GuidOrId(_) => ValueKind::GuidOrId,
            Scalar::Vector2(_) => ValueKind::Vector2,
            Scalar::Vector3(_) => ValueKind::Vector3,
            Scalar::Vector4(_) => ValueKind::Vector4,
            Scalar::Color(_) => ValueKind::Color,
            Scalar::Color32(_) => ValueKind::Color32,
            Scalar::Enum(_) => ValueKind::Enum,
            Scalar::List(_) => ValueKind::List,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Scalar]> {
        match self {
            Scalar::List(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric reduction: integer and float kinds, enum backing values and
    /// GuidOrId in its id state.
    pub fn to_number(&self) -> Option<Number> {
        Some(match self {
            Scalar::UInt8(v) => Number::Int(*v as i128),
            Scalar::UInt16(v) => Number::Int(*v as i128),
            Scalar::UInt32(v) => Number::Int(*v as i128),
            Scalar::UInt64(v) => Number::Int(*v as i128),
            Scalar::Int8(v) => Number::Int(*v as i128),
            Scalar::Int16(v) => Number::Int(*v as i128),
            Scalar::Int32(v) => Number::Int(*v as i128),
            Scalar::Int64(v) => Number::Int(*v as i128),
            Scalar::Float32(v) => Number::Float(*v as f64),
            Scalar::Float64(v) => Number::Float(*v),
            Scalar::Float128(v) => Number::Decimal(*v),
            Scalar::Enum(e) => Number::Int(e.value() as i128),
            Scalar::GuidOrId(GuidOrId::Id { id, .. }) => Number::Int(*id as i128),
            _ => return None,
        })
    }

    pub fn is_numeric_like(&self) -> bool {
        self.to_number().is_some()
    }

    /// Parse `text` with the registered parser for `kind`.
    ///
    /// Enumerations, flags and lists have no kind-only parser; use
    /// [`Scalar::parse_typed`] for those.
    pub fn parse(kind: ValueKind, text: &str) -> Option<Scalar> {
        let t = text.trim();
        Some(match kind {
            ValueKind::Boolean => {
                if t.eq_ignore_ascii_case("true") {
                    Scalar::Boolean(true)
                } else if t.eq_ignore_ascii_case("false") {
                    Scalar::Boolean(false)
                } else {
                    return None;
                }
            }
            ValueKind::UInt8 => Scalar::UInt8(t.parse().ok()?),
            ValueKind::UInt16 => Scalar::UInt16(t.parse().ok()?),
            ValueKind::UInt32 => Scalar::UInt32(t.parse().ok()?),
            ValueKind::UInt64 => Scalar::UInt64(t.parse().ok()?),
            ValueKind::Int8 => Scalar::Int8(t.parse().ok()?),
            ValueKind::Int16 => Scalar::Int16(t.parse().ok()?),
            ValueKind::Int32 => Scalar::Int32(t.parse().ok()?),
            ValueKind::Int64 => Scalar::Int64(t.parse().ok()?),
            ValueKind::Float32 => Scalar::Float32(t.parse().ok()?),
            ValueKind::Float64 => Scalar::Float64(t.parse().ok()?),
            ValueKind::Float128 => Scalar::Float128(Decimal::from_str(t).ok()?),
            ValueKind::Character => {
                let mut chars = text.chars();
                let c = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                Scalar::Character(c)
            }
            ValueKind::String => Scalar::string(text),
            ValueKind::DateTime => Scalar::DateTime(parse_date_time(t)?),
            ValueKind::DateTimeOffset => Scalar::DateTimeOffset(parse_date_time_offset(t)?),
            ValueKind::Guid => Scalar::Guid(Uuid::parse_str(t).ok()?),
            ValueKind::GuidOrId => Scalar::GuidOrId(t.parse().ok()?),
            ValueKind::Vector2 => Scalar::Vector2(geometry::parse_vector(t)?),
            ValueKind::Vector3 => Scalar::Vector3(geometry::parse_vector(t)?),
            ValueKind::Vector4 => Scalar::Vector4(geometry::parse_vector(t)?),
            ValueKind::Color => Scalar::Color(geometry::parse_color(t)?),
            ValueKind::Color32 => Scalar::Color32(geometry::parse_color32(t)?),
            ValueKind::Enum | ValueKind::Flags | ValueKind::List => return None,
        })
    }

    /// Parse `text` as a value of `ty`, including enumeration member names and
    /// comma-separated flags. Member names match in any case.
    pub fn parse_typed(ty: &PropertyType, text: &str) -> Option<Scalar> {
        Scalar::parse_typed_case(ty, text, true)
    }

    /// [`Scalar::parse_typed`] with member names matched exactly unless
    /// `case_insensitive`.
    pub fn parse_typed_case(ty: &PropertyType, text: &str, case_insensitive: bool) -> Option<Scalar> {
        match ty {
            PropertyType::Scalar(kind) => Scalar::parse(*kind, text),
            PropertyType::Enum(e) => {
                let index = e.find(text, case_insensitive).or_else(|| {
                    let value = text.trim().parse::<i64>().ok()?;
                    e.find_by_value(value)
                })?;
                Some(Scalar::Enum(EnumScalar {
                    ty: e.clone(),
                    index,
                }))
            }
            PropertyType::Flags(e) => {
                let indices = flags::parse_flags(e, text, case_insensitive).ok()?;
                Some(flags::to_list(e, &indices))
            }
        }
    }

    /// Checked conversion into `ty`. Strings parse, numbers narrow with range
    /// checks, and every kind converts to a string via its display form.
    pub fn convert(&self, ty: &PropertyType) -> Option<Scalar> {
        let target = ty.kind();
        if self.kind() == target {
            if let (Scalar::Enum(e), PropertyType::Enum(t)) = (self, ty) {
                if e.ty.name() != t.name() {
                    return Scalar::parse_typed(ty, e.name());
                }
            }
            return Some(self.clone());
        }

        match (self, ty) {
            (_, PropertyType::Scalar(ValueKind::String)) => {
                return Some(Scalar::string(self.to_string()))
            }
            (Scalar::String(s), _) => return Scalar::parse_typed(ty, s),
            (Scalar::Guid(g), PropertyType::Scalar(ValueKind::GuidOrId)) => {
                return Some(Scalar::GuidOrId(GuidOrId::Guid(*g)))
            }
            (Scalar::GuidOrId(GuidOrId::Guid(g)), PropertyType::Scalar(ValueKind::Guid)) => {
                return Some(Scalar::Guid(*g))
            }
            (Scalar::Color(c), PropertyType::Scalar(ValueKind::Color32)) => {
                return Some(Scalar::Color32((*c).into()))
            }
            (Scalar::Color32(c), PropertyType::Scalar(ValueKind::Color)) => {
                return Some(Scalar::Color((*c).into()))
            }
            (Scalar::Color(c), PropertyType::Scalar(ValueKind::Vector4)) => {
                return Some(Scalar::Vector4(Vector4::new(c.r, c.g, c.b, c.a)))
            }
            (Scalar::Vector4(v), PropertyType::Scalar(ValueKind::Color)) => {
                return Some(Scalar::Color(Color::new(v.x, v.y, v.z, v.w)))
            }
            (Scalar::DateTime(d), PropertyType::Scalar(ValueKind::DateTimeOffset)) => {
                return Some(Scalar::DateTimeOffset(Utc.from_utc_datetime(d).fixed_offset()))
            }
            (Scalar::DateTimeOffset(d), PropertyType::Scalar(ValueKind::DateTime)) => {
                return Some(Scalar::DateTime(d.naive_utc()))
            }
            (Scalar::Boolean(b), PropertyType::Scalar(kind)) if kind.is_numeric() => {
                return Number::Int(*b as i128).to_scalar(*kind)
            }
            _ => {}
        }

        let number = self.to_number()?;
        match ty {
            PropertyType::Scalar(ValueKind::GuidOrId) => {
                let id = number.to_scalar(ValueKind::UInt16)?;
                match id {
                    Scalar::UInt16(id) => Some(Scalar::GuidOrId(GuidOrId::id(id))),
                    _ => None,
                }
            }
            PropertyType::Scalar(kind) if kind.is_vector() => {
                let f = number.to_f64() as f32;
                Some(match kind {
                    ValueKind::Vector2 => Scalar::Vector2(Vector2::splat(f)),
                    ValueKind::Vector3 => Scalar::Vector3(Vector3::splat(f)),
                    ValueKind::Vector4 => Scalar::Vector4(Vector4::splat(f)),
                    ValueKind::Color => Scalar::Color(Color::splat(f)),
                    _ => Scalar::Color32(Color32::splat(f)),
                })
            }
            PropertyType::Scalar(kind) => number.to_scalar(*kind),
            PropertyType::Enum(e) => {
                let index = e.find_by_value(i64::try_from(number.to_integral()?).ok()?)?;
                Some(Scalar::Enum(EnumScalar {
                    ty: e.clone(),
                    index,
                }))
            }
            PropertyType::Flags(e) => {
                let composite = u64::try_from(number.to_integral()?).ok()?;
                let indices = flags::deconstruct(e, composite, false).ok()?;
                Some(flags::to_list(e, &indices))
            }
        }
    }
}

fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%m/%d/%Y %H:%M:%S"];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_date_time_offset(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    parse_date_time(text).map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Boolean(v) => write!(f, "{}", v),
            Scalar::UInt8(v) => write!(f, "{}", v),
            Scalar::UInt16(v) => write!(f, "{}", v),
            Scalar::UInt32(v) => write!(f, "{}", v),
            Scalar::UInt64(v) => write!(f, "{}", v),
            Scalar::Int8(v) => write!(f, "{}", v),
            Scalar::Int16(v) => write!(f, "{}", v),
            Scalar::Int32(v) => write!(f, "{}", v),
            Scalar::Int64(v) => write!(f, "{}", v),
            Scalar::Float32(v) => write!(f, "{}", v),
            Scalar::Float64(v) => write!(f, "{}", v),
            Scalar::Float128(v) => write!(f, "{}", v),
            Scalar::Character(v) => write!(f, "{}", v),
            Scalar::String(v) => f.write_str(v),
            Scalar::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S")),
            Scalar::DateTimeOffset(v) => f.write_str(&v.to_rfc3339()),
            Scalar::Guid(v) => write!(f, "{}", v.simple()),
            Scalar::GuidOrId(v) => write!(f, "{}", v),
            Scalar::Vector2(v) => write!(f, "{}", v),
            Scalar::Vector3(v) => write!(f, "{}", v),
            Scalar::Vector4(v) => write!(f, "{}", v),
            Scalar::Color(v) => f.write_str(&Color32::from(*v).to_hex()),
            Scalar::Color32(v) => write!(f, "{}", v),
            Scalar::Enum(e) => f.write_str(e.name()),
            Scalar::List(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(impl From<$ty> for Scalar {
            fn from(v: $ty) -> Self {
                Scalar::$variant(v)
            }
        })+
    };
}

scalar_from! {
    bool => Boolean,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    Decimal => Float128,
    char => Character,
    Uuid => Guid,
    GuidOrId => GuidOrId,
    Vector2 => Vector2,
    Vector3 => Vector3,
    Vector4 => Vector4,
    Color => Color,
    Color32 => Color32,
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::string(v)
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::string(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_narrowing() {
        let n = Number::Int(300);
        assert_eq!(n.to_scalar(ValueKind::UInt8), None);
        assert_eq!(n.to_scalar(ValueKind::UInt16), Some(Scalar::UInt16(300)));
        assert_eq!(Number::Float(5.5).to_scalar(ValueKind::Int32), None);
        assert_eq!(
            Number::Float(5.0).to_scalar(ValueKind::Int32),
            Some(Scalar::Int32(5))
        );
        assert_eq!(Number::Int(-1).to_scalar(ValueKind::UInt32), None);
    }

    #[test]
    fn test_mixed_number_ordering() {
        assert_eq!(
            Number::Int(5).compare(Number::Float(5.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Number::Int(5).compare(Number::Float(5.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Number::Decimal(Decimal::new(25, 1)).compare(Number::Int(2)),
            Some(Ordering::Greater)
        );
        assert_eq!(Number::Float(f64::NAN).compare(Number::Int(1)), None);
    }

    #[test]
    fn test_registered_parsers() {
        assert_eq!(
            Scalar::parse(ValueKind::Boolean, "TRUE"),
            Some(Scalar::Boolean(true))
        );
        assert_eq!(Scalar::parse(ValueKind::UInt16, "65536"), None);
        assert_eq!(
            Scalar::parse(ValueKind::Character, "x"),
            Some(Scalar::Character('x'))
        );
        assert_eq!(Scalar::parse(ValueKind::Character, "xy"), None);
        assert!(Scalar::parse(ValueKind::DateTime, "2024-01-31").is_some());
        assert!(Scalar::parse(ValueKind::Guid, "not a guid").is_none());
    }

    #[test]
    fn test_convert_between_kinds() {
        let s = Scalar::UInt16(42);
        assert_eq!(
            s.convert(&PropertyType::STRING),
            Some(Scalar::string("42"))
        );
        assert_eq!(
            s.convert(&ValueKind::GuidOrId.into()),
            Some(Scalar::GuidOrId(GuidOrId::id(42)))
        );
        assert_eq!(
            Scalar::string("12").convert(&ValueKind::Int64.into()),
            Some(Scalar::Int64(12))
        );
        assert_eq!(
            Scalar::Float64(3.0).convert(&ValueKind::Vector2.into()),
            Some(Scalar::Vector2(Vector2::new(3.0, 3.0)))
        );
    }

    #[test]
    fn test_enum_reduces_to_backing_value() {
        let ty = Arc::new(EnumType::from_names("ERarity", ["COMMON", "RARE"]));
        let rare = Scalar::parse_typed(&PropertyType::Enum(ty), "rare").unwrap();
        assert_eq!(rare.to_number(), Some(Number::Int(1)));
        assert_eq!(rare.to_string(), "RARE");
    }
}
