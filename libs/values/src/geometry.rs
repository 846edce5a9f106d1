//! Fixed-size vector and color values
//!
//! All vector-like kinds share the [`VectorLike`] component interface so the
//! expression evaluators can broadcast scalars and apply functions component-wise
//! without knowing the concrete width.

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

/// Component tolerance used for vector equality and ordering.
pub const COMPONENT_TOLERANCE: f32 = 0.0001;

/// Common component access for vector and color values.
pub trait VectorLike: Copy + Sized {
    const LEN: usize;

    fn splat(value: f32) -> Self;

    fn components(&self) -> SmallVec<[f32; 4]>;

    fn from_components(components: &[f32]) -> Option<Self>;

    fn map(self, f: impl Fn(f32) -> f32) -> Self {
        let mapped: SmallVec<[f32; 4]> = self.components().into_iter().map(f).collect();
        Self::from_components(&mapped).unwrap_or(self)
    }

    fn zip(self, other: Self, f: impl Fn(f32, f32) -> f32) -> Self {
        let a = self.components();
        let b = other.components();
        let zipped: SmallVec<[f32; 4]> = a.iter().zip(b.iter()).map(|(x, y)| f(*x, *y)).collect();
        Self::from_components(&zipped).unwrap_or(self)
    }
}

/// Lexicographic component ordering with [`COMPONENT_TOLERANCE`].
pub fn compare_components(a: &[f32], b: &[f32]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let sub = x - y;
        if sub.abs() >= COMPONENT_TOLERANCE {
            return if sub > 0.0 {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }
    }
    a.len().cmp(&b.len())
}

macro_rules! float_vector {
    ($name:ident, $len:expr, $($field:ident),+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Default)]
        pub struct $name {
            $(pub $field: f32,)+
        }

        impl $name {
            pub const fn new($($field: f32),+) -> Self {
                Self { $($field),+ }
            }
        }

        impl VectorLike for $name {
            const LEN: usize = $len;

            fn splat(value: f32) -> Self {
                Self { $($field: value),+ }
            }

            fn components(&self) -> SmallVec<[f32; 4]> {
                smallvec::smallvec![$(self.$field),+]
            }

            fn from_components(components: &[f32]) -> Option<Self> {
                if components.len() != $len {
                    return None;
                }
                let mut iter = components.iter().copied();
                Some(Self { $($field: iter.next()?),+ })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let parts: Vec<String> = self.components().iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    };
}

float_vector!(Vector2, 2, x, y);
float_vector!(Vector3, 3, x, y, z);
float_vector!(Vector4, 4, x, y, z, w);
float_vector!(Color, 4, r, g, b, a);

impl Vector2 {
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Divide by length, matching single-precision normalization.
    pub fn normalize(self) -> Self {
        let len = self.length();
        Self::new(self.x / len, self.y / len)
    }
}

/// 8-bit-per-channel color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color32 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text.trim().trim_start_matches('#');
        if digits.len() != 6 && digits.len() != 8 {
            return None;
        }
        let bytes = hex::decode(digits).ok()?;
        let a = bytes.get(3).copied().unwrap_or(u8::MAX);
        Some(Self::new(bytes[0], bytes[1], bytes[2], a))
    }

    pub fn to_hex(&self) -> String {
        if self.a == u8::MAX {
            format!("#{}", hex::encode_upper([self.r, self.g, self.b]))
        } else {
            format!("#{}", hex::encode_upper([self.r, self.g, self.b, self.a]))
        }
    }
}

impl VectorLike for Color32 {
    const LEN: usize = 4;

    fn splat(value: f32) -> Self {
        let c = channel_from_f32(value);
        Self::new(c, c, c, c)
    }

    fn components(&self) -> SmallVec<[f32; 4]> {
        smallvec::smallvec![self.r as f32, self.g as f32, self.b as f32, self.a as f32]
    }

    fn from_components(components: &[f32]) -> Option<Self> {
        match components {
            [r, g, b, a] => Some(Self::new(
                channel_from_f32(*r),
                channel_from_f32(*g),
                channel_from_f32(*b),
                channel_from_f32(*a),
            )),
            _ => None,
        }
    }
}

impl fmt::Display for Color32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn channel_from_f32(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

impl From<Color32> for Color {
    fn from(c: Color32) -> Self {
        Color::new(
            c.r as f32 / 255.0,
            c.g as f32 / 255.0,
            c.b as f32 / 255.0,
            c.a as f32 / 255.0,
        )
    }
}

impl From<Color> for Color32 {
    fn from(c: Color) -> Self {
        Color32::new(
            channel_from_f32(c.r * 255.0),
            channel_from_f32(c.g * 255.0),
            channel_from_f32(c.b * 255.0),
            channel_from_f32(c.a * 255.0),
        )
    }
}

/// Parse `(x, y[, z[, w]])` or `x, y[, ...]` into exactly `len` components.
pub fn parse_components(text: &str, len: usize) -> Option<SmallVec<[f32; 4]>> {
    let mut text = text.trim();
    if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        text = inner;
    }
    let parts: SmallVec<[f32; 4]> = text
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .ok()?;
    (parts.len() == len).then_some(parts)
}

pub fn parse_vector<V: VectorLike>(text: &str) -> Option<V> {
    V::from_components(&parse_components(text, V::LEN)?)
}

/// Parse a color from hex or from 3/4 float components.
pub fn parse_color(text: &str) -> Option<Color> {
    if let Some(c) = Color32::from_hex(text) {
        return Some(c.into());
    }
    if let Some(c) = parse_components(text, 4) {
        return Color::from_components(&c);
    }
    parse_components(text, 3).map(|c| Color::new(c[0], c[1], c[2], 1.0))
}

pub fn parse_color32(text: &str) -> Option<Color32> {
    if let Some(c) = Color32::from_hex(text) {
        return Some(c);
    }
    let parse = |len| -> Option<SmallVec<[u8; 4]>> {
        let mut t = text.trim();
        if let Some(inner) = t.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            t = inner;
        }
        let parts: SmallVec<[u8; 4]> = t
            .split(',')
            .map(|p| p.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .ok()?;
        (parts.len() == len).then_some(parts)
    };
    if let Some(c) = parse(4) {
        return Some(Color32::new(c[0], c[1], c[2], c[3]));
    }
    parse(3).map(|c| Color32::new(c[0], c[1], c[2], u8::MAX))
}
