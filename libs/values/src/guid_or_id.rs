//! Asset cross-reference keys: a GUID, or a legacy numeric id within a category.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Legacy asset categories used to disambiguate numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum AssetCategory {
    #[default]
    None = 0,
    Item = 1,
    Effect = 2,
    Object = 3,
    Resource = 4,
    Vehicle = 5,
    Animal = 6,
    Mythic = 7,
    Skin = 8,
    Spawn = 9,
    Npc = 10,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 11] = [
        AssetCategory::None,
        AssetCategory::Item,
        AssetCategory::Effect,
        AssetCategory::Object,
        AssetCategory::Resource,
        AssetCategory::Vehicle,
        AssetCategory::Animal,
        AssetCategory::Mythic,
        AssetCategory::Skin,
        AssetCategory::Spawn,
        AssetCategory::Npc,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AssetCategory::None => "NONE",
            AssetCategory::Item => "ITEM",
            AssetCategory::Effect => "EFFECT",
            AssetCategory::Object => "OBJECT",
            AssetCategory::Resource => "RESOURCE",
            AssetCategory::Vehicle => "VEHICLE",
            AssetCategory::Animal => "ANIMAL",
            AssetCategory::Mythic => "MYTHIC",
            AssetCategory::Skin => "SKIN",
            AssetCategory::Spawn => "SPAWN",
            AssetCategory::Npc => "NPC",
        }
    }

    pub fn from_name(name: &str) -> Option<AssetCategory> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Either a GUID or a `(category, id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuidOrId {
    Guid(Uuid),
    Id { id: u16, category: AssetCategory },
}

impl Default for GuidOrId {
    fn default() -> Self {
        GuidOrId::Guid(Uuid::nil())
    }
}

impl GuidOrId {
    pub fn id(id: u16) -> Self {
        GuidOrId::Id {
            id,
            category: AssetCategory::None,
        }
    }

    pub fn is_id(&self) -> bool {
        matches!(self, GuidOrId::Id { .. })
    }

    /// A zero id or a nil GUID.
    pub fn is_null(&self) -> bool {
        match self {
            GuidOrId::Guid(g) => g.is_nil(),
            GuidOrId::Id { id, .. } => *id == 0,
        }
    }

    pub fn as_guid(&self) -> Option<Uuid> {
        match self {
            GuidOrId::Guid(g) => Some(*g),
            GuidOrId::Id { .. } => None,
        }
    }

    pub fn as_id(&self) -> Option<u16> {
        match self {
            GuidOrId::Id { id, .. } => Some(*id),
            GuidOrId::Guid(_) => None,
        }
    }
}

impl From<Uuid> for GuidOrId {
    fn from(g: Uuid) -> Self {
        GuidOrId::Guid(g)
    }
}

impl From<u16> for GuidOrId {
    fn from(id: u16) -> Self {
        GuidOrId::id(id)
    }
}

impl FromStr for GuidOrId {
    type Err = crate::Error;

    /// Accepts a decimal id, `CATEGORY:id`, or any GUID form `uuid` accepts.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u16>() {
            return Ok(GuidOrId::id(id));
        }
        if let Some((category, id)) = s.split_once(':') {
            if let (Some(category), Ok(id)) = (AssetCategory::from_name(category), id.trim().parse::<u16>()) {
                return Ok(GuidOrId::Id { id, category });
            }
        }
        Uuid::parse_str(s)
            .map(GuidOrId::Guid)
            .map_err(|_| crate::Error::ParseError(format!("'{}' is not a GUID or id", s)))
    }
}

impl fmt::Display for GuidOrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuidOrId::Guid(g) => write!(f, "{}", g.simple()),
            GuidOrId::Id {
                id,
                category: AssetCategory::None,
            } => write!(f, "{}", id),
            GuidOrId::Id { id, category } => write!(f, "{}:{}", category, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!("42".parse::<GuidOrId>().unwrap(), GuidOrId::id(42));
        assert_eq!(
            "item:7".parse::<GuidOrId>().unwrap(),
            GuidOrId::Id {
                id: 7,
                category: AssetCategory::Item
            }
        );
        let g: GuidOrId = "a1b2c3d4e5f60718293a4b5c6d7e8f90".parse().unwrap();
        assert!(!g.is_id());
        assert_eq!(g.to_string(), "a1b2c3d4e5f60718293a4b5c6d7e8f90");
        assert!("not-a-key".parse::<GuidOrId>().is_err());
    }

    #[test]
    fn test_null_states() {
        assert!(GuidOrId::default().is_null());
        assert!(GuidOrId::id(0).is_null());
        assert!(!GuidOrId::id(3).is_null());
    }

    #[test]
    fn test_display_with_category() {
        let key = GuidOrId::Id {
            id: 12,
            category: AssetCategory::Effect,
        };
        assert_eq!(key.to_string(), "EFFECT:12");
    }
}
