//! JSON schema database
//!
//! A schema file declares enumerations and asset types. Types inherit the
//! properties of their parent, and a property redeclared by a child replaces
//! the inherited one.
//!
//! ```json
//! {
//!   "enums": [
//!     { "name": "EBladeType", "flags": true, "members": ["SLASH", "STAB"] }
//!   ],
//!   "types": [
//!     { "name": "Asset" },
//!     { "name": "ItemAsset", "parent": "Asset", "category": "ITEM",
//!       "properties": [
//!         { "key": "Health", "type": "Int32", "default": 0 },
//!         { "key": "Blades", "type": "EBladeType" }
//!       ],
//!       "localization": [ { "key": "Name", "type": "String" } ] }
//!   ]
//! }
//! ```
//!
//! Enumeration members are names (backed by their index, or by bit `1 << index`
//! for flags) or `{ "name", "value" }` objects.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use assetlsp_values::json::value_from_json;
use assetlsp_values::{
    AssetCategory, AssetType, DynamicValue, EnumMember, EnumType, PropertyContext, PropertyType,
    SchemaProperty, TypeDatabase, ValueKind,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Top-level schema file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<EnumDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDefinition {
    pub name: String,
    #[serde(default)]
    pub flags: bool,
    pub members: Vec<MemberDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberDefinition {
    Named(String),
    Valued { name: String, value: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Category of the type's numeric ids, inherited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub localization: Vec<PropertyDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bundle: Vec<PropertyDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefinition {
    pub key: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_cross_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A resolved schema property.
#[derive(Debug)]
pub struct Property {
    key: String,
    ty: PropertyType,
    default: Option<DynamicValue>,
    included_default: Option<DynamicValue>,
    key_pattern: Option<Regex>,
    file_cross_ref: Option<String>,
    category: AssetCategory,
}

impl SchemaProperty for Property {
    fn key(&self) -> &str {
        &self.key
    }

    fn property_type(&self) -> &PropertyType {
        &self.ty
    }

    fn default_value(&self) -> Option<&DynamicValue> {
        self.default.as_ref()
    }

    fn included_default_value(&self) -> Option<&DynamicValue> {
        self.included_default.as_ref()
    }

    fn key_pattern(&self) -> Option<&Regex> {
        self.key_pattern.as_ref()
    }

    fn file_cross_ref(&self) -> Option<&str> {
        self.file_cross_ref.as_deref()
    }

    fn asset_category(&self) -> AssetCategory {
        self.category
    }
}

/// A resolved asset type with its inherited properties flattened in.
#[derive(Debug)]
pub struct SchemaType {
    name: String,
    parent: Option<String>,
    category: AssetCategory,
    properties: Vec<Arc<Property>>,
    localization: Vec<Arc<Property>>,
    bundle: Vec<Arc<Property>>,
}

impl SchemaType {
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn category(&self) -> AssetCategory {
        self.category
    }

    /// Properties of the main table, inherited ones first.
    pub fn properties(&self) -> &[Arc<Property>] {
        &self.properties
    }

    pub fn localization(&self) -> &[Arc<Property>] {
        &self.localization
    }

    fn table(&self, context: PropertyContext) -> &[Arc<Property>] {
        match context {
            PropertyContext::Unspecified | PropertyContext::Property => &self.properties,
            PropertyContext::Localization => &self.localization,
            PropertyContext::BundleAsset => &self.bundle,
        }
    }
}

fn find_in<'p>(table: &'p [Arc<Property>], name: &str) -> Option<&'p Arc<Property>> {
    table.iter().find(|p| p.key.eq_ignore_ascii_case(name))
}

impl AssetType for SchemaType {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_property(&self, name: &str, context: PropertyContext) -> Option<Arc<dyn SchemaProperty>> {
        let found = match context {
            PropertyContext::Unspecified => find_in(&self.properties, name)
                .or_else(|| find_in(&self.localization, name))
                .or_else(|| find_in(&self.bundle, name)),
            context => find_in(self.table(context), name),
        };
        found.map(|p| p.clone() as Arc<dyn SchemaProperty>)
    }
}

/// All types and enumerations of a schema, keyed case-insensitively.
#[derive(Debug, Default)]
pub struct SchemaDatabase {
    types: HashMap<String, Arc<SchemaType>>,
    enums: HashMap<String, Arc<EnumType>>,
}

impl SchemaDatabase {
    /// Load a schema file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
        let document: SchemaDocument = serde_json::from_slice(bytes)?;
        let database = Self::from_document(&document)?;
        tracing::debug!(
            path = %path.display(),
            types = database.types.len(),
            enums = database.enums.len(),
            "Loaded schema"
        );
        Ok(database)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let document: SchemaDocument = serde_json::from_str(text)?;
        Self::from_document(&document)
    }

    pub fn from_document(document: &SchemaDocument) -> Result<Self> {
        let mut enums = HashMap::with_capacity(document.enums.len());
        for definition in &document.enums {
            let key = definition.name.to_ascii_lowercase();
            if enums.insert(key, Arc::new(build_enum(definition))).is_some() {
                return Err(Error::InvalidSchema(format!(
                    "enumeration {} is declared twice",
                    definition.name
                )));
            }
        }

        let mut definitions = HashMap::with_capacity(document.types.len());
        for definition in &document.types {
            if ValueKind::from_name(&definition.name).is_some()
                || enums.contains_key(&definition.name.to_ascii_lowercase())
            {
                return Err(Error::InvalidSchema(format!(
                    "type {} shadows a value type",
                    definition.name
                )));
            }
            if definitions
                .insert(definition.name.to_ascii_lowercase(), definition)
                .is_some()
            {
                return Err(Error::InvalidSchema(format!(
                    "type {} is declared twice",
                    definition.name
                )));
            }
        }

        let mut builder = TypeBuilder {
            definitions: &definitions,
            enums: &enums,
            built: HashMap::with_capacity(definitions.len()),
            visiting: Vec::new(),
        };
        for definition in &document.types {
            builder.build(&definition.name)?;
        }

        Ok(Self {
            types: builder.built,
            enums,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<SchemaType>> {
        self.types.get(&name.to_ascii_lowercase())
    }

    pub fn enum_type(&self, name: &str) -> Option<&Arc<EnumType>> {
        self.enums.get(&name.to_ascii_lowercase())
    }

    /// Value type named `name`: a scalar kind or one of the schema's enums.
    pub fn property_type(&self, name: &str) -> Result<PropertyType> {
        value_type(&self.enums, name)
    }

    /// Id category of a type, `None` for unknown types.
    pub fn category_of(&self, type_name: &str) -> AssetCategory {
        self.get(type_name)
            .map_or(AssetCategory::None, |t| t.category)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.types.values().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeDatabase for SchemaDatabase {
    fn find_type(&self, name: &str) -> Option<Arc<dyn AssetType>> {
        self.get(name).map(|t| t.clone() as Arc<dyn AssetType>)
    }

    fn is_assignable(&self, target: &str, source: &str) -> bool {
        if target.eq_ignore_ascii_case(source) {
            return true;
        }
        let mut current = self.get(source);
        while let Some(ty) = current {
            if ty.name.eq_ignore_ascii_case(target) {
                return true;
            }
            current = ty.parent.as_deref().and_then(|p| self.get(p));
        }
        false
    }
}

fn build_enum(definition: &EnumDefinition) -> EnumType {
    let members = definition
        .members
        .iter()
        .enumerate()
        .map(|(i, member)| match member {
            MemberDefinition::Named(name) => EnumMember {
                name: Arc::from(name.as_str()),
                value: if definition.flags { 1i64 << i } else { i as i64 },
            },
            MemberDefinition::Valued { name, value } => EnumMember {
                name: Arc::from(name.as_str()),
                value: *value,
            },
        })
        .collect();
    EnumType::new(definition.name.as_str(), members, definition.flags)
}

fn value_type(enums: &HashMap<String, Arc<EnumType>>, name: &str) -> Result<PropertyType> {
    if let Some(kind) = ValueKind::from_name(name) {
        return Ok(PropertyType::Scalar(kind));
    }
    match enums.get(&name.to_ascii_lowercase()) {
        Some(e) if e.is_flags() => Ok(PropertyType::Flags(e.clone())),
        Some(e) => Ok(PropertyType::Enum(e.clone())),
        None => Err(Error::UnknownType(name.to_string())),
    }
}

fn category(name: Option<&str>, owner: &str) -> Option<AssetCategory> {
    let name = name?;
    match AssetCategory::from_name(name) {
        Some(category) => Some(category),
        None => {
            tracing::warn!(owner, category = name, "Unknown asset category, using NONE");
            Some(AssetCategory::None)
        }
    }
}

struct TypeBuilder<'d> {
    definitions: &'d HashMap<String, &'d TypeDefinition>,
    enums: &'d HashMap<String, Arc<EnumType>>,
    built: HashMap<String, Arc<SchemaType>>,
    visiting: Vec<String>,
}

impl TypeBuilder<'_> {
    fn build(&mut self, name: &str) -> Result<Arc<SchemaType>> {
        let key = name.to_ascii_lowercase();
        if let Some(ty) = self.built.get(&key) {
            return Ok(ty.clone());
        }
        if self.visiting.contains(&key) {
            return Err(Error::InvalidSchema(format!(
                "type {} inherits from itself",
                name
            )));
        }
        let definitions = self.definitions;
        let definition = *definitions
            .get(&key)
            .ok_or_else(|| Error::UnknownType(name.to_string()))?;

        self.visiting.push(key.clone());
        let parent = match &definition.parent {
            Some(parent) => Some(self.build(parent)?),
            None => None,
        };
        self.visiting.pop();

        let (mut properties, mut localization, mut bundle) = match &parent {
            Some(p) => (p.properties.clone(), p.localization.clone(), p.bundle.clone()),
            None => Default::default(),
        };
        for (table, own) in [
            (&mut properties, &definition.properties),
            (&mut localization, &definition.localization),
            (&mut bundle, &definition.bundle),
        ] {
            for property in own {
                let property = Arc::new(self.property(property, &definition.name)?);
                match table.iter_mut().find(|p| p.key.eq_ignore_ascii_case(&property.key)) {
                    Some(slot) => *slot = property,
                    None => table.push(property),
                }
            }
        }

        let ty = Arc::new(SchemaType {
            name: definition.name.clone(),
            parent: parent.as_ref().map(|p| p.name.clone()),
            category: category(definition.category.as_deref(), &definition.name)
                .or_else(|| parent.as_ref().map(|p| p.category))
                .unwrap_or_default(),
            properties,
            localization,
            bundle,
        });
        self.built.insert(key, ty.clone());
        Ok(ty)
    }

    fn property(&self, definition: &PropertyDefinition, owner: &str) -> Result<Property> {
        let ty = value_type(self.enums, &definition.type_name)?;
        let default = definition
            .default
            .as_ref()
            .map(|json| value_from_json(json, Some(&ty)))
            .transpose()?;
        let included_default = definition
            .included_default
            .as_ref()
            .map(|json| value_from_json(json, Some(&ty)))
            .transpose()?;
        let key_pattern = definition
            .key_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()?;
        let owner = format!("{}.{}", owner, definition.key);
        Ok(Property {
            key: definition.key.clone(),
            ty,
            default,
            included_default,
            key_pattern,
            file_cross_ref: definition.file_cross_ref.clone(),
            category: category(definition.category.as_deref(), &owner).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{
        "enums": [
            { "name": "EBladeType", "flags": true, "members": ["SLASH", "STAB", "BLUNT"] },
            { "name": "ERarity", "members": ["COMMON", { "name": "LEGENDARY", "value": 5 }] }
        ],
        "types": [
            { "name": "SupplyAsset", "parent": "ItemAsset",
              "properties": [ { "key": "Health", "type": "Int32", "default": 10 } ] },
            { "name": "Asset" },
            { "name": "ItemAsset", "parent": "Asset", "category": "ITEM",
              "properties": [
                { "key": "Health", "type": "Int32", "default": 0 },
                { "key": "Blades", "type": "EBladeType" },
                { "key": "Rarity", "type": "ERarity", "default": "COMMON" },
                { "key": "Tier_1", "type": "Int32", "keyPattern": "^Tier_(\\d+)$" }
              ],
              "localization": [ { "key": "Name", "type": "String" } ] }
        ]
    }"#;

    fn database() -> SchemaDatabase {
        SchemaDatabase::from_json_str(SCHEMA).unwrap()
    }

    #[test]
    fn test_types_and_inheritance() {
        let db = database();
        assert_eq!(db.len(), 3);

        let supply = db.get("supplyasset").unwrap();
        assert_eq!(supply.parent(), Some("ItemAsset"));
        assert_eq!(supply.category(), AssetCategory::Item);
        assert_eq!(supply.properties().len(), 4);

        let health = supply
            .find_property("HEALTH", PropertyContext::Property)
            .unwrap();
        assert_eq!(health.default_value(), Some(&DynamicValue::concrete(10i32)));

        assert!(supply
            .find_property("Name", PropertyContext::Property)
            .is_none());
        assert!(supply
            .find_property("Name", PropertyContext::Unspecified)
            .is_some());
        assert!(supply
            .find_property("Name", PropertyContext::Localization)
            .is_some());
    }

    #[test]
    fn test_enums_and_flags() {
        let db = database();
        let blades = db.enum_type("EBladeType").unwrap();
        assert!(blades.is_flags());
        assert_eq!(blades.member(2).map(|m| m.value), Some(4));

        let rarity = db.enum_type("ERarity").unwrap();
        assert_eq!(rarity.find("legendary", true), Some(1));
        assert_eq!(rarity.member(1).map(|m| m.value), Some(5));

        let item = db.get("ItemAsset").unwrap();
        let property = item
            .find_property("Blades", PropertyContext::Unspecified)
            .unwrap();
        assert!(matches!(property.property_type(), PropertyType::Flags(_)));
        let rarity = item
            .find_property("Rarity", PropertyContext::Unspecified)
            .unwrap();
        assert!(matches!(
            rarity.default_value(),
            Some(DynamicValue::Enum(e)) if e.index() == Some(0)
        ));
    }

    #[test]
    fn test_assignability() {
        let db = database();
        assert!(db.is_assignable("Asset", "SupplyAsset"));
        assert!(db.is_assignable("itemasset", "SupplyAsset"));
        assert!(!db.is_assignable("SupplyAsset", "ItemAsset"));
        assert!(!db.is_assignable("Asset", "VehicleAsset"));
        assert_eq!(db.category_of("Asset"), AssetCategory::None);
    }

    #[test]
    fn test_schema_errors() {
        let unknown_parent = r#"{ "types": [ { "name": "A", "parent": "B" } ] }"#;
        assert!(matches!(
            SchemaDatabase::from_json_str(unknown_parent),
            Err(Error::UnknownType(_))
        ));

        let cycle = r#"{ "types": [ { "name": "A", "parent": "B" }, { "name": "B", "parent": "A" } ] }"#;
        assert!(matches!(
            SchemaDatabase::from_json_str(cycle),
            Err(Error::InvalidSchema(_))
        ));

        let bad_default = r#"{ "types": [ { "name": "A",
            "properties": [ { "key": "X", "type": "UInt8", "default": 300 } ] } ] }"#;
        assert!(matches!(
            SchemaDatabase::from_json_str(bad_default),
            Err(Error::Value(_))
        ));

        let bad_pattern = r#"{ "types": [ { "name": "A",
            "properties": [ { "key": "X", "type": "Int32", "keyPattern": "(" } ] } ] }"#;
        assert!(matches!(
            SchemaDatabase::from_json_str(bad_pattern),
            Err(Error::Pattern(_))
        ));

        let unknown_type = r#"{ "types": [ { "name": "A",
            "properties": [ { "key": "X", "type": "Quaternion" } ] } ] }"#;
        assert!(matches!(
            SchemaDatabase::from_json_str(unknown_type),
            Err(Error::UnknownType(_))
        ));
    }
}
