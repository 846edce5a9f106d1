#![allow(dead_code)]

//! In-memory schema, files and discovery shared by the integration tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use assetlsp_values::context::PropertyContext;
use assetlsp_values::{
    AssetCategory, AssetType, Breadcrumbs, DiscoveredFile, DiscoveryEnvironment, DynamicValue,
    EvaluationContext, FileHandle, NodeValue, PropertyNode, PropertyType, SchemaProperty,
    SourceFile, TypeDatabase, ValueKind, Workspace,
};
use regex::Regex;
use uuid::Uuid;

pub struct MemoryProperty {
    key: String,
    ty: PropertyType,
    context: PropertyContext,
    default: Option<DynamicValue>,
    key_pattern: Option<Regex>,
    file_cross_ref: Option<String>,
    category: AssetCategory,
}

impl MemoryProperty {
    pub fn new(key: &str, ty: impl Into<PropertyType>) -> Self {
        Self {
            key: key.to_string(),
            ty: ty.into(),
            context: PropertyContext::Property,
            default: None,
            key_pattern: None,
            file_cross_ref: None,
            category: AssetCategory::None,
        }
    }

    pub fn default_value(mut self, value: DynamicValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn key_pattern(mut self, pattern: &str) -> Self {
        self.key_pattern = Some(Regex::new(pattern).expect("test key pattern"));
        self
    }

    pub fn file_cross_ref(mut self, field: &str) -> Self {
        self.file_cross_ref = Some(field.to_string());
        self
    }

    pub fn category(mut self, category: AssetCategory) -> Self {
        self.category = category;
        self
    }

    pub fn localization(mut self) -> Self {
        self.context = PropertyContext::Localization;
        self
    }
}

impl SchemaProperty for MemoryProperty {
    fn key(&self) -> &str {
        &self.key
    }

    fn property_type(&self) -> &PropertyType {
        &self.ty
    }

    fn default_value(&self) -> Option<&DynamicValue> {
        self.default.as_ref()
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

pub struct MemoryType {
    name: String,
    properties: Vec<Arc<MemoryProperty>>,
}

impl MemoryType {
    pub fn new(name: &str, properties: Vec<MemoryProperty>) -> Self {
        Self {
            name: name.to_string(),
            properties: properties.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn property(&self, key: &str) -> Arc<dyn SchemaProperty> {
        self.find_property(key, PropertyContext::Unspecified)
            .unwrap_or_else(|| panic!("no property {} on {}", key, self.name))
    }
}

impl AssetType for MemoryType {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_property(&self, name: &str, context: PropertyContext) -> Option<Arc<dyn SchemaProperty>> {
        self.properties
            .iter()
            .find(|p| {
                p.key.eq_ignore_ascii_case(name)
                    && (context == PropertyContext::Unspecified || context == p.context)
            })
            .map(|p| p.clone() as Arc<dyn SchemaProperty>)
    }
}

#[derive(Default)]
pub struct MemoryTypes {
    types: HashMap<String, Arc<MemoryType>>,
    parents: HashMap<String, String>,
}

impl MemoryTypes {
    pub fn add(&mut self, ty: MemoryType, parent: Option<&str>) {
        if let Some(parent) = parent {
            self.parents.insert(ty.name.clone(), parent.to_string());
        }
        self.types.insert(ty.name.clone(), Arc::new(ty));
    }

    pub fn get(&self, name: &str) -> Arc<MemoryType> {
        self.types.get(name).cloned().expect("known test type")
    }
}

impl TypeDatabase for MemoryTypes {
    fn find_type(&self, name: &str) -> Option<Arc<dyn AssetType>> {
        self.types
            .get(name)
            .map(|t| t.clone() as Arc<dyn AssetType>)
    }

    fn is_assignable(&self, target: &str, source: &str) -> bool {
        let mut current = Some(source);
        while let Some(name) = current {
            if name.eq_ignore_ascii_case(target) {
                return true;
            }
            current = self.parents.get(name).map(String::as_str);
        }
        false
    }
}

pub struct MemoryFile {
    type_name: String,
    asset_name: String,
    nodes: Vec<PropertyNode>,
}

impl MemoryFile {
    pub fn new(type_name: &str, asset_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            asset_name: asset_name.to_string(),
            nodes: Vec::new(),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.nodes.push(PropertyNode::new(key, Some(NodeValue::text(value))));
        self
    }

    pub fn with_flag(mut self, key: &str) -> Self {
        self.nodes.push(PropertyNode::new(key, None));
        self
    }

    pub fn with_node(mut self, node: PropertyNode) -> Self {
        self.nodes.push(node);
        self
    }
}

impl SourceFile for MemoryFile {
    fn try_get_property(
        &self,
        key: &str,
        breadcrumbs: &Breadcrumbs,
        _context: PropertyContext,
    ) -> Option<&PropertyNode> {
        breadcrumbs.find(&self.nodes, key)
    }

    fn type_name(&self) -> Option<&str> {
        Some(self.type_name.as_str())
    }

    fn asset_name(&self) -> Option<&str> {
        Some(self.asset_name.as_str())
    }
}

struct MemoryHandle<'w>(&'w MemoryFile);

impl FileHandle for MemoryHandle<'_> {
    fn file(&self) -> &dyn SourceFile {
        self.0
    }
}

/// Discovery index and workspace over a fixed set of files.
#[derive(Default)]
pub struct MemoryWorkspace {
    files: Vec<(DiscoveredFile, MemoryFile)>,
}

impl MemoryWorkspace {
    pub fn add(&mut self, guid: Uuid, id: u16, category: AssetCategory, file: MemoryFile) {
        let discovered = DiscoveredFile {
            path: PathBuf::from(format!("{}.asset", file.asset_name)),
            asset_name: Arc::from(file.asset_name.as_str()),
            type_name: Some(Arc::from(file.type_name.as_str())),
            guid: Some(guid),
            id,
            category,
        };
        self.files.push((discovered, file));
    }
}

impl DiscoveryEnvironment for MemoryWorkspace {
    fn find_file_by_guid(&self, guid: Uuid) -> Option<DiscoveredFile> {
        self.files
            .iter()
            .find(|(f, _)| f.guid == Some(guid))
            .map(|(f, _)| f.clone())
    }

    fn find_file_by_id(&self, id: u16, category: AssetCategory) -> Option<DiscoveredFile> {
        self.files
            .iter()
            .find(|(f, _)| f.id == id && f.category == category)
            .map(|(f, _)| f.clone())
    }
}

impl Workspace for MemoryWorkspace {
    fn load_file_temporarily<'w>(&'w self, file: &DiscoveredFile) -> Option<Box<dyn FileHandle + 'w>> {
        self.files
            .iter()
            .find(|(f, _)| f.path == file.path)
            .map(|(_, file)| Box::new(MemoryHandle(file)) as Box<dyn FileHandle + 'w>)
    }
}

pub const SUPPLY_GUID: &str = "8e5d2f0c4a1b4c3d9e8f7a6b5c4d3e2f";

static TYPES: OnceLock<MemoryTypes> = OnceLock::new();

/// `ItemAsset` (an `Asset`) and `SupplyAsset` (an `ItemAsset`).
pub fn types() -> &'static MemoryTypes {
    TYPES.get_or_init(|| {
        let mut types = MemoryTypes::default();
        types.add(MemoryType::new("Asset", Vec::new()), None);
        types.add(
            MemoryType::new(
                "ItemAsset",
                vec![
                    MemoryProperty::new("Health", ValueKind::Int32)
                        .default_value(DynamicValue::concrete(0i32)),
                    MemoryProperty::new("Caliber", ValueKind::UInt16),
                    MemoryProperty::new("Name", ValueKind::String),
                    MemoryProperty::new("Uniform_Scale", ValueKind::Boolean),
                    MemoryProperty::new("Scale", ValueKind::Float32)
                        .default_value(DynamicValue::concrete(1f32)),
                    MemoryProperty::new("Tier_3", ValueKind::Int32).key_pattern(r"^Tier_(\d+)$"),
                    MemoryProperty::new("Blueprint", ValueKind::GuidOrId)
                        .category(AssetCategory::Item),
                    MemoryProperty::new("Supply_Amount", ValueKind::Int32)
                        .file_cross_ref("Blueprint"),
                    MemoryProperty::new("Description", ValueKind::String).localization(),
                ],
            ),
            Some("Asset"),
        );
        types.add(
            MemoryType::new(
                "SupplyAsset",
                vec![MemoryProperty::new("Amount", ValueKind::Int32)
                    .default_value(DynamicValue::concrete(1i32))],
            ),
            Some("ItemAsset"),
        );
        types
    })
}

static WORKSPACE: OnceLock<MemoryWorkspace> = OnceLock::new();

/// One supply file, reachable by GUID and by item id 42.
pub fn workspace() -> &'static MemoryWorkspace {
    WORKSPACE.get_or_init(|| {
        let mut workspace = MemoryWorkspace::default();
        workspace.add(
            Uuid::parse_str(SUPPLY_GUID).expect("test guid"),
            42,
            AssetCategory::Item,
            MemoryFile::new("SupplyAsset", "Supply_Crate").with("Amount", "12"),
        );
        workspace
    })
}

/// A context over `file`, owned by `ItemAsset`.
pub fn context(file: &MemoryFile) -> EvaluationContext<'_> {
    EvaluationContext::new(types(), workspace(), workspace()).with_file(file)
}

/// A context evaluating the `ItemAsset` property `key`.
pub fn context_for<'f>(file: &'f MemoryFile, key: &str) -> EvaluationContext<'f> {
    context(file).with_self_property(types().get("ItemAsset").property(key))
}
