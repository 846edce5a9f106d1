//! Evaluation context and collaborator interfaces
//!
//! The engine never owns schema, file or workspace state. Everything it needs is
//! borrowed through [`EvaluationContext`], which is built once per evaluation
//! call and never mutated by the evaluators (the [`ResolutionCache`] uses
//! interior mutability and is private to one context).
//!
//! ```text
//!   EvaluationContext ──▶ TypeDatabase ──▶ AssetType ──▶ SchemaProperty
//!          │
//!          ├──▶ SourceFile            (parsed key/value nodes of one asset)
//!          ├──▶ DiscoveryEnvironment  (GUID / id ─▶ DiscoveredFile)
//!          └──▶ Workspace             (DiscoveredFile ─▶ FileHandle, released on drop)
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use regex::Regex;
use smallvec::SmallVec;
use uuid::Uuid;

use crate::guid_or_id::AssetCategory;
use crate::types::PropertyType;
use crate::value::property_ref::PropertyRefInfo;
use crate::value::DynamicValue;

/// Cross-reference chasing depth used when none is configured.
pub const DEFAULT_MAX_CROSS_REFERENCE_DEPTH: u8 = 1;

/// Which table of an asset type a property lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PropertyContext {
    #[default]
    Unspecified,
    Property,
    Localization,
    BundleAsset,
}

/// Schema and type database.
pub trait TypeDatabase: Send + Sync {
    fn find_type(&self, name: &str) -> Option<Arc<dyn AssetType>>;

    /// Whether a value of type `source` can be used where `target` is expected.
    fn is_assignable(&self, target: &str, source: &str) -> bool;
}

/// A schema-declared asset type.
pub trait AssetType: Send + Sync {
    fn name(&self) -> &str;

    fn find_property(&self, name: &str, context: PropertyContext) -> Option<Arc<dyn SchemaProperty>>;
}

/// A schema-declared property of an [`AssetType`].
pub trait SchemaProperty: Send + Sync {
    fn key(&self) -> &str;

    fn property_type(&self) -> &PropertyType;

    fn default_value(&self) -> Option<&DynamicValue>;

    /// Default used when the key is present but its value cannot be parsed.
    fn included_default_value(&self) -> Option<&DynamicValue> {
        None
    }

    /// Pattern the literal key must match, with capture groups for `KeyGroups`.
    fn key_pattern(&self) -> Option<&Regex> {
        None
    }

    /// Name of the sibling property holding the cross-reference target used by
    /// `$cr$::` references made from this property.
    fn file_cross_ref(&self) -> Option<&str> {
        None
    }

    /// Asset category used when this property holds a numeric cross-reference id.
    fn asset_category(&self) -> AssetCategory {
        AssetCategory::None
    }

    /// Parse a source node into a value of [`SchemaProperty::property_type`].
    fn parse_value(&self, node: &PropertyNode) -> Option<DynamicValue> {
        match node.value.as_ref()? {
            NodeValue::Value { text, .. } => {
                DynamicValue::from_text(self.property_type(), text).ok()
            }
            _ => None,
        }
    }
}

/// The value half of a parsed `Key Value` pair.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Value { text: Arc<str>, quoted: bool },
    List(Vec<NodeValue>),
    Dictionary(Vec<PropertyNode>),
}

impl NodeValue {
    pub fn text(text: impl Into<Arc<str>>) -> Self {
        NodeValue::Value {
            text: text.into(),
            quoted: false,
        }
    }

    /// An unquoted value made only of whitespace.
    pub fn is_blank(&self) -> bool {
        matches!(self, NodeValue::Value { text, quoted: false } if text.trim().is_empty())
    }
}

/// A parsed property of a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyNode {
    pub key: Arc<str>,
    /// `None` for a bare flag key.
    pub value: Option<NodeValue>,
}

impl PropertyNode {
    pub fn new(key: impl Into<Arc<str>>, value: Option<NodeValue>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Present with a value that is not blank.
    pub fn has_value(&self) -> bool {
        self.value.as_ref().is_some_and(|v| !v.is_blank())
    }
}

/// One step of a breadcrumb path: a dictionary key, optionally indexed into a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BreadcrumbSection {
    pub key: Arc<str>,
    pub index: Option<usize>,
}

impl fmt::Display for BreadcrumbSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]", self.key, i),
            None => f.write_str(&self.key),
        }
    }
}

/// Path selecting a nested object before the final property key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Breadcrumbs {
    sections: SmallVec<[BreadcrumbSection; 2]>,
}

impl Breadcrumbs {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> &[BreadcrumbSection] {
        &self.sections
    }

    pub fn push(&mut self, key: impl Into<Arc<str>>, index: Option<usize>) {
        self.sections.push(BreadcrumbSection {
            key: key.into(),
            index,
        });
    }

    /// Walk the sections from `root` and return the property named `key` there.
    pub fn find<'n>(&self, root: &'n [PropertyNode], key: &str) -> Option<&'n PropertyNode> {
        let mut nodes = root;
        for section in &self.sections {
            let node = nodes.iter().find(|n| n.key.eq_ignore_ascii_case(&section.key))?;
            let mut value = node.value.as_ref()?;
            if let Some(index) = section.index {
                match value {
                    NodeValue::List(items) => value = items.get(index)?,
                    _ => return None,
                }
            }
            match value {
                NodeValue::Dictionary(children) => nodes = children.as_slice(),
                _ => return None,
            }
        }
        nodes.iter().find(|n| n.key.eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for Breadcrumbs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            write!(f, "{}/", section)?;
        }
        Ok(())
    }
}

/// A parsed asset file.
pub trait SourceFile {
    fn try_get_property(
        &self,
        key: &str,
        breadcrumbs: &Breadcrumbs,
        context: PropertyContext,
    ) -> Option<&PropertyNode>;

    /// The asset type named in the file header.
    fn type_name(&self) -> Option<&str>;

    fn asset_name(&self) -> Option<&str>;
}

/// An indexed asset file that has not necessarily been loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub asset_name: Arc<str>,
    pub type_name: Option<Arc<str>>,
    pub guid: Option<Uuid>,
    pub id: u16,
    pub category: AssetCategory,
}

/// Index of the asset files known to the workspace.
pub trait DiscoveryEnvironment {
    fn find_file_by_guid(&self, guid: Uuid) -> Option<DiscoveredFile>;

    fn find_file_by_id(&self, id: u16, category: AssetCategory) -> Option<DiscoveredFile>;
}

/// A loaded file, released when the handle is dropped.
pub trait FileHandle {
    fn file(&self) -> &dyn SourceFile;
}

/// Loads files on demand.
pub trait Workspace {
    fn load_file_temporarily<'w>(&'w self, file: &DiscoveredFile) -> Option<Box<dyn FileHandle + 'w>>;
}

/// A resolved schema property plus the cross-reference field to chase, if any.
#[derive(Clone)]
pub(crate) struct ResolvedProperty {
    pub property: Arc<dyn SchemaProperty>,
    pub cross_reference: Option<Arc<dyn SchemaProperty>>,
}

/// Per-context memo of property reference resolution.
///
/// Entries hold the reference info they were resolved for, so a key can never
/// be reused by another allocation while the context is alive.
#[derive(Default)]
pub struct ResolutionCache {
    entries: RefCell<HashMap<usize, (Arc<PropertyRefInfo>, Option<ResolvedProperty>)>>,
}

impl ResolutionCache {
    pub(crate) fn get_or_resolve(
        &self,
        info: &Arc<PropertyRefInfo>,
        resolve: impl FnOnce() -> Option<ResolvedProperty>,
    ) -> Option<ResolvedProperty> {
        let key = Arc::as_ptr(info) as usize;
        if let Some((_, resolved)) = self.entries.borrow().get(&key) {
            return resolved.clone();
        }
        let resolved = resolve();
        self.entries
            .borrow_mut()
            .insert(key, (info.clone(), resolved.clone()));
        resolved
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// Everything an evaluation may consult, borrowed for one call.
pub struct EvaluationContext<'a> {
    types: &'a dyn TypeDatabase,
    environment: &'a dyn DiscoveryEnvironment,
    workspace: &'a dyn Workspace,
    file: Option<&'a dyn SourceFile>,
    this_type: Option<Arc<dyn AssetType>>,
    self_property: Option<Arc<dyn SchemaProperty>>,
    property_context: PropertyContext,
    depth: u8,
    max_cross_reference_depth: u8,
    cache: ResolutionCache,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(
        types: &'a dyn TypeDatabase,
        environment: &'a dyn DiscoveryEnvironment,
        workspace: &'a dyn Workspace,
    ) -> Self {
        Self {
            types,
            environment,
            workspace,
            file: None,
            this_type: None,
            self_property: None,
            property_context: PropertyContext::Unspecified,
            depth: 0,
            max_cross_reference_depth: DEFAULT_MAX_CROSS_REFERENCE_DEPTH,
            cache: ResolutionCache::default(),
        }
    }

    /// Attach a source file. The owning type is looked up from its header
    /// unless one was already set.
    pub fn with_file(mut self, file: &'a dyn SourceFile) -> Self {
        if self.this_type.is_none() {
            self.this_type = file.type_name().and_then(|t| self.types.find_type(t));
        }
        self.file = Some(file);
        self
    }

    pub fn with_this(mut self, this_type: Arc<dyn AssetType>) -> Self {
        self.this_type = Some(this_type);
        self
    }

    pub fn with_self_property(mut self, property: Arc<dyn SchemaProperty>) -> Self {
        self.self_property = Some(property);
        self
    }

    pub fn with_property_context(mut self, context: PropertyContext) -> Self {
        self.property_context = context;
        self
    }

    pub fn with_max_cross_reference_depth(mut self, depth: u8) -> Self {
        self.max_cross_reference_depth = depth;
        self
    }

    pub fn types(&self) -> &'a dyn TypeDatabase {
        self.types
    }

    pub fn environment(&self) -> &'a dyn DiscoveryEnvironment {
        self.environment
    }

    pub fn workspace(&self) -> &'a dyn Workspace {
        self.workspace
    }

    pub fn file(&self) -> Option<&'a dyn SourceFile> {
        self.file
    }

    pub fn this_type(&self) -> Option<&Arc<dyn AssetType>> {
        self.this_type.as_ref()
    }

    pub fn self_property(&self) -> Option<&Arc<dyn SchemaProperty>> {
        self.self_property.as_ref()
    }

    pub fn property_context(&self) -> PropertyContext {
        self.property_context
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn max_cross_reference_depth(&self) -> u8 {
        self.max_cross_reference_depth
    }

    pub fn can_cross_reference(&self) -> bool {
        self.depth < self.max_cross_reference_depth
    }

    pub(crate) fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Look up a property node in the attached file.
    pub fn find_node(&self, key: &str, breadcrumbs: &Breadcrumbs) -> Option<&'a PropertyNode> {
        self.file?
            .try_get_property(key, breadcrumbs, self.property_context)
    }

    /// Same file and owner, evaluating a different property.
    pub fn for_property(&self, property: Arc<dyn SchemaProperty>) -> EvaluationContext<'a> {
        EvaluationContext {
            types: self.types,
            environment: self.environment,
            workspace: self.workspace,
            file: self.file,
            this_type: self.this_type.clone(),
            self_property: Some(property),
            property_context: self.property_context,
            depth: self.depth,
            max_cross_reference_depth: self.max_cross_reference_depth,
            cache: ResolutionCache::default(),
        }
    }

    /// A context for a cross-referenced file, one level deeper.
    pub fn cross_reference<'b>(&self, file: &'b dyn SourceFile) -> EvaluationContext<'b>
    where
        'a: 'b,
    {
        let this_type = file
            .type_name()
            .and_then(|t| self.types.find_type(t))
            .or_else(|| self.this_type.clone());
        EvaluationContext {
            types: self.types,
            environment: self.environment,
            workspace: self.workspace,
            file: Some(file),
            this_type,
            self_property: None,
            property_context: PropertyContext::Unspecified,
            depth: self.depth.saturating_add(1),
            max_cross_reference_depth: self.max_cross_reference_depth,
            cache: ResolutionCache::default(),
        }
    }
}

impl fmt::Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("this_type", &self.this_type.as_ref().map(|t| t.name().to_string()))
            .field("self_property", &self.self_property.as_ref().map(|p| p.key().to_string()))
            .field("has_file", &self.file.is_some())
            .field("depth", &self.depth)
            .field("max_cross_reference_depth", &self.max_cross_reference_depth)
            .finish()
    }
}
