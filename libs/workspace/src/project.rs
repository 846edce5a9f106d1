//! Schema, discovery index and files bundled for evaluation

use std::path::Path;
use std::sync::Arc;

use assetlsp_values::context::DEFAULT_MAX_CROSS_REFERENCE_DEPTH;
use assetlsp_values::{
    AssetType, DynamicValue, EvaluationContext, Evaluated, PropertyContext, PropertyRef,
    SchemaProperty, SourceFile,
};

use crate::discovery::DiscoveryIndex;
use crate::document::AssetDocument;
use crate::error::{Error, Result};
use crate::schema::SchemaDatabase;
use crate::workspace::FileWorkspace;

pub struct Project {
    schema: SchemaDatabase,
    discovery: DiscoveryIndex,
    files: FileWorkspace,
    max_cross_reference_depth: u8,
}

impl Project {
    pub fn new(schema: SchemaDatabase, discovery: DiscoveryIndex, files: FileWorkspace) -> Self {
        Self {
            schema,
            discovery,
            files,
            max_cross_reference_depth: DEFAULT_MAX_CROSS_REFERENCE_DEPTH,
        }
    }

    /// Load the schema and index the asset files under `root`, if given.
    pub fn load(schema: &Path, root: Option<&Path>, cache_capacity: usize) -> Result<Self> {
        let schema = SchemaDatabase::load(schema)?;
        let discovery = match root {
            Some(root) => DiscoveryIndex::scan(root, &schema)?,
            None => DiscoveryIndex::default(),
        };
        Ok(Self::new(schema, discovery, FileWorkspace::new(cache_capacity)))
    }

    pub fn with_max_cross_reference_depth(mut self, depth: u8) -> Self {
        self.max_cross_reference_depth = depth;
        self
    }

    pub fn schema(&self) -> &SchemaDatabase {
        &self.schema
    }

    pub fn discovery(&self) -> &DiscoveryIndex {
        &self.discovery
    }

    pub fn files(&self) -> &FileWorkspace {
        &self.files
    }

    pub fn open(&self, path: &Path) -> Result<Arc<AssetDocument>> {
        self.files.open(path)
    }

    /// A context over `file`, owned by the type named in its header.
    pub fn context<'a>(&'a self, file: &'a dyn SourceFile) -> EvaluationContext<'a> {
        EvaluationContext::new(&self.schema, &self.discovery, &self.files)
            .with_file(file)
            .with_max_cross_reference_depth(self.max_cross_reference_depth)
    }

    /// The schema property `key` of the file's own type.
    pub fn property(&self, file: &dyn SourceFile, key: &str) -> Result<Arc<dyn SchemaProperty>> {
        let type_name = file
            .type_name()
            .ok_or_else(|| Error::UnknownType(format!("{} declares no Type", file.asset_name().unwrap_or("file"))))?;
        let ty = self
            .schema
            .get(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))?;
        ty.find_property(key, PropertyContext::Unspecified)
            .ok_or_else(|| Error::InvalidSchema(format!("{} has no property {}", type_name, key)))
    }

    /// A context evaluating the property `key` of `file`.
    pub fn property_context<'a>(
        &'a self,
        file: &'a dyn SourceFile,
        key: &str,
    ) -> Result<EvaluationContext<'a>> {
        let property = self.property(file, key)?;
        Ok(self.context(file).with_self_property(property))
    }

    /// Effective value of `key` in `file`: the literal, else the schema default.
    pub fn property_value(&self, file: &dyn SourceFile, key: &str) -> Result<Option<Evaluated>> {
        let ctx = self.property_context(file, key)?;
        Ok(DynamicValue::from(PropertyRef::named(key)).try_evaluate_boxed(&ctx))
    }
}
