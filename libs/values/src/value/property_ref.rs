//! Property references
//!
//! A reference names a schema property, optionally scoped to a type, a property
//! table and a breadcrumb path:
//!
//! ```text
//! [$prop$:: | $local$:: | $bndl$:: | $cr$:: | $cr.prop$:: | $cr.local$::] [Type::] [Section[i]/...] Property
//! ```
//!
//! The `$cr` prefixes redirect the lookup through the current property's
//! cross-reference field into another asset file.

use std::fmt;
use std::sync::Arc;

use crate::condition::Condition;
use crate::context::{
    Breadcrumbs, DiscoveredFile, DiscoveryEnvironment, EvaluationContext, PropertyContext,
    ResolvedProperty, SchemaProperty,
};
use crate::error::{Error, Result};
use crate::guid_or_id::{AssetCategory, GuidOrId};
use crate::operation::ConditionOperation;
use crate::scalar::Scalar;
use crate::types::ValueKind;

use super::{DynamicValue, Evaluated};

const PREFIXES: [(&str, PropertyContext, bool); 6] = [
    ("$cr.local$::", PropertyContext::Localization, true),
    ("$cr.prop$::", PropertyContext::Property, true),
    ("$cr$::", PropertyContext::Unspecified, true),
    ("$local$::", PropertyContext::Localization, false),
    ("$prop$::", PropertyContext::Property, false),
    ("$bndl$::", PropertyContext::BundleAsset, false),
];

fn strip_prefix_ci<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

/// Parsed form of a property reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyRefInfo {
    pub context: PropertyContext,
    pub cross_reference: bool,
    pub type_name: Option<Arc<str>>,
    pub property: Arc<str>,
    pub breadcrumbs: Breadcrumbs,
}

impl PropertyRefInfo {
    /// An unqualified reference to `property`.
    pub fn named(property: impl Into<Arc<str>>) -> Self {
        Self {
            context: PropertyContext::Unspecified,
            cross_reference: false,
            type_name: None,
            property: property.into(),
            breadcrumbs: Breadcrumbs::root(),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut rest = text.trim();
        let mut context = PropertyContext::Unspecified;
        let mut cross_reference = false;
        for (prefix, prefix_context, cr) in PREFIXES {
            if let Some(stripped) = strip_prefix_ci(rest, prefix) {
                rest = stripped;
                context = prefix_context;
                cross_reference = cr;
                break;
            }
        }

        let mut type_name = None;
        if let Some(split) = rest.find("::") {
            if split > 0 {
                type_name = Some(Arc::from(rest[..split].trim()));
                rest = &rest[split + 2..];
            }
        }

        let mut breadcrumbs = Breadcrumbs::root();
        let mut segments: Vec<&str> = rest.split('/').collect();
        let property = segments.pop().unwrap_or_default().trim();
        for segment in segments {
            let (key, index) = parse_section(segment)
                .ok_or_else(|| Error::ParseError(format!("invalid breadcrumb '{}' in '{}'", segment, text)))?;
            breadcrumbs.push(key, index);
        }

        if property.is_empty() {
            return Err(Error::ParseError(format!(
                "missing property name in reference '{}'",
                text
            )));
        }

        Ok(Self {
            context,
            cross_reference,
            type_name,
            property: Arc::from(property),
            breadcrumbs,
        })
    }

    fn prefix(&self) -> &'static str {
        match (self.context, self.cross_reference) {
            (PropertyContext::BundleAsset, _) => "$bndl$::",
            (PropertyContext::Unspecified, false) => "",
            (PropertyContext::Property, false) => "$prop$::",
            (PropertyContext::Localization, false) => "$local$::",
            (PropertyContext::Unspecified, true) => "$cr$::",
            (PropertyContext::Property, true) => "$cr.prop$::",
            (PropertyContext::Localization, true) => "$cr.local$::",
        }
    }

    /// Find the property on the owning type, plus the cross-reference field to
    /// chase when one is requested and declared.
    fn resolve(&self, ctx: &EvaluationContext<'_>) -> Option<ResolvedProperty> {
        let owner = match &self.type_name {
            Some(name) => ctx
                .types()
                .find_type(name)
                .or_else(|| ctx.this_type().cloned())?,
            None => ctx.this_type()?.clone(),
        };
        let property = owner.find_property(&self.property, self.context)?;

        if !self.cross_reference {
            return Some(ResolvedProperty {
                property,
                cross_reference: None,
            });
        }

        let field_name = ctx
            .self_property()
            .and_then(|p| p.file_cross_ref())
            .map(str::trim)
            .filter(|f| !f.is_empty());
        let Some(field_name) = field_name else {
            return Some(ResolvedProperty {
                property,
                cross_reference: None,
            });
        };

        let field = ctx
            .this_type()?
            .find_property(field_name, PropertyContext::Unspecified)?;
        Some(ResolvedProperty {
            property,
            cross_reference: Some(field),
        })
    }
}

fn parse_section(segment: &str) -> Option<(&str, Option<usize>)> {
    let segment = segment.trim();
    match segment.find('[') {
        Some(open) => {
            let index = segment[open + 1..].strip_suffix(']')?.trim().parse().ok()?;
            let key = segment[..open].trim();
            (!key.is_empty()).then_some((key, Some(index)))
        }
        None => (!segment.is_empty()).then_some((segment, None)),
    }
}

impl fmt::Display for PropertyRefInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())?;
        if let Some(type_name) = &self.type_name {
            write!(f, "{}::", type_name)?;
        }
        write!(f, "{}{}", self.breadcrumbs, self.property)
    }
}

/// Parsed node value, then the included default, then the schema default.
pub(crate) fn property_value(
    ctx: &EvaluationContext<'_>,
    property: &Arc<dyn SchemaProperty>,
    breadcrumbs: &Breadcrumbs,
) -> Option<DynamicValue> {
    match ctx.find_node(property.key(), breadcrumbs) {
        None => property.default_value().cloned(),
        Some(node) => property
            .parse_value(node)
            .or_else(|| property.included_default_value().cloned())
            .or_else(|| property.default_value().cloned()),
    }
}

/// Whether the property's key is present; with `value_included`, it must also
/// carry a non-blank value.
pub(crate) fn property_is_included(
    ctx: &EvaluationContext<'_>,
    property: &Arc<dyn SchemaProperty>,
    breadcrumbs: &Breadcrumbs,
    value_included: bool,
) -> bool {
    match ctx.find_node(property.key(), breadcrumbs) {
        Some(node) => !value_included || node.has_value(),
        None => false,
    }
}

/// Evaluate the target property's value where it lives. Absent values are null.
pub(crate) fn evaluate_property(
    ctx: &EvaluationContext<'_>,
    property: &Arc<dyn SchemaProperty>,
    breadcrumbs: &Breadcrumbs,
) -> Option<Evaluated> {
    match property_value(ctx, property, breadcrumbs) {
        Some(value) => value.try_evaluate_boxed(ctx),
        None => Some(Evaluated::Null),
    }
}

/// Condition over the target property's value, null policy when it has none.
pub(crate) fn property_condition(
    ctx: &EvaluationContext<'_>,
    property: &Arc<dyn SchemaProperty>,
    breadcrumbs: &Breadcrumbs,
    condition: &Condition,
) -> bool {
    match property_value(ctx, property, breadcrumbs) {
        Some(value) => value.evaluate_condition(ctx, condition),
        None => condition.evaluate_nulls(true, condition.comparand.is_none()),
    }
}

/// Evaluate `field` (a property of the current file) to an asset key and find
/// the file it names.
fn locate_cross_reference(
    ctx: &EvaluationContext<'_>,
    field: &Arc<dyn SchemaProperty>,
) -> Option<DiscoveredFile> {
    let field_ctx = ctx.for_property(field.clone());
    let key = property_value(&field_ctx, field, &Breadcrumbs::root())?
        .try_evaluate_boxed(&field_ctx)?
        .into_value()?;

    let environment = ctx.environment();
    let category = field.asset_category();
    match key {
        Scalar::Guid(guid) if guid.is_nil() => None,
        Scalar::Guid(guid) => environment.find_file_by_guid(guid),
        Scalar::GuidOrId(key) => find_by_key(environment, key, category),
        Scalar::String(text) => find_by_key(environment, text.parse().ok()?, category),
        other => match other.convert(&ValueKind::UInt16.into())? {
            Scalar::UInt16(id) if id != 0 => environment.find_file_by_id(id, category),
            _ => None,
        },
    }
}

fn find_by_key(
    environment: &dyn DiscoveryEnvironment,
    key: GuidOrId,
    fallback: AssetCategory,
) -> Option<DiscoveredFile> {
    if key.is_null() {
        return None;
    }
    match key {
        GuidOrId::Guid(guid) => environment.find_file_by_guid(guid),
        GuidOrId::Id { id, category } => {
            let category = if category == AssetCategory::None {
                fallback
            } else {
                category
            };
            environment.find_file_by_id(id, category)
        }
    }
}

/// A reference to a named property, written `@Name` or `@(Name with spaces)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRef {
    info: Arc<PropertyRefInfo>,
}

impl PropertyRef {
    pub fn new(info: PropertyRefInfo) -> Self {
        Self {
            info: Arc::new(info),
        }
    }

    pub fn named(property: impl Into<Arc<str>>) -> Self {
        Self::new(PropertyRefInfo::named(property))
    }

    pub fn parse(text: &str) -> Result<Self> {
        PropertyRefInfo::parse(text).map(Self::new)
    }

    pub fn info(&self) -> &PropertyRefInfo {
        &self.info
    }

    pub fn breadcrumbs(&self) -> &Breadcrumbs {
        &self.info.breadcrumbs
    }

    /// The schema property this reference names in `ctx`, before any
    /// cross-reference redirection.
    pub fn resolve_property(&self, ctx: &EvaluationContext<'_>) -> Option<Arc<dyn SchemaProperty>> {
        ctx.cache()
            .get_or_resolve(&self.info, || self.info.resolve(ctx))
            .map(|r| r.property)
    }

    /// Run `f` with the context the referenced property lives in and the
    /// property itself. `None` when resolution or a cross-reference fails.
    pub(crate) fn with_target<R>(
        &self,
        ctx: &EvaluationContext<'_>,
        f: impl FnOnce(&EvaluationContext<'_>, &Arc<dyn SchemaProperty>) -> R,
    ) -> Option<R> {
        let resolved = ctx.cache().get_or_resolve(&self.info, || self.info.resolve(ctx))?;
        match &resolved.cross_reference {
            None => Some(f(ctx, &resolved.property)),
            Some(field) => self.chase(ctx, field, f),
        }
    }

    fn chase<R>(
        &self,
        ctx: &EvaluationContext<'_>,
        field: &Arc<dyn SchemaProperty>,
        f: impl FnOnce(&EvaluationContext<'_>, &Arc<dyn SchemaProperty>) -> R,
    ) -> Option<R> {
        if !ctx.can_cross_reference() {
            return None;
        }
        let file = locate_cross_reference(ctx, field)?;
        let handle = ctx.workspace().load_file_temporarily(&file)?;
        let target = ctx.cross_reference(handle.file());
        let property = target
            .this_type()?
            .find_property(&self.info.property, self.info.context)?;
        let target = target.with_self_property(property.clone());
        Some(f(&target, &property))
    }

    pub fn is_included(&self, ctx: &EvaluationContext<'_>, value_included: bool) -> bool {
        let breadcrumbs = self.breadcrumbs();
        self.with_target(ctx, |target, property| {
            property_is_included(target, property, breadcrumbs, value_included)
        })
        .unwrap_or(false)
    }

    /// The literal key text as written in the file.
    pub fn key(&self, ctx: &EvaluationContext<'_>) -> Option<Arc<str>> {
        let breadcrumbs = self.breadcrumbs();
        self.with_target(ctx, |target, property| {
            target
                .find_node(property.key(), breadcrumbs)
                .map(|node| node.key.clone())
        })
        .flatten()
    }

    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Option<Evaluated> {
        let breadcrumbs = self.breadcrumbs();
        self.with_target(ctx, |target, property| {
            evaluate_property(target, property, breadcrumbs)
        })
        .unwrap_or(Some(Evaluated::Null))
    }

    pub fn evaluate_condition(&self, ctx: &EvaluationContext<'_>, condition: &Condition) -> bool {
        match condition.operation {
            ConditionOperation::Included | ConditionOperation::ValueIncluded => condition.invert(
                self.is_included(ctx, condition.operation == ConditionOperation::ValueIncluded),
            ),
            ConditionOperation::Excluded => condition.invert(!self.is_included(ctx, false)),
            _ => {
                let breadcrumbs = self.breadcrumbs();
                self.with_target(ctx, |target, property| {
                    property_condition(target, property, breadcrumbs, condition)
                })
                .unwrap_or_else(|| condition.evaluate_nulls(true, condition.comparand.is_none()))
            }
        }
    }
}

/// Wrap `text` as `{marker}text`, or `{marker}(text)` when it contains whitespace.
pub(crate) fn write_marked(f: &mut fmt::Formatter<'_>, marker: char, text: &str) -> fmt::Result {
    if text.chars().any(char::is_whitespace) {
        write!(f, "{}({})", marker, text)
    } else {
        write!(f, "{}{}", marker, text)
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_marked(f, '@', &self.info.to_string())
    }
}
