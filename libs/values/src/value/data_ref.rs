//! Data references: `#Target.Property`
//!
//! A data reference reads a derived fact about a target rather than (only) its
//! value. Targets are the property being evaluated (`Self`), the owning asset
//! (`This`) or any property reference. Sub-properties:
//!
//! | Property       | Type    | Meaning                                        |
//! |----------------|---------|------------------------------------------------|
//! | `Included`     | Boolean | the key is present in the file                 |
//! | `Excluded`     | Boolean | the key is absent                              |
//! | `Key`          | String  | the key exactly as written                     |
//! | `Value`        | target  | the target's value                             |
//! | `KeyGroups[i]` | Int32   | capture group `i` of the key against its pattern |
//! | `AssetName`    | String  | the file's asset name (`This` only)            |
//!
//! A bare `#Target` evaluates as the target itself.

use std::fmt;
use std::sync::Arc;

use crate::condition::Condition;
use crate::context::{Breadcrumbs, EvaluationContext, SchemaProperty};
use crate::error::{Error, Result};
use crate::operation::ConditionOperation;
use crate::scalar::Scalar;
use crate::types::PropertyType;

use super::property_ref::{
    evaluate_property, property_condition, property_is_included, write_marked, PropertyRef,
};
use super::Evaluated;

/// What a data reference points at.
#[derive(Debug, Clone, PartialEq)]
pub enum DataRefTarget {
    /// The property currently being evaluated.
    SelfRef,
    /// The asset that owns the property being evaluated.
    This,
    Property(PropertyRef),
}

/// The derived fact read from a [`DataRefTarget`].
#[derive(Debug, Clone, PartialEq)]
pub enum DataRefProperty {
    Included,
    Excluded,
    Key,
    Value,
    KeyGroups {
        index: usize,
        prevent_self_reference: bool,
    },
    AssetName,
}

impl DataRefProperty {
    pub fn name(&self) -> &'static str {
        match self {
            DataRefProperty::Included => "Included",
            DataRefProperty::Excluded => "Excluded",
            DataRefProperty::Key => "Key",
            DataRefProperty::Value => "Value",
            DataRefProperty::KeyGroups { .. } => "KeyGroups",
            DataRefProperty::AssetName => "AssetName",
        }
    }

    /// Parse `Name[index]{Prop=value,...}`. `Ok(None)` when the name is not a
    /// data-ref property at all.
    fn parse(text: &str, target: &DataRefTarget) -> Result<Option<Self>> {
        let name_end = text.find(['[', '{']).unwrap_or(text.len());
        let (name, mut rest) = text.split_at(name_end);

        let mut index = None;
        if let Some(after) = rest.strip_prefix('[') {
            let close = after
                .find(']')
                .ok_or_else(|| Error::ParseError(format!("unclosed index in '{}'", text)))?;
            let parsed = after[..close].trim().parse::<usize>().map_err(|_| {
                Error::ParseError(format!("invalid index '{}' in '{}'", &after[..close], text))
            })?;
            index = Some(parsed);
            rest = &after[close + 1..];
        }

        let mut settings = Vec::new();
        if let Some(after) = rest.strip_prefix('{') {
            let body = after
                .strip_suffix('}')
                .ok_or_else(|| Error::ParseError(format!("unclosed properties in '{}'", text)))?;
            for pair in body.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').ok_or_else(|| {
                    Error::ParseError(format!("expected key=value, found '{}'", pair))
                })?;
                settings.push((key.trim(), value.trim()));
            }
        } else if !rest.is_empty() {
            return Err(Error::ParseError(format!("unexpected '{}' in '{}'", rest, text)));
        }

        let property = match name {
            "Included" => DataRefProperty::Included,
            "Excluded" => DataRefProperty::Excluded,
            "Key" => DataRefProperty::Key,
            "Value" => DataRefProperty::Value,
            "AssetName" => {
                if *target != DataRefTarget::This {
                    return Err(Error::ParseError(
                        "AssetName is only available on This".to_string(),
                    ));
                }
                DataRefProperty::AssetName
            }
            "KeyGroups" => {
                let index = index.take().ok_or_else(|| {
                    Error::ParseError(format!("KeyGroups requires an index in '{}'", text))
                })?;
                let prevent_self_reference = settings
                    .iter()
                    .any(|(k, v)| *k == "PreventSelfReference" && v.eq_ignore_ascii_case("true"));
                return Ok(Some(DataRefProperty::KeyGroups {
                    index,
                    prevent_self_reference,
                }));
            }
            _ => return Ok(None),
        };

        if index.is_some() {
            return Err(Error::ParseError(format!("{} is not indexable", name)));
        }
        Ok(Some(property))
    }
}

impl fmt::Display for DataRefProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        if let DataRefProperty::KeyGroups {
            index,
            prevent_self_reference,
        } = self
        {
            write!(f, "[{}]{{PreventSelfReference={}}}", index, prevent_self_reference)?;
        }
        Ok(())
    }
}

impl DataRefTarget {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(match text.trim() {
            "Self" => DataRefTarget::SelfRef,
            "This" => DataRefTarget::This,
            "\\Self" => DataRefTarget::Property(PropertyRef::named("Self")),
            "\\This" => DataRefTarget::Property(PropertyRef::named("This")),
            other => DataRefTarget::Property(PropertyRef::parse(other)?),
        })
    }

    fn is_included(&self, ctx: &EvaluationContext<'_>, value_included: bool) -> bool {
        match self {
            DataRefTarget::SelfRef => ctx.self_property().is_some_and(|property| {
                property_is_included(ctx, property, &Breadcrumbs::root(), value_included)
            }),
            DataRefTarget::This => ctx.file().is_some(),
            DataRefTarget::Property(r) => r.is_included(ctx, value_included),
        }
    }

    fn key(&self, ctx: &EvaluationContext<'_>) -> Option<Arc<str>> {
        match self {
            DataRefTarget::SelfRef => {
                let property = ctx.self_property()?;
                ctx.find_node(property.key(), &Breadcrumbs::root())
                    .map(|node| node.key.clone())
            }
            DataRefTarget::This => None,
            DataRefTarget::Property(r) => r.key(ctx),
        }
    }

    fn owner_name(ctx: &EvaluationContext<'_>) -> Option<Scalar> {
        ctx.this_type().map(|t| Scalar::string(t.name()))
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Option<Evaluated> {
        match self {
            DataRefTarget::SelfRef => match ctx.self_property() {
                Some(property) => evaluate_property(ctx, property, &Breadcrumbs::root()),
                None => Some(Evaluated::Null),
            },
            DataRefTarget::This => Some(Evaluated::from(Self::owner_name(ctx))),
            DataRefTarget::Property(r) => r.evaluate(ctx),
        }
    }

    /// Condition over the target's value only.
    fn value_condition(&self, ctx: &EvaluationContext<'_>, condition: &Condition) -> bool {
        let missing = || condition.evaluate_nulls(true, condition.comparand.is_none());
        match self {
            DataRefTarget::SelfRef => match ctx.self_property() {
                Some(property) => {
                    property_condition(ctx, property, &Breadcrumbs::root(), condition)
                }
                None => missing(),
            },
            DataRefTarget::This => {
                let owner = Self::owner_name(ctx);
                if condition.operation == ConditionOperation::ReferenceIsOfType {
                    return match (&owner, &condition.comparand) {
                        (Some(owner), Some(Scalar::String(target))) => condition.invert(
                            ctx.types().is_assignable(target, &owner.to_string()),
                        ),
                        _ => condition.evaluate_nulls(false, condition.comparand.is_none()),
                    };
                }
                condition.evaluate_scalar(owner.as_ref(), ctx.types())
            }
            DataRefTarget::Property(r) => {
                let breadcrumbs = r.breadcrumbs();
                r.with_target(ctx, |target, property| {
                    property_condition(target, property, breadcrumbs, condition)
                })
                .unwrap_or_else(missing)
            }
        }
    }

    /// Condition over the bare target: inclusion operations test presence,
    /// everything else tests the value.
    fn condition(&self, ctx: &EvaluationContext<'_>, condition: &Condition) -> bool {
        match condition.operation {
            ConditionOperation::Included | ConditionOperation::ValueIncluded => condition.invert(
                self.is_included(ctx, condition.operation == ConditionOperation::ValueIncluded),
            ),
            ConditionOperation::Excluded => condition.invert(!self.is_included(ctx, false)),
            _ => self.value_condition(ctx, condition),
        }
    }

    /// Capture group `index + 1` of the target's key against its key pattern.
    fn key_group(
        &self,
        ctx: &EvaluationContext<'_>,
        index: usize,
        prevent_self_reference: bool,
    ) -> Option<i32> {
        let is_self = |property: &Arc<dyn SchemaProperty>| {
            ctx.self_property()
                .is_some_and(|s| s.key().eq_ignore_ascii_case(property.key()))
        };
        match self {
            DataRefTarget::SelfRef => {
                if prevent_self_reference {
                    return None;
                }
                let property = ctx.self_property()?;
                key_group(ctx, property, &Breadcrumbs::root(), index)
            }
            DataRefTarget::This => None,
            DataRefTarget::Property(r) => {
                let breadcrumbs = r.breadcrumbs();
                r.with_target(ctx, |target, property| {
                    if prevent_self_reference && target.depth() == ctx.depth() && is_self(property) {
                        return None;
                    }
                    key_group(target, property, breadcrumbs, index)
                })
                .flatten()
            }
        }
    }
}

fn key_group(
    ctx: &EvaluationContext<'_>,
    property: &Arc<dyn SchemaProperty>,
    breadcrumbs: &Breadcrumbs,
    index: usize,
) -> Option<i32> {
    let node = ctx.find_node(property.key(), breadcrumbs)?;
    let captures = property.key_pattern()?.captures(&node.key)?;
    let value = captures.get(index + 1)?.as_str().parse::<i32>().ok()?;
    (value >= 0).then_some(value)
}

impl fmt::Display for DataRefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataRefTarget::SelfRef => f.write_str("Self"),
            DataRefTarget::This => f.write_str("This"),
            DataRefTarget::Property(r) => {
                let info = r.info().to_string();
                if info == "Self" || info == "This" {
                    write!(f, "\\{}", info)
                } else {
                    f.write_str(&info)
                }
            }
        }
    }
}

/// `#Target[.Property]`
#[derive(Debug, Clone, PartialEq)]
pub struct DataRef {
    target: DataRefTarget,
    property: Option<DataRefProperty>,
}

impl DataRef {
    pub fn new(target: DataRefTarget, property: Option<DataRefProperty>) -> Self {
        Self { target, property }
    }

    /// Parse the text between `#` (or `#(` and `)`) and the end.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::ParseError("empty data reference".to_string()));
        }

        // The property is the last dotted segment that names a known property,
        // so dotted type names stay part of the target.
        let mut search_end = text.len();
        while let Some(dot) = text[..search_end].rfind('.') {
            let target = DataRefTarget::parse(&text[..dot]);
            if let Ok(target) = target {
                if let Some(property) = DataRefProperty::parse(&text[dot + 1..], &target)? {
                    return Ok(Self::new(target, Some(property)));
                }
            }
            search_end = dot;
        }

        Ok(Self::new(DataRefTarget::parse(text)?, None))
    }

    pub fn target(&self) -> &DataRefTarget {
        &self.target
    }

    pub fn property(&self) -> Option<&DataRefProperty> {
        self.property.as_ref()
    }

    pub fn value_type(&self) -> Option<PropertyType> {
        match (&self.property, &self.target) {
            (Some(DataRefProperty::Included | DataRefProperty::Excluded), _) => {
                Some(PropertyType::BOOLEAN)
            }
            (Some(DataRefProperty::Key | DataRefProperty::AssetName), _) => {
                Some(PropertyType::STRING)
            }
            (Some(DataRefProperty::KeyGroups { .. }), _) => Some(PropertyType::INT32),
            (Some(DataRefProperty::Value) | None, DataRefTarget::This) => {
                Some(PropertyType::STRING)
            }
            (Some(DataRefProperty::Value) | None, _) => None,
        }
    }

    fn asset_name(ctx: &EvaluationContext<'_>) -> Option<Scalar> {
        ctx.file()?
            .asset_name()
            .filter(|n| !n.is_empty())
            .map(Scalar::string)
    }

    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Option<Evaluated> {
        let Some(property) = &self.property else {
            return self.target.evaluate(ctx);
        };
        Some(match property {
            DataRefProperty::Included => {
                Evaluated::Value(Scalar::Boolean(self.target.is_included(ctx, false)))
            }
            DataRefProperty::Excluded => {
                Evaluated::Value(Scalar::Boolean(!self.target.is_included(ctx, false)))
            }
            DataRefProperty::Key => Evaluated::from(self.target.key(ctx).map(Scalar::String)),
            DataRefProperty::Value => return self.target.evaluate(ctx),
            DataRefProperty::KeyGroups {
                index,
                prevent_self_reference,
            } => Evaluated::from(
                self.target
                    .key_group(ctx, *index, *prevent_self_reference)
                    .map(Scalar::Int32),
            ),
            DataRefProperty::AssetName => Evaluated::from(Self::asset_name(ctx)),
        })
    }

    pub fn evaluate_condition(&self, ctx: &EvaluationContext<'_>, condition: &Condition) -> bool {
        let types = ctx.types();
        let Some(property) = &self.property else {
            return self.target.condition(ctx, condition);
        };
        match property {
            DataRefProperty::Included | DataRefProperty::Excluded => {
                let included = self.target.is_included(ctx, false);
                let value = if *property == DataRefProperty::Included {
                    included
                } else {
                    !included
                };
                match condition
                    .comparand
                    .as_ref()
                    .and_then(|c| c.convert(&PropertyType::BOOLEAN))
                {
                    Some(comparand) => condition.evaluate_against(
                        Some(&Scalar::Boolean(value)),
                        Some(&comparand),
                        types,
                    ),
                    None => condition.evaluate_nulls(false, true),
                }
            }
            DataRefProperty::Key => match &condition.comparand {
                Some(Scalar::String(_)) => {
                    let key = self.target.key(ctx).map(Scalar::String);
                    condition.evaluate_scalar(key.as_ref(), types)
                }
                _ => condition.evaluate_nulls(false, true),
            },
            DataRefProperty::Value => self.target.value_condition(ctx, condition),
            DataRefProperty::KeyGroups {
                index,
                prevent_self_reference,
            } => {
                let group = self.target.key_group(ctx, *index, *prevent_self_reference);
                let comparand = condition
                    .comparand
                    .as_ref()
                    .and_then(|c| c.convert(&PropertyType::INT32));
                match (group, comparand) {
                    (group, None) => condition.evaluate_nulls(group.is_none(), true),
                    (None, Some(_)) => condition.evaluate_nulls(true, false),
                    (Some(group), Some(comparand)) => condition.evaluate_against(
                        Some(&Scalar::Int32(group)),
                        Some(&comparand),
                        types,
                    ),
                }
            }
            DataRefProperty::AssetName => {
                let name = Self::asset_name(ctx);
                if condition.comparand.is_none() {
                    return condition.evaluate_nulls(name.is_none(), true);
                }
                condition.evaluate_scalar(name.as_ref(), types)
            }
        }
    }
}

impl fmt::Display for DataRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match &self.property {
            Some(property) => format!("{}.{}", self.target, property),
            None => self.target.to_string(),
        };
        write_marked(f, '#', &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_targets() {
        let r = DataRef::parse("Self.Included").unwrap();
        assert_eq!(r.target(), &DataRefTarget::SelfRef);
        assert_eq!(r.property(), Some(&DataRefProperty::Included));

        let r = DataRef::parse("\\This.Key").unwrap();
        assert_eq!(r.target().to_string(), "\\This");

        let r = DataRef::parse("Health").unwrap();
        assert!(r.property().is_none());
        assert_eq!(r.to_string(), "#Health");
    }

    #[test]
    fn test_dotted_type_names_stay_in_target() {
        let r = DataRef::parse("SDG.ItemAsset::Rarity.Value").unwrap();
        assert_eq!(r.property(), Some(&DataRefProperty::Value));
        match r.target() {
            DataRefTarget::Property(p) => {
                assert_eq!(p.info().type_name.as_deref(), Some("SDG.ItemAsset"))
            }
            other => panic!("unexpected target {:?}", other),
        }
    }

    #[test]
    fn test_key_groups_syntax() {
        let r = DataRef::parse("Self.KeyGroups[1]{PreventSelfReference=TRUE}").unwrap();
        assert_eq!(
            r.property(),
            Some(&DataRefProperty::KeyGroups {
                index: 1,
                prevent_self_reference: true
            })
        );
        assert_eq!(
            r.to_string(),
            "#Self.KeyGroups[1]{PreventSelfReference=true}"
        );
        assert!(DataRef::parse("Self.KeyGroups").is_err());
        assert!(DataRef::parse("Self.Key[2]").is_err());
    }

    #[test]
    fn test_asset_name_requires_this() {
        assert!(DataRef::parse("This.AssetName").is_ok());
        assert!(DataRef::parse("Self.AssetName").is_err());
    }

    #[test]
    fn test_value_types() {
        assert_eq!(
            DataRef::parse("Self.Excluded").unwrap().value_type(),
            Some(PropertyType::BOOLEAN)
        );
        assert_eq!(DataRef::parse("Self.Value").unwrap().value_type(), None);
        assert_eq!(
            DataRef::parse("This").unwrap().value_type(),
            Some(PropertyType::STRING)
        );
    }

    #[test]
    fn test_whitespace_is_parenthesized() {
        let r = DataRef::parse("Max Health.Included").unwrap();
        assert_eq!(r.to_string(), "#(Max Health.Included)");
    }
}
