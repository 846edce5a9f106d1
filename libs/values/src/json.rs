//! Schema JSON for values, conditions and switches
//!
//! Conditions are objects `{ "Variable", "Operation", "Comparand" }` or one of
//! the shorthands:
//!
//! | JSON            | Condition                 |
//! |-----------------|---------------------------|
//! | `true`          | always true               |
//! | `false`, `null` | always false              |
//! | `"Name"`        | property `Name` eq `true` |
//!
//! A switch is an array of cases. A case carries `And` or `Or` (a condition,
//! or a list of conditions and nested cases) and a `Value`, or a `When` guard
//! with nested `Cases`. `Case` holds a single nested case.

use serde_json::{Map, Number, Value};

use crate::condition::Condition;
use crate::error::{Error, Result};
use crate::operation::ConditionOperation;
use crate::parser::{self, ParseContext};
use crate::scalar::Scalar;
use crate::types::PropertyType;
use crate::value::{CaseOrCondition, DynamicValue, SwitchCase, SwitchValue};

const AND: &str = "And";
const OR: &str = "Or";
const VALUE: &str = "Value";
const WHEN: &str = "When";
const CASES: &str = "Cases";
const CASE: &str = "Case";

const VARIABLE: &str = "Variable";
const OPERATION: &str = "Operation";
const COMPARAND: &str = "Comparand";

fn json_error(message: impl Into<String>) -> Error {
    Error::Json(message.into())
}

/// Read a dynamic value. Strings use the text grammar, arrays are switches and
/// objects are conditions producing a boolean.
pub fn value_from_json(json: &Value, expected: Option<&PropertyType>) -> Result<DynamicValue> {
    read_value(json, expected, ParseContext::Optional)
}

fn read_value(
    json: &Value,
    expected: Option<&PropertyType>,
    context: ParseContext,
) -> Result<DynamicValue> {
    match json {
        Value::String(text) => parser::parse_value(text, expected, context),
        Value::Null => Ok(DynamicValue::Null),
        Value::Bool(_) | Value::Number(_) => {
            let scalar = scalar_from_json(json)?
                .ok_or_else(|| json_error("expected a literal value"))?;
            let scalar = match expected {
                Some(ty) => scalar.convert(ty).ok_or_else(|| {
                    json_error(format!("{} is not a valid {}", json, ty.name()))
                })?,
                None => scalar,
            };
            Ok(DynamicValue::from(scalar))
        }
        Value::Array(_) => switch_from_json(json, expected).map(DynamicValue::from),
        Value::Object(_) => {
            if expected.is_some_and(|t| *t != PropertyType::BOOLEAN) {
                return Err(json_error(format!(
                    "a condition produces a Boolean, not {}",
                    expected.map_or("", PropertyType::name)
                )));
            }
            let condition = condition_from_json(json)?;
            let switch = SwitchValue::new(vec![
                SwitchCase::and(vec![condition.into()], true),
                SwitchCase::default_case(false),
            ])?
            .with_value_type(PropertyType::BOOLEAN);
            Ok(switch.into())
        }
    }
}

/// Write a dynamic value in the form [`value_from_json`] reads.
pub fn value_to_json(value: &DynamicValue) -> Result<Value> {
    Ok(match value {
        DynamicValue::Null => Value::Null,
        DynamicValue::Concrete(c) => match c.value() {
            None => Value::Null,
            Some(Scalar::String(_)) => Value::String(value.to_string()),
            Some(scalar) => scalar_to_json(scalar),
        },
        DynamicValue::Enum(e) => match e.member() {
            Some(member) => Value::String(member.name.to_string()),
            None => Value::Null,
        },
        DynamicValue::Flags(f) => match f.to_json_text() {
            text if text == "0" => Value::Number(0.into()),
            text => Value::String(text),
        },
        DynamicValue::PropertyRef(_) | DynamicValue::DataRef(_) | DynamicValue::Expression(_) => {
            Value::String(value.to_string())
        }
        DynamicValue::Switch(s) => switch_to_json(s)?,
    })
}

/// A comparand literal. `null` is an absent comparand.
fn scalar_from_json(json: &Value) -> Result<Option<Scalar>> {
    Ok(Some(match json {
        Value::Null => return Ok(None),
        Value::Bool(b) => Scalar::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i32::try_from(i) {
                    Ok(i) => Scalar::Int32(i),
                    Err(_) => Scalar::Int64(i),
                }
            } else if let Some(u) = n.as_u64() {
                Scalar::UInt64(u)
            } else {
                Scalar::Float64(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Scalar::string(s.as_str()),
        Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| {
                    scalar_from_json(item)?
                        .ok_or_else(|| json_error("null inside a list comparand"))
                })
                .collect::<Result<Vec<_>>>()?;
            Scalar::List(items.into())
        }
        Value::Object(_) => return Err(json_error("a comparand cannot be an object")),
    }))
}

fn scalar_to_json(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::Boolean(b) => Value::Bool(*b),
        Scalar::UInt8(v) => Value::from(*v),
        Scalar::UInt16(v) => Value::from(*v),
        Scalar::UInt32(v) => Value::from(*v),
        Scalar::UInt64(v) => Value::from(*v),
        Scalar::Int8(v) => Value::from(*v),
        Scalar::Int16(v) => Value::from(*v),
        Scalar::Int32(v) => Value::from(*v),
        Scalar::Int64(v) => Value::from(*v),
        Scalar::Float32(v) => float_to_json(f64::from(*v), scalar),
        Scalar::Float64(v) => float_to_json(*v, scalar),
        Scalar::List(items) => Value::Array(items.iter().map(scalar_to_json).collect()),
        other => Value::String(other.to_string()),
    }
}

fn float_to_json(value: f64, scalar: &Scalar) -> Value {
    match Number::from_f64(value) {
        Some(n) => Value::Number(n),
        None => Value::String(scalar.to_string()),
    }
}

pub fn condition_from_json(json: &Value) -> Result<Condition> {
    let object = match json {
        Value::Bool(b) => return Ok(Condition::constant(*b)),
        Value::Null => return Ok(Condition::constant(false)),
        Value::String(name) => {
            let variable =
                parser::parse_value(name, Some(&PropertyType::BOOLEAN), ParseContext::AssumeProperty)?;
            return Ok(Condition::is_true(variable));
        }
        Value::Object(object) => object,
        other => return Err(json_error(format!("unexpected {} while reading a condition", other))),
    };

    let variable = object
        .get(VARIABLE)
        .ok_or_else(|| json_error("missing 'Variable' in condition"))?;
    let variable = read_value(variable, None, ParseContext::AssumeProperty)?;

    let operation: ConditionOperation = object
        .get(OPERATION)
        .ok_or_else(|| json_error("missing 'Operation' in condition"))?
        .as_str()
        .ok_or_else(|| json_error("'Operation' must be a string"))?
        .parse()?;

    let comparand = object
        .get(COMPARAND)
        .ok_or_else(|| json_error("missing 'Comparand' in condition"))?;
    let comparand = scalar_from_json(comparand)?;

    Ok(Condition::new(variable, operation, comparand))
}

pub fn condition_to_json(condition: &Condition) -> Result<Value> {
    if condition.inverted {
        // write the equivalent positive condition
        let equivalent = condition.clone().with_inverted(false).opposite();
        if equivalent.inverted {
            return Err(json_error(format!("cannot write inverted condition '{}'", condition)));
        }
        return condition_to_json(&equivalent);
    }

    let is_true_check = condition.operation == ConditionOperation::Equal
        && condition.comparand == Some(Scalar::Boolean(true));
    if is_true_check {
        match &condition.variable {
            Some(DynamicValue::Concrete(c)) => {
                if let Some(Scalar::Boolean(b)) = c.value() {
                    return Ok(Value::Bool(*b));
                }
            }
            Some(DynamicValue::PropertyRef(r)) => return Ok(Value::String(r.info().to_string())),
            _ => {}
        }
    }

    let operation = condition.operation.name().ok_or_else(|| {
        json_error(format!("operation {:?} has no name", condition.operation))
    })?;
    let variable = match &condition.variable {
        None => Value::Null,
        Some(DynamicValue::Concrete(c)) => match c.value() {
            Some(Scalar::String(s)) => Value::String(format!("%({})", s)),
            _ => value_to_json(&DynamicValue::Concrete(c.clone()))?,
        },
        Some(variable) => value_to_json(variable)?,
    };

    let mut object = Map::new();
    object.insert(VARIABLE.to_string(), variable);
    object.insert(OPERATION.to_string(), Value::String(operation.to_string()));
    object.insert(
        COMPARAND.to_string(),
        condition.comparand.as_ref().map_or(Value::Null, scalar_to_json),
    );
    Ok(Value::Object(object))
}

/// Read a switch: an array of cases, or a single case object.
pub fn switch_from_json(json: &Value, expected: Option<&PropertyType>) -> Result<SwitchValue> {
    let cases = read_cases(json, expected)?;
    let switch = SwitchValue::new(cases)?;
    Ok(match expected {
        Some(ty) => switch.with_value_type(ty.clone()),
        None => switch,
    })
}

pub fn switch_to_json(switch: &SwitchValue) -> Result<Value> {
    switch
        .cases()
        .iter()
        .map(case_to_json)
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn read_cases(json: &Value, expected: Option<&PropertyType>) -> Result<Vec<SwitchCase>> {
    match json {
        Value::Object(_) => Ok(case_from_json(json, expected)?.into_iter().collect()),
        Value::Array(items) => {
            let mut cases = Vec::with_capacity(items.len());
            for item in items {
                cases.extend(case_from_json(item, expected)?);
            }
            Ok(cases)
        }
        other => Err(json_error(format!("unexpected {} while reading switch cases", other))),
    }
}

/// Read one case. `null` entries are skipped.
pub fn case_from_json(json: &Value, expected: Option<&PropertyType>) -> Result<Option<SwitchCase>> {
    let object = match json {
        Value::Null => return Ok(None),
        Value::Object(object) => object,
        other => return Err(json_error(format!("unexpected {} while reading a switch case", other))),
    };

    let lists = [AND, OR, CASES, CASE]
        .iter()
        .filter(|key| object.contains_key(**key))
        .count();
    if lists > 1 {
        return Err(json_error("a switch case may only have one of And, Or, Cases and Case"));
    }

    if object.contains_key(WHEN) || object.contains_key(CASES) {
        let guard = match object.get(WHEN) {
            Some(when) => condition_from_json(when)?,
            None => Condition {
                variable: None,
                ..Condition::constant(true)
            },
        };
        let nested = object
            .get(CASES)
            .or_else(|| object.get(CASE))
            .ok_or_else(|| json_error("a 'When' case needs 'Cases' or 'Case'"))?;
        let mut switch = SwitchValue::new(read_cases(nested, expected)?)?;
        if let Some(ty) = expected {
            switch = switch.with_value_type(ty.clone());
        }
        return Ok(Some(SwitchCase::when(guard, switch)));
    }

    let value = object
        .get(VALUE)
        .ok_or_else(|| json_error("missing 'Value' in switch case"))?;
    let value = value_from_json(value, expected)?;

    if let Some(conditions) = object.get(OR) {
        return Ok(Some(SwitchCase::or(read_conditions(conditions, expected)?, value)));
    }
    let conditions = match (object.get(AND), object.get(CASE)) {
        (Some(conditions), _) => read_conditions(conditions, expected)?,
        (None, Some(case)) => case_from_json(case, expected)?
            .map(CaseOrCondition::from)
            .into_iter()
            .collect(),
        (None, None) => Vec::new(),
    };
    Ok(Some(SwitchCase::and(conditions, value)))
}

fn read_conditions(json: &Value, expected: Option<&PropertyType>) -> Result<Vec<CaseOrCondition>> {
    match json {
        Value::Array(items) => {
            let mut conditions = Vec::with_capacity(items.len());
            for item in items {
                conditions.extend(read_condition_or_case(item, expected)?);
            }
            Ok(conditions)
        }
        single => Ok(read_condition_or_case(single, expected)?.into_iter().collect()),
    }
}

fn read_condition_or_case(
    json: &Value,
    expected: Option<&PropertyType>,
) -> Result<Option<CaseOrCondition>> {
    let is_case = json.as_object().is_some_and(|object| {
        [AND, OR, VALUE, WHEN, CASES, CASE]
            .iter()
            .any(|key| object.contains_key(*key))
    });
    if is_case {
        return Ok(case_from_json(json, expected)?.map(CaseOrCondition::from));
    }
    condition_from_json(json).map(|c| Some(c.into()))
}

pub fn case_to_json(case: &SwitchCase) -> Result<Value> {
    let mut object = Map::new();
    match case {
        SwitchCase::When { guard, switch } => {
            if guard.variable.is_some() {
                object.insert(WHEN.to_string(), condition_to_json(guard)?);
            }
            object.insert(CASES.to_string(), switch_to_json(switch)?);
        }
        SwitchCase::And { conditions, value } | SwitchCase::Or { conditions, value } => {
            if !conditions.is_empty() {
                let key = if matches!(case, SwitchCase::Or { .. }) { OR } else { AND };
                let items = conditions
                    .iter()
                    .map(|c| match c {
                        CaseOrCondition::Condition(c) => condition_to_json(c),
                        CaseOrCondition::Case(c) => case_to_json(c),
                    })
                    .collect::<Result<Vec<_>>>()?;
                object.insert(key.to_string(), Value::Array(items));
            }
            object.insert(VALUE.to_string(), value_to_json(value)?);
        }
    }
    Ok(Value::Object(object))
}
