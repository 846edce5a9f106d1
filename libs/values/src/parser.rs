//! Text grammar for dynamic values
//!
//! ```text
//! value      := '=' expression
//!             | ('#' | '@') ( '(' text ')' | text )     data / property reference
//!             | '%' ( '(' text ')' | text )             escaped literal
//!             | literal                                 parsed as the expected type
//! expression := '(' expression ')'
//!             | NAME '(' arg (' ' arg)* ')'
//!             | constant                                PI, TAU, E, NULL or a literal
//! arg        := '(' value ')' | value
//! ```
//!
//! Arguments are separated by single spaces at the top paren depth; quoted
//! text is never split.

use crate::error::{Error, Result};
use crate::functions::{self, Function};
use crate::scalar::Scalar;
use crate::types::{PropertyType, ValueKind};
use crate::value::{ConcreteValue, DataRef, DynamicValue, ExpressionNode, PropertyRef};

/// How bare text (without a `#`/`@` marker) is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ParseContext {
    /// Literals, unless marked otherwise.
    #[default]
    Optional,
    /// Bare text names a property.
    AssumeProperty,
    /// Bare text is a data reference.
    AssumeDataRef,
}

pub(crate) fn parse_value(
    text: &str,
    expected: Option<&PropertyType>,
    context: ParseContext,
) -> Result<DynamicValue> {
    if text.len() > 1 && text.starts_with('=') {
        return parse_expression(&text[1..], expected);
    }

    if text.len() > 1 && (text.starts_with('#') || text.starts_with('@')) {
        let data = text.starts_with('#');
        let inner = match trim_parenthesis(text, 1) {
            Some(inner) => inner,
            None if context == ParseContext::AssumeDataRef => &text[1..],
            None => return Err(malformed(text)),
        };
        return parse_reference(inner, data);
    }

    if text.starts_with("%(") {
        let inner = trim_parenthesis(text, 1).ok_or_else(|| malformed(text))?;
        return parse_literal(inner, expected);
    }

    if context != ParseContext::Optional {
        let data = context == ParseContext::AssumeDataRef;
        let inner = match trim_parenthesis(text, 0) {
            Some(inner) => inner,
            None if data => text,
            None => return Err(malformed(text)),
        };
        return parse_reference(inner, data);
    }

    let text = if text.starts_with('%') {
        trim_parenthesis(text, 1).ok_or_else(|| malformed(text))?
    } else {
        text
    };
    parse_literal(text, expected)
}

fn malformed(text: &str) -> Error {
    Error::ParseError(format!("unbalanced parentheses in '{}'", text))
}

fn parse_reference(text: &str, data: bool) -> Result<DynamicValue> {
    if data {
        DataRef::parse(text).map(DynamicValue::from)
    } else {
        PropertyRef::parse(text).map(DynamicValue::from)
    }
}

/// Strip a `(...)` wrapper starting at `start`, or just the first `start`
/// characters when there is none.
///
/// Only the outer characters are checked: the wrapper is the first `(` and the
/// final `)`, so `%(a)(b)` is the literal `a)(b`. `None` when the text opens a
/// wrapper it does not close, or when nothing follows `start`.
fn trim_parenthesis(text: &str, start: usize) -> Option<&str> {
    let rest = text.get(start..)?;
    if rest.is_empty() {
        return None;
    }
    if rest.starts_with('(') {
        if rest.len() < 3 || !rest.ends_with(')') {
            return None;
        }
        return Some(&rest[1..rest.len() - 1]);
    }
    Some(rest)
}

/// A literal of the expected type. Without one (or for strings) the text is
/// taken verbatim.
fn parse_literal(text: &str, expected: Option<&PropertyType>) -> Result<DynamicValue> {
    let ty = match expected {
        None => return Ok(DynamicValue::concrete(text)),
        Some(ty) if ty.is_string() => return Ok(DynamicValue::concrete(text)),
        Some(ty) => ty,
    };
    match DynamicValue::from_text(ty, text) {
        Ok(value) => Ok(value),
        // a single component broadcasts into a vector when evaluated
        Err(_) if ty.kind().is_vector() => text
            .trim()
            .parse::<f64>()
            .map(DynamicValue::concrete)
            .map_err(|_| Error::ParseError(format!("'{}' is not a valid {}", text, ty.name()))),
        Err(err) => Err(err),
    }
}

/// Index of the bracket closing the one at `open`.
fn closing_bracket(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_expression(text: &str, expected: Option<&PropertyType>) -> Result<DynamicValue> {
    let mut text = text.trim();
    if text.is_empty() {
        return Err(Error::ParseError("empty expression".to_string()));
    }

    let mut parenthesized = false;
    if text.starts_with('(') && closing_bracket(text, 0) == Some(text.len() - 1) {
        text = text[1..text.len() - 1].trim();
        parenthesized = true;
    }

    let open = text.find('(');
    let space = text.find(char::is_whitespace);
    let open = match (open, space) {
        (Some(open), Some(space)) if space < open => None,
        (open, _) => open,
    };

    let Some(open) = open else {
        return parse_constant(text, parenthesized, expected);
    };

    let name = text[..open].trim_end();
    let close = closing_bracket(text, open)
        .ok_or_else(|| Error::ParseError(format!("unclosed argument list in '={}'", text)))?;
    if !text[close + 1..].trim().is_empty() {
        return Err(Error::ParseError(format!(
            "unexpected text after '{}' in '={}'",
            &text[..=close],
            text
        )));
    }

    let function: Function = name.parse()?;
    let args = split_args(&text[open + 1..close])
        .into_iter()
        .map(|arg| parse_arg(arg, expected))
        .collect::<Result<Vec<_>>>()?;
    ExpressionNode::new(function, args, expected).map(DynamicValue::from)
}

/// Split on spaces at the top depth, outside quotes.
fn split_args(text: &str) -> Vec<&str> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if depth == 0 && c.is_whitespace() => {
                let arg = text[start..i].trim();
                if !arg.is_empty() {
                    args.push(arg);
                }
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    let arg = text[start..].trim();
    if !arg.is_empty() {
        args.push(arg);
    }
    args
}

fn parse_arg(arg: &str, expected: Option<&PropertyType>) -> Result<DynamicValue> {
    let (inner, parenthesized) = match arg.strip_prefix('(').and_then(|a| a.strip_suffix(')')) {
        Some(inner) if closing_bracket(arg, 0) == Some(arg.len() - 1) => (inner.trim(), true),
        _ => (arg, false),
    };

    if inner.starts_with(['=', '#', '@', '%']) && inner.len() > 1 {
        return parse_value(inner, expected, ParseContext::Optional);
    }
    if let Some(text) = unquote(inner) {
        return Ok(DynamicValue::concrete(text));
    }
    if !parenthesized {
        if let Some(value) = named_constant(inner, expected) {
            return value;
        }
    }
    Ok(numeric_or_text(inner, expected))
}

fn unquote(text: &str) -> Option<&str> {
    let quote = text.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    let end = text[1..].find(quote)? + 1;
    Some(&text[1..end])
}

fn parse_constant(
    text: &str,
    parenthesized: bool,
    expected: Option<&PropertyType>,
) -> Result<DynamicValue> {
    if !parenthesized {
        if let Some(value) = named_constant(text, expected) {
            return value;
        }
    }
    if let Some(ty) = expected.filter(|t| !t.is_string()) {
        return DynamicValue::from_text(ty, text);
    }
    Ok(match unquote(text) {
        Some(text) => DynamicValue::concrete(text),
        None => numeric_or_text(text, None),
    })
}

/// `PI`, `TAU`, `E` and `NULL`, cast into the expected type.
fn named_constant(name: &str, expected: Option<&PropertyType>) -> Option<Result<DynamicValue>> {
    let value = if name.eq_ignore_ascii_case("PI") {
        std::f64::consts::PI
    } else if name.eq_ignore_ascii_case("TAU") {
        std::f64::consts::TAU
    } else if name.eq_ignore_ascii_case("E") {
        std::f64::consts::E
    } else if name.eq_ignore_ascii_case("NULL") {
        return Some(Ok(DynamicValue::Null));
    } else {
        return None;
    };
    Some(cast_constant(value, expected).ok_or_else(|| {
        Error::ParseError(format!(
            "{} does not fit {}",
            name,
            expected.map_or("Float64", PropertyType::name)
        ))
    }))
}

fn cast_constant(value: f64, expected: Option<&PropertyType>) -> Option<DynamicValue> {
    let scalar = match expected {
        None => Scalar::Float64(value),
        Some(PropertyType::Scalar(ValueKind::Boolean)) => Scalar::Boolean(value != 0.0),
        Some(ty) if ty.kind().is_integer() => Scalar::Float64(value.trunc()).convert(ty)?,
        Some(ty) => functions::from_f64(value, ty)?,
    };
    Some(DynamicValue::from(scalar))
}

/// Typed literal when an expected type parses it, else `Int32`, then
/// `Float64`, then the text itself.
fn numeric_or_text(text: &str, expected: Option<&PropertyType>) -> DynamicValue {
    if let Some(scalar) = expected
        .filter(|t| !t.is_string())
        .and_then(|t| Scalar::parse_typed(t, text))
    {
        return DynamicValue::from(scalar);
    }
    if let Ok(v) = text.parse::<i32>() {
        return DynamicValue::concrete(v);
    }
    if let Ok(v) = text.parse::<f64>() {
        return DynamicValue::concrete(v);
    }
    if text.eq_ignore_ascii_case("null") {
        return DynamicValue::Concrete(ConcreteValue::null(ValueKind::String));
    }
    DynamicValue::concrete(text)
}
