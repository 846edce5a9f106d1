//! Text functions: `CAT` and `REP`

use crate::scalar::Scalar;
use crate::types::PropertyType;
use crate::value::Evaluated;

fn text(arg: &Evaluated) -> Option<String> {
    arg.value().map(|v| v.to_string())
}

/// Enumeration results are parsed back from the produced name.
fn finish(text: String, ty: &PropertyType) -> Option<Evaluated> {
    match ty {
        PropertyType::Enum(_) => Scalar::parse_typed(ty, &text).map(Evaluated::Value),
        _ => Some(Evaluated::Value(Scalar::string(text))),
    }
}

/// Null operands concatenate as empty text; two nulls produce null.
pub(super) fn concat(left: &Evaluated, right: &Evaluated, ty: &PropertyType) -> Option<Evaluated> {
    if left.is_null() && right.is_null() {
        return Some(Evaluated::Null);
    }
    let mut result = text(left).unwrap_or_default();
    result.push_str(&text(right).unwrap_or_default());
    finish(result, ty)
}

/// `REP(haystack needle replacement)`.
pub(super) fn replace(
    haystack: &Evaluated,
    needle: &Evaluated,
    replacement: &Evaluated,
    ty: &PropertyType,
) -> Option<Evaluated> {
    if haystack.is_null() && needle.is_null() && replacement.is_null() {
        return Some(Evaluated::Null);
    }
    let haystack = text(haystack).unwrap_or_default();
    let needle = text(needle).unwrap_or_default();
    let result = if haystack.is_empty() || needle.is_empty() {
        haystack
    } else {
        haystack.replace(&needle, &text(replacement).unwrap_or_default())
    };
    finish(result, ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::types::EnumType;

    fn value(v: impl Into<Scalar>) -> Evaluated {
        Evaluated::Value(v.into())
    }

    #[test]
    fn test_concat() {
        let ty = PropertyType::STRING;
        assert_eq!(concat(&value("a"), &value("b"), &ty), Some(value("ab")));
        assert_eq!(concat(&value("a"), &Evaluated::Null, &ty), Some(value("a")));
        assert_eq!(concat(&value(1i32), &value(2.5f64), &ty), Some(value("12.5")));
        assert_eq!(concat(&Evaluated::Null, &Evaluated::Null, &ty), Some(Evaluated::Null));
    }

    #[test]
    fn test_concat_into_enum() {
        let slot = Arc::new(EnumType::from_names("ESlotType", ["NONE", "PRIMARY", "SECONDARY"]));
        let ty = PropertyType::Enum(slot);
        match concat(&value("PRI"), &value("MARY"), &ty) {
            Some(Evaluated::Value(Scalar::Enum(e))) => assert_eq!(e.name(), "PRIMARY"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(concat(&value("X"), &value("Y"), &ty), None);
    }

    #[test]
    fn test_replace() {
        let ty = PropertyType::STRING;
        assert_eq!(
            replace(&value("a-b-c"), &value("-"), &value("+"), &ty),
            Some(value("a+b+c"))
        );
        assert_eq!(
            replace(&value("abc"), &value("b"), &Evaluated::Null, &ty),
            Some(value("ac"))
        );
        assert_eq!(replace(&value("abc"), &value(""), &value("x"), &ty), Some(value("abc")));
        assert_eq!(replace(&Evaluated::Null, &value("a"), &value("x"), &ty), Some(value("")));
        assert_eq!(
            replace(&Evaluated::Null, &Evaluated::Null, &Evaluated::Null, &ty),
            Some(Evaluated::Null)
        );
    }
}
