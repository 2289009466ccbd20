//! Field validators for untyped property-bag values.
//!
//! Required-field validators return a [`ParseResult`]: an absent (or `null`)
//! field is `missing-required-field`, a present field of the wrong shape is
//! `invalid-message-format`. Optional-field validators never fail; they
//! yield `None` for absent or wrong-typed input.

use crate::result::{ParseError, ParseResult};
use serde_json::Value;

fn wrong_type(field: &str, expected: &str, found: &Value) -> ParseError {
    ParseError::invalid_format(format!("field '{}' must be a {}", field, expected))
        .with_context("field", field)
        .with_context("found", type_name(found))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Requires a string value.
pub fn expect_string(value: Option<&Value>, field: &str) -> ParseResult<String> {
    match value {
        Some(Value::String(s)) => Ok(s.clone()),
        None | Some(Value::Null) => Err(ParseError::missing_field(field)),
        Some(other) => Err(wrong_type(field, "string", other)),
    }
}

/// Requires a numeric value. NaN is rejected.
pub fn expect_number(value: Option<&Value>, field: &str) -> ParseResult<f64> {
    match value {
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if !f.is_nan() => Ok(f),
            _ => Err(ParseError::invalid_format(format!(
                "field '{}' is not a finite number",
                field
            ))
            .with_context("field", field)),
        },
        None | Some(Value::Null) => Err(ParseError::missing_field(field)),
        Some(other) => Err(wrong_type(field, "number", other)),
    }
}

/// Exact integer value of a number. Floats are accepted only when they have
/// no fractional part and lie inside the `i64` range.
fn integral(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Requires an integer value. Fractional, non-finite and out-of-range
/// numbers are `invalid-message-format`, never truncated.
pub fn expect_integer(value: Option<&Value>, field: &str) -> ParseResult<i64> {
    match value {
        Some(Value::Number(n)) => integral(n).ok_or_else(|| {
            ParseError::invalid_format(format!("field '{}' is not an integer", field))
                .with_context("field", field)
                .with_context("found", n.to_string())
        }),
        None | Some(Value::Null) => Err(ParseError::missing_field(field)),
        Some(other) => Err(wrong_type(field, "integer", other)),
    }
}

/// `true` for boolean `true`, the string `"true"`, or the number `1`;
/// `false` for everything else, including absence.
pub fn coerce_boolean(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        _ => false,
    }
}

pub fn optional_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

pub fn optional_number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|f| !f.is_nan())
}

pub fn optional_integer(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => integral(n),
        _ => None,
    }
}

/// Integer that fits the target type, e.g. a non-negative size as `u64`.
pub fn optional_bounded<T: TryFrom<i64>>(value: Option<&Value>) -> Option<T> {
    optional_integer(value).and_then(|n| T::try_from(n).ok())
}

/// Resolves an identifier that is either a non-empty string or an object
/// carrying a `_serialized` string.
pub fn expect_identifier(value: Option<&Value>, field: &str) -> ParseResult<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(ParseError::missing_field(field)),
        Some(Value::Object(map)) => match map.get("_serialized") {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            _ => Err(ParseError::invalid_format(format!(
                "field '{}' has no serialized identifier",
                field
            ))
            .with_context("field", field)),
        },
        None | Some(Value::Null) => Err(ParseError::missing_field(field)),
        Some(other) => Err(wrong_type(field, "string or identifier object", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ParseErrorKind;
    use serde_json::json;

    #[test]
    fn test_expect_string() {
        assert_eq!(expect_string(Some(&json!("hi")), "body").unwrap(), "hi");
        assert_eq!(
            expect_string(None, "body").unwrap_err().kind,
            ParseErrorKind::MissingRequiredField
        );
        assert_eq!(
            expect_string(Some(&Value::Null), "body").unwrap_err().kind,
            ParseErrorKind::MissingRequiredField
        );
        assert_eq!(
            expect_string(Some(&json!(5)), "body").unwrap_err().kind,
            ParseErrorKind::InvalidMessageFormat
        );
    }

    #[test]
    fn test_expect_number() {
        assert_eq!(expect_number(Some(&json!(12)), "t").unwrap(), 12.0);
        assert_eq!(expect_number(Some(&json!(1.5)), "t").unwrap(), 1.5);
        assert_eq!(
            expect_number(None, "t").unwrap_err().kind,
            ParseErrorKind::MissingRequiredField
        );
        let err = expect_number(Some(&json!("12")), "t").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidMessageFormat);
        assert_eq!(err.context.unwrap()["found"], "string");
    }

    #[test]
    fn test_expect_integer_never_truncates() {
        assert_eq!(expect_integer(Some(&json!(1700000000)), "t").unwrap(), 1700000000);
        assert_eq!(expect_integer(Some(&json!(1700000000.0)), "t").unwrap(), 1700000000);
        assert_eq!(expect_integer(Some(&json!(-3)), "t").unwrap(), -3);

        for bad in [json!(1700000000.75), json!(1e30), json!(-1e30), json!(u64::MAX)] {
            let err = expect_integer(Some(&bad), "t").unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::InvalidMessageFormat, "input {}", bad);
            assert_eq!(err.context.unwrap()["field"], "t");
        }
        assert_eq!(
            expect_integer(None, "t").unwrap_err().kind,
            ParseErrorKind::MissingRequiredField
        );
        assert_eq!(
            expect_integer(Some(&json!("5")), "t").unwrap_err().kind,
            ParseErrorKind::InvalidMessageFormat
        );
    }

    #[test]
    fn test_optional_bounded() {
        assert_eq!(optional_bounded::<u32>(Some(&json!(640))), Some(640));
        assert_eq!(optional_bounded::<u32>(Some(&json!(-1))), None);
        assert_eq!(optional_bounded::<u32>(Some(&json!(5_000_000_000u64))), None);
        assert_eq!(optional_bounded::<u32>(Some(&json!(2.5))), None);
        assert_eq!(optional_bounded::<u64>(Some(&json!(1e30))), None);
        assert_eq!(optional_bounded::<u64>(Some(&json!(2048.0))), Some(2048));
        assert_eq!(optional_integer(Some(&json!("7"))), None);
    }

    #[test]
    fn test_coerce_boolean() {
        assert!(coerce_boolean(Some(&json!(true))));
        assert!(coerce_boolean(Some(&json!("true"))));
        assert!(coerce_boolean(Some(&json!(1))));
        assert!(coerce_boolean(Some(&json!(1.0))));

        assert!(!coerce_boolean(Some(&json!(false))));
        assert!(!coerce_boolean(Some(&json!("yes"))));
        assert!(!coerce_boolean(Some(&json!(2))));
        assert!(!coerce_boolean(Some(&json!({}))));
        assert!(!coerce_boolean(None));
    }

    #[test]
    fn test_optionals_never_fail() {
        assert_eq!(optional_string(Some(&json!("x"))), Some("x".to_string()));
        assert_eq!(optional_string(Some(&json!(3))), None);
        assert_eq!(optional_string(None), None);

        assert_eq!(optional_number(Some(&json!(3))), Some(3.0));
        assert_eq!(optional_number(Some(&json!("3"))), None);
        assert_eq!(optional_number(None), None);
    }

    #[test]
    fn test_expect_identifier_shapes() {
        assert_eq!(expect_identifier(Some(&json!("abc")), "id").unwrap(), "abc");
        assert_eq!(
            expect_identifier(Some(&json!({ "_serialized": "true_1@c.us_X" })), "id").unwrap(),
            "true_1@c.us_X"
        );
        assert_eq!(
            expect_identifier(Some(&json!("")), "id").unwrap_err().kind,
            ParseErrorKind::MissingRequiredField
        );
        assert_eq!(
            expect_identifier(Some(&json!({ "remote": "x" })), "id").unwrap_err().kind,
            ParseErrorKind::InvalidMessageFormat
        );
        assert_eq!(
            expect_identifier(Some(&json!(42)), "id").unwrap_err().kind,
            ParseErrorKind::InvalidMessageFormat
        );
    }
}
