//! Conversion of raw strings into typed configuration values.
//!
//! Environment variables and command-line flags arrive as strings. [`coerce`]
//! turns such a string into a [`Value`] of the field's declared type,
//! recursing into `items` for arrays and `properties` for objects.
//!
//! | type      | raw form                         |
//! |-----------|----------------------------------|
//! | `string`  | taken verbatim                   |
//! | `number`  | decimal, e.g. `123.1`            |
//! | `integer` | decimal, e.g. `42`               |
//! | `boolean` | `true` (any case) → true, else false |
//! | `array`   | `a,b,c`                          |
//! | `object`  | `key:value;key:value`            |
//!
//! Anything other than `true` is `false` for booleans, including typos
//! such as `ture`.
//!
//! # Examples
//!
//! ```
//! use schema_entry_core::{FieldSpec, coerce};
//! use serde_json::json;
//!
//! let spec = FieldSpec::array(FieldSpec::string());
//! assert_eq!(coerce(&spec, "a,b,c").unwrap(), json!(["a", "b", "c"]));
//!
//! let spec = FieldSpec::object().with_property("port", FieldSpec::integer());
//! assert_eq!(
//!     coerce(&spec, "host:localhost;port:8080").unwrap(),
//!     json!({"host": "localhost", "port": 8080})
//! );
//! ```

use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::warn;

use crate::types::{FieldSpec, FieldType};

/// Separator between array elements.
pub const ARRAY_SEPARATOR: char = ',';
/// Separator between `key:value` pairs of an object.
pub const PAIR_SEPARATOR: char = ';';
/// Separator between a key and its value inside a pair.
pub const KEY_VALUE_SEPARATOR: char = ':';

/// A raw string could not be parsed as the declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Not a finite decimal number.
    #[error("cannot parse `{raw}` as number")]
    InvalidNumber { raw: String },
    /// Not a whole decimal number.
    #[error("cannot parse `{raw}` as integer")]
    InvalidInteger { raw: String },
    /// An object segment lacks the `key:value` separator.
    #[error("object segment `{segment}` is not a key:value pair")]
    MissingPairSeparator { segment: String },
}

/// Converts `raw` into a value of `spec`'s declared type.
///
/// Unknown types pass the raw string through and log a warning.
///
/// # Errors
///
/// Returns a [`TypeError`] when `raw` (or one of its elements) cannot be
/// parsed as the declared type.
pub fn coerce(spec: &FieldSpec, raw: &str) -> Result<Value, TypeError> {
    match &spec.field_type {
        FieldType::String => Ok(Value::String(raw.to_string())),
        FieldType::Number => parse_number(raw),
        FieldType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| TypeError::InvalidInteger {
                raw: raw.to_string(),
            }),
        FieldType::Boolean => Ok(Value::Bool(raw.eq_ignore_ascii_case("true"))),
        FieldType::Array => raw
            .split(ARRAY_SEPARATOR)
            .map(|element| match spec.items.as_deref() {
                Some(items) => coerce(items, element),
                None => Ok(Value::String(element.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        FieldType::Object => coerce_object(spec, raw),
        FieldType::Other(name) => {
            warn!(field_type = %name, "unknown field type, passing raw value through");
            Ok(Value::String(raw.to_string()))
        }
    }
}

fn parse_number(raw: &str) -> Result<Value, TypeError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| TypeError::InvalidNumber {
            raw: raw.to_string(),
        })
}

fn coerce_object(spec: &FieldSpec, raw: &str) -> Result<Value, TypeError> {
    let mut object = Map::new();
    for segment in raw.split(PAIR_SEPARATOR) {
        let (key, value) =
            segment
                .split_once(KEY_VALUE_SEPARATOR)
                .ok_or_else(|| TypeError::MissingPairSeparator {
                    segment: segment.to_string(),
                })?;
        let value = match spec.property(key) {
            Some(nested) => coerce(nested, value)?,
            None => Value::String(value.to_string()),
        };
        object.insert(key.to_string(), value);
    }
    Ok(Value::Object(object))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_string_is_identity() {
        assert_eq!(
            coerce(&FieldSpec::string(), " spaced ").unwrap(),
            json!(" spaced ")
        );
    }

    #[test]
    fn test_number_parses_decimal() {
        assert_eq!(coerce(&FieldSpec::number(), "123.1").unwrap(), json!(123.1));
        assert_eq!(coerce(&FieldSpec::number(), "2").unwrap(), json!(2.0));
    }

    #[test]
    fn test_number_rejects_garbage_and_non_finite() {
        assert_eq!(
            coerce(&FieldSpec::number(), "abc"),
            Err(TypeError::InvalidNumber {
                raw: "abc".to_string()
            })
        );
        assert!(coerce(&FieldSpec::number(), "inf").is_err());
        assert!(coerce(&FieldSpec::number(), "NaN").is_err());
    }

    #[test]
    fn test_integer_rejects_fraction() {
        assert_eq!(coerce(&FieldSpec::integer(), "2").unwrap(), json!(2));
        assert_eq!(
            coerce(&FieldSpec::integer(), "2.5"),
            Err(TypeError::InvalidInteger {
                raw: "2.5".to_string()
            })
        );
    }

    #[test]
    fn test_boolean_is_loose() {
        let spec = FieldSpec::boolean();
        assert_eq!(coerce(&spec, "TRUE").unwrap(), json!(true));
        assert_eq!(coerce(&spec, "True").unwrap(), json!(true));
        assert_eq!(coerce(&spec, "yes").unwrap(), json!(false));
        assert_eq!(coerce(&spec, "1").unwrap(), json!(false));
    }

    #[test]
    fn test_array_coerces_each_element() {
        let spec = FieldSpec::array(FieldSpec::integer());
        assert_eq!(coerce(&spec, "1,2,3").unwrap(), json!([1, 2, 3]));
        assert!(coerce(&spec, "1,x").is_err());
    }

    #[test]
    fn test_array_without_items_keeps_strings() {
        let spec = FieldSpec::new(FieldType::Array);
        assert_eq!(coerce(&spec, "1,2").unwrap(), json!(["1", "2"]));
    }

    #[test]
    fn test_object_without_properties_keeps_strings() {
        assert_eq!(
            coerce(&FieldSpec::object(), "a:1;b:x").unwrap(),
            json!({"a": "1", "b": "x"})
        );
    }

    #[test]
    fn test_object_value_may_contain_colons() {
        assert_eq!(
            coerce(&FieldSpec::object(), "url:http://host").unwrap(),
            json!({"url": "http://host"})
        );
    }

    #[test]
    fn test_object_rejects_segment_without_separator() {
        assert_eq!(
            coerce(&FieldSpec::object(), "a:1;broken"),
            Err(TypeError::MissingPairSeparator {
                segment: "broken".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_type_passes_through() {
        let spec = FieldSpec::new("uuid");
        assert_eq!(coerce(&spec, "abc-123").unwrap(), json!("abc-123"));
    }
}
