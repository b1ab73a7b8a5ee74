//! Meta-schema validation for registered schemas.
//!
//! A schema attached to an entry point must describe fields this crate knows
//! how to turn into flags, environment decoding rules and validation rules.
//! That subset of JSON Schema is itself written down as a draft-07 schema and
//! compiled once with [`jsonschema`]; [`validate_schema_value`] checks a
//! schema against it and [`validate_model`] does the same for schemas
//! assembled in code.
//!
//! Every field kind has a closed set of attributes. Anything outside the set
//! is rejected so that a typo such as `"defualt"` fails at wiring time rather
//! than being silently ignored. Two rules cannot be stated in draft-07 and are
//! checked on the typed model afterwards: `required` may only name declared
//! fields, and a one-character title may not claim a reserved short flag.
//!
//! # Examples
//!
//! ```
//! use schema_entry_core::{SchemaError, validate_schema_value};
//! use serde_json::json;
//!
//! let ok = json!({
//!     "type": "object",
//!     "properties": { "port": { "type": "integer", "minimum": 1 } }
//! });
//! assert!(validate_schema_value(&ok).is_empty());
//!
//! let typo = json!({
//!     "type": "object",
//!     "properties": { "port": { "type": "integer", "defualt": 80 } }
//! });
//! let errors = validate_schema_value(&typo);
//! assert!(matches!(errors[0], SchemaError::UnknownAttribute { .. }));
//! ```

use std::sync::LazyLock;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema, ValidationError};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::types::{FIELD_NAME_PATTERN, FieldSpec, FieldType, SchemaModel};

/// Short flags claimed by the command-line layer (`-c/--config`, `-h/--help`).
pub const RESERVED_SHORT_FLAGS: [char; 2] = ['c', 'h'];

const FIELD_KINDS: [&str; 6] = ["string", "number", "integer", "boolean", "array", "object"];

static SUPPORT_SCHEMA: LazyLock<JSONSchema> = LazyLock::new(|| {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .should_validate_formats(true)
        .compile(&support_schema())
        .expect("meta-schema must compile")
});

/// Schema errors detected at registration time.
///
/// These signal programming errors in the wiring of an entry point, never
/// bad user input. `path` values use dotted notation rooted at the schema,
/// e.g. `properties.port.items`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The schema could not be parsed at all.
    #[error("malformed schema: {0}")]
    Malformed(String),
    /// The schema root is not a JSON object.
    #[error("schema root must be a JSON object")]
    NotAnObject,
    /// The schema root does not declare `"type": "object"`.
    #[error("schema root must declare \"type\": \"object\"")]
    RootTypeNotObject,
    /// `properties` is missing, not an object, or empty.
    #[error("schema must declare a non-empty `properties` object")]
    EmptyProperties,
    /// A field name contains characters other than word characters.
    #[error("invalid field name `{0}`: only word characters are allowed")]
    InvalidFieldName(String),
    /// A field spec is not a JSON object.
    #[error("{path}: field spec must be a JSON object")]
    SpecNotAnObject { path: String },
    /// A field spec has no `type`.
    #[error("{path}: missing \"type\"")]
    MissingType { path: String },
    /// A field spec declares a type outside the supported set.
    #[error("{path}: unsupported type `{found}`")]
    UnsupportedType { path: String, found: String },
    /// A field spec carries an attribute its kind does not allow.
    #[error("{path}: attribute `{attribute}` is not allowed for type {kind}")]
    UnknownAttribute {
        path: String,
        attribute: String,
        kind: String,
    },
    /// An attribute value has the wrong shape.
    #[error("{path}: attribute `{attribute}` is invalid: {message}")]
    InvalidAttribute {
        path: String,
        attribute: String,
        message: String,
    },
    /// An array field has no element spec.
    #[error("{path}: array fields must declare `items`")]
    MissingItems { path: String },
    /// `required` names a field that `properties` does not declare.
    #[error("{path}: required field `{name}` is not declared in properties")]
    UndeclaredRequired { path: String, name: String },
    /// `pattern` is not a valid regular expression.
    #[error("{path}: invalid pattern: {message}")]
    InvalidPattern { path: String, message: String },
    /// A one-character title collides with a reserved short flag.
    #[error("{path}: short flag -{flag} is reserved")]
    ReservedShortFlag { path: String, flag: char },
    /// Any other meta-schema violation.
    #[error("{path}: {message}")]
    Invalid { path: String, message: String },
}

/// The supported subset of JSON Schema, as a draft-07 schema.
fn support_schema() -> Value {
    let kinds: Vec<Value> = FIELD_KINDS.iter().map(|kind| kind_schema(kind)).collect();
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["type", "properties"],
        "properties": {
            "type": { "const": "object" },
            "properties": fields_schema(1),
            "required": names_schema()
        },
        "definitions": {
            "field": {
                "type": "object",
                "required": ["type"],
                "properties": { "type": { "enum": FIELD_KINDS } },
                "allOf": kinds
            }
        }
    })
}

fn fields_schema(min_properties: u64) -> Value {
    let mut patterns = Map::new();
    patterns.insert(
        FIELD_NAME_PATTERN.to_string(),
        json!({ "$ref": "#/definitions/field" }),
    );
    json!({
        "type": "object",
        "minProperties": min_properties,
        "patternProperties": patterns,
        "additionalProperties": false
    })
}

fn names_schema() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

/// Closed attribute set of one field kind, applied when `type` names it.
fn kind_schema(kind: &str) -> Value {
    let value = json!({ "type": kind });
    let count = json!({ "type": "integer", "minimum": 0 });
    let bound = json!({ "type": "number" });
    let members = json!({ "type": "array", "minItems": 1, "items": value });

    let mut attributes = json!({
        "type": {},
        "description": { "type": "string" },
        "title": { "type": "string" },
        "default": value,
        "const": value
    });
    let extra = match kind {
        "string" => json!({
            "enum": members,
            "minLength": count,
            "maxLength": count,
            "pattern": { "type": "string", "format": "regex" },
            "format": { "type": "string" }
        }),
        "number" | "integer" => json!({
            "enum": members,
            "minimum": bound,
            "maximum": bound,
            "exclusiveMinimum": bound,
            "exclusiveMaximum": bound
        }),
        "array" => json!({
            "items": { "$ref": "#/definitions/field" },
            "minItems": count,
            "maxItems": count
        }),
        "object" => json!({
            "properties": fields_schema(0),
            "required": names_schema()
        }),
        _ => json!({}),
    };
    if let (Some(target), Value::Object(extra)) = (attributes.as_object_mut(), extra) {
        target.extend(extra);
    }

    let mut then = json!({ "properties": attributes, "additionalProperties": false });
    if kind == "array" {
        then["required"] = json!(["items"]);
    }
    json!({
        "if": { "properties": { "type": { "const": kind } }, "required": ["type"] },
        "then": then
    })
}

/// Validates the JSON form of a schema against the meta-schema.
///
/// Returns all violations found; an empty vector means the schema is legal.
pub fn validate_schema_value(schema: &Value) -> Vec<SchemaError> {
    let errors = meta_errors(schema);
    if !errors.is_empty() {
        return errors;
    }
    match serde_json::from_value::<SchemaModel>(schema.clone()) {
        Ok(model) => check_structure(&model),
        Err(err) => vec![SchemaError::Malformed(err.to_string())],
    }
}

/// Validates the typed form of a schema.
///
/// The model is rendered back to JSON and checked like
/// [`validate_schema_value`], so field names, attribute sets, `items`, and
/// the types of `default`/`const`/`enum` values follow the same rules.
///
/// # Examples
///
/// ```
/// use schema_entry_core::{FieldSpec, SchemaError, SchemaModel, validate_model};
///
/// let model = SchemaModel::new()
///     .with_field("name", FieldSpec::string())
///     .with_required("missing");
/// assert_eq!(
///     validate_model(&model),
///     vec![SchemaError::UndeclaredRequired {
///         path: "schema".into(),
///         name: "missing".into(),
///     }]
/// );
/// ```
pub fn validate_model(model: &SchemaModel) -> Vec<SchemaError> {
    let errors = meta_errors(&model.to_value());
    if !errors.is_empty() {
        return errors;
    }
    check_structure(model)
}

fn meta_errors(schema: &Value) -> Vec<SchemaError> {
    match SUPPORT_SCHEMA.validate(schema) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.flat_map(|err| translate(&err)).collect(),
    }
}

/// What an instance path points at inside a schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Root,
    Fields,
    Field,
}

struct Located<'a> {
    node: Node,
    path: String,
    attribute: Option<&'a str>,
}

fn locate(segments: &[String]) -> Located<'_> {
    let mut node = Node::Root;
    let mut depth = 0;
    for segment in segments {
        node = match (node, segment.as_str()) {
            (Node::Root | Node::Field, "properties") => Node::Fields,
            (Node::Field, "items") => Node::Field,
            (Node::Fields, _) => Node::Field,
            _ => break,
        };
        depth += 1;
    }
    let path = if depth == 0 {
        "schema".to_string()
    } else {
        segments[..depth].join(".")
    };
    Located {
        node,
        path,
        attribute: segments.get(depth).map(String::as_str),
    }
}

fn pointer_segments(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .skip(1)
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn translate(err: &ValidationError<'_>) -> Vec<SchemaError> {
    let segments = pointer_segments(&err.instance_path.to_string());
    let Located {
        node,
        path,
        attribute,
    } = locate(&segments);

    let error = match (&err.kind, node, attribute) {
        (ValidationErrorKind::AdditionalProperties { unexpected }, Node::Fields, None) => {
            return unexpected
                .iter()
                .cloned()
                .map(SchemaError::InvalidFieldName)
                .collect();
        }
        (ValidationErrorKind::AdditionalProperties { unexpected }, Node::Field, None) => {
            let kind = err
                .instance
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return unexpected
                .iter()
                .map(|attribute| SchemaError::UnknownAttribute {
                    path: path.clone(),
                    attribute: attribute.clone(),
                    kind: kind.to_string(),
                })
                .collect();
        }
        (ValidationErrorKind::Required { property }, _, None) => {
            match (node, property.as_str()) {
                (Node::Root, Some("type")) => SchemaError::RootTypeNotObject,
                (Node::Root, Some("properties")) => SchemaError::EmptyProperties,
                (Node::Field, Some("type")) => SchemaError::MissingType { path },
                (Node::Field, Some("items")) => SchemaError::MissingItems { path },
                _ => SchemaError::Invalid {
                    path,
                    message: err.to_string(),
                },
            }
        }
        (ValidationErrorKind::Type { .. }, Node::Root, None) => SchemaError::NotAnObject,
        (ValidationErrorKind::Type { .. }, Node::Field, None) => {
            SchemaError::SpecNotAnObject { path }
        }
        (_, Node::Fields, None) if segments.len() == 1 => SchemaError::EmptyProperties,
        (_, Node::Root, Some("type")) => SchemaError::RootTypeNotObject,
        (_, Node::Field, Some("type")) => SchemaError::UnsupportedType {
            path,
            found: match &*err.instance {
                Value::String(found) => found.clone(),
                other => other.to_string(),
            },
        },
        (ValidationErrorKind::Format { .. }, Node::Field, Some("pattern")) => {
            SchemaError::InvalidPattern {
                path,
                message: err.to_string(),
            }
        }
        (_, _, Some(attribute)) => SchemaError::InvalidAttribute {
            path,
            attribute: attribute.to_string(),
            message: err.to_string(),
        },
        _ => SchemaError::Invalid {
            path,
            message: err.to_string(),
        },
    };
    vec![error]
}

/// Rules draft-07 cannot express: `required` references and reserved flags.
fn check_structure(model: &SchemaModel) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    for (name, spec) in &model.properties {
        let path = format!("properties.{name}");
        if let Some(flag) = spec.short_flag() {
            if RESERVED_SHORT_FLAGS.contains(&flag) {
                errors.push(SchemaError::ReservedShortFlag {
                    path: path.clone(),
                    flag,
                });
            }
        }
        check_nested_required(&path, spec, &mut errors);
    }
    for name in &model.required {
        if !model.properties.contains_key(name) {
            errors.push(SchemaError::UndeclaredRequired {
                path: "schema".to_string(),
                name: name.clone(),
            });
        }
    }
    errors
}

fn check_nested_required(path: &str, spec: &FieldSpec, errors: &mut Vec<SchemaError>) {
    match spec.field_type {
        FieldType::Array => {
            if let Some(items) = &spec.items {
                check_nested_required(&format!("{path}.items"), items, errors);
            }
        }
        FieldType::Object => {
            let props = spec.properties.as_ref();
            for (name, nested) in props.into_iter().flatten() {
                check_nested_required(&format!("{path}.properties.{name}"), nested, errors);
            }
            for name in &spec.required {
                if !props.is_some_and(|p| p.contains_key(name)) {
                    errors.push(SchemaError::UndeclaredRequired {
                        path: path.to_string(),
                        name: name.clone(),
                    });
                }
            }
        }
        _ => {}
    }
}
