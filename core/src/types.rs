//! Schema type definitions for configuration modeling.
//!
//! This module defines the declarative data model that describes the
//! configuration accepted by a command entry point. A [`SchemaModel`] maps
//! field names to [`FieldSpec`]s; each spec carries a [`FieldType`] plus the
//! optional default, constant, enumeration, bounds and nested element specs.
//!
//! The types use the JSON Schema (draft-07) attribute spelling, so a schema
//! written for this crate can also be read by ordinary JSON Schema tooling.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::protocol::{SchemaError, validate_model, validate_schema_value};

/// Pattern every field name must match.
///
/// Field names are transposed into environment variable names and long flag
/// names, so they are restricted to word characters.
pub const FIELD_NAME_PATTERN: &str = r"^\w+$";

/// Declared type of a configuration field.
///
/// The six supported kinds are recognized. Any other type string is
/// preserved in [`FieldType::Other`] so that coercion can pass the raw value
/// through instead of failing.
///
/// # Examples
///
/// ```
/// use schema_entry_core::FieldType;
///
/// assert_eq!(FieldType::from("number"), FieldType::Number);
/// assert_eq!(FieldType::from("uuid"), FieldType::Other("uuid".into()));
/// assert_eq!(FieldType::Array.as_str(), "array");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// Floating point number.
    Number,
    /// Whole number.
    Integer,
    /// `true` / `false`.
    Boolean,
    /// Homogeneous list described by `items`.
    Array,
    /// Nested mapping described by `properties`.
    Object,
    /// Unrecognized type name.
    Other(String),
}

impl FieldType {
    /// Returns the JSON Schema spelling of the type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Other(name) => name,
        }
    }

    /// Returns `true` for every type except [`FieldType::Other`].
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => Self::Other(name),
        }
    }
}

impl From<&str> for FieldType {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative description of one configuration field.
///
/// Built either by deserializing a JSON Schema property object or with the
/// constructor and builder methods below.
///
/// # Examples
///
/// ```
/// use schema_entry_core::{FieldSpec, FieldType};
///
/// let port = FieldSpec::integer()
///     .with_default(8080)
///     .with_minimum(1.0)
///     .with_description("Listen port");
/// assert_eq!(port.field_type, FieldType::Integer);
/// assert_eq!(port.default, Some(serde_json::json!(8080)));
///
/// let tags = FieldSpec::array(FieldSpec::string());
/// assert_eq!(tags.items.as_ref().unwrap().field_type, FieldType::String);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Declared type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Value used when no source sets the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Fixed value; the field is not user-settable from the command line.
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
    /// Closed set of legal values.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    /// Help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Single-character titles become short flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Element spec for `array` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldSpec>>,
    /// Nested field specs for `object` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, FieldSpec>>,
    /// Required nested fields for `object` fields.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// Regular expression string values must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Format annotation; recorded but not enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
}

impl FieldSpec {
    /// Creates a spec of the given type with no constraints.
    pub fn new(field_type: impl Into<FieldType>) -> Self {
        Self {
            field_type: field_type.into(),
            default: None,
            const_value: None,
            enum_values: None,
            description: None,
            title: None,
            items: None,
            properties: None,
            required: BTreeSet::new(),
            minimum: None,
            maximum: None,
            exclusive_minimum: None,
            exclusive_maximum: None,
            min_length: None,
            max_length: None,
            pattern: None,
            format: None,
            min_items: None,
            max_items: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    /// Creates an `array` spec whose elements follow `items`.
    pub fn array(items: FieldSpec) -> Self {
        let mut spec = Self::new(FieldType::Array);
        spec.items = Some(Box::new(items));
        spec
    }

    /// Creates an `object` spec with no declared properties.
    pub fn object() -> Self {
        Self::new(FieldType::Object)
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_const(mut self, value: impl Into<Value>) -> Self {
        self.const_value = Some(value.into());
        self
    }

    /// Restricts the field to a closed set of values.
    pub fn with_enum<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Adds a nested property to an `object` spec.
    pub fn with_property(mut self, name: &str, spec: FieldSpec) -> Self {
        self.properties
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), spec);
        self
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    /// Returns the short flag character derived from a one-character title.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_entry_core::FieldSpec;
    ///
    /// assert_eq!(FieldSpec::number().with_title("a").short_flag(), Some('a'));
    /// assert_eq!(FieldSpec::number().with_title("alpha").short_flag(), None);
    /// assert_eq!(FieldSpec::number().short_flag(), None);
    /// ```
    pub fn short_flag(&self) -> Option<char> {
        let title = self.title.as_deref()?;
        let mut chars = title.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphanumeric() => Some(c),
            _ => None,
        }
    }

    /// Returns the nested spec for `key` of an `object` field.
    pub fn property(&self, key: &str) -> Option<&FieldSpec> {
        self.properties.as_ref().and_then(|props| props.get(key))
    }
}

/// Declarative description of a node's configuration.
///
/// The model is validated against the fixed meta-schema when it is parsed
/// with [`SchemaModel::from_value`] or [`SchemaModel::from_json_str`], and
/// structurally with [`SchemaModel::check`] when it is assembled in code.
///
/// # Examples
///
/// ```
/// use schema_entry_core::{FieldSpec, SchemaModel};
/// use serde_json::json;
///
/// let parsed = SchemaModel::from_value(&json!({
///     "type": "object",
///     "properties": { "a_a": { "type": "number", "default": 33.3 } },
///     "required": ["a_a"]
/// }))
/// .unwrap();
///
/// let built = SchemaModel::new()
///     .with_field("a_a", FieldSpec::number().with_default(33.3))
///     .with_required("a_a");
/// assert_eq!(parsed, built);
/// assert!(built.check().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaModel {
    /// Field name to field spec.
    #[serde(default)]
    pub properties: BTreeMap<String, FieldSpec>,
    /// Fields that must be present after merging.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaModel {
    /// Creates an empty schema model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and meta-validates a schema given as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns every [`SchemaError`] found; the list is never empty on error.
    pub fn from_value(value: &Value) -> Result<Self, Vec<SchemaError>> {
        let errors = validate_schema_value(value);
        if !errors.is_empty() {
            return Err(errors);
        }
        serde_json::from_value(value.clone())
            .map_err(|err| vec![SchemaError::Malformed(err.to_string())])
    }

    /// Parses and meta-validates a schema given as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Malformed`] if `json` is not valid JSON, or the
    /// meta-schema violations otherwise.
    pub fn from_json_str(json: &str) -> Result<Self, Vec<SchemaError>> {
        let value: Value = serde_json::from_str(json)
            .map_err(|err| vec![SchemaError::Malformed(err.to_string())])?;
        Self::from_value(&value)
    }

    /// Adds a field.
    pub fn with_field(mut self, name: &str, spec: FieldSpec) -> Self {
        self.properties.insert(name.to_string(), spec);
        self
    }

    /// Marks a field as required.
    pub fn with_required(mut self, name: &str) -> Self {
        self.required.insert(name.to_string());
        self
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Runs the meta-schema checks on the typed form.
    pub fn check(&self) -> Vec<SchemaError> {
        validate_model(self)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.properties.get(name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(name)
    }

    /// Returns field names in sorted order.
    pub fn field_names(&self) -> Vec<&str> {
        self.properties.keys().map(String::as_str).collect()
    }

    /// Renders the model as a JSON Schema object (with `"type": "object"`).
    pub fn to_value(&self) -> Value {
        let mut object = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        object.insert("type".to_string(), Value::String("object".to_string()));
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_field_type_roundtrip_through_serde() {
        let spec: FieldSpec = serde_json::from_value(json!({"type": "integer"})).unwrap();
        assert_eq!(spec.field_type, FieldType::Integer);

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value, json!({"type": "integer"}));
    }

    #[test]
    fn test_unknown_field_type_is_preserved() {
        let spec: FieldSpec = serde_json::from_value(json!({"type": "uuid"})).unwrap();
        assert_eq!(spec.field_type, FieldType::Other("uuid".to_string()));
        assert!(!spec.field_type.is_known());
    }

    #[test]
    fn test_field_spec_keywords_use_schema_spelling() {
        let spec = FieldSpec::string()
            .with_const("x")
            .with_enum(["x", "y"]);
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value,
            json!({"type": "string", "const": "x", "enum": ["x", "y"]})
        );
    }

    #[test]
    fn test_nested_object_property_lookup() {
        let spec = FieldSpec::object().with_property("port", FieldSpec::integer());
        assert_eq!(
            spec.property("port").map(|p| &p.field_type),
            Some(&FieldType::Integer)
        );
        assert!(spec.property("host").is_none());
    }

    #[test]
    fn test_schema_model_to_value_is_reparseable() {
        let model = SchemaModel::new()
            .with_field("a", FieldSpec::boolean().with_default(true))
            .with_required("a");
        let reparsed = SchemaModel::from_value(&model.to_value()).unwrap();
        assert_eq!(reparsed, model);
    }
}
