//! Validation of merged configuration against a schema.
//!
//! After all sources are merged, the configuration is checked against the
//! schema rendered as draft-07 JSON Schema ([`SchemaModel::to_value`]) and
//! compiled by [`jsonschema`]. Every reported error becomes a
//! [`ConfigViolation`]. Fields the schema does not declare are accepted, and
//! `format` stays an annotation.
//!
//! # Examples
//!
//! ```
//! use schema_entry_core::*;
//! use serde_json::json;
//!
//! let schema = SchemaModel::new()
//!     .with_field("level", FieldSpec::string().with_enum(["debug", "info"]))
//!     .with_required("level");
//!
//! let ok = json!({"level": "info"}).as_object().unwrap().clone();
//! assert!(validate_config(&ok, Some(&schema)).is_empty());
//!
//! let bad = json!({"level": "trace"}).as_object().unwrap().clone();
//! let violations = validate_config(&bad, Some(&schema));
//! assert!(matches!(&violations[0], ConfigViolation::Invalid { path, .. } if path == "level"));
//! ```

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema, ValidationError};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::protocol::SchemaError;
use crate::types::SchemaModel;

/// A merged configuration value that breaks its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigViolation {
    /// A required field is absent. Nested fields use dotted paths.
    #[error("missing required field `{0}`")]
    MissingRequired(String),
    /// A present value breaks a constraint of its field.
    #[error("`{path}`: {message}")]
    Invalid { path: String, message: String },
    /// The schema could not be compiled into a validator.
    #[error("schema cannot be used for validation: {0}")]
    UnusableSchema(String),
}

/// A schema compiled for repeated validation.
pub struct ConfigValidator {
    compiled: JSONSchema,
}

impl ConfigValidator {
    /// Compiles `schema` as a draft-07 validator.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] if the rendered schema does not
    /// compile, which only happens for models that skipped meta-validation.
    pub fn new(schema: &SchemaModel) -> Result<Self, SchemaError> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .should_validate_formats(false)
            .compile(&schema.to_value())
            .map_err(|err| SchemaError::Invalid {
                path: "schema".to_string(),
                message: err.to_string(),
            })?;
        Ok(Self { compiled })
    }

    /// Returns every violation; an empty vector means `config` is valid.
    pub fn validate(&self, config: &Map<String, Value>) -> Vec<ConfigViolation> {
        let instance = Value::Object(config.clone());
        match self.compiled.validate(&instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.map(|err| violation(&err)).collect(),
        }
    }
}

impl std::fmt::Debug for ConfigValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigValidator").finish_non_exhaustive()
    }
}

/// Validates `config` against `schema`.
///
/// A missing schema accepts any configuration (with a warning). Returns all
/// violations; an empty vector means the configuration is valid.
pub fn validate_config(
    config: &Map<String, Value>,
    schema: Option<&SchemaModel>,
) -> Vec<ConfigViolation> {
    let Some(schema) = schema else {
        warn!("no schema attached, configuration accepted without validation");
        return Vec::new();
    };
    match ConfigValidator::new(schema) {
        Ok(validator) => validator.validate(config),
        Err(err) => vec![ConfigViolation::UnusableSchema(err.to_string())],
    }
}

fn violation(err: &ValidationError<'_>) -> ConfigViolation {
    let path = dotted_path(&err.instance_path.to_string());
    match &err.kind {
        ValidationErrorKind::Required { property } => {
            let name = property
                .as_str()
                .map_or_else(|| property.to_string(), str::to_string);
            if path.is_empty() {
                ConfigViolation::MissingRequired(name)
            } else {
                ConfigViolation::MissingRequired(format!("{path}.{name}"))
            }
        }
        _ => ConfigViolation::Invalid {
            path: if path.is_empty() { "$".to_string() } else { path },
            message: err.to_string(),
        },
    }
}

/// Renders a JSON pointer as `a.b[1].c`.
fn dotted_path(pointer: &str) -> String {
    let mut path = String::new();
    for segment in pointer.split('/').skip(1) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            path.push('[');
            path.push_str(&segment);
            path.push(']');
        } else {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(&segment);
        }
    }
    path
}
