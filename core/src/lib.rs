//! Core schema, coercion, merging and validation primitives for schema-driven
//! command entry points.
//!
//! This crate defines the pieces of configuration resolution that do not touch
//! the outside world:
//!
//! - [`SchemaModel`] / [`FieldSpec`]: declarative description of the fields a
//!   command accepts (type, default, const, enum, bounds, nested specs).
//! - [`validate_schema_value`] / [`validate_model`]: the meta-schema check run
//!   when a schema is registered.
//! - [`coerce`]: raw string to typed [`serde_json::Value`] conversion used for
//!   environment variables and command-line values.
//! - [`ConfigMerger`]: precedence-ordered merging of the partial
//!   configurations produced by each [`SourceTier`].
//! - [`validate_config`]: checks the merged configuration against the schema.
//! - [`ResolvedConfig`]: the read-only snapshot handed to handlers.
//!
//! # Example
//!
//! ```
//! use schema_entry_core::*;
//! use serde_json::json;
//!
//! let schema = SchemaModel::from_value(&json!({
//!     "type": "object",
//!     "properties": {
//!         "port": { "type": "integer", "default": 8080 },
//!         "tags": { "type": "array", "items": { "type": "string" } }
//!     },
//!     "required": ["port"]
//! }))
//! .unwrap();
//!
//! let env_tags = coerce(schema.field("tags").unwrap(), "a,b").unwrap();
//!
//! let mut merger = ConfigMerger::new();
//! merger.push(SourceTier::Defaults, json!({"port": 8080}).as_object().unwrap().clone());
//! merger.push(SourceTier::Environment, [("tags".to_string(), env_tags)].into_iter().collect());
//! let merged = merger.merge();
//!
//! assert!(validate_config(&merged, Some(&schema)).is_empty());
//! let config = ResolvedConfig::from(merged);
//! assert_eq!(config["tags"], json!(["a", "b"]));
//! ```

mod coerce;
mod config;
mod merge;
mod protocol;
mod types;
mod validate;

pub use coerce::{ARRAY_SEPARATOR, KEY_VALUE_SEPARATOR, PAIR_SEPARATOR, TypeError, coerce};
pub use config::ResolvedConfig;
pub use merge::{ConfigMerger, PartialConfig, SourceTier, merge_partials};
pub use protocol::{RESERVED_SHORT_FLAGS, SchemaError, validate_model, validate_schema_value};
pub use types::*;
pub use validate::{ConfigValidator, ConfigViolation, validate_config};
