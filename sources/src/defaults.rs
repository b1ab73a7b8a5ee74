//! Schema defaults source.

use schema_entry_core::{PartialConfig, SchemaModel};

/// Collects each field's `default`, falling back to its `const`.
///
/// Fields with neither are omitted. With no schema the result is empty.
pub fn resolve_defaults(schema: Option<&SchemaModel>) -> PartialConfig {
    let Some(schema) = schema else {
        return PartialConfig::new();
    };
    schema
        .properties
        .iter()
        .filter_map(|(name, spec)| {
            spec.default
                .as_ref()
                .or(spec.const_value.as_ref())
                .map(|value| (name.clone(), value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use schema_entry_core::FieldSpec;
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn test_defaults_and_consts() {
        let schema = SchemaModel::new()
            .with_field("a", FieldSpec::number().with_default(33.3))
            .with_field("b", FieldSpec::string().with_const("fixed"))
            .with_field("c", FieldSpec::boolean())
            .with_field("d", FieldSpec::integer().with_default(1).with_const(2));
        assert_eq!(
            Value::Object(resolve_defaults(Some(&schema))),
            json!({"a": 33.3, "b": "fixed", "d": 1})
        );
    }

    #[test]
    fn test_no_schema_has_no_defaults() {
        assert!(resolve_defaults(None).is_empty());
    }
}
