//! Environment variable source.
//!
//! Each schema field `f` is looked up as `{PREFIX}_{F}` (upper-cased). The
//! prefix is either configured explicitly or derived from the command path,
//! so the leaf `c` of `a b c` reads `A_B_C_<FIELD>`. Values are decoded with
//! [`coerce`] using the field's spec.
//!
//! # Examples
//!
//! ```
//! use schema_entry_core::{FieldSpec, SchemaModel};
//! use schema_entry_sources::{MapEnv, default_env_prefix, resolve_env};
//! use serde_json::json;
//!
//! let schema = SchemaModel::new().with_field("a_a", FieldSpec::number());
//! let env = MapEnv::from_iter([("TEST_A_A", "123.1")]);
//!
//! let prefix = default_env_prefix("test");
//! let partial = resolve_env(&schema, &prefix, &env);
//! assert_eq!(partial["a_a"], json!(123.1));
//! ```

use std::collections::BTreeMap;

use schema_entry_core::{PartialConfig, SchemaModel, coerce};
use tracing::{debug, warn};

/// Read access to environment variables.
///
/// Injected into resolution so tests can substitute a fixed environment.
pub trait Environment {
    /// Returns the variable's value, or `None` if it is unset or not UTF-8.
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A fixed, in-memory environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEnv {
    vars: BTreeMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variable, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Environment for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

impl<E: Environment + ?Sized> Environment for &E {
    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}

/// Derives the default prefix from a space-separated command path.
///
/// # Examples
///
/// ```
/// use schema_entry_sources::default_env_prefix;
///
/// assert_eq!(default_env_prefix("a b c"), "A_B_C");
/// ```
pub fn default_env_prefix(prog: &str) -> String {
    prog.replace(' ', "_").to_uppercase()
}

/// Builds the variable name for `field` under `prefix`.
///
/// Hyphens in the field name become underscores; the prefix is only
/// upper-cased.
///
/// # Examples
///
/// ```
/// use schema_entry_sources::env_var_name;
///
/// assert_eq!(env_var_name("app", "a_a"), "APP_A_A");
/// assert_eq!(env_var_name("my-app", "port"), "MY-APP_PORT");
/// ```
pub fn env_var_name(prefix: &str, field: &str) -> String {
    format!("{prefix}_{}", field.replace('-', "_")).to_uppercase()
}

/// Reads every schema field from `env`.
///
/// Unset and empty variables are omitted. A value that cannot be decoded as
/// the field's type is logged and omitted rather than aborting resolution.
pub fn resolve_env(schema: &SchemaModel, prefix: &str, env: &dyn Environment) -> PartialConfig {
    let mut partial = PartialConfig::new();
    for (field, spec) in &schema.properties {
        let key = env_var_name(prefix, field);
        let Some(raw) = env.var(&key).filter(|raw| !raw.is_empty()) else {
            continue;
        };
        match coerce(spec, &raw) {
            Ok(value) => {
                debug!(variable = %key, field = %field, "read field from environment");
                partial.insert(field.clone(), value);
            }
            Err(err) => {
                warn!(variable = %key, field = %field, error = %err, "ignoring undecodable environment value");
            }
        }
    }
    partial
}

#[cfg(test)]
mod tests {
    use schema_entry_core::FieldSpec;
    use serde_json::json;

    use super::*;

    fn schema() -> SchemaModel {
        SchemaModel::new()
            .with_field("a", FieldSpec::integer())
            .with_field("tags", FieldSpec::array(FieldSpec::string()))
            .with_field("flag", FieldSpec::boolean())
    }

    #[test]
    fn test_reads_prefixed_variables() {
        let env = MapEnv::new()
            .with("A_B_C_A", "2")
            .with("A_B_C_TAGS", "a,b,c")
            .with("A_B_C_FLAG", "True");
        let partial = resolve_env(&schema(), &default_env_prefix("a b c"), &env);
        assert_eq!(
            serde_json::Value::Object(partial),
            json!({"a": 2, "tags": ["a", "b", "c"], "flag": true})
        );
    }

    #[test]
    fn test_unset_and_empty_variables_are_omitted() {
        let env = MapEnv::new().with("APP_A", "");
        assert!(resolve_env(&schema(), "APP", &env).is_empty());
    }

    #[test]
    fn test_undecodable_value_is_omitted() {
        let env = MapEnv::new().with("APP_A", "two").with("APP_FLAG", "true");
        let partial = resolve_env(&schema(), "APP", &env);
        assert!(!partial.contains_key("a"));
        assert_eq!(partial["flag"], json!(true));
    }

    #[test]
    fn test_hyphenated_prefix_is_kept() {
        let env = MapEnv::new().with("MY-APP_A", "1").with("MY_APP_A", "2");
        let partial = resolve_env(&schema(), &default_env_prefix("my-app"), &env);
        assert_eq!(partial["a"], json!(1));
    }

    #[test]
    fn test_prefix_is_uppercased() {
        let env = MapEnv::new().with("APP_A", "7");
        let partial = resolve_env(&schema(), "app", &env);
        assert_eq!(partial["a"], json!(7));
    }
}
