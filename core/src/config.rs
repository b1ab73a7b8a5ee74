//! The resolved configuration handed to handlers.

use std::ops::Index;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Read-only snapshot of a validated configuration.
///
/// Produced fresh for every invocation; nothing mutates it after validation.
///
/// # Examples
///
/// ```
/// use schema_entry_core::ResolvedConfig;
/// use serde::Deserialize;
/// use serde_json::json;
///
/// let config = ResolvedConfig::from(json!({"host": "localhost", "port": 8080}).as_object().unwrap().clone());
/// assert_eq!(config.get("port"), Some(&json!(8080)));
///
/// #[derive(Deserialize)]
/// struct Server {
///     host: String,
///     port: u16,
/// }
/// let server: Server = config.deserialize().unwrap();
/// assert_eq!(server.host, "localhost");
/// assert_eq!(server.port, 8080);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedConfig {
    values: Map<String, Value>,
}

impl ResolvedConfig {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates fields in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }

    /// Returns the configuration as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Deserializes the configuration into a typed struct.
    ///
    /// # Errors
    ///
    /// Returns the [`serde_json::Error`] raised by `T`'s deserializer.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.to_value())
    }
}

impl From<Map<String, Value>> for ResolvedConfig {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl Index<&str> for ResolvedConfig {
    type Output = Value;

    /// Returns `Value::Null` for absent fields, like indexing a JSON object.
    fn index(&self, field: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(field).unwrap_or(&NULL)
    }
}
