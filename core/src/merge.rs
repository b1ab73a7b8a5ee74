//! Precedence-ordered merging of partial configurations.
//!
//! Each source contributes a [`PartialConfig`]. The merged configuration is
//!
//! ```text
//! defaults ⊕ config_file ⊕ environment ⊕ command_line
//! ```
//!
//! where `⊕` is a right-biased, key-by-key union. The order is fixed by
//! [`SourceTier`]; the order in which layers are pushed only matters between
//! layers of the same tier.
//!
//! # Example
//!
//! ```
//! use schema_entry_core::{ConfigMerger, SourceTier};
//! use serde_json::json;
//!
//! let mut merger = ConfigMerger::new();
//! merger.push(SourceTier::CommandLine, json!({"a": 3}).as_object().unwrap().clone());
//! merger.push(SourceTier::Defaults, json!({"a": 1, "b": 1}).as_object().unwrap().clone());
//! merger.push(SourceTier::Environment, json!({"a": 2}).as_object().unwrap().clone());
//!
//! let merged = merger.merge();
//! assert_eq!(merged["a"], json!(3));
//! assert_eq!(merged["b"], json!(1));
//! ```

use std::fmt;

use serde_json::{Map, Value};

/// Partial mapping from field name to typed value produced by one source.
pub type PartialConfig = Map<String, Value>;

/// Configuration source priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceTier {
    /// Schema defaults (lowest priority).
    Defaults = 0,
    /// Configuration files, including the `-c/--config` file.
    ConfigFile = 1,
    /// Environment variables.
    Environment = 2,
    /// Command-line flags (highest priority).
    CommandLine = 3,
}

impl SourceTier {
    /// All tiers, lowest priority first.
    pub const ALL: [SourceTier; 4] = [
        SourceTier::Defaults,
        SourceTier::ConfigFile,
        SourceTier::Environment,
        SourceTier::CommandLine,
    ];
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTier::Defaults => write!(f, "defaults"),
            SourceTier::ConfigFile => write!(f, "config-file"),
            SourceTier::Environment => write!(f, "environment"),
            SourceTier::CommandLine => write!(f, "command-line"),
        }
    }
}

/// Collects partial configurations and folds them in precedence order.
#[derive(Debug, Clone, Default)]
pub struct ConfigMerger {
    layers: Vec<(SourceTier, PartialConfig)>,
}

impl ConfigMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer. Layers of the same tier apply in push order.
    pub fn push(&mut self, tier: SourceTier, partial: PartialConfig) {
        self.layers.push((tier, partial));
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, tier: SourceTier, partial: PartialConfig) -> Self {
        self.push(tier, partial);
        self
    }

    /// Folds all layers into one mapping, higher tiers overwriting lower ones.
    pub fn merge(mut self) -> PartialConfig {
        // Stable sort keeps push order within a tier.
        self.layers.sort_by_key(|(tier, _)| *tier);
        merge_partials(self.layers.into_iter().map(|(_, partial)| partial))
    }
}

/// Right-biased union of `partials`: later mappings overwrite earlier ones.
pub fn merge_partials(partials: impl IntoIterator<Item = PartialConfig>) -> PartialConfig {
    partials
        .into_iter()
        .fold(PartialConfig::new(), |mut merged, partial| {
            merged.extend(partial);
            merged
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn partial(value: Value) -> PartialConfig {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_command_line_wins_regardless_of_push_order() {
        let orders = [
            SourceTier::ALL,
            [
                SourceTier::CommandLine,
                SourceTier::Environment,
                SourceTier::ConfigFile,
                SourceTier::Defaults,
            ],
            [
                SourceTier::Environment,
                SourceTier::CommandLine,
                SourceTier::Defaults,
                SourceTier::ConfigFile,
            ],
        ];
        for order in orders {
            let mut merger = ConfigMerger::new();
            for tier in order {
                merger.push(tier, partial(json!({ "f": tier.to_string() })));
            }
            assert_eq!(merger.merge()["f"], json!("command-line"));
        }
    }

    #[test]
    fn test_config_file_beats_defaults_and_env_beats_file() {
        let merged = ConfigMerger::new()
            .with(SourceTier::Environment, partial(json!({"b": "env"})))
            .with(SourceTier::ConfigFile, partial(json!({"a": "file", "b": "file"})))
            .with(SourceTier::Defaults, partial(json!({"a": "default", "c": "default"})))
            .merge();
        assert_eq!(
            Value::Object(merged),
            json!({"a": "file", "b": "env", "c": "default"})
        );
    }

    #[test]
    fn test_same_tier_applies_in_push_order() {
        let merged = ConfigMerger::new()
            .with(SourceTier::ConfigFile, partial(json!({"a": 1})))
            .with(SourceTier::ConfigFile, partial(json!({"a": 2})))
            .merge();
        assert_eq!(merged["a"], json!(2));
    }

    #[test]
    fn test_merge_is_shallow() {
        let merged = merge_partials([
            partial(json!({"o": {"x": 1, "y": 1}})),
            partial(json!({"o": {"x": 2}})),
        ]);
        assert_eq!(merged["o"], json!({"x": 2}));
    }

    #[test]
    fn test_empty_merge() {
        assert!(ConfigMerger::new().merge().is_empty());
    }
}
