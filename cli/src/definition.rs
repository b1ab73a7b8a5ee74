//! Declarative command tree files.
//!
//! A tree file is a JSON or YAML document describing the root node; each node
//! may list `children` of the same shape:
//!
//! ```yaml
//! name: app
//! description: Example application
//! children:
//!   - name: serve
//!     schema:
//!       type: object
//!       properties:
//!         port: { type: integer, default: 8080 }
//!     default_config_file_paths: [./serve.yml]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use schema_entry::{EntryPoint, EntryTree, NodeId, WiringError};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while loading a tree file.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid tree definition in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unsupported tree file {} (expected .json, .yml or .yaml)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error(transparent)]
    Wiring(#[from] WiringError),
}

/// One node of a tree file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub epilog: Option<String>,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub env_prefix: Option<String>,
    #[serde(default)]
    pub default_config_file_paths: Vec<PathBuf>,
    #[serde(default)]
    pub load_all_config_file: bool,
    #[serde(default = "enabled")]
    pub config_file_only_get_need: bool,
    #[serde(default)]
    pub argparse_noflag: Option<String>,
    #[serde(default)]
    pub argparse_check_required: bool,
    #[serde(default = "enabled")]
    pub verify_schema: bool,
    #[serde(default = "enabled")]
    pub parse_env: bool,
    #[serde(default)]
    pub children: Vec<NodeDefinition>,
}

fn enabled() -> bool {
    true
}

impl NodeDefinition {
    /// Reads a tree file, choosing the format by extension.
    pub fn load(path: &Path) -> Result<Self, DefinitionError> {
        let contents = fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_error = |message: String| DefinitionError::Parse {
            path: path.to_path_buf(),
            message,
        };
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string())),
            Some("yml") | Some("yaml") => {
                serde_yaml::from_str(&contents).map_err(|e| parse_error(e.to_string()))
            }
            _ => Err(DefinitionError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Builds the tree. Every leaf answers with its resolved configuration.
    pub fn into_tree(self) -> Result<EntryTree, DefinitionError> {
        let children = self.children.clone();
        let mut tree = EntryTree::new(self.entry_point()?)?;
        let root = tree.root();
        for child in children {
            child.register(&mut tree, root)?;
        }
        Ok(tree)
    }

    fn register(self, tree: &mut EntryTree, parent: NodeId) -> Result<(), DefinitionError> {
        let children = self.children.clone();
        let id = tree.register(parent, self.entry_point()?)?;
        for child in children {
            child.register(tree, id)?;
        }
        Ok(())
    }

    fn entry_point(&self) -> Result<EntryPoint, DefinitionError> {
        let mut entry = EntryPoint::new(self.name.clone())
            .default_config_file_paths(self.default_config_file_paths.clone())
            .load_all_config_file(self.load_all_config_file)
            .config_file_only_get_need(self.config_file_only_get_need)
            .argparse_check_required(self.argparse_check_required)
            .verify_schema(self.verify_schema)
            .parse_env(self.parse_env);
        if let Some(schema) = &self.schema {
            entry = entry.schema_value(schema)?;
        }
        if let Some(description) = &self.description {
            entry = entry.description(description.clone());
        }
        if let Some(epilog) = &self.epilog {
            entry = entry.epilog(epilog.clone());
        }
        if let Some(usage) = &self.usage {
            entry = entry.usage(usage.clone());
        }
        if let Some(prefix) = &self.env_prefix {
            entry = entry.env_prefix(prefix.clone());
        }
        if let Some(field) = &self.argparse_noflag {
            entry = entry.argparse_noflag(field.clone());
        }
        if self.children.is_empty() {
            entry = entry.handler(|config| Ok(config.to_value()));
        }
        Ok(entry)
    }
}
