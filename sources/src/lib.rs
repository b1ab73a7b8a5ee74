//! Configuration sources for schema-driven entry points.
//!
//! Each source turns one kind of input into a
//! [`PartialConfig`](schema_entry_core::PartialConfig):
//!
//! - [`resolve_defaults`] reads `default` / `const` values from the schema
//! - [`ConfigFileReader`] reads JSON and YAML files (or custom formats)
//! - [`resolve_env`] reads `{PREFIX}_{FIELD}` environment variables
//!
//! The command-line source lives with the command tree, since its flags are
//! compiled from the tree's nodes.
//!
//! External state is reached only through the [`Environment`] and
//! [`FileSystem`] traits, so resolution can run against fixtures.

mod defaults;
mod env;
mod error;
mod files;

pub use defaults::resolve_defaults;
pub use env::{Environment, MapEnv, ProcessEnv, default_env_prefix, env_var_name, resolve_env};
pub use error::{Result, SourceError};
pub use files::{
    ConfigFileParser, ConfigFileReader, ConfigFormat, FileSystem, OsFileSystem, ParserMap,
};
