//! Node configuration records.
//!
//! An [`EntryPoint`] describes one command: its name, help texts, schema,
//! where its configuration comes from and what runs once it is resolved.
//! Nodes are plain values built with chained setters and then registered
//! into an [`EntryTree`](crate::EntryTree).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use schema_entry_core::{PartialConfig, ResolvedConfig, SchemaModel};
use schema_entry_sources::ParserMap;
use serde_json::Value;

use crate::cmdline::CommandLineParser;
use crate::error::{HandlerError, WiringError};

/// Value returned by a handler.
pub type HandlerResult = Result<Value, HandlerError>;

/// Work run on a leaf once its configuration is resolved and validated.
pub type Handler = Arc<dyn Fn(&ResolvedConfig) -> HandlerResult + Send + Sync>;

/// Configuration record for one command node.
///
/// # Examples
///
/// ```
/// use schema_entry::EntryPoint;
/// use schema_entry_core::{FieldSpec, SchemaModel};
/// use serde_json::json;
///
/// let serve = EntryPoint::new("serve")
///     .description("Run the server")
///     .schema(
///         SchemaModel::new()
///             .with_field("port", FieldSpec::integer().with_default(8080))
///             .with_required("port"),
///     )
///     .default_config_file_paths(["/etc/app/serve.yml", "./serve.json"])
///     .handler(|config| Ok(json!(config["port"])));
///
/// assert_eq!(serve.name(), "serve");
/// assert!(serve.has_handler());
/// ```
#[derive(Clone)]
pub struct EntryPoint {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) epilog: Option<String>,
    pub(crate) usage: Option<String>,
    pub(crate) schema: Option<SchemaModel>,
    pub(crate) verify_schema: bool,
    pub(crate) default_config_file_paths: Vec<PathBuf>,
    pub(crate) load_all_config_file: bool,
    pub(crate) config_file_only_get_need: bool,
    pub(crate) config_file_parsers: ParserMap,
    pub(crate) env_prefix: Option<String>,
    pub(crate) parse_env: bool,
    pub(crate) argparse_check_required: bool,
    pub(crate) argparse_noflag: Option<String>,
    pub(crate) handler: Option<Handler>,
    pub(crate) command_line: Option<Arc<dyn CommandLineParser>>,
}

impl EntryPoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            epilog: None,
            usage: None,
            schema: None,
            verify_schema: true,
            default_config_file_paths: Vec::new(),
            load_all_config_file: false,
            config_file_only_get_need: true,
            config_file_parsers: ParserMap::new(),
            env_prefix: None,
            parse_env: true,
            argparse_check_required: false,
            argparse_noflag: None,
            handler: None,
            command_line: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Text shown after the flag list in help output.
    pub fn epilog(mut self, epilog: impl Into<String>) -> Self {
        self.epilog = Some(epilog.into());
        self
    }

    /// Overrides the generated usage line.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn schema(mut self, schema: SchemaModel) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Attaches a schema given in JSON Schema form.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::InvalidSchema`] with every meta-schema violation.
    pub fn schema_value(self, schema: &Value) -> Result<Self, WiringError> {
        let model = SchemaModel::from_value(schema).map_err(|errors| WiringError::InvalidSchema {
            node: self.name.clone(),
            errors,
        })?;
        Ok(self.schema(model))
    }

    /// Whether the merged configuration is checked against the schema.
    pub fn verify_schema(mut self, verify: bool) -> Self {
        self.verify_schema = verify;
        self
    }

    /// Candidate configuration files, in priority order.
    pub fn default_config_file_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.default_config_file_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Reads every existing candidate instead of only the first.
    pub fn load_all_config_file(mut self, load_all: bool) -> Self {
        self.load_all_config_file = load_all;
        self
    }

    /// Keeps only schema-declared keys from configuration files.
    pub fn config_file_only_get_need(mut self, only_need: bool) -> Self {
        self.config_file_only_get_need = only_need;
        self
    }

    /// Registers a parser for configuration files named `file_name`.
    pub fn config_file_parser<F>(mut self, file_name: impl Into<String>, parser: F) -> Self
    where
        F: Fn(&Path, &str) -> Result<PartialConfig, String> + Send + Sync + 'static,
    {
        self.config_file_parsers.insert(file_name, parser);
        self
    }

    /// Overrides the environment variable prefix derived from the command path.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    pub fn parse_env(mut self, parse_env: bool) -> Self {
        self.parse_env = parse_env;
        self
    }

    /// Makes schema-required fields required at the flag level.
    pub fn argparse_check_required(mut self, check: bool) -> Self {
        self.argparse_check_required = check;
        self
    }

    /// Binds `field` to a positional argument instead of a flag.
    pub fn argparse_noflag(mut self, field: impl Into<String>) -> Self {
        self.argparse_noflag = Some(field.into());
        self
    }

    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ResolvedConfig) -> HandlerResult + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Replaces the schema-compiled flag parser.
    pub fn command_line(mut self, parser: impl CommandLineParser + 'static) -> Self {
        self.command_line = Some(Arc::new(parser));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn get_epilog(&self) -> Option<&str> {
        self.epilog.as_deref()
    }

    pub fn get_schema(&self) -> Option<&SchemaModel> {
        self.schema.as_ref()
    }

    pub fn get_noflag(&self) -> Option<&str> {
        self.argparse_noflag.as_deref()
    }

    pub fn checks_required(&self) -> bool {
        self.argparse_check_required
    }

    pub fn config_file_paths(&self) -> &[PathBuf] {
        &self.default_config_file_paths
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .field("default_config_file_paths", &self.default_config_file_paths)
            .field("load_all_config_file", &self.load_all_config_file)
            .field("config_file_only_get_need", &self.config_file_only_get_need)
            .field("config_file_parsers", &self.config_file_parsers)
            .field("env_prefix", &self.env_prefix)
            .field("parse_env", &self.parse_env)
            .field("argparse_check_required", &self.argparse_check_required)
            .field("argparse_noflag", &self.argparse_noflag)
            .field("handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}
