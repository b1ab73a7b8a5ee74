//! Leaf resolution: sources, merge, validation.

use schema_entry_core::{ConfigMerger, ResolvedConfig, SourceTier, validate_config};
use schema_entry_sources::{
    ConfigFileReader, Environment, FileSystem, default_env_prefix, resolve_defaults, resolve_env,
};
use tracing::debug;

use crate::cmdline::{CommandLineParser, SchemaCommandLine};
use crate::error::EntryError;
use crate::node::EntryPoint;

/// Resolves the configuration of leaf `entry` (command path `prog`).
///
/// Every call rebuilds the configuration from the four sources:
///
/// 1. schema defaults (absent presence flags default to `false`)
/// 2. the first usable candidate file (or all of them), then the `-c` file
/// 3. `{PREFIX}_{FIELD}` environment variables
/// 4. command-line flags
///
/// # Errors
///
/// Fails on rejected flags, unreadable or malformed configuration files, and
/// (with `verify_schema`) on schema violations of the merged result.
pub(crate) fn resolve_leaf(
    entry: &EntryPoint,
    prog: &str,
    argv: &[String],
    env: &dyn Environment,
    fs: &dyn FileSystem,
) -> Result<ResolvedConfig, EntryError> {
    let schema = entry.schema.as_ref();

    let (command_line, flag_defaults) = match &entry.command_line {
        Some(parser) => (parser.parse(entry, prog, argv)?, Default::default()),
        None => (
            SchemaCommandLine.parse(entry, prog, argv)?,
            SchemaCommandLine::flag_defaults(entry),
        ),
    };

    let reader = ConfigFileReader::new(fs, &entry.config_file_parsers)
        .with_schema(schema, entry.config_file_only_get_need);
    let files =
        reader.read_candidates(&entry.default_config_file_paths, entry.load_all_config_file)?;
    let adhoc = match &command_line.config_file {
        Some(path) => reader.read_file(path)?.unwrap_or_default(),
        None => Default::default(),
    };

    let environment = match schema {
        Some(schema) if entry.parse_env => {
            let prefix = entry
                .env_prefix
                .clone()
                .unwrap_or_else(|| default_env_prefix(prog));
            resolve_env(schema, &prefix, env)
        }
        _ => Default::default(),
    };

    let merged = ConfigMerger::new()
        .with(SourceTier::Defaults, flag_defaults)
        .with(SourceTier::Defaults, resolve_defaults(schema))
        .with(SourceTier::ConfigFile, files)
        .with(SourceTier::ConfigFile, adhoc)
        .with(SourceTier::Environment, environment)
        .with(SourceTier::CommandLine, command_line.values)
        .merge();

    if entry.verify_schema {
        let violations = validate_config(&merged, schema);
        if !violations.is_empty() {
            return Err(EntryError::Validation {
                prog: prog.to_string(),
                violations,
            });
        }
    }

    debug!(prog, fields = merged.len(), "resolved configuration");
    Ok(ResolvedConfig::from(merged))
}
