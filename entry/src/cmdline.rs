//! Command-line source.
//!
//! A leaf's schema compiles into a [`clap::Command`]:
//!
//! - every field becomes `--field-name` (underscores turned into hyphens),
//!   plus `-x` when its `title` is the single character `x`
//! - `boolean` fields are presence flags
//! - `array` fields are repeatable and accumulate occurrences
//! - `string` fields with an `enum` accept only the listed values
//! - `const` fields get no flag at all
//! - the field named by `argparse_noflag` becomes the positional argument
//! - `-c/--config <PATH>` names an extra configuration file
//!
//! Raw values are decoded with [`coerce`] while clap parses, so a value that
//! does not fit its field is reported like any other flag error.

use std::path::PathBuf;

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{Arg, ArgAction, ArgMatches, Command};
use schema_entry_core::{FieldSpec, FieldType, PartialConfig, coerce};
use serde_json::Value;

use crate::error::EntryError;
use crate::node::EntryPoint;

/// Argument id of the `-c/--config` flag.
pub const CONFIG_ARG: &str = "config";

/// Long flags a field may not take.
pub const RESERVED_LONG_FLAGS: [&str; 2] = ["config", "help"];

/// What the command line contributed to one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandLineArgs {
    /// File named by `-c/--config`.
    pub config_file: Option<PathBuf>,
    /// Field values given on the command line.
    pub values: PartialConfig,
}

/// Turns a leaf's remaining arguments into a partial configuration.
///
/// [`SchemaCommandLine`] is used unless a node supplies its own parser.
pub trait CommandLineParser: Send + Sync {
    /// Parses `argv` for `entry`, whose full command path is `prog`.
    ///
    /// # Errors
    ///
    /// Returns [`EntryError::CommandLine`] for rejected input, including
    /// explicit help requests.
    fn parse(&self, entry: &EntryPoint, prog: &str, argv: &[String])
    -> Result<CommandLineArgs, EntryError>;
}

/// The schema-compiled flag parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaCommandLine;

impl SchemaCommandLine {
    /// Builds the clap command for `entry`.
    pub fn command(entry: &EntryPoint, prog: &str) -> Command {
        let usage = entry
            .usage
            .clone()
            .unwrap_or_else(|| format!("{prog} [options]"));
        let mut command = Command::new(prog.to_string())
            .no_binary_name(true)
            .override_usage(usage)
            .arg(
                Arg::new(CONFIG_ARG)
                    .short('c')
                    .long("config")
                    .value_name("PATH")
                    .value_parser(clap::value_parser!(PathBuf))
                    .help("Additional configuration file (.json, .yml, .yaml)"),
            );
        if let Some(description) = &entry.description {
            command = command.about(description.clone());
        }
        if let Some(epilog) = &entry.epilog {
            command = command.after_help(epilog.clone());
        }

        let Some(schema) = &entry.schema else {
            return command;
        };
        for (name, spec) in &schema.properties {
            if spec.const_value.is_some() {
                continue;
            }
            let positional = entry.argparse_noflag.as_deref() == Some(name.as_str());
            let required = entry.argparse_check_required && schema.is_required(name);
            command = command.arg(field_arg(name, spec, positional, required));
        }
        command
    }

    /// Values implied by absent presence flags.
    ///
    /// A non-positional `boolean` field with neither `default` nor `const` is
    /// `false` unless some source sets it.
    pub fn flag_defaults(entry: &EntryPoint) -> PartialConfig {
        let Some(schema) = &entry.schema else {
            return PartialConfig::new();
        };
        schema
            .properties
            .iter()
            .filter(|(name, spec)| {
                spec.field_type == FieldType::Boolean
                    && spec.default.is_none()
                    && spec.const_value.is_none()
                    && entry.argparse_noflag.as_deref() != Some(name.as_str())
            })
            .map(|(name, _)| (name.clone(), Value::Bool(false)))
            .collect()
    }

    /// Collects field values from parsed matches.
    ///
    /// An absent boolean flag contributes `false` when the field is required
    /// by the schema and nothing otherwise.
    pub fn values(entry: &EntryPoint, matches: &ArgMatches) -> PartialConfig {
        let mut values = PartialConfig::new();
        let Some(schema) = &entry.schema else {
            return values;
        };
        for (name, spec) in &schema.properties {
            if spec.const_value.is_some() {
                continue;
            }
            let positional = entry.argparse_noflag.as_deref() == Some(name.as_str());
            let value = match spec.field_type {
                FieldType::Boolean if !positional => {
                    if matches.get_flag(name) {
                        Some(Value::Bool(true))
                    } else if schema.is_required(name) {
                        Some(Value::Bool(false))
                    } else {
                        None
                    }
                }
                FieldType::Array => matches
                    .get_many::<Value>(name)
                    .map(|items| Value::Array(items.cloned().collect())),
                _ => matches.get_one::<Value>(name).cloned(),
            };
            if let Some(value) = value {
                values.insert(name.clone(), value);
            }
        }
        values
    }
}

impl CommandLineParser for SchemaCommandLine {
    fn parse(
        &self,
        entry: &EntryPoint,
        prog: &str,
        argv: &[String],
    ) -> Result<CommandLineArgs, EntryError> {
        let matches = Self::command(entry, prog).try_get_matches_from(argv)?;
        Ok(CommandLineArgs {
            config_file: matches.get_one::<PathBuf>(CONFIG_ARG).cloned(),
            values: Self::values(entry, &matches),
        })
    }
}

/// Long flag spelling of a field name.
pub fn long_flag(field: &str) -> String {
    field.replace('_', "-")
}

fn field_arg(name: &str, spec: &FieldSpec, positional: bool, required: bool) -> Arg {
    let mut arg = Arg::new(name.to_string()).required(required);
    if positional {
        arg = arg.value_name(name.to_uppercase());
    } else {
        arg = arg.long(long_flag(name));
        if let Some(short) = spec.short_flag() {
            arg = arg.short(short);
        }
    }
    if let Some(description) = &spec.description {
        arg = arg.help(description.clone());
    }

    match spec.field_type {
        // Presence flags are never required; absence already means `false`.
        FieldType::Boolean if !positional => arg.required(false).action(ArgAction::SetTrue),
        FieldType::Array => {
            let items = spec.items.as_deref().cloned().unwrap_or_else(FieldSpec::string);
            let arg = arg.action(ArgAction::Append);
            let arg = match string_choices(&items) {
                Some(choices) => arg.value_parser(PossibleValuesParser::new(choices).map(Value::String)),
                None => arg.value_parser(move |raw: &str| coerce(&items, raw)),
            };
            if positional { arg.num_args(1..) } else { arg }
        }
        _ => {
            let arg = arg.action(ArgAction::Set);
            match string_choices(spec) {
                Some(choices) => arg.value_parser(PossibleValuesParser::new(choices).map(Value::String)),
                None => {
                    let spec = spec.clone();
                    arg.value_parser(move |raw: &str| coerce(&spec, raw))
                }
            }
        }
    }
}

/// Enum members of a string field, when all of them are strings.
fn string_choices(spec: &FieldSpec) -> Option<Vec<String>> {
    if spec.field_type != FieldType::String {
        return None;
    }
    spec.enum_values
        .as_ref()?
        .iter()
        .map(|member| member.as_str().map(str::to_string))
        .collect()
}
