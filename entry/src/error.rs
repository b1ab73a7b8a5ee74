//! Error types for wiring and invoking command trees.
//!
//! [`WiringError`] is raised while the tree is being built and always signals
//! a programming error. [`EntryError`] is raised per invocation; each variant
//! maps to a distinct process status through [`EntryError::exit_code`].

use std::process::ExitCode;

use schema_entry_core::{ConfigViolation, SchemaError};
use schema_entry_sources::SourceError;
use thiserror::Error;

use crate::tree::NodeId;

/// Boxed error returned by handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while registering nodes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WiringError {
    /// The node's schema failed meta-schema validation.
    #[error("invalid schema for `{node}`: {}", join(errors))]
    InvalidSchema {
        node: String,
        errors: Vec<SchemaError>,
    },

    /// A node name is empty or contains whitespace.
    #[error("invalid command name `{0}`")]
    InvalidName(String),

    /// A parent already has a child with this name.
    #[error("`{parent}` already has a subcommand named `{name}`")]
    DuplicateChild { parent: String, name: String },

    /// The node id does not belong to this tree.
    #[error("no node with id {0}")]
    UnknownNode(NodeId),

    /// A field's flag collides with `--config` or `--help`.
    #[error("field `{field}` of `{node}` collides with the reserved --{field} flag")]
    ReservedFlag { node: String, field: String },

    /// Two fields of one node share a short flag.
    #[error("fields `{first}` and `{second}` of `{node}` both use -{flag}")]
    DuplicateShortFlag {
        node: String,
        flag: char,
        first: String,
        second: String,
    },

    /// The positional field is not declared by the schema.
    #[error("positional field `{field}` is not declared by the schema of `{node}`")]
    UnknownPositional { node: String, field: String },
}

/// Errors raised while resolving and dispatching one invocation.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error(transparent)]
    Wiring(#[from] WiringError),

    /// A routing node received a token that names none of its children.
    #[error("unknown subcommand `{token}` for `{prog}`")]
    UnknownSubcommand {
        prog: String,
        token: String,
        help: String,
    },

    /// A routing node received no token at all.
    #[error("`{prog}` requires a subcommand")]
    MissingSubcommand { prog: String, help: String },

    /// The selected leaf has no handler.
    #[error("no handler registered for `{0}`")]
    NoHandlerRegistered(String),

    /// Flag parsing failed, or help was requested.
    #[error(transparent)]
    CommandLine(#[from] clap::Error),

    /// A configuration file could not be read or parsed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The merged configuration breaks the schema.
    #[error("invalid configuration for `{prog}`: {}", join(violations))]
    Validation {
        prog: String,
        violations: Vec<ConfigViolation>,
    },

    /// The handler ran and failed.
    #[error("handler failed: {0}")]
    Handler(HandlerError),
}

impl EntryError {
    /// Process status for this failure.
    ///
    /// | Failure                          | Status |
    /// |----------------------------------|--------|
    /// | handler failed                   | 1      |
    /// | unknown or missing subcommand    | 2      |
    /// | no handler registered            | 3      |
    /// | validation failed                | 4      |
    /// | configuration source unreadable  | 5      |
    /// | wiring error                     | 6      |
    /// | flag parsing / help              | clap's |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Handler(_) => 1,
            Self::UnknownSubcommand { .. } | Self::MissingSubcommand { .. } => 2,
            Self::NoHandlerRegistered(_) => 3,
            Self::Validation { .. } => 4,
            Self::Source(_) => 5,
            Self::Wiring(_) => 6,
            Self::CommandLine(err) => err.exit_code(),
        }
    }

    /// Rendered help of the routing node, for routing failures.
    pub fn help(&self) -> Option<&str> {
        match self {
            Self::UnknownSubcommand { help, .. } | Self::MissingSubcommand { help, .. } => {
                Some(help)
            }
            _ => None,
        }
    }

    /// Prints the failure to stderr and returns the matching process status.
    ///
    /// Flag errors and help requests are rendered by clap; routing failures
    /// are followed by the routing node's help.
    pub fn report(&self) -> ExitCode {
        match self {
            Self::CommandLine(err) => {
                let _ = err.print();
            }
            other => {
                eprintln!("error: {other}");
                if let Some(help) = other.help() {
                    eprintln!();
                    eprintln!("{help}");
                }
            }
        }
        ExitCode::from(u8::try_from(self.exit_code()).unwrap_or(1))
    }

    /// Returns `true` for routing failures (the walk never reached a leaf).
    pub fn is_routing(&self) -> bool {
        matches!(
            self,
            Self::UnknownSubcommand { .. } | Self::MissingSubcommand { .. }
        )
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            EntryError::Handler("boom".into()),
            EntryError::UnknownSubcommand {
                prog: "app".into(),
                token: "nope".into(),
                help: String::new(),
            },
            EntryError::NoHandlerRegistered("app".into()),
            EntryError::Validation {
                prog: "app".into(),
                violations: vec![ConfigViolation::MissingRequired("a".into())],
            },
            EntryError::Wiring(WiringError::InvalidName(String::new())),
        ];
        let codes: Vec<i32> = errors.iter().map(EntryError::exit_code).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 6]);
    }

    #[test]
    fn test_validation_message_lists_every_violation() {
        let err = EntryError::Validation {
            prog: "app".into(),
            violations: vec![
                ConfigViolation::MissingRequired("a".into()),
                ConfigViolation::MissingRequired("b".into()),
            ],
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration for `app`: missing required field `a`; missing required field `b`"
        );
    }

    #[test]
    fn test_only_routing_errors_carry_help() {
        let err = EntryError::MissingSubcommand {
            prog: "app".into(),
            help: "Usage: app [subcmd]".into(),
        };
        assert!(err.is_routing());
        assert_eq!(err.help(), Some("Usage: app [subcmd]"));
        assert!(EntryError::NoHandlerRegistered("app".into()).help().is_none());
    }
}
