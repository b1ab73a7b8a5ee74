//! The command tree and its dispatcher.
//!
//! Nodes live in an arena owned by [`EntryTree`] and refer to their parent by
//! [`NodeId`], so computing a command path is an iterative walk up the parent
//! indices. A node with children only routes; a node without children is a
//! leaf that resolves its configuration and runs its handler.
//!
//! # Example
//!
//! ```
//! use schema_entry::{EntryPoint, EntryTree};
//! use schema_entry_core::{FieldSpec, SchemaModel};
//! use schema_entry_sources::MapEnv;
//! use serde_json::json;
//!
//! let mut tree = EntryTree::new(EntryPoint::new("app"))
//!     .unwrap()
//!     .with_environment(MapEnv::new().with("APP_GREET_NAME", "env"));
//! let root = tree.root();
//! tree.register(
//!     root,
//!     EntryPoint::new("greet")
//!         .schema(SchemaModel::new().with_field("name", FieldSpec::string().with_default("world")))
//!         .handler(|config| Ok(json!(format!("hello {}", config["name"].as_str().unwrap_or(""))))),
//! )
//! .unwrap();
//!
//! let dispatch = tree.run(["greet", "--name", "flag"]).unwrap();
//! assert_eq!(dispatch.caller, "greet");
//! assert_eq!(dispatch.result, json!("hello flag"));
//!
//! let (_, config) = tree.resolve(["greet"]).unwrap();
//! assert_eq!(config["name"], json!("env"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::process::ExitCode;

use clap::{Arg, Command};
use schema_entry_core::{ResolvedConfig, SchemaModel};
use schema_entry_sources::{Environment, FileSystem, OsFileSystem, ProcessEnv};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cmdline::{RESERVED_LONG_FLAGS, long_flag};
use crate::error::{EntryError, WiringError};
use crate::node::{EntryPoint, HandlerResult};
use crate::pipeline::resolve_leaf;

/// Index of a node in an [`EntryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct CommandNode {
    entry: EntryPoint,
    parent: Option<NodeId>,
    children: BTreeMap<String, NodeId>,
}

/// Outcome of a successful invocation.
///
/// Serializes as `{"caller": ..., "result": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dispatch {
    /// Name of the leaf that ran.
    pub caller: String,
    /// The handler's return value.
    pub result: Value,
    /// The configuration the handler received.
    #[serde(skip)]
    pub config: ResolvedConfig,
}

/// A tree of command nodes plus the capabilities used to resolve them.
pub struct EntryTree {
    nodes: Vec<CommandNode>,
    env: Box<dyn Environment>,
    fs: Box<dyn FileSystem>,
}

impl EntryTree {
    /// Creates a tree whose root is `root`.
    ///
    /// The tree reads the process environment and the real filesystem unless
    /// replaced with [`with_environment`](Self::with_environment) and
    /// [`with_file_system`](Self::with_file_system).
    ///
    /// # Errors
    ///
    /// Returns a [`WiringError`] if `root` is not a valid node.
    pub fn new(root: EntryPoint) -> Result<Self, WiringError> {
        check_entry(&root)?;
        Ok(Self {
            nodes: vec![CommandNode {
                entry: root,
                parent: None,
                children: BTreeMap::new(),
            }],
            env: Box::new(ProcessEnv),
            fs: Box::new(OsFileSystem),
        })
    }

    pub fn with_environment(mut self, env: impl Environment + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    pub fn with_file_system(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Box::new(fs);
        self
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Registers `entry` as a child of `parent`.
    ///
    /// # Errors
    ///
    /// Fails if `parent` is unknown, a sibling already uses the name, or the
    /// node itself is invalid (bad name or schema, colliding flags).
    pub fn register(&mut self, parent: NodeId, entry: EntryPoint) -> Result<NodeId, WiringError> {
        let parent_node = self.get(parent)?;
        if parent_node.children.contains_key(&entry.name) {
            return Err(WiringError::DuplicateChild {
                parent: self.prog(parent),
                name: entry.name.clone(),
            });
        }
        check_entry(&entry)?;
        if parent_node.entry.handler.is_some() {
            warn!(
                node = %parent_node.entry.name,
                "node gains a subcommand and will route instead of running its handler"
            );
        }

        let id = NodeId(self.nodes.len());
        let name = entry.name.clone();
        self.nodes.push(CommandNode {
            entry,
            parent: Some(parent),
            children: BTreeMap::new(),
        });
        self.nodes[parent.0].children.insert(name, id);
        Ok(id)
    }

    /// Sets or replaces the handler of `node`.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::UnknownNode`] if `node` is not in this tree.
    pub fn set_handler<F>(&mut self, node: NodeId, handler: F) -> Result<(), WiringError>
    where
        F: Fn(&ResolvedConfig) -> HandlerResult + Send + Sync + 'static,
    {
        let slot = self
            .nodes
            .get_mut(node.0)
            .ok_or(WiringError::UnknownNode(node))?;
        slot.entry = slot.entry.clone().handler(handler);
        Ok(())
    }

    pub fn entry(&self, node: NodeId) -> Option<&EntryPoint> {
        self.nodes.get(node.0).map(|n| &n.entry)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    /// Returns the child of `node` named `name`.
    pub fn child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.nodes.get(node.0)?.children.get(name).copied()
    }

    /// Returns the children of `node` in name order.
    pub fn children(&self, node: NodeId) -> Vec<(&str, NodeId)> {
        self.nodes
            .get(node.0)
            .map(|n| n.children.iter().map(|(k, v)| (k.as_str(), *v)).collect())
            .unwrap_or_default()
    }

    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.nodes.get(node.0).is_some_and(|n| n.children.is_empty())
    }

    /// Full command path of `node`: the names from the root down, joined by
    /// spaces.
    pub fn prog(&self, node: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(n) = self.nodes.get(id.0) else {
                break;
            };
            names.push(n.entry.name.as_str());
            current = n.parent;
        }
        names.reverse();
        names.join(" ")
    }

    /// Usage line of `node`.
    pub fn usage(&self, node: NodeId) -> String {
        if let Some(usage) = self.entry(node).and_then(|e| e.usage.clone()) {
            return usage;
        }
        let prog = self.prog(node);
        if self.is_leaf(node) {
            format!("{prog} [options]")
        } else {
            format!("{prog} [subcmd]")
        }
    }

    /// Walks `argv` down to a leaf, returning it with the unconsumed tokens.
    ///
    /// # Errors
    ///
    /// Fails with [`EntryError::MissingSubcommand`] or
    /// [`EntryError::UnknownSubcommand`] when a routing node cannot pick a
    /// child, and with [`EntryError::CommandLine`] when it is asked for help
    /// with `-h` or `--help`. Any other unmatched token, flags included, is
    /// an unknown subcommand.
    pub fn route<'a>(&self, argv: &'a [String]) -> Result<(NodeId, &'a [String]), EntryError> {
        let mut node = self.root();
        let mut rest = argv;
        loop {
            if self.is_leaf(node) {
                return Ok((node, rest));
            }
            let Some((token, tail)) = rest.split_first() else {
                return Err(EntryError::MissingSubcommand {
                    prog: self.prog(node),
                    help: self.routing_help(node),
                });
            };
            if matches!(token.as_str(), "-h" | "--help") {
                self.routing_command(node)
                    .try_get_matches_from(std::slice::from_ref(token))?;
            }
            match self.child(node, token) {
                Some(child) => {
                    debug!(from = %self.prog(node), to = %token, "routing");
                    node = child;
                    rest = tail;
                }
                None => {
                    return Err(EntryError::UnknownSubcommand {
                        prog: self.prog(node),
                        token: token.clone(),
                        help: self.routing_help(node),
                    });
                }
            }
        }
    }

    /// Routes `argv` and resolves the leaf's configuration without running
    /// its handler.
    ///
    /// # Errors
    ///
    /// Returns routing, flag, source and validation failures.
    pub fn resolve<I, S>(&self, argv: I) -> Result<(NodeId, ResolvedConfig), EntryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        let (leaf, rest) = self.route(&argv)?;
        let config = resolve_leaf(
            &self.nodes[leaf.0].entry,
            &self.prog(leaf),
            rest,
            self.env.as_ref(),
            self.fs.as_ref(),
        )?;
        Ok((leaf, config))
    }

    /// Routes `argv`, resolves the leaf's configuration and runs its handler.
    ///
    /// # Errors
    ///
    /// Everything [`resolve`](Self::resolve) returns, plus
    /// [`EntryError::NoHandlerRegistered`] and [`EntryError::Handler`].
    pub fn run<I, S>(&self, argv: I) -> Result<Dispatch, EntryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (leaf, config) = self.resolve(argv)?;
        let entry = &self.nodes[leaf.0].entry;
        let handler = entry
            .handler
            .as_ref()
            .ok_or_else(|| EntryError::NoHandlerRegistered(self.prog(leaf)))?;
        let result = handler(&config).map_err(EntryError::Handler)?;
        Ok(Dispatch {
            caller: entry.name.clone(),
            result,
            config,
        })
    }

    /// Runs `argv` and reports failures on stderr.
    ///
    /// Returns the process status for the outcome; see
    /// [`EntryError::exit_code`].
    pub fn main<I, S>(&self, argv: I) -> ExitCode
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self.run(argv) {
            Ok(dispatch) => {
                debug!(caller = %dispatch.caller, "handler finished");
                ExitCode::SUCCESS
            }
            Err(err) => err.report(),
        }
    }

    fn get(&self, node: NodeId) -> Result<&CommandNode, WiringError> {
        self.nodes.get(node.0).ok_or(WiringError::UnknownNode(node))
    }

    fn routing_command(&self, node: NodeId) -> Command {
        let entry = &self.nodes[node.0].entry;
        let children = self.children(node);
        let names: Vec<&str> = children.iter().map(|(name, _)| *name).collect();
        let epilog = entry.epilog.clone().unwrap_or_else(|| {
            let mut listing = String::from("Subcommands:");
            for (name, id) in &children {
                let description = self.nodes[id.0].entry.description.as_deref().unwrap_or("");
                listing.push_str(&format!("\n  {name}  {description}"));
            }
            listing
        });

        let mut command = Command::new(self.prog(node))
            .no_binary_name(true)
            .override_usage(self.usage(node))
            .after_help(epilog)
            .arg(
                Arg::new("subcmd")
                    .value_name("SUBCMD")
                    .required(true)
                    .help(format!("Subcommand to run, one of {}", names.join(","))),
            );
        if let Some(description) = &entry.description {
            command = command.about(description.clone());
        }
        command
    }

    fn routing_help(&self, node: NodeId) -> String {
        self.routing_command(node).render_help().to_string()
    }
}

impl fmt::Debug for EntryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryTree")
            .field("nodes", &self.nodes)
            .finish_non_exhaustive()
    }
}

/// Structural checks run when a node joins a tree.
fn check_entry(entry: &EntryPoint) -> Result<(), WiringError> {
    if entry.name.is_empty() || entry.name.chars().any(char::is_whitespace) {
        return Err(WiringError::InvalidName(entry.name.clone()));
    }
    let Some(schema) = &entry.schema else {
        return Ok(());
    };
    let errors = schema.check();
    if !errors.is_empty() {
        return Err(WiringError::InvalidSchema {
            node: entry.name.clone(),
            errors,
        });
    }
    check_flags(entry, schema)
}

fn check_flags(entry: &EntryPoint, schema: &SchemaModel) -> Result<(), WiringError> {
    if let Some(field) = &entry.argparse_noflag {
        if !schema.properties.contains_key(field) {
            return Err(WiringError::UnknownPositional {
                node: entry.name.clone(),
                field: field.clone(),
            });
        }
    }

    let mut shorts: BTreeMap<char, &str> = BTreeMap::new();
    for (name, spec) in &schema.properties {
        if spec.const_value.is_some() {
            continue;
        }
        if RESERVED_LONG_FLAGS.contains(&long_flag(name).as_str()) {
            return Err(WiringError::ReservedFlag {
                node: entry.name.clone(),
                field: name.clone(),
            });
        }
        if entry.argparse_noflag.as_deref() == Some(name.as_str()) {
            continue;
        }
        if let Some(flag) = spec.short_flag() {
            if let Some(first) = shorts.insert(flag, name) {
                return Err(WiringError::DuplicateShortFlag {
                    node: entry.name.clone(),
                    flag,
                    first: first.to_string(),
                    second: name.clone(),
                });
            }
        }
    }
    Ok(())
}
