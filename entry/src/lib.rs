//! Schema-driven command trees.
//!
//! An [`EntryTree`] holds named command nodes, each configured by an
//! [`EntryPoint`]. Invoking the tree walks the argument vector down to a leaf,
//! resolves the leaf's configuration and runs its handler:
//!
//! ```text
//! argv ──route──▶ leaf ──▶ defaults ⊕ config files ⊕ environment ⊕ flags
//!                                  │
//!                              validate ──▶ handler(&ResolvedConfig)
//! ```
//!
//! Later sources win key by key, so command-line flags always beat
//! environment variables, which beat configuration files, which beat schema
//! defaults.
//!
//! # Example
//!
//! ```
//! use schema_entry::{EntryPoint, EntryTree};
//! use schema_entry_sources::MapEnv;
//! use serde_json::json;
//!
//! let tree = EntryTree::new(
//!     EntryPoint::new("test")
//!         .schema_value(&json!({
//!             "type": "object",
//!             "properties": { "a_a": { "type": "number" } },
//!             "required": ["a_a"]
//!         }))
//!         .unwrap()
//!         .handler(|config| Ok(config.to_value())),
//! )
//! .unwrap()
//! .with_environment(MapEnv::new().with("TEST_A_A", "2"));
//!
//! let dispatch = tree.run(["--a-a=3"]).unwrap();
//! assert_eq!(dispatch.result, json!({"a_a": 3.0}));
//! ```

mod cmdline;
mod error;
mod node;
mod pipeline;
mod tree;

pub use cmdline::{
    CONFIG_ARG, CommandLineArgs, CommandLineParser, RESERVED_LONG_FLAGS, SchemaCommandLine,
    long_flag,
};
pub use error::{EntryError, HandlerError, WiringError};
pub use node::{EntryPoint, Handler, HandlerResult};
pub use tree::{Dispatch, EntryTree, NodeId};
