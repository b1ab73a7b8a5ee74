mod definition;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::definition::NodeDefinition;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "SCHEMA_ENTRY_LOG";

/// Exit status when the tree file itself is unusable.
const DEFINITION_FAILURE: u8 = 6;

#[derive(Debug, Parser)]
#[command(name = "schema-entry", version)]
#[command(about = "Resolve configuration through a declarative command tree and print the result")]
struct Cli {
    /// Tree definition file (.json, .yml or .yaml).
    #[arg(long)]
    tree: PathBuf,
    /// Print the dispatch result on a single line.
    #[arg(long)]
    compact: bool,
    /// Log at debug level unless SCHEMA_ENTRY_LOG is set.
    #[arg(long, short = 'v')]
    verbose: bool,
    /// Arguments routed through the tree (after `--`).
    #[arg(last = true)]
    argv: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let tree = match NodeDefinition::load(&cli.tree).and_then(NodeDefinition::into_tree) {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(DEFINITION_FAILURE);
        }
    };

    match tree.run(cli.argv) {
        Ok(dispatch) => {
            let rendered = if cli.compact {
                serde_json::to_string(&dispatch)
            } else {
                serde_json::to_string_pretty(&dispatch)
            };
            match rendered {
                Ok(text) => {
                    println!("{text}");
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    ExitCode::FAILURE
                }
            }
        }
        Err(err) => err.report(),
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging disabled: {err}");
    }
}
