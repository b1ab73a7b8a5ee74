use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{Value, json};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("failed to write fixture");
    path
}

fn schema_entry(tree: &Path, argv: &[&str], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_schema-entry"));
    command.arg("--tree").arg(tree).arg("--compact").arg("--").args(argv);
    command.env("SCHEMA_ENTRY_LOG", "off");
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("failed to run schema-entry")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

const TREE_YAML: &str = r#"
name: cfgtest
description: configuration test tree
children:
  - name: serve
    description: run the server
    schema:
      type: object
      properties:
        port:
          type: integer
          default: 8080
        host:
          type: string
          title: H
        tags:
          type: array
          items:
            type: string
      required: [port, host]
  - name: db
    children:
      - name: migrate
        argparse_noflag: steps
        schema:
          type: object
          properties:
            steps:
              type: integer
"#;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[test]
fn dispatch_prints_caller_and_resolved_config() {
    let dir = TempDir::new().unwrap();
    let tree = write(&dir, "tree.yml", TREE_YAML);

    let output = schema_entry(&tree, &["serve", "-H", "localhost"], &[]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_json(&output),
        json!({"caller": "serve", "result": {"host": "localhost", "port": 8080}})
    );
}

#[test]
fn environment_uses_command_path_prefix() {
    let dir = TempDir::new().unwrap();
    let tree = write(&dir, "tree.yml", TREE_YAML);

    let output = schema_entry(
        &tree,
        &["serve", "--port", "9000"],
        &[("CFGTEST_SERVE_HOST", "example.org"), ("CFGTEST_SERVE_PORT", "1")],
    );
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output)["result"],
        json!({"host": "example.org", "port": 9000})
    );
}

#[test]
fn nested_leaf_with_positional_field() {
    let dir = TempDir::new().unwrap();
    let tree = write(&dir, "tree.yml", TREE_YAML);

    let output = schema_entry(&tree, &["db", "migrate", "3"], &[]);
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output),
        json!({"caller": "migrate", "result": {"steps": 3}})
    );
}

#[test]
fn config_flag_reads_adhoc_file() {
    let dir = TempDir::new().unwrap();
    let tree = write(&dir, "tree.yml", TREE_YAML);
    let config = write(&dir, "serve.json", r#"{"host": "from-file", "tags": ["a"]}"#);
    let config = config.to_string_lossy().into_owned();

    let output = schema_entry(&tree, &["serve", "-c", &config, "--tags", "b"], &[]);
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output)["result"],
        json!({"host": "from-file", "port": 8080, "tags": ["b"]})
    );
}

#[test]
fn json_tree_definition_is_accepted() {
    let dir = TempDir::new().unwrap();
    let definition = json!({
        "name": "solo",
        "schema": {
            "type": "object",
            "properties": { "a_a": { "type": "number", "default": 33.3 } }
        }
    });
    let tree = write(&dir, "tree.json", &definition.to_string());

    let output = schema_entry(&tree, &[], &[]);
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output),
        json!({"caller": "solo", "result": {"a_a": 33.3}})
    );
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn unknown_subcommand_exits_with_routing_status() {
    let dir = TempDir::new().unwrap();
    let tree = write(&dir, "tree.yml", TREE_YAML);

    let output = schema_entry(&tree, &["nope"], &[]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown subcommand `nope`"));
    assert!(stderr.contains("cfgtest [subcmd]"));
    assert!(stderr.contains("serve  run the server"));
}

#[test]
fn missing_required_field_exits_with_validation_status() {
    let dir = TempDir::new().unwrap();
    let tree = write(&dir, "tree.yml", TREE_YAML);

    let output = schema_entry(&tree, &["serve"], &[]);
    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing required field `host`"));
}

#[test]
fn invalid_flag_value_exits_with_usage_status() {
    let dir = TempDir::new().unwrap();
    let tree = write(&dir, "tree.yml", TREE_YAML);

    let output = schema_entry(&tree, &["serve", "-H", "x", "--port", "eighty"], &[]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn leaf_help_exits_successfully() {
    let dir = TempDir::new().unwrap();
    let tree = write(&dir, "tree.yml", TREE_YAML);

    let output = schema_entry(&tree, &["serve", "--help"], &[]);
    assert_eq!(output.status.code(), Some(0));
    let help = String::from_utf8_lossy(&output.stdout);
    assert!(help.contains("cfgtest serve [options]"));
    assert!(help.contains("--port"));
    assert!(help.contains("--config"));
}

#[test]
fn invalid_schema_in_tree_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let tree = write(
        &dir,
        "tree.yml",
        "name: bad\nschema:\n  type: object\n  properties:\n    a:\n      type: array\n",
    );

    let output = schema_entry(&tree, &[], &[]);
    assert_eq!(output.status.code(), Some(6));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid schema for `bad`"));
}

#[test]
fn missing_tree_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let output = schema_entry(&dir.path().join("absent.yml"), &[], &[]);
    assert_eq!(output.status.code(), Some(6));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot read"));
}
