use std::fs;
use std::path::PathBuf;

use schema_entry_core::{FieldSpec, SchemaModel};
use schema_entry_sources::{ConfigFileReader, OsFileSystem, ParserMap, SourceError};
use serde_json::{Value, json};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

// ----------------------------------------------------------------------------
// Candidate selection
// ----------------------------------------------------------------------------

#[test]
fn test_first_existing_candidate_is_used() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");
    let json = write(&dir, "app.json", r#"{"a_a": 1.0}"#);
    let yaml = write(&dir, "app.yml", "a_a: 2.0\n");

    let parsers = ParserMap::new();
    let reader = ConfigFileReader::new(&OsFileSystem, &parsers);
    let partial = reader.read_candidates(&[missing, json, yaml], false).unwrap();
    assert_eq!(partial["a_a"], json!(1.0));
}

#[test]
fn test_load_all_merges_every_existing_candidate() {
    let dir = TempDir::new().unwrap();
    let first = write(&dir, "a.json", r#"{"a": 1, "b": 1}"#);
    let second = write(&dir, "b.yaml", "b: 2\n");

    let parsers = ParserMap::new();
    let reader = ConfigFileReader::new(&OsFileSystem, &parsers);
    let partial = reader.read_candidates(&[first, second], true).unwrap();
    assert_eq!(Value::Object(partial), json!({"a": 1, "b": 2}));
}

#[test]
fn test_directory_candidate_is_skipped() {
    let dir = TempDir::new().unwrap();
    let sub = dir.path().join("conf.json");
    fs::create_dir(&sub).unwrap();
    let file = write(&dir, "real.json", r#"{"a": true}"#);

    let parsers = ParserMap::new();
    let reader = ConfigFileReader::new(&OsFileSystem, &parsers);
    let partial = reader.read_candidates(&[sub, file], false).unwrap();
    assert_eq!(partial["a"], json!(true));
}

// ----------------------------------------------------------------------------
// Filtering and errors
// ----------------------------------------------------------------------------

#[test]
fn test_undeclared_keys_dropped_with_schema() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.yaml", "a_a: 5.5\nunrelated: yes\n");
    let schema = SchemaModel::new().with_field("a_a", FieldSpec::number());

    let parsers = ParserMap::new();
    let reader = ConfigFileReader::new(&OsFileSystem, &parsers).with_schema(Some(&schema), true);
    let partial = reader.read_candidates(&[path], false).unwrap();
    assert_eq!(Value::Object(partial), json!({"a_a": 5.5}));
}

#[test]
fn test_invalid_yaml_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "bad.yml", "a: [1, 2\n");

    let parsers = ParserMap::new();
    let reader = ConfigFileReader::new(&OsFileSystem, &parsers);
    let err = reader.read_candidates(&[path], false).unwrap_err();
    assert!(matches!(err, SourceError::Yaml { .. }));
    assert!(err.to_string().contains("bad.yml"));
}
