//! Configuration file source.
//!
//! A node lists candidate file paths. By default the first candidate that
//! is an existing file with a supported extension is read and the rest are
//! ignored; with `load_all` every existing candidate is read and merged in
//! list order. Supported formats are JSON (`.json`) and YAML (`.yml`,
//! `.yaml`), and a custom parser registered for a file name takes priority
//! over the extension.
//!
//! When `only_declared` is set and a schema is attached, only keys the schema
//! declares (with non-null values) are kept, so unrelated file content never
//! leaks into the configuration.
//!
//! # Example
//!
//! ```no_run
//! use schema_entry_sources::{ConfigFileReader, OsFileSystem, ParserMap};
//!
//! let parsers = ParserMap::new();
//! let reader = ConfigFileReader::new(&OsFileSystem, &parsers);
//! let partial = reader
//!     .read_candidates(&["/etc/app.json".into(), "./app.yml".into()], false)
//!     .unwrap();
//! println!("{} keys", partial.len());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use schema_entry_core::{PartialConfig, SchemaModel, merge_partials};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, SourceError};

/// Read access to the filesystem.
///
/// Injected into resolution so tests can substitute fixtures.
pub trait FileSystem {
    /// Returns `true` if `path` names an existing regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Reads the whole file as UTF-8.
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Recognized configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Detects the format from a path's extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use schema_entry_sources::ConfigFormat;
    ///
    /// assert_eq!(ConfigFormat::from_path(Path::new("a.json")), Some(ConfigFormat::Json));
    /// assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), Some(ConfigFormat::Yaml));
    /// assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), None);
    /// ```
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Some(Self::Json),
            Some("yml") | Some("yaml") => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Parses `contents`, requiring a top-level object.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Json`] / [`SourceError::Yaml`] on syntax errors
    /// and [`SourceError::NotAnObject`] if the document is not a mapping.
    pub fn parse(self, path: &Path, contents: &str) -> Result<PartialConfig> {
        let value: Value = match self {
            Self::Json => serde_json::from_str(contents).map_err(|source| SourceError::Json {
                path: path.to_path_buf(),
                source,
            })?,
            Self::Yaml => serde_yaml::from_str(contents).map_err(|source| SourceError::Yaml {
                path: path.to_path_buf(),
                source,
            })?,
        };
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(SourceError::NotAnObject {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Custom parser for a specific configuration file.
///
/// Implemented for any `Fn(&Path, &str) -> Result<PartialConfig, String>`.
pub trait ConfigFileParser: Send + Sync {
    /// Parses `contents` read from `path`.
    fn parse(&self, path: &Path, contents: &str) -> std::result::Result<PartialConfig, String>;
}

impl<F> ConfigFileParser for F
where
    F: Fn(&Path, &str) -> std::result::Result<PartialConfig, String> + Send + Sync,
{
    fn parse(&self, path: &Path, contents: &str) -> std::result::Result<PartialConfig, String> {
        self(path, contents)
    }
}

/// Custom parsers keyed by file name (the last path component).
#[derive(Clone, Default)]
pub struct ParserMap {
    parsers: BTreeMap<String, Arc<dyn ConfigFileParser>>,
}

impl ParserMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `parser` for files named `file_name`.
    pub fn insert(&mut self, file_name: impl Into<String>, parser: impl ConfigFileParser + 'static) {
        self.parsers.insert(file_name.into(), Arc::new(parser));
    }

    /// Returns the parser registered for `path`'s file name.
    pub fn get(&self, path: &Path) -> Option<&Arc<dyn ConfigFileParser>> {
        let name = path.file_name()?.to_str()?;
        self.parsers.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl fmt::Debug for ParserMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.parsers.keys()).finish()
    }
}

/// Reads configuration files through a [`FileSystem`].
#[derive(Clone, Copy)]
pub struct ConfigFileReader<'a> {
    fs: &'a dyn FileSystem,
    parsers: &'a ParserMap,
    schema: Option<&'a SchemaModel>,
    only_declared: bool,
}

impl<'a> ConfigFileReader<'a> {
    /// Creates a reader that keeps every key it reads.
    pub fn new(fs: &'a dyn FileSystem, parsers: &'a ParserMap) -> Self {
        Self {
            fs,
            parsers,
            schema: None,
            only_declared: false,
        }
    }

    /// Keeps only keys declared by `schema` when `only_declared` is set.
    pub fn with_schema(mut self, schema: Option<&'a SchemaModel>, only_declared: bool) -> Self {
        self.schema = schema;
        self.only_declared = only_declared;
        self
    }

    /// Reads one file.
    ///
    /// Returns `Ok(None)` (with a warning) when `path` is not a file or has an
    /// unsupported extension and no custom parser is registered for it.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the file exists but cannot be read or
    /// parsed.
    pub fn read_file(&self, path: &Path) -> Result<Option<PartialConfig>> {
        if !self.fs.is_file(path) {
            warn!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        }

        let parser = self.parsers.get(path);
        let format = ConfigFormat::from_path(path);
        if parser.is_none() && format.is_none() {
            warn!(path = %path.display(), "skipping config file with unsupported format");
            return Ok(None);
        }

        let contents = self
            .fs
            .read_to_string(path)
            .map_err(|source| SourceError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let partial = match (parser, format) {
            (Some(parser), _) => {
                parser
                    .parse(path, &contents)
                    .map_err(|message| SourceError::Parser {
                        path: path.to_path_buf(),
                        message,
                    })?
            }
            (None, Some(format)) => format.parse(path, &contents)?,
            (None, None) => return Ok(None),
        };
        debug!(path = %path.display(), keys = partial.len(), "read config file");
        Ok(Some(self.filter(partial)))
    }

    /// Reads the candidate list.
    ///
    /// Without `load_all`, the first usable candidate wins. With `load_all`,
    /// every usable candidate is merged in list order. Candidates that do not
    /// exist are skipped silently; if none is usable a warning is logged and
    /// an empty mapping returned.
    ///
    /// # Errors
    ///
    /// Propagates read and parse failures of existing candidates.
    pub fn read_candidates(&self, paths: &[PathBuf], load_all: bool) -> Result<PartialConfig> {
        if paths.is_empty() {
            return Ok(PartialConfig::new());
        }

        let mut found = Vec::new();
        for path in paths {
            if !self.fs.is_file(path) {
                continue;
            }
            if let Some(partial) = self.read_file(path)? {
                found.push(partial);
                if !load_all {
                    break;
                }
            }
        }

        if found.is_empty() {
            warn!(candidates = paths.len(), "none of the config file paths are usable");
        }
        Ok(merge_partials(found))
    }

    fn filter(&self, partial: PartialConfig) -> PartialConfig {
        match self.schema {
            Some(schema) if self.only_declared => partial
                .into_iter()
                .filter(|(key, value)| schema.properties.contains_key(key) && !value.is_null())
                .collect(),
            _ => partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io;

    use schema_entry_core::FieldSpec;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct MemoryFs {
        files: BTreeMap<PathBuf, String>,
    }

    impl MemoryFs {
        fn with(mut self, path: &str, contents: &str) -> Self {
            self.files.insert(PathBuf::from(path), contents.to_string());
            self
        }
    }

    impl FileSystem for MemoryFs {
        fn is_file(&self, path: &Path) -> bool {
            self.files.contains_key(path)
        }

        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_first_usable_candidate_wins() {
        let fs = MemoryFs::default()
            .with("b.json", r#"{"a": 1}"#)
            .with("c.json", r#"{"a": 2}"#);
        let parsers = ParserMap::new();
        let reader = ConfigFileReader::new(&fs, &parsers);
        let partial = reader
            .read_candidates(&paths(&["missing.json", "b.json", "c.json"]), false)
            .unwrap();
        assert_eq!(partial["a"], json!(1));
    }

    #[test]
    fn test_unsupported_extension_is_skipped() {
        let fs = MemoryFs::default()
            .with("a.toml", "a = 1")
            .with("b.yml", "a: 2\n");
        let parsers = ParserMap::new();
        let reader = ConfigFileReader::new(&fs, &parsers);
        let partial = reader
            .read_candidates(&paths(&["a.toml", "b.yml"]), false)
            .unwrap();
        assert_eq!(partial["a"], json!(2));
    }

    #[test]
    fn test_load_all_merges_in_order() {
        let fs = MemoryFs::default()
            .with("a.json", r#"{"a": 1, "b": 1}"#)
            .with("b.yaml", "b: 2\nc: 13\n");
        let parsers = ParserMap::new();
        let reader = ConfigFileReader::new(&fs, &parsers);
        let partial = reader
            .read_candidates(&paths(&["a.json", "b.yaml"]), true)
            .unwrap();
        assert_eq!(Value::Object(partial), json!({"a": 1, "b": 2, "c": 13}));
    }

    #[test]
    fn test_no_usable_candidate_yields_empty() {
        let fs = MemoryFs::default();
        let parsers = ParserMap::new();
        let reader = ConfigFileReader::new(&fs, &parsers);
        assert!(reader.read_candidates(&paths(&["x.json"]), false).unwrap().is_empty());
    }

    #[test]
    fn test_only_declared_keys_are_kept() {
        let fs = MemoryFs::default().with("a.json", r#"{"a": 1, "b": 2, "c": null}"#);
        let parsers = ParserMap::new();
        let schema = SchemaModel::new()
            .with_field("a", FieldSpec::number())
            .with_field("c", FieldSpec::number());

        let reader = ConfigFileReader::new(&fs, &parsers).with_schema(Some(&schema), true);
        let partial = reader.read_file(Path::new("a.json")).unwrap().unwrap();
        assert_eq!(Value::Object(partial), json!({"a": 1}));

        let reader = ConfigFileReader::new(&fs, &parsers).with_schema(Some(&schema), false);
        let partial = reader.read_file(Path::new("a.json")).unwrap().unwrap();
        assert_eq!(Value::Object(partial), json!({"a": 1, "b": 2, "c": null}));
    }

    #[test]
    fn test_custom_parser_takes_priority() {
        let fs = MemoryFs::default().with("dir/other.conf", "A=1\nB=2");
        let mut parsers = ParserMap::new();
        parsers.insert("other.conf", |_: &Path, contents: &str| {
            contents
                .lines()
                .map(|line| {
                    let (k, v) = line.split_once('=').ok_or("missing =")?;
                    let v: i64 = v.parse().map_err(|_| "not a number")?;
                    Ok((k.to_lowercase(), json!(v)))
                })
                .collect::<std::result::Result<PartialConfig, &str>>()
                .map_err(String::from)
        });
        let reader = ConfigFileReader::new(&fs, &parsers);
        let partial = reader.read_file(Path::new("dir/other.conf")).unwrap().unwrap();
        assert_eq!(Value::Object(partial), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let fs = MemoryFs::default().with("a.json", "{not json");
        let parsers = ParserMap::new();
        let reader = ConfigFileReader::new(&fs, &parsers);
        assert!(matches!(
            reader.read_candidates(&paths(&["a.json"]), false),
            Err(SourceError::Json { .. })
        ));
    }

    #[test]
    fn test_non_object_document_is_an_error() {
        let fs = MemoryFs::default().with("a.yml", "- 1\n- 2\n");
        let parsers = ParserMap::new();
        let reader = ConfigFileReader::new(&fs, &parsers);
        assert!(matches!(
            reader.read_file(Path::new("a.yml")),
            Err(SourceError::NotAnObject { .. })
        ));
    }
}
