//! Where rule text comes from.
//!
//! [`RuleSource`] abstracts reading so rule loading can be exercised without
//! touching the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ast::RuleSet;
use crate::error::LoadError;
use crate::parser::parse_rules;

pub trait RuleSource {
    /// Read the full rule text stored at `path`.
    fn read_rules(&self, path: &Path) -> Result<String, std::io::Error>;
}

/// Reads rule files with `std::fs`.
pub struct FileSystemSource;

impl RuleSource for FileSystemSource {
    fn read_rules(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }
}

/// Rule texts keyed by path, for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemorySource {
    files: HashMap<PathBuf, String>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }
}

impl RuleSource for InMemorySource {
    fn read_rules(&self, path: &Path) -> Result<String, std::io::Error> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no rules registered for {}", path.display()),
            )
        })
    }
}

/// Load and parse a rule file from disk.
pub fn load_rules(path: &Path) -> Result<RuleSet, LoadError> {
    load_rules_from(&FileSystemSource, path)
}

pub fn load_rules_from(source: &dyn RuleSource, path: &Path) -> Result<RuleSet, LoadError> {
    let text = source.read_rules(path).map_err(|e| LoadError::Io {
        path: path.to_owned(),
        source: e,
    })?;
    let rules = parse_rules(&text)?;
    tracing::debug!(path = %path.display(), rules = rules.len(), "rule file loaded");
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_from_memory() {
        let mut src = InMemorySource::new();
        src.insert("mods.txt", "# scenario\nADD SURFACE=paved\nIF SURFACE==paved THEN UPDATE MAXSPEED TO 30\n");
        let rules = load_rules_from(&src, Path::new("mods.txt")).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.rules()[1].line_no, 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_rules_from(&InMemorySource::new(), Path::new("nope.txt")).unwrap_err();
        match err {
            LoadError::Io { path, .. } => assert_eq!(path, PathBuf::from("nope.txt")),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn parse_failure_propagates() {
        let mut src = InMemorySource::new();
        src.insert("bad.txt", "REMOVE A\nNONSENSE\n");
        let err = load_rules_from(&src, Path::new("bad.txt")).unwrap_err();
        let LoadError::Parse(parse) = err else {
            panic!("expected parse error");
        };
        assert_eq!(parse.line_no, 2);
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "REMOVE HEIGHT FREQ 1/2").unwrap();
        let rules = load_rules(file.path()).unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules.rules()[0].frequency.is_some());
    }
}
