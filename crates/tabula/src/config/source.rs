//! Configuration sources.
//!
//! A [`ConfigSource`] produces the raw declaration for a table type. The
//! engine only needs read access; invalidation goes through
//! [`ConfigResolver::clear_cache`](crate::ConfigResolver::clear_cache).
//!
//! # Resolution
//!
//! [`ConfigRegistry`] is the default source. Lookups follow these rules:
//!
//! 1. **Inline declarations** (added via [`ConfigRegistry::add_inline_yaml`] or
//!    [`ConfigRegistry::add_inline_json`]) have highest priority
//! 2. **File declarations** are searched in directory registration order (first
//!    directory wins)
//!
//! Within one directory, extensions are tried in priority order:
//!
//! | Priority | Extension |
//! |----------|-----------|
//! | 1 (highest) | `.yaml` |
//! | 2 | `.yml` |
//! | 3 (lowest) | `.json` |
//!
//! Files are read on every lookup; resolved configurations are cached by the
//! resolver, not here.
//!
//! ```rust
//! use tabula::{ConfigRegistry, ConfigSource};
//!
//! let mut registry = ConfigRegistry::new();
//! registry.add_inline_yaml("basic_info", "columns:\n  - {key: name, label: Name, type: text}").unwrap();
//!
//! let declared = registry.load("basic_info").unwrap().unwrap();
//! assert_eq!(declared["columns"][0]["key"], "name");
//! assert!(registry.load("missing").unwrap().is_none());
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value as Json;

use crate::error::{Result, TableError};

/// Recognized declaration file extensions in priority order.
pub const CONFIG_EXTENSIONS: &[&str] = &[".yaml", ".yml", ".json"];

/// Supplies raw table declarations.
pub trait ConfigSource: Send + Sync {
    /// Loads the declaration for `table_type`, or `None` when none exists.
    fn load(&self, table_type: &str) -> Result<Option<Json>>;
}

/// Registry of table declarations from inline documents and directories.
#[derive(Debug, Default, Clone)]
pub struct ConfigRegistry {
    inline: HashMap<String, Json>,
    dirs: Vec<PathBuf>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a YAML declaration under `table_type`.
    pub fn add_inline_yaml(&mut self, table_type: impl Into<String>, yaml: &str) -> Result<()> {
        let doc: Json = serde_yaml::from_str(yaml)?;
        self.inline.insert(table_type.into(), doc);
        Ok(())
    }

    /// Registers a JSON declaration under `table_type`.
    pub fn add_inline_json(&mut self, table_type: impl Into<String>, json: &str) -> Result<()> {
        let doc: Json = serde_json::from_str(json)?;
        self.inline.insert(table_type.into(), doc);
        Ok(())
    }

    /// Registers an already-parsed declaration.
    pub fn add_inline(&mut self, table_type: impl Into<String>, declaration: Json) {
        self.inline.insert(table_type.into(), declaration);
    }

    /// Adds a directory to search. Directories are searched in the order added.
    pub fn add_dir<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(TableError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config directory not found: {}", path.display()),
            )));
        }
        self.dirs.push(path.to_path_buf());
        Ok(())
    }

    /// Table types with inline declarations.
    pub fn inline_names(&self) -> impl Iterator<Item = &str> {
        self.inline.keys().map(String::as_str)
    }

    fn find_file(&self, table_type: &str) -> Option<PathBuf> {
        self.dirs.iter().find_map(|dir| {
            CONFIG_EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{}{}", table_type, ext)))
                .find(|candidate| candidate.is_file())
        })
    }
}

impl ConfigSource for ConfigRegistry {
    fn load(&self, table_type: &str) -> Result<Option<Json>> {
        if let Some(doc) = self.inline.get(table_type) {
            return Ok(Some(doc.clone()));
        }

        if !is_plain_name(table_type) {
            return Err(TableError::ConfigLoad {
                table_type: table_type.to_string(),
                message: "table type must be a plain file name".to_string(),
            });
        }
        let Some(path) = self.find_file(table_type) else {
            return Ok(None);
        };
        tracing::debug!(table_type, path = %path.display(), "loading table declaration");

        let content = std::fs::read_to_string(&path)?;
        let parsed = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map(Some).map_err(|message| TableError::ConfigLoad {
            table_type: table_type.to_string(),
            message,
        })
    }
}

/// A table type usable as a file stem: no separators, no parent references.
fn is_plain_name(table_type: &str) -> bool {
    !table_type.is_empty()
        && table_type != "."
        && !table_type.contains("..")
        && !table_type.contains(['/', '\\'])
        && !Path::new(table_type).is_absolute()
}
