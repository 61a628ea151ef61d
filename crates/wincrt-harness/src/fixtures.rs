//! Fixture loading and management.
//!
//! A fixture case is a script of registry operations plus the observable
//! result the script must produce.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("io: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json: {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no fixture files found under {0}")]
    Empty(PathBuf),
}

/// One scripted operation against a fresh registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Register a callback that records `id` when it runs.
    Register {
        id: String,
        /// Panic after recording.
        #[serde(default)]
        panics: bool,
        /// Ids registered (as plain recorders) from inside this callback.
        #[serde(default)]
        on_run: Vec<String>,
    },
    /// Drain the registry.
    Drain,
}

/// Observable result of a case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expected {
    /// Callback ids in invocation order, across all drains.
    pub order: Vec<String>,
    /// Ids whose registration was refused.
    #[serde(default)]
    pub rejected: Vec<String>,
    /// Callbacks that panicked (recorded or stopping).
    #[serde(default)]
    pub failures: usize,
    /// Entries left pending after the last step.
    #[serde(default)]
    pub pending: usize,
}

/// A single fixture test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCase {
    pub name: String,
    /// C standard / CRT contract reference.
    pub spec_section: String,
    /// `stop` or `best-effort`.
    #[serde(default = "default_policy")]
    pub policy: String,
    /// Storage budget for the registry under test.
    #[serde(default)]
    pub max_pending: Option<usize>,
    pub steps: Vec<Step>,
    pub expected: Expected,
}

fn default_policy() -> String {
    "stop".to_string()
}

/// A collection of fixture cases for one function family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    pub version: String,
    pub family: String,
    pub captured_at: String,
    pub cases: Vec<FixtureCase>,
}

impl FixtureSet {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_file(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| FixtureError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Every `*.json` file directly under `dir`, sorted by path. A file path is
/// returned as-is.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>, FixtureError> {
    if dir.is_file() {
        return Ok(vec![dir.to_path_buf()]);
    }
    let io_err = |source| FixtureError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    if paths.is_empty() {
        return Err(FixtureError::Empty(dir.to_path_buf()));
    }
    paths.sort();
    Ok(paths)
}
