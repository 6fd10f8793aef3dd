//! Analyzer settings, read from a TOML file.
//!
//! ```toml
//! workers = 4
//! exclusions = ["**/dto/**"]
//! cycle_guard = "ancestor"
//! max_depth = 256
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::callgraph::DEFAULT_MAX_DEPTH;
use crate::domain::cycle_guard::CycleGuardKind;
use crate::error::{ConfigError, PatternError};
use crate::infrastructure::exclusion::ExclusionSet;
use crate::infrastructure::pom::DEFAULT_DESCRIPTOR;
use crate::infrastructure::scanner::DEFAULT_EXTENSION;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Extraction threads; unset means half the cores.
    pub workers: Option<usize>,
    /// Ant-style patterns; an artifact is skipped only if it matches all of them.
    pub exclusions: Vec<String>,
    pub cycle_guard: CycleGuardKind,
    pub max_depth: usize,
    pub build_descriptor: String,
    pub artifact_extension: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            workers: None,
            exclusions: Vec::new(),
            cycle_guard: CycleGuardKind::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            build_descriptor: DEFAULT_DESCRIPTOR.to_string(),
            artifact_extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl AnalyzerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn exclusion_set(&self) -> Result<ExclusionSet, PatternError> {
        ExclusionSet::new(&self.exclusions)
    }
}
