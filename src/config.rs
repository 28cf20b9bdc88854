//! Engine configuration.
//!
//! Every engine instance is built from an explicit [`SearchConfig`]; nothing
//! is read from global state, so several independent indexes can live in one
//! process.

use crate::error::{Error, Result};
use crate::query::scorer::Bm25Params;
use crate::utils::{AnalyzerKind, expand_home, get_config_path};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Search engine configuration, stored as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Index directory. A leading `~` expands to the home directory.
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Analyzer used for indexing and keyword parsing
    #[serde(default)]
    pub analyzer: AnalyzerKind,

    /// How long a mutation waits for the index writer before failing
    #[serde(default = "default_writer_lock_timeout_ms")]
    pub writer_lock_timeout_ms: u64,

    /// Segment count above which a commit merges its smallest segments
    #[serde(default = "default_max_segments")]
    pub max_segments: usize,

    /// Upper bound when counting total matches for paged search
    #[serde(default = "default_count_cap")]
    pub count_cap: usize,

    /// Number of hits returned by the unpaged search
    #[serde(default = "default_simple_search_limit")]
    pub simple_search_limit: usize,

    /// BM25 parameters
    #[serde(default)]
    pub scoring: Bm25Params,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("~/indexes")
}

fn default_writer_lock_timeout_ms() -> u64 {
    5_000
}

fn default_max_segments() -> usize {
    8
}

fn default_count_cap() -> usize {
    1_000_000
}

fn default_simple_search_limit() -> usize {
    50
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            analyzer: AnalyzerKind::default(),
            writer_lock_timeout_ms: default_writer_lock_timeout_ms(),
            max_segments: default_max_segments(),
            count_cap: default_count_cap(),
            simple_search_limit: default_simple_search_limit(),
            scoring: Bm25Params::default(),
        }
    }
}

impl SearchConfig {
    /// Default configuration rooted at `index_path`
    pub fn with_index_path(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            ..Self::default()
        }
    }

    /// Builder-style analyzer override
    pub fn analyzer(mut self, analyzer: AnalyzerKind) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from an explicit JSON file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SearchConfig = serde_json::from_str(&content)?;
        config.validate().map_err(|e| match e {
            Error::Config(reason) => Error::Config(format!("{}: {reason}", path.display())),
            other => other,
        })?;
        Ok(config)
    }

    /// Save config as pretty JSON
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// The index directory with `~` expanded
    pub fn resolved_index_path(&self) -> PathBuf {
        expand_home(&self.index_path)
    }

    /// Reject values the engine cannot work with. Also run when an index
    /// is opened, so hand-built configs are checked too.
    pub fn validate(&self) -> Result<()> {
        if self.max_segments == 0 {
            return Err(Error::Config("max_segments must be at least 1".into()));
        }
        if self.count_cap == 0 {
            return Err(Error::Config("count_cap must be at least 1".into()));
        }
        Ok(())
    }
}
