//! Shared fixtures: content records and engines over temp directories.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use sift::{Content, MemoryContentStore, SearchConfig, SearchEngine};
use std::sync::Arc;
use tempfile::TempDir;

pub type TestEngine = SearchEngine<Arc<MemoryContentStore>>;

/// A content record created in `year`
pub fn record(id: u64, module: &str, title: &str, text: &str, year: i32) -> Content {
    Content {
        id,
        module: module.to_string(),
        title: title.to_string(),
        text: text.to_string(),
        created: Utc.with_ymd_and_hms(year, 3, 15, 8, 30, 0).unwrap(),
        url: format!("/{module}/{id}"),
    }
}

/// The two-article corpus used across tests
pub fn two_articles() -> Vec<Content> {
    vec![
        record(1, "article", "rust ownership", "borrow checker basics", 2016),
        record(2, "article", "go channels", "goroutine scheduling", 2016),
    ]
}

/// `n` articles that all match "rust", with varying relevance
pub fn rust_articles(n: u64) -> Vec<Content> {
    (1..=n)
        .map(|id| {
            let filler = "notes ".repeat((id % 7) as usize);
            record(id, "article", &format!("rust {filler}"), &format!("chapter {id} {filler}"), 2015)
        })
        .collect()
}

/// Initialized engine over `records`, index in a fresh temp directory
pub fn engine_with(records: Vec<Content>) -> (TempDir, TestEngine) {
    engine_with_config(records, |config| config)
}

pub fn engine_with_config(
    records: Vec<Content>,
    configure: impl FnOnce(SearchConfig) -> SearchConfig,
) -> (TempDir, TestEngine) {
    let dir = tempfile::tempdir().unwrap();
    let config = configure(SearchConfig::with_index_path(dir.path().join("index")));
    let engine = SearchEngine::new(config, Arc::new(MemoryContentStore::from_records(records)));
    engine.init().unwrap();
    (dir, engine)
}

/// Reopen the index of `dir` with a fresh engine
pub fn reopen(dir: &TempDir, records: Vec<Content>) -> TestEngine {
    let config = SearchConfig::with_index_path(dir.path().join("index"));
    let engine = SearchEngine::new(config, Arc::new(MemoryContentStore::from_records(records)));
    engine.init().unwrap();
    engine
}
