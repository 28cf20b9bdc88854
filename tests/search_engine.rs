//! End-to-end behavior of the search engine over a real index directory.

mod fixtures;

use fixtures::*;
use sift::content::ContentStore;
use sift::{AnalyzerKind, Content, Error, IndexableDocument, Page, SearchConfig, SearchEngine, SearchHit};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn ids(page: &Page<SearchHit>) -> Vec<String> {
    page.items.iter().map(|h| h.id.clone()).collect()
}

fn all_pages(engine: &TestEngine, keyword: &str, module: &str, size: usize) -> Vec<String> {
    let first = engine.search_page(keyword, module, 1, size).unwrap();
    let mut out = ids(&first);
    for page in 2..=first.total_pages {
        out.extend(ids(&engine.search_page(keyword, module, page, size).unwrap()));
    }
    out
}

#[test]
fn test_two_article_scenario() {
    let (_dir, engine) = engine_with(two_articles());
    engine.reindex_module("article").unwrap();

    assert_eq!(ids(&engine.search("ownership", "article").unwrap()), vec!["1"]);
    assert!(engine.search("ownership", "page").unwrap().items.is_empty());

    let page = engine.search_page("ownership", "article", 1, 1).unwrap();
    assert_eq!(ids(&page), vec!["1"]);
    assert_eq!(page.total_items, 1);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.page_number, 1);
    assert_eq!(page.page_size, 1);
}

#[test]
fn test_hits_carry_stored_fields_and_record() {
    let (_dir, engine) = engine_with(two_articles());
    engine.reindex_module("article").unwrap();

    let page = engine.search("goroutine", "article").unwrap();
    let hit = &page.items[0];
    assert_eq!(hit.id, "2");
    assert_eq!(hit.module, "article");
    assert_eq!(hit.title, "go channels");
    assert_eq!(hit.description, "goroutine scheduling");
    assert_eq!(hit.url, "/article/2");
    assert_eq!(hit.created_year, "2016");
    assert!(hit.score > 0.0);
    assert_eq!(hit.record.as_ref().unwrap().id, 2);
}

#[test]
fn test_added_then_deleted_never_found() {
    let (_dir, engine) = engine_with(two_articles());
    engine.reindex_module("article").unwrap();

    let doc = IndexableDocument::from_content(&record(3, "article", "rust macros", "hygiene", 2017));
    engine.add_bean(&doc).unwrap();
    assert!(ids(&engine.search("macros", "article").unwrap()).contains(&"3".to_string()));

    engine.delete_bean("3").unwrap();
    assert!(engine.search("macros", "article").unwrap().items.is_empty());
    assert_eq!(engine.search_page("macros", "article", 1, 10).unwrap().total_items, 0);

    // Still gone after the segments are merged
    engine.compact().unwrap();
    assert!(engine.search("macros", "article").unwrap().items.is_empty());
}

#[test]
fn test_update_leaves_one_document_per_id() {
    let (_dir, engine) = engine_with(two_articles());
    engine.reindex_module("article").unwrap();

    let mut doc = IndexableDocument::from_content(&record(1, "article", "rust lifetimes", "elision rules", 2016));
    engine.update_bean(&doc).unwrap();
    engine.update_bean(&doc).unwrap();
    doc.title = "rust lifetimes revisited".into();
    engine.add_bean(&doc).unwrap();

    assert_eq!(engine.stats().unwrap().live_docs, 2);
    let page = engine.search_page("rust", "article", 1, 10).unwrap();
    assert_eq!(ids(&page), vec!["1"]);
    assert_eq!(page.items[0].title, "rust lifetimes revisited");
    assert!(engine.search("ownership", "article").unwrap().items.is_empty());
}

#[test]
fn test_pages_reproduce_unpaged_order() {
    let (_dir, engine) = engine_with(rust_articles(23));
    engine.reindex_module("article").unwrap();

    let unpaged = ids(&engine.search("rust", "article").unwrap());
    assert_eq!(unpaged.len(), 23);

    for size in [1, 4, 7, 23, 50] {
        assert_eq!(all_pages(&engine, "rust", "article", size), unpaged, "page size {size}");
    }
}

#[test]
fn test_total_pages_is_ceiling() {
    let (_dir, engine) = engine_with(rust_articles(23));
    engine.reindex_module("article").unwrap();

    for size in [1, 2, 5, 10, 23, 24] {
        let page = engine.search_page("rust", "article", 1, size).unwrap();
        assert_eq!(page.total_items, 23);
        assert_eq!(page.total_pages, 23usize.div_ceil(size));
        assert!(page.items.len() <= size);
    }
}

#[test]
fn test_page_past_end_is_empty_with_totals() {
    let (_dir, engine) = engine_with(rust_articles(5));
    engine.reindex_module("article").unwrap();

    let page = engine.search_page("rust", "article", 4, 2).unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.page_number, 4);
    assert_eq!((page.total_items, page.total_pages), (5, 3));
}

#[test]
fn test_invalid_pagination() {
    let (_dir, engine) = engine_with(rust_articles(3));
    engine.reindex_module("article").unwrap();

    for (page, size) in [(0, 10), (1, 0), (0, 0)] {
        let err = engine.search_page("rust", "article", page, size).unwrap_err();
        assert!(matches!(err, Error::SearchExecution(_)), "{page}/{size}: {err}");
    }
}

#[test]
fn test_module_filter_is_exact() {
    let mut records = two_articles();
    records.push(record(10, "page", "ownership policy", "terms", 2016));
    records.push(record(11, "article-draft", "ownership draft", "draft", 2016));
    let (_dir, engine) = engine_with(records);
    for module in ["article", "page", "article-draft"] {
        engine.reindex_module(module).unwrap();
    }

    assert_eq!(ids(&engine.search("ownership", "article").unwrap()), vec!["1"]);
    assert_eq!(ids(&engine.search("ownership", "page").unwrap()), vec!["10"]);
    assert_eq!(ids(&engine.search("ownership", "article-draft").unwrap()), vec!["11"]);
    assert!(engine.search("ownership", "Article").unwrap().items.is_empty());
    assert!(engine.search("ownership", "art").unwrap().items.is_empty());
}

#[test]
fn test_title_only_match_found_non_match_excluded() {
    let (_dir, engine) = engine_with(vec![
        record(1, "article", "compilers", "nothing relevant here", 2016),
        record(2, "article", "gardening", "soil and water", 2016),
        record(3, "article", "cooking", "a chapter on compilers", 2016),
    ]);
    engine.reindex_module("article").unwrap();

    let mut found = ids(&engine.search("compilers", "article").unwrap());
    found.sort();
    assert_eq!(found, vec!["1", "3"]);
}

#[test]
fn test_keyword_syntax() {
    let (_dir, engine) = engine_with(vec![
        record(1, "article", "rust ownership", "borrow checker basics", 2016),
        record(2, "article", "rust async", "futures and executors", 2016),
        record(3, "article", "go channels", "checker of goroutine basics", 2016),
    ]);
    engine.reindex_module("article").unwrap();

    let sorted = |keyword: &str| {
        let mut found = ids(&engine.search(keyword, "article").unwrap());
        found.sort();
        found
    };

    assert_eq!(sorted("\"borrow checker\""), vec!["1"]);
    assert_eq!(sorted("rust -async"), vec!["1"]);
    assert_eq!(sorted("rust AND NOT async"), vec!["1"]);
    assert_eq!(sorted("+rust +async"), vec!["2"]);
    assert_eq!(sorted("gorout*"), vec!["3"]);
    assert_eq!(sorted("ownership OR channels"), vec!["1", "3"]);
    assert_eq!(sorted("(async OR goroutine) AND basics"), vec!["3"]);
    assert!(sorted("-rust").is_empty());
    assert!(sorted("...").is_empty());
}

#[test]
fn test_boost_changes_ranking() {
    let (_dir, engine) = engine_with(vec![
        record(1, "article", "rust", "filler", 2016),
        record(2, "article", "go", "filler", 2016),
    ]);
    engine.reindex_module("article").unwrap();

    assert_eq!(ids(&engine.search("rust go^10", "article").unwrap()), vec!["2", "1"]);
    assert_eq!(ids(&engine.search("rust^10 go", "article").unwrap()), vec!["1", "2"]);
}

#[test]
fn test_parse_errors() {
    let (_dir, engine) = engine_with(two_articles());
    engine.reindex_module("article").unwrap();

    for keyword in ["", "\"open", "(rust", "rust)", "*", "rust^x", "AND"] {
        let err = engine.search(keyword, "article").unwrap_err();
        assert!(matches!(err, Error::QueryParse(_)), "{keyword:?}: {err}");

        let err = engine.search_page(keyword, "article", 1, 10).unwrap_err();
        assert!(matches!(err, Error::SearchExecution(_)), "{keyword:?}: {err}");
        assert!(err.is_query_parse());
    }
}

#[test]
fn test_not_initialized() {
    let dir = tempfile::tempdir().unwrap();
    let engine = SearchEngine::new(
        SearchConfig::with_index_path(dir.path().join("index")),
        Arc::new(sift::MemoryContentStore::new()),
    );

    assert!(matches!(engine.search("rust", "article"), Err(Error::NotInitialized)));
    assert!(matches!(engine.search_page("rust", "article", 1, 10), Err(Error::NotInitialized)));
    assert!(matches!(engine.delete_bean("1"), Err(Error::NotInitialized)));
    assert!(matches!(engine.stats(), Err(Error::NotInitialized)));
    assert!(!dir.path().join("index").exists());
}

#[test]
fn test_reindex_is_idempotent() {
    let (dir, engine) = engine_with(rust_articles(12));
    engine.reindex_module("article").unwrap();
    let once = stored_by_id(&engine);

    engine.reindex_module("article").unwrap();
    let twice = stored_by_id(&engine);
    assert_eq!(once, twice);
    assert_eq!(engine.stats().unwrap().live_docs, 12);

    // Same again through a fresh engine on the same directory
    let reopened = reopen(&dir, rust_articles(12));
    assert_eq!(stored_by_id(&reopened), once);
}

fn stored_by_id(engine: &TestEngine) -> BTreeMap<String, (String, String, String, String, String)> {
    engine
        .search_page("rust", "article", 1, 100)
        .unwrap()
        .items
        .into_iter()
        .map(|h| (h.id, (h.module, h.title, h.content, h.url, h.created_year)))
        .collect()
}

#[test]
fn test_reindex_report() {
    let mut records = rust_articles(4);
    records.push(record(50, "page", "about", "about us", 2014));
    let (_dir, engine) = engine_with(records);

    let report = engine.reindex_module("article").unwrap();
    assert_eq!(report.indexed, 4);
    assert_eq!(report.module, "article");
    assert_eq!(engine.reindex_module("forum").unwrap().indexed, 0);
    assert_eq!(engine.stats().unwrap().live_docs, 4);
}

#[test]
fn test_index_survives_reopen() {
    let (dir, engine) = engine_with(two_articles());
    engine.reindex_module("article").unwrap();
    drop(engine);

    let engine = reopen(&dir, two_articles());
    assert_eq!(ids(&engine.search("ownership", "article").unwrap()), vec!["1"]);
}

#[test]
fn test_analyzer_mismatch_fails_open() {
    let (dir, engine) = engine_with(two_articles());
    engine.reindex_module("article").unwrap();
    drop(engine);

    let config = SearchConfig::with_index_path(dir.path().join("index")).analyzer(AnalyzerKind::Cjk);
    let engine = SearchEngine::new(config, sift::MemoryContentStore::new());
    assert!(matches!(engine.init(), Err(Error::StoreOpen { .. })));
    assert!(!engine.is_initialized());
}

#[test]
fn test_dangling_hits_are_kept() {
    let (_dir, engine) = engine_with(two_articles());
    engine.reindex_module("article").unwrap();
    engine.content_store().remove(1);

    let page = engine.search_page("ownership", "article", 1, 10).unwrap();
    assert_eq!(ids(&page), vec!["1"]);
    assert!(page.items[0].record.is_none());
    assert_eq!(page.items[0].title, "rust ownership");
    assert!(engine.content_store().find_by_id(1).unwrap().is_none());
}

#[test]
fn test_concurrent_writers() {
    let (_dir, engine) = engine_with(Vec::new());

    std::thread::scope(|scope| {
        for t in 0..4u64 {
            let engine = &engine;
            scope.spawn(move || {
                for i in 0..10u64 {
                    let id = t * 100 + i;
                    let doc = IndexableDocument::from_content(&record(id, "article", "rust threads", "shared", 2016));
                    engine.add_bean(&doc).unwrap();
                }
            });
        }
    });

    assert_eq!(engine.stats().unwrap().live_docs, 40);
    assert_eq!(engine.search_page("threads", "article", 1, 10).unwrap().total_items, 40);
}

#[test]
fn test_segments_are_merged() {
    let (_dir, engine) = engine_with_config(rust_articles(9), |config| SearchConfig {
        max_segments: 3,
        ..config
    });
    engine.reindex_module("article").unwrap();

    let stats = engine.stats().unwrap();
    assert!(stats.segments <= 3, "{} segments", stats.segments);
    assert_eq!(stats.live_docs, 9);
    assert_eq!(all_pages(&engine, "rust", "article", 2).len(), 9);
}

#[test]
fn test_compact_drops_deleted() {
    let (_dir, engine) = engine_with(rust_articles(6));
    engine.reindex_module("article").unwrap();
    engine.delete_bean("2").unwrap();
    engine.delete_bean("5").unwrap();

    let before = engine.stats().unwrap();
    assert_eq!(before.live_docs, 4);

    let info = engine.compact().unwrap();
    assert!(info.merged);
    assert_eq!(info.segments, 1);

    let after = engine.stats().unwrap();
    assert_eq!(after.deleted_docs, 0);
    assert_eq!(after.live_docs, 4);
    assert_eq!(all_pages(&engine, "rust", "article", 3).len(), 4);
}

#[test]
fn test_count_cap_bounds_totals() {
    let (_dir, engine) = engine_with_config(rust_articles(10), |config| SearchConfig {
        count_cap: 4,
        ..config
    });
    engine.reindex_module("article").unwrap();

    let page = engine.search_page("rust", "article", 1, 2).unwrap();
    assert_eq!(page.total_items, 4);
    assert_eq!(page.total_pages, 2);
}

#[test]
fn test_cjk_analyzer() {
    let (_dir, engine) = engine_with_config(
        vec![
            record(1, "article", "中文搜索引擎", "全文检索", 2016),
            record(2, "article", "英文内容", "其他", 2016),
        ],
        |config| config.analyzer(AnalyzerKind::Cjk),
    );
    engine.reindex_module("article").unwrap();

    assert_eq!(ids(&engine.search("搜索", "article").unwrap()), vec!["1"]);
    assert_eq!(ids(&engine.search("\"全文检索\"", "article").unwrap()), vec!["1"]);
}

/// Serves records until switched off, then fails every lookup
struct FlakyStore {
    records: sift::MemoryContentStore,
    down: AtomicBool,
}

impl ContentStore for FlakyStore {
    fn find_by_id(&self, id: u64) -> sift::Result<Option<Content>> {
        if self.down.load(Ordering::SeqCst) {
            return Err(Error::ContentStore("db down".into()));
        }
        self.records.find_by_id(id)
    }

    fn find_by_module(&self, module: &str) -> sift::Result<Vec<Content>> {
        self.records.find_by_module(module)
    }
}

#[test]
fn test_content_store_failure_fails_search() {
    let dir = tempfile::tempdir().unwrap();
    let store = FlakyStore {
        records: sift::MemoryContentStore::from_records(two_articles()),
        down: AtomicBool::new(false),
    };
    let engine = SearchEngine::new(SearchConfig::with_index_path(dir.path().join("index")), store);
    engine.init().unwrap();
    engine.reindex_module("article").unwrap();
    assert!(!engine.search_page("ownership", "article", 1, 10).unwrap().items[0].is_dangling());

    engine.content_store().down.store(true, Ordering::SeqCst);
    for err in [
        engine.search_page("ownership", "article", 1, 10).unwrap_err(),
        engine.search("ownership", "article").unwrap_err(),
    ] {
        match err {
            Error::SearchExecution(inner) => assert!(matches!(*inner, Error::ContentStore(_))),
            other => panic!("unexpected {other:?}"),
        }
    }

    // No hits means nothing to look up
    assert!(engine.search_page("goroutine", "page", 1, 10).unwrap().items.is_empty());
}

#[test]
fn test_invalid_config_fails_init() {
    let dir = tempfile::tempdir().unwrap();
    let config = SearchConfig {
        count_cap: 0,
        ..SearchConfig::with_index_path(dir.path().join("index"))
    };
    let engine = SearchEngine::new(config, sift::MemoryContentStore::new());
    assert!(matches!(engine.init(), Err(Error::StoreOpen { .. })));
    assert!(!engine.is_initialized());
}
