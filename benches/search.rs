//! Search benchmarks
//!
//! Run with: cargo bench

use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sift::index::IndexStore;
use sift::query::{build_query, parse_keyword};
use sift::{AnalyzerKind, IndexableDocument, MemoryContentStore, SearchConfig, SearchEngine};
use tempfile::TempDir;

const WORDS: &[&str] = &[
    "rust", "ownership", "borrow", "checker", "lifetime", "trait", "generic", "async", "future",
    "channel", "thread", "mutex", "segment", "index", "query", "search", "page", "module",
];

/// Build an index of `docs` articles in one commit
fn create_benchmark_index(docs: u64) -> (TempDir, SearchConfig) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = SearchConfig::with_index_path(temp_dir.path().join("index"));
    let store = IndexStore::open(&config).expect("Failed to open index");

    store
        .with_writer(|writer| {
            for id in 0..docs {
                let word = |k: u64| WORDS[((id * 7 + k * 13) % WORDS.len() as u64) as usize];
                let title = format!("{} {} {}", word(1), word(2), word(3));
                let content = (0..40).map(word).collect::<Vec<_>>().join(" ");
                writer.add_document(&IndexableDocument {
                    id: id.to_string(),
                    module: if id % 5 == 0 { "page" } else { "article" }.to_string(),
                    title,
                    content: content.clone(),
                    description: content,
                    url: format!("/article/{id}"),
                    created: Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap(),
                });
            }
            Ok(())
        })
        .expect("Failed to build index");

    (temp_dir, config)
}

fn bench_keyword_parsing(c: &mut Criterion) {
    let keywords = vec![
        "simple",
        "two words",
        "\"exact phrase\"",
        "+required -prohibited",
        "owner* trait^2",
        "complex AND (query OR search) NOT exclude",
    ];

    let mut group = c.benchmark_group("keyword_parsing");
    for keyword in keywords {
        group.bench_with_input(BenchmarkId::from_parameter(keyword), &keyword, |b, &k| {
            b.iter(|| parse_keyword(black_box(k)))
        });
    }
    group.finish();

    c.bench_function("build_query", |b| {
        b.iter(|| build_query(black_box("rust \"borrow checker\" -async"), "article", AnalyzerKind::Standard))
    });
}

fn bench_search(c: &mut Criterion) {
    let (_temp_dir, config) = create_benchmark_index(5_000);
    let engine = SearchEngine::new(config, MemoryContentStore::new());
    engine.init().expect("Failed to open index");

    let mut group = c.benchmark_group("search");

    group.bench_function("simple_word", |b| {
        b.iter(|| engine.search(black_box("ownership"), "article"))
    });

    group.bench_function("phrase", |b| {
        b.iter(|| engine.search(black_box("\"borrow checker\""), "article"))
    });

    group.bench_function("prefix", |b| {
        b.iter(|| engine.search(black_box("own*"), "article"))
    });

    group.finish();

    // Offset replay makes deep pages cost more
    let mut group = c.benchmark_group("page_depth");
    for page in [1usize, 10, 50, 200] {
        group.bench_with_input(BenchmarkId::from_parameter(page), &page, |b, &page| {
            b.iter(|| engine.search_page(black_box("rust OR trait"), "article", page, 10))
        });
    }
    group.finish();
}

fn bench_index_open(c: &mut Criterion) {
    let (temp_dir, _config) = create_benchmark_index(2_000);
    let path = temp_dir.path().join("index");

    c.bench_function("reader_open", |b| {
        b.iter(|| sift::index::IndexReader::open(black_box(&path)))
    });
}

criterion_group!(benches, bench_keyword_parsing, bench_search, bench_index_open);

criterion_main!(benches);
