//! # sift - persistent full-text search for content modules
//!
//! sift keeps a segmented inverted index of content records on disk and
//! answers keyword searches restricted to one module, either as a single
//! top-N list or page by page with total counts.
//!
//! ## Architecture
//!
//! - [`index`] - On-disk segments, the single writer and point-in-time readers
//! - [`query`] - Keyword parsing, query building and BM25-ranked execution
//! - [`engine`] - The [`SearchEngine`] facade tying index, query and content together
//! - [`content`] - The authoritative record store hits are resolved against
//! - [`hydrate`] - Joining ranked hits with their records
//! - [`utils`] - Text analysis, encoding and path helpers
//!
//! ## Quick Start
//!
//! ```no_run
//! use sift::{MemoryContentStore, SearchConfig, SearchEngine};
//!
//! # fn main() -> sift::Result<()> {
//! let content = MemoryContentStore::load_json("content.json".as_ref())?;
//! let engine = SearchEngine::new(SearchConfig::with_index_path("/tmp/sift"), content);
//! engine.init()?;
//! engine.reindex_module("article")?;
//!
//! let page = engine.search_page("rust ownership", "article", 1, 10)?;
//! for hit in &page.items {
//!     println!("{} {} ({:.2})", hit.id, hit.title, hit.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod hydrate;
pub mod index;
#[cfg(feature = "cli")]
pub mod output;
pub mod page;
pub mod query;
pub mod utils;

pub use config::SearchConfig;
pub use content::{Content, ContentStore, MemoryContentStore};
pub use engine::{ReindexReport, SearchEngine};
pub use error::{Error, QueryParseError, Result};
pub use hydrate::SearchHit;
pub use index::IndexableDocument;
pub use page::Page;
pub use utils::AnalyzerKind;
