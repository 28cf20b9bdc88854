//! Segmented on-disk inverted index.
//!
//! Layout of an index directory:
//!
//! ```text
//! meta.json            commit point: analyzer, generation, live segments
//! write.lock           advisory lock held by the single writer
//! segments/seg_NNNNNN  immutable segment files, see [`segment`]
//! ```

pub mod compact;
pub mod document;
pub mod postings;
pub mod reader;
pub mod segment;
pub mod stats;
pub mod store;
pub mod types;
pub mod writer;

pub use document::{FieldDocument, IndexableDocument, to_document};
pub use reader::{FieldStats, IndexReader, SegmentReader};
pub use stats::IndexStats;
pub use store::IndexStore;
pub use types::*;
pub use writer::{CommitInfo, IndexWriter};
