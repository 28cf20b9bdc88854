use crate::utils::AnalyzerKind;
use serde::{Deserialize, Serialize};

/// Segment-local document number
pub type DocId = u32;

/// Segment identifier
pub type SegmentId = u32;

/// On-disk format version written to meta.json
pub const INDEX_VERSION: u32 = 1;

pub const META_FILE: &str = "meta.json";
pub const LOCK_FILE: &str = "write.lock";
pub const SEGMENTS_DIR: &str = "segments";

/// How a field is indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Stored only, not searchable
    NotIndexed,
    /// The whole value is a single term
    Exact,
    /// Analyzed into positional terms
    Text,
}

/// The document schema. Every field is stored; the index mode decides what
/// queries can reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Module,
    Title,
    Content,
    Description,
    Url,
    CreatedYear,
}

impl Field {
    pub const COUNT: usize = 7;

    pub const ALL: [Field; Field::COUNT] = [
        Field::Id,
        Field::Module,
        Field::Title,
        Field::Content,
        Field::Description,
        Field::Url,
        Field::CreatedYear,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Module => "module",
            Field::Title => "title",
            Field::Content => "content",
            Field::Description => "description",
            Field::Url => "url",
            Field::CreatedYear => "created",
        }
    }

    pub fn index_mode(self) -> IndexMode {
        match self {
            Field::Id | Field::Module | Field::CreatedYear => IndexMode::Exact,
            Field::Title | Field::Content => IndexMode::Text,
            Field::Description | Field::Url => IndexMode::NotIndexed,
        }
    }

    pub fn is_indexed(self) -> bool {
        self.index_mode() != IndexMode::NotIndexed
    }

    /// Fields with an inverted index
    pub fn indexed() -> impl Iterator<Item = Field> {
        Self::ALL.into_iter().filter(|f| f.is_indexed())
    }

    #[inline]
    pub fn ordinal(self) -> usize {
        self as usize
    }
}

/// Position of a document inside a reader snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocAddress {
    pub segment_ord: usize,
    pub doc: DocId,
}

/// Segment entry in meta.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub id: SegmentId,
    pub doc_count: u32,
    /// Generation of the deletes file; 0 means no deletions
    #[serde(default)]
    pub del_gen: u32,
    #[serde(default)]
    pub deleted: u32,
}

impl SegmentMeta {
    pub fn dir_name(&self) -> String {
        segment_dir_name(self.id)
    }

    pub fn deletes_file(&self) -> Option<String> {
        (self.del_gen > 0).then(|| deletes_file_name(self.del_gen))
    }

    pub fn live_docs(&self) -> u32 {
        self.doc_count.saturating_sub(self.deleted)
    }
}

pub fn segment_dir_name(id: SegmentId) -> String {
    format!("seg_{:06}", id)
}

pub fn deletes_file_name(del_gen: u32) -> String {
    format!("deletes_{}.bin", del_gen)
}

/// Index metadata stored in meta.json. This file is the commit point: a
/// segment or deletes file is live only once meta.json references it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub analyzer: AnalyzerKind,
    /// Incremented on every commit
    pub generation: u64,
    pub next_segment_id: SegmentId,
    pub segments: Vec<SegmentMeta>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl IndexMeta {
    pub fn new(analyzer: AnalyzerKind, now: u64) -> Self {
        Self {
            version: INDEX_VERSION,
            analyzer,
            generation: 0,
            next_segment_id: 1,
            segments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn live_docs(&self) -> u64 {
        self.segments.iter().map(|s| s.live_docs() as u64).sum()
    }

    pub fn deleted_docs(&self) -> u64 {
        self.segments.iter().map(|s| s.deleted as u64).sum()
    }
}

/// Seconds since the unix epoch
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_ordinals_match_all() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.ordinal(), i);
        }
    }

    #[test]
    fn test_schema_modes() {
        let indexed: Vec<Field> = Field::indexed().collect();
        assert_eq!(
            indexed,
            vec![Field::Id, Field::Module, Field::Title, Field::Content, Field::CreatedYear]
        );
        assert_eq!(Field::Description.index_mode(), IndexMode::NotIndexed);
        assert_eq!(Field::Title.index_mode(), IndexMode::Text);
        assert_eq!(Field::Module.index_mode(), IndexMode::Exact);
    }

    #[test]
    fn test_segment_names() {
        let seg = SegmentMeta {
            id: 12,
            doc_count: 10,
            del_gen: 3,
            deleted: 4,
        };
        assert_eq!(seg.dir_name(), "seg_000012");
        assert_eq!(seg.deletes_file().as_deref(), Some("deletes_3.bin"));
        assert_eq!(seg.live_docs(), 6);

        let clean = SegmentMeta { del_gen: 0, ..seg };
        assert!(clean.deletes_file().is_none());
    }

    #[test]
    fn test_meta_counts() {
        let mut meta = IndexMeta::new(AnalyzerKind::Standard, 0);
        meta.segments.push(SegmentMeta { id: 1, doc_count: 5, del_gen: 1, deleted: 2 });
        meta.segments.push(SegmentMeta { id: 2, doc_count: 3, del_gen: 0, deleted: 0 });
        assert_eq!(meta.live_docs(), 6);
        assert_eq!(meta.deleted_docs(), 2);
    }
}
