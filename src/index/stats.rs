use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::index::types::Field;
use crate::utils::{AnalyzerKind, dir_size};
use serde::Serialize;

/// Summary of a committed index snapshot
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub analyzer: AnalyzerKind,
    pub generation: u64,
    pub segments: usize,
    pub live_docs: u64,
    /// Deleted but not yet merged away
    pub deleted_docs: u64,
    /// Dictionary size per indexed field, summed over segments
    pub terms: Vec<(Field, u64)>,
    pub size_bytes: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl IndexStats {
    pub fn collect(reader: &IndexReader) -> Result<Self> {
        let meta = reader.meta();

        let terms = Field::indexed()
            .map(|field| {
                let count = reader
                    .segments()
                    .iter()
                    .filter_map(|s| s.term_dict(field))
                    .map(|d| d.len() as u64)
                    .sum();
                (field, count)
            })
            .collect();

        Ok(Self {
            analyzer: meta.analyzer,
            generation: meta.generation,
            segments: meta.segments.len(),
            live_docs: reader.num_docs(),
            deleted_docs: meta.deleted_docs(),
            terms,
            size_bytes: dir_size(reader.path())?,
            created_at: meta.created_at,
            updated_at: meta.updated_at,
        })
    }

    /// Terms in one field's dictionaries
    pub fn term_count(&self, field: Field) -> u64 {
        self.terms
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}
