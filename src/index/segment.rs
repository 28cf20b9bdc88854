//! Segment construction.
//!
//! A segment directory is immutable once written:
//! - `<field>.dict` / `<field>.postings` for every indexed field
//! - `<field>.norms` - u32 token count per document, text fields only
//! - `store.bin` - every field of every document, length-prefixed
//! - `store.idx` - u64 offset of each document in `store.bin`
//! - `deletes_<gen>.bin` - roaring bitmap of deleted docs (added later)

use crate::error::Result;
use crate::index::document::FieldDocument;
use crate::index::postings::{Posting, write_field_index};
use crate::index::types::{DocId, Field, IndexMode};
use crate::utils::{AnalyzerKind, write_str, write_u32_le, write_u64_le};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub const STORE_FILE: &str = "store.bin";
pub const STORE_INDEX_FILE: &str = "store.idx";

pub fn dict_file(field: Field) -> String {
    format!("{}.dict", field.name())
}

pub fn postings_file(field: Field) -> String {
    format!("{}.postings", field.name())
}

pub fn norms_file(field: Field) -> String {
    format!("{}.norms", field.name())
}

/// In-memory inverted index for one new segment
pub struct SegmentBuilder {
    analyzer: AnalyzerKind,
    docs: Vec<FieldDocument>,
    /// Field ordinal -> term -> postings (docs ascending)
    terms: Vec<BTreeMap<String, Vec<Posting>>>,
    /// Field ordinal -> token count per doc
    norms: Vec<Vec<u32>>,
}

impl SegmentBuilder {
    pub fn new(analyzer: AnalyzerKind) -> Self {
        Self {
            analyzer,
            docs: Vec::new(),
            terms: vec![BTreeMap::new(); Field::COUNT],
            norms: vec![Vec::new(); Field::COUNT],
        }
    }

    /// Invert and buffer a document
    pub fn add(&mut self, doc: FieldDocument) -> DocId {
        let doc_id = self.docs.len() as DocId;

        for field in Field::indexed() {
            let value = doc.get(field);
            let terms = &mut self.terms[field.ordinal()];
            match field.index_mode() {
                IndexMode::Exact => {
                    terms.entry(value.to_string()).or_default().push(Posting {
                        doc: doc_id,
                        positions: vec![0],
                    });
                }
                IndexMode::Text => {
                    let tokens = self.analyzer.analyze(value);
                    self.norms[field.ordinal()].push(tokens.len() as u32);

                    let mut by_term: BTreeMap<String, Vec<u32>> = BTreeMap::new();
                    for token in tokens {
                        by_term.entry(token.text).or_default().push(token.position);
                    }
                    for (term, positions) in by_term {
                        terms.entry(term).or_default().push(Posting {
                            doc: doc_id,
                            positions,
                        });
                    }
                }
                IndexMode::NotIndexed => {}
            }
        }

        self.docs.push(doc);
        doc_id
    }

    pub fn doc_count(&self) -> u32 {
        self.docs.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Write all segment files into `segment_dir`, which must not exist yet
    pub fn write(&self, segment_dir: &Path) -> Result<u32> {
        fs::create_dir_all(segment_dir)?;

        for field in Field::indexed() {
            write_field_index(
                &segment_dir.join(dict_file(field)),
                &segment_dir.join(postings_file(field)),
                &self.terms[field.ordinal()],
            )?;

            if field.index_mode() == IndexMode::Text {
                self.write_norms(field, segment_dir)?;
            }
        }

        self.write_store(segment_dir)?;
        Ok(self.doc_count())
    }

    fn write_norms(&self, field: Field, segment_dir: &Path) -> Result<()> {
        let mut file = BufWriter::new(File::create(segment_dir.join(norms_file(field)))?);
        for &len in &self.norms[field.ordinal()] {
            write_u32_le(&mut file, len)?;
        }
        file.flush()?;
        Ok(())
    }

    fn write_store(&self, segment_dir: &Path) -> Result<()> {
        let mut data = BufWriter::new(File::create(segment_dir.join(STORE_FILE))?);
        let mut index = BufWriter::new(File::create(segment_dir.join(STORE_INDEX_FILE))?);

        let mut offset: u64 = 0;
        for doc in &self.docs {
            write_u64_le(&mut index, offset)?;
            for (_, value) in doc.iter() {
                write_str(&mut data, value)?;
                offset += 4 + value.len() as u64;
            }
        }

        data.flush()?;
        index.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::postings::read_term_dict;

    fn segment_files() -> Vec<String> {
        let mut files = Vec::new();
        for field in Field::indexed() {
            files.push(dict_file(field));
            files.push(postings_file(field));
            if field.index_mode() == IndexMode::Text {
                files.push(norms_file(field));
            }
        }
        files.push(STORE_FILE.to_string());
        files.push(STORE_INDEX_FILE.to_string());
        files
    }

    fn doc(id: &str, module: &str, title: &str) -> FieldDocument {
        let mut doc = FieldDocument::default();
        doc.set(Field::Id, id);
        doc.set(Field::Module, module);
        doc.set(Field::Title, title);
        doc.set(Field::Content, "");
        doc.set(Field::CreatedYear, "2016");
        doc
    }

    #[test]
    fn test_builder_assigns_sequential_ids() {
        let mut builder = SegmentBuilder::new(AnalyzerKind::Standard);
        assert!(builder.is_empty());
        assert_eq!(builder.add(doc("1", "article", "a")), 0);
        assert_eq!(builder.add(doc("2", "article", "b")), 1);
        assert_eq!(builder.doc_count(), 2);
    }

    #[test]
    fn test_write_creates_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let seg = dir.path().join("seg_000001");

        let mut builder = SegmentBuilder::new(AnalyzerKind::Standard);
        builder.add(doc("1", "article", "Rust rust ownership"));
        builder.add(doc("2", "page", "About"));
        assert_eq!(builder.write(&seg).unwrap(), 2);

        for file in segment_files() {
            assert!(seg.join(&file).exists(), "missing {file}");
        }

        let title = read_term_dict(&seg.join(dict_file(Field::Title))).unwrap();
        assert_eq!(title.lookup("rust").unwrap().doc_freq, 1);
        assert!(title.lookup("Rust").is_none());

        // Exact fields keep the raw value
        let module = read_term_dict(&seg.join(dict_file(Field::Module))).unwrap();
        assert_eq!(module.lookup("article").unwrap().doc_freq, 1);

        let norms = fs::read(seg.join(norms_file(Field::Title))).unwrap();
        assert_eq!(norms.len(), 8);
        assert_eq!(u32::from_le_bytes(norms[..4].try_into().unwrap()), 3);
    }
}
