use crate::error::{Error, Result};
use crate::index::document::FieldDocument;
use crate::index::postings::{FileData, Posting, TermDict, TermDictEntry, decode_postings, read_term_dict};
use crate::index::segment::{STORE_FILE, STORE_INDEX_FILE, dict_file, norms_file, postings_file};
use crate::index::types::*;
use crate::utils::read_str;
use rayon::prelude::*;
use roaring::RoaringBitmap;
use std::fs::{self, File};
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::debug;

/// How many times a reader re-reads meta.json when a commit removed
/// files of the snapshot it was opening
const OPEN_RETRIES: usize = 5;

/// Inverted index of one field in one segment
struct FieldIndex {
    dict: TermDict,
    postings: FileData,
}

/// Reader for a single immutable segment
pub struct SegmentReader {
    meta: SegmentMeta,
    /// Indexed by field ordinal; `None` for stored-only fields
    fields: Vec<Option<FieldIndex>>,
    /// Token count per doc, indexed by field ordinal; empty for non-text fields
    norms: Vec<Vec<u32>>,
    store: FileData,
    store_index: FileData,
    deletes: RoaringBitmap,
}

impl SegmentReader {
    /// Open a segment directory as described by its meta.json entry
    pub fn open(segment_dir: &Path, meta: &SegmentMeta) -> Result<Self> {
        let mut fields = Vec::with_capacity(Field::COUNT);
        let mut norms = Vec::with_capacity(Field::COUNT);

        for field in Field::ALL {
            if !field.is_indexed() {
                fields.push(None);
                norms.push(Vec::new());
                continue;
            }

            let dict = read_term_dict(&segment_dir.join(dict_file(field)))?;
            let postings = FileData::open(&segment_dir.join(postings_file(field)))?;
            fields.push(Some(FieldIndex { dict, postings }));

            if field.index_mode() == IndexMode::Text {
                norms.push(read_norms(&segment_dir.join(norms_file(field)), meta.doc_count)?);
            } else {
                norms.push(Vec::new());
            }
        }

        let store = FileData::open(&segment_dir.join(STORE_FILE))?;
        let store_index = FileData::open(&segment_dir.join(STORE_INDEX_FILE))?;
        if store_index.len() != meta.doc_count as usize * 8 {
            return Err(Error::Corruption(format!(
                "{}: store index holds {} bytes for {} docs",
                segment_dir.display(),
                store_index.len(),
                meta.doc_count
            )));
        }

        let deletes = match meta.deletes_file() {
            Some(name) => {
                let file = File::open(segment_dir.join(name))?;
                RoaringBitmap::deserialize_from(BufReader::new(file))?
            }
            None => RoaringBitmap::new(),
        };

        Ok(Self {
            meta: meta.clone(),
            fields,
            norms,
            store,
            store_index,
            deletes,
        })
    }

    pub fn meta(&self) -> &SegmentMeta {
        &self.meta
    }

    /// Number of docs ever written to this segment, deleted ones included
    pub fn max_doc(&self) -> u32 {
        self.meta.doc_count
    }

    pub fn num_live_docs(&self) -> u32 {
        self.max_doc().saturating_sub(self.deletes.len() as u32)
    }

    #[inline]
    pub fn is_deleted(&self, doc: DocId) -> bool {
        self.deletes.contains(doc)
    }

    pub fn deletes(&self) -> &RoaringBitmap {
        &self.deletes
    }

    pub fn live_docs(&self) -> impl Iterator<Item = DocId> + '_ {
        (0..self.max_doc()).filter(|&doc| !self.is_deleted(doc))
    }

    pub fn term_dict(&self, field: Field) -> Option<&TermDict> {
        self.fields[field.ordinal()].as_ref().map(|f| &f.dict)
    }

    /// Postings for a dictionary entry of `field`, deleted docs included
    pub fn read_postings(&self, field: Field, entry: &TermDictEntry) -> Result<Vec<Posting>> {
        match &self.fields[field.ordinal()] {
            Some(index) => decode_postings(index.postings.slice(entry.offset, entry.length)?),
            None => Ok(Vec::new()),
        }
    }

    /// Postings of an exact term, deleted docs included
    pub fn postings(&self, field: Field, term: &str) -> Result<Vec<Posting>> {
        match self.term_dict(field).and_then(|dict| dict.lookup(term)) {
            Some(entry) => self.read_postings(field, entry),
            None => Ok(Vec::new()),
        }
    }

    /// Number of docs containing `term`, deleted docs included
    pub fn doc_freq(&self, field: Field, term: &str) -> u32 {
        self.term_dict(field)
            .and_then(|dict| dict.lookup(term))
            .map(|e| e.doc_freq)
            .unwrap_or(0)
    }

    /// Token count of a text field in one doc
    pub fn field_length(&self, field: Field, doc: DocId) -> u32 {
        self.norms[field.ordinal()]
            .get(doc as usize)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_field_length(&self, field: Field) -> u64 {
        self.norms[field.ordinal()].iter().map(|&n| n as u64).sum()
    }

    /// Stored fields of a document
    pub fn stored(&self, doc: DocId) -> Result<FieldDocument> {
        let mut offset = self.store_offset(doc)?;
        let mut fields = FieldDocument::default();
        for field in Field::ALL {
            let (value, used) = self.read_stored_value(offset, field, doc)?;
            fields.set(field, value);
            offset += used;
        }
        Ok(fields)
    }

    /// Stored id of a document, without decoding the other fields
    pub fn stored_id(&self, doc: DocId) -> Result<String> {
        let offset = self.store_offset(doc)?;
        // The id is always the first stored field
        let (id, _) = self.read_stored_value(offset, Field::Id, doc)?;
        Ok(id.to_string())
    }

    fn store_offset(&self, doc: DocId) -> Result<usize> {
        if doc >= self.max_doc() {
            return Err(Error::Corruption(format!(
                "doc {} out of range in segment {}",
                doc, self.meta.id
            )));
        }
        let idx = doc as usize * 8;
        let mut offset_bytes = [0u8; 8];
        offset_bytes.copy_from_slice(&self.store_index[idx..idx + 8]);
        Ok(u64::from_le_bytes(offset_bytes) as usize)
    }

    fn read_stored_value(&self, offset: usize, field: Field, doc: DocId) -> Result<(&str, usize)> {
        self.store.get(offset..).and_then(read_str).ok_or_else(|| {
            Error::Corruption(format!(
                "stored field {} of doc {} unreadable in segment {}",
                field.name(),
                doc,
                self.meta.id
            ))
        })
    }

    /// Live docs whose id field equals `id`
    pub fn docs_with_id(&self, id: &str) -> Result<Vec<DocId>> {
        Ok(self
            .postings(Field::Id, id)?
            .into_iter()
            .map(|p| p.doc)
            .filter(|&doc| !self.is_deleted(doc))
            .collect())
    }
}

/// Read a norms file: one u32 per doc
fn read_norms(path: &Path, doc_count: u32) -> Result<Vec<u32>> {
    let bytes = fs::read(path)?;
    if bytes.len() != doc_count as usize * 4 {
        return Err(Error::Corruption(format!(
            "{}: {} bytes for {} docs",
            path.display(),
            bytes.len(),
            doc_count
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Collection-wide statistics of one field
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldStats {
    /// Docs in the snapshot, deleted ones included
    pub doc_count: u64,
    /// Sum of token counts over those docs
    pub total_length: u64,
}

impl FieldStats {
    pub fn avg_length(&self) -> f32 {
        if self.doc_count == 0 {
            0.0
        } else {
            self.total_length as f32 / self.doc_count as f32
        }
    }
}

/// A point-in-time view of the index. Commits made after it was opened are
/// not visible through it.
pub struct IndexReader {
    path: PathBuf,
    meta: IndexMeta,
    segments: Vec<SegmentReader>,
}

impl IndexReader {
    /// Open the latest committed snapshot
    pub fn open(path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            let meta = read_meta(path)?;
            match Self::open_snapshot(path, meta) {
                Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound && attempt < OPEN_RETRIES => {
                    attempt += 1;
                    debug!(target: "sift::index", attempt, error = %e, "Snapshot changed while opening, retrying");
                }
                other => return other,
            }
        }
    }

    /// Open the segments named by `meta`, loading them in parallel
    pub fn open_snapshot(path: &Path, meta: IndexMeta) -> Result<Self> {
        let segments_path = path.join(SEGMENTS_DIR);
        let segments = meta
            .segments
            .par_iter()
            .map(|seg| SegmentReader::open(&segments_path.join(seg.dir_name()), seg))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            path: path.to_path_buf(),
            meta,
            segments,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn segments(&self) -> &[SegmentReader] {
        &self.segments
    }

    pub fn segment(&self, ord: usize) -> Option<&SegmentReader> {
        self.segments.get(ord)
    }

    /// Live documents across all segments
    pub fn num_docs(&self) -> u64 {
        self.segments.iter().map(|s| s.num_live_docs() as u64).sum()
    }

    /// All documents across all segments, deleted ones included
    pub fn max_doc(&self) -> u64 {
        self.segments.iter().map(|s| s.max_doc() as u64).sum()
    }

    /// Index-wide document frequency of a term
    pub fn doc_freq(&self, field: Field, term: &str) -> u64 {
        self.segments
            .iter()
            .map(|s| s.doc_freq(field, term) as u64)
            .sum()
    }

    pub fn field_stats(&self, field: Field) -> FieldStats {
        FieldStats {
            doc_count: self.max_doc(),
            total_length: self.segments.iter().map(|s| s.total_field_length(field)).sum(),
        }
    }

    /// Stored fields of the document at `address`
    pub fn stored(&self, address: DocAddress) -> Result<FieldDocument> {
        let segment = self.segment(address.segment_ord).ok_or_else(|| {
            Error::Corruption(format!("no segment at ordinal {}", address.segment_ord))
        })?;
        segment.stored(address.doc)
    }

    /// Addresses of live docs whose id field equals `id`
    pub fn find_by_id(&self, id: &str) -> Result<Vec<DocAddress>> {
        let mut found = Vec::new();
        for (segment_ord, segment) in self.segments.iter().enumerate() {
            for doc in segment.docs_with_id(id)? {
                found.push(DocAddress { segment_ord, doc });
            }
        }
        Ok(found)
    }
}

/// Read the commit point
pub fn read_meta(path: &Path) -> Result<IndexMeta> {
    let file = File::open(path.join(META_FILE))?;
    let meta = serde_json::from_reader(BufReader::new(file))?;
    Ok(meta)
}
