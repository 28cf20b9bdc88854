use crate::error::Result;
use crate::index::compact::{merge_segments, select_merge};
use crate::index::document::{FieldDocument, IndexableDocument, to_document};
use crate::index::reader::IndexReader;
use crate::index::segment::SegmentBuilder;
use crate::index::types::*;
use crate::utils::AnalyzerKind;
use roaring::RoaringBitmap;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitInfo {
    pub generation: u64,
    pub segments: usize,
    pub live_docs: u64,
    /// True if the commit merged segments
    pub merged: bool,
    /// Live documents copied into the merged segment
    pub rewritten_docs: u64,
}

/// Buffered changes against one committed snapshot.
///
/// Nothing is visible to readers until [`IndexWriter::commit`]; dropping a
/// writer discards its changes. Obtain one through
/// [`crate::index::IndexStore::with_writer`], which holds the write lock.
pub struct IndexWriter {
    index_path: PathBuf,
    analyzer: AnalyzerKind,
    max_segments: usize,
    base: IndexMeta,
    /// Documents added in this session; `None` once deleted again
    pending: Vec<Option<FieldDocument>>,
    /// Ids to delete from the committed segments
    deleted_ids: BTreeSet<String>,
    force_merge: bool,
}

impl IndexWriter {
    pub(crate) fn new(index_path: &Path, base: IndexMeta, max_segments: usize) -> Self {
        Self {
            index_path: index_path.to_path_buf(),
            analyzer: base.analyzer,
            max_segments: max_segments.max(1),
            base,
            pending: Vec::new(),
            deleted_ids: BTreeSet::new(),
            force_merge: false,
        }
    }

    /// Buffer a document for indexing
    pub fn add_document(&mut self, doc: &IndexableDocument) {
        self.pending.push(Some(to_document(doc)));
    }

    /// Delete every document whose id equals `id`: committed ones and the
    /// ones added earlier in this session
    pub fn delete_by_id(&mut self, id: &str) {
        for slot in &mut self.pending {
            if slot.as_ref().is_some_and(|doc| doc.id() == id) {
                *slot = None;
            }
        }
        self.deleted_ids.insert(id.to_string());
    }

    /// Rewrite the whole index into a single segment on commit, instead of
    /// merging only the smallest segments once there are too many
    pub fn force_merge(&mut self) {
        self.force_merge = true;
    }

    /// Documents added and still pending
    pub fn pending_adds(&self) -> usize {
        self.pending.iter().filter(|d| d.is_some()).count()
    }

    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty() || !self.deleted_ids.is_empty() || self.force_merge
    }

    /// The snapshot this writer started from
    pub fn base(&self) -> &IndexMeta {
        &self.base
    }

    /// Publish all buffered changes atomically
    pub fn commit(self) -> Result<CommitInfo> {
        if !self.has_changes() {
            return Ok(CommitInfo {
                generation: self.base.generation,
                segments: self.base.segments.len(),
                live_docs: self.base.live_docs(),
                merged: false,
                rewritten_docs: 0,
            });
        }

        let segments_path = self.index_path.join(SEGMENTS_DIR);
        fs::create_dir_all(&segments_path)?;

        let mut meta = self.base.clone();
        self.apply_deletes(&mut meta, &segments_path)?;

        let mut builder = SegmentBuilder::new(self.analyzer);
        for doc in self.pending.into_iter().flatten() {
            builder.add(doc);
        }
        if !builder.is_empty() {
            let id = meta.next_segment_id;
            meta.next_segment_id += 1;
            let doc_count = builder.write(&segments_path.join(segment_dir_name(id)))?;
            debug!(target: "sift::index", segment = id, docs = doc_count, "Wrote segment");
            meta.segments.push(SegmentMeta {
                id,
                doc_count,
                del_gen: 0,
                deleted: 0,
            });
        }

        // Fully deleted segments carry nothing readers need
        meta.segments.retain(|s| s.live_docs() > 0);

        let chosen: Vec<usize> = if self.force_merge {
            if meta.segments.len() > 1 || meta.deleted_docs() > 0 {
                (0..meta.segments.len()).collect()
            } else {
                Vec::new()
            }
        } else {
            select_merge(&meta.segments, self.max_segments)
        };
        let merged = !chosen.is_empty();
        let mut rewritten_docs = 0;
        if merged {
            let reader = IndexReader::open_snapshot(&self.index_path, meta.clone())?;
            let id = meta.next_segment_id;
            meta.next_segment_id += 1;
            let dest = segments_path.join(segment_dir_name(id));
            let written = merge_segments(
                chosen.iter().map(|&ord| &reader.segments()[ord]),
                self.analyzer,
                &dest,
            )?;

            let from = chosen.len();
            let mut ord = 0;
            meta.segments.retain(|_| {
                let keep = !chosen.contains(&ord);
                ord += 1;
                keep
            });
            if let Some(doc_count) = written {
                rewritten_docs = u64::from(doc_count);
                meta.segments.push(SegmentMeta {
                    id,
                    doc_count,
                    del_gen: 0,
                    deleted: 0,
                });
            }
            info!(
                target: "sift::index",
                from,
                segment = id,
                docs = rewritten_docs,
                remaining = meta.segments.len(),
                "Merged segments"
            );
        }

        meta.generation += 1;
        meta.updated_at = unix_now();
        write_meta(&self.index_path, &meta)?;

        info!(
            target: "sift::index",
            generation = meta.generation,
            segments = meta.segments.len(),
            live_docs = meta.live_docs(),
            "Committed"
        );

        if let Err(e) = collect_garbage(&self.index_path, &meta) {
            warn!(target: "sift::index", error = %e, "Failed to remove unreferenced index files");
        }

        Ok(CommitInfo {
            generation: meta.generation,
            segments: meta.segments.len(),
            live_docs: meta.live_docs(),
            merged,
            rewritten_docs,
        })
    }

    /// Write a new deletes generation for every committed segment that
    /// holds a deleted id
    fn apply_deletes(&self, meta: &mut IndexMeta, segments_path: &Path) -> Result<()> {
        if self.deleted_ids.is_empty() || self.base.segments.is_empty() {
            return Ok(());
        }

        let reader = IndexReader::open_snapshot(&self.index_path, self.base.clone())?;
        for (ord, segment) in reader.segments().iter().enumerate() {
            let mut hits = RoaringBitmap::new();
            for id in &self.deleted_ids {
                hits.extend(segment.docs_with_id(id)?);
            }
            if hits.is_empty() {
                continue;
            }

            let deletes = segment.deletes() | &hits;
            let seg_meta = &mut meta.segments[ord];
            seg_meta.del_gen += 1;
            seg_meta.deleted = deletes.len() as u32;

            let path = segments_path
                .join(seg_meta.dir_name())
                .join(deletes_file_name(seg_meta.del_gen));
            let mut file = BufWriter::new(File::create(&path)?);
            deletes.serialize_into(&mut file)?;
            file.flush()?;

            debug!(target: "sift::index", segment = seg_meta.id, deleted = seg_meta.deleted, "Wrote deletes");
        }
        Ok(())
    }
}

/// Replace meta.json atomically
pub fn write_meta(index_path: &Path, meta: &IndexMeta) -> Result<()> {
    let meta_path = index_path.join(META_FILE);
    let tmp_path = index_path.join(format!("{}.tmp", META_FILE));

    let mut file = BufWriter::new(File::create(&tmp_path)?);
    serde_json::to_writer_pretty(&mut file, meta)?;
    file.flush()?;
    file.get_ref().sync_all()?;
    drop(file);

    fs::rename(&tmp_path, &meta_path)?;
    Ok(())
}

/// Remove segment directories and deletes files that `meta` does not
/// reference
fn collect_garbage(index_path: &Path, meta: &IndexMeta) -> Result<()> {
    let segments_path = index_path.join(SEGMENTS_DIR);
    if !segments_path.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(&segments_path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();

        match meta.segments.iter().find(|s| s.dir_name() == name) {
            None => {
                debug!(target: "sift::index", segment = %name, "Removing unreferenced segment");
                fs::remove_dir_all(entry.path())?;
            }
            Some(seg) => {
                let live = seg.deletes_file();
                for file in fs::read_dir(entry.path())? {
                    let file = file?;
                    let file_name = file.file_name().to_string_lossy().to_string();
                    let stale = file_name.starts_with("deletes_")
                        && live.as_deref() != Some(file_name.as_str());
                    if stale {
                        fs::remove_file(file.path())?;
                    }
                }
            }
        }
    }
    Ok(())
}
