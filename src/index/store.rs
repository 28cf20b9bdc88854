//! Lifecycle of the on-disk index: open, scoped writers and fresh readers.

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::index::reader::{IndexReader, read_meta};
use crate::index::stats::IndexStats;
use crate::index::types::*;
use crate::index::writer::{CommitInfo, IndexWriter, write_meta};
use crate::utils::AnalyzerKind;
use parking_lot::{Mutex, MutexGuard};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Poll interval while another process holds `write.lock`
const LOCK_POLL: Duration = Duration::from_millis(20);

/// Handle on one index directory
pub struct IndexStore {
    path: PathBuf,
    analyzer: AnalyzerKind,
    lock_timeout: Duration,
    max_segments: usize,
    /// Serializes writers inside this process
    gate: Mutex<()>,
}

/// Held for the whole life of a writer session
struct WriteLock<'a> {
    _gate: MutexGuard<'a, ()>,
    file: File,
}

impl Drop for WriteLock<'_> {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

impl IndexStore {
    /// Open the index at the configured path, creating the directory and an
    /// empty index if needed. Every failure is reported as
    /// [`Error::StoreOpen`].
    pub fn open(config: &SearchConfig) -> Result<Self> {
        let path = config.resolved_index_path();
        Self::open_at(&path, config).map_err(|e| match e {
            e @ Error::StoreOpen { .. } => e,
            other => Error::store_open(&path, other),
        })
    }

    fn open_at(path: &Path, config: &SearchConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(path)?;

        let store = Self {
            path: path.to_path_buf(),
            analyzer: config.analyzer,
            lock_timeout: Duration::from_millis(config.writer_lock_timeout_ms),
            max_segments: config.max_segments,
            gate: Mutex::new(()),
        };

        if !path.join(META_FILE).exists() {
            let _lock = store.acquire()?;
            // Another process may have won the race
            if !path.join(META_FILE).exists() {
                write_meta(path, &IndexMeta::new(config.analyzer, unix_now()))?;
                info!(target: "sift::index", path = %path.display(), analyzer = %config.analyzer, "Created index");
            }
        }

        let reader = IndexReader::open(path)?;
        let meta = reader.meta();
        if meta.version != INDEX_VERSION {
            return Err(Error::store_open(
                path,
                format!("unsupported index version {}", meta.version),
            ));
        }
        if meta.analyzer != config.analyzer {
            return Err(Error::store_open(
                path,
                format!(
                    "index was built with the {} analyzer but {} is configured",
                    meta.analyzer, config.analyzer
                ),
            ));
        }

        info!(
            target: "sift::index",
            path = %path.display(),
            generation = meta.generation,
            segments = meta.segments.len(),
            docs = reader.num_docs(),
            "Opened index"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn analyzer(&self) -> AnalyzerKind {
        self.analyzer
    }

    /// Run `f` against a writer and commit what it buffered. The write lock
    /// is held for the duration and released on every exit path; if `f`
    /// fails nothing is committed.
    pub fn with_writer<T>(&self, f: impl FnOnce(&mut IndexWriter) -> Result<T>) -> Result<T> {
        self.write_session(f).map(|(value, _)| value)
    }

    fn write_session<T>(
        &self,
        f: impl FnOnce(&mut IndexWriter) -> Result<T>,
    ) -> Result<(T, CommitInfo)> {
        let _lock = self.acquire()?;
        let base = read_meta(&self.path)?;
        let mut writer = IndexWriter::new(&self.path, base, self.max_segments);

        let value = match f(&mut writer) {
            Ok(value) => value,
            Err(e) => {
                debug!(
                    target: "sift::index",
                    pending = writer.pending_adds(),
                    error = %e,
                    "Writer session failed, discarding changes"
                );
                return Err(e);
            }
        };

        let info = writer.commit()?;
        Ok((value, info))
    }

    /// Fresh point-in-time view of the committed index
    pub fn new_reader(&self) -> Result<IndexReader> {
        IndexReader::open(&self.path)
    }

    /// Merge every segment into one, dropping deleted documents
    pub fn compact(&self) -> Result<CommitInfo> {
        let ((), info) = self.write_session(|writer| {
            writer.force_merge();
            Ok(())
        })?;
        Ok(info)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        IndexStats::collect(&self.new_reader()?)
    }

    fn acquire(&self) -> Result<WriteLock<'_>> {
        let deadline = Instant::now() + self.lock_timeout;

        let gate = self.gate.try_lock_for(self.lock_timeout).ok_or_else(|| {
            Error::MutationLock(format!(
                "timed out after {}ms waiting for the index writer",
                self.lock_timeout.as_millis()
            ))
        })?;

        let lock_path = self.path.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)?;

        loop {
            match fs2::FileExt::try_lock_exclusive(&file) {
                Ok(()) => break,
                Err(_) if Instant::now() < deadline => thread::sleep(LOCK_POLL),
                Err(e) => {
                    return Err(Error::MutationLock(format!(
                        "{} is held by another writer: {}",
                        lock_path.display(),
                        e
                    )));
                }
            }
        }

        Ok(WriteLock { _gate: gate, file })
    }
}
