//! The search engine facade: incremental mutations, module reindexing and
//! keyword search over one index directory.

use crate::config::SearchConfig;
use crate::content::ContentStore;
use crate::error::{Error, Result};
use crate::hydrate::{SearchHit, hydrate};
use crate::index::document::IndexableDocument;
use crate::index::stats::IndexStats;
use crate::index::store::IndexStore;
use crate::index::writer::CommitInfo;
use crate::page::Page;
use crate::query::builder::{Query, build_query};
use crate::query::collector::ScoredDoc;
use crate::query::executor::Searcher;
use once_cell::sync::OnceCell;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Records between two reindex progress lines
const REINDEX_PROGRESS_EVERY: usize = 1000;

/// Outcome of [`SearchEngine::reindex_module`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReindexReport {
    pub module: String,
    pub indexed: usize,
    pub elapsed: Duration,
}

/// Full-text search over content records of a [`ContentStore`].
///
/// Every call opens its own writer or reader; the engine itself holds no
/// index state besides the open [`IndexStore`], so it can be shared across
/// threads.
pub struct SearchEngine<S: ContentStore> {
    config: SearchConfig,
    content: S,
    store: OnceCell<IndexStore>,
}

impl<S: ContentStore> SearchEngine<S> {
    /// Engine over `content`. Nothing touches the disk until [`init`](Self::init).
    pub fn new(config: SearchConfig, content: S) -> Self {
        Self {
            config,
            content,
            store: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn content_store(&self) -> &S {
        &self.content
    }

    /// Open or create the index. Calling it again after a success is a no-op;
    /// after a failure it retries.
    pub fn init(&self) -> Result<()> {
        self.store
            .get_or_try_init(|| IndexStore::open(&self.config))
            .map(|_| ())
    }

    pub fn is_initialized(&self) -> bool {
        self.store.get().is_some()
    }

    fn store(&self) -> Result<&IndexStore> {
        self.store.get().ok_or(Error::NotInitialized)
    }

    /// Index `doc`, replacing any document with the same id
    pub fn add_bean(&self, doc: &IndexableDocument) -> Result<()> {
        self.replace(doc)
    }

    /// Remove the document with `id`. Unknown ids are not an error.
    pub fn delete_bean(&self, id: &str) -> Result<()> {
        self.store()?.with_writer(|writer| {
            writer.delete_by_id(id);
            Ok(())
        })?;
        debug!(target: "sift::engine", id, "Deleted document");
        Ok(())
    }

    /// Delete then add, committed together
    pub fn update_bean(&self, doc: &IndexableDocument) -> Result<()> {
        self.replace(doc)
    }

    fn replace(&self, doc: &IndexableDocument) -> Result<()> {
        self.store()?.with_writer(|writer| {
            writer.delete_by_id(&doc.id);
            writer.add_document(doc);
            Ok(())
        })?;
        debug!(target: "sift::engine", id = %doc.id, module = %doc.module, "Indexed document");
        Ok(())
    }

    /// Top hits for `keyword` in `module`.
    ///
    /// The page descriptor is a fixed placeholder (page 1 of 100, size 10,
    /// 1000 items) whatever the result; use [`search_page`](Self::search_page)
    /// for real totals.
    pub fn search(&self, keyword: &str, module: &str) -> Result<Page<SearchHit>> {
        let store = self.store()?;
        let query = self.build(store, keyword, module)?;

        let started = Instant::now();
        let hits = self
            .top_hits(store, &query, self.config.simple_search_limit)
            .map_err(Error::search)?;
        debug!(
            target: "sift::search",
            keyword,
            module,
            hits = hits.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search"
        );
        Ok(Page::placeholder(hits))
    }

    /// Page `page_num` (1-based) of `page_size` hits for `keyword` in
    /// `module`, with the total match count.
    ///
    /// Every failure, keyword parse errors and invalid page requests
    /// included, is reported as [`Error::SearchExecution`]. A page past the
    /// last hit is empty but still carries the real totals.
    pub fn search_page(
        &self,
        keyword: &str,
        module: &str,
        page_num: usize,
        page_size: usize,
    ) -> Result<Page<SearchHit>> {
        let store = self.store()?;
        self.run_page(store, keyword, module, page_num, page_size)
            .map_err(Error::search)
    }

    fn run_page(
        &self,
        store: &IndexStore,
        keyword: &str,
        module: &str,
        page_num: usize,
        page_size: usize,
    ) -> Result<Page<SearchHit>> {
        let query = self.build(store, keyword, module)?;

        let started = Instant::now();
        let count_cap = self.config.count_cap;
        let reader = store.new_reader()?;
        let searcher = Searcher::new(&reader, self.config.scoring);
        let hits = searcher.page(&query, page_num, page_size)?;
        let total_items = searcher.count(&query, count_cap)?;
        let hits = self.resolve(&searcher, hits)?;

        if total_items >= count_cap {
            warn!(
                target: "sift::search",
                keyword,
                module,
                count_cap,
                "Match count reached the cap, totals are a lower bound"
            );
        }
        debug!(
            target: "sift::search",
            keyword,
            module,
            page_num,
            page_size,
            hits = hits.len(),
            total_items,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Paged search"
        );
        Ok(Page::new(hits, page_num, page_size, total_items))
    }

    fn build(&self, store: &IndexStore, keyword: &str, module: &str) -> Result<Query> {
        build_query(keyword, module, store.analyzer()).map_err(|e| {
            warn!(
                target: "sift::search",
                keyword,
                position = e.position,
                reason = %e.reason,
                "Keyword does not parse"
            );
            Error::QueryParse(e)
        })
    }

    fn top_hits(&self, store: &IndexStore, query: &Query, limit: usize) -> Result<Vec<SearchHit>> {
        let reader = store.new_reader()?;
        let searcher = Searcher::new(&reader, self.config.scoring);
        let hits = searcher.top_docs(query, limit)?;
        self.resolve(&searcher, hits)
    }

    /// Load stored fields of ranked hits and join their content records
    fn resolve(&self, searcher: &Searcher<'_>, hits: Vec<ScoredDoc>) -> Result<Vec<SearchHit>> {
        let stored = hits
            .into_iter()
            .map(|hit| Ok((searcher.doc(hit.address)?, hit.score)))
            .collect::<Result<Vec<_>>>()?;
        hydrate(&self.content, stored)
    }

    /// Rebuild the index entries of every record of `module`. Each record is
    /// replaced in its own commit, so an interrupted run leaves a mix of old
    /// and new entries and can simply be rerun.
    pub fn reindex_module(&self, module: &str) -> Result<ReindexReport> {
        self.store()?;
        let started = Instant::now();
        let records = self.content.find_by_module(module)?;
        info!(target: "sift::engine", module, records = records.len(), "Reindexing module");

        for (done, record) in records.iter().enumerate() {
            self.update_bean(&IndexableDocument::from_content(record))?;
            if (done + 1) % REINDEX_PROGRESS_EVERY == 0 {
                info!(target: "sift::engine", module, done = done + 1, total = records.len(), "Reindex progress");
            }
        }

        let report = ReindexReport {
            module: module.to_string(),
            indexed: records.len(),
            elapsed: started.elapsed(),
        };
        info!(
            target: "sift::engine",
            module,
            indexed = report.indexed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Reindexed module"
        );
        Ok(report)
    }

    /// Merge all segments into one, dropping deleted documents
    pub fn compact(&self) -> Result<CommitInfo> {
        self.store()?.compact()
    }

    pub fn stats(&self) -> Result<IndexStats> {
        self.store()?.stats()
    }
}
