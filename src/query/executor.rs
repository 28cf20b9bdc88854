use crate::error::{Error, Result};
use crate::index::document::FieldDocument;
use crate::index::reader::{IndexReader, SegmentReader};
use crate::index::types::{DocAddress, DocId, Field, IndexMode};
use crate::query::builder::{BooleanQuery, Query};
use crate::query::collector::{ScoredDoc, TopDocsCollector};
use crate::query::parser::Occur;
use crate::query::scorer::{Bm25, Bm25Params};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Scores of the docs a query matches in one segment, deleted docs included
type SegmentMatches = FxHashMap<DocId, f32>;

/// Executes queries against one reader snapshot. Every method of one
/// searcher sees the same committed state.
pub struct Searcher<'a> {
    reader: &'a IndexReader,
    /// BM25 statistics per field ordinal
    scorers: Vec<Bm25>,
}

impl<'a> Searcher<'a> {
    pub fn new(reader: &'a IndexReader, params: Bm25Params) -> Self {
        let scorers = Field::ALL
            .iter()
            .map(|&field| {
                let stats = reader.field_stats(field);
                Bm25::new(params, stats.doc_count, stats.avg_length())
            })
            .collect();
        Self { reader, scorers }
    }

    pub fn reader(&self) -> &IndexReader {
        self.reader
    }

    /// The best `k` live matches, in ranking order
    pub fn top_docs(&self, query: &Query, k: usize) -> Result<Vec<ScoredDoc>> {
        self.collect(query, TopDocsCollector::new(k))
    }

    /// The best `k` live matches ranked strictly after `boundary`
    pub fn search_after(&self, query: &Query, boundary: &ScoredDoc, k: usize) -> Result<Vec<ScoredDoc>> {
        self.collect(query, TopDocsCollector::after(k, boundary.clone()))
    }

    /// Number of live matches, counting stops at `cap`
    pub fn count(&self, query: &Query, cap: usize) -> Result<usize> {
        let mut total = 0usize;
        for segment in self.reader.segments() {
            if total >= cap {
                break;
            }
            let matches = self.evaluate(segment, query)?;
            total += matches
                .keys()
                .filter(|&&doc| !segment.is_deleted(doc))
                .take(cap - total)
                .count();
        }
        Ok(total)
    }

    /// Hits of page `page_num` (1-based) of size `page_size`.
    ///
    /// Pages after the first are located by replaying the ranked search up
    /// to the page offset and continuing after its last hit, so the cost
    /// grows linearly with the page number.
    pub fn page(&self, query: &Query, page_num: usize, page_size: usize) -> Result<Vec<ScoredDoc>> {
        let invalid = || Error::InvalidPage {
            page_number: page_num,
            page_size,
        };
        if page_num == 0 || page_size == 0 {
            return Err(invalid());
        }
        if page_num == 1 {
            return self.top_docs(query, page_size);
        }

        let offset = page_size.checked_mul(page_num - 1).ok_or_else(invalid)?;
        let skipped = self.top_docs(query, offset)?;
        if skipped.len() < offset {
            debug!(target: "sift::search", page_num, offset, matches = skipped.len(), "Page past the last hit");
            return Ok(Vec::new());
        }

        match skipped.last() {
            Some(boundary) => self.search_after(query, boundary, page_size),
            None => Ok(Vec::new()),
        }
    }

    /// Stored fields of a hit
    pub fn doc(&self, address: DocAddress) -> Result<FieldDocument> {
        self.reader.stored(address)
    }

    fn collect(&self, query: &Query, mut collector: TopDocsCollector) -> Result<Vec<ScoredDoc>> {
        for (segment_ord, segment) in self.reader.segments().iter().enumerate() {
            let matches = self.evaluate(segment, query)?;
            for (doc, score) in matches {
                if segment.is_deleted(doc) || !collector.might_accept(score) {
                    continue;
                }
                collector.collect(ScoredDoc {
                    score,
                    id: segment.stored_id(doc)?,
                    address: DocAddress { segment_ord, doc },
                });
            }
        }
        Ok(collector.into_sorted_vec())
    }

    fn scorer(&self, field: Field) -> &Bm25 {
        &self.scorers[field.ordinal()]
    }

    fn evaluate(&self, segment: &SegmentReader, query: &Query) -> Result<SegmentMatches> {
        match query {
            Query::Term { field, term, boost } => self.evaluate_term(segment, *field, term, *boost),
            Query::Phrase { field, terms, boost } => self.evaluate_phrase(segment, *field, terms, *boost),
            Query::Prefix { field, prefix, boost } => self.evaluate_prefix(segment, *field, prefix, *boost),
            Query::Boolean(bq) => self.evaluate_boolean(segment, bq),
        }
    }

    fn evaluate_term(&self, segment: &SegmentReader, field: Field, term: &str, boost: f32) -> Result<SegmentMatches> {
        let postings = segment.postings(field, term)?;
        if postings.is_empty() {
            return Ok(SegmentMatches::default());
        }

        let scorer = self.scorer(field);
        let doc_freq = self.reader.doc_freq(field, term);

        let matches = match field.index_mode() {
            IndexMode::Text => postings
                .iter()
                .map(|p| {
                    let len = segment.field_length(field, p.doc);
                    (p.doc, scorer.score(doc_freq, p.term_freq(), len) * boost)
                })
                .collect(),
            // Exact fields carry no norms: every match scores the same
            _ => {
                let score = scorer.idf(doc_freq) * boost;
                postings.iter().map(|p| (p.doc, score)).collect()
            }
        };
        Ok(matches)
    }

    fn evaluate_phrase(
        &self,
        segment: &SegmentReader,
        field: Field,
        terms: &[(u32, String)],
        boost: f32,
    ) -> Result<SegmentMatches> {
        let mut lists = Vec::with_capacity(terms.len());
        for (offset, term) in terms {
            let postings = segment.postings(field, term)?;
            if postings.is_empty() {
                return Ok(SegmentMatches::default());
            }
            lists.push((*offset, postings));
        }
        let Some(((first_offset, first), rest)) = lists.split_first() else {
            return Ok(SegmentMatches::default());
        };

        let scorer = self.scorer(field);
        let idf: f32 = terms
            .iter()
            .map(|(_, term)| scorer.idf(self.reader.doc_freq(field, term)))
            .sum();

        let mut matches = SegmentMatches::default();
        'docs: for posting in first {
            let mut others = Vec::with_capacity(rest.len());
            for (offset, list) in rest {
                match list.binary_search_by_key(&posting.doc, |p| p.doc) {
                    Ok(i) => others.push((*offset, &list[i].positions)),
                    Err(_) => continue 'docs,
                }
            }

            let freq = posting
                .positions
                .iter()
                .filter_map(|&pos| pos.checked_sub(*first_offset))
                .filter(|&start| {
                    others
                        .iter()
                        .all(|(offset, positions)| positions.binary_search(&(start + offset)).is_ok())
                })
                .count() as u32;

            if freq > 0 {
                let len = segment.field_length(field, posting.doc);
                matches.insert(posting.doc, idf * scorer.tf(freq, len) * boost);
            }
        }
        Ok(matches)
    }

    fn evaluate_prefix(&self, segment: &SegmentReader, field: Field, prefix: &str, boost: f32) -> Result<SegmentMatches> {
        let mut matches = SegmentMatches::default();
        let Some(dict) = segment.term_dict(field) else {
            return Ok(matches);
        };
        for entry in dict.prefix_range(prefix) {
            for posting in segment.read_postings(field, entry)? {
                matches.insert(posting.doc, boost);
            }
        }
        Ok(matches)
    }

    fn evaluate_boolean(&self, segment: &SegmentReader, bq: &BooleanQuery) -> Result<SegmentMatches> {
        let mut must = Vec::new();
        let mut should = Vec::new();
        let mut must_not = FxHashSet::default();

        for (occur, clause) in &bq.clauses {
            let matches = self.evaluate(segment, clause)?;
            match occur {
                Occur::Must => must.push(matches),
                Occur::Should => should.push(matches),
                Occur::MustNot => must_not.extend(matches.into_keys()),
            }
        }

        let mut result = SegmentMatches::default();
        if must.is_empty() && should.is_empty() {
            return Ok(result);
        }

        // (matching clauses, summed score) per doc, in clause order
        let mut should_hits: FxHashMap<DocId, (usize, f32)> = FxHashMap::default();
        for matches in &should {
            for (&doc, &score) in matches {
                let hit = should_hits.entry(doc).or_insert((0, 0.0));
                hit.0 += 1;
                hit.1 += score;
            }
        }

        match must.split_first() {
            None => {
                let required = bq.minimum_should_match.max(1);
                for (doc, (count, score)) in should_hits {
                    if count >= required && !must_not.contains(&doc) {
                        result.insert(doc, score * bq.boost);
                    }
                }
            }
            Some((first, rest)) => {
                let required = bq.minimum_should_match;
                'docs: for (&doc, &score) in first {
                    if must_not.contains(&doc) {
                        continue;
                    }
                    let mut total = score;
                    for other in rest {
                        match other.get(&doc) {
                            Some(s) => total += s,
                            None => continue 'docs,
                        }
                    }
                    let (count, should_score) = should_hits.get(&doc).copied().unwrap_or((0, 0.0));
                    if count < required {
                        continue;
                    }
                    result.insert(doc, (total + should_score) * bq.boost);
                }
            }
        }

        Ok(result)
    }
}
