//! Joining ranked hits with their authoritative content records.

use crate::content::{Content, ContentStore};
use crate::error::Result;
use crate::index::document::FieldDocument;
use crate::index::types::Field;
use serde::Serialize;
use tracing::warn;

/// A ranked document: its stored fields, score and content record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub module: String,
    pub title: String,
    pub content: String,
    pub description: String,
    pub url: String,
    pub created_year: String,
    pub score: f32,
    /// `None` when the index refers to a record the content store no
    /// longer has
    pub record: Option<Content>,
}

impl SearchHit {
    fn from_stored(fields: &FieldDocument, score: f32) -> Self {
        Self {
            id: fields.get(Field::Id).to_string(),
            module: fields.get(Field::Module).to_string(),
            title: fields.get(Field::Title).to_string(),
            content: fields.get(Field::Content).to_string(),
            description: fields.get(Field::Description).to_string(),
            url: fields.get(Field::Url).to_string(),
            created_year: fields.get(Field::CreatedYear).to_string(),
            score,
            record: None,
        }
    }

    pub fn is_dangling(&self) -> bool {
        self.record.is_none()
    }
}

/// Build hits from stored fields, resolving each record through `store`.
///
/// A hit whose id is not a record key, or whose record no longer exists,
/// is kept with `record: None` and logged. A failing store fails the whole
/// call.
pub fn hydrate<S: ContentStore + ?Sized>(
    store: &S,
    hits: impl IntoIterator<Item = (FieldDocument, f32)>,
) -> Result<Vec<SearchHit>> {
    hits.into_iter()
        .map(|(fields, score)| {
            let mut hit = SearchHit::from_stored(&fields, score);
            hit.record = resolve(store, &hit.id)?;
            Ok(hit)
        })
        .collect()
}

fn resolve<S: ContentStore + ?Sized>(store: &S, id: &str) -> Result<Option<Content>> {
    let Ok(key) = id.parse::<u64>() else {
        warn!(target: "sift::search", id, "Dangling hit: id is not a record key");
        return Ok(None);
    };
    let record = store.find_by_id(key)?;
    if record.is_none() {
        warn!(target: "sift::search", id, "Dangling hit: record no longer exists");
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryContentStore;
    use crate::error::Error;
    use crate::index::document::{IndexableDocument, to_document};
    use chrono::{TimeZone, Utc};

    fn record(id: u64) -> Content {
        Content {
            id,
            module: "article".into(),
            title: format!("title {id}"),
            text: format!("body {id}"),
            created: Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap(),
            url: format!("/article/{id}"),
        }
    }

    fn stored(id: &str) -> FieldDocument {
        let mut fields = FieldDocument::default();
        fields.set(Field::Id, id);
        fields.set(Field::Module, "article");
        fields
    }

    struct FailingStore;

    impl ContentStore for FailingStore {
        fn find_by_id(&self, _id: u64) -> Result<Option<Content>> {
            Err(Error::ContentStore("connection refused".into()))
        }

        fn find_by_module(&self, _module: &str) -> Result<Vec<Content>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_resolves_records_in_order() {
        let store = MemoryContentStore::from_records([record(1), record(2)]);
        let hits = hydrate(&store, [(stored("2"), 2.0), (stored("1"), 1.0)]).unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.record.as_ref().unwrap().id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(hits[0].score, 2.0);
    }

    #[test]
    fn test_missing_record_is_dangling() {
        let store = MemoryContentStore::from_records([record(1)]);
        let hits = hydrate(&store, [(stored("1"), 1.0), (stored("9"), 0.5)]).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(!hits[0].is_dangling());
        assert!(hits[1].is_dangling());
        assert_eq!(hits[1].id, "9");
    }

    #[test]
    fn test_non_numeric_id_is_dangling() {
        let store = MemoryContentStore::new();
        let hits = hydrate(&store, [(stored("abc"), 1.0)]).unwrap();
        assert!(hits[0].is_dangling());
    }

    #[test]
    fn test_lookup_failure_is_an_error() {
        let err = hydrate(&FailingStore, [(stored("1"), 1.0)]).unwrap_err();
        assert!(matches!(err, Error::ContentStore(_)));
    }

    #[test]
    fn test_non_numeric_id_skips_failing_store() {
        let hits = hydrate(&FailingStore, [(stored("abc"), 1.0)]).unwrap();
        assert!(hits[0].is_dangling());
    }

    #[test]
    fn test_stored_fields_copied() {
        let doc = IndexableDocument::from_content(&record(3));
        let hits = hydrate(&MemoryContentStore::new(), [(to_document(&doc), 0.1)]).unwrap();
        let hit = &hits[0];
        assert_eq!(hit.title, "title 3");
        assert_eq!(hit.description, "body 3");
        assert_eq!(hit.url, "/article/3");
        assert_eq!(hit.created_year, "2016");
    }
}
