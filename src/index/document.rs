//! Mapping from indexable units to the field set written to the index.

use crate::content::Content;
use crate::index::types::Field;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// A unit of content to index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexableDocument {
    /// Stable external identifier, unique across the index
    pub id: String,
    pub module: String,
    pub title: String,
    pub content: String,
    pub description: String,
    pub url: String,
    pub created: DateTime<Utc>,
}

impl IndexableDocument {
    /// Build the indexable unit for an authoritative record. Both the
    /// searchable content and the display description take the plain body.
    pub fn from_content(content: &Content) -> Self {
        Self {
            id: content.id.to_string(),
            module: content.module.clone(),
            title: content.title.clone(),
            content: content.text.clone(),
            description: content.text.clone(),
            url: content.url.clone(),
            created: content.created,
        }
    }
}

/// Field values of one document, as written to and read from a segment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldDocument {
    values: [String; Field::COUNT],
}

impl FieldDocument {
    pub fn get(&self, field: Field) -> &str {
        &self.values[field.ordinal()]
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values[field.ordinal()] = value.into();
    }

    pub fn id(&self) -> &str {
        self.get(Field::Id)
    }

    /// (field, value) pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        Field::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

/// Map an indexable unit to its field set
pub fn to_document(doc: &IndexableDocument) -> FieldDocument {
    let mut fields = FieldDocument::default();
    fields.set(Field::Id, doc.id.as_str());
    fields.set(Field::Module, doc.module.as_str());
    fields.set(Field::Title, doc.title.as_str());
    fields.set(Field::Content, doc.content.as_str());
    fields.set(Field::Description, doc.description.as_str());
    fields.set(Field::Url, doc.url.as_str());
    fields.set(Field::CreatedYear, created_year(&doc.created));
    fields
}

/// Four-digit UTC year of a timestamp
pub fn created_year(created: &DateTime<Utc>) -> String {
    format!("{:04}", created.year())
}
