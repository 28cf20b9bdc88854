//! Keyword parsing, query building and ranked execution.
//!
//! A keyword goes through [`parser`] into a field-free clause tree, is bound
//! to the text fields by [`builder`] and is then run against a reader
//! snapshot by [`executor`].

pub mod builder;
pub mod collector;
pub mod executor;
pub mod parser;
pub mod scorer;

pub use builder::{BooleanQuery, Query, build_query, full_text_parse};
pub use collector::{ScoredDoc, TopDocsCollector};
pub use executor::Searcher;
pub use parser::{KeywordClause, KeywordExpr, Occur, ParsedKeyword, parse_keyword};
pub use scorer::{Bm25, Bm25Params};
