//! Binding parsed keywords to fields.
//!
//! The search query always has the same shape:
//!
//! ```text
//! Boolean(min_should_match = 1)
//!   SHOULD <keyword bound to title>
//!   SHOULD <keyword bound to content>
//!   MUST   module == <module>
//! ```

use crate::error::QueryParseError;
use crate::index::types::Field;
use crate::query::parser::{KeywordClause, KeywordExpr, Occur, ParsedKeyword, parse_keyword};
use crate::utils::AnalyzerKind;

/// Executable query over indexed fields
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Exact term in one field
    Term { field: Field, term: String, boost: f32 },
    /// Terms at fixed relative positions
    Phrase {
        field: Field,
        /// (position offset, term), offsets relative to the first term
        terms: Vec<(u32, String)>,
        boost: f32,
    },
    /// Any term starting with `prefix`, constant score
    Prefix { field: Field, prefix: String, boost: f32 },
    Boolean(BooleanQuery),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanQuery {
    pub clauses: Vec<(Occur, Query)>,
    /// SHOULD clauses that must match. With no MUST clause at least one is
    /// always required.
    pub minimum_should_match: usize,
    pub boost: f32,
}

impl BooleanQuery {
    pub fn new(clauses: Vec<(Occur, Query)>) -> Self {
        Self {
            clauses,
            minimum_should_match: 0,
            boost: 1.0,
        }
    }
}

impl Query {
    /// Unanalyzed single-term match
    pub fn exact(field: Field, value: &str) -> Self {
        Query::Term {
            field,
            term: value.to_string(),
            boost: 1.0,
        }
    }

    fn with_boost(self, factor: f32) -> Self {
        match self {
            Query::Term { field, term, boost } => Query::Term {
                field,
                term,
                boost: boost * factor,
            },
            Query::Phrase { field, terms, boost } => Query::Phrase {
                field,
                terms,
                boost: boost * factor,
            },
            Query::Prefix { field, prefix, boost } => Query::Prefix {
                field,
                prefix,
                boost: boost * factor,
            },
            Query::Boolean(mut bq) => {
                bq.boost *= factor;
                Query::Boolean(bq)
            }
        }
    }
}

/// Build the search query for `keyword` restricted to `module`
pub fn build_query(
    keyword: &str,
    module: &str,
    analyzer: AnalyzerKind,
) -> Result<Query, QueryParseError> {
    let parsed = parse_keyword(keyword)?;

    let mut clauses = Vec::with_capacity(3);
    for field in [Field::Title, Field::Content] {
        if let Some(query) = full_text_parse(&parsed, field, analyzer) {
            clauses.push((Occur::Should, query));
        }
    }
    clauses.push((Occur::Must, Query::exact(Field::Module, module)));

    Ok(Query::Boolean(BooleanQuery {
        clauses,
        minimum_should_match: 1,
        boost: 1.0,
    }))
}

/// Bind a parsed keyword to one text field. Returns `None` when analysis
/// leaves nothing to search for.
pub fn full_text_parse(parsed: &ParsedKeyword, field: Field, analyzer: AnalyzerKind) -> Option<Query> {
    bind_clauses(&parsed.clauses, field, analyzer)
}

fn bind_clauses(clauses: &[KeywordClause], field: Field, analyzer: AnalyzerKind) -> Option<Query> {
    let mut bound: Vec<(Occur, Query)> = clauses
        .iter()
        .filter_map(|clause| {
            let query = bind_expr(&clause.expr, field, analyzer)?;
            let query = match clause.boost {
                Some(boost) => query.with_boost(boost),
                None => query,
            };
            Some((clause.occur, query))
        })
        .collect();

    match bound.len() {
        0 => None,
        1 if bound[0].0 != Occur::MustNot => bound.pop().map(|(_, q)| q),
        _ => Some(Query::Boolean(BooleanQuery::new(bound))),
    }
}

fn bind_expr(expr: &KeywordExpr, field: Field, analyzer: AnalyzerKind) -> Option<Query> {
    match expr {
        KeywordExpr::Term(text) => {
            let mut terms = analyzer.terms(text);
            match terms.len() {
                0 => None,
                1 => terms.pop().map(|term| Query::Term { field, term, boost: 1.0 }),
                // One keyword word that analyzes to several terms
                _ => Some(Query::Boolean(BooleanQuery::new(
                    terms
                        .into_iter()
                        .map(|term| (Occur::Should, Query::Term { field, term, boost: 1.0 }))
                        .collect(),
                ))),
            }
        }
        KeywordExpr::Phrase(text) => {
            let tokens = analyzer.analyze(text);
            let first = tokens.first()?.position;
            if tokens.len() == 1 {
                return tokens.into_iter().next().map(|t| Query::Term {
                    field,
                    term: t.text,
                    boost: 1.0,
                });
            }
            Some(Query::Phrase {
                field,
                terms: tokens
                    .into_iter()
                    .map(|t| (t.position - first, t.text))
                    .collect(),
                boost: 1.0,
            })
        }
        KeywordExpr::Prefix(text) => {
            let prefix = text.to_lowercase();
            (!prefix.is_empty()).then(|| Query::Prefix {
                field,
                prefix,
                boost: 1.0,
            })
        }
        KeywordExpr::Group(clauses) => bind_clauses(clauses, field, analyzer),
    }
}
