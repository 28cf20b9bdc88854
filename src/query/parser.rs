//! Keyword syntax.
//!
//! A keyword is parsed once, independent of any field, into a list of
//! clauses. [`crate::query::builder`] then binds the result to each
//! searchable field. Supported syntax:
//!
//! - bare terms, combined with OR by default
//! - `"quoted phrases"`
//! - `+required`, `-prohibited`, `!prohibited`, `NOT prohibited`
//! - `a AND b`, `a && b`, `a OR b`, `a || b`
//! - `(grouping)`
//! - `prefix*` (trailing wildcard only)
//! - `term^2.5` boosts on terms, phrases and groups
//! - `\` escapes the next character

use crate::error::QueryParseError;

/// Groups nested deeper than this are rejected
const MAX_DEPTH: usize = 32;

/// How a clause takes part in a boolean match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match
    Must,
    /// The clause may match and adds to the score
    Should,
    /// Documents matching the clause are excluded
    MustNot,
}

/// Field-independent keyword expression
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordExpr {
    /// Bare term, analyzed when bound to a field
    Term(String),
    /// Quoted phrase
    Phrase(String),
    /// Trailing-wildcard term, without the `*`
    Prefix(String),
    /// Parenthesized sub-query
    Group(Vec<KeywordClause>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordClause {
    pub occur: Occur,
    pub expr: KeywordExpr,
    pub boost: Option<f32>,
}

/// A parsed keyword
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedKeyword {
    pub clauses: Vec<KeywordClause>,
}

/// Parse a keyword into clauses
pub fn parse_keyword(input: &str) -> Result<ParsedKeyword, QueryParseError> {
    if input.trim().is_empty() {
        return Err(QueryParseError::new(input, 0, "empty keyword"));
    }

    let mut parser = KeywordParser::new(input);
    let clauses = parser.parse_clauses(0)?;
    Ok(ParsedKeyword { clauses })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conjunction {
    None,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    None,
    Required,
    Prohibited,
}

struct KeywordParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> KeywordParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_clauses(&mut self, depth: usize) -> Result<Vec<KeywordClause>, QueryParseError> {
        let mut clauses = Vec::new();

        loop {
            self.skip_whitespace();
            if self.is_eof() {
                break;
            }
            if self.peek_char() == Some(')') {
                if depth == 0 {
                    return Err(self.error(self.pos, "unbalanced ')'"));
                }
                break;
            }

            let conj_pos = self.pos;
            let conj = self.parse_conjunction();
            if conj != Conjunction::None && clauses.is_empty() {
                return Err(self.error(conj_pos, "operator without a left operand"));
            }

            self.skip_whitespace();
            let modifier_pos = self.pos;
            let modifier = self.parse_modifier();

            self.skip_whitespace();
            if self.is_eof() || self.peek_char() == Some(')') || self.peek_conjunction().is_some() {
                let at = if modifier == Modifier::None {
                    conj_pos
                } else {
                    modifier_pos
                };
                return Err(self.error(at, "dangling operator"));
            }

            let expr = self.parse_primary(depth)?;
            let boost = self.parse_boost()?;
            add_clause(&mut clauses, conj, modifier, expr, boost);
        }

        Ok(clauses)
    }

    fn parse_primary(&mut self, depth: usize) -> Result<KeywordExpr, QueryParseError> {
        let start = self.pos;

        match self.peek_char() {
            Some('(') => {
                if depth >= MAX_DEPTH {
                    return Err(self.error(start, "groups nested too deeply"));
                }
                self.advance();
                let clauses = self.parse_clauses(depth + 1)?;
                if !self.consume_char(')') {
                    return Err(self.error(start, "unbalanced '('"));
                }
                if clauses.is_empty() {
                    return Err(self.error(start, "empty group"));
                }
                Ok(KeywordExpr::Group(clauses))
            }
            Some('"') => self.parse_phrase(),
            Some('^') => Err(self.error(start, "boost without a term")),
            Some('+' | '-' | '!') => Err(self.error(start, "unexpected operator")),
            _ => self.parse_term(),
        }
    }

    fn parse_phrase(&mut self) -> Result<KeywordExpr, QueryParseError> {
        let start = self.pos;
        self.consume_char('"');

        let mut text = String::new();
        loop {
            match self.peek_char() {
                None => return Err(self.error(start, "unterminated phrase")),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    let escape_pos = self.pos;
                    self.advance();
                    let ch = self
                        .peek_char()
                        .ok_or_else(|| self.error(escape_pos, "dangling escape"))?;
                    text.push(ch);
                    self.advance();
                }
                Some(ch) => {
                    text.push(ch);
                    self.advance();
                }
            }
        }

        Ok(KeywordExpr::Phrase(text))
    }

    fn parse_term(&mut self) -> Result<KeywordExpr, QueryParseError> {
        let start = self.pos;
        let mut text = String::new();

        while let Some(ch) = self.peek_char() {
            if is_term_stop(ch) {
                break;
            }

            match ch {
                '\\' => {
                    let escape_pos = self.pos;
                    self.advance();
                    let escaped = self
                        .peek_char()
                        .ok_or_else(|| self.error(escape_pos, "dangling escape"))?;
                    text.push(escaped);
                    self.advance();
                }
                '*' => {
                    let star_pos = self.pos;
                    self.advance();
                    let at_end = self.peek_char().is_none_or(is_term_stop);
                    return match (text.is_empty(), at_end) {
                        (true, true) => Err(self.error(star_pos, "bare wildcard")),
                        (true, false) => Err(self.error(star_pos, "leading wildcard")),
                        (false, false) => Err(self.error(
                            star_pos,
                            "wildcards are only supported at the end of a term",
                        )),
                        (false, true) => Ok(KeywordExpr::Prefix(text)),
                    };
                }
                _ => {
                    text.push(ch);
                    self.advance();
                }
            }
        }

        if text.is_empty() {
            return Err(self.error(start, "expected a term"));
        }
        Ok(KeywordExpr::Term(text))
    }

    fn parse_boost(&mut self) -> Result<Option<f32>, QueryParseError> {
        let start = self.pos;
        if !self.consume_char('^') {
            return Ok(None);
        }

        let digits_start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() || ch == '.' {
                self.advance();
            } else {
                break;
            }
        }

        let at_boundary = self
            .peek_char()
            .is_none_or(|c| c.is_whitespace() || c == ')');
        match self.input[digits_start..self.pos].parse::<f32>() {
            Ok(boost) if boost.is_finite() && boost >= 0.0 && at_boundary => Ok(Some(boost)),
            _ => Err(self.error(start, "malformed boost")),
        }
    }

    fn parse_conjunction(&mut self) -> Conjunction {
        match self.peek_conjunction() {
            Some((conj, len)) => {
                self.pos += len;
                conj
            }
            None => Conjunction::None,
        }
    }

    fn peek_conjunction(&self) -> Option<(Conjunction, usize)> {
        let rest = self.remaining();
        if rest.starts_with("&&") {
            Some((Conjunction::And, 2))
        } else if rest.starts_with("||") {
            Some((Conjunction::Or, 2))
        } else if self.at_keyword("AND") {
            Some((Conjunction::And, 3))
        } else if self.at_keyword("OR") {
            Some((Conjunction::Or, 2))
        } else {
            None
        }
    }

    fn parse_modifier(&mut self) -> Modifier {
        if self.consume_char('+') {
            Modifier::Required
        } else if self.consume_char('-') || self.consume_char('!') {
            Modifier::Prohibited
        } else if self.at_keyword("NOT") {
            self.pos += 3;
            Modifier::Prohibited
        } else {
            Modifier::None
        }
    }

    /// An upper-case operator word followed by a term boundary
    fn at_keyword(&self, word: &str) -> bool {
        let rest = self.remaining();
        rest.starts_with(word)
            && rest[word.len()..]
                .chars()
                .next()
                .is_none_or(|c| c.is_whitespace() || c == '(' || c == '"')
    }

    fn error(&self, position: usize, reason: &str) -> QueryParseError {
        QueryParseError::new(self.input, position, reason)
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn consume_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn remaining(&self) -> &str {
        &self.input[self.pos..]
    }
}

fn is_term_stop(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '(' | ')' | '"' | '^')
}

/// Append a clause the way the classic parser does with OR as the default
/// operator: `AND` makes both neighbours required unless prohibited.
fn add_clause(
    clauses: &mut Vec<KeywordClause>,
    conj: Conjunction,
    modifier: Modifier,
    expr: KeywordExpr,
    boost: Option<f32>,
) {
    if conj == Conjunction::And {
        if let Some(prev) = clauses.last_mut() {
            if prev.occur != Occur::MustNot {
                prev.occur = Occur::Must;
            }
        }
    }

    let occur = match modifier {
        Modifier::Prohibited => Occur::MustNot,
        Modifier::Required => Occur::Must,
        Modifier::None if conj == Conjunction::And => Occur::Must,
        Modifier::None => Occur::Should,
    };

    clauses.push(KeywordClause { occur, expr, boost });
}
