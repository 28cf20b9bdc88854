//! Text analysis shared by indexing and query parsing.
//!
//! The same [`AnalyzerKind`] must be used on both sides: the index records
//! which one built it and refuses to open under a different one.

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_segmentation::UnicodeSegmentation;

/// Tokens longer than this are dropped (hashes, base64 blobs and the like).
const MAX_TOKEN_LENGTH: usize = 128;

/// A term produced by analysis, with its position in the token stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub position: u32,
}

/// Which tokenizer chain to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    /// UAX#29 word boundaries, lowercased. Ideographs become single-character
    /// terms.
    #[default]
    Standard,
    /// Like `Standard`, but runs of CJK characters are indexed as overlapping
    /// bigrams, which keeps phrase-like precision for unsegmented scripts.
    Cjk,
    /// Split on whitespace only, lowercased.
    Whitespace,
}

impl AnalyzerKind {
    pub fn name(self) -> &'static str {
        match self {
            AnalyzerKind::Standard => "standard",
            AnalyzerKind::Cjk => "cjk",
            AnalyzerKind::Whitespace => "whitespace",
        }
    }

    /// Run the analyzer over `text`
    pub fn analyze(self, text: &str) -> Vec<Token> {
        match self {
            AnalyzerKind::Standard => standard_tokens(text),
            AnalyzerKind::Cjk => cjk_tokens(text),
            AnalyzerKind::Whitespace => whitespace_tokens(text),
        }
    }

    /// Analyze and keep only the term texts
    pub fn terms(self, text: &str) -> Vec<String> {
        self.analyze(text).into_iter().map(|t| t.text).collect()
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn standard_tokens(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut position = 0;
    for word in text.unicode_words() {
        push_token(&mut tokens, word, &mut position);
    }
    tokens
}

fn whitespace_tokens(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut position = 0;
    for word in text.split_whitespace() {
        push_token(&mut tokens, word, &mut position);
    }
    tokens
}

fn cjk_tokens(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut position = 0;
    // Adjacent single-character CJK words, flushed as bigrams
    let mut run: Vec<char> = Vec::new();
    let mut run_end = 0usize;

    for (start, word) in text.unicode_word_indices() {
        let mut chars = word.chars();
        let single_cjk = match (chars.next(), chars.next()) {
            (Some(c), None) if is_cjk(c) => Some(c),
            _ => None,
        };

        match single_cjk {
            Some(c) if run.is_empty() || run_end == start => {
                run.push(c);
                run_end = start + word.len();
            }
            Some(c) => {
                flush_cjk_run(&mut tokens, &mut run, &mut position);
                run.push(c);
                run_end = start + word.len();
            }
            None => {
                flush_cjk_run(&mut tokens, &mut run, &mut position);
                push_token(&mut tokens, word, &mut position);
            }
        }
    }
    flush_cjk_run(&mut tokens, &mut run, &mut position);

    tokens
}

fn flush_cjk_run(tokens: &mut Vec<Token>, run: &mut Vec<char>, position: &mut u32) {
    match run.len() {
        0 => {}
        1 => {
            tokens.push(Token {
                text: run[0].to_string(),
                position: *position,
            });
            *position += 1;
        }
        _ => {
            for pair in run.windows(2) {
                tokens.push(Token {
                    text: pair.iter().collect(),
                    position: *position,
                });
                *position += 1;
            }
        }
    }
    run.clear();
}

fn push_token(tokens: &mut Vec<Token>, word: &str, position: &mut u32) {
    if word.chars().count() > MAX_TOKEN_LENGTH {
        return;
    }
    tokens.push(Token {
        text: word.to_lowercase(),
        position: *position,
    });
    *position += 1;
}

/// Han ideographs and kana
fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x309F     // Hiragana
        | 0x30A0..=0x30FF   // Katakana
        | 0x3400..=0x4DBF   // CJK Extension A
        | 0x4E00..=0x9FFF   // CJK Unified Ideographs
        | 0xF900..=0xFAFF   // CJK Compatibility Ideographs
        | 0x20000..=0x2A6DF // CJK Extension B
    )
}
