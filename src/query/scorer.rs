//! BM25 relevance scoring.
//!
//! Statistics are index-wide: document frequencies are summed over all
//! segments and include deleted documents until a merge removes them, so a
//! score does not depend on how documents happen to be split into segments.

use serde::{Deserialize, Serialize};

/// BM25 free parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation
    #[serde(default = "default_k1")]
    pub k1: f32,
    /// Length normalization strength, 0.0 to 1.0
    #[serde(default = "default_b")]
    pub b: f32,
}

fn default_k1() -> f32 {
    1.2
}

fn default_b() -> f32 {
    0.75
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
        }
    }
}

/// Scorer for one text field of one reader snapshot
#[derive(Debug, Clone, Copy)]
pub struct Bm25 {
    params: Bm25Params,
    doc_count: u64,
    avg_field_length: f32,
}

impl Bm25 {
    pub fn new(params: Bm25Params, doc_count: u64, avg_field_length: f32) -> Self {
        Self {
            params,
            doc_count,
            avg_field_length,
        }
    }

    /// Inverse document frequency, always positive
    #[inline]
    pub fn idf(&self, doc_freq: u64) -> f32 {
        let n = self.doc_count.max(doc_freq) as f32;
        let df = doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Saturated, length-normalized term frequency
    #[inline]
    pub fn tf(&self, freq: u32, field_length: u32) -> f32 {
        if freq == 0 {
            return 0.0;
        }
        let freq = freq as f32;
        let norm = if self.avg_field_length > 0.0 {
            1.0 - self.params.b + self.params.b * field_length as f32 / self.avg_field_length
        } else {
            1.0
        };
        freq * (self.params.k1 + 1.0) / (freq + self.params.k1 * norm)
    }

    /// Score of a term occurring `freq` times in a field of `field_length`
    /// tokens
    #[inline]
    pub fn score(&self, doc_freq: u64, freq: u32, field_length: u32) -> f32 {
        self.idf(doc_freq) * self.tf(freq, field_length)
    }
}
