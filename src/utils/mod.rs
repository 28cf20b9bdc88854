//! Utility functions shared by the index and query layers.
//!
//! ## Modules
//!
//! - [`analyzer`] - Text analysis (UAX#29 words, CJK bigrams, whitespace)
//! - [`app_data`] - Application data directory and path helpers
//! - [`encoding`] - Variable-length integer and little-endian encoding
//!
//! ```
//! use sift::utils::AnalyzerKind;
//!
//! let terms = AnalyzerKind::Standard.terms("Borrow Checker basics");
//! assert_eq!(terms, vec!["borrow", "checker", "basics"]);
//! ```

pub mod analyzer;
pub mod app_data;
pub mod encoding;

pub use analyzer::*;
pub use app_data::*;
pub use encoding::*;
