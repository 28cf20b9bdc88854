#![no_main]

use libfuzzer_sys::fuzz_target;
use sift::AnalyzerKind;

fuzz_target!(|data: &str| {
    // Parsing and binding must never panic, and errors must point inside the keyword
    match sift::query::parse_keyword(data) {
        Ok(_) => {
            let _ = sift::query::build_query(data, "article", AnalyzerKind::Standard);
        }
        Err(e) => assert!(e.position <= data.len()),
    }
});
