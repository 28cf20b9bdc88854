#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sift::AnalyzerKind;

#[derive(Arbitrary, Debug)]
struct Input {
    kind: u8,
    text: String,
}

fuzz_target!(|input: Input| {
    let kind = match input.kind % 3 {
        0 => AnalyzerKind::Standard,
        1 => AnalyzerKind::Cjk,
        _ => AnalyzerKind::Whitespace,
    };
    // Positions are strictly increasing and no term is empty
    let tokens = kind.analyze(&input.text);
    for pair in tokens.windows(2) {
        assert!(pair[0].position < pair[1].position);
    }
    assert!(tokens.iter().all(|t| !t.text.is_empty()));
});
