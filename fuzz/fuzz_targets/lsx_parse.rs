#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: LSX (textual dialect) parser.
//
// Catches bugs in:
// - Unbalanced/malformed element handling
// - Attribute decoding and entity unescaping
// - Wrapper-element descent (arbitrary nesting)
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = lsforge_codec::lsx::parse(text);
    }
});
