#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: LSX parse→emit→parse fixpoint.
//
// Any input the parser accepts must re-emit into a document that
// parses back equal. Catches writer/reader asymmetries (escaping,
// attribute ordering, empty-element forms).
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(doc) = lsforge_codec::lsx::parse(text) else {
        return;
    };
    let emitted = lsforge_codec::lsx::emit(&doc);
    let reparsed = lsforge_codec::lsx::parse(&emitted).expect("emitted LSX must parse");
    assert_eq!(doc, reparsed);
});
