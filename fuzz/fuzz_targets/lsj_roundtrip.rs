#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: LSJ parse→emit→parse fixpoint.
//
// The writer orders regions by sorted id, so equality is checked after
// normalizing region order on both sides. A second emit must then be
// byte-identical to the first.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(mut doc) = lsforge_codec::lsj::parse(text) else {
        return;
    };
    let emitted = lsforge_codec::lsj::emit(&doc).expect("emit of a parsed doc succeeds");
    let mut reparsed = lsforge_codec::lsj::parse(&emitted).expect("emitted LSJ must parse");

    doc.regions.sort_by(|a, b| a.id.cmp(&b.id));
    reparsed.regions.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(doc, reparsed);

    let re_emitted = lsforge_codec::lsj::emit(&reparsed).expect("second emit succeeds");
    assert_eq!(emitted, re_emitted);
});
