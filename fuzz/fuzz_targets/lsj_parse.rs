#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: LSJ (JSON dialect) parser.
//
// Catches bugs in:
// - Legacy/current region shape handling
// - Attribute list vs map decoding
// - Scalar string-encoding of arbitrary JSON values
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = lsforge_codec::lsj::parse(text);
    }
});
