#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: format detection over raw bytes.
//
// Detection must be total — any input classifies, nothing panics.
fuzz_target!(|data: &[u8]| {
    let _ = lsforge_formats::detect_bytes(data);
});
