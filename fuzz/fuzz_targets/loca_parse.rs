#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: localization contentList XML parser.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = lsforge_codec::loca::parse_content_list(text);
    }
});
