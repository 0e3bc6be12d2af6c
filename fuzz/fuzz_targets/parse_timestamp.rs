#![no_main]

use bulto_core::event::parse_timestamp_str;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_timestamp_str(s);
    }
});
