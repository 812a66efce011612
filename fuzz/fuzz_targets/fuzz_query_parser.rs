#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing any string must terminate without panicking
    let query = doxfind::query::parse_query(data);
    let _ = query.root.into_prefix();
});
