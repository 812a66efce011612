#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Shard and catalog sources come from disk; malformed input must error, not panic
    let _ = doxfind::index::parse_search_data(data);
    let _ = doxfind::index::catalog::parse_catalog(data);
    let _ = doxfind::utils::decode_search_id(data);
    let _ = doxfind::utils::unescape_html(data);
});
