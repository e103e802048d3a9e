//! Fuzz target for the table parsers.
//!
//! The dataset and rules parsers must never panic on malformed input,
//! whatever the delimiter mix.

#![no_main]

use datasift::{Parser, ParserConfig, RuleSet};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    if let Ok((dataset, _)) = Parser::new().parse_bytes(data) {
        let _ = dataset.upload_summary(5);
    }
    let _ = RuleSet::parse_bytes(data, &ParserConfig::default());
});
