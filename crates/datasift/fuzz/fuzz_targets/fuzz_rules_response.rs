//! Fuzz target for interpretation-service answers.
//!
//! Any answer text must parse into rules or a clean error, and the rules it
//! yields must be safe to validate.

#![no_main]

use datasift::rules::parse_rules_response;
use datasift::{Dataset, RawRule, RuleValidator};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let raw_rules = vec![
        RawRule::with_description("Amount must be positive"),
        RawRule::with_description("Code must match [A-Z]+"),
    ];
    let Ok(parsed) = parse_rules_response(text, &raw_rules) else {
        return;
    };

    let dataset = Dataset::from_cells(
        vec!["Amount".to_string(), "Code".to_string()],
        vec![
            vec!["-1".to_string(), "AB".to_string()],
            vec![String::new(), "x1".to_string()],
        ],
    );
    if let Ok(dataset) = dataset {
        let rules: Vec<_> = parsed.rules.into_iter().map(|(_, rule)| rule).collect();
        let _ = RuleValidator::new().validate(&dataset, &rules);
    }
});
