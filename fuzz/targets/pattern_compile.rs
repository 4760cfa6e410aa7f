#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use herald::Pattern;

#[derive(Debug, Arbitrary)]
struct Input {
    source: String,
    channel: String,
}

fuzz_target!(|input: Input| {
    let Ok(pattern) = Pattern::new(&input.source) else {
        return;
    };
    assert_eq!(pattern.key(), input.source);
    assert_eq!(pattern.to_string(), format!("/{}/", input.source));
    let _ = pattern.is_match(&input.channel);
});
