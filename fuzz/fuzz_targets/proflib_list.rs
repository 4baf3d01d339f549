#![no_main]

use accprof::config::ProfConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let config = ProfConfig::default();
        // Entries are never empty and never contain a separator.
        for entry in config.parse_proflibs(input) {
            assert!(!entry.is_empty());
            assert!(!entry.contains(';'));
        }
    }
});
