#![no_main]
use libfuzzer_sys::fuzz_target;
use snakebite::translate::{QueryDefaults, collect_params, translate};

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        // Treat the input as a raw query string; translation must never panic.
        let pairs = s
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()));
        if let Ok(params) = collect_params(pairs) {
            let _ = translate(&params, &QueryDefaults::default());
        }
    }
});
