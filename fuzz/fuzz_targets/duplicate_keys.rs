#![no_main]

use libfuzzer_sys::fuzz_target;
use yamlizer::options::DuplicateKeyPolicy;
use yamlizer::{YamlMap, options};

// Mappings with intentional duplicate keys, read under every duplicate-key policy.
fuzz_target!(|data: &[u8]| {
    if data.len() > 16 * 1024 {
        return;
    }
    let s = String::from_utf8_lossy(data);

    let yaml_top = format!("a: 1\na: 2\nkey: {s}\nkey: {s}\n");
    let yaml_nested = format!("outer:\n  inner: {{x: 1, x: 2}}\n  arr: [{{k: {s}}}, {{k: {s}}}]\n");
    let yaml_flow = format!("{{'{s}': 1, '{s}': 2}}\n");

    for policy in [
        DuplicateKeyPolicy::LastWins,
        DuplicateKeyPolicy::FirstWins,
        DuplicateKeyPolicy::Error,
    ] {
        let options = options! { duplicate_keys: policy };
        for yaml in [&yaml_top, &yaml_nested, &yaml_flow] {
            if let Ok(map) = YamlMap::parse(yaml, &options) {
                let _ = map.get_from_path("outer.inner.x");
            }
        }
    }
});
