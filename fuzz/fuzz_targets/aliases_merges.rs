#![no_main]

use libfuzzer_sys::fuzz_target;
use yamlizer::{Options, YamlElement, YamlMap, Yamlizer, config_fields};

#[derive(Debug, Default)]
struct Base {
    k: i64,
    v: String,
    w: String,
}

config_fields! {
    Base {
        bind k,
        bind v,
        bind w,
    }
}

#[derive(Debug, Default)]
struct AliasDoc {
    a: String,
    b: String,
    seq: Vec<i64>,
    seq_alias: Vec<i64>,
    base1: Base,
    merged: YamlMap,
}

config_fields! {
    AliasDoc {
        bind a,
        bind b,
        bind seq,
        bind seq_alias,
        bind base1,
        bind merged,
    }
}

// Inputs are spliced into documents built around anchors, aliases and merge keys,
// then bound through the rule table so both the tree builder and the binder run.
fuzz_target!(|data: &[u8]| {
    if data.len() > 16 * 1024 {
        return;
    }
    let s = String::from_utf8_lossy(data);

    let yaml_alias = format!("a: &A {s}\nb: *A\nseq: &S [1, 2, 3]\nseq_alias: *S\n");
    let yaml_merge = format!(
        "base1: &B1 {{k: 1, v: {s}}}\nbase2: &B2 {{k: 2, w: {s}}}\nmerged: {{<<: [*B1, *B2], extra: 3}}\n"
    );

    let yamlizer = Yamlizer::new();
    for yaml in [&yaml_alias, &yaml_merge, &s.to_string()] {
        if let Ok(map) = YamlMap::parse(yaml, &Options::default()) {
            let _doc = yamlizer.deserialize::<AliasDoc>(&YamlElement::Map(map));
        }
    }
});
