#![forbid(unsafe_code)]

use std::process::exit;

use tracing_subscriber::EnvFilter;

use yamlizer::{Options, YamlElement, YamlMap, emit};

/// Read a YAML file and print the element at a dotted path (the whole document when
/// no path is given). Can also be used as a validator: keys that cannot be bound are
/// reported on stderr.
fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let path = match args.next().ok_or(
        "This program prints the typed elements of a YAML configuration file. \
        Expected a path to a YAML file as the first argument and optionally a dotted key path",
    ) {
        Ok(path) => path,
        Err(err) => {
            eprintln!("{err}");
            exit(1);
        }
    };
    let key = args.next().unwrap_or_default();

    let file = match std::fs::File::open(&path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Failed to read {path}: {err}");
            exit(2);
        }
    };

    let map = match YamlMap::from_reader(std::io::BufReader::new(file), &Options::default()) {
        Ok(map) => map,
        Err(err) => {
            eprintln!("{path} invalid:\n{err}");
            exit(3);
        }
    };

    let element = if key.is_empty() {
        YamlElement::Map(map)
    } else {
        match map.get_from_path(&key) {
            Some(element) => element.clone(),
            None => {
                eprintln!("{path} has no element at '{key}'");
                exit(4);
            }
        }
    };

    println!("{}", element);
    print!("{}", emit::to_string(&element));
}
