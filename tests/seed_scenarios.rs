mod common;

use common::{capture_warnings, write_config};
use indoc::indoc;
use yamlizer::{YamlConfig, config_fields, yaml_enum};

#[derive(Debug, Default)]
struct Primitives {
    port: i32,
    host: String,
    enabled: bool,
}

config_fields! {
    Primitives {
        bind port,
        bind host,
        bind enabled,
    }
}

#[test]
fn primitives_are_bound() {
    let (_dir, path) = write_config("app.yml", "port: 8080\nhost: \"x\"\nenabled: true\n");
    let mut config = YamlConfig::new(&path, Primitives::default());
    config.load().unwrap();
    assert_eq!((config.port, config.host.as_str(), config.enabled), (8080, "x", true));
}

#[derive(Debug)]
struct Retries {
    retries: i16,
}

impl Default for Retries {
    fn default() -> Self {
        Self { retries: 3 }
    }
}

config_fields! {
    Retries {
        bind retries,
    }
}

#[test]
fn narrowing_overflow_keeps_default_and_warns() {
    let (_dir, path) = write_config("retries.yml", "retries: 300000000000\n");
    let (logger, captured) = capture_warnings();
    let mut config = YamlConfig::new(&path, Retries::default());
    config.set_logger(logger);
    config.load().unwrap();

    assert_eq!(config.retries, 3);
    let warnings = captured.lines_at("WARN");
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].contains("retries"), "{}", warnings[0]);
    assert!(warnings[0].contains("300000000000 does not fit into i16"), "{}", warnings[0]);
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum Level {
    #[default]
    Info,
    Warn,
    Error,
}

yaml_enum! {
    Level {
        Info => "INFO",
        Warn => "WARN",
        Error => "ERROR",
    }
}

#[derive(Debug, Default)]
struct Logging {
    level: Level,
}

config_fields! {
    Logging {
        bind level,
    }
}

#[test]
fn enum_is_read_by_exact_name() {
    let (_dir, path) = write_config("level.yml", "level: \"WARN\"\n");
    let mut config = YamlConfig::new(&path, Logging::default());
    config.load().unwrap();
    assert_eq!(config.level, Level::Warn);
}

#[test]
fn enum_name_is_case_sensitive() {
    let (_dir, path) = write_config("level.yml", "level: \"warn\"\n");
    let (logger, captured) = capture_warnings();
    let mut config = YamlConfig::new(&path, Logging::default());
    config.set_logger(logger);
    config.load().unwrap();

    assert_eq!(config.level, Level::Info);
    let warnings = captured.lines_at("WARN");
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].contains("'warn' is not a valid value for Level"), "{}", warnings[0]);
}

#[derive(Debug, Default)]
struct Tagged {
    tags: Vec<String>,
}

config_fields! {
    Tagged {
        bind tags,
    }
}

#[test]
fn list_of_strings_keeps_order() {
    let (_dir, path) = write_config("tags.yml", "tags: [\"a\",\"b\",\"c\"]\n");
    let mut config = YamlConfig::new(&path, Tagged::default());
    config.load().unwrap();
    assert_eq!(config.tags, ["a", "b", "c"]);
}

#[derive(Debug, Default)]
struct Port {
    port: i32,
}

config_fields! {
    Port {
        bind port,
    }
}

#[test]
fn sub_path_selects_nested_mapping() {
    let (_dir, path) = write_config(
        "server.yml",
        indoc! {"
            server:
              port: 80
        "},
    );
    let mut config = YamlConfig::new(&path, Port::default());
    config.set_sub_path("server");
    config.load().unwrap();
    assert_eq!(config.port, 80);
}

#[derive(Debug)]
struct Endpoint {
    port: i32,
    host: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            port: 0,
            host: "localhost".to_owned(),
        }
    }
}

config_fields! {
    Endpoint {
        bind port,
        bind host,
    }
}

#[test]
fn missing_path_is_tolerated() {
    let (_dir, path) = write_config("endpoint.yml", "port: 80\n");
    let (logger, captured) = capture_warnings();
    let mut config = YamlConfig::new(&path, Endpoint::default());
    config.set_logger(logger);
    config.load().unwrap();

    assert_eq!(config.port, 80);
    assert_eq!(config.host, "localhost");
    let warnings = captured.lines_at("WARN");
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].contains("path 'host'"), "{}", warnings[0]);
    assert!(warnings[0].contains(&path.display().to_string()), "{}", warnings[0]);
}
