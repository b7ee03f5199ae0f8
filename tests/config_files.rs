mod common;

use std::collections::HashMap;
use std::io::Cursor;

use anyhow::Result;
use common::{capture_warnings, read, write_config};
use indoc::indoc;
use yamlizer::{Error, RawValue, YamlConfig, YamlElement, YamlMap, config_fields, kind, parse_str, yaml_enum};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum Mode {
    #[default]
    Active,
    Passive,
}

yaml_enum! { Mode { Active, Passive } }

#[derive(Debug, Default, PartialEq)]
struct Database {
    url: String,
    pool: u32,
}

config_fields! {
    Database {
        bind url,
        bind pool at "pool.size",
    }
}

#[derive(Debug, Default)]
struct Service {
    name: String,
    mode: Mode,
    weights: HashMap<String, f64>,
    database: Database,
    replicas: [u16; 3],
    started: i64,
}

config_fields! {
    Service {
        bind name,
        bind mode,
        bind weights,
        bind database,
        bind replicas,
        track started,
    }
}

const SERVICE: &str = indoc! {"
    service:
      name: billing
      mode: Passive
      weights: {a: 1, b: 0.25}
      database:
        url: postgres://db/billing
        pool:
          size: 8
      replicas: [1, 2, 3]
      started: 99
"};

#[test]
fn nested_sections_and_collections() -> Result<()> {
    let (_dir, path) = write_config("service.yml", SERVICE);
    let mut config = YamlConfig::new(&path, Service::default());
    config.set_sub_path("service");
    config.load()?;

    assert_eq!(config.name, "billing");
    assert_eq!(config.mode, Mode::Passive);
    assert_eq!(config.weights["a"], 1.0);
    assert_eq!(config.weights["b"], 0.25);
    assert_eq!(
        config.database,
        Database {
            url: "postgres://db/billing".into(),
            pool: 8,
        }
    );
    assert_eq!(config.replicas, [1, 2, 3]);
    // tracked, never loaded
    assert_eq!(config.started, 0);
    Ok(())
}

#[test]
fn values_lists_every_declared_field() -> Result<()> {
    let (_dir, path) = write_config("service.yml", SERVICE);
    let mut config = YamlConfig::new(&path, Service::default());
    config.set_sub_path("service");
    config.load()?;
    config.started = 7;

    let values = config.values();
    assert_eq!(
        values.keys().map(String::as_str).collect::<Vec<_>>(),
        ["name", "mode", "weights", "database", "replicas", "started"]
    );
    assert_eq!(values["mode"], YamlElement::from("Passive"));
    assert_eq!(values["started"], YamlElement::from(7_i64));
    let database = values["database"].get(kind::Map).unwrap();
    assert_eq!(database.get_from_path("pool.size"), Some(&YamlElement::from(8_i64)));
    Ok(())
}

#[test]
fn save_then_load_round_trips() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested/dir/service.yml");
    let mut config = YamlConfig::new(&path, Service::default());
    config.set_sub_path("service");
    config.name = "search".into();
    config.mode = Mode::Passive;
    config.weights.insert("x".into(), 2.0);
    config.database.url = "sqlite::memory:".into();
    config.database.pool = 2;
    config.replicas = [4, 5, 6];
    config.save()?;

    let mut reloaded = YamlConfig::new(&path, Service::default());
    reloaded.set_sub_path("service");
    reloaded.load()?;
    assert_eq!(reloaded.name, "search");
    assert_eq!(reloaded.mode, Mode::Passive);
    assert_eq!(reloaded.weights["x"], 2.0);
    assert_eq!(reloaded.database, config.database);
    assert_eq!(reloaded.replicas, [4, 5, 6]);
    Ok(())
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
fn save_keeps_unrelated_keys() -> Result<()> {
    let (_dir, path) = write_config("app.yml", "other: keep me\nserver:\n  port: 1\n  note: x\n");
    let mut config = YamlConfig::new(&path, Port { port: 8443 });
    config.set_sub_path("server");
    config.save()?;

    let map = YamlMap::parse(&read(&path), &Default::default())?;
    assert_eq!(map.get("other"), Some(&YamlElement::from("keep me")));
    assert_eq!(map.get_from_path("server.port"), Some(&YamlElement::from(8443_i64)));
    assert_eq!(map.get_from_path("server.note"), Some(&YamlElement::from("x")));
    Ok(())
}

#[test]
fn save_keeps_entries_no_field_can_hold() -> Result<()> {
    let (_dir, path) = write_config(
        "app.yml",
        indoc! {"
            port: 1
            comment: ~
            created: !!timestamp 2001-12-14
            defaults: &d {retries: 3}
            client:
              <<: *d
              name: web
            other: keep
        "},
    );
    let mut config = YamlConfig::new(&path, Port::default());
    config.load()?;
    assert_eq!(config.port, 1);
    config.port = 2;
    config.save()?;

    let RawValue::Map(root) = parse_str(&read(&path), &Default::default())? else {
        panic!("root is not a map");
    };
    assert_eq!(root["port"], RawValue::Int(2));
    assert_eq!(root["comment"], RawValue::Null);
    assert!(matches!(&root["created"], RawValue::Tagged { tag, .. } if tag.contains("timestamp")));
    let RawValue::Map(client) = &root["client"] else {
        panic!("client is not a map");
    };
    assert!(matches!(&client["<<"], RawValue::Tagged { .. }));
    assert_eq!(client["name"], RawValue::Str("web".into()));
    assert_eq!(root["other"], RawValue::Str("keep".into()));
    Ok(())
}

#[test]
fn save_refuses_to_replace_a_non_map_root() {
    let contents = "- 1\n- 2\n";
    let (_dir, path) = write_config("list.yml", contents);
    let mut config = YamlConfig::new(&path, Port { port: 80 });
    assert!(matches!(config.save(), Err(Error::RootNotMap { path: Some(_) })));
    assert_eq!(read(&path), contents);
}

#[test]
fn fatal_load_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.yml");
    let mut config = YamlConfig::new(&missing, Port::default());
    assert!(matches!(config.load(), Err(Error::FileNotFound { .. })));

    let (_dir, path) = write_config("scalar.yml", "server: 80\n");
    config.set_file_path(&path).set_sub_path("server");
    assert!(matches!(config.load(), Err(Error::SubPathNotMap { .. })));

    config.set_sub_path("nowhere");
    assert!(matches!(config.load(), Err(Error::SubPathNotMap { .. })));

    let (_dir, path) = write_config("list.yml", "- 1\n- 2\n");
    config.set_file_path(&path).set_sub_path("");
    assert!(matches!(config.load(), Err(Error::RootNotMap { .. })));

    let (_dir, path) = write_config("broken.yml", "port: [1, 2\n");
    config.set_file_path(&path);
    let err = config.load().unwrap_err();
    assert!(matches!(err, Error::Parse { .. }), "{err}");
    assert!(err.location().is_some());
}

#[test]
fn one_bad_field_does_not_stop_the_others() -> Result<()> {
    let (_dir, path) = write_config(
        "service.yml",
        indoc! {"
            name: ok
            mode: sleeping
            replicas: [1, 2]
            weights: {a: heavy}
            database: {url: x}
        "},
    );
    let (logger, captured) = capture_warnings();
    let mut config = YamlConfig::new(&path, Service::default());
    config.set_logger(logger);
    config.load()?;

    assert_eq!(config.name, "ok");
    assert_eq!(config.mode, Mode::Active);
    assert_eq!(config.replicas, [0, 0, 0]);
    assert!(config.weights.is_empty());
    assert_eq!(config.database.url, "x");

    let warnings = captured.lines_at("WARN");
    assert!(warnings.iter().any(|w| w.contains("'mode'") && w.contains("unknown variant")));
    assert!(warnings.iter().any(|w| w.contains("'replicas'") && w.contains("length mismatch")));
    assert!(warnings.iter().any(|w| w.contains("'weights'") && w.contains("type mismatch")));
    let file = path.display().to_string();
    assert!(
        warnings
            .iter()
            .any(|w| w.contains("path 'database.pool.size'") && w.contains(&file)),
        "{warnings:?}"
    );
    Ok(())
}

#[test]
fn custom_rules_apply_to_fields() -> Result<()> {
    let (_dir, path) = write_config("app.yml", "port: http\n");
    let mut config = YamlConfig::new(&path, Port::default());
    config.yamlizer_mut().add_rule::<i32, _>(|element, _| match element.get(kind::Str) {
        Some("http") => Ok(80),
        Some("https") => Ok(443),
        _ => Err(Error::msg(format!("unknown service {element}"))),
    });
    config.load()?;
    assert_eq!(config.port, 80);
    Ok(())
}

#[test]
fn filesystem_helpers() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let resources = dir.path().join("resources");
    std::fs::create_dir_all(&resources)?;
    std::fs::write(resources.join("default.yml"), "port: 9000\n")?;

    let mut config = YamlConfig::new(dir.path().join("conf/app.yml"), Port::default());
    config.set_resource_root(&resources);
    assert!(!config.file_exists());

    assert!(config.from_resource_if_non_existent("default.yml")?);
    assert!(config.file_exists());
    assert!(!config.from_resource_if_non_existent("default.yml")?);
    assert!(!config.copy_if_non_existent(Cursor::new("port: 1\n"))?);
    assert!(!config.create_if_non_existent()?);
    config.load()?;
    assert_eq!(config.port, 9000);

    assert_eq!(config.copy_file(Cursor::new("port: 1\n"))?, 8);
    config.load()?;
    assert_eq!(config.port, 1);

    assert!(matches!(
        config.copy_from_resource("absent.yml"),
        Err(Error::ResourceNotFound { .. })
    ));

    let empty = YamlConfig::new(dir.path().join("empty/app.yml"), Port::default());
    assert!(empty.create_if_non_existent()?);
    assert_eq!(read(empty.file_path()), "");

    let mut fresh = YamlConfig::new(dir.path().join("fresh.yml"), Port::default());
    assert!(fresh.copy_if_non_existent(Cursor::new("port: 3\n"))?);
    fresh.load()?;
    assert_eq!(fresh.port, 3);
    Ok(())
}

#[test]
fn empty_file_loads_nothing() -> Result<()> {
    let (_dir, path) = write_config("empty.yml", "");
    let mut config = YamlConfig::new(&path, Port { port: 5 });
    config.load()?;
    assert_eq!(config.port, 5);
    Ok(())
}
