#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use helmkey_config::{Config, ConfigError, TomlBindingStore, load_config, save_config};
use helmkey_core::{Action, Binding, BindingStore, BindingTable, HttpMethod, RecordLayout};

fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, body).unwrap();
    (dir, path)
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();

    assert_eq!(config.service.url, "http://localhost:3000/plugins/kip/");
    assert_eq!(config.service.display_interval, Duration::from_secs(2));
    assert_eq!(config.service.dashboard_interval, Duration::from_secs(1));
    assert_eq!(config.device.min_key_presses, 2);
    assert!(config.bindings.is_empty());

    let engine = config.to_engine_config().unwrap();
    assert_eq!(engine.device.layout, RecordLayout::native());
    assert_eq!(engine.local_base_url.as_str(), "http://localhost:3000/");
}

#[test]
fn file_values_override_defaults() {
    let (_dir, path) = write_config(
        r#"
        error_history = 5

        [device]
        path = "/dev/input/event3"
        autodetect_window = "1m 30s"
        record_size = 16

        [service]
        url = "https://boat.local:3443/plugins/kip"
        dashboard_interval = "500ms"
        timeout = 3
        insecure = true

        [[bindings]]
        display = "helm"
        dashboard = "anchor"
        action = { kind = "rest", url = "/api/anchor", method = "post", body = { on = true } }
        "#,
    );

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.error_history, 5);
    assert_eq!(config.device.autodetect_window, Duration::from_secs(90));
    assert_eq!(config.service.dashboard_interval, Duration::from_millis(500));
    assert_eq!(config.service.timeout, Duration::from_secs(3));
    // untouched keys keep their defaults
    assert_eq!(config.service.display_interval, Duration::from_secs(2));

    let engine = config.to_engine_config().unwrap();
    assert_eq!(engine.device.path, Some(PathBuf::from("/dev/input/event3")));
    assert_eq!(engine.device.layout, RecordLayout::Timeval32);
    assert!(engine.service.insecure);
    // trailing slash is added so relative joins stay under the plugin path
    assert_eq!(engine.service.url.as_str(), "https://boat.local:3443/plugins/kip/");
    assert_eq!(
        engine.bindings,
        vec![Binding {
            display: "helm".into(),
            dashboard: "anchor".into(),
            action: Action::Rest {
                url: "/api/anchor".into(),
                method: HttpMethod::Post,
                query: Default::default(),
                body: Some(json!({"on": true})),
            },
        }]
    );
}

#[test]
fn malformed_duration_is_a_load_error() {
    let (_dir, path) = write_config("[service]\ntimeout = \"soon\"\n");
    assert!(matches!(load_config(Some(&path)), Err(ConfigError::Figment(_))));
}

#[test]
fn validation_names_the_offending_field() {
    let cases: [(fn(&mut Config), &str); 5] = [
        (|c| c.service.url = "not a url".into(), "service.url"),
        (|c| c.local_base_url = "ftp://boat.local/".into(), "local_base_url"),
        (|c| c.device.record_size = Some(20), "device.record_size"),
        (|c| c.device.min_key_presses = 0, "device.min_key_presses"),
        (|c| c.service.display_interval = Duration::ZERO, "service.display_interval"),
    ];

    for (mutate, expected) in cases {
        let mut config = Config::default();
        mutate(&mut config);
        match config.to_engine_config() {
            Err(ConfigError::Validation { field, .. }) => assert_eq!(field, expected),
            other => panic!("expected validation error for {expected}, got {other:?}"),
        }
    }
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.service.dashboard_interval = Duration::from_millis(750);
    config.device.name_fragment = Some("Media_Remote".into());
    let written = save_config(&config, Some(&path)).unwrap();
    assert_eq!(written, path);

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("dashboard_interval = \"750ms\""));

    let loaded = load_config(Some(&path)).unwrap();
    assert_eq!(loaded.service.dashboard_interval, Duration::from_millis(750));
    assert_eq!(loaded.device.name_fragment.as_deref(), Some("Media_Remote"));
}

#[test]
fn bindings_path_prefers_configured_file() {
    let mut config = Config::default();
    assert!(config.bindings_path().ends_with("bindings.toml"));

    config.bindings_file = Some(PathBuf::from("/var/lib/helmkey/bindings.toml"));
    assert_eq!(config.bindings_path(), PathBuf::from("/var/lib/helmkey/bindings.toml"));
}

#[test]
fn binding_store_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = TomlBindingStore::new(dir.path().join("bindings.toml"));
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn binding_store_persists_table() {
    let dir = tempfile::tempdir().unwrap();
    let store = TomlBindingStore::new(dir.path().join("state").join("bindings.toml"));

    let table: BindingTable = [
        Binding {
            display: "helm".into(),
            dashboard: "wind".into(),
            action: Action::Signalk {
                path: "steering.autopilot.target".into(),
                value: json!(1.5),
            },
        },
        Binding {
            display: "helm".into(),
            dashboard: "depth".into(),
            action: Action::None,
        },
    ]
    .into_iter()
    .collect();

    store.save(&table).unwrap();
    assert!(!store.path().with_extension("toml.tmp").exists());

    let loaded = store.load().unwrap();
    assert_eq!(loaded, table);
    assert_eq!(loaded.lookup("helm", "depth"), Some(&Action::None));
}

#[test]
fn binding_store_rejects_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bindings.toml");
    fs::write(&path, "bindings = 7").unwrap();

    let err = TomlBindingStore::new(&path).load().unwrap_err();
    assert!(err.to_string().contains("bindings.toml"));
}
