//! Integration tests for the `helmkey` binary.
//!
//! Argument parsing, config handling, and the one-shot commands against
//! temp-file devices and a mocked Display Service.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// `helmkey` with env isolation: no `HELMKEY_*` overrides and platform
/// directories pointed at a nonexistent path.
fn helmkey_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("helmkey");
    cmd.env("HOME", "/tmp/helmkey-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/helmkey-cli-test-nonexistent")
        .env("XDG_DATA_HOME", "/tmp/helmkey-cli-test-nonexistent")
        .env_remove("HELMKEY_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `config.toml` with a private bindings file and input dir.
    fn config(&self, extra: &str) -> PathBuf {
        let input_dir = self.path("input");
        std::fs::create_dir_all(&input_dir).unwrap();
        let body = format!(
            "bindings_file = {bindings:?}\n{extra}\n[device]\ninput_dir = {input:?}\nrecord_size = 24\n",
            bindings = self.path("bindings.toml").display().to_string(),
            input = input_dir.display().to_string(),
        );
        let path = self.path("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }
}

/// Two full press/release cycles of `code` as 24-byte records.
fn key_presses(code: u16) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, value) in [1i32, 0, 1, 0].into_iter().enumerate() {
        out.extend_from_slice(&1_700_000_000i64.to_le_bytes());
        out.extend_from_slice(&i64::try_from(i * 1000).unwrap().to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&code.to_le_bytes());
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

fn write_device(path: &Path, bytes: &[u8]) {
    std::fs::write(path, bytes).unwrap();
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_usage() {
    let output = helmkey_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn help_lists_commands() {
    helmkey_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("run")
            .and(predicate::str::contains("detect"))
            .and(predicate::str::contains("dump"))
            .and(predicate::str::contains("displays"))
            .and(predicate::str::contains("bindings")),
    );
}

#[test]
fn version_flag() {
    helmkey_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("helmkey"));
}

#[test]
fn unknown_subcommand_is_usage_error() {
    helmkey_cmd().arg("steer").assert().code(2);
}

#[test]
fn detect_rejects_zero_presses() {
    helmkey_cmd()
        .args(["detect", "--min-presses", "0"])
        .assert()
        .code(2);
}

#[test]
fn detect_rejects_bad_window() {
    helmkey_cmd()
        .args(["detect", "--window", "soonish"])
        .assert()
        .code(2);
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn invalid_config_exits_with_config_code() {
    let fx = Fixture::new();
    let config = fx.config("[service]\nurl = \"not a url\"\n");

    helmkey_cmd()
        .arg("--config")
        .arg(&config)
        .arg("displays")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("service.url"));
}

#[test]
fn malformed_config_file_exits_with_config_code() {
    let fx = Fixture::new();
    let config = fx.path("config.toml");
    std::fs::write(&config, "[service\n").unwrap();

    helmkey_cmd()
        .arg("--config")
        .arg(&config)
        .arg("bindings")
        .assert()
        .code(5);
}

// ── Bindings ────────────────────────────────────────────────────────

#[test]
fn bindings_lists_persisted_table() {
    let fx = Fixture::new();
    let config = fx.config("");
    std::fs::write(
        fx.path("bindings.toml"),
        r#"
        [[bindings]]
        display = "helm"
        dashboard = "anchor"
        action = { kind = "rest", url = "/api/anchor", method = "POST" }
        "#,
    )
    .unwrap();

    helmkey_cmd()
        .arg("--config")
        .arg(&config)
        .arg("bindings")
        .assert()
        .success()
        .stdout(predicate::str::contains("helm").and(predicate::str::contains("POST /api/anchor")));
}

#[test]
fn bindings_merged_overlays_config() {
    let fx = Fixture::new();
    let config = fx.config(
        r#"
        [[bindings]]
        display = "nav"
        dashboard = "ais"
        action = { kind = "signalk", path = "navigation.ais.enabled", value = true }
        "#,
    );

    let output = helmkey_cmd()
        .arg("--config")
        .arg(&config)
        .args(["-o", "json", "bindings", "--merged"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        parsed,
        json!([{
            "display": "nav",
            "dashboard": "ais",
            "action": {"kind": "signalk", "path": "navigation.ais.enabled", "value": true}
        }])
    );

    // Without --merged only the (absent) persisted table is shown.
    helmkey_cmd()
        .arg("--config")
        .arg(&config)
        .args(["-o", "plain", "bindings"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// ── Devices ─────────────────────────────────────────────────────────

#[test]
fn detect_finds_device_producing_presses() {
    let fx = Fixture::new();
    let config = fx.config("");
    let quiet = fx.path("event0");
    let remote = fx.path("event1");
    write_device(&quiet, &[]);
    write_device(&remote, &key_presses(115));

    helmkey_cmd()
        .arg("--config")
        .arg(&config)
        .args(["detect", "--window", "5s"])
        .arg(&quiet)
        .arg(&remote)
        .assert()
        .success()
        .stdout(predicate::str::contains("event1").and(predicate::str::contains("sniff")));
}

#[test]
fn detect_save_pins_device_in_config() {
    let fx = Fixture::new();
    let config = fx.config("");
    let remote = fx.path("event2");
    write_device(&remote, &key_presses(115));

    helmkey_cmd()
        .arg("--config")
        .arg(&config)
        .args(["-q", "detect", "--save", "--window", "5s"])
        .arg(&remote)
        .assert()
        .success();

    let saved = helmkey_config::load_config(Some(&config)).unwrap();
    assert_eq!(saved.device.path.as_deref(), Some(remote.as_path()));
    assert_eq!(saved.device.record_size, Some(24));
    assert_eq!(saved.bindings_path(), fx.path("bindings.toml"));
}

#[test]
fn detect_without_remote_exits_with_device_code() {
    let fx = Fixture::new();
    let config = fx.config("");

    helmkey_cmd()
        .arg("--config")
        .arg(&config)
        .args(["detect", "--window", "200ms"])
        .arg(fx.path("missing"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No remote detected"));
}

#[test]
fn dump_prints_classified_keys() {
    let fx = Fixture::new();
    let config = fx.config("");
    let device = fx.path("event4");
    write_device(&device, &key_presses(163));

    // A file ends, which a live device never does: the stream closes and
    // the command reports the device as gone.
    helmkey_cmd()
        .arg("--config")
        .arg(&config)
        .arg("dump")
        .arg("--device")
        .arg(&device)
        .assert()
        .code(3)
        .stdout(
            predicate::str::contains("KEY_NEXTSONG down (NEXT)")
                .and(predicate::str::contains("KEY_NEXTSONG up")),
        );
}

#[test]
fn dump_all_prints_raw_records() {
    let fx = Fixture::new();
    let config = fx.config("");
    let device = fx.path("event4");
    write_device(&device, &key_presses(115));

    helmkey_cmd()
        .arg("--config")
        .arg(&config)
        .args(["dump", "--all", "--device"])
        .arg(&device)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("1700000000.001000 type=1 code=115 value=0"));
}

#[test]
fn dump_missing_device_exits_with_device_code() {
    let fx = Fixture::new();
    let config = fx.config("");

    helmkey_cmd()
        .arg("--config")
        .arg(&config)
        .arg("dump")
        .arg("--device")
        .arg(fx.path("event99"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("event99"));
}

// ── Display Service ─────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn displays_lists_service_state() {
    let server = MockServer::start().await;
    for (route, body) in [
        ("/plugins/kip/displays", json!({"displays": [{"id": "helm", "name": "Helm"}, {"id": "nav"}]})),
        ("/plugins/kip/displays/helm", json!([{"id": "wind", "name": "Wind"}, {"id": "depth"}])),
        ("/plugins/kip/displays/helm/screenIndex", json!({"screenIndex": 1})),
        ("/plugins/kip/displays/nav", json!({"dashboards": []})),
        ("/plugins/kip/displays/nav/screenIndex", json!(null)),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
    }

    let fx = Fixture::new();
    let config = fx.config(&format!("[service]\nurl = \"{}/plugins/kip/\"\n", server.uri()));

    let output = tokio::task::spawn_blocking(move || {
        helmkey_cmd()
            .arg("--config")
            .arg(&config)
            .args(["-o", "json", "displays"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed[0]["id"], "helm");
    assert_eq!(parsed[0]["activeIndex"], 1);
    assert_eq!(parsed[0]["dashboards"][1]["id"], "depth");
    assert_eq!(parsed[1]["id"], "nav");
    assert_eq!(parsed[1]["activeIndex"], serde_json::Value::Null);
}

#[test]
fn unreachable_service_exits_with_service_code() {
    let fx = Fixture::new();
    let config = fx.config("[service]\nurl = \"http://127.0.0.1:9/plugins/kip/\"\ntimeout = \"2s\"\n");

    helmkey_cmd()
        .arg("--config")
        .arg(&config)
        .arg("displays")
        .assert()
        .code(4);
}
