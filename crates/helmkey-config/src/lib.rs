//! Configuration for the helmkey engine and CLI.
//!
//! TOML file + `HELMKEY_` environment layering via figment, platform
//! config paths, translation to [`helmkey_core::EngineConfig`], and the
//! file-backed [`TomlBindingStore`].

mod bindings;
pub mod duration;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use helmkey_core::{Binding, DeviceConfig, EngineConfig, RecordLayout, ServiceConfig};

pub use bindings::TomlBindingStore;

const ENV_PREFIX: &str = "HELMKEY_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level `config.toml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Base URL for REST actions given as bare paths.
    pub local_base_url: String,
    /// Number of recent errors kept in the status snapshot.
    pub error_history: usize,
    /// Where bindings are persisted. Defaults to the platform data dir.
    pub bindings_file: Option<PathBuf>,
    pub device: DeviceSection,
    pub service: ServiceSection,
    /// Bindings merged over the persisted ones at start.
    pub bindings: Vec<Binding>,
}

impl Default for Config {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            local_base_url: engine.local_base_url.to_string(),
            error_history: engine.error_history,
            bindings_file: None,
            device: DeviceSection::default(),
            service: ServiceSection::default(),
            bindings: Vec::new(),
        }
    }
}

/// `[device]`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceSection {
    /// Explicit device node; autodetect when absent.
    pub path: Option<PathBuf>,
    pub candidates: Vec<PathBuf>,
    pub input_dir: PathBuf,
    pub by_id_dir: Option<PathBuf>,
    pub name_fragment: Option<String>,
    #[serde(with = "duration")]
    pub autodetect_window: Duration,
    pub min_key_presses: u32,
    /// 16 or 24; host pointer width when absent.
    pub record_size: Option<usize>,
}

impl Default for DeviceSection {
    fn default() -> Self {
        let device = DeviceConfig::default();
        Self {
            path: device.path,
            candidates: device.candidates,
            input_dir: device.input_dir,
            by_id_dir: device.by_id_dir,
            name_fragment: device.name_fragment,
            autodetect_window: device.autodetect_window,
            min_key_presses: device.min_key_presses,
            record_size: None,
        }
    }
}

/// `[service]`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSection {
    pub url: String,
    #[serde(with = "duration")]
    pub display_interval: Duration,
    #[serde(with = "duration")]
    pub dashboard_interval: Duration,
    #[serde(with = "duration")]
    pub timeout: Duration,
    pub insecure: bool,
}

impl Default for ServiceSection {
    fn default() -> Self {
        let service = ServiceConfig::default();
        Self {
            url: service.url.to_string(),
            display_interval: service.display_interval,
            dashboard_interval: service.dashboard_interval,
            timeout: service.timeout,
            insecure: service.insecure,
        }
    }
}

impl Config {
    /// Validate and convert to the engine's runtime configuration.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let layout = match self.device.record_size {
            None => RecordLayout::native(),
            Some(size) => RecordLayout::from_record_size(size)
                .ok_or_else(|| invalid("device.record_size", format!("expected 16 or 24, got {size}")))?,
        };
        if self.device.min_key_presses == 0 {
            return Err(invalid("device.min_key_presses", "must be at least 1"));
        }
        for (field, value) in [
            ("service.display_interval", self.service.display_interval),
            ("service.dashboard_interval", self.service.dashboard_interval),
            ("service.timeout", self.service.timeout),
        ] {
            if value.is_zero() {
                return Err(invalid(field, "must be greater than zero"));
            }
        }

        Ok(EngineConfig {
            device: DeviceConfig {
                path: self.device.path.clone(),
                candidates: self.device.candidates.clone(),
                input_dir: self.device.input_dir.clone(),
                by_id_dir: self.device.by_id_dir.clone(),
                name_fragment: self.device.name_fragment.clone(),
                autodetect_window: self.device.autodetect_window,
                min_key_presses: self.device.min_key_presses,
                layout,
            },
            service: ServiceConfig {
                url: parse_base_url("service.url", &self.service.url)?,
                display_interval: self.service.display_interval,
                dashboard_interval: self.service.dashboard_interval,
                timeout: self.service.timeout,
                insecure: self.service.insecure,
            },
            local_base_url: parse_base_url("local_base_url", &self.local_base_url)?,
            error_history: self.error_history,
            bindings: self.bindings.clone(),
        })
    }

    /// Binding file path: configured, else the platform data directory.
    pub fn bindings_path(&self) -> PathBuf {
        self.bindings_file.clone().unwrap_or_else(default_bindings_path)
    }
}

/// Parse a base URL, forcing a trailing slash so relative joins append.
fn parse_base_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw).map_err(|e| invalid(field, format!("{e}: {raw}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(field, format!("expected http(s) URL, got {raw}")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

// ── Config file paths ───────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "helmkey", "helmkey")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the persisted binding table.
pub fn default_bindings_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("bindings.toml"),
        |dirs| dirs.data_dir().join("bindings.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("helmkey");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered sources: defaults, then the TOML file at `path` (or the
/// platform path), then `HELMKEY_*` variables with `__` as the section
/// separator (`HELMKEY_SERVICE__TIMEOUT=10s`).
pub fn figment(path: Option<&Path>) -> Figment {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the full Config from file + environment. A missing file is not
/// an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config: Config = figment(path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path` (or the platform path).
pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(path)
}
