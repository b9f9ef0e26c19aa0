// ── Runtime engine configuration ──
//
// These types describe where the remote lives and how to reach the
// Display Service. They never touch disk: helmkey-config (or any other
// host) builds an `EngineConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::input::decoder::RecordLayout;
use crate::model::Binding;

/// Where to read key events from.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Explicit device node. `None` runs autodetection at start.
    pub path: Option<PathBuf>,
    /// Paths to sniff during autodetection. Empty means every `event*`
    /// node in [`input_dir`](Self::input_dir).
    pub candidates: Vec<PathBuf>,
    pub input_dir: PathBuf,
    /// Stable by-id symlink directory consulted before sniffing.
    pub by_id_dir: Option<PathBuf>,
    /// Hardware-name fragment matched against by-id entries. There is no
    /// default: remotes report vendor-specific names, so the by-id lookup
    /// only runs once this is set (e.g. `"Media_Remote"`).
    pub name_fragment: Option<String>,
    pub autodetect_window: Duration,
    pub min_key_presses: u32,
    pub layout: RecordLayout,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: None,
            candidates: Vec::new(),
            input_dir: PathBuf::from("/dev/input"),
            by_id_dir: Some(PathBuf::from("/dev/input/by-id")),
            name_fragment: None,
            autodetect_window: Duration::from_secs(10),
            min_key_presses: 2,
            layout: RecordLayout::native(),
        }
    }
}

/// How to reach the Display Service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL; `displays` is resolved relative to it.
    pub url: Url,
    /// Display-list refresh period.
    pub display_interval: Duration,
    /// Per-display dashboard + active index refresh period.
    pub dashboard_interval: Duration,
    /// Request timeout for service calls and REST actions.
    pub timeout: Duration,
    /// Accept self-signed certificates.
    pub insecure: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: default_url("http://localhost:3000/plugins/kip/"),
            display_interval: Duration::from_secs(2),
            dashboard_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
            insecure: false,
        }
    }
}

/// Complete configuration for one [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub device: DeviceConfig,
    pub service: ServiceConfig,
    /// Base for REST actions whose URL is a bare path.
    pub local_base_url: Url,
    /// How many recent errors the status snapshot keeps.
    pub error_history: usize,
    /// Bindings merged over the persisted ones at start (these win).
    pub bindings: Vec<Binding>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            service: ServiceConfig::default(),
            local_base_url: default_url("http://localhost:3000/"),
            error_history: 20,
            bindings: Vec::new(),
        }
    }
}

#[allow(clippy::expect_used)]
fn default_url(raw: &str) -> Url {
    Url::parse(raw).expect("default URL is valid")
}
