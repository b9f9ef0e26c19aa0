//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use helmkey_config::ConfigError;
use helmkey_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const DEVICE: i32 = 3;
    pub const SERVICE: i32 = 4;
    pub const CONFIG: i32 = 5;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Device ───────────────────────────────────────────────────────
    #[error("Input device {path} is unavailable: {reason}")]
    #[diagnostic(
        code(helmkey::device_unavailable),
        help(
            "Check that the remote is connected and that this user can read\n\
             the device node (usually membership in the `input` group)."
        )
    )]
    DeviceUnavailable { path: String, reason: String },

    #[error("No remote detected among {candidates} candidate device(s)")]
    #[diagnostic(
        code(helmkey::no_remote),
        help(
            "Press a remote key while detection runs, or widen the window:\n\
             helmkey detect --window 30s"
        )
    )]
    NoRemote { candidates: usize },

    // ── Service ──────────────────────────────────────────────────────
    #[error("Display Service unavailable: {message}")]
    #[diagnostic(
        code(helmkey::service_unavailable),
        help("Check [service].url in the config and that the service is running.")
    )]
    ServiceUnavailable { message: String },

    #[error("Unknown display '{id}'")]
    #[diagnostic(code(helmkey::unknown_display), help("Run: helmkey displays"))]
    UnknownDisplay { id: String },

    #[error("Action failed: {message}")]
    #[diagnostic(code(helmkey::action_failed))]
    ActionFailed { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("{source}")]
    #[diagnostic(
        code(helmkey::config),
        help("Config is read from {path}, then HELMKEY_* environment variables.")
    )]
    Config {
        #[source]
        source: ConfigError,
        path: String,
    },

    #[error("Binding storage failed: {message}")]
    #[diagnostic(code(helmkey::bindings))]
    Bindings { message: String },

    // ── Engine ───────────────────────────────────────────────────────
    #[error("Engine error: {message}")]
    #[diagnostic(code(helmkey::engine))]
    Engine { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    #[diagnostic(code(helmkey::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn config(source: ConfigError, path: &std::path::Path) -> Self {
        Self::Config {
            source,
            path: path.display().to_string(),
        }
    }

    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DeviceUnavailable { .. } | Self::NoRemote { .. } => exit_code::DEVICE,
            Self::ServiceUnavailable { .. } => exit_code::SERVICE,
            Self::Config { .. } | Self::Bindings { .. } => exit_code::CONFIG,
            Self::UnknownDisplay { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeviceUnavailable { path, reason } => Self::DeviceUnavailable { path, reason },
            CoreError::StreamClosed { reason } => Self::DeviceUnavailable {
                path: "(input stream)".into(),
                reason,
            },
            CoreError::AutodetectFailed { candidates } => Self::NoRemote { candidates },
            CoreError::ServiceUnavailable { message, .. } => Self::ServiceUnavailable { message },
            CoreError::UnknownDisplay { id } => Self::UnknownDisplay { id },
            CoreError::NoActiveDisplay => Self::ServiceUnavailable {
                message: "no display is selected".into(),
            },
            CoreError::ActionFailed { message } => Self::ActionFailed { message },
            CoreError::Config { message } => Self::Config {
                source: ConfigError::Validation {
                    field: "engine".into(),
                    reason: message,
                },
                path: "(engine)".into(),
            },
            CoreError::Persistence { message } => Self::Bindings { message },
            err @ (CoreError::NotRunning | CoreError::AlreadyStarted | CoreError::Internal { .. }) => Self::Engine {
                message: err.to_string(),
            },
        }
    }
}
