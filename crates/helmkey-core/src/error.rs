// ── Core error types ──
//
// User-facing errors from helmkey-core. Consumers never see raw HTTP or
// JSON failures: the `From<helmkey_api::Error>` impl folds Display Service
// failures into `ServiceUnavailable`, and the dispatcher wraps action
// failures into `ActionFailed` itself.

use serde::Serialize;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input device ─────────────────────────────────────────────────
    #[error("Device {path} unavailable: {reason}")]
    DeviceUnavailable { path: String, reason: String },

    #[error("No remote detected among {candidates} candidate device(s)")]
    AutodetectFailed { candidates: usize },

    #[error("Input stream closed: {reason}")]
    StreamClosed { reason: String },

    // ── Display Service ──────────────────────────────────────────────
    #[error("Display service unavailable: {message}")]
    ServiceUnavailable {
        message: String,
        /// HTTP status code (if the service answered at all).
        status: Option<u16>,
    },

    #[error("Unknown display: {id}")]
    UnknownDisplay { id: String },

    #[error("No display is selected")]
    NoActiveDisplay,

    // ── Actions ──────────────────────────────────────────────────────
    #[error("Action failed: {message}")]
    ActionFailed { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Engine is not running")]
    NotRunning,

    #[error("Engine was already started")]
    AlreadyStarted,

    // ── Configuration / persistence ──────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Binding persistence failed: {message}")]
    Persistence { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CoreError {
    /// Category recorded in the rolling error log.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceUnavailable { .. } | Self::StreamClosed { .. } => {
                ErrorKind::DeviceUnavailable
            }
            Self::AutodetectFailed { .. } => ErrorKind::AutodetectFailed,
            Self::ServiceUnavailable { .. } | Self::UnknownDisplay { .. } | Self::NoActiveDisplay => {
                ErrorKind::ServiceUnavailable
            }
            Self::ActionFailed { .. } => ErrorKind::ActionFailed,
            Self::NotRunning | Self::AlreadyStarted | Self::Internal { .. } => ErrorKind::Lifecycle,
            Self::Config { .. } | Self::Persistence { .. } => ErrorKind::Config,
        }
    }
}

/// Error category shown in status snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ErrorKind {
    DeviceUnavailable,
    AutodetectFailed,
    ServiceUnavailable,
    ActionFailed,
    Lifecycle,
    Config,
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<helmkey_api::Error> for CoreError {
    fn from(err: helmkey_api::Error) -> Self {
        match err {
            helmkey_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid display service URL: {e}"),
            },
            helmkey_api::Error::InvalidBaseUrl(url) => CoreError::Config {
                message: format!("Display service URL cannot carry paths: {url}"),
            },
            helmkey_api::Error::ClientBuild(message) => CoreError::Config { message },
            other => CoreError::ServiceUnavailable {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}
