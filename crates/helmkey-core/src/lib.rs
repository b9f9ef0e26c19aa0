//! Remote-control engine between a hardware input device and the
//! chartplotter Display Service.
//!
//! - **[`input`]**: decodes raw input records from a device node
//!   ([`EventCodec`], [`event_stream`]), classifies them into symbolic keys
//!   ([`classify`]) and discovers which device node is the remote
//!   ([`autodetect`](input::autodetect::autodetect)).
//!
//! - **[`StateStore`]**: the single, mutex-guarded
//!   [`RemoteControlState`](store::RemoteControlState): known displays, the
//!   selected display, cached dashboards and active indices, the bounded
//!   error log and the health string. Every mutation goes through
//!   [`StateStore::update`].
//!
//! - **[`Engine`]**: facade owning the background tasks: device
//!   ingestion, the serial command processor that runs the remote-control
//!   state machine, and the two reconciliation timers that poll the
//!   Display Service. [`Engine::start`] / [`Engine::stop`] are the host's
//!   lifecycle hooks.
//!
//! - **[`ActionDispatcher`]**: fires the [`Action`] bound to the current
//!   display + dashboard when PLAY is pressed.

pub mod bindings;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod input;
pub mod machine;
pub mod model;
pub mod reconcile;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bindings::{BindingStore, MemoryBindingStore};
pub use command::{Command, CommandResult};
pub use config::{DeviceConfig, EngineConfig, ServiceConfig};
pub use dispatch::{ActionDispatcher, ActionOutcome, StateWrite};
pub use engine::Engine;
pub use error::{CoreError, ErrorKind};
pub use input::autodetect::{AutodetectOptions, AutodetectResult, DetectMethod};
pub use input::classify::{ClassifiedEvent, KeyAction, KeyName, RemoteKey, classify};
pub use input::decoder::{EventCodec, RawEvent, RecordLayout, event_stream};
pub use input::device::{DeviceOpener, DeviceReader, FsOpener};
pub use model::{Action, Binding, BindingTable};
pub use store::{StateStore, StatusSnapshot};

pub use helmkey_api::HttpMethod;
