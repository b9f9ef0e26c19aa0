// ── Commands ──
//
// Everything that mutates the selection goes through the engine's command
// channel and is applied one at a time by the command processor.

use tokio::sync::oneshot;

use crate::error::CoreError;
use crate::input::classify::ClassifiedEvent;

/// A request to the remote-control state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A key event from the device (or injected by the host).
    Key(ClassifiedEvent),
    /// Select a display. Unknown or absent ids fall back to the first
    /// known display.
    SetActiveDisplay { display_id: Option<String> },
    /// Show dashboard `index` on a display; clamped to the cached count.
    SetActiveDashboard { display_id: String, index: usize },
}

/// What a command changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Nothing to do for this input in the current state.
    Ignored,
    ActiveDisplay(Option<String>),
    ActiveDashboard { display_id: String, index: usize },
    /// The bound action was handed off; its outcome lands in the status.
    Dispatched { display: String, dashboard: String },
}

pub(crate) struct CommandEnvelope {
    pub command: Command,
    /// `None` for fire-and-forget commands from the ingestion task.
    pub response_tx: Option<oneshot::Sender<Result<CommandResult, CoreError>>>,
}
