// ── Remote-control state machine ──
//
// Applies one command at a time. Navigation keys act on key-down only;
// dashboard changes are written to the Display Service first and cached
// only once the service accepts them.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Utc;
use helmkey_api::DisplayClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandResult};
use crate::dispatch::ActionDispatcher;
use crate::error::CoreError;
use crate::input::classify::{ClassifiedEvent, KeyAction, RemoteKey};
use crate::model::BindingTable;
use crate::store::{ActionReport, StateStore};

pub(crate) struct StateMachine {
    client: DisplayClient,
    store: Arc<StateStore>,
    dispatcher: ActionDispatcher,
    bindings: Arc<ArcSwap<BindingTable>>,
    cancel: CancellationToken,
}

impl StateMachine {
    pub(crate) fn new(
        client: DisplayClient,
        store: Arc<StateStore>,
        dispatcher: ActionDispatcher,
        bindings: Arc<ArcSwap<BindingTable>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            store,
            dispatcher,
            bindings,
            cancel,
        }
    }

    pub(crate) async fn handle(&self, command: Command) -> Result<CommandResult, CoreError> {
        match command {
            Command::Key(event) => self.handle_key(event).await,
            Command::SetActiveDisplay { display_id } => {
                let active = self
                    .store
                    .update(|state| state.set_active_display(display_id.as_deref()))
                    .await;
                Ok(CommandResult::ActiveDisplay(active))
            }
            Command::SetActiveDashboard { display_id, index } => {
                self.set_active_dashboard(display_id, index).await
            }
        }
    }

    async fn handle_key(&self, event: ClassifiedEvent) -> Result<CommandResult, CoreError> {
        self.store.update(|state| state.record_key(event)).await;

        if event.action != KeyAction::Down {
            return Ok(CommandResult::Ignored);
        }
        let Some(key) = event.remote_key() else {
            return Ok(CommandResult::Ignored);
        };
        debug!(%key, "remote key");

        match key {
            RemoteKey::VolumeUp => Ok(self.step_display(1).await),
            RemoteKey::VolumeDown => Ok(self.step_display(-1).await),
            RemoteKey::Next => self.step_dashboard(1).await,
            RemoteKey::Prev => self.step_dashboard(-1).await,
            RemoteKey::Play => Ok(self.play().await),
        }
    }

    async fn step_display(&self, delta: isize) -> CommandResult {
        match self.store.update(|state| state.step_display(delta)).await {
            Some(active) => {
                info!(display = %active, "active display changed");
                CommandResult::ActiveDisplay(Some(active))
            }
            None => CommandResult::Ignored,
        }
    }

    async fn step_dashboard(&self, delta: isize) -> Result<CommandResult, CoreError> {
        let Some((display_id, index)) = self.store.read(|state| state.stepped_index(delta)).await else {
            return Ok(CommandResult::Ignored);
        };
        self.write_index(display_id, index).await
    }

    async fn set_active_dashboard(
        &self,
        display_id: String,
        index: usize,
    ) -> Result<CommandResult, CoreError> {
        let count = self
            .store
            .read(|state| {
                state
                    .is_known(&display_id)
                    .then(|| state.dashboard_count(&display_id))
            })
            .await;

        match count {
            None => Err(CoreError::UnknownDisplay { id: display_id }),
            Some(0) => Ok(CommandResult::Ignored),
            Some(count) => self.write_index(display_id, index.min(count - 1)).await,
        }
    }

    /// Write-then-cache: the local index only moves once the service
    /// has accepted the change.
    async fn write_index(&self, display_id: String, index: usize) -> Result<CommandResult, CoreError> {
        if let Err(e) = self.client.set_active_screen(&display_id, index).await {
            let err = CoreError::from(e);
            warn!(display = %display_id, index, error = %err, "dashboard change rejected");
            self.store.update(|state| state.record_error(&err)).await;
            return Err(err);
        }

        let committed = self
            .store
            .update(|state| state.commit_local_index(&display_id, index))
            .await;
        if !committed {
            debug!(display = %display_id, index, "display changed during dashboard write");
            return Ok(CommandResult::Ignored);
        }

        info!(display = %display_id, index, "active dashboard changed");
        Ok(CommandResult::ActiveDashboard { display_id, index })
    }

    /// Hand the bound action to a detached task; the command processor
    /// never waits for it.
    async fn play(&self) -> CommandResult {
        let target = self
            .store
            .read(|state| {
                let display = state.active_display()?;
                let dashboard = state.current_dashboard(display)?;
                Some((display.to_owned(), dashboard.to_owned()))
            })
            .await;
        let Some((display_id, dashboard)) = target else {
            return CommandResult::Ignored;
        };

        let action = self
            .bindings
            .load()
            .lookup(&display_id, &dashboard)
            .filter(|action| !action.is_none())
            .cloned();
        let Some(action) = action else {
            debug!(display = %display_id, %dashboard, "no action bound");
            return CommandResult::Ignored;
        };

        let dispatcher = self.dispatcher.clone();
        let store = Arc::clone(&self.store);
        let cancel = self.cancel.clone();
        let (report_display, report_dashboard) = (display_id.clone(), dashboard.clone());

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                result = dispatcher.dispatch(&action) => result,
            };

            let (ok, detail) = match &result {
                Ok(outcome) => (true, outcome.to_string()),
                Err(e) => (false, e.to_string()),
            };
            let report = ActionReport {
                at: Utc::now(),
                display: report_display,
                dashboard: report_dashboard,
                ok,
                detail,
            };
            store
                .update(|state| {
                    if let Err(e) = &result {
                        state.record_error(e);
                    }
                    state.record_action(report);
                })
                .await;
        });

        CommandResult::Dispatched {
            display: display_id,
            dashboard,
        }
    }
}
