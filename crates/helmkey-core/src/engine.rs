// ── Engine facade ──
//
// Owns every background task: device ingestion, the serial command
// processor, and the two Display Service refresh loops. Hosts drive it
// through `start` / `stop` and the typed accessors below.

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use futures_util::{StreamExt, pin_mut};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use helmkey_api::{DisplayClient, RestClient, TransportConfig};

use crate::bindings::BindingStore;
use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::EngineConfig;
use crate::dispatch::{ActionDispatcher, StateWrite};
use crate::error::CoreError;
use crate::input::autodetect::{self, AutodetectOptions, AutodetectResult};
use crate::input::classify::{ClassifiedEvent, KeyAction, RemoteKey, classify};
use crate::input::decoder::event_stream;
use crate::input::device::{self, DeviceOpener, FsOpener};
use crate::machine::StateMachine;
use crate::model::{Binding, BindingTable};
use crate::reconcile;
use crate::store::{DeviceStatus, StateStore, StatusSnapshot};

const COMMAND_CHANNEL_SIZE: usize = 64;

// ── Engine ───────────────────────────────────────────────────────────

/// The remote-control engine.
///
/// Cheaply cloneable via `Arc<EngineInner>`. Nothing runs until
/// [`start()`](Self::start); [`stop()`](Self::stop) cancels and joins
/// every task. An engine is started at most once.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    client: DisplayClient,
    store: Arc<StateStore>,
    dispatcher: ActionDispatcher,
    bindings: Arc<ArcSwap<BindingTable>>,
    binding_store: Arc<dyn BindingStore>,
    opener: Arc<dyn DeviceOpener>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    /// Taken by `start()`; `None` once the engine has been started.
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    /// Build an engine that reads real device nodes and talks to the
    /// configured Display Service.
    pub fn new(config: EngineConfig, binding_store: Arc<dyn BindingStore>) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.service.timeout,
            accept_invalid_certs: config.service.insecure,
        };
        let client = DisplayClient::new(config.service.url.clone(), &transport)?;
        let rest = RestClient::new(&transport)?;
        Ok(Self::with_parts(config, client, rest, binding_store, Arc::new(FsOpener)))
    }

    /// Build an engine from pre-made clients and a custom device opener.
    pub fn with_parts(
        config: EngineConfig,
        client: DisplayClient,
        rest: RestClient,
        binding_store: Arc<dyn BindingStore>,
        opener: Arc<dyn DeviceOpener>,
    ) -> Self {
        let store = Arc::new(StateStore::new(config.error_history));
        let dispatcher = ActionDispatcher::new(rest, config.local_base_url.clone());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Self {
            inner: Arc::new(EngineInner {
                config,
                client,
                store,
                dispatcher,
                bindings: Arc::new(ArcSwap::from_pointee(BindingTable::new())),
                binding_store,
                opener,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Load bindings and spawn the background tasks.
    ///
    /// Bindings from the configuration are merged over the persisted
    /// ones (configuration wins) and the result saved back.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut rx_slot = self.inner.command_rx.lock().await;
        if rx_slot.is_none() {
            return Err(CoreError::AlreadyStarted);
        }

        let mut table = self.inner.binding_store.load()?;
        if !self.inner.config.bindings.is_empty() {
            table.merge(self.inner.config.bindings.iter().cloned());
            self.inner.binding_store.save(&table)?;
        }
        info!(bindings = table.len(), "bindings loaded");
        self.inner.bindings.store(Arc::new(table));

        let Some(rx) = rx_slot.take() else {
            return Err(CoreError::AlreadyStarted);
        };
        drop(rx_slot);

        let cancel = &self.inner.cancel;
        let service = &self.inner.config.service;
        let mut handles = self.inner.task_handles.lock().await;

        let machine = StateMachine::new(
            self.inner.client.clone(),
            Arc::clone(&self.inner.store),
            self.inner.dispatcher.clone(),
            Arc::clone(&self.inner.bindings),
            cancel.clone(),
        );
        handles.push(tokio::spawn(command_processor_task(machine, rx, cancel.clone())));

        handles.push(tokio::spawn(reconcile::display_refresh_task(
            self.inner.client.clone(),
            Arc::clone(&self.inner.store),
            service.display_interval,
            cancel.clone(),
        )));
        handles.push(tokio::spawn(reconcile::dashboard_refresh_task(
            self.inner.client.clone(),
            Arc::clone(&self.inner.store),
            service.dashboard_interval,
            cancel.clone(),
        )));

        handles.push(tokio::spawn(ingestion_task(self.clone(), cancel.clone())));

        info!(service = %service.url, "engine started");
        Ok(())
    }

    /// Cancel every task and wait for them to finish. The device reader
    /// is dropped (and the node closed) before this returns.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    let err = CoreError::Internal {
                        message: format!("background task panicked: {e}"),
                    };
                    warn!(error = %err, "task failed during shutdown");
                    self.inner.store.update(|s| s.record_error(&err)).await;
                }
            }
        }
        debug!("engine stopped");
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Run a command through the command processor and wait for it.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        if self.inner.command_rx.lock().await.is_some() || self.inner.cancel.is_cancelled() {
            return Err(CoreError::NotRunning);
        }

        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command,
                response_tx: Some(tx),
            })
            .await
            .map_err(|_| CoreError::NotRunning)?;

        rx.await.map_err(|_| CoreError::NotRunning)?
    }

    /// Inject a key press as if it came from the remote.
    pub async fn press(&self, key: RemoteKey) -> Result<CommandResult, CoreError> {
        self.execute(Command::Key(ClassifiedEvent::press(key))).await
    }

    /// Select a display. An unknown id selects the first known display
    /// (or none). Returns the resulting selection.
    pub async fn set_active_display(&self, display_id: &str) -> Result<Option<String>, CoreError> {
        let result = self
            .execute(Command::SetActiveDisplay {
                display_id: Some(display_id.to_owned()),
            })
            .await?;
        match result {
            CommandResult::ActiveDisplay(active) => Ok(active),
            _ => Ok(self.status().active_display),
        }
    }

    /// Show dashboard `index` on a display, clamped to its cached count.
    ///
    /// Returns the index written, or `None` when the display has no
    /// dashboards yet.
    pub async fn set_active_dashboard(&self, display_id: &str, index: usize) -> Result<Option<usize>, CoreError> {
        let result = self
            .execute(Command::SetActiveDashboard {
                display_id: display_id.to_owned(),
                index,
            })
            .await?;
        match result {
            CommandResult::ActiveDashboard { index, .. } => Ok(Some(index)),
            _ => Ok(None),
        }
    }

    // ── Bindings ─────────────────────────────────────────────────────

    pub fn bindings(&self) -> Arc<BindingTable> {
        self.inner.bindings.load_full()
    }

    /// What PLAY would fire right now: the active display, its current
    /// dashboard, and the action bound to that pair (if any).
    pub async fn current_binding(&self) -> Result<Option<Binding>, CoreError> {
        let (display, dashboard) = self
            .inner
            .store
            .read(|s| {
                let display = s.active_display()?.to_owned();
                let dashboard = s.current_dashboard(&display).map(str::to_owned);
                Some((display, dashboard))
            })
            .await
            .ok_or(CoreError::NoActiveDisplay)?;
        let Some(dashboard) = dashboard else {
            return Ok(None);
        };
        let bindings = self.bindings();
        Ok(bindings.lookup(&display, &dashboard).map(|action| Binding {
            display,
            dashboard,
            action: action.clone(),
        }))
    }

    /// Persist `table` and make it the live binding set.
    pub fn update_bindings(&self, table: BindingTable) -> Result<(), CoreError> {
        self.inner.binding_store.save(&table)?;
        info!(bindings = table.len(), "bindings updated");
        self.inner.bindings.store(Arc::new(table));
        Ok(())
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn status(&self) -> StatusSnapshot {
        self.inner.store.latest()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusSnapshot> {
        self.inner.store.subscribe()
    }

    /// State writes published by `signalk` actions.
    pub fn state_writes(&self) -> broadcast::Receiver<StateWrite> {
        self.inner.dispatcher.subscribe()
    }

    // ── One-shot operations ──────────────────────────────────────────

    /// Run device autodetection with the configured options.
    pub async fn autodetect(&self) -> AutodetectResult {
        let candidates = self.candidates().await;
        self.autodetect_among(&candidates).await
    }

    async fn autodetect_among(&self, candidates: &[PathBuf]) -> AutodetectResult {
        let options = AutodetectOptions::from(&self.inner.config.device);
        autodetect::autodetect(self.inner.opener.as_ref(), candidates, &options).await
    }

    async fn candidates(&self) -> Vec<PathBuf> {
        let device = &self.inner.config.device;
        if device.candidates.is_empty() {
            device::list_event_nodes(&device.input_dir).await
        } else {
            device.candidates.clone()
        }
    }

    /// One reconciliation pass (display list, then every display's
    /// dashboards) outside the periodic loops.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        reconcile::refresh_displays(&self.inner.client, &self.inner.store).await?;
        reconcile::refresh_dashboards(&self.inner.client, &self.inner.store).await;
        Ok(())
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Apply commands one at a time, answering each envelope.
async fn command_processor_task(
    machine: StateMachine,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = machine.handle(envelope.command) => result,
                };
                match envelope.response_tx {
                    Some(tx) => {
                        let _ = tx.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            debug!(error = %e, "key command failed");
                        }
                    }
                }
            }
        }
    }
}

/// Resolve the device, then forward key-down events to the command
/// processor until cancelled or the stream closes.
async fn ingestion_task(engine: Engine, cancel: CancellationToken) {
    let inner = &engine.inner;
    let store = &inner.store;

    let path = if let Some(path) = inner.config.device.path.clone() {
        path
    } else {
        store.update(|s| s.set_device(DeviceStatus::Detecting)).await;
        let candidates = engine.candidates().await;
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            result = engine.autodetect_among(&candidates) => result,
        };
        if let AutodetectResult::Found { path, method } = result {
            info!(path = %path.display(), %method, "using detected device");
            path
        } else {
            let err = CoreError::AutodetectFailed {
                candidates: candidates.len(),
            };
            warn!(error = %err, "input disabled");
            store
                .update(|s| {
                    s.record_error(&err);
                    s.set_device(DeviceStatus::NotFound);
                })
                .await;
            return;
        }
    };

    let reader = match inner.opener.open(&path) {
        Ok(reader) => reader,
        Err(e) => {
            device_unavailable(store, path, e.to_string()).await;
            return;
        }
    };

    info!(path = %path.display(), "listening for key events");
    store
        .update(|s| s.set_device(DeviceStatus::Listening { path: path.clone() }))
        .await;

    let events = event_stream(reader, inner.config.device.layout);
    pin_mut!(events);

    loop {
        let item = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = events.next() => item,
        };

        match item {
            Some(Ok(raw)) => {
                let Some(event) = classify(&raw).filter(|e| e.action == KeyAction::Down) else {
                    continue;
                };
                let envelope = CommandEnvelope {
                    command: Command::Key(event),
                    response_tx: None,
                };
                let sent = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    sent = inner.command_tx.send(envelope) => sent,
                };
                if sent.is_err() {
                    break;
                }
            }
            Some(Err(e)) => {
                device_unavailable(store, path, e.to_string()).await;
                break;
            }
            None => break,
        }
    }
    debug!("ingestion stopped");
}

async fn device_unavailable(store: &StateStore, path: PathBuf, reason: String) {
    let err = CoreError::DeviceUnavailable {
        path: path.display().to_string(),
        reason: reason.clone(),
    };
    warn!(error = %err, "input device lost");
    store
        .update(|s| {
            s.record_error(&err);
            s.set_device(DeviceStatus::Unavailable { path, reason });
        })
        .await;
}
