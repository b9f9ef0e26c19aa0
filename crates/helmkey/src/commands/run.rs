//! `helmkey run`: host the engine until Ctrl-C.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use helmkey_config::TomlBindingStore;
use helmkey_core::Engine;

use crate::cli::RunArgs;
use crate::error::CliError;

use super::Context;

pub async fn handle(args: RunArgs, ctx: &Context) -> Result<(), CliError> {
    let mut config = ctx.engine_config()?;
    if let Some(device) = args.device {
        config.device.path = Some(device);
    }

    let store = TomlBindingStore::new(ctx.config.bindings_path());
    info!(bindings = %store.path().display(), "starting engine");
    let engine = Engine::new(config, Arc::new(store))?;
    engine.start().await?;

    let mut status = engine.subscribe_status();
    let mut writes = engine.state_writes();
    let mut last_status = String::new();
    let mut last_action_at = None;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            signal = &mut shutdown => {
                if let Err(e) = signal {
                    warn!(error = %e, "cannot listen for Ctrl-C");
                }
                info!("interrupt received, stopping");
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = status.borrow_and_update().clone();
                if snapshot.status != last_status {
                    ctx.print(&snapshot.status);
                    last_status = snapshot.status;
                }
                if let Some(action) = snapshot.last_action.filter(|a| Some(a.at) != last_action_at) {
                    last_action_at = Some(action.at);
                    if action.ok {
                        info!(display = %action.display, dashboard = %action.dashboard, detail = %action.detail, "action fired");
                    } else {
                        warn!(display = %action.display, dashboard = %action.dashboard, detail = %action.detail, "action failed");
                    }
                }
            }
            write = writes.recv() => match write {
                Ok(write) => info!(path = %write.path, value = %write.value, "state write"),
                Err(RecvError::Lagged(missed)) => warn!(missed, "state writes dropped"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    engine.stop().await;
    Ok(())
}
