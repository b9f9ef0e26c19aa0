// ── Display Service reconciliation ──
//
// Two periodic passes keep the local model in step with the service:
// the display list, and each display's dashboards plus active index.
// Failures are recorded and the previous values kept; the loops only
// stop on cancellation.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use helmkey_api::DisplayClient;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::store::StateStore;

/// Fetch the display list and apply it. Returns whether the set of
/// displays changed.
pub async fn refresh_displays(client: &DisplayClient, store: &StateStore) -> Result<bool, CoreError> {
    match client.list_displays().await {
        Ok(displays) => {
            let ids: Vec<String> = displays.into_iter().map(|d| d.id).collect();
            debug!(count = ids.len(), "display list refreshed");
            Ok(store.update(|state| state.apply_display_list(ids)).await)
        }
        Err(e) => {
            if e.is_transient() {
                info!(error = %e, "display service not reachable");
            } else {
                warn!(error = %e, "display refresh failed");
            }
            let err = CoreError::from(e);
            store.update(|state| state.service_failed(&err)).await;
            Err(err)
        }
    }
}

/// Refresh dashboards and the active index of every known display.
///
/// Displays are fetched concurrently; a failure on one leaves the others
/// and that display's cached values untouched.
pub async fn refresh_dashboards(client: &DisplayClient, store: &StateStore) {
    let targets: Vec<(String, u64)> = store
        .read(|state| {
            state
                .display_ids()
                .iter()
                .map(|id| (id.clone(), state.generation(id)))
                .collect()
        })
        .await;

    join_all(
        targets
            .into_iter()
            .map(|(id, generation)| refresh_one(client, store, id, generation)),
    )
    .await;
}

async fn refresh_one(client: &DisplayClient, store: &StateStore, id: String, seen_generation: u64) {
    let (dashboards, index) = tokio::join!(client.list_dashboards(&id), client.screen_index(&id));

    match dashboards {
        Ok(dashboards) => {
            let ids = dashboards.into_iter().map(|d| d.id).collect();
            store.update(|state| state.apply_dashboards(&id, ids)).await;
        }
        Err(e) => {
            // A 404 here usually means the display went away after the
            // list was fetched; the next display pass drops it.
            if e.is_not_found() {
                debug!(display = %id, error = %e, "display gone during dashboard refresh");
            } else {
                warn!(display = %id, error = %e, "dashboard refresh failed");
            }
            let err = CoreError::from(e);
            store.update(|state| state.dashboard_failed(&id, &err)).await;
        }
    }

    match index {
        Ok(index) => {
            let applied = store
                .update(|state| state.apply_remote_index(&id, index, seen_generation))
                .await;
            if !applied {
                debug!(display = %id, "stale screen index discarded");
            }
        }
        Err(e) => {
            let err = CoreError::from(e);
            warn!(display = %id, error = %err, "screen index refresh failed");
            store.update(|state| state.dashboard_failed(&id, &err)).await;
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Periodic display list refresh. A changed display set triggers an
/// immediate dashboard pass, so new displays are usable before the next
/// dashboard tick.
pub(crate) async fn display_refresh_task(
    client: DisplayClient,
    store: Arc<StateStore>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let changed = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = refresh_displays(&client, &store) => matches!(result, Ok(true)),
                };
                if changed {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = refresh_dashboards(&client, &store) => {}
                    }
                }
            }
        }
    }
}

pub(crate) async fn dashboard_refresh_task(
    client: DisplayClient,
    store: Arc<StateStore>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = refresh_dashboards(&client, &store) => {}
                }
            }
        }
    }
}
