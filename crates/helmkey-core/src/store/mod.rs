// ── State store ──
//
// Single owner of `RemoteControlState`. Every mutation runs under one
// async mutex and republishes the status snapshot before the lock is
// released, so watchers never observe a half-applied change.

mod state;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, watch};

use crate::input::classify::ClassifiedEvent;

pub use state::{ActionReport, DeviceStatus, ErrorLog, ErrorRecord, RemoteControlState};

/// Per-display line of a [`StatusSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySummary {
    pub id: String,
    pub dashboard_count: usize,
    pub active_index: usize,
    pub active_dashboard: Option<String>,
}

/// Read-only view of the engine for hosts and status pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: String,
    pub active_display: Option<String>,
    pub displays: Vec<DisplaySummary>,
    pub last_updated: Option<DateTime<Utc>>,
    pub recent_errors: Vec<ErrorRecord>,
    pub device_path: Option<PathBuf>,
    pub last_key: Option<ClassifiedEvent>,
    pub last_action: Option<ActionReport>,
}

pub struct StateStore {
    state: Mutex<RemoteControlState>,
    snapshot: watch::Sender<StatusSnapshot>,
}

impl StateStore {
    pub fn new(error_history: usize) -> Self {
        let state = RemoteControlState::new(error_history);
        let (snapshot, _) = watch::channel(state.snapshot());
        Self {
            state: Mutex::new(state),
            snapshot,
        }
    }

    /// Mutate the state and publish the resulting snapshot.
    ///
    /// `f` must not await; the lock is never held across I/O.
    pub async fn update<R>(&self, f: impl FnOnce(&mut RemoteControlState) -> R) -> R {
        let mut state = self.state.lock().await;
        let result = f(&mut state);
        let next = state.snapshot();
        self.snapshot.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        result
    }

    pub async fn read<R>(&self, f: impl FnOnce(&RemoteControlState) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> StatusSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.snapshot.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn updates_publish_snapshots() {
        let store = StateStore::new(4);
        let mut rx = store.subscribe();
        assert_eq!(store.latest().status, "Waiting for service…");

        store
            .update(|s| s.apply_display_list(vec!["A".into(), "B".into()]))
            .await;

        assert!(rx.has_changed().unwrap_or(false));
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.active_display.as_deref(), Some("A"));
        assert_eq!(snapshot.displays.len(), 2);
    }

    #[tokio::test]
    async fn unchanged_state_does_not_notify() {
        let store = StateStore::new(4);
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        let active = store.update(|s| s.active_display().map(str::to_owned)).await;
        assert_eq!(active, None);
        assert!(!rx.has_changed().unwrap_or(true));
    }
}
