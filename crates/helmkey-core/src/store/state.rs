// ── Remote-control state ──
//
// The one owned model the engine mutates. Display Service refreshes and
// key presses both land here; nothing in this file does I/O.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{DisplaySummary, StatusSnapshot};
use crate::error::{CoreError, ErrorKind};
use crate::input::classify::ClassifiedEvent;

// ── Error log ────────────────────────────────────────────────────────

/// One entry in the rolling error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub at: DateTime<Utc>,
    pub kind: ErrorKind,
    pub message: String,
}

/// Most recent `capacity` errors, oldest first.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    records: VecDeque<ErrorRecord>,
    capacity: usize,
}

impl ErrorLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, kind: ErrorKind, message: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(ErrorRecord {
            at: Utc::now(),
            kind,
            message: message.into(),
        });
    }

    pub fn records(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ── Device / service health ──────────────────────────────────────────

/// Input device lifecycle as seen by the status line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeviceStatus {
    #[default]
    Idle,
    Detecting,
    Listening { path: PathBuf },
    Unavailable { path: PathBuf, reason: String },
    NotFound,
}

/// Outcome of the most recent PLAY dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReport {
    pub at: DateTime<Utc>,
    pub display: String,
    pub dashboard: String,
    pub ok: bool,
    pub detail: String,
}

// ── RemoteControlState ───────────────────────────────────────────────

/// Selected display, per-display dashboards and indices, and health.
///
/// Invariant: `active_display`, when set, is one of `display_ids`. Every
/// method that changes the display list re-establishes it before
/// returning.
#[derive(Debug, Clone)]
pub struct RemoteControlState {
    display_ids: Vec<String>,
    active_display: Option<String>,
    dashboards: HashMap<String, Vec<String>>,
    active_index: HashMap<String, usize>,
    /// Bumped on every local index write; a refresh that started before
    /// the bump must not overwrite the local value.
    index_generation: HashMap<String, u64>,
    last_updated: Option<DateTime<Utc>>,
    errors: ErrorLog,
    device: DeviceStatus,
    /// Set once a display list fetch succeeds, cleared when one fails.
    service_reachable: bool,
    /// Displays whose last dashboard refresh failed, with the reason.
    degraded: BTreeMap<String, String>,
    last_key: Option<ClassifiedEvent>,
    last_action: Option<ActionReport>,
}

impl RemoteControlState {
    pub fn new(error_history: usize) -> Self {
        Self {
            display_ids: Vec::new(),
            active_display: None,
            dashboards: HashMap::new(),
            active_index: HashMap::new(),
            index_generation: HashMap::new(),
            last_updated: None,
            errors: ErrorLog::new(error_history),
            device: DeviceStatus::Idle,
            service_reachable: false,
            degraded: BTreeMap::new(),
            last_key: None,
            last_action: None,
        }
    }

    // ── Displays ─────────────────────────────────────────────────────

    pub fn display_ids(&self) -> &[String] {
        &self.display_ids
    }

    pub fn active_display(&self) -> Option<&str> {
        self.active_display.as_deref()
    }

    pub fn is_known(&self, display_id: &str) -> bool {
        self.display_ids.iter().any(|id| id == display_id)
    }

    /// Replace the display list with a fresh fetch.
    ///
    /// Duplicates keep their first position. Cached data for displays
    /// that disappeared is dropped. Returns whether the list changed.
    pub fn apply_display_list(&mut self, ids: Vec<String>) -> bool {
        let mut unique: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        let changed = self.display_ids != unique;
        self.display_ids = unique;

        let known = &self.display_ids;
        self.dashboards.retain(|id, _| known.contains(id));
        self.active_index.retain(|id, _| known.contains(id));
        self.index_generation.retain(|id, _| known.contains(id));
        self.degraded.retain(|id, _| known.contains(id));

        self.ensure_active_valid();
        self.service_reachable = true;
        self.last_updated = Some(Utc::now());
        changed
    }

    /// A display list fetch failed. Cached data is kept.
    pub fn service_failed(&mut self, err: &CoreError) {
        self.service_reachable = false;
        self.record_error(err);
    }

    fn ensure_active_valid(&mut self) {
        let valid = self
            .active_display
            .as_deref()
            .is_some_and(|id| self.is_known(id));
        if !valid {
            self.active_display = self.display_ids.first().cloned();
        }
    }

    /// Select `id` if it is known; otherwise fall back to the first
    /// display (or none). Returns the resulting selection.
    pub fn set_active_display(&mut self, id: Option<&str>) -> Option<String> {
        self.active_display = match id {
            Some(id) if self.is_known(id) => Some(id.to_owned()),
            _ => self.display_ids.first().cloned(),
        };
        self.active_display.clone()
    }

    /// Move the selection `delta` places through the display list,
    /// wrapping at both ends. With no selection the first display is
    /// chosen.
    pub fn step_display(&mut self, delta: isize) -> Option<String> {
        if self.display_ids.is_empty() {
            return None;
        }

        let position = self
            .active_display
            .as_deref()
            .and_then(|active| self.display_ids.iter().position(|id| id == active));

        let next = match position {
            Some(current) => self
                .display_ids
                .get(wrap(current, delta, self.display_ids.len()))
                .cloned(),
            None => self.display_ids.first().cloned(),
        };
        self.active_display = next;
        self.active_display.clone()
    }

    // ── Dashboards ───────────────────────────────────────────────────

    /// Replace one display's dashboard list. Ignored for unknown displays.
    pub fn apply_dashboards(&mut self, display_id: &str, dashboards: Vec<String>) -> bool {
        if !self.is_known(display_id) {
            return false;
        }
        self.dashboards.insert(display_id.to_owned(), dashboards);
        self.degraded.remove(display_id);
        self.last_updated = Some(Utc::now());
        true
    }

    /// A dashboard refresh for one display failed. Other displays and
    /// this display's cached values are untouched.
    pub fn dashboard_failed(&mut self, display_id: &str, err: &CoreError) {
        if self.is_known(display_id) {
            self.degraded.insert(display_id.to_owned(), err.to_string());
        }
        self.record_error(err);
    }

    pub fn dashboards(&self, display_id: &str) -> &[String] {
        self.dashboards.get(display_id).map_or(&[], Vec::as_slice)
    }

    pub fn dashboard_count(&self, display_id: &str) -> usize {
        self.dashboards(display_id).len()
    }

    /// Cached active index, 0 when the service never reported one.
    pub fn current_index(&self, display_id: &str) -> usize {
        self.active_index.get(display_id).copied().unwrap_or(0)
    }

    /// Identifier of the dashboard at the cached index, if in range.
    pub fn current_dashboard(&self, display_id: &str) -> Option<&str> {
        self.dashboards(display_id)
            .get(self.current_index(display_id))
            .map(String::as_str)
    }

    /// Target of a NEXT/PREV press: the active display and its current
    /// index stepped by `delta` modulo the dashboard count.
    pub fn stepped_index(&self, delta: isize) -> Option<(String, usize)> {
        let display = self.active_display.as_deref()?;
        let count = self.dashboard_count(display);
        if count == 0 {
            return None;
        }
        let current = self.current_index(display).min(count - 1);
        Some((display.to_owned(), wrap(current, delta, count)))
    }

    pub fn generation(&self, display_id: &str) -> u64 {
        self.index_generation.get(display_id).copied().unwrap_or(0)
    }

    /// Store an index reported by the service, unless a local write for
    /// this display landed after `seen_generation` was read.
    pub fn apply_remote_index(
        &mut self,
        display_id: &str,
        index: Option<usize>,
        seen_generation: u64,
    ) -> bool {
        if !self.is_known(display_id) || self.generation(display_id) != seen_generation {
            return false;
        }
        match index {
            Some(index) => {
                self.active_index.insert(display_id.to_owned(), index);
            }
            None => {
                self.active_index.remove(display_id);
            }
        }
        true
    }

    /// Cache an index the service has accepted. Returns `false` when the
    /// display vanished, or its dashboard list shrank below `index`,
    /// while the write was in flight.
    pub fn commit_local_index(&mut self, display_id: &str, index: usize) -> bool {
        if !self.is_known(display_id) || index >= self.dashboard_count(display_id) {
            return false;
        }
        self.active_index.insert(display_id.to_owned(), index);
        *self.index_generation.entry(display_id.to_owned()).or_default() += 1;
        self.last_updated = Some(Utc::now());
        true
    }

    // ── Telemetry ────────────────────────────────────────────────────

    pub fn record_error(&mut self, err: &CoreError) {
        self.errors.push(err.kind(), err.to_string());
    }

    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    pub fn device(&self) -> &DeviceStatus {
        &self.device
    }

    pub fn set_device(&mut self, device: DeviceStatus) {
        self.device = device;
    }

    pub fn record_key(&mut self, event: ClassifiedEvent) {
        self.last_key = Some(event);
    }

    pub fn record_action(&mut self, report: ActionReport) {
        self.last_action = Some(report);
    }

    pub fn last_action(&self) -> Option<&ActionReport> {
        self.last_action.as_ref()
    }

    /// One line describing the worst current condition.
    pub fn status_text(&self) -> String {
        match &self.device {
            DeviceStatus::Unavailable { path, reason } => {
                return format!("Device unavailable: {}: {reason}", path.display());
            }
            DeviceStatus::NotFound => return "Autodetect failed: no remote detected".into(),
            _ => {}
        }
        if !self.service_reachable {
            return "Waiting for service…".into();
        }
        if let Some((display, reason)) = self.degraded.iter().next() {
            return format!("Degraded: {display}: {reason}");
        }
        match &self.device {
            DeviceStatus::Listening { path } => format!("Listening on {}", path.display()),
            DeviceStatus::Detecting => "Detecting remote…".into(),
            _ => "Starting".into(),
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let displays = self
            .display_ids
            .iter()
            .map(|id| DisplaySummary {
                id: id.clone(),
                dashboard_count: self.dashboard_count(id),
                active_index: self.current_index(id),
                active_dashboard: self.current_dashboard(id).map(str::to_owned),
            })
            .collect();

        let device_path = match &self.device {
            DeviceStatus::Listening { path } | DeviceStatus::Unavailable { path, .. } => {
                Some(path.clone())
            }
            _ => None,
        };

        StatusSnapshot {
            status: self.status_text(),
            active_display: self.active_display.clone(),
            displays,
            last_updated: self.last_updated,
            recent_errors: self.errors.records().cloned().collect(),
            device_path,
            last_key: self.last_key,
            last_action: self.last_action.clone(),
        }
    }
}

/// `current + delta` modulo `len`. `len` must be non-zero.
fn wrap(current: usize, delta: isize, len: usize) -> usize {
    let offset = delta.unsigned_abs() % len;
    if delta < 0 {
        (current + len - offset) % len
    } else {
        (current + offset) % len
    }
}
