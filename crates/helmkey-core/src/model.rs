// ── Binding model ──
//
// A binding attaches one action to a (display, dashboard) pair. The PLAY
// key fires whatever is bound to the dashboard currently on screen.

use std::collections::BTreeMap;

use helmkey_api::HttpMethod;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What PLAY does on a given dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Action {
    #[default]
    None,
    /// HTTP call to an absolute URL, or a path under the local server.
    Rest {
        url: String,
        #[serde(default)]
        method: HttpMethod,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        query: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
    },
    /// Local state write published to the host.
    Signalk { path: String, value: Value },
}

impl Action {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// One persisted `(display, dashboard) -> action` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub display: String,
    pub dashboard: String,
    #[serde(default)]
    pub action: Action,
}

/// All bindings keyed by `(display, dashboard)`, in insertion order.
///
/// Serializes as a plain list of [`Binding`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Binding>", into = "Vec<Binding>")]
pub struct BindingTable {
    entries: IndexMap<(String, String), Action>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, display: &str, dashboard: &str) -> Option<&Action> {
        self.entries.get(&(display.to_owned(), dashboard.to_owned()))
    }

    /// Insert or overwrite one binding. Returns the replaced action.
    pub fn upsert(&mut self, binding: Binding) -> Option<Action> {
        self.entries
            .insert((binding.display, binding.dashboard), binding.action)
    }

    /// Overlay `other` onto `self`; entries in `other` win.
    pub fn merge(&mut self, other: impl IntoIterator<Item = Binding>) {
        for binding in other {
            self.upsert(binding);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bindings(&self) -> impl Iterator<Item = Binding> + '_ {
        self.entries.iter().map(|((display, dashboard), action)| Binding {
            display: display.clone(),
            dashboard: dashboard.clone(),
            action: action.clone(),
        })
    }
}

impl From<Vec<Binding>> for BindingTable {
    fn from(bindings: Vec<Binding>) -> Self {
        let mut table = Self::new();
        table.merge(bindings);
        table
    }
}

impl From<BindingTable> for Vec<Binding> {
    fn from(table: BindingTable) -> Self {
        table
            .entries
            .into_iter()
            .map(|((display, dashboard), action)| Binding {
                display,
                dashboard,
                action,
            })
            .collect()
    }
}

impl FromIterator<Binding> for BindingTable {
    fn from_iter<I: IntoIterator<Item = Binding>>(iter: I) -> Self {
        let mut table = Self::new();
        table.merge(iter);
        table
    }
}
