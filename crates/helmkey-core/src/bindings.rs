// ── Binding persistence ──
//
// The engine loads bindings once at start and saves them whenever they
// change. Storage is the host's business; this trait is the contract.

use std::sync::Mutex;

use crate::error::CoreError;
use crate::model::BindingTable;

/// Durable storage for the binding table.
pub trait BindingStore: Send + Sync {
    /// Load the persisted table. A store with nothing saved yet returns
    /// an empty table.
    fn load(&self) -> Result<BindingTable, CoreError>;

    fn save(&self, table: &BindingTable) -> Result<(), CoreError>;
}

/// Process-local store, for tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct MemoryBindingStore {
    table: Mutex<BindingTable>,
}

impl MemoryBindingStore {
    pub fn new(table: BindingTable) -> Self {
        Self {
            table: Mutex::new(table),
        }
    }
}

impl BindingStore for MemoryBindingStore {
    fn load(&self) -> Result<BindingTable, CoreError> {
        self.table
            .lock()
            .map(|table| table.clone())
            .map_err(|_| poisoned())
    }

    fn save(&self, table: &BindingTable) -> Result<(), CoreError> {
        let mut guard = self.table.lock().map_err(|_| poisoned())?;
        guard.clone_from(table);
        Ok(())
    }
}

fn poisoned() -> CoreError {
    CoreError::Persistence {
        message: "binding store lock poisoned".into(),
    }
}
