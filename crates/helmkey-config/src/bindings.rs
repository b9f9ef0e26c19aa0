// ── File-backed binding persistence ──

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use helmkey_core::{Binding, BindingStore, BindingTable, CoreError};

/// On-disk shape: a `[[bindings]]` array of tables.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BindingFile {
    #[serde(default)]
    bindings: Vec<Binding>,
}

/// Persists the binding table as TOML at a fixed path.
///
/// A missing file loads as an empty table. Saves go through a sibling
/// temp file and a rename, so readers never see a partial write.
#[derive(Debug, Clone)]
pub struct TomlBindingStore {
    path: PathBuf,
}

impl TomlBindingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn persistence(path: &Path, err: impl std::fmt::Display) -> CoreError {
    CoreError::Persistence {
        message: format!("{}: {err}", path.display()),
    }
}

impl BindingStore for TomlBindingStore {
    fn load(&self) -> Result<BindingTable, CoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no binding file, starting empty");
                return Ok(BindingTable::new());
            }
            Err(e) => return Err(persistence(&self.path, e)),
        };
        let file: BindingFile = toml::from_str(&raw).map_err(|e| persistence(&self.path, e))?;
        let table = BindingTable::from(file.bindings);
        debug!(path = %self.path.display(), count = table.len(), "bindings loaded");
        Ok(table)
    }

    fn save(&self, table: &BindingTable) -> Result<(), CoreError> {
        let file = BindingFile {
            bindings: table.bindings().collect(),
        };
        let body = toml::to_string_pretty(&file).map_err(|e| persistence(&self.path, e))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| persistence(parent, e))?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, body).map_err(|e| persistence(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| persistence(&self.path, e))?;

        debug!(path = %self.path.display(), count = table.len(), "bindings saved");
        Ok(())
    }
}
