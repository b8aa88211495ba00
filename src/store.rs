use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::snapshot::{ServerKind, Snapshot};

/// Durable storage for the last known snapshot.
pub trait StateStore: Send {
    /// Loads the stored snapshot, falling back to defaults when there is none
    /// or it cannot be read.
    fn load(&self) -> Snapshot;

    fn save(&self, snapshot: &Snapshot) -> Result<(), Error>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredState {
    #[serde(flatten)]
    snapshot: Snapshot,
    #[serde(default)]
    server_type: Option<ServerKind>,
}

/// Keeps the snapshot in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
    kind: ServerKind,
}

impl JsonStateStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: ServerKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<StoredState>, Error> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Snapshot {
        match self.read() {
            Ok(Some(stored)) => {
                if let Some(stored_kind) = stored.server_type
                    && stored_kind != self.kind
                {
                    warn!(
                        "Server type has changed from {stored_kind} to {}",
                        self.kind
                    );
                }
                stored.snapshot
            }
            Ok(None) => {
                debug!("No state file at {}, starting fresh", self.path.display());
                Snapshot::default()
            }
            Err(e) => {
                warn!(
                    "Could not read state file {}, starting fresh: {e}",
                    self.path.display()
                );
                Snapshot::default()
            }
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), Error> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let stored = StoredState {
            snapshot: snapshot.clone(),
            server_type: Some(self.kind),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;
        Ok(())
    }
}
