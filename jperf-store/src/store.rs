use std::fs;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::summary::RunSummary;

/// One run summary per session id. `save` overwrites unconditionally; there
/// is no history and no merge.
pub trait SessionStore: Send + Sync {
    fn save(&self, session_id: &str, summary: &RunSummary) -> Result<()>;
    fn load(&self, session_id: &str) -> Result<Option<RunSummary>>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    summaries: DashMap<String, RunSummary>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session_id: &str, summary: &RunSummary) -> Result<()> {
        self.summaries
            .insert(session_id.to_string(), summary.clone());
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<Option<RunSummary>> {
        Ok(self.summaries.get(session_id).map(|s| s.value().clone()))
    }
}

/// Durable variant: one `<session_id>.json` file per session under a state
/// directory.
#[derive(Debug)]
pub struct FileSessionStore {
    base_path: PathBuf,
}

impl FileSessionStore {
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        // probe writability up front so the fallback decision happens once
        let probe = base_path.join(".probe");
        fs::write(&probe, b"ok")?;
        let _ = fs::remove_file(&probe);
        Ok(Self { base_path })
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf> {
        let valid = !session_id.is_empty()
            && !session_id.starts_with('.')
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(Error::InvalidSessionId(session_id.to_string()));
        }
        Ok(self.base_path.join(format!("{session_id}.json")))
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, session_id: &str, summary: &RunSummary) -> Result<()> {
        let path = self.session_path(session_id)?;
        let file = fs::File::create(&path)?;
        serde_json::to_writer(file, summary)?;
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<Option<RunSummary>> {
        let path = self.session_path(session_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let file = fs::File::open(&path)?;
        Ok(Some(serde_json::from_reader(file)?))
    }
}

/// Capability-probed store selection: the durable file store when the state
/// directory is usable, the in-memory fallback otherwise.
pub fn open_default(state_dir: &Path) -> Box<dyn SessionStore> {
    match FileSessionStore::open(state_dir) {
        Ok(store) => {
            debug!("Session store backed by {}", state_dir.display());
            Box::new(store)
        }
        Err(e) => {
            warn!(
                "Session state dir {} unavailable ({}), falling back to in-memory store",
                state_dir.display(),
                e
            );
            Box::new(MemorySessionStore::new())
        }
    }
}
