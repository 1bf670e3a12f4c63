use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::predictions::UserPrediction;
use crate::session::AuthenticatedUser;

const STATE_DIR: &str = "prode_terminal";
const STATE_FILE: &str = "store.json";
const STORE_KEY: &str = "prode-store";
const STORE_VERSION: u32 = 1;

/// What survives a restart: identity and the local prediction list. Loading and
/// error flags are never written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedStore {
    pub version: u32,
    #[serde(default)]
    pub session: Option<AuthenticatedUser>,
    #[serde(rename = "isAuthenticated", default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub predictions: Vec<UserPrediction>,
    #[serde(rename = "draftOwner", default)]
    pub draft_owner: Option<i64>,
}

pub trait PersistencePort {
    fn load(&self) -> Option<PersistedStore>;
    fn save(&self, store: &PersistedStore) -> Result<()>;
}

/// Namespaced JSON file; the store lives under a single key.
#[derive(Debug, Clone)]
pub struct JsonFilePort {
    path: PathBuf,
}

impl JsonFilePort {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location() -> Option<Self> {
        state_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Option<HashMap<String, serde_json::Value>> {
        let raw = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&raw).ok()
    }
}

impl PersistencePort for JsonFilePort {
    fn load(&self) -> Option<PersistedStore> {
        let mut entries = self.read_entries()?;
        let value = entries.remove(STORE_KEY)?;
        let store = serde_json::from_value::<PersistedStore>(value).ok()?;
        if store.version != STORE_VERSION {
            return None;
        }
        Some(store)
    }

    fn save(&self, store: &PersistedStore) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).context("create state dir")?;
        }
        let mut entries = self.read_entries().unwrap_or_default();
        let mut store = store.clone();
        store.version = STORE_VERSION;
        entries.insert(
            STORE_KEY.to_string(),
            serde_json::to_value(&store).context("serialize store")?,
        );
        let json = serde_json::to_string_pretty(&entries).context("serialize state file")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).context("write state file")?;
        fs::rename(&tmp, &self.path).context("swap state file")?;
        Ok(())
    }
}

/// In-process port for tests and for running without a writable home.
#[derive(Debug, Default)]
pub struct MemoryPort {
    slot: Mutex<Option<PersistedStore>>,
}

impl MemoryPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(store: PersistedStore) -> Self {
        Self {
            slot: Mutex::new(Some(store)),
        }
    }
}

impl PersistencePort for MemoryPort {
    fn load(&self) -> Option<PersistedStore> {
        self.slot.lock().ok()?.clone()
    }

    fn save(&self, store: &PersistedStore) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        *slot = Some(PersistedStore {
            version: STORE_VERSION,
            ..store.clone()
        });
        Ok(())
    }
}

fn state_path() -> Option<PathBuf> {
    // Prefer XDG state.
    if let Ok(base) = std::env::var("XDG_STATE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(STATE_DIR).join(STATE_FILE));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("state")
            .join(STATE_DIR)
            .join(STATE_FILE),
    )
}
