use crate::domain::market::FeedFamily;
use crate::domain::ports::FeedStore;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Process-local feed memory, used by tests and one-shot tools.
#[derive(Debug, Default)]
pub struct InMemoryFeedStore {
    tiers: RwLock<HashMap<FeedFamily, String>>,
}

impl InMemoryFeedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeedStore for InMemoryFeedStore {
    fn load(&self, family: FeedFamily) -> Option<String> {
        self.tiers.read().ok()?.get(&family).cloned()
    }

    fn save(&self, family: FeedFamily, tier: &str) -> Result<()> {
        let mut tiers = self
            .tiers
            .write()
            .map_err(|_| anyhow::anyhow!("feed store lock poisoned"))?;
        tiers.insert(family, tier.to_string());
        Ok(())
    }
}

// One write lock per file path, shared by every store opened on it.
static PATH_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    match PATH_LOCKS.get_or_init(|| Mutex::new(HashMap::new())).lock() {
        Ok(mut locks) => locks.entry(path.to_path_buf()).or_default().clone(),
        Err(_) => Arc::new(Mutex::new(())),
    }
}

/// Feed memory persisted as a small JSON object keyed by
/// [`FeedFamily::store_key`], e.g. `{"feed": "iex", "options_feed": "opra"}`.
///
/// Read-modify-write cycles are serialized per path within the process.
/// Each save writes its own temp file and renames it into place, so a reader
/// never sees a partial file.
pub struct FileFeedStore {
    file_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileFeedStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let write_lock = path_lock(&file_path);
        Self {
            file_path,
            write_lock,
        }
    }

    /// `~/.rustpaca/feeds.json`
    pub fn default_location() -> Result<Self> {
        let home = std::env::var("HOME").context("Could not find HOME directory")?;
        Ok(Self::new(PathBuf::from(home).join(".rustpaca").join("feeds.json")))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        if !self.file_path.exists() {
            return Ok(HashMap::new());
        }

        let content =
            fs::read_to_string(&self.file_path).context("Failed to read feed store file")?;
        serde_json::from_str(&content).context("Failed to parse feed store JSON")
    }

    fn write_all(&self, tiers: &HashMap<String, String>) -> Result<()> {
        if let Some(dir) = self.file_path.parent()
            && !dir.as_os_str().is_empty()
            && !dir.exists()
        {
            fs::create_dir_all(dir).context("Failed to create feed store directory")?;
        }

        let content =
            serde_json::to_string_pretty(tiers).context("Failed to serialize feed store")?;

        // Atomic write: unique temp file per save, then rename
        let temp_path = self.temp_path();
        fs::write(&temp_path, content).context("Failed to write temp feed store file")?;
        if let Err(e) = fs::rename(&temp_path, &self.file_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e).context("Failed to rename feed store file");
        }
        Ok(())
    }

    /// `feeds.json` -> `feeds.json.<uuid>.tmp`, next to the store file.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "feeds.json".to_string());
        self.file_path
            .with_file_name(format!("{}.{}.tmp", name, Uuid::new_v4()))
    }
}

impl FeedStore for FileFeedStore {
    fn load(&self, family: FeedFamily) -> Option<String> {
        match self.read_all() {
            Ok(mut tiers) => tiers.remove(family.store_key()),
            Err(e) => {
                warn!(
                    "FileFeedStore: unreadable {:?}, starting from top tier: {:#}",
                    self.file_path, e
                );
                None
            }
        }
    }

    fn save(&self, family: FeedFamily, tier: &str) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("feed store lock poisoned"))?;

        // An unreadable file is reported, not overwritten with one family.
        let mut tiers = self.read_all()?;
        if tiers.get(family.store_key()).map(String::as_str) == Some(tier) {
            debug!("FileFeedStore: {} already {}", family, tier);
            return Ok(());
        }

        tiers.insert(family.store_key().to_string(), tier.to_string());
        self.write_all(&tiers)?;

        info!("FileFeedStore: remembered {} = {} in {:?}", family, tier, self.file_path);
        Ok(())
    }
}
