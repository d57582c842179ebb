use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::Duration;

use crate::core::error::StorageError;
use crate::core::event::{EventBus, GateEvent};
use crate::core::permission::PermissionTier;

/// Only this version is accepted on load; anything else is ignored wholesale.
pub const POLICY_VERSION: u64 = 1;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize, Deserialize)]
struct PersistedPolicy {
    version: u64,
    tiers: BTreeMap<String, PermissionTier>,
    updated_at: DateTime<Utc>,
}

/// Durable per-tool permission tiers.
///
/// Tier changes are applied in memory immediately and written to disk after
/// the debounce window, so a burst of changes costs a single write. Writes go
/// to a temporary sibling file that is then renamed over the real one.
#[derive(Clone)]
pub struct PolicyStore {
    inner: Arc<PolicyInner>,
}

struct PolicyInner {
    path: PathBuf,
    defaults: HashMap<String, PermissionTier>,
    overrides: RwLock<HashMap<String, PermissionTier>>,
    debounce: Duration,
    dirty: AtomicBool,
    flush_scheduled: AtomicBool,
    saves: AtomicU64,
    write_lock: Mutex<()>,
    events: OnceLock<EventBus>,
}

impl PolicyStore {
    /// Load persisted overrides from `path`. Never fails: a missing,
    /// unreadable or incompatible file leaves every tool on its default.
    pub fn load(
        path: impl Into<PathBuf>,
        defaults: HashMap<String, PermissionTier>,
        debounce: Duration,
    ) -> Self {
        let path = path.into();
        let overrides = read_overrides(&path);
        tracing::debug!(
            path = %path.display(),
            overrides = overrides.len(),
            "Loaded permission policy"
        );

        Self {
            inner: Arc::new(PolicyInner {
                path,
                defaults,
                overrides: RwLock::new(overrides),
                debounce,
                dirty: AtomicBool::new(false),
                flush_scheduled: AtomicBool::new(false),
                saves: AtomicU64::new(0),
                write_lock: Mutex::new(()),
                events: OnceLock::new(),
            }),
        }
    }

    /// Publish `PolicyChanged` events on `bus`. Only the first bus sticks.
    pub fn attach_events(&self, bus: EventBus) {
        let _ = self.inner.events.set(bus);
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Override if set, else the built-in default, else `Prompt`.
    pub fn get_tier(&self, tool_name: &str) -> PermissionTier {
        if let Some(tier) = self.inner.read_overrides().get(tool_name) {
            return *tier;
        }
        self.inner
            .defaults
            .get(tool_name)
            .copied()
            .unwrap_or_default()
    }

    pub fn set_tier(&self, tool_name: &str, tier: PermissionTier) {
        self.inner
            .write_overrides()
            .insert(tool_name.to_string(), tier);
        tracing::info!(tool = %tool_name, tier = %tier, "Permission tier changed");
        self.mark_dirty();
        self.publish(tool_name, Some(tier));
    }

    /// Drop the override for a tool so it falls back to its default.
    pub fn reset_tier(&self, tool_name: &str) -> Option<PermissionTier> {
        let previous = self.inner.write_overrides().remove(tool_name);
        if previous.is_some() {
            tracing::info!(tool = %tool_name, "Permission tier reset to default");
            self.mark_dirty();
            self.publish(tool_name, None);
        }
        previous
    }

    /// Effective tier of every known tool: defaults overlaid by overrides.
    pub fn get_all(&self) -> HashMap<String, PermissionTier> {
        let mut all = self.inner.defaults.clone();
        all.extend(
            self.inner
                .read_overrides()
                .iter()
                .map(|(k, v)| (k.clone(), *v)),
        );
        all
    }

    pub fn overrides(&self) -> HashMap<String, PermissionTier> {
        self.inner.read_overrides().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Number of completed writes to disk.
    pub fn save_count(&self) -> u64 {
        self.inner.saves.load(Ordering::SeqCst)
    }

    /// Write the current state unconditionally.
    pub fn save(&self) -> Result<(), StorageError> {
        self.inner.dirty.store(false, Ordering::SeqCst);
        self.inner.write_file().inspect_err(|_| {
            self.inner.dirty.store(true, Ordering::SeqCst);
        })
    }

    /// Write now if there are unsaved changes. Returns whether a write happened.
    pub fn flush_now(&self) -> Result<bool, StorageError> {
        self.inner.flush()
    }

    fn mark_dirty(&self) {
        self.inner.dirty.store(true, Ordering::SeqCst);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            // Nothing to debounce on outside a runtime
            self.inner.flush_logged();
            return;
        };

        if self.inner.flush_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        handle.spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            inner.flush_scheduled.store(false, Ordering::SeqCst);
            inner.flush_logged();
        });
    }

    fn publish(&self, tool_name: &str, tier: Option<PermissionTier>) {
        if let Some(bus) = self.inner.events.get() {
            bus.publish(GateEvent::PolicyChanged {
                tool_name: tool_name.to_string(),
                tier,
            });
        }
    }
}

impl PolicyInner {
    fn read_overrides(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, PermissionTier>> {
        self.overrides.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_overrides(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<String, PermissionTier>> {
        self.overrides.write().unwrap_or_else(|e| e.into_inner())
    }

    fn flush(&self) -> Result<bool, StorageError> {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        match self.write_file() {
            Ok(()) => Ok(true),
            Err(e) => {
                // Memory stays authoritative; retry on the next flush
                self.dirty.store(true, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn flush_logged(&self) {
        if let Err(e) = self.flush() {
            tracing::error!(path = %self.path.display(), "Failed to save permission policy: {e}");
        }
    }

    fn write_file(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let record = PersistedPolicy {
            version: POLICY_VERSION,
            tiers: self
                .read_overrides()
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let temp_path = temp_path_for(&self.path);
        std::fs::write(&temp_path, json)?;
        std::fs::rename(&temp_path, &self.path).inspect_err(|_| {
            let _ = std::fs::remove_file(&temp_path);
        })?;

        self.saves.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            path = %self.path.display(),
            entries = record.tiers.len(),
            "Saved permission policy"
        );
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "policy.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn read_overrides(path: &Path) -> HashMap<String, PermissionTier> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), "Cannot read policy file, using defaults: {e}");
            return HashMap::new();
        }
    };

    let raw: serde_json::Value = match serde_json::from_str(&content) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Malformed policy file, using defaults: {e}");
            return HashMap::new();
        }
    };

    let version = raw.get("version").and_then(serde_json::Value::as_u64);
    if version != Some(POLICY_VERSION) {
        tracing::warn!(
            path = %path.display(),
            found = ?version,
            expected = POLICY_VERSION,
            "Ignoring policy file with unsupported version"
        );
        return HashMap::new();
    }

    let Some(tiers) = raw.get("tiers").and_then(serde_json::Value::as_object) else {
        tracing::warn!(path = %path.display(), "Policy file has no tier table, using defaults");
        return HashMap::new();
    };

    tiers
        .iter()
        .filter_map(|(name, value)| {
            match serde_json::from_value::<PermissionTier>(value.clone()) {
                Ok(tier) => Some((name.clone(), tier)),
                Err(_) => {
                    tracing::warn!(tool = %name, value = %value, "Discarding unrecognized permission tier");
                    None
                }
            }
        })
        .collect()
}
