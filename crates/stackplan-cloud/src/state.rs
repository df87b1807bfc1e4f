//! State management for cloud resources
//!
//! Manages the `.stackplan/state.json` file which tracks the current state
//! of all applied resources.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stackplan_core::ResourceKey;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".stackplan";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const STATE_TMP: &str = "state.json.tmp";
const LOCK_FILE: &str = "lock.json";
const STALE_LOCK_HOURS: i64 = 1;

/// Global state containing all provider states
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Resources indexed by provider:kind:name
    pub resources: HashMap<String, ResourceState>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: HashMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the resources of one provider, keyed by kind:name
    pub fn provider_state(&self, provider: &str) -> ProviderState {
        let prefix = format!("{}:", provider);
        let mut state = ProviderState::new();
        for (key, resource) in &self.resources {
            if let Some(local) = key.strip_prefix(&prefix) {
                state.resources.insert(local.to_string(), resource.clone());
            }
        }
        state
    }

    /// Replace all resources of one provider
    pub fn replace_provider_state(&mut self, provider: &str, state: &ProviderState) {
        let prefix = format!("{}:", provider);
        self.resources.retain(|k, _| !k.starts_with(&prefix));
        for (key, resource) in state.iter() {
            self.resources
                .insert(format!("{}{}", prefix, key), resource.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// State for a single provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderState {
    /// Resources managed by this provider, keyed by kind:name
    pub resources: HashMap<String, ResourceState>,
}

impl ProviderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &ResourceKey, state: ResourceState) {
        self.resources.insert(key.to_string(), state);
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&ResourceState> {
        self.resources.get(&key.to_string())
    }

    pub fn remove(&mut self, key: &ResourceKey) -> Option<ResourceState> {
        self.resources.remove(&key.to_string())
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.resources.contains_key(&key.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResourceState)> {
        self.resources.iter()
    }

    /// Recorded resources as typed keys, sorted
    pub fn keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self
            .resources
            .keys()
            .filter_map(|k| ResourceKey::parse(k))
            .collect();
        keys.sort();
        keys
    }

    /// Recorded resources that depend on `key`
    pub fn dependents(&self, key: &ResourceKey) -> Vec<ResourceKey> {
        let mut dependents: Vec<ResourceKey> = self
            .resources
            .iter()
            .filter(|(_, r)| r.dependencies.contains(key))
            .filter_map(|(k, _)| ResourceKey::parse(k))
            .collect();
        dependents.sort();
        dependents
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// State of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Provider-specific resource ID
    pub id: String,

    /// Resource type
    pub resource_type: String,

    /// Current status
    pub status: ResourceStatus,

    /// Resolved inputs the resource was last applied with
    #[serde(default)]
    pub inputs: serde_json::Value,

    /// Resources this one referenced when it was applied
    #[serde(default)]
    pub dependencies: Vec<ResourceKey>,

    /// Resource attributes (inputs echoed back plus computed outputs)
    pub attributes: HashMap<String, serde_json::Value>,

    /// When the resource was created
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            status: ResourceStatus::Unknown,
            inputs: serde_json::Value::Null,
            dependencies: Vec::new(),
            attributes: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_inputs(
        mut self,
        inputs: serde_json::Value,
        dependencies: Vec<ResourceKey>,
    ) -> Self {
        self.inputs = inputs;
        self.dependencies = dependencies;
        self
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Status of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Applied and running
    Running,
    /// Not yet reported by the provider
    Unknown,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Running => write!(f, "running"),
            ResourceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Reads and writes `.stackplan/state.json`
pub struct StateManager {
    dir: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            dir: project_root.as_ref().join(STATE_DIR),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Load the recorded state, empty when nothing was applied yet
    pub async fn load(&self) -> Result<GlobalState> {
        let path = self.state_path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No state at {}, starting empty", path.display());
                return Ok(GlobalState::new());
            }
            Err(e) => return Err(e.into()),
        };

        let state: GlobalState = serde_json::from_str(&content)?;
        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resources", state.resources.len());
        Ok(state)
    }

    /// Write the state, keeping the previous file as `state.json.backup`
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.state_path();
        if fs::try_exists(&path).await? {
            fs::copy(&path, self.dir.join(STATE_BACKUP)).await?;
        }

        // rename is atomic, a crash never leaves a truncated state file
        let tmp = self.dir.join(STATE_TMP);
        fs::write(&tmp, serde_json::to_vec_pretty(state)?).await?;
        fs::rename(&tmp, &path).await?;

        tracing::debug!("Saved state with {} resources", state.resources.len());
        Ok(())
    }

    /// Take the exclusive lock, replacing a lock older than one hour
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(LOCK_FILE);

        for _ in 0..2 {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(&serde_json::to_vec_pretty(&LockInfo::current())?)
                        .await?;
                    tracing::debug!("Acquired state lock");
                    return Ok(StateLock {
                        path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    let content = fs::read_to_string(&path).await?;
                    match serde_json::from_str::<LockInfo>(&content) {
                        Ok(info) if !info.is_stale() => {
                            return Err(CloudError::LockError(format!(
                                "State is locked by {} (pid {}) since {}",
                                info.holder, info.pid, info.acquired_at
                            )));
                        }
                        Ok(info) => tracing::warn!("Removing stale lock from {}", info.holder),
                        Err(_) => tracing::warn!("Removing unreadable lock file"),
                    }
                    fs::remove_file(&path).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CloudError::LockError(format!(
            "Could not acquire {}",
            path.display()
        )))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    pid: u32,
    acquired_at: DateTime<Utc>,
}

impl LockInfo {
    fn current() -> Self {
        Self {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    fn is_stale(&self) -> bool {
        let age = Utc::now().signed_duration_since(self.acquired_at);
        age >= chrono::Duration::hours(STALE_LOCK_HOURS)
    }
}

/// Held while the state is being modified; dropping it releases the lock
pub struct StateLock {
    path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!("Released state lock");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
