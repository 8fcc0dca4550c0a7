//! The registry: device index, file head and the config file behind one lock.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use super::codec;
use super::device::Device;
use super::error::{RegistryError, RegistryResult};
use super::index::OrderedIndex;
use crate::restart::RestartRequester;
use crate::watcher::WriteSuppressor;

/// Tunables for a [`Registry`].
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// How long the watcher ignores writes after a save.
    pub suppress_window: Duration,
    /// Enqueue a restart even when writing the file failed.
    pub restart_on_failed_save: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            suppress_window: Duration::from_secs(1),
            restart_on_failed_save: true,
        }
    }
}

/// Counts reported by a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub devices: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct RegistryState {
    index: OrderedIndex,
    head: Vec<u8>,
}

/// Authoritative device store backed by a dhcpd config file.
///
/// Every mutation, `load` and `save` hold the write lock for their whole
/// duration. Lookups take the read lock.
pub struct Registry {
    path: PathBuf,
    state: RwLock<RegistryState>,
    restarts: RestartRequester,
    suppressor: WriteSuppressor,
    options: RegistryOptions,
    loads: AtomicU64,
}

impl Registry {
    /// Create an empty registry bound to `path`. Nothing is read until [`Registry::load`].
    pub fn new(path: impl Into<PathBuf>, restarts: RestartRequester) -> Self {
        Self::with_options(path, restarts, RegistryOptions::default())
    }

    pub fn with_options(
        path: impl Into<PathBuf>,
        restarts: RestartRequester,
        options: RegistryOptions,
    ) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(RegistryState::default()),
            restarts,
            suppressor: WriteSuppressor::new(options.suppress_window),
            options,
            loads: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle to the restart queue this registry feeds.
    pub fn restarts(&self) -> &RestartRequester {
        &self.restarts
    }

    /// Replace the whole registry with the contents of the config file.
    ///
    /// Malformed record lines are logged and skipped. If the file cannot be
    /// read the current state is kept and `FileAccess` is returned.
    pub fn load(&self) -> RegistryResult<LoadSummary> {
        let mut state = self.state.write();

        let bytes = fs::read(&self.path).map_err(|source| RegistryError::FileAccess {
            path: self.path.clone(),
            source,
        })?;
        let parsed = codec::parse(&bytes);

        for error in &parsed.errors {
            tracing::warn!("[codec] {error}");
        }
        if !parsed.discarded.is_empty() {
            crate::debug_event!(
                "codec",
                "discarded non-record lines after first record",
                "{:?}",
                parsed.discarded
            );
        }

        let mut index = OrderedIndex::new();
        for device in parsed.devices {
            if !index.insert(device) {
                crate::debug_event!("codec", "duplicate MAC ignored");
            }
        }

        let summary = LoadSummary {
            devices: index.len(),
            skipped: parsed.errors.len(),
        };
        *state = RegistryState {
            index,
            head: parsed.head,
        };
        self.loads.fetch_add(1, Ordering::SeqCst);

        crate::log_event!(
            "registry",
            "loaded",
            "{} devices from {}",
            summary.devices,
            self.path.display()
        );
        Ok(summary)
    }

    /// Write the registry to the config file and request a service restart.
    ///
    /// Write failures are logged, not returned. Returns `true` if the file was written.
    pub fn save(&self) -> bool {
        let state = self.state.write();
        self.suppressor.arm();

        crate::log_event!("registry", "saving", "{}", self.path.display());
        let contents = codec::serialize(&state.head, state.index.iter());
        let written = match fs::write(&self.path, contents) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("[registry] failed to write {}: {e}", self.path.display());
                false
            }
        };

        if written || self.options.restart_on_failed_save {
            self.restarts.request();
        }
        written
    }

    pub fn get(&self, mac: &str) -> Option<Device> {
        self.state.read().index.get(mac).cloned()
    }

    pub fn contains(&self, mac: &str) -> bool {
        self.state.read().index.contains(mac)
    }

    /// Insert a new device. A device with the same MAC is left untouched.
    ///
    /// Returns `true` if the device was inserted.
    pub fn add(&self, device: Device) -> bool {
        self.state.write().index.insert(device)
    }

    /// Replace the device with the same MAC. No-op if the MAC is unknown.
    pub fn set(&self, device: Device) -> bool {
        let mut state = self.state.write();
        if state.index.remove(&device.mac).is_none() {
            return false;
        }
        state.index.insert(device)
    }

    /// Remove a device. Removing an unknown MAC is not an error.
    pub fn remove(&self, mac: &str) -> bool {
        self.state.write().index.remove(mac).is_some()
    }

    /// Update a device that may be moving to a new MAC.
    ///
    /// Same MAC behaves like [`Registry::set`]. A new MAC must not be taken and
    /// `old_mac` must exist; otherwise nothing changes and `false` is returned.
    pub fn replace(&self, old_mac: &str, device: Device) -> bool {
        let mut state = self.state.write();
        if !state.index.contains(old_mac) {
            return false;
        }
        if old_mac != device.mac && state.index.contains(&device.mac) {
            return false;
        }
        state.index.remove(old_mac);
        state.index.insert(device)
    }

    /// All devices: enabled first, then by name.
    pub fn list_all(&self) -> Vec<Device> {
        self.state.read().index.iter().cloned().collect()
    }

    /// Devices owned by `owner`, in the same order as [`Registry::list_all`].
    pub fn list_for_user(&self, owner: &str) -> Vec<Device> {
        self.state
            .read()
            .index
            .iter()
            .filter(|d| d.owner == owner)
            .cloned()
            .collect()
    }

    pub fn num_devices(&self) -> usize {
        self.state.read().index.len()
    }

    /// Bytes preserved from before the first record.
    pub fn head(&self) -> Vec<u8> {
        self.state.read().head.clone()
    }

    /// Number of completed loads since construction.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    /// True shortly after a save, while the file change is our own.
    pub fn is_suppressing_writes(&self) -> bool {
        self.suppressor.is_active()
    }

    /// Run `f` while holding the write lock, so no load, save or mutation
    /// can interleave with it.
    pub fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.state.write();
        f()
    }
}
