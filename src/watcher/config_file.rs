//! Watches the dhcpd config file for external edits and reloads the registry.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use super::error::WatchError;
use crate::registry::Registry;

/// The two kinds of file change the watcher acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEvent {
    /// Contents changed in place.
    Written,
    /// File removed or moved away; editors commonly replace by rename.
    Removed,
}

/// Map a notify event kind to a [`FileEvent`]. Everything else is ignored.
pub fn classify(kind: &EventKind) -> Option<FileEvent> {
    match kind {
        EventKind::Remove(_) => Some(FileEvent::Removed),
        EventKind::Modify(ModifyKind::Name(_)) => Some(FileEvent::Removed),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(FileEvent::Written),
        _ => None,
    }
}

/// What the watcher did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Reloaded,
    /// Write caused by our own save.
    Suppressed,
    ReloadFailed,
}

/// Apply one file event to the registry.
///
/// A write inside the suppression window is skipped. A removal always
/// reloads, after `settle` to let the replacement land.
pub async fn react(registry: &Arc<Registry>, event: FileEvent, settle: Duration) -> Reaction {
    match event {
        FileEvent::Written => {
            if registry.is_suppressing_writes() {
                crate::debug_event!("watcher", "own write ignored");
                return Reaction::Suppressed;
            }
            crate::log_event!("watcher", "detected config file edit");
        }
        FileEvent::Removed => {
            if !registry.is_suppressing_writes() {
                crate::log_event!("watcher", "detected config file edit (replaced)");
            }
            tokio::time::sleep(settle).await;
        }
    }

    reload(registry).await
}

async fn reload(registry: &Arc<Registry>) -> Reaction {
    let registry = registry.clone();
    match tokio::task::spawn_blocking(move || registry.load()).await {
        Ok(Ok(_)) => Reaction::Reloaded,
        Ok(Err(e)) => {
            tracing::error!("[watcher] reload failed: {e}");
            Reaction::ReloadFailed
        }
        Err(e) => {
            tracing::error!("[watcher] reload task failed: {e}");
            Reaction::ReloadFailed
        }
    }
}

/// Background task reloading the registry when its file changes.
pub struct ConfigFileWatcher {
    registry: Arc<Registry>,
    path: PathBuf,
    settle: Duration,
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    watcher: notify::RecommendedWatcher,
    /// Set while the path is gone and nothing is subscribed.
    detached: bool,
}

impl ConfigFileWatcher {
    /// Create the watcher and subscribe to the registry's file.
    pub fn new(
        registry: Arc<Registry>,
        settle: Duration,
        buffer: usize,
    ) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel(buffer.max(1));

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        let mut this = Self {
            path: registry.path().to_path_buf(),
            registry,
            settle,
            event_rx: rx,
            watcher,
            detached: false,
        };
        this.subscribe()?;
        Ok(this)
    }

    fn subscribe(&mut self) -> Result<(), WatchError> {
        // A replaced file is a new inode; drop any stale watch first.
        let _ = self.watcher.unwatch(&self.path);
        self.watcher
            .watch(&self.path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    /// Run until `ct` is cancelled. Errors are logged and the loop continues.
    ///
    /// While the file is missing, re-subscribing is retried every settle period.
    pub async fn watch(mut self, ct: CancellationToken) {
        crate::log_event!("watcher", "started", "{}", self.path.display());

        let mut retry = interval(self.settle.max(Duration::from_millis(100)));
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = ct.cancelled() => break,
                _ = retry.tick(), if self.detached => self.reattach().await,
                received = self.event_rx.recv() => match received {
                    Some(Ok(event)) => self.handle_event(event).await,
                    Some(Err(e)) => {
                        let e = WatchError::EventError { details: e.to_string() };
                        tracing::error!("[watcher] {e}");
                    }
                    None => {
                        tracing::warn!("[watcher] event channel closed");
                        break;
                    }
                },
            }
        }

        let _ = self.watcher.unwatch(&self.path);
        crate::log_event!("watcher", "stopped");
    }

    async fn handle_event(&mut self, event: Event) {
        crate::debug_event!("watcher", "event", "{:?} {:?}", event.kind, event.paths);

        let Some(file_event) = classify(&event.kind) else {
            return;
        };

        let reaction = react(&self.registry, file_event, self.settle).await;
        crate::debug_event!("watcher", "reaction", "{reaction:?}");

        if file_event == FileEvent::Removed {
            match self.subscribe() {
                Ok(()) => crate::debug_event!("watcher", "resubscribed", "{}", self.path.display()),
                Err(e) => {
                    tracing::warn!(
                        "[watcher] {e}; external edits are ignored until {} reappears",
                        self.path.display()
                    );
                    self.detached = true;
                }
            }
        }
    }

    /// Try to watch the path again and, once it exists, reload from it.
    async fn reattach(&mut self) {
        if self.subscribe().is_err() {
            return;
        }
        self.detached = false;
        crate::log_event!("watcher", "config file reappeared", "{}", self.path.display());
        let reaction = reload(&self.registry).await;
        crate::debug_event!("watcher", "reaction", "{reaction:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Device;
    use crate::restart::restart_channel;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};
    use std::fs;
    use tempfile::TempDir;

    const ONE: &str = "host a-b { hardware ethernet 00:00:00:00:00:01; }\n";
    const TWO: &str = "host a-b { hardware ethernet 00:00:00:00:00:01; }\nhost c-d { hardware ethernet 00:00:00:00:00:02; }\n";

    fn setup() -> (TempDir, Arc<Registry>) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dhcpd.conf");
        fs::write(&path, ONE).unwrap();
        let (requester, _queue) = restart_channel(8);
        let registry = Arc::new(Registry::new(path, requester));
        registry.load().unwrap();
        (dir, registry)
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(FileEvent::Written)
        );
        assert_eq!(
            classify(&EventKind::Remove(RemoveKind::File)),
            Some(FileEvent::Removed)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            Some(FileEvent::Removed)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions))),
            None
        );
        assert_eq!(classify(&EventKind::Create(CreateKind::File)), None);
    }

    #[tokio::test]
    async fn test_external_write_reloads() {
        let (dir, registry) = setup();
        fs::write(dir.path().join("dhcpd.conf"), TWO).unwrap();

        let reaction = react(&registry, FileEvent::Written, Duration::ZERO).await;
        assert_eq!(reaction, Reaction::Reloaded);
        assert_eq!(registry.num_devices(), 2);
        assert_eq!(registry.load_count(), 2);
    }

    #[tokio::test]
    async fn test_own_write_is_suppressed() {
        let (_dir, registry) = setup();
        registry.add(Device::new("c", "d", "00:00:00:00:00:02", true));
        registry.save();

        let reaction = react(&registry, FileEvent::Written, Duration::ZERO).await;
        assert_eq!(reaction, Reaction::Suppressed);
        assert_eq!(registry.load_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_reloads_after_settle() {
        let (dir, registry) = setup();
        let path = dir.path().join("dhcpd.conf");
        fs::remove_file(&path).unwrap();

        let writer = {
            let path = path.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                fs::write(path, TWO).unwrap();
            })
        };

        let reaction = react(&registry, FileEvent::Removed, Duration::from_secs(1)).await;
        writer.await.unwrap();
        assert_eq!(reaction, Reaction::Reloaded);
        assert_eq!(registry.num_devices(), 2);
    }

    #[tokio::test]
    async fn test_remove_without_replacement_keeps_state() {
        let (dir, registry) = setup();
        fs::remove_file(dir.path().join("dhcpd.conf")).unwrap();

        let reaction = react(&registry, FileEvent::Removed, Duration::ZERO).await;
        assert_eq!(reaction, Reaction::ReloadFailed);
        assert_eq!(registry.num_devices(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_detaches_then_reattaches() {
        let (dir, registry) = setup();
        let path = dir.path().join("dhcpd.conf");
        let mut watcher = ConfigFileWatcher::new(registry.clone(), Duration::ZERO, 16).unwrap();

        fs::remove_file(&path).unwrap();
        watcher
            .handle_event(Event::new(EventKind::Remove(RemoveKind::File)))
            .await;
        assert!(watcher.detached);

        // Still gone: stays detached
        watcher.reattach().await;
        assert!(watcher.detached);

        fs::write(&path, TWO).unwrap();
        watcher.reattach().await;
        assert!(!watcher.detached);
        assert_eq!(registry.num_devices(), 2);
    }
}
