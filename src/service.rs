//! Composition root: one registry plus its two background tasks.

use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::registry::Registry;
use crate::restart::{
    RestartCommand, RestartCoordinator, RestartQueue, RestartRequester, ShellCommand,
    restart_channel,
};
use crate::watcher::ConfigFileWatcher;

/// Build a registry and its restart queue from settings without starting anything.
pub fn build_registry(settings: &Settings) -> (Arc<Registry>, RestartQueue) {
    let (requester, queue) = restart_channel(settings.restart.queue_capacity);
    let registry = Arc::new(Registry::with_options(
        settings.config_file.clone(),
        requester,
        settings.registry_options(),
    ));
    (registry, queue)
}

/// A running registry with its file watcher and restart coordinator.
pub struct NetregService {
    registry: Arc<Registry>,
    requester: RestartRequester,
    ct: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl NetregService {
    /// Start with the restart command from settings.
    pub async fn start(settings: &Settings) -> anyhow::Result<Self> {
        let command = ShellCommand::new(&settings.restart.command)
            .context("invalid restart command in settings")?;
        Self::start_with_command(settings, Arc::new(command)).await
    }

    /// Load the config file, then spawn the coordinator and, if enabled, the watcher.
    ///
    /// An unreadable config file is fatal.
    pub async fn start_with_command(
        settings: &Settings,
        command: Arc<dyn RestartCommand>,
    ) -> anyhow::Result<Self> {
        let (registry, queue) = build_registry(settings);

        let loaded = {
            let registry = registry.clone();
            tokio::task::spawn_blocking(move || registry.load()).await??
        };
        crate::log_event!(
            "service",
            "loaded",
            "{} devices ({} lines skipped)",
            loaded.devices,
            loaded.skipped
        );

        let ct = CancellationToken::new();
        let mut tasks = Vec::with_capacity(2);

        if settings.watch.enabled {
            let watcher = ConfigFileWatcher::new(
                registry.clone(),
                settings.watch.settle(),
                settings.watch.event_buffer,
            )
            .with_context(|| {
                format!("cannot watch {}", settings.config_file.display())
            })?;
            tasks.push(tokio::spawn(watcher.watch(ct.clone())));
        } else {
            crate::log_event!("service", "file watching disabled");
        }

        let coordinator = RestartCoordinator::new(
            registry.clone(),
            queue,
            command,
            settings.restart.min_interval(),
        );
        tasks.push(tokio::spawn(coordinator.run(ct.clone())));

        Ok(Self {
            requester: registry.restarts().clone(),
            registry,
            ct,
            tasks,
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Restart queue handle, for inspecting coordinator state.
    pub fn restarts(&self) -> &RestartRequester {
        &self.requester
    }

    /// Signal both tasks to stop and wait for them to exit.
    pub async fn shutdown(self) {
        crate::log_event!("service", "stopping");
        self.ct.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!("[service] background task failed: {e}");
            }
        }
        crate::log_event!("service", "stopped");
    }
}
