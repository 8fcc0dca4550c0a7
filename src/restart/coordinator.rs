//! Restart request queue and the task that drains it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use super::command::RestartCommand;
use crate::registry::Registry;

/// Lifecycle of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Pending,
    Restarting,
    Stopped,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<CoordinatorState>,
    invocations: AtomicU64,
}

impl Shared {
    fn set(&self, state: CoordinatorState) {
        let mut current = self.state.lock();
        if *current != CoordinatorState::Stopped {
            *current = state;
        }
    }
}

/// Create a bounded restart queue.
///
/// The capacity only needs to exceed the number of saves that can happen in
/// one interval; a full queue already guarantees a restart.
pub fn restart_channel(capacity: usize) -> (RestartRequester, RestartQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let shared = Arc::new(Shared {
        state: Mutex::new(CoordinatorState::Idle),
        invocations: AtomicU64::new(0),
    });
    (
        RestartRequester {
            tx,
            shared: shared.clone(),
        },
        RestartQueue {
            rx: Arc::new(Mutex::new(rx)),
            shared,
        },
    )
}

/// Sending half, held by the registry.
#[derive(Debug, Clone)]
pub struct RestartRequester {
    tx: mpsc::Sender<()>,
    shared: Arc<Shared>,
}

impl RestartRequester {
    /// Enqueue a restart request. Never blocks.
    pub fn request(&self) {
        match self.tx.try_send(()) {
            Ok(()) => {
                self.shared.set(CoordinatorState::Pending);
                crate::debug_event!("restart", "requested");
            }
            Err(TrySendError::Full(())) => {
                crate::debug_event!("restart", "queue full, restart already pending");
            }
            Err(TrySendError::Closed(())) => {
                crate::debug_event!("restart", "coordinator gone, request dropped");
            }
        }
    }

    pub fn state(&self) -> CoordinatorState {
        *self.shared.state.lock()
    }

    /// Number of times the restart command has been run.
    pub fn invocations(&self) -> u64 {
        self.shared.invocations.load(Ordering::SeqCst)
    }
}

/// Receiving half, consumed by [`RestartCoordinator`].
#[derive(Debug)]
pub struct RestartQueue {
    rx: Arc<Mutex<mpsc::Receiver<()>>>,
    shared: Arc<Shared>,
}

impl RestartQueue {
    /// Take one request if any is queued.
    fn take_one(&self) -> bool {
        self.rx.lock().try_recv().is_ok()
    }
}

fn drain(rx: &Mutex<mpsc::Receiver<()>>) -> usize {
    let mut rx = rx.lock();
    let mut count = 0;
    while rx.try_recv().is_ok() {
        count += 1;
    }
    count
}

/// Runs the restart command at most once per interval.
pub struct RestartCoordinator {
    registry: Arc<Registry>,
    queue: RestartQueue,
    command: Arc<dyn RestartCommand>,
    interval: Duration,
}

impl RestartCoordinator {
    pub fn new(
        registry: Arc<Registry>,
        queue: RestartQueue,
        command: Arc<dyn RestartCommand>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            queue,
            command,
            interval,
        }
    }

    /// Run until `ct` is cancelled.
    ///
    /// The first tick fires one full interval after start.
    pub async fn run(self, ct: CancellationToken) {
        // tokio rejects a zero period
        let period = self.interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        crate::log_event!(
            "restart",
            "started",
            "'{}' at most every {}s",
            self.command.describe(),
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.fire().await;
                }
                _ = ct.cancelled() => {
                    break;
                }
            }
        }

        *self.queue.shared.state.lock() = CoordinatorState::Stopped;
        crate::log_event!("restart", "stopped");
    }

    /// Process one tick: restart once if anything is pending.
    ///
    /// Returns `true` when the restart command was invoked.
    pub async fn fire(&self) -> bool {
        if !self.queue.take_one() {
            return false;
        }

        self.queue.shared.set(CoordinatorState::Restarting);
        crate::log_event!("restart", "restarting", "{}", self.command.describe());

        let registry = self.registry.clone();
        let command = self.command.clone();
        let rx = self.queue.rx.clone();
        let shared = self.queue.shared.clone();

        // The lock keeps the file stable while the service reads it; requests
        // queued up to this point are covered by this restart.
        let joined = tokio::task::spawn_blocking(move || {
            registry.exclusive(|| {
                let result = command.restart();
                shared.invocations.fetch_add(1, Ordering::SeqCst);
                let coalesced = drain(&rx);
                shared.set(CoordinatorState::Idle);
                (result, coalesced)
            })
        })
        .await;

        match joined {
            Ok((Ok(()), coalesced)) => {
                crate::log_event!("restart", "done", "{coalesced} extra requests coalesced");
            }
            Ok((Err(e), _)) => {
                tracing::error!("[restart] {e}");
            }
            Err(e) => {
                tracing::error!("[restart] restart task failed: {e}");
                self.queue.shared.set(CoordinatorState::Idle);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Device, Registry};
    use crate::restart::RestartError;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingCommand {
        calls: AtomicUsize,
    }

    impl RestartCommand for CountingCommand {
        fn restart(&self) -> Result<(), RestartError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    struct FailingCommand;

    impl RestartCommand for FailingCommand {
        fn restart(&self) -> Result<(), RestartError> {
            Err(RestartError::EmptyCommand)
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn setup(
        command: Arc<dyn RestartCommand>,
        interval: Duration,
    ) -> (TempDir, Arc<Registry>, RestartRequester, RestartCoordinator) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dhcpd.conf");
        std::fs::write(&path, "").unwrap();
        let (requester, queue) = restart_channel(256);
        let registry = Arc::new(Registry::new(path, requester.clone()));
        let coordinator = RestartCoordinator::new(registry.clone(), queue, command, interval);
        (dir, registry, requester, coordinator)
    }

    #[tokio::test]
    async fn test_idle_tick_does_nothing() {
        let command = Arc::new(CountingCommand::default());
        let (_dir, _registry, requester, coordinator) =
            setup(command.clone(), Duration::from_secs(60));

        assert!(!coordinator.fire().await);
        assert_eq!(command.calls.load(Ordering::SeqCst), 0);
        assert_eq!(requester.state(), CoordinatorState::Idle);
    }

    #[tokio::test]
    async fn test_burst_coalesces_into_one_restart() {
        let command = Arc::new(CountingCommand::default());
        let (_dir, registry, requester, coordinator) =
            setup(command.clone(), Duration::from_secs(60));

        for i in 0..25u8 {
            registry.add(Device::new("user", format!("d{i}"), format!("00:00:00:00:00:{i:02x}"), true));
            registry.save();
        }
        assert_eq!(requester.state(), CoordinatorState::Pending);

        assert!(coordinator.fire().await);
        assert_eq!(command.calls.load(Ordering::SeqCst), 1);
        assert_eq!(requester.state(), CoordinatorState::Idle);
        assert_eq!(requester.invocations(), 1);

        // Queue was cleared by the restart
        assert!(!coordinator.fire().await);
        assert_eq!(command.calls.load(Ordering::SeqCst), 1);

        // A later save earns exactly one more restart
        registry.save();
        assert!(coordinator.fire().await);
        assert_eq!(command.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_restart_is_not_retried() {
        let (_dir, _registry, requester, coordinator) =
            setup(Arc::new(FailingCommand), Duration::from_secs(60));

        requester.request();
        assert!(coordinator.fire().await);
        assert_eq!(requester.state(), CoordinatorState::Idle);
        assert!(!coordinator.fire().await);
        assert_eq!(requester.invocations(), 1);
    }

    #[tokio::test]
    async fn test_full_queue_does_not_block() {
        let dir = TempDir::new().unwrap();
        let (requester, _queue) = restart_channel(2);
        let registry = Registry::new(dir.path().join("dhcpd.conf"), requester.clone());
        for _ in 0..10 {
            registry.save();
        }
        assert_eq!(requester.state(), CoordinatorState::Pending);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_restarts_once_per_interval() {
        let command = Arc::new(CountingCommand::default());
        let (_dir, _registry, requester, coordinator) =
            setup(command.clone(), Duration::from_millis(300));

        let ct = CancellationToken::new();
        let handle = tokio::spawn(coordinator.run(ct.clone()));

        for _ in 0..50 {
            requester.request();
        }
        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(command.calls.load(Ordering::SeqCst), 1);

        // Nothing new queued: the next tick is a no-op
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(command.calls.load(Ordering::SeqCst), 1);

        ct.cancel();
        handle.await.unwrap();
        assert_eq!(requester.state(), CoordinatorState::Stopped);
    }
}
