//! Coalesced restarts of the external DHCP service.
//!
//! Every registry save enqueues a request. A single background task wakes up
//! once per minimum interval and, if anything is queued, runs the restart
//! command once under the registry lock and discards the rest of the queue.
//!
//! ```text
//! IDLE --request--> PENDING --tick--> RESTARTING --> IDLE
//!   any state --stop--> STOPPED
//! ```

mod command;
mod coordinator;
mod error;

pub use command::{RestartCommand, ShellCommand};
pub use coordinator::{
    CoordinatorState, RestartCoordinator, RestartQueue, RestartRequester, restart_channel,
};
pub use error::RestartError;
