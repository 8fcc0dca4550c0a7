//! Device registry for an ISC dhcpd host list.
//!
//! The registry owns the `host` entries of a dhcpd config file, reloads them
//! when the file is edited externally and restarts the DHCP service, at most
//! once per interval, after it writes the file itself.

pub mod cli;
pub mod config;
pub mod logging;
pub mod registry;
pub mod restart;
pub mod service;
pub mod watcher;

pub use config::Settings;
pub use registry::{Device, DeviceDraft, LoadSummary, Registry, RegistryError};
pub use restart::{CoordinatorState, RestartCommand, ShellCommand};
pub use service::NetregService;
