//! Config file watcher.
//!
//! Reloads the registry when the dhcpd config file is edited by something
//! other than the registry itself.
//!
//! # Architecture
//!
//! ```text
//! notify::RecommendedWatcher (one path)
//!         |
//!    mpsc channel
//!         |
//! ConfigFileWatcher
//!   - write   -> reload now, unless WriteSuppressor is active
//!   - remove  -> settle, reload, re-subscribe
//! ```

mod config_file;
mod error;
mod suppress;

pub use config_file::{ConfigFileWatcher, FileEvent, Reaction, classify, react};
pub use error::WatchError;
pub use suppress::WriteSuppressor;
