//! Device registry backed by a dhcpd host list.
//!
//! # Architecture
//!
//! ```text
//! Registry (one RwLock)
//!   - OrderedIndex: MAC -> Device, plus keys sorted enabled-first then by name
//!   - head: bytes preserved from before the first record
//!   - codec: parse / serialize of the config file
//!   - RestartRequester: one request per save
//!   - WriteSuppressor: armed on save, read by the file watcher
//! ```

pub mod codec;
mod device;
mod error;
mod index;
mod store;

pub use device::{Device, DeviceDraft, UNKNOWN_OWNER, canonical_mac, parse_mac};
pub use error::{MacError, ParseError, RegistryError, RegistryResult};
pub use index::OrderedIndex;
pub use store::{LoadSummary, Registry, RegistryOptions};
