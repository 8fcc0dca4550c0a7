//! Self-write suppression.
//!
//! The registry arms the suppressor right before writing the config file so
//! the watcher can tell its own writes from external edits.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A flag that stays raised for a fixed window after each `arm()`.
#[derive(Debug)]
pub struct WriteSuppressor {
    window: Duration,
    until: Mutex<Option<Instant>>,
}

impl WriteSuppressor {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            until: Mutex::new(None),
        }
    }

    /// Raise the flag for one window starting now.
    pub fn arm(&self) {
        *self.until.lock() = Some(Instant::now() + self.window);
    }

    pub fn is_active(&self) -> bool {
        let mut until = self.until.lock();
        match *until {
            Some(deadline) if Instant::now() < deadline => true,
            Some(_) => {
                *until = None;
                false
            }
            None => false,
        }
    }
}
