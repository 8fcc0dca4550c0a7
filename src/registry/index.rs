//! Device map with a sorted key projection for stable enumeration.

use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;

use super::device::Device;

/// Projection of a device used for ordering.
#[derive(Debug, Clone)]
struct SortKey {
    name: String,
    mac: String,
    enabled: bool,
}

impl SortKey {
    fn of(device: &Device) -> Self {
        Self {
            name: device.name(),
            mac: device.mac.clone(),
            enabled: device.enabled,
        }
    }

    // Enabled devices first, then by name. Ties are left to the stable sort.
    fn order(&self, other: &Self) -> Ordering {
        (Reverse(self.enabled), &self.name).cmp(&(Reverse(other.enabled), &other.name))
    }
}

/// MAC-keyed device map plus the ordered key sequence.
///
/// Both sides always hold the same MACs; every mutation touches both.
#[derive(Debug, Default, Clone)]
pub struct OrderedIndex {
    devices: HashMap<String, Device>,
    keys: Vec<SortKey>,
}

impl OrderedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a device if its MAC is not yet present.
    ///
    /// Returns `false` (and changes nothing) when the MAC already exists.
    pub fn insert(&mut self, device: Device) -> bool {
        if self.devices.contains_key(&device.mac) {
            return false;
        }

        self.keys.push(SortKey::of(&device));
        self.devices.insert(device.mac.clone(), device);
        self.keys.sort_by(SortKey::order);
        true
    }

    /// Remove a device by MAC, returning it if it was present.
    pub fn remove(&mut self, mac: &str) -> Option<Device> {
        let device = self.devices.remove(mac)?;
        if let Some(pos) = self.keys.iter().position(|k| k.mac == mac) {
            self.keys.remove(pos);
        }
        Some(device)
    }

    pub fn get(&self, mac: &str) -> Option<&Device> {
        self.devices.get(mac)
    }

    pub fn contains(&self, mac: &str) -> bool {
        self.devices.contains_key(mac)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Devices in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Device> + '_ {
        self.keys.iter().filter_map(|k| self.devices.get(&k.mac))
    }

    /// Number of entries in the key projection. Equal to `len()` at rest.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}
