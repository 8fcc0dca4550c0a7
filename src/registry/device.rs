//! Device records and hardware address handling.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::MacError;

/// Owner assigned to host names that carry no `owner-` prefix.
pub const UNKNOWN_OWNER: &str = "UNKNOWN";

/// One registered network client.
///
/// The MAC string is the identity of a device. It is kept exactly as it was
/// supplied (file contents are not re-cased), so lookups must use the same text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub owner: String,
    #[serde(rename = "device")]
    pub label: String,
    pub mac: String,
    pub enabled: bool,
}

impl Device {
    pub fn new(
        owner: impl Into<String>,
        label: impl Into<String>,
        mac: impl Into<String>,
        enabled: bool,
    ) -> Self {
        Self {
            owner: owner.into(),
            label: label.into(),
            mac: mac.into(),
            enabled,
        }
    }

    /// Build a device from a host name as it appears in the config file.
    ///
    /// The name is split on the first `-`; a name without one is attributed
    /// to [`UNKNOWN_OWNER`] and used whole as the label.
    pub fn from_host_name(name: &str, mac: impl Into<String>, enabled: bool) -> Self {
        match name.split_once('-') {
            Some((owner, label)) => Self::new(owner, label, mac, enabled),
            None => Self::new(UNKNOWN_OWNER, name, mac, enabled),
        }
    }

    /// Host name written to the config file: `OWNER-LABEL`.
    pub fn name(&self) -> String {
        format!("{}-{}", self.owner, self.label)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OWNER: {} DEVICE: {} ({})",
            self.owner, self.label, self.mac
        )
    }
}

/// Unvalidated device fields as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceDraft {
    pub owner: String,
    #[serde(rename = "device")]
    pub label: String,
    pub mac: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl DeviceDraft {
    /// Validate and normalize into a [`Device`].
    ///
    /// The MAC is re-rendered in canonical form and the label is reduced to
    /// `[0-9A-Za-z-]`, which keeps the resulting host name a single token.
    pub fn normalize(self) -> Result<Device, MacError> {
        let mac = canonical_mac(&self.mac)?;
        let label: String = self
            .label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        Ok(Device::new(self.owner, label, mac, self.enabled))
    }
}

/// Parse a hardware address written as `:`- or `-`-separated hex octets.
///
/// Accepts the 6-octet EUI-48, 8-octet EUI-64 and 20-octet InfiniBand forms.
pub fn parse_mac(s: &str) -> Result<Vec<u8>, MacError> {
    if s.is_empty() {
        return Err(MacError::Empty);
    }

    let separator = if s.contains(':') { ':' } else { '-' };
    let other = if separator == ':' { '-' } else { ':' };
    if s.contains(other) {
        return Err(MacError::MixedSeparators);
    }

    let octets: Vec<&str> = s.split(separator).collect();
    if !matches!(octets.len(), 6 | 8 | 20) {
        return Err(MacError::OctetCount(octets.len()));
    }

    octets
        .into_iter()
        .map(|octet| {
            if octet.len() != 2 || !octet.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(MacError::InvalidOctet(octet.to_string()));
            }
            u8::from_str_radix(octet, 16).map_err(|_| MacError::InvalidOctet(octet.to_string()))
        })
        .collect()
}

/// Canonical rendering of a hardware address: lowercase, `:`-separated.
pub fn canonical_mac(s: &str) -> Result<String, MacError> {
    let bytes = parse_mac(s.trim())?;
    Ok(bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":"))
}
