//! Reader and writer for the dhcpd host list.
//!
//! Only one record shape is understood:
//!
//! ```text
//!    host OWNER-LABEL { hardware ethernet MAC; }
//! #  host OWNER-LABEL { hardware ethernet MAC; }
//! ```
//!
//! Everything before the first record-shaped line is kept verbatim as the
//! file head. After that point, lines that are not record-shaped are dropped;
//! the writer closes the file with a single `}` line.

use super::device::{Device, parse_mac};
use super::error::ParseError;

/// Result of parsing a config file.
#[derive(Debug, Default, Clone)]
pub struct ParsedConfig {
    /// Bytes preceding the first record, exactly as read.
    pub head: Vec<u8>,
    /// Devices in file order.
    pub devices: Vec<Device>,
    /// Record lines that could not be parsed.
    pub errors: Vec<ParseError>,
    /// Line numbers of non-record lines after the first record.
    pub discarded: Vec<usize>,
}

/// A line is record-shaped when, ignoring one leading `#`, its first token is `host`.
fn is_record_shaped(trimmed: &[u8]) -> bool {
    let body = trimmed.strip_prefix(b"#").unwrap_or(trimmed);
    body.split(u8::is_ascii_whitespace)
        .find(|token| !token.is_empty())
        == Some(b"host".as_slice())
}

/// Parse one record-shaped line.
fn parse_record(trimmed: &str, line: usize) -> Result<Device, ParseError> {
    let (enabled, body) = match trimmed.strip_prefix('#') {
        Some(rest) => (false, rest),
        None => (true, trimmed),
    };

    let tokens: Vec<&str> = body.split_whitespace().collect();
    let (name, mac) = match tokens.as_slice() {
        ["host", name, "{", "hardware", "ethernet", mac, "}", ..] => (*name, *mac),
        _ if enabled => return Err(ParseError::MalformedRecord { line }),
        _ => return Err(ParseError::MalformedDisabledRecord { line }),
    };

    let mac = mac.trim_end_matches(';');
    parse_mac(mac).map_err(|reason| ParseError::InvalidMac {
        line,
        mac: mac.to_string(),
        reason,
    })?;

    Ok(Device::from_host_name(name, mac, enabled))
}

/// Parse config file contents.
///
/// Works on raw bytes so the head survives any encoding. Only record lines
/// are decoded, lossily; invalid bytes there fail name or MAC validation.
/// Never fails as a whole: bad record lines are reported in
/// [`ParsedConfig::errors`] and skipped.
pub fn parse(content: &[u8]) -> ParsedConfig {
    let mut parsed = ParsedConfig::default();
    let mut reading_head = true;

    for (idx, line) in content.split_inclusive(|b| *b == b'\n').enumerate() {
        let line_number = idx + 1;
        let trimmed = line.trim_ascii();

        if !is_record_shaped(trimmed) {
            if reading_head {
                parsed.head.extend_from_slice(line);
            } else {
                parsed.discarded.push(line_number);
            }
            continue;
        }

        reading_head = false;
        match parse_record(&String::from_utf8_lossy(trimmed), line_number) {
            Ok(device) => parsed.devices.push(device),
            Err(e) => parsed.errors.push(e),
        }
    }

    if !parsed.head.is_empty() && !parsed.head.ends_with(b"\n") {
        parsed.head.push(b'\n');
    }

    parsed
}

/// Render a single device line without the trailing newline.
pub fn record_line(device: &Device) -> String {
    let prefix = if device.enabled { "   " } else { "#  " };
    format!(
        "{prefix}host {} {{ hardware ethernet {}; }}",
        device.name(),
        device.mac
    )
}

/// Serialize the head, unchanged, followed by `devices` in the order given.
pub fn serialize<'a>(head: &[u8], devices: impl IntoIterator<Item = &'a Device>) -> Vec<u8> {
    let mut out = Vec::with_capacity(head.len() + 64);
    out.extend_from_slice(head);
    for device in devices {
        out.extend_from_slice(record_line(device).as_bytes());
        out.push(b'\n');
    }
    out.extend_from_slice(b"}\n");
    out
}
