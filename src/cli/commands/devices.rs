//! Device commands: list, check, add, remove, enable, disable.
//!
//! Each invocation loads the config file, applies one change, saves and
//! then restarts dhcpd right away instead of waiting for an interval.

use std::sync::Arc;

use anyhow::{Context, bail};

use crate::config::Settings;
use crate::registry::{Device, DeviceDraft, Registry, canonical_mac};
use crate::restart::{RestartCoordinator, RestartQueue, ShellCommand};
use crate::service::build_registry;

/// Load the configured file into a fresh registry.
fn open(settings: &Settings) -> anyhow::Result<(Arc<Registry>, RestartQueue, usize)> {
    let (registry, queue) = build_registry(settings);
    let summary = registry
        .load()
        .with_context(|| format!("cannot load {}", settings.config_file.display()))?;
    Ok((registry, queue, summary.skipped))
}

/// Find a device by MAC, accepting any spelling of the same address.
fn lookup(registry: &Registry, mac: &str) -> Option<Device> {
    if let Some(device) = registry.get(mac) {
        return Some(device);
    }
    let wanted = canonical_mac(mac).ok()?;
    registry
        .list_all()
        .into_iter()
        .find(|d| canonical_mac(&d.mac).is_ok_and(|m| m == wanted))
}

/// Write the file and restart dhcpd unless told not to.
async fn commit(
    registry: Arc<Registry>,
    queue: RestartQueue,
    settings: &Settings,
    no_restart: bool,
) -> anyhow::Result<()> {
    if !registry.save() {
        bail!("failed to write {}", registry.path().display());
    }

    if no_restart {
        println!("Skipped dhcpd restart");
        return Ok(());
    }

    let command = ShellCommand::new(&settings.restart.command)
        .context("invalid restart command in settings")?;
    let coordinator = RestartCoordinator::new(
        registry.clone(),
        queue,
        Arc::new(command),
        settings.restart.min_interval(),
    );
    if coordinator.fire().await {
        println!("Restarted dhcpd");
    }
    Ok(())
}

/// List devices, optionally for one owner.
pub fn run_list(settings: &Settings, owner: Option<&str>, json: bool) -> anyhow::Result<()> {
    let (registry, _queue, _) = open(settings)?;
    let devices = match owner {
        Some(owner) => registry.list_for_user(owner),
        None => registry.list_all(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("No devices registered");
        return Ok(());
    }
    for device in &devices {
        let status = if device.enabled { "enabled" } else { "disabled" };
        println!("{device} [{status}]");
    }
    println!("\n{} devices", devices.len());
    Ok(())
}

/// Parse the file and report. Exits non-zero when lines were skipped.
pub fn run_check(settings: &Settings) -> anyhow::Result<()> {
    let (registry, _queue, skipped) = open(settings)?;
    println!(
        "{}: {} devices, {} skipped lines",
        settings.config_file.display(),
        registry.num_devices(),
        skipped
    );
    if skipped > 0 {
        eprintln!("Run with RUST_LOG=netreg=warn to see the skipped lines");
        std::process::exit(1);
    }
    Ok(())
}

/// Register a new device.
pub async fn run_add(
    settings: &Settings,
    draft: DeviceDraft,
    no_restart: bool,
) -> anyhow::Result<()> {
    if draft.owner.is_empty() || !draft.owner.chars().all(|c| c.is_ascii_alphanumeric()) {
        bail!("owner must be letters and digits only: '{}'", draft.owner);
    }
    let device = draft.normalize().context("invalid MAC address")?;
    if device.label.is_empty() {
        bail!("device label is empty after removing unsupported characters");
    }

    let (registry, queue, _) = open(settings)?;
    if let Some(existing) = lookup(&registry, &device.mac) {
        bail!("{} is already registered as {}", device.mac, existing.name());
    }

    registry.add(device.clone());
    println!("Added {device}");
    commit(registry, queue, settings, no_restart).await
}

/// Remove a device by MAC.
pub async fn run_remove(settings: &Settings, mac: &str, no_restart: bool) -> anyhow::Result<()> {
    let (registry, queue, _) = open(settings)?;
    let Some(device) = lookup(&registry, mac) else {
        bail!("no device with MAC {mac}");
    };

    registry.remove(&device.mac);
    println!("Removed {device}");
    commit(registry, queue, settings, no_restart).await
}

/// Enable or disable a device by MAC.
pub async fn run_set_enabled(
    settings: &Settings,
    mac: &str,
    enabled: bool,
    no_restart: bool,
) -> anyhow::Result<()> {
    let (registry, queue, _) = open(settings)?;
    let Some(mut device) = lookup(&registry, mac) else {
        bail!("no device with MAC {mac}");
    };

    let word = if enabled { "enabled" } else { "disabled" };
    if device.enabled == enabled {
        println!("{device} is already {word}");
        return Ok(());
    }

    device.enabled = enabled;
    registry.set(device.clone());
    println!("{device} is now {word}");
    commit(registry, queue, settings, no_restart).await
}
