//! End-to-end registry behavior against real files.

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;

use netreg::registry::{Device, Registry, RegistryError};
use netreg::restart::restart_channel;
use tempfile::TempDir;

const MIXED_CONF: &str = "\
# dhcpd.conf managed by netreg
option domain-name \"lab.example\";
default-lease-time 600;

subnet 10.1.0.0 netmask 255.255.0.0 {
   option routers 10.1.0.1;
   host alice-laptop { hardware ethernet 00:16:3e:00:00:01; }
   host alice-phone { hardware ethernet 00:16:3e:00:00:02; }
   host bob-desktop { hardware ethernet 00:16:3e:00:00:03; }
   host carol-printer { hardware ethernet 00:16:3e:00:00:04; }
   host dave-tv { hardware ethernet 00:16:3e:00:00:05; }
#  host erin-console { hardware ethernet 00:16:3e:00:00:06; }
#host frank-watch { hardware ethernet 00:16:3e:00:00:07; }
#  host gina-tablet { hardware ethernet 00:16:3e:00:00:08; }
   host broken-entry { hardware ethernet zz:16:3e:00:00:09; }
   host missing-brace hardware ethernet 00:16:3e:00:00:0a;
}
";

fn registry_for(contents: &str) -> (TempDir, Registry) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dhcpd.conf");
    fs::write(&path, contents).unwrap();
    let (requester, _queue) = restart_channel(256);
    (dir, Registry::new(path, requester))
}

fn tuples(devices: &[Device]) -> HashSet<(String, String, String, bool)> {
    devices
        .iter()
        .map(|d| (d.mac.clone(), d.owner.clone(), d.label.clone(), d.enabled))
        .collect()
}

#[test]
fn test_mixed_file_keeps_wellformed_records() {
    let (_dir, registry) = registry_for(MIXED_CONF);
    let summary = registry.load().unwrap();

    assert_eq!(summary.devices, 8);
    assert_eq!(summary.skipped, 2);
    assert_eq!(registry.num_devices(), 8);
    assert!(!registry.contains("zz:16:3e:00:00:09"));
    assert!(!registry.contains("00:16:3e:00:00:0a"));

    let disabled: Vec<_> = registry
        .list_all()
        .into_iter()
        .filter(|d| !d.enabled)
        .map(|d| d.name())
        .collect();
    assert_eq!(disabled, vec!["erin-console", "frank-watch", "gina-tablet"]);
}

#[test]
fn test_save_preserves_header_and_normalizes_records() {
    let (dir, registry) = registry_for(MIXED_CONF);
    registry.load().unwrap();
    assert!(registry.save());

    let written = fs::read_to_string(dir.path().join("dhcpd.conf")).unwrap();
    let header = "\
# dhcpd.conf managed by netreg
option domain-name \"lab.example\";
default-lease-time 600;

subnet 10.1.0.0 netmask 255.255.0.0 {
   option routers 10.1.0.1;
";
    assert!(written.starts_with(header));
    assert!(written.contains("#  host frank-watch { hardware ethernet 00:16:3e:00:00:07; }\n"));
    assert!(!written.contains("broken-entry"));
    assert!(written.ends_with("; }\n}\n"));
    assert_eq!(written.matches("\n}\n").count(), 1);
}

#[test]
fn test_round_trip_reproduces_devices() {
    let (dir, registry) = registry_for("subnet 10.0.0.0 netmask 255.0.0.0 {\n");
    registry.load().unwrap();

    registry.add(Device::new("alice", "phone", "00:00:00:00:00:00", true));
    registry.add(Device::new("bob", "nas", "00:00:00:00:00:01", false));
    registry.add(Device::new("bob", "tv", "00:00:00:00:00:02", true));
    registry.add(Device::new("zed", "old", "00:00:00:00:00:03", false));
    assert!(registry.save());
    let before = tuples(&registry.list_all());

    let (requester, _queue) = restart_channel(8);
    let reloaded = Registry::new(dir.path().join("dhcpd.conf"), requester);
    reloaded.load().unwrap();

    assert_eq!(tuples(&reloaded.list_all()), before);
    assert_eq!(reloaded.head(), registry.head());
}

#[test]
fn test_add_then_list_for_user() {
    let (_dir, registry) = registry_for("");
    registry.load().unwrap();

    registry.add(Device::new("alice", "phone", "00:00:00:00:00:00", true));
    registry.add(Device::new("bob", "phone", "00:00:00:00:00:01", true));

    assert_eq!(
        registry.list_for_user("alice"),
        vec![Device::new("alice", "phone", "00:00:00:00:00:00", true)]
    );
}

#[test]
fn test_set_and_remove_absent_mac_are_noops() {
    let (_dir, registry) = registry_for(MIXED_CONF);
    registry.load().unwrap();
    let before = registry.list_all();

    assert!(!registry.set(Device::new("x", "y", "ff:ff:ff:ff:ff:ff", true)));
    assert!(!registry.remove("ff:ff:ff:ff:ff:ff"));
    assert_eq!(registry.list_all(), before);
}

#[test]
fn test_missing_file_keeps_state() {
    let (dir, registry) = registry_for(MIXED_CONF);
    registry.load().unwrap();
    fs::remove_file(dir.path().join("dhcpd.conf")).unwrap();

    let err = registry.load().unwrap_err();
    assert!(matches!(err, RegistryError::FileAccess { .. }));
    assert_eq!(registry.num_devices(), 8);
}

#[test]
fn test_concurrent_adds_keep_index_consistent() {
    let (_dir, registry) = registry_for("");
    registry.load().unwrap();
    let registry = Arc::new(registry);

    let handles: Vec<_> = (0..8u8)
        .map(|t| {
            let registry = registry.clone();
            thread::spawn(move || {
                for i in 0..25u8 {
                    // Overlapping MACs across threads exercise idempotent add
                    let mac = format!("02:00:00:00:{:02x}:{:02x}", t % 4, i);
                    registry.add(Device::new(format!("u{t}"), format!("d{i}"), mac, i % 2 == 0));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let all = registry.list_all();
    assert_eq!(registry.num_devices(), 100);
    assert_eq!(all.len(), 100);
    let macs: HashSet<_> = all.iter().map(|d| d.mac.as_str()).collect();
    assert_eq!(macs.len(), 100);

    let first_disabled = all.iter().position(|d| !d.enabled).unwrap();
    assert!(all[..first_disabled].iter().all(|d| d.enabled));
    assert!(all[first_disabled..].iter().all(|d| !d.enabled));
}
