use netreg::Settings;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

// Single test in this binary: environment variables are process wide.
#[test]
fn test_env_override_with_nested_keys() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        "config_file = \"/etc/dhcp/from-file.conf\"\n\n[restart]\nmin_interval_secs = 30\n",
    )
    .unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("NETREG_CONFIG_FILE", "/tmp/from-env.conf");
        env::set_var("NETREG_RESTART__QUEUE_CAPACITY", "16");
        env::set_var("NETREG_WATCH__ENABLED", "false");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    unsafe {
        env::remove_var("NETREG_CONFIG_FILE");
        env::remove_var("NETREG_RESTART__QUEUE_CAPACITY");
        env::remove_var("NETREG_WATCH__ENABLED");
    }

    assert_eq!(settings.config_file, PathBuf::from("/tmp/from-env.conf"));
    assert_eq!(settings.restart.queue_capacity, 16);
    assert!(!settings.watch.enabled);
    // File values survive where no variable is set
    assert_eq!(settings.restart.min_interval_secs, 30);
}
