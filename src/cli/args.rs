//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// dhcpd device registry
#[derive(Parser)]
#[command(
    name = "netreg",
    version = env!("CARGO_PKG_VERSION"),
    about = "Manage the host entries of a dhcpd config file",
    long_about = "Keep a registry of network devices in sync with a dhcpd config file and restart the DHCP service after changes.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Examples:\n  netreg init\n  netreg list --owner alice\n  netreg add alice laptop e0:ca:94:d4:4c:9f\n  netreg disable e0:ca:94:d4:4c:9f\n  netreg serve"
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// dhcpd config file to manage (overrides settings)
    #[arg(long, global = true, value_name = "PATH")]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .netreg directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .netreg/settings.toml")]
    Config,

    /// Run the registry service
    #[command(
        about = "Watch the config file and restart dhcpd after changes",
        long_about = "Load the config file, reload it on external edits and run the restart coordinator until interrupted."
    )]
    Serve,

    /// List registered devices
    #[command(
        about = "List devices, enabled first then by name",
        after_help = "Examples:\n  netreg list\n  netreg list --owner alice\n  netreg list --json | jq '.[].mac'"
    )]
    List {
        /// Only devices belonging to this owner
        #[arg(long)]
        owner: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Validate the config file
    #[command(about = "Parse the config file and report skipped lines")]
    Check,

    /// Register a device
    #[command(
        about = "Add a device and rewrite the config file",
        after_help = "Example:\n  netreg add alice laptop e0:ca:94:d4:4c:9f"
    )]
    Add {
        /// Owner of the device
        owner: String,

        /// Device label, unique per owner
        label: String,

        /// Hardware address
        mac: String,

        /// Register the device commented out
        #[arg(long)]
        disabled: bool,

        /// Do not restart dhcpd after writing
        #[arg(long)]
        no_restart: bool,
    },

    /// Remove a device
    #[command(about = "Remove a device by MAC address")]
    Remove {
        /// Hardware address as written in the config file
        mac: String,

        /// Do not restart dhcpd after writing
        #[arg(long)]
        no_restart: bool,
    },

    /// Enable a device
    #[command(about = "Uncomment a disabled device")]
    Enable {
        /// Hardware address as written in the config file
        mac: String,

        /// Do not restart dhcpd after writing
        #[arg(long)]
        no_restart: bool,
    },

    /// Disable a device
    #[command(about = "Comment out a device without removing it")]
    Disable {
        /// Hardware address as written in the config file
        mac: String,

        /// Do not restart dhcpd after writing
        #[arg(long)]
        no_restart: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "netreg",
            "--file",
            "/tmp/dhcpd.conf",
            "add",
            "alice",
            "laptop",
            "e0:ca:94:d4:4c:9f",
            "--disabled",
        ])
        .unwrap();

        assert_eq!(cli.file, Some(PathBuf::from("/tmp/dhcpd.conf")));
        match cli.command {
            Commands::Add {
                owner,
                label,
                mac,
                disabled,
                no_restart,
            } => {
                assert_eq!(owner, "alice");
                assert_eq!(label, "laptop");
                assert_eq!(mac, "e0:ca:94:d4:4c:9f");
                assert!(disabled);
                assert!(!no_restart);
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["netreg", "list", "-c", "custom.toml", "--json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::List { json: true, owner: None }));
    }
}
