use clap::Parser;

use netreg::Settings;
use netreg::cli::commands::{devices, init, serve};
use netreg::cli::{Cli, Commands};
use netreg::registry::DeviceDraft;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Init writes the settings file, so it must not depend on loading one
    if let Commands::Init { force } = cli.command {
        init::run_init(force);
        return;
    }

    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });
    if let Some(file) = cli.file {
        config.config_file = file;
    }

    netreg::logging::init_with_config(&config.logging);

    let result = match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Config => {
            init::run_config(&config);
            Ok(())
        }
        Commands::Serve => serve::run(config).await,
        Commands::List { owner, json } => devices::run_list(&config, owner.as_deref(), json),
        Commands::Check => devices::run_check(&config),
        Commands::Add {
            owner,
            label,
            mac,
            disabled,
            no_restart,
        } => {
            let draft = DeviceDraft {
                owner,
                label,
                mac,
                enabled: !disabled,
            };
            devices::run_add(&config, draft, no_restart).await
        }
        Commands::Remove { mac, no_restart } => {
            devices::run_remove(&config, &mac, no_restart).await
        }
        Commands::Enable { mac, no_restart } => {
            devices::run_set_enabled(&config, &mac, true, no_restart).await
        }
        Commands::Disable { mac, no_restart } => {
            devices::run_set_enabled(&config, &mac, false, no_restart).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
