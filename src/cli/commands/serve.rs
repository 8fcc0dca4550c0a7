//! Serve command - run the registry until interrupted.

use crate::config::Settings;
use crate::service::NetregService;

/// Run the serve command.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let service = NetregService::start(&settings).await?;

    eprintln!(
        "Managing {} ({} devices). Press Ctrl+C to stop.",
        settings.config_file.display(),
        service.registry().num_devices()
    );

    shutdown_signal().await;
    service.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[serve] failed to install Ctrl+C handler: {e}");
        return;
    }
    eprintln!("Received shutdown signal");
}
