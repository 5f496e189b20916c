use facemark::{utils::config::Config, Application};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::new().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Log to stdout and a daily-rolling file
    let file_appender = tracing_appender::rolling::daily("logs", "facemark.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.node.log_level)),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stdout.and(file_writer))
        .init();

    info!("Starting facemark node v{}", env!("CARGO_PKG_VERSION"));

    // Initialize application
    let app = Application::new(config).await.map_err(|e| {
        error!("Failed to initialize application: {}", e);
        e
    })?;

    // Start the application
    app.start().await.map_err(|e| {
        error!("Failed to start application: {}", e);
        e
    })?;

    // Handle shutdown signals
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                let _ = shutdown_tx.send(());
            }
            Err(err) => {
                error!("Failed to listen for shutdown signal: {}", err);
            }
        }
    });

    // Wait for shutdown signal
    let _ = shutdown_rx.await;

    // Perform graceful shutdown
    if let Err(e) = app.shutdown().await {
        error!("Error during shutdown: {}", e);
    }

    info!("Application shutdown complete");
    Ok(())
}
