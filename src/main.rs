use attribute_index::{
    config::Config,
    models::Organization,
    search::create_registry,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize tracing
    attribute_index::logging::init(&config.observability)?;

    tracing::info!("Starting attribute index v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Index backend: {:?}", config.index.backend);

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = attribute_index::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("✅ Prometheus metrics initialized");
        }
    } else {
        tracing::info!("⚠️  Prometheus metrics disabled in configuration");
    }

    // Provision every configured tenant
    let tenants: Vec<Organization> = config.tenants.iter().map(Organization::from).collect();
    let registry = create_registry(&config.index, &tenants)?;
    tracing::info!(
        "✅ Index registry initialized with {} tenant(s)",
        registry.tenants().len()
    );

    let autosave = if config.index.save_interval_secs > 0 {
        let interval = Duration::from_secs(config.index.save_interval_secs);
        tracing::info!("✅ Autosave every {}s", config.index.save_interval_secs);
        Some(registry.spawn_autosave(interval))
    } else {
        tracing::info!("⚠️  Autosave disabled in configuration");
        None
    };

    tracing::info!("Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    if let Some(handle) = autosave {
        handle.abort();
        // a save still running on the blocking pool holds the index save
        // lock, so the final save below waits for it
        if let Err(e) = handle.await {
            if !e.is_cancelled() {
                tracing::warn!("⚠️  Autosave task ended abnormally: {}", e);
            }
        }
    }

    tracing::info!("Shutting down gracefully...");
    tokio::task::spawn_blocking(move || registry.shutdown()).await??;

    if config.observability.prometheus_enabled {
        tracing::debug!("Final metrics:\n{}", attribute_index::metrics::gather_metrics());
    }
    Ok(())
}
