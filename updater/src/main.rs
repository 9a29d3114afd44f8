use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use updater::errors::UpdaterError;
use updater::http::{ApiClient, RemoteService, RetryPolicy};
use updater::scheduler::UpdateScheduler;
use updater::tasks::standard_executors;
use updater::web::{start_web_server, AppState};
use updater::ConfigManager;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with reduced verbosity
    let env_filter = EnvFilter::from_default_env()
        .add_directive("updater=info".parse()?)
        .add_directive("tower_http=warn".parse()?)
        .add_directive("tokio_cron_scheduler=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting site asset updater");

    if let Err(e) = run().await {
        error!("❌ Updater stopped: {}", e);
        return Err(e.into());
    }
    Ok(())
}

async fn run() -> Result<(), UpdaterError> {
    // Load configuration
    let config_manager = ConfigManager::new("config".to_string()).await?;
    let config = config_manager.get_current_config();

    if let Err(e) = config.require_api_key() {
        error!("❌ {}", e);
        error!("Set OPENAI_API_KEY or add api_key under [api] in config/main.toml");
        return Err(e.into());
    }

    // Remote service with retry
    let client = ApiClient::new(&config.api)?;
    let remote = RemoteService::new(Arc::new(client), RetryPolicy::from(&config.api.retry));
    info!(
        "Remote service ready: {} (text: {}, image: {})",
        config.api.endpoint, config.api.text_model, config.api.image_model
    );

    // Scheduler with the fixed task set
    let scheduler = UpdateScheduler::new(&config.scheduler, standard_executors(&config, remote));
    scheduler.init().await;

    match scheduler.start(&config.scheduler.schedule).await {
        Ok(next_run) => info!("Next update run at {}", next_run),
        Err(e) => {
            error!("✗ Scheduler not started: {}", e);
            return Err(e.into());
        }
    }

    if config.scheduler.run_on_start {
        match scheduler.trigger_run().await {
            Ok(handle) => info!("Startup run {} started", handle.run_id),
            Err(e) => warn!("Startup run not started: {}", e),
        }
    }

    // Start web server; Ctrl-C stops it and then the scheduler
    let state = AppState::new(config.clone(), scheduler.clone());
    start_web_server(state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
    })
    .await?;

    scheduler.shutdown().await;
    Ok(())
}
