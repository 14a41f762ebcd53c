//! fleet scheduler
//!
//! Keeps every configured worker group at its desired size by consuming
//! resource offers. Events from the resource manager arrive through the
//! driver bridge API and are handled one at a time by the scheduler worker.

use std::sync::Arc;

use anyhow::Result;
use fleet_reconcile::ReconciliationEngine;
use fleet_scheduler::{
    api, config,
    factory::TaskTemplate,
    gateway::ChannelGateway,
    scheduler::{seed_registry, Scheduler, SchedulerWorker},
    state::AppState,
    store::StateStore,
};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to FLEET_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting fleet scheduler");
    info!(
        listen_addr = %config.listen_addr,
        framework_name = %config.framework_name,
        groups = config.requirements.len(),
        "Configuration loaded"
    );

    // Open state store
    let store = match &config.state_path {
        Some(path) => StateStore::open(path),
        None => {
            warn!("FLEET_STATE_PATH not set, state will not survive a restart");
            StateStore::open_in_memory()
        }
    };
    let store = match store {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Failed to open state store");
            return Err(e.into());
        }
    };

    if let Some(record) = store.framework()? {
        info!(
            framework_id = %record.framework_id,
            registered_at = %record.registered_at,
            "Found previous framework registration"
        );
    }

    let registry = Arc::new(Mutex::new(seed_registry(&store, &config.requirements)?));
    let store = Arc::new(Mutex::new(store));

    // Create shutdown channel for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (events_tx, events_rx) = mpsc::channel(config.event_buffer);
    let (gateway, commands_rx) = ChannelGateway::channel(config.command_buffer);

    // Start scheduler worker in background
    let scheduler = Scheduler::new(
        registry.clone(),
        store.clone(),
        ReconciliationEngine::new(config.refuse_window),
        gateway,
        TaskTemplate::new(config.framework_name.clone(), config.task.clone()),
    );
    let scheduler_worker = SchedulerWorker::new(scheduler, events_rx);
    let scheduler_handle = tokio::spawn({
        let shutdown_rx = shutdown_rx.clone();
        async move {
            scheduler_worker.run(shutdown_rx).await;
        }
    });

    // Create application state
    let state = AppState::new(registry, store, events_tx, commands_rx);

    // Build and run the server
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    // Spawn the server with graceful shutdown
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    // Wait for shutdown signal (Ctrl+C)
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Server exited normally"),
                Ok(Err(e)) => error!(error = %e, "Server error"),
                Err(e) => error!(error = %e, "Server task panicked"),
            }
        }
    }

    // Signal shutdown to the worker
    let _ = shutdown_tx.send(true);

    info!("Waiting for scheduler worker to shut down...");
    let shutdown_timeout = std::time::Duration::from_secs(10);

    if let Err(e) = tokio::time::timeout(shutdown_timeout, scheduler_handle).await {
        warn!(error = %e, "Scheduler worker did not shut down in time");
    }

    info!("Scheduler shutdown complete");
    Ok(())
}
