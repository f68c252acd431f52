pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod services;
pub mod state;

pub use config::Config;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use metrics_exporter_prometheus::PrometheusHandle;
use services::Scheduler;
use state::SharedState;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Init)) {
        if Config::create_default_if_missing()? {
            println!("✓ Config file created. Edit config.toml and run again.");
        } else {
            println!("config.toml already exists, leaving it untouched.");
        }
        return Ok(());
    }

    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config)?;

    match cli.command {
        None | Some(Commands::Serve) => {
            let prometheus_handle = install_metrics_recorder(&config)?;
            run_server(config, prometheus_handle).await
        }
        Some(Commands::DueSummary { json }) => cli::cmd_due_summary(&config, json).await,
        Some(Commands::Seed) => cli::cmd_seed(config).await,
        Some(Commands::Init) => Ok(()),
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = if config.observability.json_logs {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.as_str(), value.as_str())?;
        }
        let (layer, task) = builder
            .extra_field("service", env!("CARGO_PKG_NAME"))?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

fn install_metrics_recorder(config: &Config) -> anyhow::Result<Option<PrometheusHandle>> {
    if !config.observability.metrics_enabled {
        return Ok(None);
    }

    use metrics_exporter_prometheus::PrometheusBuilder;
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics recorder initialized");
    Ok(Some(handle))
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("SmartAsset v{} starting...", env!("CARGO_PKG_VERSION"));

    if config.auth.uses_default_secret() {
        warn!(
            event = "default_jwt_secret",
            "auth.jwt_secret is the built-in default; set JWT_SECRET_KEY so tokens cannot be forged"
        );
    }

    let port = config.server.port;
    let server_enabled = config.server.enabled;
    let scheduler_config = config.scheduler.clone();

    let shared = Arc::new(SharedState::new(config).await?);
    let scheduler = Arc::new(Scheduler::new(
        shared.due_summary.clone(),
        scheduler_config,
    ));

    let scheduler_handle = {
        let sched = Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(e) = sched.start().await {
                error!("Scheduler error: {}", e);
            }
        })
    };

    if server_enabled {
        let api_state = api::create_app_state(shared, prometheus_handle);
        let app = api::router(api_state).await;

        let addr = format!("0.0.0.0:{port}");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        info!("Web server running at http://{addr}. Press Ctrl+C to stop.");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Web server error")?;
    } else {
        info!("Web API disabled; running scheduler only. Press Ctrl+C to stop.");
        shutdown_signal().await;
    }

    scheduler.stop().await;
    scheduler_handle.abort();
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
