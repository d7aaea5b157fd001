//! Trend Aggregator: binary entrypoint.
//! Boots the Axum HTTP server: config, collaborator, pipeline, routes, metrics
//! and the optional periodic refresh.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trend_aggregator::{
    api::{create_router, AppState},
    build_service,
    config::AppConfig,
    ingest::scheduler::{spawn_scheduler, SchedulerCfg},
    metrics::Metrics,
};

/// Install the tracing subscriber. `TRENDS_LOG_JSON=1` switches to JSON lines.
/// A subscriber installed earlier by the runtime wins; this is then a no-op.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trend_aggregator=info,warn"));

    let json = std::env::var("TRENDS_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default()?;
    let metrics = Metrics::init()?;
    let service = build_service(&cfg).await?;

    // Startup probe runs in the background; it only logs.
    let llm = service.llm;
    tokio::spawn(async move {
        llm.quick_probe().await;
    });

    if cfg.schedule.enabled {
        spawn_scheduler(
            SchedulerCfg {
                interval_secs: cfg.schedule.interval_secs,
            },
            service.pipeline.clone(),
        );
        tracing::info!(interval_secs = cfg.schedule.interval_secs, "scheduler started");
    }

    let state = service
        .regions
        .into_iter()
        .fold(AppState::new(service.pipeline), AppState::with_region);
    let router = create_router(state).merge(metrics.router());
    Ok(router.into())
}
