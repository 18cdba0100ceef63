use std::net::SocketAddr;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::info;

use yoga_streak::StreakService;
use yoga_streak::config::Config;
use yoga_streak::http_client::ReqwestActivitySource;
use yoga_streak::rate_limit::RateLimiter;
use yoga_streak_server::{AppState, build_router};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Configure logging from env var `YOGA_STREAK_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let log_env = std::env::var("YOGA_STREAK_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(format!("{log_env},hyper=warn"))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hyper=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::info!(%log_env, "yoga_streak_server: log filter");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration; aborting startup");
            std::process::exit(1);
        }
    };

    let metrics = PrometheusBuilder::new().install_recorder()?;

    let source = ReqwestActivitySource::from_config(&config);
    let limiter = Arc::new(RateLimiter::new(config.rate_limit, config.rate_window));
    let _sweeper = limiter.clone().spawn_sweeper(config.rate_window);

    let state = Arc::new(AppState {
        streaks: StreakService::new(Arc::new(source)),
        limiter,
        metrics,
        notify_tolerance_minutes: config.notify_tolerance_minutes,
    });

    let max_body_size = std::env::var("MAX_HTTP_BODY_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1024 * 1024);
    let app = build_router(state).layer(axum::extract::DefaultBodyLimit::max(max_body_size));

    let addr: SocketAddr = std::env::var("ADDRESS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));
    info!(
        %addr,
        api = %config.api_base_url,
        rate_limit = config.rate_limit,
        window_secs = config.rate_window.as_secs(),
        "starting HTTP server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl+c: {e}");
        }
    })
    .await?;

    Ok(())
}
