use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use feed::HttpVehicleApi;
use http::Method;
use parking_lot::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracker::{duration_millis, PollConfig, PollScheduler, RenderBridge, ViewStore};

mod headless;
mod routes;

use headless::{HeadlessLoader, HeadlessMap, Viewport};
use routes::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match PollConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("invalid poll configuration: {err}");
            std::process::exit(2);
        }
    };

    let api_url = env::var("TRACKER_API_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8080/api/vehicles".to_string());
    let addr: SocketAddr = match env::var("TRACKER_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:9200".to_string())
        .parse()
    {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid TRACKER_ADDR: {err}");
            std::process::exit(2);
        }
    };

    let viewport = Viewport {
        center_lat: env_var_f64("TRACKER_CENTER_LAT", 60.1699),
        center_lon: env_var_f64("TRACKER_CENTER_LON", 24.9384),
        zoom: env_var_f64("TRACKER_ZOOM", 13.0),
        width_px: env_var_u32("TRACKER_VIEWPORT_WIDTH", 1280),
        height_px: env_var_u32("TRACKER_VIEWPORT_HEIGHT", 800),
    };
    if let Err(message) = viewport.validate() {
        error!("invalid initial viewport: {message}");
        std::process::exit(2);
    }

    let client = match reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            error!("failed to build http client: {err}");
            std::process::exit(1);
        }
    };
    let api = Arc::new(HttpVehicleApi::with_client(api_url, client));

    let shared = Arc::new(RwLock::new(viewport));
    let store = ViewStore::new(RenderBridge::new(
        HeadlessMap::new(shared.clone()),
        HeadlessLoader::default(),
    ));
    info!(
        api = api.url(),
        interval_ms = duration_millis(config.update_interval),
        multipliers = %config.multipliers,
        "starting vehicle poller"
    );
    let (scheduler, poller) = PollScheduler::new(config, api, store);
    let poll_task = tokio::spawn(scheduler.run());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::PUT, Method::OPTIONS]);

    let app = routes::router(AppState {
        viewport: shared,
        poller: poller.clone(),
    })
    .layer(cors)
    .layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            poller.shutdown();
            std::process::exit(1);
        }
    };
    info!("tracker server listening on http://{addr}");
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server error: {err}");
    }

    poller.shutdown();
    match poll_task.await {
        Ok(report) => info!(
            ticks = report.metrics.ticks,
            fetches_started = report.metrics.fetches_started(),
            fetches_ok = report.metrics.fetches_ok,
            fetches_failed = report.metrics.fetches_failed,
            coalesced = report.metrics.coalesced_ticks,
            vehicles = report.state.vehicles.len(),
            "poller stopped"
        ),
        Err(err) => error!("poller task failed: {err}"),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

fn env_var_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
