use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use feed::FetchOpts;
use serde_json::{json, Value};
use tracing::{info, warn};
use tracker::SchedulerHandle;

use crate::headless::{SharedViewport, Viewport};

#[derive(Clone)]
pub struct AppState {
    pub viewport: SharedViewport,
    pub poller: SchedulerHandle,
}

fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message.into() })))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/state", get(get_state))
        .route("/viewport", put(put_viewport))
        .route("/fetch-opts", put(put_fetch_opts))
        .with_state(state)
}

pub async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

pub async fn get_state(State(state): State<AppState>) -> Response {
    let viewport = *state.viewport.read();
    Json(json!({
        "view": state.poller.snapshot(),
        "viewport": viewport,
    }))
    .into_response()
}

pub async fn put_viewport(
    State(state): State<AppState>,
    Json(viewport): Json<Viewport>,
) -> Response {
    if let Err(message) = viewport.validate() {
        return api_error(StatusCode::BAD_REQUEST, message).into_response();
    }
    *state.viewport.write() = viewport;
    info!(
        lat = viewport.center_lat,
        lon = viewport.center_lon,
        zoom = viewport.zoom,
        "viewport moved"
    );
    Json(viewport).into_response()
}

/// New options apply from the next tick; the current fetch is not restarted.
pub async fn put_fetch_opts(
    State(state): State<AppState>,
    Json(fetch_opts): Json<FetchOpts>,
) -> Response {
    if !state.poller.set_fetch_opts(fetch_opts.clone()) {
        warn!("fetch options rejected, poller has stopped");
        return api_error(StatusCode::SERVICE_UNAVAILABLE, "poller is not running")
            .into_response();
    }
    (StatusCode::ACCEPTED, Json(fetch_opts)).into_response()
}
