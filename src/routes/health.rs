use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: ComponentHealth,
    pub queue: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
}

fn component(ok: bool, started: std::time::Instant) -> ComponentHealth {
    ComponentHealth {
        status: if ok { "ok" } else { "error" }.to_string(),
        latency_ms: ok.then(|| started.elapsed().as_millis() as u64),
    }
}

/// GET /health — dependency status for the gateway's collaborators.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_start = std::time::Instant::now();
    let db_ok = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();
    let database = component(db_ok, db_start);

    let queue_start = std::time::Instant::now();
    let queue_ok = state.queue.health_check().await.is_ok();
    let queue = component(queue_ok, queue_start);

    let all_healthy = db_ok && queue_ok;
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks { database, queue },
    };

    (status_code, Json(response))
}
