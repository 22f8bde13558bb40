use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::scrape::{ScrapeRequest, ScrapeResponse};
use crate::services::auth::TeamContext;
use crate::services::orchestrator::ScrapeOutcome;

/// POST /v1/scrape — fetch content for a URL, synchronously.
///
/// The request is schema-validated and the team authenticated before the
/// orchestrator runs; each terminal orchestration outcome maps to exactly
/// one response shape.
pub async fn scrape(
    State(state): State<AppState>,
    team: TeamContext,
    Json(request): Json<ScrapeRequest>,
) -> (StatusCode, Json<ScrapeResponse>) {
    if let Err(report) = request.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ScrapeResponse::error(format!("Invalid request: {report}"))),
        );
    }

    let outcome = state.orchestrator.handle(request, &team.team_id).await;

    match outcome {
        ScrapeOutcome::Completed(data) => (
            StatusCode::OK,
            Json(ScrapeResponse {
                success: true,
                data: Some(data),
                warning: None,
                error: None,
            }),
        ),
        ScrapeOutcome::NoContent => (
            StatusCode::OK,
            Json(ScrapeResponse {
                success: true,
                data: None,
                warning: Some("No page found".to_string()),
                error: None,
            }),
        ),
        ScrapeOutcome::TimedOut => (
            StatusCode::REQUEST_TIMEOUT,
            Json(ScrapeResponse::error("Request timed out")),
        ),
        ScrapeOutcome::WorkerFailed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ScrapeResponse::error("Internal server error")),
        ),
        ScrapeOutcome::BillingRejected { reason } => {
            // The reason stays server-side; callers get the generic message.
            tracing::warn!(
                team_id = %team.team_id,
                reason = reason.as_deref().unwrap_or("unknown"),
                "scrape not billed"
            );
            (
                StatusCode::PAYMENT_REQUIRED,
                Json(ScrapeResponse::error(
                    "Failed to bill team. Insufficient credits or subscription not found.",
                )),
            )
        }
    }
}
