//! Onboarding submission endpoint.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use onboard_core::{today, validate_all, FormDraft, FormRecord, Timestamp};
use serde::Serialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct OnboardResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: FormRecord,
    pub timestamp: Timestamp,
}

/// Validate a submitted form against the full schema and accept it.
///
/// Unreadable bodies are rejected with 400, schema failures with 422 and a
/// per-field `errors` map.
async fn submit_onboarding(
    payload: Result<Json<FormDraft>, JsonRejection>,
) -> AppResult<(StatusCode, Json<OnboardResponse>)> {
    let Json(draft) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let record = validate_all(&draft, today()).map_err(|report| {
        tracing::debug!(failed = ?report.failed_fields(), "Rejected onboarding submission");
        AppError::Validation(report)
    })?;

    tracing::info!(
        company = %record.company_name,
        services = record.services.len(),
        budget_usd = record.budget_usd,
        "Onboarding submission received"
    );

    Ok((
        StatusCode::CREATED,
        Json(OnboardResponse {
            success: true,
            message: "Form submitted successfully",
            data: record,
            timestamp: Utc::now(),
        }),
    ))
}

pub fn router() -> Router {
    Router::new().route("/onboard", post(submit_onboarding))
}
