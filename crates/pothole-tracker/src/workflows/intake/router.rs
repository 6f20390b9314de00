use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::domain::{ReportSubmission, UserId};
use super::repository::IntakeRepository;
use super::service::PotholeIntakeService;
use crate::error::AppError;

/// Router exposing report intake, tracking and wallet endpoints.
pub fn intake_router<S>(service: Arc<PotholeIntakeService<S>>) -> Router
where
    S: IntakeRepository + 'static,
{
    Router::new()
        .route("/api/v1/reports", post(submit_handler::<S>))
        .route("/api/v1/potholes/summary", get(summary_handler::<S>))
        .route("/api/v1/potholes/:tracking_code", get(track_handler::<S>))
        .route("/api/v1/wallets/:user_id", get(wallet_handler::<S>))
        .route(
            "/api/v1/reporters/:user_id/dashboard",
            get(dashboard_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<S>(
    State(service): State<Arc<PotholeIntakeService<S>>>,
    axum::Json(submission): axum::Json<ReportSubmission>,
) -> Response
where
    S: IntakeRepository + 'static,
{
    match service.submit(submission) {
        Ok(receipt) => {
            let status = if receipt.duplicate {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            let payload = json!({
                "message": receipt.message(),
                "receipt": receipt,
            });
            (status, axum::Json(payload)).into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn track_handler<S>(
    State(service): State<Arc<PotholeIntakeService<S>>>,
    Path(tracking_code): Path<String>,
) -> Response
where
    S: IntakeRepository + 'static,
{
    match service.track(&tracking_code) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn summary_handler<S>(
    State(service): State<Arc<PotholeIntakeService<S>>>,
) -> Response
where
    S: IntakeRepository + 'static,
{
    match service.summary() {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn wallet_handler<S>(
    State(service): State<Arc<PotholeIntakeService<S>>>,
    Path(user_id): Path<u64>,
) -> Response
where
    S: IntakeRepository + 'static,
{
    match service.wallet(UserId(user_id)) {
        Ok(wallet) => (StatusCode::OK, axum::Json(wallet)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn dashboard_handler<S>(
    State(service): State<Arc<PotholeIntakeService<S>>>,
    Path(user_id): Path<u64>,
) -> Response
where
    S: IntakeRepository + 'static,
{
    match service.dashboard(UserId(user_id)) {
        Ok(dashboard) => (StatusCode::OK, axum::Json(dashboard)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
