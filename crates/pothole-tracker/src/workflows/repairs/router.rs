use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};

use super::domain::{ProgressUpdate, WorkOrderId, WorkOrderRequest};
use super::repository::RepairRepository;
use super::service::RepairService;
use crate::error::AppError;

pub fn repair_router<S>(service: Arc<RepairService<S>>) -> Router
where
    S: RepairRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/potholes/:tracking_code/work-orders",
            post(open_handler::<S>).get(list_handler::<S>),
        )
        .route(
            "/api/v1/work-orders/:work_order_id/progress",
            post(progress_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn open_handler<S>(
    State(service): State<Arc<RepairService<S>>>,
    Path(tracking_code): Path<String>,
    axum::Json(request): axum::Json<WorkOrderRequest>,
) -> Response
where
    S: RepairRepository + 'static,
{
    match service.open_work_order(&tracking_code, request) {
        Ok(order) => (StatusCode::CREATED, axum::Json(order)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<RepairService<S>>>,
    Path(tracking_code): Path<String>,
) -> Response
where
    S: RepairRepository + 'static,
{
    match service.work_orders(&tracking_code) {
        Ok(orders) => (StatusCode::OK, axum::Json(orders)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn progress_handler<S>(
    State(service): State<Arc<RepairService<S>>>,
    Path(work_order_id): Path<u64>,
    axum::Json(update): axum::Json<ProgressUpdate>,
) -> Response
where
    S: RepairRepository + 'static,
{
    match service.record_progress(WorkOrderId(work_order_id), update) {
        Ok(order) => (StatusCode::OK, axum::Json(order)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
