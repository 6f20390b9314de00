use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use pothole_tracker::workflows::intake::{intake_router, IntakeRepository, PotholeIntakeService};
use pothole_tracker::workflows::repairs::{repair_router, RepairRepository, RepairService};
use serde_json::json;
use std::sync::Arc;

pub(crate) const SERVICE_NAME: &str = "PHTRS";

pub(crate) fn with_workflow_routes<S>(
    intake: Arc<PotholeIntakeService<S>>,
    repairs: Arc<RepairService<S>>,
) -> axum::Router
where
    S: IntakeRepository + RepairRepository + 'static,
{
    intake_router(intake)
        .merge(repair_router(repairs))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/status", axum::routing::get(service_status))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn service_status() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "service": SERVICE_NAME }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::Workflows;
    use axum::body::Body;
    use axum::http::Request;
    use axum::response::Response;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use pothole_tracker::workflows::intake::IntakePolicy;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let workflows = Workflows::with_policy(IntakePolicy::default());
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_workflow_routes(workflows.intake, workflows.repairs).layer(Extension(state))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn read_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn status_banner_names_the_service() {
        let Json(body) = service_status().await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["service"], "PHTRS");
    }

    #[tokio::test]
    async fn readiness_reflects_startup_flag() {
        let pending = app(false)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(pending.status(), StatusCode::SERVICE_UNAVAILABLE);

        let ready = app(true)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(ready.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn report_then_repair_through_merged_routes() {
        let router = app(true);

        let created = router
            .clone()
            .oneshot(post_json(
                "/api/v1/reports",
                json!({
                    "street_address": "12, Main Street!!",
                    "severity": 8,
                    "reporter": { "user_id": 1, "name": "Rahim" },
                    "photos": [{ "filename": "hole.jpg", "content": [255, 216, 255] }]
                }),
            ))
            .await
            .expect("route executes");
        assert_eq!(created.status(), StatusCode::CREATED);
        let receipt = read_json(created).await;
        let code = receipt["receipt"]["tracking_code"]
            .as_str()
            .expect("tracking code")
            .to_string();
        assert_eq!(receipt["receipt"]["photos_accepted"], 1);

        let opened = router
            .clone()
            .oneshot(post_json(
                &format!("/api/v1/potholes/{code}/work-orders"),
                json!({ "crew": "North crew" }),
            ))
            .await
            .expect("route executes");
        assert_eq!(opened.status(), StatusCode::CREATED);
        let order = read_json(opened).await;
        let order_id = order["id"].as_u64().expect("work order id");

        let completed = router
            .clone()
            .oneshot(post_json(
                &format!("/api/v1/work-orders/{order_id}/progress"),
                json!({
                    "hours_applied": 2.0,
                    "people_used": 3,
                    "material_cost": 40.0,
                    "status": "completed"
                }),
            ))
            .await
            .expect("route executes");
        assert_eq!(completed.status(), StatusCode::OK);
        let order = read_json(completed).await;
        assert_eq!(order["total_cost"], 220.0);

        let tracked = router
            .oneshot(
                Request::get(format!("/api/v1/potholes/{code}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        let view = read_json(tracked).await;
        assert_eq!(view["status"], "repaired");
    }

    #[tokio::test]
    async fn unknown_work_order_is_not_found() {
        let response = app(true)
            .oneshot(post_json(
                "/api/v1/work-orders/404/progress",
                json!({ "status": "in_progress" }),
            ))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
