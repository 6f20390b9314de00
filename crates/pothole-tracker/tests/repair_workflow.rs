//! Repair lifecycle exercised through the public services and HTTP routers.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use pothole_tracker::workflows::intake::{
    IntakePolicy, LocationType, PotholeIntakeService, PotholeStatus, ReportSubmission,
    ReporterIdentity, UserId,
};
use pothole_tracker::workflows::memory::MemoryStore;
use pothole_tracker::workflows::repairs::{
    repair_router, ProgressUpdate, RepairService, WorkOrderRequest, WorkOrderStatus,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn submission(address: &str) -> ReportSubmission {
    ReportSubmission {
        street_address: address.to_string(),
        severity: 3,
        location: LocationType::Edge,
        latitude: None,
        longitude: None,
        reporter: ReporterIdentity {
            user_id: UserId(11),
            name: "Shirin".to_string(),
            email: None,
            phone: None,
        },
        photos: Vec::new(),
    }
}

fn services() -> (
    PotholeIntakeService<MemoryStore>,
    Arc<RepairService<MemoryStore>>,
) {
    let store = Arc::new(MemoryStore::new());
    (
        PotholeIntakeService::new(store.clone(), IntakePolicy::default()),
        Arc::new(RepairService::new(store)),
    )
}

#[test]
fn work_order_lifecycle_drives_pothole_status() {
    let (intake, repairs) = services();
    let receipt = intake
        .submit(submission("18 Lalbagh Road"))
        .expect("reported");

    let order = repairs
        .open_work_order(
            receipt.tracking_code.as_str(),
            WorkOrderRequest {
                crew: "Crew 4".to_string(),
                notes: Some("cold patch".to_string()),
            },
        )
        .expect("opened");
    let view = intake.track(receipt.tracking_code.as_str()).expect("tracked");
    assert_eq!(view.status, PotholeStatus::InProgress);

    repairs
        .record_progress(
            order.id,
            ProgressUpdate {
                hours_applied: 1.5,
                people_used: 0,
                filler_material_kg: 10.0,
                material_cost: 25.0,
                equipment_cost: 0.0,
                status: WorkOrderStatus::Completed,
                notes: None,
            },
        )
        .expect("completed");

    let view = intake.track(receipt.tracking_code.as_str()).expect("tracked");
    assert_eq!(view.status, PotholeStatus::Repaired);

    let summary = intake.summary().expect("summary");
    assert_eq!(summary.repaired, 1);
    assert_eq!(summary.reported, 0);

    let dashboard = intake.dashboard(UserId(11)).expect("dashboard");
    assert_eq!(dashboard.stats.repaired, 1);

    let orders = repairs
        .work_orders(receipt.tracking_code.as_str())
        .expect("orders");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].labor_cost, 45.0);
    assert_eq!(orders[0].total_cost, 70.0);
    assert_eq!(orders[0].notes.as_deref(), Some("cold patch"));
}

#[tokio::test]
async fn router_rejects_regressions_and_bad_figures() {
    let (intake, repairs) = services();
    let receipt = intake
        .submit(submission("3 Hatirpool Lane"))
        .expect("reported");
    let router = repair_router(repairs);

    let post = |uri: String, body: Value| {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    };

    let opened = router
        .clone()
        .oneshot(post(
            format!("/api/v1/potholes/{}/work-orders", receipt.tracking_code),
            json!({ "crew": "Crew 1" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(opened.status(), StatusCode::CREATED);
    let body = axum::body::to_bytes(opened.into_body(), 16 * 1024)
        .await
        .expect("body");
    let order: Value = serde_json::from_slice(&body).expect("json");
    let id = order["id"].as_u64().expect("id");

    let negative = router
        .clone()
        .oneshot(post(
            format!("/api/v1/work-orders/{id}/progress"),
            json!({ "hours_applied": -2.0 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(negative.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let completed = router
        .clone()
        .oneshot(post(
            format!("/api/v1/work-orders/{id}/progress"),
            json!({ "hours_applied": 1.0, "status": "completed" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(completed.status(), StatusCode::OK);

    let backwards = router
        .clone()
        .oneshot(post(
            format!("/api/v1/work-orders/{id}/progress"),
            json!({ "status": "planned" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(backwards.status(), StatusCode::CONFLICT);

    let reopen = router
        .oneshot(post(
            format!("/api/v1/potholes/{}/work-orders", receipt.tracking_code),
            json!({ "crew": "Crew 2" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(reopen.status(), StatusCode::CONFLICT);
}
