//! Crew work orders and the pothole status changes they drive.

pub mod cost;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use cost::{CostBreakdown, DEFAULT_HOURLY_RATE};
pub use domain::{
    NewWorkOrder, ProgressUpdate, WorkOrder, WorkOrderId, WorkOrderRequest, WorkOrderStatus,
};
pub use repository::RepairRepository;
pub use router::repair_router;
pub use service::{RepairError, RepairService, RepairServiceError};
