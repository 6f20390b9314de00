use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::intake::{PotholeId, TrackingCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkOrderId(pub u64);

impl fmt::Display for WorkOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
}

impl WorkOrderStatus {
    pub const fn label(self) -> &'static str {
        match self {
            WorkOrderStatus::Planned => "planned",
            WorkOrderStatus::InProgress => "in_progress",
            WorkOrderStatus::Completed => "completed",
        }
    }

    pub fn can_advance_to(self, next: WorkOrderStatus) -> bool {
        next >= self
    }
}

/// Crew assignment against a single pothole, with the resources it consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub pothole_id: PotholeId,
    pub tracking_code: TrackingCode,
    pub crew: String,
    pub status: WorkOrderStatus,
    pub hours_applied: f64,
    pub people_used: u32,
    pub filler_material_kg: f64,
    pub material_cost: f64,
    pub equipment_cost: f64,
    pub labor_cost: f64,
    pub total_cost: f64,
    pub notes: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkOrder {
    pub pothole_id: PotholeId,
    pub tracking_code: TrackingCode,
    pub crew: String,
    pub notes: Option<String>,
}

impl NewWorkOrder {
    pub fn into_work_order(self, id: WorkOrderId, now: DateTime<Utc>) -> WorkOrder {
        WorkOrder {
            id,
            pothole_id: self.pothole_id,
            tracking_code: self.tracking_code,
            crew: self.crew,
            status: WorkOrderStatus::Planned,
            hours_applied: 0.0,
            people_used: 0,
            filler_material_kg: 0.0,
            material_cost: 0.0,
            equipment_cost: 0.0,
            labor_cost: 0.0,
            total_cost: 0.0,
            notes: self.notes,
            started_at: now,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request body for assigning a crew to a pothole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderRequest {
    pub crew: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Resources logged against a work order. Figures replace the previous ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    #[serde(default)]
    pub hours_applied: f64,
    #[serde(default)]
    pub people_used: u32,
    #[serde(default)]
    pub filler_material_kg: f64,
    #[serde(default)]
    pub material_cost: f64,
    #[serde(default)]
    pub equipment_cost: f64,
    #[serde(default = "default_progress_status")]
    pub status: WorkOrderStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_progress_status() -> WorkOrderStatus {
    WorkOrderStatus::InProgress
}
