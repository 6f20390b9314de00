use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::cost::{self, DEFAULT_HOURLY_RATE};
use super::domain::{
    NewWorkOrder, ProgressUpdate, WorkOrder, WorkOrderId, WorkOrderRequest, WorkOrderStatus,
};
use super::repository::RepairRepository;
use crate::workflows::intake::{PotholeStatus, RepositoryError, TrackingCode};

/// Rule violations in the repair workflow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepairError {
    #[error("crew name is required")]
    MissingCrew,
    #[error("pothole status cannot move from {} back to {}", from.label(), to.label())]
    StatusRegression {
        from: PotholeStatus,
        to: PotholeStatus,
    },
    #[error("work order status cannot move from {} back to {}", from.label(), to.label())]
    WorkOrderRegression {
        from: WorkOrderStatus,
        to: WorkOrderStatus,
    },
    #[error("{field} must be a finite, non-negative number (found {value})")]
    InvalidFigure { field: &'static str, value: f64 },
}

#[derive(Debug, thiserror::Error)]
pub enum RepairServiceError {
    #[error(transparent)]
    Repair(#[from] RepairError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct RepairService<S> {
    store: Arc<S>,
    hourly_rate: f64,
}

impl<S> RepairService<S>
where
    S: RepairRepository + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            hourly_rate: DEFAULT_HOURLY_RATE,
        }
    }

    pub fn with_hourly_rate(mut self, hourly_rate: f64) -> Self {
        self.hourly_rate = hourly_rate;
        self
    }

    /// Assign a crew; the pothole moves to `in_progress`.
    pub fn open_work_order(
        &self,
        raw_code: &str,
        request: WorkOrderRequest,
    ) -> Result<WorkOrder, RepairServiceError> {
        let code = TrackingCode::parse(raw_code).ok_or(RepositoryError::NotFound)?;
        let pothole = self
            .store
            .locate_pothole(&code)?
            .ok_or(RepositoryError::NotFound)?;

        let crew = request.crew.trim().to_string();
        if crew.is_empty() {
            return Err(RepairError::MissingCrew.into());
        }

        ensure_forward(pothole.status, PotholeStatus::InProgress)?;

        let order = self.store.insert_work_order(
            NewWorkOrder {
                pothole_id: pothole.id,
                tracking_code: pothole.tracking_code,
                crew,
                notes: request.notes.filter(|notes| !notes.trim().is_empty()),
            },
            PotholeStatus::InProgress,
        )?;

        info!(
            work_order_id = %order.id,
            tracking_code = %order.tracking_code,
            crew = %order.crew,
            "work order opened"
        );
        Ok(order)
    }

    /// Log resources against a work order and recompute its cost. Completing the order marks
    /// the pothole repaired.
    pub fn record_progress(
        &self,
        id: WorkOrderId,
        update: ProgressUpdate,
    ) -> Result<WorkOrder, RepairServiceError> {
        let mut order = self
            .store
            .work_order(id)?
            .ok_or(RepositoryError::NotFound)?;

        if !order.status.can_advance_to(update.status) {
            return Err(RepairError::WorkOrderRegression {
                from: order.status,
                to: update.status,
            }
            .into());
        }

        let breakdown = cost::estimate(&update, self.hourly_rate)?;

        let pothole_status = if update.status == WorkOrderStatus::Completed {
            let current = self
                .store
                .pothole_status(order.pothole_id)?
                .ok_or(RepositoryError::NotFound)?;
            ensure_forward(current, PotholeStatus::Repaired)?;
            Some(PotholeStatus::Repaired)
        } else {
            None
        };

        let now = Utc::now();
        order.hours_applied = update.hours_applied;
        order.people_used = update.people_used;
        order.filler_material_kg = update.filler_material_kg;
        order.material_cost = update.material_cost;
        order.equipment_cost = update.equipment_cost;
        order.labor_cost = breakdown.labor_cost;
        order.total_cost = breakdown.total_cost;
        order.status = update.status;
        if update.notes.is_some() {
            order.notes = update.notes;
        }
        if order.status == WorkOrderStatus::Completed && order.completed_at.is_none() {
            order.completed_at = Some(now);
        }
        order.updated_at = now;

        let saved = self.store.update_work_order(order, pothole_status)?;
        info!(
            work_order_id = %saved.id,
            status = saved.status.label(),
            total_cost = saved.total_cost,
            "work order progress recorded"
        );
        Ok(saved)
    }

    pub fn work_orders(&self, raw_code: &str) -> Result<Vec<WorkOrder>, RepairServiceError> {
        let code = TrackingCode::parse(raw_code).ok_or(RepositoryError::NotFound)?;
        let pothole = self
            .store
            .locate_pothole(&code)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(self.store.work_orders_for_pothole(pothole.id)?)
    }
}

fn ensure_forward(from: PotholeStatus, to: PotholeStatus) -> Result<(), RepairError> {
    if from.can_advance_to(to) {
        Ok(())
    } else {
        Err(RepairError::StatusRegression { from, to })
    }
}
