use super::domain::{NewWorkOrder, WorkOrder, WorkOrderId};
use crate::workflows::intake::{Pothole, PotholeId, PotholeStatus, RepositoryError, TrackingCode};

/// Storage used by the repair workflow.
///
/// Work-order writes carry the pothole status they imply so the store can apply both in one
/// step.
pub trait RepairRepository: Send + Sync {
    fn locate_pothole(&self, code: &TrackingCode) -> Result<Option<Pothole>, RepositoryError>;

    fn pothole_status(&self, pothole: PotholeId) -> Result<Option<PotholeStatus>, RepositoryError>;

    fn work_order(&self, id: WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError>;

    /// Most recently updated first.
    fn work_orders_for_pothole(&self, pothole: PotholeId)
        -> Result<Vec<WorkOrder>, RepositoryError>;

    fn insert_work_order(
        &self,
        order: NewWorkOrder,
        pothole_status: PotholeStatus,
    ) -> Result<WorkOrder, RepositoryError>;

    fn update_work_order(
        &self,
        order: WorkOrder,
        pothole_status: Option<PotholeStatus>,
    ) -> Result<WorkOrder, RepositoryError>;
}
