use metrics_exporter_prometheus::PrometheusHandle;
use pothole_tracker::config::IntakeConfig;
use pothole_tracker::workflows::intake::{IntakePolicy, PotholeIntakeService};
use pothole_tracker::workflows::memory::MemoryStore;
use pothole_tracker::workflows::repairs::RepairService;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Intake and repair services sharing one store.
pub(crate) struct Workflows {
    pub(crate) intake: Arc<PotholeIntakeService<MemoryStore>>,
    pub(crate) repairs: Arc<RepairService<MemoryStore>>,
}

impl Workflows {
    pub(crate) fn in_memory(config: &IntakeConfig) -> Self {
        Self::with_policy(IntakePolicy::from(config))
    }

    pub(crate) fn with_policy(policy: IntakePolicy) -> Self {
        let store = Arc::new(MemoryStore::new());
        let intake = Arc::new(PotholeIntakeService::new(store.clone(), policy));
        let repairs = Arc::new(RepairService::new(store));
        Self { intake, repairs }
    }
}
