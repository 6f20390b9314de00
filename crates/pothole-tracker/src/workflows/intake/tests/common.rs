use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::workflows::intake::domain::{
    Coordinates, LocationType, NewPhoto, NewPothole, NewReport, Photo, PhotoUpload, Pothole,
    PotholeId, Report, ReportId, ReportSubmission, ReporterIdentity, StatusSummary, TrackingCode,
    UserId,
};
use crate::workflows::intake::ledger::{NewWalletTransaction, WalletTransaction};
use crate::workflows::intake::repository::{
    IntakeRepository, IntakeTransaction, LedgerReader, LedgerWriter, PotholeLookup,
    RepositoryError,
};
use crate::workflows::intake::{intake_router, IntakePolicy, PotholeIntakeService};
use crate::workflows::memory::{MemoryStore, MemoryTransaction};

pub(super) const DHAKA: Coordinates = Coordinates::new(23.8103, 90.4125);
const METERS_PER_DEGREE_LAT: f64 = 111_194.926_644_558_7;

pub(super) fn north_of(origin: Coordinates, meters: f64) -> Coordinates {
    Coordinates::new(origin.latitude + meters / METERS_PER_DEGREE_LAT, origin.longitude)
}

pub(super) fn reporter(user: u64) -> ReporterIdentity {
    ReporterIdentity {
        user_id: UserId(user),
        name: format!("Citizen {user}"),
        email: Some(format!("citizen{user}@example.org")),
        phone: None,
    }
}

pub(super) fn submission(user: u64, address: &str) -> ReportSubmission {
    ReportSubmission {
        street_address: address.to_string(),
        severity: 8,
        location: LocationType::Curb,
        latitude: None,
        longitude: None,
        reporter: reporter(user),
        photos: Vec::new(),
    }
}

pub(super) fn located(user: u64, address: &str, position: Coordinates) -> ReportSubmission {
    let mut submission = submission(user, address);
    submission.latitude = Some(position.latitude);
    submission.longitude = Some(position.longitude);
    submission
}

pub(super) fn photo(name: &str, content: &[u8]) -> PhotoUpload {
    PhotoUpload {
        filename: name.to_string(),
        content: content.to_vec(),
    }
}

pub(super) fn build_service() -> (PotholeIntakeService<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = PotholeIntakeService::new(store.clone(), IntakePolicy::default());
    (service, store)
}

pub(super) fn router_with_service<S>(service: PotholeIntakeService<S>) -> axum::Router
where
    S: IntakeRepository + 'static,
{
    intake_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Step at which `FailingStore` refuses to continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FailPoint {
    Begin,
    Resolve,
    InsertPothole,
    InsertPhoto,
    InsertReport,
    AppendCredit,
    MarkReward,
    Commit,
}

/// Memory store that reports itself unavailable at one chosen step.
pub(super) struct FailingStore {
    pub(super) inner: MemoryStore,
    fail_at: FailPoint,
}

impl FailingStore {
    pub(super) fn new(inner: MemoryStore, fail_at: FailPoint) -> Self {
        Self { inner, fail_at }
    }
}

fn outage() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

impl PotholeLookup for FailingStore {
    fn find_by_normalized_address(&self, key: &str) -> Result<Option<Pothole>, RepositoryError> {
        self.inner.find_by_normalized_address(key)
    }

    fn recent_potholes(&self, limit: usize) -> Result<Vec<Pothole>, RepositoryError> {
        self.inner.recent_potholes(limit)
    }
}

impl LedgerReader for FailingStore {
    fn transactions_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<WalletTransaction>, RepositoryError> {
        self.inner.transactions_for_user(user)
    }
}

impl IntakeRepository for FailingStore {
    type Transaction = FailingTransaction;

    fn begin(&self) -> Result<Self::Transaction, RepositoryError> {
        if self.fail_at == FailPoint::Begin {
            return Err(outage());
        }
        Ok(FailingTransaction {
            inner: self.inner.begin()?,
            fail_at: self.fail_at,
        })
    }

    fn pothole_by_tracking_code(
        &self,
        code: &TrackingCode,
    ) -> Result<Option<Pothole>, RepositoryError> {
        self.inner.pothole_by_tracking_code(code)
    }

    fn pothole(&self, id: PotholeId) -> Result<Option<Pothole>, RepositoryError> {
        self.inner.pothole(id)
    }

    fn reports_for_pothole(&self, pothole: PotholeId) -> Result<Vec<Report>, RepositoryError> {
        self.inner.reports_for_pothole(pothole)
    }

    fn photos_for_pothole(&self, pothole: PotholeId) -> Result<Vec<Photo>, RepositoryError> {
        self.inner.photos_for_pothole(pothole)
    }

    fn reports_by_reporter(&self, reporter: UserId) -> Result<Vec<Report>, RepositoryError> {
        self.inner.reports_by_reporter(reporter)
    }

    fn status_summary(&self) -> Result<StatusSummary, RepositoryError> {
        self.inner.status_summary()
    }
}

pub(super) struct FailingTransaction {
    inner: MemoryTransaction,
    fail_at: FailPoint,
}

impl FailingTransaction {
    fn check(&self, step: FailPoint) -> Result<(), RepositoryError> {
        if self.fail_at == step {
            Err(outage())
        } else {
            Ok(())
        }
    }
}

impl PotholeLookup for FailingTransaction {
    fn find_by_normalized_address(&self, key: &str) -> Result<Option<Pothole>, RepositoryError> {
        self.check(FailPoint::Resolve)?;
        self.inner.find_by_normalized_address(key)
    }

    fn recent_potholes(&self, limit: usize) -> Result<Vec<Pothole>, RepositoryError> {
        self.check(FailPoint::Resolve)?;
        self.inner.recent_potholes(limit)
    }
}

impl LedgerReader for FailingTransaction {
    fn transactions_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<WalletTransaction>, RepositoryError> {
        self.inner.transactions_for_user(user)
    }
}

impl LedgerWriter for FailingTransaction {
    fn credit_for_report(
        &self,
        report: ReportId,
    ) -> Result<Option<WalletTransaction>, RepositoryError> {
        self.inner.credit_for_report(report)
    }

    fn append_transaction(
        &mut self,
        entry: NewWalletTransaction,
    ) -> Result<WalletTransaction, RepositoryError> {
        self.check(FailPoint::AppendCredit)?;
        self.inner.append_transaction(entry)
    }
}

impl IntakeTransaction for FailingTransaction {
    fn insert_pothole(&mut self, pothole: NewPothole) -> Result<Pothole, RepositoryError> {
        self.check(FailPoint::InsertPothole)?;
        self.inner.insert_pothole(pothole)
    }

    fn photo_exists(
        &self,
        pothole: PotholeId,
        reporter: UserId,
        content_hash: &str,
    ) -> Result<bool, RepositoryError> {
        self.inner.photo_exists(pothole, reporter, content_hash)
    }

    fn insert_photo(&mut self, photo: NewPhoto) -> Result<Photo, RepositoryError> {
        self.check(FailPoint::InsertPhoto)?;
        self.inner.insert_photo(photo)
    }

    fn insert_report(&mut self, report: NewReport) -> Result<Report, RepositoryError> {
        self.check(FailPoint::InsertReport)?;
        self.inner.insert_report(report)
    }

    fn mark_reward_granted(&mut self, report: ReportId) -> Result<Report, RepositoryError> {
        self.check(FailPoint::MarkReward)?;
        self.inner.mark_reward_granted(report)
    }

    fn commit(self) -> Result<(), RepositoryError> {
        self.check(FailPoint::Commit)?;
        self.inner.commit()
    }
}
