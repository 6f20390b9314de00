use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    Coordinates, LocationType, NewPothole, NewReport, Photo, Pothole, PotholeId, PotholeStatus,
    PriorityTier, Report, ReportId, ReportSubmission, Severity, StatusSummary, TrackingCode,
    UserId,
};
use super::guard::{IntakeGuard, IntakeViolation, ValidatedReport};
use super::ledger::{
    self, LedgerError, RewardGrant, WalletSummary, WalletTransaction, DEFAULT_REWARD_AMOUNT,
    DEFAULT_REWARD_DESCRIPTION,
};
use super::photos::{PhotoPolicy, PhotoRejection};
use super::priority;
use super::repository::{IntakeRepository, IntakeTransaction, RepositoryError};
use super::resolver::{DuplicateResolver, MatchKind, Resolution, ResolverConfig};
use crate::config::IntakeConfig;

/// Tunables applied to every submission.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakePolicy {
    pub reward_amount: f64,
    pub reward_description: String,
    pub resolver: ResolverConfig,
    pub photos: PhotoPolicy,
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self {
            reward_amount: DEFAULT_REWARD_AMOUNT,
            reward_description: DEFAULT_REWARD_DESCRIPTION.to_string(),
            resolver: ResolverConfig::default(),
            photos: PhotoPolicy::default(),
        }
    }
}

impl From<&IntakeConfig> for IntakePolicy {
    fn from(config: &IntakeConfig) -> Self {
        Self {
            reward_amount: config.reward_amount,
            reward_description: DEFAULT_REWARD_DESCRIPTION.to_string(),
            resolver: ResolverConfig {
                candidate_window: config.duplicate_window,
                threshold_meters: config.duplicate_radius_meters,
            },
            photos: PhotoPolicy::new(config.photo_extensions.iter().cloned(), config.max_photo_bytes),
        }
    }
}

/// Pipeline stages, used as the `stage` field of debug events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    Received,
    Normalized,
    Resolved,
    Persisted,
    Rewarded,
    Skipped,
    Acknowledged,
}

impl IntakeStage {
    pub const fn label(self) -> &'static str {
        match self {
            IntakeStage::Received => "received",
            IntakeStage::Normalized => "normalized",
            IntakeStage::Resolved => "resolved",
            IntakeStage::Persisted => "persisted",
            IntakeStage::Rewarded => "rewarded",
            IntakeStage::Skipped => "skipped",
            IntakeStage::Acknowledged => "acknowledged",
        }
    }
}

/// What the caller learns about an accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntakeReceipt {
    pub tracking_code: TrackingCode,
    pub pothole_id: PotholeId,
    pub report_id: ReportId,
    pub duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<MatchKind>,
    pub priority: PriorityTier,
    pub status: PotholeStatus,
    pub photos_accepted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_granted: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PhotoRejection>,
}

impl IntakeReceipt {
    pub fn message(&self) -> String {
        match self.reward_granted {
            Some(amount) => format!(
                "Report submitted. +{amount:.2} credited. Tracking ID: {}",
                self.tracking_code
            ),
            None => format!(
                "This pothole was already reported. Tracking ID: {}",
                self.tracking_code
            ),
        }
    }
}

/// Public view of a pothole looked up by tracking code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PotholeTrackingView {
    pub tracking_code: TrackingCode,
    pub street_address: String,
    pub status: PotholeStatus,
    pub priority: PriorityTier,
    pub severity: Severity,
    pub location: LocationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    pub reported_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub report_count: usize,
    pub photo_count: usize,
}

/// One of a reporter's submissions joined with the pothole it landed on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardEntry {
    pub report: Report,
    pub tracking_code: TrackingCode,
    pub street_address: String,
    pub status: PotholeStatus,
    pub photos: Vec<Photo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReporterDashboard {
    pub user_id: UserId,
    pub balance: f64,
    pub stats: StatusSummary,
    pub entries: Vec<DashboardEntry>,
    pub transactions: Vec<WalletTransaction>,
}

/// Service composing validation, duplicate resolution, persistence and the reward ledger.
pub struct PotholeIntakeService<S> {
    store: Arc<S>,
    guard: IntakeGuard,
    resolver: DuplicateResolver,
    policy: IntakePolicy,
}

impl<S> PotholeIntakeService<S>
where
    S: IntakeRepository + 'static,
{
    pub fn new(store: Arc<S>, policy: IntakePolicy) -> Self {
        Self {
            store,
            guard: IntakeGuard,
            resolver: DuplicateResolver::new(policy.resolver),
            policy,
        }
    }

    pub fn policy(&self) -> &IntakePolicy {
        &self.policy
    }

    /// Accept a citizen report as one all-or-nothing unit of work.
    pub fn submit(
        &self,
        submission: ReportSubmission,
    ) -> Result<IntakeReceipt, IntakeServiceError> {
        let reporter_id = submission.reporter.user_id;
        debug!(stage = IntakeStage::Received.label(), %reporter_id);

        let report = self.guard.validate(submission)?;
        debug!(
            stage = IntakeStage::Normalized.label(),
            normalized_address = %report.normalized_address
        );

        let mut tx = self.store.begin()?;
        let receipt = match self.process(&mut tx, report) {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(%reporter_id, error = %err, "report intake rolled back");
                return Err(err);
            }
        };

        if let Err(err) = tx.commit() {
            warn!(%reporter_id, error = %err, "report intake commit failed");
            return Err(err.into());
        }

        debug!(stage = IntakeStage::Acknowledged.label(), tracking_code = %receipt.tracking_code);
        info!(
            tracking_code = %receipt.tracking_code,
            duplicate = receipt.duplicate,
            photos_accepted = receipt.photos_accepted,
            reward = receipt.reward_granted.unwrap_or(0.0),
            "pothole report accepted"
        );
        Ok(receipt)
    }

    fn process(
        &self,
        tx: &mut S::Transaction,
        report: ValidatedReport,
    ) -> Result<IntakeReceipt, IntakeServiceError> {
        let ValidatedReport {
            street_address,
            normalized_address,
            severity,
            location,
            coordinates,
            reporter,
            photos,
        } = report;
        let reporter_id = reporter.user_id;

        let resolution = self
            .resolver
            .resolve(&*tx, &normalized_address, coordinates)?;
        let (pothole, matched_by) = match resolution {
            Resolution::Existing {
                pothole,
                matched_by,
            } => (pothole, Some(matched_by)),
            Resolution::Novel => {
                let candidate = NewPothole::new(
                    TrackingCode::generate(),
                    street_address,
                    coordinates,
                    severity,
                    location,
                    priority::classify(severity),
                )
                .with_reporter(reporter);
                (tx.insert_pothole(candidate)?, None)
            }
        };
        let duplicate = matched_by.is_some();
        debug!(
            stage = IntakeStage::Resolved.label(),
            duplicate,
            tracking_code = %pothole.tracking_code
        );

        let mut warnings = Vec::new();
        let mut photos_accepted = 0;
        for upload in &photos {
            let inspected = match self.policy.photos.inspect(upload) {
                Ok(inspected) => inspected,
                Err(rejection) => {
                    warn!(tracking_code = %pothole.tracking_code, %rejection, "photo skipped");
                    warnings.push(rejection);
                    continue;
                }
            };

            if tx.photo_exists(pothole.id, reporter_id, &inspected.content_hash)? {
                debug!(
                    content_hash = %inspected.content_hash,
                    "duplicate photo discarded"
                );
                continue;
            }

            tx.insert_photo(inspected.attach(pothole.id, reporter_id))?;
            photos_accepted += 1;
        }

        let stored = tx.insert_report(NewReport {
            pothole_id: pothole.id,
            reporter_id,
            is_duplicate: duplicate,
            photo_count: photos_accepted,
        })?;
        debug!(stage = IntakeStage::Persisted.label(), report_id = %stored.id);

        let reward_granted = if duplicate {
            debug!(stage = IntakeStage::Skipped.label(), report_id = %stored.id);
            None
        } else {
            let entry = ledger::grant_reward(
                tx,
                RewardGrant {
                    user_id: reporter_id,
                    report_id: stored.id,
                    amount: self.policy.reward_amount,
                    description: self.policy.reward_description.clone(),
                },
            )?;
            tx.mark_reward_granted(stored.id)?;
            debug!(stage = IntakeStage::Rewarded.label(), report_id = %stored.id);
            Some(entry.amount)
        };

        Ok(IntakeReceipt {
            tracking_code: pothole.tracking_code,
            pothole_id: pothole.id,
            report_id: stored.id,
            duplicate,
            matched_by,
            priority: pothole.priority,
            status: pothole.status,
            photos_accepted,
            reward_granted,
            warnings,
        })
    }

    /// Look up a pothole by the code printed on the citizen's receipt.
    pub fn track(&self, raw_code: &str) -> Result<PotholeTrackingView, IntakeServiceError> {
        let code = TrackingCode::parse(raw_code).ok_or(RepositoryError::NotFound)?;
        let pothole = self
            .store
            .pothole_by_tracking_code(&code)?
            .ok_or(RepositoryError::NotFound)?;
        let report_count = self.store.reports_for_pothole(pothole.id)?.len();
        let photo_count = self.store.photos_for_pothole(pothole.id)?.len();
        Ok(tracking_view(pothole, report_count, photo_count))
    }

    pub fn summary(&self) -> Result<StatusSummary, IntakeServiceError> {
        Ok(self.store.status_summary()?)
    }

    pub fn balance(&self, user: UserId) -> Result<f64, IntakeServiceError> {
        Ok(ledger::balance(self.store.as_ref(), user)?)
    }

    pub fn wallet(&self, user: UserId) -> Result<WalletSummary, IntakeServiceError> {
        Ok(WalletSummary::load(self.store.as_ref(), user)?)
    }

    /// Reports, their potholes' progress and wallet state for one citizen.
    pub fn dashboard(&self, user: UserId) -> Result<ReporterDashboard, IntakeServiceError> {
        let mut entries = Vec::new();
        for report in self.store.reports_by_reporter(user)? {
            let Some(pothole) = self.store.pothole(report.pothole_id)? else {
                continue;
            };
            let mut photos: Vec<Photo> = self
                .store
                .photos_for_pothole(pothole.id)?
                .into_iter()
                .filter(|photo| photo.reporter_id == user)
                .collect();
            photos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            entries.push(DashboardEntry {
                report,
                tracking_code: pothole.tracking_code,
                street_address: pothole.street_address,
                status: pothole.status,
                photos,
            });
        }

        let stats = StatusSummary::tally(entries.iter().map(|entry| &entry.status));
        let wallet = WalletSummary::load(self.store.as_ref(), user)?;

        Ok(ReporterDashboard {
            user_id: user,
            balance: wallet.balance,
            stats,
            entries,
            transactions: wallet.transactions,
        })
    }
}

fn tracking_view(pothole: Pothole, report_count: usize, photo_count: usize) -> PotholeTrackingView {
    PotholeTrackingView {
        tracking_code: pothole.tracking_code,
        street_address: pothole.street_address,
        status: pothole.status,
        priority: pothole.priority,
        severity: pothole.severity,
        location: pothole.location,
        coordinates: pothole.coordinates,
        reported_at: pothole.created_at,
        updated_at: pothole.updated_at,
        report_count,
        photo_count,
    }
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error(transparent)]
    Validation(#[from] IntakeViolation),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl IntakeServiceError {
    /// Nothing was committed, so resubmitting the whole report is safe.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IntakeServiceError::Repository(
                RepositoryError::Unavailable(_) | RepositoryError::Conflict(_)
            ) | IntakeServiceError::Ledger(LedgerError::Repository(_))
        )
    }
}
