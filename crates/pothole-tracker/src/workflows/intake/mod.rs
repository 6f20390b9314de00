//! Citizen report intake: validation, duplicate resolution against existing potholes,
//! photo de-duplication and the one-time reward credit for genuinely new potholes.
//!
//! A submission runs inside a single `IntakeTransaction`; either every record it produces
//! (pothole, photos, report, ledger credit) becomes visible, or none does.

pub mod domain;
pub mod geo;
pub(crate) mod guard;
pub mod ledger;
pub mod photos;
pub mod priority;
pub mod repository;
pub mod resolver;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Coordinates, LocationType, NewPhoto, NewPothole, NewReport, Photo, PhotoId, PhotoUpload,
    Pothole, PotholeId, PotholeStatus, PriorityTier, Report, ReportId, ReportSubmission,
    ReporterIdentity, Severity, StatusSummary, TrackingCode, UserId,
};
pub use guard::{IntakeGuard, IntakeViolation, ValidatedReport};
pub use ledger::{
    balance_of, grant_reward, record_debit, Debit, LedgerError, NewWalletTransaction,
    RewardGrant, TransactionId, TransactionKind, WalletSummary, WalletTransaction,
};
pub use photos::{PhotoPolicy, PhotoRejection};
pub use repository::{
    IntakeRepository, IntakeTransaction, LedgerReader, LedgerWriter, PotholeLookup,
    RepositoryError,
};
pub use resolver::{DuplicateResolver, MatchKind, Resolution, ResolverConfig};
pub use router::intake_router;
pub use service::{
    DashboardEntry, IntakePolicy, IntakeReceipt, IntakeServiceError, PotholeIntakeService,
    PotholeTrackingView, ReporterDashboard,
};
