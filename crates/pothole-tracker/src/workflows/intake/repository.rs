use super::domain::{
    NewPhoto, NewPothole, NewReport, Photo, Pothole, PotholeId, Report, ReportId, StatusSummary,
    TrackingCode, UserId,
};
use super::ledger::{NewWalletTransaction, WalletTransaction};

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Read access the duplicate resolver needs.
pub trait PotholeLookup {
    fn find_by_normalized_address(&self, key: &str) -> Result<Option<Pothole>, RepositoryError>;

    /// Most recently created potholes first, at most `limit` of them.
    fn recent_potholes(&self, limit: usize) -> Result<Vec<Pothole>, RepositoryError>;
}

pub trait LedgerReader {
    /// Newest first.
    fn transactions_for_user(&self, user: UserId)
        -> Result<Vec<WalletTransaction>, RepositoryError>;
}

pub trait LedgerWriter: LedgerReader {
    fn credit_for_report(
        &self,
        report: ReportId,
    ) -> Result<Option<WalletTransaction>, RepositoryError>;

    fn append_transaction(
        &mut self,
        entry: NewWalletTransaction,
    ) -> Result<WalletTransaction, RepositoryError>;
}

/// Unit of work for a single submission.
///
/// Inserts return records with generated ids immediately so dependent records can refer to
/// them; nothing becomes visible to other readers until `commit`. Dropping a transaction
/// without committing discards every staged write.
pub trait IntakeTransaction: PotholeLookup + LedgerWriter {
    fn insert_pothole(&mut self, pothole: NewPothole) -> Result<Pothole, RepositoryError>;

    fn photo_exists(
        &self,
        pothole: PotholeId,
        reporter: UserId,
        content_hash: &str,
    ) -> Result<bool, RepositoryError>;

    fn insert_photo(&mut self, photo: NewPhoto) -> Result<Photo, RepositoryError>;

    fn insert_report(&mut self, report: NewReport) -> Result<Report, RepositoryError>;

    fn mark_reward_granted(&mut self, report: ReportId) -> Result<Report, RepositoryError>;

    fn commit(self) -> Result<(), RepositoryError>;
}

/// Storage abstraction so the intake service can be exercised in isolation.
pub trait IntakeRepository: PotholeLookup + LedgerReader + Send + Sync {
    type Transaction: IntakeTransaction;

    fn begin(&self) -> Result<Self::Transaction, RepositoryError>;

    fn pothole_by_tracking_code(
        &self,
        code: &TrackingCode,
    ) -> Result<Option<Pothole>, RepositoryError>;

    fn pothole(&self, id: PotholeId) -> Result<Option<Pothole>, RepositoryError>;

    fn reports_for_pothole(&self, pothole: PotholeId) -> Result<Vec<Report>, RepositoryError>;

    fn photos_for_pothole(&self, pothole: PotholeId) -> Result<Vec<Photo>, RepositoryError>;

    /// Newest first.
    fn reports_by_reporter(&self, reporter: UserId) -> Result<Vec<Report>, RepositoryError>;

    fn status_summary(&self) -> Result<StatusSummary, RepositoryError>;
}
