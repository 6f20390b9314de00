//! In-process store backing the service binary, the demo and the tests.
//!
//! Committed records live behind a single mutex. An intake transaction stages its writes
//! locally and reads through to the committed state, so nothing it inserts is visible to
//! other readers until `commit`. Ids come from per-entity sequences shared by every
//! transaction; ids consumed by a rolled-back transaction are not reused.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::debug;

use super::intake::{
    balance_of, record_debit, Debit, IntakeRepository, IntakeTransaction, LedgerError,
    LedgerReader, LedgerWriter, NewPhoto, NewPothole, NewReport, NewWalletTransaction, Photo,
    PhotoId, Pothole, PotholeId, PotholeLookup, PotholeStatus, Report, ReportId,
    RepositoryError, StatusSummary, TrackingCode, TransactionId, TransactionKind, UserId,
    WalletTransaction,
};
use super::repairs::{NewWorkOrder, RepairRepository, WorkOrder, WorkOrderId};

#[derive(Debug, Default)]
struct StoreState {
    /// Commit order, oldest first.
    potholes: Vec<Pothole>,
    reports: Vec<Report>,
    photos: Vec<Photo>,
    transactions: Vec<WalletTransaction>,
    work_orders: Vec<WorkOrder>,
}

impl StoreState {
    fn pothole_mut(&mut self, id: PotholeId) -> Result<&mut Pothole, RepositoryError> {
        self.potholes
            .iter_mut()
            .find(|pothole| pothole.id == id)
            .ok_or(RepositoryError::NotFound)
    }

    fn advance_pothole(
        &mut self,
        id: PotholeId,
        status: PotholeStatus,
    ) -> Result<(), RepositoryError> {
        let pothole = self.pothole_mut(id)?;
        pothole.status = status;
        pothole.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Sequences {
    potholes: AtomicU64,
    reports: AtomicU64,
    photos: AtomicU64,
    transactions: AtomicU64,
    work_orders: AtomicU64,
}

fn next(sequence: &AtomicU64) -> u64 {
    sequence.fetch_add(1, Ordering::Relaxed) + 1
}

/// Newest `created_at` first; ids break ties since they are handed out in insert order.
fn newest_first<'a>(potholes: impl Iterator<Item = &'a Pothole>, limit: usize) -> Vec<Pothole> {
    let mut ordered: Vec<&Pothole> = potholes.collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    ordered.into_iter().take(limit).cloned().collect()
}

fn lock(state: &Mutex<StoreState>) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
    state
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
}

/// Shared handle; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    sequences: Arc<Sequences>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pothole_count(&self) -> Result<usize, RepositoryError> {
        Ok(lock(&self.state)?.potholes.len())
    }

    pub fn report_count(&self) -> Result<usize, RepositoryError> {
        Ok(lock(&self.state)?.reports.len())
    }

    pub fn photo_count(&self) -> Result<usize, RepositoryError> {
        Ok(lock(&self.state)?.photos.len())
    }

    pub fn ledger_entries(&self) -> Result<Vec<WalletTransaction>, RepositoryError> {
        Ok(lock(&self.state)?.transactions.clone())
    }

    /// Records a payout against a wallet in its own transaction.
    pub fn debit(
        &self,
        user: UserId,
        amount: f64,
        description: impl Into<String>,
    ) -> Result<WalletTransaction, LedgerError> {
        let mut tx = self.begin()?;
        let entry = record_debit(
            &mut tx,
            Debit {
                user_id: user,
                amount,
                description: description.into(),
            },
        )?;
        tx.commit()?;
        Ok(entry)
    }
}

impl PotholeLookup for MemoryStore {
    fn find_by_normalized_address(&self, key: &str) -> Result<Option<Pothole>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state
            .potholes
            .iter()
            .find(|pothole| pothole.normalized_address == key)
            .cloned())
    }

    fn recent_potholes(&self, limit: usize) -> Result<Vec<Pothole>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(newest_first(state.potholes.iter(), limit))
    }
}

impl LedgerReader for MemoryStore {
    fn transactions_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<WalletTransaction>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|entry| entry.user_id == user)
            .cloned()
            .collect())
    }
}

impl IntakeRepository for MemoryStore {
    type Transaction = MemoryTransaction;

    fn begin(&self) -> Result<Self::Transaction, RepositoryError> {
        Ok(MemoryTransaction {
            state: Arc::clone(&self.state),
            sequences: Arc::clone(&self.sequences),
            staged: Staged::default(),
        })
    }

    fn pothole_by_tracking_code(
        &self,
        code: &TrackingCode,
    ) -> Result<Option<Pothole>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state
            .potholes
            .iter()
            .find(|pothole| &pothole.tracking_code == code)
            .cloned())
    }

    fn pothole(&self, id: PotholeId) -> Result<Option<Pothole>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state.potholes.iter().find(|pothole| pothole.id == id).cloned())
    }

    fn reports_for_pothole(&self, pothole: PotholeId) -> Result<Vec<Report>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state
            .reports
            .iter()
            .filter(|report| report.pothole_id == pothole)
            .cloned()
            .collect())
    }

    fn photos_for_pothole(&self, pothole: PotholeId) -> Result<Vec<Photo>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state
            .photos
            .iter()
            .filter(|photo| photo.pothole_id == pothole)
            .cloned()
            .collect())
    }

    fn reports_by_reporter(&self, reporter: UserId) -> Result<Vec<Report>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state
            .reports
            .iter()
            .rev()
            .filter(|report| report.reporter_id == reporter)
            .cloned()
            .collect())
    }

    fn status_summary(&self) -> Result<StatusSummary, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(StatusSummary::tally(
            state.potholes.iter().map(|pothole| &pothole.status),
        ))
    }
}

impl RepairRepository for MemoryStore {
    fn locate_pothole(&self, code: &TrackingCode) -> Result<Option<Pothole>, RepositoryError> {
        self.pothole_by_tracking_code(code)
    }

    fn pothole_status(&self, pothole: PotholeId) -> Result<Option<PotholeStatus>, RepositoryError> {
        Ok(self.pothole(pothole)?.map(|pothole| pothole.status))
    }

    fn work_order(&self, id: WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state.work_orders.iter().find(|order| order.id == id).cloned())
    }

    fn work_orders_for_pothole(
        &self,
        pothole: PotholeId,
    ) -> Result<Vec<WorkOrder>, RepositoryError> {
        let state = lock(&self.state)?;
        let mut orders: Vec<WorkOrder> = state
            .work_orders
            .iter()
            .filter(|order| order.pothole_id == pothole)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    fn insert_work_order(
        &self,
        order: NewWorkOrder,
        pothole_status: PotholeStatus,
    ) -> Result<WorkOrder, RepositoryError> {
        let mut state = lock(&self.state)?;
        state.advance_pothole(order.pothole_id, pothole_status)?;
        let stored = order.into_work_order(
            WorkOrderId(next(&self.sequences.work_orders)),
            Utc::now(),
        );
        state.work_orders.push(stored.clone());
        Ok(stored)
    }

    fn update_work_order(
        &self,
        order: WorkOrder,
        pothole_status: Option<PotholeStatus>,
    ) -> Result<WorkOrder, RepositoryError> {
        let mut state = lock(&self.state)?;
        let index = state
            .work_orders
            .iter()
            .position(|existing| existing.id == order.id)
            .ok_or(RepositoryError::NotFound)?;
        if let Some(status) = pothole_status {
            state.advance_pothole(order.pothole_id, status)?;
        }
        state.work_orders[index] = order.clone();
        Ok(order)
    }
}

#[derive(Debug, Default)]
struct Staged {
    potholes: Vec<Pothole>,
    reports: Vec<Report>,
    photos: Vec<Photo>,
    transactions: Vec<WalletTransaction>,
    /// Already-committed reports whose reward flag flips on commit.
    rewarded: Vec<ReportId>,
}

/// Unit of work over a `MemoryStore`. Dropping it discards the staged writes.
#[derive(Debug)]
pub struct MemoryTransaction {
    state: Arc<Mutex<StoreState>>,
    sequences: Arc<Sequences>,
    staged: Staged,
}

impl PotholeLookup for MemoryTransaction {
    fn find_by_normalized_address(&self, key: &str) -> Result<Option<Pothole>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state
            .potholes
            .iter()
            .chain(self.staged.potholes.iter())
            .find(|pothole| pothole.normalized_address == key)
            .cloned())
    }

    fn recent_potholes(&self, limit: usize) -> Result<Vec<Pothole>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(newest_first(
            state.potholes.iter().chain(self.staged.potholes.iter()),
            limit,
        ))
    }
}

impl LedgerReader for MemoryTransaction {
    fn transactions_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<WalletTransaction>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(self
            .staged
            .transactions
            .iter()
            .rev()
            .chain(state.transactions.iter().rev())
            .filter(|entry| entry.user_id == user)
            .cloned()
            .collect())
    }
}

impl LedgerWriter for MemoryTransaction {
    fn credit_for_report(
        &self,
        report: ReportId,
    ) -> Result<Option<WalletTransaction>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state
            .transactions
            .iter()
            .chain(self.staged.transactions.iter())
            .find(|entry| entry.kind == TransactionKind::Credit && entry.report_id == Some(report))
            .cloned())
    }

    fn append_transaction(
        &mut self,
        entry: NewWalletTransaction,
    ) -> Result<WalletTransaction, RepositoryError> {
        let stored = entry.into_transaction(
            TransactionId(next(&self.sequences.transactions)),
            Utc::now(),
        );
        self.staged.transactions.push(stored.clone());
        Ok(stored)
    }
}

impl IntakeTransaction for MemoryTransaction {
    fn insert_pothole(&mut self, pothole: NewPothole) -> Result<Pothole, RepositoryError> {
        let stored = pothole.into_pothole(PotholeId(next(&self.sequences.potholes)), Utc::now());
        self.staged.potholes.push(stored.clone());
        Ok(stored)
    }

    fn photo_exists(
        &self,
        pothole: PotholeId,
        reporter: UserId,
        content_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state
            .photos
            .iter()
            .chain(self.staged.photos.iter())
            .any(|photo| {
                photo.pothole_id == pothole
                    && photo.reporter_id == reporter
                    && photo.content_hash == content_hash
            }))
    }

    fn insert_photo(&mut self, photo: NewPhoto) -> Result<Photo, RepositoryError> {
        let stored = photo.into_photo(PhotoId(next(&self.sequences.photos)), Utc::now());
        self.staged.photos.push(stored.clone());
        Ok(stored)
    }

    fn insert_report(&mut self, report: NewReport) -> Result<Report, RepositoryError> {
        let stored = report.into_report(ReportId(next(&self.sequences.reports)), Utc::now());
        self.staged.reports.push(stored.clone());
        Ok(stored)
    }

    fn mark_reward_granted(&mut self, report: ReportId) -> Result<Report, RepositoryError> {
        if let Some(staged) = self
            .staged
            .reports
            .iter_mut()
            .find(|candidate| candidate.id == report)
        {
            staged.reward_granted = true;
            return Ok(staged.clone());
        }

        let state = lock(&self.state)?;
        let mut committed = state
            .reports
            .iter()
            .find(|candidate| candidate.id == report)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        drop(state);

        committed.reward_granted = true;
        if !self.staged.rewarded.contains(&report) {
            self.staged.rewarded.push(report);
        }
        Ok(committed)
    }

    fn commit(self) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state)?;
        let Staged {
            potholes,
            mut reports,
            mut photos,
            transactions,
            rewarded,
        } = self.staged;

        let taken: HashSet<&TrackingCode> =
            state.potholes.iter().map(|pothole| &pothole.tracking_code).collect();
        if let Some(clash) = potholes
            .iter()
            .find(|pothole| taken.contains(&pothole.tracking_code))
        {
            return Err(RepositoryError::Conflict(format!(
                "tracking code {}",
                clash.tracking_code
            )));
        }
        drop(taken);

        let overdrawn = transactions
            .iter()
            .filter(|entry| entry.kind == TransactionKind::Debit)
            .map(|entry| entry.user_id)
            .find(|user| {
                let owned = |entry: &&WalletTransaction| entry.user_id == *user;
                let committed = balance_of(state.transactions.iter().filter(owned));
                let staged = balance_of(transactions.iter().filter(owned));
                committed + staged < 0.0
            });
        if let Some(user) = overdrawn {
            return Err(RepositoryError::Conflict(format!(
                "wallet of user {user} would be overdrawn"
            )));
        }

        // Another transaction may have stored the same photo since `photo_exists` ran.
        let staged_photos = photos.len();
        photos.retain(|photo| {
            let stored = state.photos.iter().any(|existing| {
                existing.pothole_id == photo.pothole_id
                    && existing.reporter_id == photo.reporter_id
                    && existing.content_hash == photo.content_hash
            });
            if stored {
                let submitted_with = |report: &&mut Report| {
                    report.pothole_id == photo.pothole_id && report.reporter_id == photo.reporter_id
                };
                if let Some(report) = reports.iter_mut().find(submitted_with) {
                    report.photo_count = report.photo_count.saturating_sub(1);
                }
            }
            !stored
        });

        for report in state.reports.iter_mut() {
            if rewarded.contains(&report.id) {
                report.reward_granted = true;
            }
        }

        debug!(
            potholes = potholes.len(),
            reports = reports.len(),
            photos = photos.len(),
            duplicate_photos = staged_photos - photos.len(),
            transactions = transactions.len(),
            "intake transaction committed"
        );
        state.potholes.extend(potholes);
        state.reports.extend(reports);
        state.photos.extend(photos);
        state.transactions.extend(transactions);
        Ok(())
    }
}
