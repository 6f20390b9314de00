//! Append-only wallet ledger.
//!
//! Balances are never stored; they are folded from the transaction history on demand so
//! any balance can be audited from the entries alone.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ReportId, UserId};
use super::repository::{LedgerReader, LedgerWriter, RepositoryError};

pub const DEFAULT_REWARD_AMOUNT: f64 = 20.0;
pub const DEFAULT_REWARD_DESCRIPTION: &str = "Unique pothole report reward";
pub const RECENT_TRANSACTION_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Credit,
    Debit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub kind: TransactionKind,
    /// Magnitude; the direction lives in `kind`.
    pub amount: f64,
    pub description: String,
    pub report_id: Option<ReportId>,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Credit => self.amount,
            TransactionKind::Debit => -self.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWalletTransaction {
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub amount: f64,
    pub description: String,
    pub report_id: Option<ReportId>,
}

impl NewWalletTransaction {
    pub fn into_transaction(self, id: TransactionId, now: DateTime<Utc>) -> WalletTransaction {
        WalletTransaction {
            id,
            user_id: self.user_id,
            kind: self.kind,
            amount: self.amount,
            description: self.description,
            report_id: self.report_id,
            created_at: now,
        }
    }
}

/// Credit owed to a citizen for the first report of a pothole.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardGrant {
    pub user_id: UserId,
    pub report_id: ReportId,
    pub amount: f64,
    pub description: String,
}

impl RewardGrant {
    pub fn standard(user_id: UserId, report_id: ReportId) -> Self {
        Self {
            user_id,
            report_id,
            amount: DEFAULT_REWARD_AMOUNT,
            description: DEFAULT_REWARD_DESCRIPTION.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("report {0} already has a reward credit")]
    RewardAlreadyGranted(ReportId),
    #[error("ledger amounts must be finite and positive (found {0})")]
    InvalidAmount(f64),
    #[error("debit of {requested:.2} exceeds balance of {balance:.2}")]
    InsufficientBalance { balance: f64, requested: f64 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Appends exactly one credit referencing the report.
///
/// A second grant for the same report is refused even though callers are expected to
/// consult `Report::reward_granted` first.
pub fn grant_reward<W>(writer: &mut W, grant: RewardGrant) -> Result<WalletTransaction, LedgerError>
where
    W: LedgerWriter + ?Sized,
{
    if !grant.amount.is_finite() || grant.amount <= 0.0 {
        return Err(LedgerError::InvalidAmount(grant.amount));
    }

    if writer.credit_for_report(grant.report_id)?.is_some() {
        return Err(LedgerError::RewardAlreadyGranted(grant.report_id));
    }

    let entry = writer.append_transaction(NewWalletTransaction {
        user_id: grant.user_id,
        kind: TransactionKind::Credit,
        amount: grant.amount,
        description: grant.description,
        report_id: Some(grant.report_id),
    })?;

    Ok(entry)
}

/// Payout drawn from a wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct Debit {
    pub user_id: UserId,
    pub amount: f64,
    pub description: String,
}

/// Appends one debit, refusing any amount the wallet cannot cover.
pub fn record_debit<W>(writer: &mut W, debit: Debit) -> Result<WalletTransaction, LedgerError>
where
    W: LedgerWriter + ?Sized,
{
    if !debit.amount.is_finite() || debit.amount <= 0.0 {
        return Err(LedgerError::InvalidAmount(debit.amount));
    }

    let available = balance(&*writer, debit.user_id)?;
    if debit.amount > available {
        return Err(LedgerError::InsufficientBalance {
            balance: available,
            requested: debit.amount,
        });
    }

    let entry = writer.append_transaction(NewWalletTransaction {
        user_id: debit.user_id,
        kind: TransactionKind::Debit,
        amount: debit.amount,
        description: debit.description,
        report_id: None,
    })?;

    Ok(entry)
}

/// Sum of credits minus sum of debits.
pub fn balance_of<'a>(entries: impl IntoIterator<Item = &'a WalletTransaction>) -> f64 {
    entries
        .into_iter()
        .map(WalletTransaction::signed_amount)
        .fold(0.0, |total, amount| total + amount)
}

pub fn balance<R>(reader: &R, user: UserId) -> Result<f64, RepositoryError>
where
    R: LedgerReader + ?Sized,
{
    let entries = reader.transactions_for_user(user)?;
    Ok(balance_of(&entries))
}

/// Balance plus the most recent history for wallet views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletSummary {
    pub user_id: UserId,
    pub balance: f64,
    pub transactions: Vec<WalletTransaction>,
}

impl WalletSummary {
    pub fn load<R>(reader: &R, user: UserId) -> Result<Self, RepositoryError>
    where
        R: LedgerReader + ?Sized,
    {
        let mut entries = reader.transactions_for_user(user)?;
        let balance = balance_of(&entries);
        entries.truncate(RECENT_TRANSACTION_LIMIT);
        Ok(Self {
            user_id: user,
            balance,
            transactions: entries,
        })
    }
}
