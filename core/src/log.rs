//! Transaction log.
//!
//! An append-only, ordered record of every attempted operation and its
//! outcome. An operation opens a [`PendingTransaction`] with
//! [`TransactionLog::begin`]; the pending value is not part of the log until it
//! is consumed by [`TransactionLog::complete`] or [`TransactionLog::fail`],
//! which append one immutable [`TransactionEntry`]. Entries expose getters
//! only, so history cannot be edited once written.

use crate::environment::Clock;
use crate::error::ReservationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What an entry records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Court registration
    AddCourt,
    /// Booking
    MakeReservation,
    /// Cancellation
    CancelReservation,
    /// Charge
    Payment,
    /// Compensation for a failed multi-step operation
    Rollback,
    /// Report generation (report generator's own audit log)
    Report,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::AddCourt => "add_court",
            Self::MakeReservation => "make_reservation",
            Self::CancelReservation => "cancel_reservation",
            Self::Payment => "payment",
            Self::Rollback => "rollback",
            Self::Report => "report",
        })
    }
}

/// Outcome of a transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Started, outcome not yet known (never appended)
    Pending,
    /// Succeeded
    Completed,
    /// Failed
    Failed,
}

/// A transaction that has started but not been recorded yet
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use = "a pending transaction must be completed or failed"]
pub struct PendingTransaction {
    kind: TransactionKind,
    subject: Option<String>,
}

impl PendingTransaction {
    /// What is being attempted
    pub const fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Always [`TransactionStatus::Pending`]
    pub const fn status(&self) -> TransactionStatus {
        TransactionStatus::Pending
    }
}

/// One immutable log record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEntry {
    sequence: u64,
    kind: TransactionKind,
    status: TransactionStatus,
    subject: Option<String>,
    detail: Option<String>,
    error: Option<String>,
    error_code: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl TransactionEntry {
    /// Position in the log, starting at 1
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Operation type
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Outcome
    #[must_use]
    pub const fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Court or reservation id the operation targeted
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Free-form description of what happened
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Rendered error, for failed entries
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Machine error code, for failed entries caused by a [`ReservationError`]
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    /// When the entry was appended
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// True for completed entries
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}

/// Append-only transaction log
#[derive(Clone)]
pub struct TransactionLog {
    entries: Vec<TransactionEntry>,
    clock: Arc<dyn Clock>,
}

impl TransactionLog {
    /// Creates an empty log stamping entries with `clock`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Vec::new(),
            clock,
        }
    }

    /// Opens a transaction; nothing is appended yet
    pub const fn begin(kind: TransactionKind, subject: Option<String>) -> PendingTransaction {
        PendingTransaction {
            kind,
            subject,
        }
    }

    /// Records a successful transaction
    pub fn complete(
        &mut self,
        pending: PendingTransaction,
        detail: Option<String>,
    ) -> &TransactionEntry {
        self.append(pending, TransactionStatus::Completed, detail, None, None)
    }

    /// Records a failed transaction caused by `error`
    pub fn fail(
        &mut self,
        pending: PendingTransaction,
        error: &ReservationError,
    ) -> &TransactionEntry {
        self.append(
            pending,
            TransactionStatus::Failed,
            None,
            Some(error.to_string()),
            Some(error.code().to_string()),
        )
    }

    /// Records a failed transaction that has no [`ReservationError`] behind it
    pub fn fail_with(
        &mut self,
        pending: PendingTransaction,
        detail: Option<String>,
        message: impl Into<String>,
    ) -> &TransactionEntry {
        self.append(
            pending,
            TransactionStatus::Failed,
            detail,
            Some(message.into()),
            None,
        )
    }

    fn append(
        &mut self,
        pending: PendingTransaction,
        status: TransactionStatus,
        detail: Option<String>,
        error: Option<String>,
        error_code: Option<String>,
    ) -> &TransactionEntry {
        let sequence = self.entries.len() as u64 + 1;
        let entry = TransactionEntry {
            sequence,
            kind: pending.kind,
            status,
            subject: pending.subject,
            detail,
            error,
            error_code,
            recorded_at: self.clock.now(),
        };
        self.entries.push(entry);
        let index = self.entries.len() - 1;
        &self.entries[index]
    }

    /// All entries in append order
    #[must_use]
    pub fn entries(&self) -> &[TransactionEntry] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry
    #[must_use]
    pub fn last(&self) -> Option<&TransactionEntry> {
        self.entries.last()
    }

    /// Entries of one kind, in order
    pub fn of_kind(&self, kind: TransactionKind) -> impl Iterator<Item = &TransactionEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Failed entries, in order
    pub fn failures(&self) -> impl Iterator<Item = &TransactionEntry> {
        self.entries
            .iter()
            .filter(|e| e.status == TransactionStatus::Failed)
    }

    /// Serializes every entry as one JSON document per line
    ///
    /// # Errors
    ///
    /// Returns the serializer's error if an entry cannot be encoded.
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl std::fmt::Debug for TransactionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLog")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}
