//! Reservation engine.
//!
//! [`ReservationSystem`] owns the court registry, the reservation records and
//! the transaction log, and is the only place that mutates them. Every public
//! operation appends exactly one top-level log entry (`completed` or
//! `failed`). Multi-step operations that fail after a mutation undo their
//! forward steps in reverse order and record that compensation as one extra
//! `rollback` entry, appended before the failed top-level entry. Reports are
//! audited in a separate log so reading state never adds to the operation log.
//!
//! # Forward steps and compensations
//!
//! ```text
//! make_reservation     reserve slot ──► build record ──► register
//!                      compensate:  release slot
//!
//! cancel_reservation   mark cancelled ──► release slot ──► refund (if paid)
//!                      compensate:  re-hold slot ──► restore status
//! ```

use crate::config::EngineConfig;
use crate::court::{Court, CourtRegistry};
use crate::environment::Clock;
use crate::error::{ReservationError, Result};
use crate::log::{PendingTransaction, TransactionKind, TransactionLog};
use crate::metrics;
use crate::payment::{PaymentGateway, PaymentReceipt};
use crate::report::{self, Report, ReportGenerator};
use crate::reservation::Reservation;
use crate::types::{CourtId, Money, PaymentMethod, ReservationId, ReservationStatus, TimeSlot};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// The reservation transaction engine
pub struct ReservationSystem {
    registry: CourtRegistry,
    reservations: HashMap<ReservationId, Reservation>,
    log: TransactionLog,
    reports: ReportGenerator,
    clock: Arc<dyn Clock>,
    gateway: Arc<dyn PaymentGateway>,
    config: EngineConfig,
    next_reservation_number: u64,
}

impl ReservationSystem {
    /// Creates an empty engine with the default opening hours
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self::with_config(clock, gateway, EngineConfig::default())
    }

    /// Creates an empty engine with explicit settings
    #[must_use]
    pub fn with_config(
        clock: Arc<dyn Clock>,
        gateway: Arc<dyn PaymentGateway>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry: CourtRegistry::new(),
            reservations: HashMap::new(),
            log: TransactionLog::new(Arc::clone(&clock)),
            reports: ReportGenerator::new(Arc::clone(&clock)),
            clock,
            gateway,
            config,
            next_reservation_number: 1,
        }
    }

    // ========== Operations ==========

    /// Registers a court with an empty schedule.
    ///
    /// # Errors
    ///
    /// [`ReservationError::Validation`] if the id is taken or the rate is zero.
    pub fn add_court(&mut self, court_id: CourtId, hourly_rate: Money) -> Result<&Court> {
        let tx = TransactionLog::begin(TransactionKind::AddCourt, Some(court_id.to_string()));
        let outcome = self
            .registry
            .add_court(court_id.clone(), hourly_rate)
            .map(|_| ());
        self.finish(tx, "add_court", outcome, || {
            format!("rate {hourly_rate}/hour")
        })?;

        self.registry
            .get(&court_id)
            .ok_or_else(|| ReservationError::court_not_found(&court_id))
    }

    /// Books `slot` on `court_id` for `date`.
    ///
    /// Validation (unique id, non-blank player, known court, free slot)
    /// happens before anything changes. If building the record fails after
    /// the slot is held, the slot is released again before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::Validation`] for a duplicate id, blank player
    ///   name or a cost that cannot be represented
    /// - [`ReservationError::NotFound`] for an unknown court
    /// - [`ReservationError::CourtUnavailable`] if the slot is taken
    pub fn make_reservation(
        &mut self,
        reservation_id: ReservationId,
        player_name: &str,
        court_id: &CourtId,
        date: NaiveDate,
        slot: TimeSlot,
    ) -> Result<&Reservation> {
        let tx = TransactionLog::begin(
            TransactionKind::MakeReservation,
            Some(reservation_id.to_string()),
        );
        let outcome = self.try_make_reservation(&reservation_id, player_name, court_id, date, slot);
        self.finish(tx, "make_reservation", outcome, || {
            format!("court {court_id} on {date} at {slot}")
        })?;

        self.reservations
            .get(&reservation_id)
            .ok_or_else(|| ReservationError::reservation_not_found(&reservation_id))
    }

    /// Charges a reservation through the injected payment gateway.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::NotFound`] for an unknown reservation
    /// - [`ReservationError::Validation`] if it is already confirmed or cancelled
    /// - [`ReservationError::PaymentFailed`] if the gateway declines; the
    ///   reservation is then `payment_failed` and keeps its slot
    pub fn process_payment(
        &mut self,
        reservation_id: &ReservationId,
        method: PaymentMethod,
    ) -> Result<PaymentReceipt> {
        let tx = TransactionLog::begin(TransactionKind::Payment, Some(reservation_id.to_string()));
        let outcome = match self.reservations.get_mut(reservation_id) {
            Some(reservation) => reservation.process_payment(self.gateway.as_ref(), method),
            None => Err(ReservationError::reservation_not_found(reservation_id)),
        };
        let amount = outcome.as_ref().map(|receipt| receipt.amount).ok();
        self.finish(tx, "payment", outcome, || match amount {
            Some(amount) => format!("{amount} via {method}"),
            None => format!("via {method}"),
        })
    }

    /// Cancels a reservation and frees its slot, refunding it if it was paid.
    ///
    /// If releasing the slot or refunding fails, the slot is held again and
    /// the reservation gets its previous status back, so a cancelled
    /// reservation never keeps its slot and an active one never loses it.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::NotFound`] if the id is unknown or already cancelled
    /// - [`ReservationError::RefundFailed`] if the gateway declines the refund
    /// - any registry error hit while releasing the slot
    pub fn cancel_reservation(&mut self, reservation_id: &ReservationId) -> Result<()> {
        let tx = TransactionLog::begin(
            TransactionKind::CancelReservation,
            Some(reservation_id.to_string()),
        );
        let outcome = self.try_cancel_reservation(reservation_id);
        self.finish(tx, "cancel_reservation", outcome, || {
            "slot released".to_string()
        })
    }

    /// Summary of the current state, dated today.
    ///
    /// The outcome goes to the report audit log ([`report_log`](Self::report_log)),
    /// never to the reservation log. With no reservations the report has zero
    /// counts and the audit entry is `failed`.
    pub fn generate_report(&mut self) -> Report {
        let report = report::summarize(self, self.reports.today());
        self.reports.record(report)
    }

    // ========== Queries ==========

    /// Whether `slot` on `date` is free on a court
    ///
    /// # Errors
    ///
    /// [`ReservationError::NotFound`] for an unknown court.
    pub fn is_available(&self, court_id: &CourtId, date: NaiveDate, slot: &TimeSlot) -> Result<bool> {
        self.registry.is_available(court_id, date, slot)
    }

    /// Opening slots still free on `date`
    ///
    /// # Errors
    ///
    /// [`ReservationError::NotFound`] for an unknown court.
    pub fn available_slots(&self, court_id: &CourtId, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        self.registry
            .available_slots(court_id, date, &self.config.opening_slots)
    }

    /// Returns a court by id
    #[must_use]
    pub fn court(&self, court_id: &CourtId) -> Option<&Court> {
        self.registry.get(court_id)
    }

    /// All courts, ordered by id
    pub fn courts(&self) -> impl Iterator<Item = &Court> {
        self.registry.iter()
    }

    /// The court registry
    #[must_use]
    pub const fn registry(&self) -> &CourtRegistry {
        &self.registry
    }

    /// Returns a reservation by id
    #[must_use]
    pub fn reservation(&self, reservation_id: &ReservationId) -> Option<&Reservation> {
        self.reservations.get(reservation_id)
    }

    /// All reservations, in no particular order
    pub fn reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.values()
    }

    /// Number of reservations, cancelled ones included
    #[must_use]
    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }

    /// Reservations made under `player_name` (case-insensitive), by date and slot
    #[must_use]
    pub fn reservations_for_player(&self, player_name: &str) -> Vec<&Reservation> {
        let wanted = player_name.trim().to_lowercase();
        let mut found: Vec<&Reservation> = self
            .reservations
            .values()
            .filter(|r| r.player_name().to_lowercase() == wanted)
            .collect();
        found.sort_by_key(|r| (r.date(), r.slot(), r.id().clone()));
        found
    }

    /// The engine's transaction log
    #[must_use]
    pub const fn log(&self) -> &TransactionLog {
        &self.log
    }

    /// Audit trail of `generate_report` calls
    #[must_use]
    pub const fn report_log(&self) -> &TransactionLog {
        self.reports.audit_log()
    }

    /// Engine settings
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Hands out the next free generated id (`R1`, `R2`, ...)
    pub fn next_reservation_id(&mut self) -> ReservationId {
        loop {
            let candidate = ReservationId::sequential(self.next_reservation_number);
            self.next_reservation_number += 1;
            if !self.reservations.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    // ========== Internals ==========

    fn try_make_reservation(
        &mut self,
        reservation_id: &ReservationId,
        player_name: &str,
        court_id: &CourtId,
        date: NaiveDate,
        slot: TimeSlot,
    ) -> Result<()> {
        if self.reservations.contains_key(reservation_id) {
            return Err(ReservationError::validation(format!(
                "Reservation {reservation_id} already exists"
            )));
        }
        if player_name.trim().is_empty() {
            return Err(ReservationError::validation(
                "Reservation ID and player name are required",
            ));
        }
        if !self.registry.is_available(court_id, date, &slot)? {
            return Err(ReservationError::CourtUnavailable {
                court_id: court_id.clone(),
                date,
                slot,
            });
        }

        self.registry.reserve_slot(court_id, date, slot)?;

        let built = self
            .registry
            .get(court_id)
            .ok_or_else(|| ReservationError::court_not_found(court_id))
            .and_then(|court| {
                Reservation::new(
                    reservation_id.clone(),
                    player_name,
                    court,
                    date,
                    slot,
                    self.clock.now(),
                )
            });

        match built {
            Ok(reservation) => {
                self.reservations.insert(reservation_id.clone(), reservation);
                Ok(())
            }
            Err(cause) => {
                self.compensate_booking(reservation_id, court_id, date, slot, &cause);
                Err(cause)
            }
        }
    }

    fn try_cancel_reservation(&mut self, reservation_id: &ReservationId) -> Result<()> {
        let reservation = self
            .reservations
            .get_mut(reservation_id)
            .filter(|r| r.status() != ReservationStatus::Cancelled)
            .ok_or_else(|| ReservationError::reservation_not_found(reservation_id))?;

        let court_id = reservation.court_id().clone();
        let date = reservation.date();
        let slot = reservation.slot();
        let receipt = reservation.receipt().cloned();
        let prior = reservation.mark_cancelled();

        let released = match self.registry.release_slot(&court_id, date, &slot) {
            Ok(released) => released,
            Err(cause) => {
                self.compensate_cancellation(reservation_id, prior, None, &cause);
                return Err(cause);
            }
        };

        if prior == ReservationStatus::Confirmed {
            if let Some(receipt) = receipt {
                if let Err(refusal) = self.gateway.refund(&receipt) {
                    let cause = ReservationError::RefundFailed {
                        reservation_id: reservation_id.clone(),
                        amount: receipt.amount,
                        reason: refusal.to_string(),
                    };
                    let rehold = released.then_some((court_id, date, slot));
                    self.compensate_cancellation(reservation_id, prior, rehold, &cause);
                    return Err(cause);
                }
            }
        }

        Ok(())
    }

    /// Undoes the slot hold of a booking whose record could not be built
    fn compensate_booking(
        &mut self,
        reservation_id: &ReservationId,
        court_id: &CourtId,
        date: NaiveDate,
        slot: TimeSlot,
        cause: &ReservationError,
    ) {
        let tx = TransactionLog::begin(TransactionKind::Rollback, Some(reservation_id.to_string()));
        let detail = format!("make_reservation: release {court_id} {date} {slot} after: {cause}");

        match self.registry.release_slot(court_id, date, &slot) {
            Ok(_) => {
                warn!(
                    reservation_id = %reservation_id,
                    court_id = %court_id,
                    %date,
                    %slot,
                    "Booking rolled back"
                );
                self.log.complete(tx, Some(detail));
                metrics::record_rollback("make_reservation", true);
            }
            Err(failure) => {
                error!(
                    reservation_id = %reservation_id,
                    court_id = %court_id,
                    error = %failure,
                    "Booking rollback failed"
                );
                self.log.fail_with(tx, Some(detail), failure.to_string());
                metrics::record_rollback("make_reservation", false);
            }
        }
    }

    /// Undoes a partially applied cancellation, in reverse order:
    /// hold the slot again (if it was released), then restore the status.
    fn compensate_cancellation(
        &mut self,
        reservation_id: &ReservationId,
        prior: ReservationStatus,
        rehold: Option<(CourtId, NaiveDate, TimeSlot)>,
        cause: &ReservationError,
    ) {
        let tx = TransactionLog::begin(TransactionKind::Rollback, Some(reservation_id.to_string()));
        let mut detail = format!("cancel_reservation: restore {prior}");

        let rehold_result = match rehold {
            Some((court_id, date, slot)) => {
                detail.push_str(&format!(", re-hold {court_id} {date} {slot}"));
                self.registry.reserve_slot(&court_id, date, slot)
            }
            None => Ok(()),
        };
        detail.push_str(&format!(" after: {cause}"));

        if let Some(reservation) = self.reservations.get_mut(reservation_id) {
            reservation.restore_status(prior);
        }

        match rehold_result {
            Ok(()) => {
                warn!(
                    reservation_id = %reservation_id,
                    status = %prior,
                    "Cancellation rolled back"
                );
                self.log.complete(tx, Some(detail));
                metrics::record_rollback("cancel_reservation", true);
            }
            Err(failure) => {
                error!(
                    reservation_id = %reservation_id,
                    error = %failure,
                    "Cancellation rollback could not re-hold the slot"
                );
                self.log.fail_with(tx, Some(detail), failure.to_string());
                metrics::record_rollback("cancel_reservation", false);
            }
        }
    }

    /// Appends the top-level entry for an operation and passes its outcome on
    fn finish<T>(
        &mut self,
        tx: PendingTransaction,
        operation: &'static str,
        outcome: Result<T>,
        detail: impl FnOnce() -> String,
    ) -> Result<T> {
        match &outcome {
            Ok(_) => {
                let detail = detail();
                info!(operation, detail = %detail, "Transaction completed");
                self.log.complete(tx, Some(detail));
            }
            Err(cause) => {
                warn!(operation, error = %cause, "Transaction failed");
                self.log.fail(tx, cause);
            }
        }
        metrics::record_operation(operation, outcome.is_ok());
        outcome
    }
}

impl std::fmt::Debug for ReservationSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationSystem")
            .field("registry", &self.registry)
            .field("reservations", &self.reservations)
            .field("log", &self.log)
            .field("reports", &self.reports)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
