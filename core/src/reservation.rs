//! Reservation record.
//!
//! One booking's lifecycle, cost and payment state. The record references its
//! court by id; the court itself lives in the registry and outlives it.
//! Records are never deleted: a cancelled reservation stays for audit.

use crate::court::Court;
use crate::error::{ReservationError, Result};
use crate::payment::{PaymentGateway, PaymentReceipt};
use crate::types::{CourtId, Money, PaymentMethod, ReservationId, ReservationStatus, TimeSlot};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single court booking
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    id: ReservationId,
    player_name: String,
    court_id: CourtId,
    date: NaiveDate,
    slot: TimeSlot,
    status: ReservationStatus,
    total_cost: Money,
    created_at: DateTime<Utc>,
    receipt: Option<PaymentReceipt>,
}

impl Reservation {
    /// Builds a pending reservation on `court`, pricing the slot at the
    /// court's hourly rate.
    ///
    /// Availability is not checked here; the engine holds the slot first.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] for a blank player name or a
    /// cost that does not fit in [`Money`].
    pub fn new(
        id: ReservationId,
        player_name: &str,
        court: &Court,
        date: NaiveDate,
        slot: TimeSlot,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let player_name = player_name.trim();
        if player_name.is_empty() {
            return Err(ReservationError::validation(
                "Reservation ID and player name are required",
            ));
        }

        let total_cost = court
            .hourly_rate()
            .checked_mul_minutes(slot.duration_minutes())
            .ok_or_else(|| {
                ReservationError::validation(format!(
                    "Cost of {slot} on court {} exceeds the representable amount",
                    court.id()
                ))
            })?;

        Ok(Self {
            id,
            player_name: player_name.to_string(),
            court_id: court.id().clone(),
            date,
            slot,
            status: ReservationStatus::Pending,
            total_cost,
            created_at,
            receipt: None,
        })
    }

    /// Reservation identifier
    #[must_use]
    pub const fn id(&self) -> &ReservationId {
        &self.id
    }

    /// Who booked
    #[must_use]
    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    /// Booked court
    #[must_use]
    pub const fn court_id(&self) -> &CourtId {
        &self.court_id
    }

    /// Booked date
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Booked slot
    #[must_use]
    pub const fn slot(&self) -> TimeSlot {
        self.slot
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn status(&self) -> ReservationStatus {
        self.status
    }

    /// Price computed at creation
    #[must_use]
    pub const fn total_cost(&self) -> Money {
        self.total_cost
    }

    /// When the reservation was made
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Receipt of the successful charge, once confirmed
    #[must_use]
    pub const fn receipt(&self) -> Option<&PaymentReceipt> {
        self.receipt.as_ref()
    }

    /// Charges the reservation's cost through `gateway`.
    ///
    /// A pending reservation, or one whose previous payment failed, can be
    /// paid. Success confirms it; a declined charge moves it to
    /// [`ReservationStatus::PaymentFailed`] and keeps the slot held.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::Validation`] if the reservation is already
    ///   confirmed or cancelled (nothing changes)
    /// - [`ReservationError::PaymentFailed`] if the gateway declines
    pub fn process_payment(
        &mut self,
        gateway: &dyn PaymentGateway,
        method: PaymentMethod,
    ) -> Result<PaymentReceipt> {
        match self.status {
            ReservationStatus::Pending | ReservationStatus::PaymentFailed => {}
            ReservationStatus::Confirmed => {
                return Err(ReservationError::validation(format!(
                    "Reservation {} is already confirmed",
                    self.id
                )));
            }
            ReservationStatus::Cancelled => {
                return Err(ReservationError::validation(format!(
                    "Cannot process payment for cancelled reservation {}",
                    self.id
                )));
            }
        }

        match gateway.charge(&self.id, self.total_cost, method) {
            Ok(receipt) => {
                self.status = ReservationStatus::Confirmed;
                self.receipt = Some(receipt.clone());
                Ok(receipt)
            }
            Err(error) => {
                self.status = ReservationStatus::PaymentFailed;
                Err(ReservationError::PaymentFailed {
                    reservation_id: self.id.clone(),
                    amount: self.total_cost,
                    reason: error.to_string(),
                })
            }
        }
    }

    /// Marks the reservation cancelled, returning the status it had
    pub(crate) const fn mark_cancelled(&mut self) -> ReservationStatus {
        let prior = self.status;
        self.status = ReservationStatus::Cancelled;
        prior
    }

    /// Puts back a status captured before a failed multi-step operation
    pub(crate) const fn restore_status(&mut self, prior: ReservationStatus) {
        self.status = prior;
    }
}
