//! Error taxonomy for the reservation engine.
//!
//! Every failure the engine can surface is one variant of
//! [`ReservationError`]. Each variant renders as `[CODE] message` and exposes
//! its machine code through [`ReservationError::code`].

use crate::types::{CourtId, Money, ReservationId, TimeSlot};
use chrono::NaiveDate;
use thiserror::Error;

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, ReservationError>;

/// Kind of entity a lookup failed for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    /// A court
    Court,
    /// A reservation
    Reservation,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Court => "Court",
            Self::Reservation => "Reservation",
        })
    }
}

/// Fieldless discriminant of [`ReservationError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input, detected before any mutation
    Validation,
    /// Unknown court or reservation
    NotFound,
    /// Slot already booked
    CourtUnavailable,
    /// Charge declined
    PaymentFailed,
    /// Refund declined during cancellation
    RefundFailed,
    /// Shared engine could not be locked
    EngineUnavailable,
}

/// Errors produced by reservation engine operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// Bad input: duplicate id, non-positive rate, empty name, malformed value
    #[error("[V001] {message}")]
    Validation {
        /// Human-readable description
        message: String,
    },

    /// Unknown court or reservation id
    #[error("[N001] {entity} {id} does not exist")]
    NotFound {
        /// What was looked up
        entity: Entity,
        /// The id that was not found
        id: String,
    },

    /// The requested slot is already booked
    #[error("[C001] Court {court_id} is unavailable at {slot} on {date}")]
    CourtUnavailable {
        /// Court that was requested
        court_id: CourtId,
        /// Requested date
        date: NaiveDate,
        /// Requested slot
        slot: TimeSlot,
    },

    /// The payment capability declined the charge
    #[error("[P001] Payment failed for reservation {reservation_id}, amount: {amount} ({reason})")]
    PaymentFailed {
        /// Reservation being paid
        reservation_id: ReservationId,
        /// Amount that was charged
        amount: Money,
        /// Gateway's reason
        reason: String,
    },

    /// The payment capability declined the refund of a cancelled booking
    #[error("[P002] Refund failed for reservation {reservation_id}, amount: {amount} ({reason})")]
    RefundFailed {
        /// Reservation being cancelled
        reservation_id: ReservationId,
        /// Amount that was to be refunded
        amount: Money,
        /// Gateway's reason
        reason: String,
    },

    /// The shared engine lock is poisoned
    #[error("[E001] Reservation engine unavailable: {message}")]
    EngineUnavailable {
        /// Description of the failure
        message: String,
    },
}

impl ReservationError {
    /// Creates a validation error
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a not-found error for a court
    #[must_use]
    pub fn court_not_found(id: &CourtId) -> Self {
        Self::NotFound {
            entity: Entity::Court,
            id: id.to_string(),
        }
    }

    /// Creates a not-found error for a reservation
    #[must_use]
    pub fn reservation_not_found(id: &ReservationId) -> Self {
        Self::NotFound {
            entity: Entity::Reservation,
            id: id.to_string(),
        }
    }

    /// Machine-readable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "V001",
            Self::NotFound { .. } => "N001",
            Self::CourtUnavailable { .. } => "C001",
            Self::PaymentFailed { .. } => "P001",
            Self::RefundFailed { .. } => "P002",
            Self::EngineUnavailable { .. } => "E001",
        }
    }

    /// The variant without its payload
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::CourtUnavailable { .. } => ErrorKind::CourtUnavailable,
            Self::PaymentFailed { .. } => ErrorKind::PaymentFailed,
            Self::RefundFailed { .. } => ErrorKind::RefundFailed,
            Self::EngineUnavailable { .. } => ErrorKind::EngineUnavailable,
        }
    }
}
