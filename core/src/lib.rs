//! # Courtbook Core
//!
//! Reservation transaction engine for a badminton facility.
//!
//! The engine keeps three pieces of state consistent with each other:
//!
//! - **Court registry**: courts, their hourly rates and per-day schedules
//! - **Reservations**: one record per booking, with its status and cost
//! - **Transaction log**: an append-only audit trail of every attempted operation
//!
//! ## Guarantees
//!
//! - A time slot on a court is held by at most one active reservation.
//! - A failed operation leaves the registry and the reservations as they were.
//!   Multi-step operations that fail part-way run compensating steps in reverse
//!   order and log them as a `rollback` entry.
//! - Every public operation appends exactly one top-level log entry, whether it
//!   succeeds or fails.
//!
//! ## Example
//!
//! ```
//! use courtbook_core::{
//!     CourtId, Money, ReservationId, ReservationSystem, SimulatedGateway, SystemClock,
//! };
//! use std::sync::Arc;
//!
//! let mut system =
//!     ReservationSystem::new(Arc::new(SystemClock), Arc::new(SimulatedGateway::default()));
//! let c1 = CourtId::try_new("C1")?;
//! system.add_court(c1.clone(), Money::from_dollars(20))?;
//!
//! let date = courtbook_core::types::parse_date("2024-06-01")?;
//! let reservation = system.make_reservation(
//!     ReservationId::try_new("R1")?,
//!     "Alice",
//!     &c1,
//!     date,
//!     "10:00-11:00".parse()?,
//! )?;
//! assert_eq!(reservation.total_cost(), Money::from_dollars(20));
//! # Ok::<(), courtbook_core::ReservationError>(())
//! ```

pub mod config;
pub mod court;
pub mod engine;
pub mod environment;
pub mod error;
pub mod log;
pub mod metrics;
pub mod payment;
pub mod report;
pub mod reservation;
pub mod shared;
pub mod types;

// Re-export commonly used types
pub use config::{Config, EngineConfig};
pub use court::{Court, CourtRegistry};
pub use engine::ReservationSystem;
pub use environment::{Clock, SystemClock};
pub use error::{Entity, ErrorKind, ReservationError, Result};
pub use log::{
    PendingTransaction, TransactionEntry, TransactionKind, TransactionLog, TransactionStatus,
};
pub use payment::{GatewayError, GatewayResult, PaymentGateway, PaymentReceipt, SimulatedGateway};
pub use report::{CourtSummary, Report, ReportGenerator, StatusCounts};
pub use reservation::Reservation;
pub use shared::SharedReservationSystem;
pub use types::{CourtId, Money, PaymentMethod, ReservationId, ReservationStatus, TimeSlot};
