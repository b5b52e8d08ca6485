//! # Courtbook Testing
//!
//! Testing utilities for the courtbook reservation engine.
//!
//! This crate provides:
//! - A fixed [`Clock`] so log timestamps and report dates are reproducible
//! - [`ScriptedGateway`], a payment gateway double that records its calls
//! - [`EngineFixture`], a builder for engines pre-loaded with courts
//! - proptest strategies for slots, dates and operation sequences
//!
//! ## Example
//!
//! ```
//! use courtbook_testing::{EngineFixture, helpers::{court, day, slot}};
//!
//! let mut system = EngineFixture::new().with_court("C1", 20).build()?;
//! system.make_reservation(
//!     courtbook_testing::helpers::reservation("R1"),
//!     "Alice",
//!     &court("C1"),
//!     day(1),
//!     slot("10:00-11:00"),
//! )?;
//! assert_eq!(system.reservation_count(), 1);
//! # Ok::<(), courtbook_core::ReservationError>(())
//! ```

use chrono::{DateTime, Utc};
use courtbook_core::environment::Clock;

mod scripted_gateway;

pub use scripted_gateway::{GatewayCall, ScriptedGateway};

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use courtbook_testing::mocks::FixedClock;
    /// use courtbook_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Fixtures and shorthand constructors
///
/// The shorthand constructors panic on malformed input; they are meant for
/// literals in tests.
#[allow(clippy::expect_used)]
pub mod helpers {
    use super::mocks::{FixedClock, test_clock};
    use chrono::NaiveDate;
    use courtbook_core::config::EngineConfig;
    use courtbook_core::engine::ReservationSystem;
    use courtbook_core::error::Result;
    use courtbook_core::payment::{PaymentGateway, SimulatedGateway};
    use courtbook_core::types::{CourtId, Money, ReservationId, TimeSlot};
    use std::sync::Arc;

    /// Court id from a literal
    ///
    /// # Panics
    ///
    /// Panics if `id` is blank.
    #[must_use]
    pub fn court(id: &str) -> CourtId {
        CourtId::try_new(id).expect("test court id")
    }

    /// Reservation id from a literal
    ///
    /// # Panics
    ///
    /// Panics if `id` is blank.
    #[must_use]
    pub fn reservation(id: &str) -> ReservationId {
        ReservationId::try_new(id).expect("test reservation id")
    }

    /// Time slot from `"HH:MM-HH:MM"` or `"HH:MM"`
    ///
    /// # Panics
    ///
    /// Panics if `s` is not a valid slot.
    #[must_use]
    pub fn slot(s: &str) -> TimeSlot {
        s.parse().expect("test time slot")
    }

    /// The given day of June 2024
    ///
    /// # Panics
    ///
    /// Panics if `day` is not a day of June.
    #[must_use]
    pub fn day(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).expect("test date")
    }

    /// Builder for engines with courts already registered
    ///
    /// Defaults to [`test_clock`], a [`SimulatedGateway`] with the standard
    /// credit limit and the default opening hours.
    pub struct EngineFixture {
        courts: Vec<(String, Money)>,
        clock: FixedClock,
        gateway: Arc<dyn PaymentGateway>,
        config: EngineConfig,
    }

    impl EngineFixture {
        /// An empty fixture
        #[must_use]
        pub fn new() -> Self {
            Self {
                courts: Vec::new(),
                clock: test_clock(),
                gateway: Arc::new(SimulatedGateway::default()),
                config: EngineConfig::default(),
            }
        }

        /// Registers a court at `dollars` per hour when built
        #[must_use]
        pub fn with_court(mut self, id: &str, dollars: u64) -> Self {
            self.courts.push((id.to_string(), Money::from_dollars(dollars)));
            self
        }

        /// Uses `gateway` for payments
        #[must_use]
        pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
            self.gateway = gateway;
            self
        }

        /// Uses `clock` for log timestamps and report dates
        #[must_use]
        pub fn with_clock(mut self, clock: FixedClock) -> Self {
            self.clock = clock;
            self
        }

        /// Uses explicit engine settings
        #[must_use]
        pub fn with_config(mut self, config: EngineConfig) -> Self {
            self.config = config;
            self
        }

        /// Builds the engine and registers the courts through `add_court`,
        /// so each one leaves an entry in the log
        ///
        /// # Errors
        ///
        /// Returns the first error raised while registering a court.
        pub fn build(self) -> Result<ReservationSystem> {
            let mut system =
                ReservationSystem::with_config(Arc::new(self.clock), self.gateway, self.config);
            for (id, rate) in self.courts {
                system.add_court(CourtId::try_new(id)?, rate)?;
            }
            Ok(system)
        }
    }

    impl Default for EngineFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl std::fmt::Debug for EngineFixture {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("EngineFixture")
                .field("courts", &self.courts)
                .field("clock", &self.clock)
                .finish_non_exhaustive()
        }
    }

    /// Installs a test-friendly tracing subscriber, once per process
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "courtbook_core=debug".into()),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities
pub mod properties {
    use chrono::NaiveDate;
    use courtbook_core::types::{CourtId, PaymentMethod, TimeSlot};
    use proptest::prelude::*;

    /// Court ids drawn from a small pool so collisions are common
    pub fn court_id() -> impl Strategy<Value = CourtId> {
        prop::sample::select(vec!["C1", "C2", "C3"])
            .prop_filter_map("court id must not be blank", |id| CourtId::try_new(id).ok())
    }

    /// Days in the first two weeks of June 2024
    pub fn date() -> impl Strategy<Value = NaiveDate> {
        (1u32..=14).prop_filter_map("day must exist", |day| NaiveDate::from_ymd_opt(2024, 6, day))
    }

    /// Slots starting on the half hour between 08:00 and 20:30, 30 to 120 minutes long
    pub fn slot() -> impl Strategy<Value = TimeSlot> {
        (
            8u32..21,
            prop::sample::select(vec![0u32, 30]),
            prop::sample::select(vec![30u32, 60, 90, 120]),
        )
            .prop_filter_map("slot must fit in one day", |(hour, minute, minutes)| {
                TimeSlot::starting_at(hour, minute, minutes).ok()
            })
    }

    /// Player names, blank ones included
    pub fn player() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["Alice", "Bob", "Cara", "   "]).prop_map(String::from)
    }

    /// Any payment method
    pub fn payment_method() -> impl Strategy<Value = PaymentMethod> {
        prop_oneof![
            Just(PaymentMethod::Credit),
            Just(PaymentMethod::Cash),
            Just(PaymentMethod::Online),
        ]
    }

    /// One engine call in a generated session
    ///
    /// Reservation targets are indexes into the ids handed out so far, taken
    /// modulo their count, so most calls hit existing reservations.
    #[derive(Clone, Debug)]
    pub enum EngineOp {
        /// `make_reservation` with a fresh id
        Book {
            /// Player name
            player: String,
            /// Court
            court_id: CourtId,
            /// Day
            date: NaiveDate,
            /// Slot
            slot: TimeSlot,
        },
        /// `process_payment` on an earlier id
        Pay {
            /// Index into earlier ids
            target: usize,
            /// Method
            method: PaymentMethod,
        },
        /// `cancel_reservation` on an earlier id
        Cancel {
            /// Index into earlier ids
            target: usize,
        },
    }

    /// A single engine call, weighted towards bookings
    pub fn engine_op() -> impl Strategy<Value = EngineOp> {
        prop_oneof![
            4 => (player(), court_id(), date(), slot()).prop_map(|(player, court_id, date, slot)| {
                EngineOp::Book { player, court_id, date, slot }
            }),
            1 => (any::<usize>(), payment_method())
                .prop_map(|(target, method)| EngineOp::Pay { target, method }),
            2 => any::<usize>().prop_map(|target| EngineOp::Cancel { target }),
        ]
    }
}

// Re-export commonly used items
pub use helpers::EngineFixture;
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use courtbook_core::payment::PaymentGateway;
    use courtbook_core::types::{Money, PaymentMethod};
    use helpers::{court, reservation};

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn fixture_registers_courts_through_the_engine() {
        let system = EngineFixture::new()
            .with_court("C1", 20)
            .with_court("C2", 25)
            .build()
            .unwrap();

        assert_eq!(system.registry().count(), 2);
        assert_eq!(
            system.court(&court("C2")).unwrap().hourly_rate(),
            Money::from_dollars(25)
        );
        assert_eq!(system.log().len(), 2);
    }

    #[test]
    fn fixture_surfaces_duplicate_courts() {
        let result = EngineFixture::new()
            .with_court("C1", 20)
            .with_court("C1", 30)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn scripted_gateway_records_calls() {
        let gateway = ScriptedGateway::approving().with_failing_refunds();
        let receipt = gateway
            .charge(&reservation("R1"), Money::from_dollars(20), PaymentMethod::Cash)
            .unwrap();

        assert!(gateway.refund(&receipt).is_err());
        assert_eq!(gateway.calls().len(), 2);
        assert_eq!(gateway.refund_count(), 1);
    }

    #[test]
    fn declining_gateway_declines_every_method() {
        let gateway = ScriptedGateway::declining("insufficient funds");
        let err = gateway
            .charge(&reservation("R1"), Money::from_dollars(1), PaymentMethod::Online)
            .unwrap_err();
        assert_eq!(err.to_string(), "Card declined: insufficient funds");
    }
}
