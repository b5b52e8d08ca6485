//! Thread-safe handle to one engine.
//!
//! All operations run behind a single lock covering the registry, the
//! reservations and the log, so no caller can observe a booking or a
//! rollback half-way through.

use crate::engine::ReservationSystem;
use crate::error::{ReservationError, Result};
use std::sync::{Arc, Mutex};

/// Cloneable handle serializing access to a [`ReservationSystem`]
#[derive(Clone, Debug)]
pub struct SharedReservationSystem {
    inner: Arc<Mutex<ReservationSystem>>,
}

impl SharedReservationSystem {
    /// Wraps an engine
    #[must_use]
    pub fn new(system: ReservationSystem) -> Self {
        Self {
            inner: Arc::new(Mutex::new(system)),
        }
    }

    /// Runs `f` with exclusive access to the engine
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::EngineUnavailable`] if a previous holder
    /// panicked while holding the lock.
    pub fn with<T>(&self, f: impl FnOnce(&mut ReservationSystem) -> T) -> Result<T> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|poisoned| ReservationError::EngineUnavailable {
                message: poisoned.to_string(),
            })?;
        Ok(f(&mut guard))
    }

    /// Like [`with`](Self::with) for operations that themselves return a `Result`
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or
    /// [`ReservationError::EngineUnavailable`] for a poisoned lock.
    pub fn try_with<T>(
        &self,
        f: impl FnOnce(&mut ReservationSystem) -> Result<T>,
    ) -> Result<T> {
        self.with(f)?
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::environment::SystemClock;
    use crate::payment::SimulatedGateway;
    use crate::types::{CourtId, Money, ReservationId, TimeSlot};
    use chrono::NaiveDate;
    use std::thread;

    #[test]
    fn concurrent_bookings_of_one_slot_admit_exactly_one() {
        let mut system =
            ReservationSystem::new(Arc::new(SystemClock), Arc::new(SimulatedGateway::default()));
        system
            .add_court(CourtId::try_new("C1").unwrap(), Money::from_dollars(20))
            .unwrap();
        let shared = SharedReservationSystem::new(system);

        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let slot: TimeSlot = "10:00-11:00".parse().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    shared.try_with(|system| {
                        system
                            .make_reservation(
                                ReservationId::sequential(i),
                                "Player",
                                &CourtId::try_new("C1").unwrap(),
                                date,
                                slot,
                            )
                            .map(|_| ())
                    })
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();

        assert_eq!(successes, 1);
        let booked = shared.with(|system| system.registry().total_booked()).unwrap();
        assert_eq!(booked, 1);
        let log_len = shared.with(|system| system.log().len()).unwrap();
        assert_eq!(log_len, 9);
    }
}
