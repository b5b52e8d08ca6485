//! Court registry.
//!
//! Holds every court's identity, hourly rate and per-date schedule, and
//! answers availability queries. Slot mutators are `pub(crate)`: only the
//! engine reserves or releases slots, under its transaction control.

use crate::error::{ReservationError, Result};
use crate::types::{CourtId, Money, TimeSlot};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A single court
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Court {
    id: CourtId,
    hourly_rate: Money,
    schedule: BTreeMap<NaiveDate, BTreeSet<TimeSlot>>,
}

impl Court {
    /// Creates a court with an empty schedule
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] if `hourly_rate` is zero.
    pub fn new(id: CourtId, hourly_rate: Money) -> Result<Self> {
        if hourly_rate.is_zero() {
            return Err(ReservationError::validation(
                "Invalid court data: Hourly rate must be positive",
            ));
        }
        Ok(Self {
            id,
            hourly_rate,
            schedule: BTreeMap::new(),
        })
    }

    /// Court identifier
    #[must_use]
    pub const fn id(&self) -> &CourtId {
        &self.id
    }

    /// Price of one hour on this court
    #[must_use]
    pub const fn hourly_rate(&self) -> Money {
        self.hourly_rate
    }

    /// True if nothing booked on `date` overlaps `slot`
    #[must_use]
    pub fn is_free(&self, date: NaiveDate, slot: &TimeSlot) -> bool {
        self.schedule
            .get(&date)
            .is_none_or(|booked| booked.iter().all(|held| !held.overlaps(slot)))
    }

    /// Slots booked on `date`, in start order
    #[must_use]
    pub fn booked_slots(&self, date: NaiveDate) -> Vec<TimeSlot> {
        self.schedule
            .get(&date)
            .map(|booked| booked.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of booked slots across all dates
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.schedule.values().map(BTreeSet::len).sum()
    }

    fn hold(&mut self, date: NaiveDate, slot: TimeSlot) -> Result<()> {
        if !self.is_free(date, &slot) {
            return Err(ReservationError::CourtUnavailable {
                court_id: self.id.clone(),
                date,
                slot,
            });
        }
        self.schedule.entry(date).or_default().insert(slot);
        Ok(())
    }

    fn release(&mut self, date: NaiveDate, slot: &TimeSlot) -> bool {
        let Some(booked) = self.schedule.get_mut(&date) else {
            return false;
        };
        let removed = booked.remove(slot);
        if booked.is_empty() {
            self.schedule.remove(&date);
        }
        removed
    }
}

/// All courts of the facility, indexed by id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtRegistry {
    courts: BTreeMap<CourtId, Court>,
}

impl CourtRegistry {
    /// Creates an empty registry
    #[must_use]
    pub const fn new() -> Self {
        Self {
            courts: BTreeMap::new(),
        }
    }

    /// Registers a new court
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] if the id is already taken or
    /// the rate is not positive.
    pub fn add_court(&mut self, id: CourtId, hourly_rate: Money) -> Result<&Court> {
        if self.courts.contains_key(&id) {
            return Err(ReservationError::validation(format!(
                "Court {id} already exists"
            )));
        }
        let court = Court::new(id.clone(), hourly_rate)?;
        Ok(self.courts.entry(id).or_insert(court))
    }

    /// Whether `slot` on `date` is free on the given court. Side-effect free.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::NotFound`] for an unknown court.
    pub fn is_available(&self, id: &CourtId, date: NaiveDate, slot: &TimeSlot) -> Result<bool> {
        Ok(self.get_or_not_found(id)?.is_free(date, slot))
    }

    /// Opening slots on `date` that do not overlap any booking
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::NotFound`] for an unknown court.
    pub fn available_slots(
        &self,
        id: &CourtId,
        date: NaiveDate,
        opening_slots: &[TimeSlot],
    ) -> Result<Vec<TimeSlot>> {
        let court = self.get_or_not_found(id)?;
        Ok(opening_slots
            .iter()
            .filter(|slot| court.is_free(date, slot))
            .copied()
            .collect())
    }

    /// Holds a slot for a booking.
    ///
    /// Fails with [`ReservationError::CourtUnavailable`] if any held slot overlaps.
    pub(crate) fn reserve_slot(
        &mut self,
        id: &CourtId,
        date: NaiveDate,
        slot: TimeSlot,
    ) -> Result<()> {
        self.get_mut_or_not_found(id)?.hold(date, slot)
    }

    /// Releases a held slot. Releasing a slot that is not held is a no-op
    /// reported as `Ok(false)`, so compensations can be retried safely.
    pub(crate) fn release_slot(
        &mut self,
        id: &CourtId,
        date: NaiveDate,
        slot: &TimeSlot,
    ) -> Result<bool> {
        Ok(self.get_mut_or_not_found(id)?.release(date, slot))
    }

    /// Returns a court by id
    #[must_use]
    pub fn get(&self, id: &CourtId) -> Option<&Court> {
        self.courts.get(id)
    }

    /// All courts, ordered by id
    pub fn iter(&self) -> impl Iterator<Item = &Court> {
        self.courts.values()
    }

    /// Number of registered courts
    #[must_use]
    pub fn count(&self) -> usize {
        self.courts.len()
    }

    /// Booked slots across every court
    #[must_use]
    pub fn total_booked(&self) -> usize {
        self.courts.values().map(Court::slot_count).sum()
    }

    #[cfg(test)]
    pub(crate) fn remove(&mut self, id: &CourtId) -> Option<Court> {
        self.courts.remove(id)
    }

    fn get_or_not_found(&self, id: &CourtId) -> Result<&Court> {
        self.courts
            .get(id)
            .ok_or_else(|| ReservationError::court_not_found(id))
    }

    fn get_mut_or_not_found(&mut self, id: &CourtId) -> Result<&mut Court> {
        self.courts
            .get_mut(id)
            .ok_or_else(|| ReservationError::court_not_found(id))
    }
}
