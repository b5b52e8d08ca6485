//! Configuration management for the reservation engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::Result;
use crate::types::{Money, TimeSlot};
use serde::{Deserialize, Serialize};
use std::env;
use std::ops::RangeInclusive;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Facility configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// First bookable hour of the day (inclusive)
    pub opening_hour: u32,
    /// Hour the facility closes; the last slot ends at or before it
    pub closing_hour: u32,
    /// Length of each standard slot in minutes
    pub slot_minutes: u32,
    /// Credit charges above this amount are declined by the simulated gateway
    pub credit_limit: Money,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            opening_hour: 9,
            closing_hour: 19,
            slot_minutes: 60,
            credit_limit: Money::from_dollars(50),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing, unparsable or out-of-range values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, applying the same
    /// validation as [`from_env`](Self::from_env)
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str, valid: RangeInclusive<u32>, default: u32| {
            lookup(key)
                .and_then(|s| s.trim().parse().ok())
                .filter(|n| valid.contains(n))
                .unwrap_or(default)
        };

        Self {
            opening_hour: number("COURTBOOK_OPENING_HOUR", 0..=23, defaults.opening_hour),
            closing_hour: number("COURTBOOK_CLOSING_HOUR", 0..=23, defaults.closing_hour),
            slot_minutes: number(
                "COURTBOOK_SLOT_MINUTES",
                1..=MINUTES_PER_DAY,
                defaults.slot_minutes,
            ),
            credit_limit: lookup("COURTBOOK_CREDIT_LIMIT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.credit_limit),
            log_level: lookup("COURTBOOK_LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// Standard slots between opening and closing, back to back
    ///
    /// # Errors
    ///
    /// Returns a validation error if a slot cannot be represented on one day.
    pub fn opening_slots(&self) -> Result<Vec<TimeSlot>> {
        let mut slots = Vec::new();
        if self.slot_minutes == 0 {
            return Ok(slots);
        }

        let close = self.closing_hour.saturating_mul(60);
        let mut start = self.opening_hour.saturating_mul(60);
        while let Some(end) = start
            .checked_add(self.slot_minutes)
            .filter(|end| *end <= close)
        {
            slots.push(TimeSlot::starting_at(start / 60, start % 60, self.slot_minutes)?);
            start = end;
        }
        Ok(slots)
    }

    /// Derives the engine settings
    ///
    /// # Errors
    ///
    /// Returns a validation error if the opening slots cannot be built.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        Ok(EngineConfig {
            opening_slots: self.opening_slots()?,
        })
    }
}

/// Settings the engine itself consults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Slots offered by `available_slots`
    pub opening_slots: Vec<TimeSlot>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            opening_slots: (9..19).filter_map(|h| TimeSlot::hour(h).ok()).collect(),
        }
    }
}
