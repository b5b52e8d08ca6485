//! Domain types for the court reservation engine.
//!
//! Identifiers, money, time slots and the small enums shared by the
//! registry, the reservation records and the transaction log.

use crate::error::{ReservationError, Result};
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Unique identifier for a court
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourtId(String);

impl CourtId {
    /// Creates a `CourtId`, rejecting empty or blank identifiers
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] if `id` is blank.
    pub fn try_new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ReservationError::validation(
                "Court ID must be a non-empty string",
            ));
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CourtId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CourtId {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_new(s)
    }
}

/// Unique identifier for a reservation
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReservationId(String);

impl ReservationId {
    /// Creates a `ReservationId`, rejecting empty or blank identifiers
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] if `id` is blank.
    pub fn try_new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ReservationError::validation(
                "Reservation ID and player name are required",
            ));
        }
        Ok(Self(id))
    }

    /// The `n`-th generated identifier: `R1`, `R2`, ...
    #[must_use]
    pub fn sequential(n: u64) -> Self {
        Self(format!("R{n}"))
    }

    /// Returns the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ReservationId {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_new(s)
    }
}

/// Money amount in cents (avoids floating point issues)
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(u64);

impl Money {
    /// Zero dollars
    pub const ZERO: Self = Self(0);

    /// Creates a new `Money` amount from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Creates a `Money` amount from dollars, saturating at the largest
    /// representable amount
    #[must_use]
    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    /// Creates a `Money` amount from dollars, returning `None` on overflow
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Checks if this amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, returning `None` on overflow
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Adds two amounts, capping at the largest representable amount
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Prorates an hourly amount over `minutes`, rounding half up to the cent.
    ///
    /// Returns `None` if the intermediate product overflows.
    #[must_use]
    pub fn checked_mul_minutes(self, minutes: u32) -> Option<Self> {
        self.0
            .checked_mul(u64::from(minutes))
            .and_then(|product| product.checked_add(30))
            .map(|rounded| Self(rounded / 60))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Money {
    type Err = ReservationError;

    /// Parses `20`, `20.5`, `20.50` or `$20.50`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ReservationError::validation(format!("Invalid amount: {s}"));

        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('$').unwrap_or(trimmed);
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let dollars: u64 = whole.parse().map_err(|_| invalid())?;
        let cents: u64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        dollars
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents))
            .map(Self)
            .ok_or_else(invalid)
    }
}

/// A bookable time range on a single day, e.g. `10:00-11:00`
///
/// Serializes as its `HH:MM-HH:MM` text; deserializing goes through
/// [`FromStr`] so `end > start` holds for every value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeSlot {
    /// Creates a slot from its bounds
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] unless `end` is after `start`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if end <= start {
            return Err(ReservationError::validation(format!(
                "Time slot must end after it starts ({} >= {})",
                start.format("%H:%M"),
                end.format("%H:%M")
            )));
        }
        Ok(Self { start, end })
    }

    /// Creates a one-hour slot starting at `hour:00`
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] if the slot would run past midnight.
    pub fn hour(hour: u32) -> Result<Self> {
        Self::starting_at(hour, 0, 60)
    }

    /// Creates a slot of `minutes` starting at `hour:minute`
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] for an invalid start time or a
    /// slot that would run past midnight.
    pub fn starting_at(hour: u32, minute: u32, minutes: u32) -> Result<Self> {
        let start = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            ReservationError::validation(format!("Invalid start time {hour:02}:{minute:02}"))
        })?;
        let end_minutes = (hour * 60 + minute).saturating_add(minutes);
        let end = NaiveTime::from_hms_opt(end_minutes / 60, end_minutes % 60, 0)
            .ok_or_else(|| {
                ReservationError::validation(format!(
                    "Time slot starting at {hour:02}:{minute:02} runs past midnight"
                ))
            })?;
        Self::new(start, end)
    }

    /// Slot start
    #[must_use]
    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    /// Slot end
    #[must_use]
    pub const fn end(&self) -> NaiveTime {
        self.end
    }

    /// Length of the slot in minutes
    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        let minutes = (self.end - self.start).num_minutes();
        u32::try_from(minutes).unwrap_or(0)
    }

    /// True if the two slots share any instant
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start.hour(),
            self.start.minute(),
            self.end.hour(),
            self.end.minute()
        )
    }
}

impl FromStr for TimeSlot {
    type Err = ReservationError;

    /// Parses `HH:MM-HH:MM`, or a bare `HH:MM` meaning a one-hour slot.
    fn from_str(s: &str) -> Result<Self> {
        let parse_time = |t: &str| {
            NaiveTime::parse_from_str(t.trim(), "%H:%M")
                .map_err(|_| ReservationError::validation(format!("Invalid time slot: {s}")))
        };

        match s.split_once('-') {
            Some((start, end)) => Self::new(parse_time(start)?, parse_time(end)?),
            None => {
                let start = parse_time(s)?;
                Self::starting_at(start.hour(), start.minute(), 60)
            }
        }
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = ReservationError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.to_string()
    }
}

/// Serde adapter writing [`Money`] as a dollar amount (`20.5` for `$20.50`)
///
/// Use with `#[serde(with = "crate::types::dollars")]` on fields read by
/// people or external tools.
pub mod dollars {
    use super::Money;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    /// Writes cents as dollars
    ///
    /// # Errors
    ///
    /// Returns the serializer's error.
    #[allow(clippy::cast_precision_loss, clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(money: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(money.cents() as f64 / 100.0)
    }

    /// Reads dollars, rounding to the nearest cent
    ///
    /// # Errors
    ///
    /// Fails for negative, non-finite or out-of-range amounts.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        let cents = (amount * 100.0).round();
        if !cents.is_finite() || cents < 0.0 || cents > u64::MAX as f64 {
            return Err(D::Error::custom(format!("invalid dollar amount: {amount}")));
        }
        Ok(Money::from_cents(cents as u64))
    }
}

/// Parses a `YYYY-MM-DD` date
///
/// # Errors
///
/// Returns [`ReservationError::Validation`] for malformed dates.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ReservationError::validation(format!("Invalid date (expected YYYY-MM-DD): {s}")))
}

/// Accepted payment methods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Credit card
    Credit,
    /// Cash at the front desk
    Cash,
    /// Online transfer
    Online,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Credit => "credit",
            Self::Cash => "cash",
            Self::Online => "online",
        })
    }
}

impl FromStr for PaymentMethod {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "credit" => Ok(Self::Credit),
            "cash" => Ok(Self::Cash),
            "online" => Ok(Self::Online),
            _ => Err(ReservationError::validation("Invalid payment method")),
        }
    }
}

/// Reservation lifecycle
///
/// ```text
/// Pending ──► Confirmed ──► Cancelled
///    │                         ▲
///    └──► PaymentFailed ───────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Created, cost computed, slot held
    Pending,
    /// Payment succeeded
    Confirmed,
    /// Terminal; slot released
    Cancelled,
    /// Payment failed; slot still held until cancelled
    PaymentFailed,
}

impl ReservationStatus {
    /// True while the reservation holds its court slot
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::PaymentFailed => "payment_failed",
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn money_display() {
        assert_eq!(Money::from_cents(100).to_string(), "$1.00");
        assert_eq!(Money::from_cents(1050).to_string(), "$10.50");
        assert_eq!(Money::from_dollars(42).to_string(), "$42.00");
    }

    #[test]
    fn money_parsing() {
        assert_eq!("20".parse::<Money>().unwrap(), Money::from_dollars(20));
        assert_eq!("20.0".parse::<Money>().unwrap(), Money::from_dollars(20));
        assert_eq!("20.5".parse::<Money>().unwrap(), Money::from_cents(2050));
        assert_eq!("$12.34".parse::<Money>().unwrap(), Money::from_cents(1234));
        assert!("-5".parse::<Money>().is_err());
        assert!("12.345".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
    }

    #[test]
    fn dollars_saturate_or_report_overflow() {
        assert_eq!(Money::from_dollars(u64::MAX / 10), Money::from_cents(u64::MAX));
        assert_eq!(Money::checked_from_dollars(u64::MAX / 10), None);
        assert_eq!(Money::checked_from_dollars(12), Some(Money::from_cents(1200)));
        assert_eq!(
            Money::from_cents(u64::MAX).saturating_add(Money::from_cents(1)),
            Money::from_cents(u64::MAX)
        );
    }

    #[test]
    fn prorating_hourly_rate() {
        let rate = Money::from_dollars(20);
        assert_eq!(rate.checked_mul_minutes(60), Some(Money::from_dollars(20)));
        assert_eq!(rate.checked_mul_minutes(90), Some(Money::from_dollars(30)));
        assert_eq!(Money::from_cents(25).checked_mul_minutes(30), Some(Money::from_cents(13)));
        assert_eq!(Money::from_cents(u64::MAX).checked_mul_minutes(120), None);
    }

    #[test]
    fn time_slot_parsing() {
        let slot: TimeSlot = "10:00-11:00".parse().unwrap();
        assert_eq!(slot.to_string(), "10:00-11:00");
        assert_eq!(slot.duration_minutes(), 60);

        let bare: TimeSlot = "09:00".parse().unwrap();
        assert_eq!(bare.to_string(), "09:00-10:00");

        assert!("11:00-10:00".parse::<TimeSlot>().is_err());
        assert!("25:00".parse::<TimeSlot>().is_err());
        assert!("23:30".parse::<TimeSlot>().is_err());
    }

    #[test]
    fn time_slot_serde_uses_text_and_validates() {
        let slot: TimeSlot = "10:00-11:30".parse().unwrap();
        let json = serde_json::to_string(&slot).unwrap();
        assert_eq!(json, "\"10:00-11:30\"");
        assert_eq!(serde_json::from_str::<TimeSlot>(&json).unwrap(), slot);

        assert!(serde_json::from_str::<TimeSlot>("\"11:00-10:00\"").is_err());
        assert!(serde_json::from_str::<TimeSlot>("\"10:00-10:00\"").is_err());
    }

    #[test]
    fn money_as_dollars() {
        #[derive(Serialize, Deserialize)]
        struct Priced {
            #[serde(with = "dollars")]
            amount: Money,
        }

        let json = serde_json::to_value(Priced { amount: Money::from_cents(2050) }).unwrap();
        assert_eq!(json["amount"], 20.5);

        let parsed: Priced = serde_json::from_str(r#"{"amount": 20.499}"#).unwrap();
        assert_eq!(parsed.amount, Money::from_cents(2050));
        assert!(serde_json::from_str::<Priced>(r#"{"amount": -1.0}"#).is_err());
    }

    #[test]
    fn time_slot_overlap() {
        let ten: TimeSlot = "10:00-11:00".parse().unwrap();
        let half: TimeSlot = "10:30-11:30".parse().unwrap();
        let eleven: TimeSlot = "11:00-12:00".parse().unwrap();

        assert!(ten.overlaps(&half));
        assert!(half.overlaps(&ten));
        assert!(!ten.overlaps(&eleven));
        assert!(ten.overlaps(&ten));
    }

    #[test]
    fn identifiers_reject_blank() {
        assert!(CourtId::try_new("").is_err());
        assert!(CourtId::try_new("   ").is_err());
        assert!(ReservationId::try_new("").is_err());
        assert_eq!(CourtId::try_new("C1").unwrap().as_str(), "C1");
    }

    #[test]
    fn payment_method_parsing() {
        assert_eq!("CREDIT".parse::<PaymentMethod>().unwrap(), PaymentMethod::Credit);
        assert_eq!(" cash ".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn dates() {
        assert_eq!(
            parse_date("2024-06-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert!(parse_date("06/01/2024").is_err());
    }

    #[test]
    fn status_activity() {
        assert!(ReservationStatus::Pending.is_active());
        assert!(ReservationStatus::Confirmed.is_active());
        assert!(ReservationStatus::PaymentFailed.is_active());
        assert!(!ReservationStatus::Cancelled.is_active());
        assert_eq!(ReservationStatus::PaymentFailed.to_string(), "payment_failed");
    }
}
