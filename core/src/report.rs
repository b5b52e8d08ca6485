//! Report generation.
//!
//! A read-only aggregation over the engine: counts by status, per-court
//! bookings and revenue. Revenue only counts confirmed reservations.

use crate::engine::ReservationSystem;
use crate::environment::Clock;
use crate::log::{TransactionKind, TransactionLog};
use crate::metrics;
use crate::types::{CourtId, Money, ReservationStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-court line of a report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourtSummary {
    /// Court
    pub court_id: CourtId,
    /// Reservations on this court, any status
    pub reservation_count: usize,
    /// Confirmed revenue on this court, in dollars
    #[serde(with = "crate::types::dollars")]
    pub revenue: Money,
}

/// Reservation counts by status
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    /// Awaiting payment
    pub pending: usize,
    /// Paid
    pub confirmed: usize,
    /// Cancelled
    pub cancelled: usize,
    /// Payment declined
    pub payment_failed: usize,
}

impl StatusCounts {
    fn add(&mut self, status: ReservationStatus) {
        match status {
            ReservationStatus::Pending => self.pending += 1,
            ReservationStatus::Confirmed => self.confirmed += 1,
            ReservationStatus::Cancelled => self.cancelled += 1,
            ReservationStatus::PaymentFailed => self.payment_failed += 1,
        }
    }
}

/// Summary of engine state at one point in time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Day the report was produced
    pub date: NaiveDate,
    /// Registered courts
    pub total_courts: usize,
    /// One line per court, ordered by court id
    pub per_court: Vec<CourtSummary>,
    /// Reservations by status
    pub by_status: StatusCounts,
    /// All reservations, cancelled ones included
    pub total_reservations: usize,
    /// Confirmed reservations
    pub confirmed_reservations: usize,
    /// Sum of confirmed reservation costs, in dollars
    #[serde(with = "crate::types::dollars")]
    pub total_revenue: Money,
}

impl Report {
    /// A report with zero counts
    #[must_use]
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_courts: 0,
            per_court: Vec::new(),
            by_status: StatusCounts::default(),
            total_reservations: 0,
            confirmed_reservations: 0,
            total_revenue: Money::ZERO,
        }
    }
}

/// Aggregates the engine's courts and reservations into a [`Report`]
#[must_use]
pub fn summarize(system: &ReservationSystem, date: NaiveDate) -> Report {
    let mut per_court: BTreeMap<CourtId, CourtSummary> = system
        .courts()
        .map(|court| {
            (
                court.id().clone(),
                CourtSummary {
                    court_id: court.id().clone(),
                    reservation_count: 0,
                    revenue: Money::ZERO,
                },
            )
        })
        .collect();

    let mut report = Report::empty(date);
    report.total_courts = per_court.len();

    for reservation in system.reservations() {
        report.total_reservations += 1;
        report.by_status.add(reservation.status());

        let line = per_court
            .entry(reservation.court_id().clone())
            .or_insert_with(|| CourtSummary {
                court_id: reservation.court_id().clone(),
                reservation_count: 0,
                revenue: Money::ZERO,
            });
        line.reservation_count += 1;

        if reservation.status() == ReservationStatus::Confirmed {
            let cost = reservation.total_cost();
            if report.total_revenue.checked_add(cost).is_none() {
                tracing::warn!(
                    reservation_id = %reservation.id(),
                    "Report revenue capped at the largest representable amount"
                );
            }
            line.revenue = line.revenue.saturating_add(cost);
            report.total_revenue = report.total_revenue.saturating_add(cost);
        }
    }

    report.confirmed_reservations = report.by_status.confirmed;
    report.per_court = per_court.into_values().collect();
    report
}

/// Produces reports and keeps its own audit trail of doing so.
///
/// The audit log is separate from the engine's; generating a report never
/// touches engine state.
pub struct ReportGenerator {
    clock: Arc<dyn Clock>,
    audit: TransactionLog,
}

impl ReportGenerator {
    /// Creates a generator dating reports with `clock`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            audit: TransactionLog::new(Arc::clone(&clock)),
            clock,
        }
    }

    /// Builds a report. An engine with nothing to report yields a zero report
    /// and a `failed` audit entry instead of an error.
    pub fn generate(&mut self, system: &ReservationSystem) -> Report {
        let report = summarize(system, self.today());
        self.record(report)
    }

    /// Day stamped on reports, from the generator's clock
    pub(crate) fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Appends the audit entry for a finished report and hands it back
    pub(crate) fn record(&mut self, report: Report) -> Report {
        let tx = TransactionLog::begin(TransactionKind::Report, None);

        if report.total_reservations == 0 {
            tracing::warn!("Report generation failed: no reservations to report");
            self.audit.fail_with(tx, None, "No reservations to report");
            metrics::record_operation("generate_report", false);
            return report;
        }

        tracing::info!(
            total_reservations = report.total_reservations,
            total_revenue = %report.total_revenue,
            "Report generated"
        );
        self.audit.complete(
            tx,
            Some(format!(
                "{} reservations, revenue {}",
                report.total_reservations, report.total_revenue
            )),
        );
        metrics::record_operation("generate_report", true);
        report
    }

    /// The generator's audit trail
    #[must_use]
    pub const fn audit_log(&self) -> &TransactionLog {
        &self.audit
    }
}

impl std::fmt::Debug for ReportGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportGenerator")
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::log::TransactionStatus;
    use crate::payment::SimulatedGateway;
    use crate::types::{PaymentMethod, ReservationId, TimeSlot};
    use chrono::{DateTime, Days, TimeZone, Utc};

    struct Fixed(DateTime<Utc>);

    impl Clock for Fixed {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(Fixed(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()))
    }

    fn court(id: &str) -> CourtId {
        CourtId::try_new(id).unwrap()
    }

    fn rid(id: &str) -> ReservationId {
        ReservationId::try_new(id).unwrap()
    }

    fn slot(s: &str) -> TimeSlot {
        s.parse().unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn revenue_counts_only_confirmed() {
        let mut system =
            ReservationSystem::new(clock(), Arc::new(SimulatedGateway::default()));
        system.add_court(court("C1"), Money::from_dollars(20)).unwrap();
        system.add_court(court("C2"), Money::from_dollars(25)).unwrap();

        system
            .make_reservation(rid("R1"), "Alice", &court("C1"), day(), slot("10:00-11:00"))
            .unwrap();
        system.process_payment(&rid("R1"), PaymentMethod::Cash).unwrap();
        system
            .make_reservation(rid("R2"), "Bob", &court("C1"), day(), slot("11:00-12:00"))
            .unwrap();
        system.cancel_reservation(&rid("R2")).unwrap();
        system
            .make_reservation(rid("R3"), "Cara", &court("C2"), day(), slot("09:00-10:00"))
            .unwrap();

        let report = summarize(&system, day());

        assert_eq!(report.total_courts, 2);
        assert_eq!(report.total_reservations, 3);
        assert_eq!(report.confirmed_reservations, 1);
        assert_eq!(report.total_revenue, Money::from_dollars(20));
        assert_eq!(
            report.by_status,
            StatusCounts {
                pending: 1,
                confirmed: 1,
                cancelled: 1,
                payment_failed: 0,
            }
        );
        assert_eq!(
            report.per_court,
            vec![
                CourtSummary {
                    court_id: court("C1"),
                    reservation_count: 2,
                    revenue: Money::from_dollars(20),
                },
                CourtSummary {
                    court_id: court("C2"),
                    reservation_count: 1,
                    revenue: Money::ZERO,
                },
            ]
        );
    }

    #[test]
    fn empty_engine_yields_zero_report_and_failed_audit() {
        let system = ReservationSystem::new(clock(), Arc::new(SimulatedGateway::default()));
        let mut generator = ReportGenerator::new(clock());

        let report = generator.generate(&system);

        assert_eq!(report, Report::empty(day()));
        assert_eq!(system.log().len(), 0);
        let audit = generator.audit_log().last().unwrap();
        assert_eq!(audit.kind(), TransactionKind::Report);
        assert_eq!(audit.status(), TransactionStatus::Failed);
        assert_eq!(audit.error(), Some("No reservations to report"));
    }

    #[test]
    fn generating_does_not_touch_engine_log() {
        let mut system =
            ReservationSystem::new(clock(), Arc::new(SimulatedGateway::default()));
        system.add_court(court("C1"), Money::from_dollars(20)).unwrap();
        system
            .make_reservation(rid("R1"), "Alice", &court("C1"), day(), slot("10:00-11:00"))
            .unwrap();
        let entries_before = system.log().len();

        let mut generator = ReportGenerator::new(clock());
        let report = generator.generate(&system);

        assert_eq!(report.date, day());
        assert_eq!(report.total_reservations, 1);
        assert_eq!(system.log().len(), entries_before);
        assert!(generator.audit_log().last().unwrap().is_completed());
    }

    #[test]
    fn report_serializes_with_camel_case_keys_and_dollar_amounts() {
        let json = serde_json::to_value(Report::empty(day())).unwrap();
        assert_eq!(json["date"], "2024-06-01");
        assert_eq!(json["totalReservations"], 0);
        assert!(json["perCourt"].as_array().unwrap().is_empty());

        let mut system =
            ReservationSystem::new(clock(), Arc::new(SimulatedGateway::default()));
        system.add_court(court("C1"), Money::from_dollars(20)).unwrap();
        system
            .make_reservation(rid("R1"), "Alice", &court("C1"), day(), slot("10:00-11:30"))
            .unwrap();
        system.process_payment(&rid("R1"), PaymentMethod::Cash).unwrap();

        let report = summarize(&system, day());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["totalRevenue"], 30.0);
        assert_eq!(json["perCourt"][0]["revenue"], 30.0);
        assert_eq!(serde_json::from_value::<Report>(json).unwrap(), report);
    }

    #[test]
    fn revenue_saturates_instead_of_dropping_reservations() {
        let mut system =
            ReservationSystem::new(clock(), Arc::new(SimulatedGateway::default()));
        let big = court("BIG");
        system
            .add_court(big.clone(), Money::from_cents(u64::MAX / 60 - 1))
            .unwrap();

        for n in 0..61 {
            let date = day().checked_add_days(Days::new(n)).unwrap();
            let id = ReservationId::sequential(n);
            system
                .make_reservation(id.clone(), "Alice", &big, date, slot("10:00-11:00"))
                .unwrap();
            system.process_payment(&id, PaymentMethod::Cash).unwrap();
        }

        let report = summarize(&system, day());

        assert_eq!(report.confirmed_reservations, 61);
        assert_eq!(report.total_revenue, Money::from_cents(u64::MAX));
        assert_eq!(report.per_court[0].revenue, Money::from_cents(u64::MAX));
    }
}
