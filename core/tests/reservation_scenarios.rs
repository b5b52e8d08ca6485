//! End-to-end flows through the public engine API.

#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use courtbook_core::{
    Clock, ErrorKind, Money, PaymentMethod, ReportGenerator, ReservationError, ReservationStatus,
    SharedReservationSystem, TransactionKind, TransactionStatus,
};
use courtbook_testing::helpers::{court, day, init_tracing, reservation, slot};
use courtbook_testing::{EngineFixture, FixedClock, GatewayCall, ScriptedGateway, test_clock};
use std::sync::Arc;

#[test]
fn double_booking_is_rejected_and_schedule_keeps_one_slot() {
    init_tracing();
    let mut system = EngineFixture::new().with_court("C1", 20).build().unwrap();

    let r1 = system
        .make_reservation(reservation("R1"), "Alice", &court("C1"), day(1), slot("10:00-11:00"))
        .unwrap();
    assert_eq!(r1.total_cost(), Money::from_dollars(20));
    assert_eq!(r1.status(), ReservationStatus::Pending);

    let err = system
        .make_reservation(reservation("R2"), "Bob", &court("C1"), day(1), slot("10:00-11:00"))
        .unwrap_err();

    assert_eq!(err.code(), "C001");
    assert_eq!(
        err.to_string(),
        "[C001] Court C1 is unavailable at 10:00-11:00 on 2024-06-01"
    );
    assert_eq!(
        system.court(&court("C1")).unwrap().booked_slots(day(1)),
        vec![slot("10:00-11:00")]
    );
}

#[test]
fn overlapping_slot_is_unavailable() {
    let mut system = EngineFixture::new().with_court("C1", 20).build().unwrap();
    system
        .make_reservation(reservation("R1"), "Alice", &court("C1"), day(1), slot("10:00-11:00"))
        .unwrap();

    assert!(!system
        .is_available(&court("C1"), day(1), &slot("10:30-11:30"))
        .unwrap());
    assert!(system
        .is_available(&court("C1"), day(1), &slot("11:00-12:00"))
        .unwrap());
    assert!(system
        .is_available(&court("C1"), day(2), &slot("10:00-11:00"))
        .unwrap());
}

#[test]
fn cancellation_makes_the_slot_available_again() {
    let mut system = EngineFixture::new().with_court("C1", 20).build().unwrap();
    system
        .make_reservation(reservation("R1"), "Alice", &court("C1"), day(1), slot("10:00-11:00"))
        .unwrap();

    system.cancel_reservation(&reservation("R1")).unwrap();

    assert_eq!(
        system.reservation(&reservation("R1")).unwrap().status(),
        ReservationStatus::Cancelled
    );
    assert!(system
        .is_available(&court("C1"), day(1), &slot("10:00-11:00"))
        .unwrap());
}

#[test]
fn cancelling_an_unknown_reservation_only_logs_failures() {
    let mut system = EngineFixture::new().with_court("C1", 20).build().unwrap();
    let before = system.log().len();

    let err = system.cancel_reservation(&reservation("R-unknown")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "[N001] Reservation R-unknown does not exist");
    assert_eq!(system.log().len(), before + 1);
    let last = system.log().last().unwrap();
    assert_eq!(last.kind(), TransactionKind::CancelReservation);
    assert_eq!(last.status(), TransactionStatus::Failed);
    assert_eq!(last.subject(), Some("R-unknown"));
}

#[test]
fn report_counts_cancelled_but_bills_only_confirmed() {
    let mut system = EngineFixture::new().with_court("C1", 20).build().unwrap();
    system
        .make_reservation(reservation("R1"), "Alice", &court("C1"), day(1), slot("10:00-11:00"))
        .unwrap();
    system
        .process_payment(&reservation("R1"), PaymentMethod::Cash)
        .unwrap();
    system
        .make_reservation(reservation("R2"), "Bob", &court("C1"), day(1), slot("11:00-12:00"))
        .unwrap();
    system.cancel_reservation(&reservation("R2")).unwrap();

    let mut generator = ReportGenerator::new(Arc::new(test_clock()));
    let report = generator.generate(&system);

    assert_eq!(report.total_reservations, 2);
    assert_eq!(report.confirmed_reservations, 1);
    assert_eq!(report.by_status.cancelled, 1);
    assert_eq!(report.total_revenue, Money::from_dollars(20));
    assert_eq!(report.date.to_string(), "2025-01-01");
    assert!(generator.audit_log().last().unwrap().is_completed());
}

#[test]
fn engine_reports_are_dated_and_audited_by_the_injected_clock() {
    init_tracing();
    let at = Utc.with_ymd_and_hms(2024, 6, 3, 18, 0, 0).unwrap();
    let mut system = EngineFixture::new()
        .with_court("C1", 20)
        .with_clock(FixedClock::new(at))
        .build()
        .unwrap();
    system
        .make_reservation(reservation("R1"), "Alice", &court("C1"), day(3), slot("10:00-11:00"))
        .unwrap();
    let operations = system.log().len();

    let report = system.generate_report();

    assert_eq!(report.date, day(3));
    assert_eq!(report.total_reservations, 1);
    assert_eq!(system.log().len(), operations);
    let audit = system.report_log().last().unwrap();
    assert_eq!(audit.kind(), TransactionKind::Report);
    assert!(audit.is_completed());
    assert_eq!(audit.recorded_at(), at);
}

#[test]
fn declined_charge_keeps_the_slot_and_the_cost() {
    let gateway = Arc::new(ScriptedGateway::declining("insufficient funds"));
    let mut system = EngineFixture::new()
        .with_court("C1", 20)
        .with_gateway(gateway.clone())
        .build()
        .unwrap();
    system
        .make_reservation(reservation("R1"), "Alice", &court("C1"), day(1), slot("10:00-11:00"))
        .unwrap();

    let err = system
        .process_payment(&reservation("R1"), PaymentMethod::Credit)
        .unwrap_err();

    assert_eq!(
        err,
        ReservationError::PaymentFailed {
            reservation_id: reservation("R1"),
            amount: Money::from_dollars(20),
            reason: "Card declined: insufficient funds".to_string(),
        }
    );
    let r1 = system.reservation(&reservation("R1")).unwrap();
    assert_eq!(r1.status(), ReservationStatus::PaymentFailed);
    assert_eq!(r1.total_cost(), Money::from_dollars(20));
    assert!(!system
        .is_available(&court("C1"), day(1), &slot("10:00-11:00"))
        .unwrap());
    assert_eq!(gateway.calls().len(), 1);
}

#[test]
fn paying_twice_is_a_validation_error() {
    let mut system = EngineFixture::new().with_court("C1", 20).build().unwrap();
    system
        .make_reservation(reservation("R1"), "Alice", &court("C1"), day(1), slot("10:00-11:00"))
        .unwrap();
    system
        .process_payment(&reservation("R1"), PaymentMethod::Online)
        .unwrap();

    let err = system
        .process_payment(&reservation("R1"), PaymentMethod::Online)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        system.reservation(&reservation("R1")).unwrap().status(),
        ReservationStatus::Confirmed
    );
}

#[test]
fn cancelling_a_paid_reservation_refunds_it() {
    let gateway = Arc::new(ScriptedGateway::approving());
    let mut system = EngineFixture::new()
        .with_court("C1", 30)
        .with_gateway(gateway.clone())
        .build()
        .unwrap();
    system
        .make_reservation(reservation("R1"), "Alice", &court("C1"), day(3), slot("09:00-10:30"))
        .unwrap();
    let receipt = system
        .process_payment(&reservation("R1"), PaymentMethod::Cash)
        .unwrap();
    assert_eq!(receipt.amount, Money::from_dollars(45));

    system.cancel_reservation(&reservation("R1")).unwrap();

    assert_eq!(
        gateway.calls().last(),
        Some(&GatewayCall::Refund {
            transaction_id: receipt.transaction_id,
            amount: Money::from_dollars(45),
        })
    );
}

#[test]
fn failed_refund_leaves_reservation_confirmed_and_slot_held() {
    init_tracing();
    let gateway = Arc::new(ScriptedGateway::approving().with_failing_refunds());
    let mut system = EngineFixture::new()
        .with_court("C1", 20)
        .with_gateway(gateway.clone())
        .build()
        .unwrap();
    system
        .make_reservation(reservation("R1"), "Alice", &court("C1"), day(1), slot("10:00-11:00"))
        .unwrap();
    system
        .process_payment(&reservation("R1"), PaymentMethod::Cash)
        .unwrap();

    let err = system.cancel_reservation(&reservation("R1")).unwrap_err();

    assert_eq!(err.code(), "P002");
    assert_eq!(
        system.reservation(&reservation("R1")).unwrap().status(),
        ReservationStatus::Confirmed
    );
    assert!(!system
        .is_available(&court("C1"), day(1), &slot("10:00-11:00"))
        .unwrap());
    assert_eq!(gateway.refund_count(), 1);

    let kinds: Vec<(TransactionKind, TransactionStatus)> = system
        .log()
        .entries()
        .iter()
        .rev()
        .take(2)
        .map(|e| (e.kind(), e.status()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (TransactionKind::CancelReservation, TransactionStatus::Failed),
            (TransactionKind::Rollback, TransactionStatus::Completed),
        ]
    );
}

#[test]
fn log_sequences_are_dense_and_timestamped_by_the_clock() {
    let mut system = EngineFixture::new().with_court("C1", 20).build().unwrap();
    let _ = system.make_reservation(reservation("R1"), "", &court("C1"), day(1), slot("10:00"));
    system
        .make_reservation(reservation("R1"), "Alice", &court("C1"), day(1), slot("10:00"))
        .unwrap();

    let sequences: Vec<u64> = system.log().entries().iter().map(|e| e.sequence()).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert!(system
        .log()
        .entries()
        .iter()
        .all(|e| e.recorded_at() == test_clock().now()));
}

#[test]
fn audit_log_exports_as_json_lines() {
    let mut system = EngineFixture::new().with_court("C1", 20).build().unwrap();
    let _ = system.cancel_reservation(&reservation("R9"));

    let lines = system.log().to_json_lines().unwrap();
    let parsed: Vec<serde_json::Value> = lines
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0]["kind"], "add_court");
    assert_eq!(parsed[1]["status"], "failed");
    assert_eq!(parsed[1]["error_code"], "N001");
}

#[test]
fn shared_engine_serializes_callers() {
    let shared = SharedReservationSystem::new(
        EngineFixture::new().with_court("C1", 20).build().unwrap(),
    );
    let other = shared.clone();

    other
        .try_with(|system| {
            system
                .make_reservation(reservation("R1"), "Alice", &court("C1"), day(1), slot("10:00"))
                .map(|_| ())
        })
        .unwrap();

    let count = shared.with(|system| system.reservation_count()).unwrap();
    assert_eq!(count, 1);
}
