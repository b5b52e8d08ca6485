//! Courtbook Demo
//!
//! Drives the reservation engine through a day at the facility: registering
//! courts, listing free slots, booking, paying, cancelling and reporting.
//! Expected failures (a double booking, a declined credit card, an unknown
//! reservation) are printed and the walkthrough carries on.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p courtbook-demo
//!
//! # Tighter credit limit, verbose engine logs
//! COURTBOOK_CREDIT_LIMIT=25 RUST_LOG=courtbook_core=debug cargo run -p courtbook-demo
//! ```

use chrono::{Days, NaiveDate};
use courtbook_core::{
    Clock, Config, CourtId, Money, PaymentMethod, ReservationId, ReservationSystem,
    SimulatedGateway, SystemClock, TimeSlot, metrics,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "warn,courtbook_core={level},courtbook_demo={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Install the Prometheus recorder; rendered at the end instead of served
    let prometheus = PrometheusBuilder::new().install_recorder()?;
    metrics::register_metrics();

    tracing::info!(
        opening_hour = config.opening_hour,
        closing_hour = config.closing_hour,
        slot_minutes = config.slot_minutes,
        credit_limit = %config.credit_limit,
        "Configuration loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut system = ReservationSystem::with_config(
        Arc::clone(&clock),
        Arc::new(SimulatedGateway::new(config.credit_limit)),
        config.engine_config()?,
    );
    let date = clock
        .now()
        .date_naive()
        .checked_add_days(Days::new(1))
        .ok_or("no tomorrow")?;

    section("Courts");
    for (id, rate) in [("A", "20.00"), ("B", "25.00"), ("C", "30.00")] {
        let court = system.add_court(id.parse()?, rate.parse()?)?;
        println!("  court {} at {}/hour", court.id(), court.hourly_rate());
    }

    section(&format!("Free slots on court A, {date}"));
    let free: Vec<String> = system
        .available_slots(&court("A")?, date)?
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("  {}", free.join("  "));

    section("Bookings");
    let alice = book(&mut system, "Alice", "A", date, "10:00")?;
    pay(&mut system, &alice, "cash")?;
    let _ = book(&mut system, "Bob", "A", date, "10:00-11:00");
    let _ = book(&mut system, "Bob", "A", date, "10:30-11:30");

    // Two hours on court C is above the default credit limit
    let cara = book(&mut system, "Cara", "C", date, "14:00-16:00")?;
    if pay(&mut system, &cara, "credit").is_err() {
        pay(&mut system, &cara, "online")?;
    }

    let bob = book(&mut system, "Bob", "B", date, "18:00")?;
    let alice_again = book(&mut system, "alice", "B", date, "09:00-09:30")?;
    pay(&mut system, &alice_again, "cash")?;

    section("Cancellations");
    for id in [bob.clone(), ReservationId::try_new("R99")?, bob] {
        match system.cancel_reservation(&id) {
            Ok(()) => println!("  cancelled {id}"),
            Err(e) => println!("  {e}"),
        }
    }
    println!(
        "  court B 18:00 free again: {}",
        system.is_available(&court("B")?, date, &"18:00".parse()?)?
    );

    section("Reservations for alice");
    for reservation in system.reservations_for_player("alice") {
        println!(
            "  {} court {} {} {} {} [{}]",
            reservation.id(),
            reservation.court_id(),
            reservation.date(),
            reservation.slot(),
            reservation.total_cost(),
            reservation.status()
        );
    }

    section("Report");
    let report = system.generate_report();
    println!("{}", serde_json::to_string_pretty(&report)?);

    section("Audit log");
    print!("{}", system.log().to_json_lines()?);
    print!("{}", system.report_log().to_json_lines()?);

    section("Metrics");
    print!("{}", prometheus.render());

    Ok(())
}

fn section(title: &str) {
    println!("\n== {title} ==");
}

fn court(id: &str) -> courtbook_core::Result<CourtId> {
    CourtId::try_new(id)
}

/// Books under a generated id, printing the outcome
fn book(
    system: &mut ReservationSystem,
    player: &str,
    court_id: &str,
    date: NaiveDate,
    slot: &str,
) -> courtbook_core::Result<ReservationId> {
    let slot: TimeSlot = slot.parse()?;
    let court_id = court(court_id)?;
    let id = system.next_reservation_id();

    match system.make_reservation(id, player, &court_id, date, slot) {
        Ok(reservation) => {
            println!(
                "  {} booked court {} at {} for {} ({})",
                reservation.player_name(),
                court_id,
                slot,
                reservation.total_cost(),
                reservation.id()
            );
            Ok(reservation.id().clone())
        }
        Err(e) => {
            println!("  {player}: {e}");
            Err(e)
        }
    }
}

/// Pays with a method given by name, printing the outcome
fn pay(
    system: &mut ReservationSystem,
    id: &ReservationId,
    method: &str,
) -> courtbook_core::Result<Money> {
    let method: PaymentMethod = method.parse()?;
    match system.process_payment(id, method) {
        Ok(receipt) => {
            println!(
                "  {id} paid {} by {method} ({})",
                receipt.amount, receipt.transaction_id
            );
            Ok(receipt.amount)
        }
        Err(e) => {
            println!("  {e}");
            Err(e)
        }
    }
}
