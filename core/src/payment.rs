//! Payment capability.
//!
//! The engine charges and refunds through a [`PaymentGateway`] injected at
//! construction. [`SimulatedGateway`] is the stand-in used by the demo: it
//! declines credit charges above a configured limit and approves the rest.

use crate::types::{Money, PaymentMethod, ReservationId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Payment gateway result
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Payment gateway error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Charge or refund declined
    #[error("Card declined: {reason}")]
    Declined {
        /// Decline reason
        reason: String,
    },
    /// Gateway could not be reached
    #[error("Payment gateway unavailable")]
    Unavailable,
}

/// Proof of a successful charge
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Gateway transaction ID
    pub transaction_id: String,
    /// Reservation that was paid
    pub reservation_id: ReservationId,
    /// Amount charged
    pub amount: Money,
    /// Payment method used
    pub method: PaymentMethod,
}

/// Payment gateway trait
///
/// Abstraction over whatever actually moves money. Calls are synchronous.
pub trait PaymentGateway: Send + Sync {
    /// Charge `amount` for a reservation
    ///
    /// # Errors
    ///
    /// Returns error if the charge is declined.
    fn charge(
        &self,
        reservation_id: &ReservationId,
        amount: Money,
        method: PaymentMethod,
    ) -> GatewayResult<PaymentReceipt>;

    /// Refund a previous charge
    ///
    /// # Errors
    ///
    /// Returns error if the refund is declined.
    fn refund(&self, receipt: &PaymentReceipt) -> GatewayResult<()>;
}

/// Gateway that declines credit charges above a limit
#[derive(Debug)]
pub struct SimulatedGateway {
    credit_limit: Money,
    next_transaction: AtomicU64,
}

impl SimulatedGateway {
    /// Creates a gateway declining credit charges strictly above `credit_limit`
    #[must_use]
    pub const fn new(credit_limit: Money) -> Self {
        Self {
            credit_limit,
            next_transaction: AtomicU64::new(1),
        }
    }

    /// The credit limit in force
    #[must_use]
    pub const fn credit_limit(&self) -> Money {
        self.credit_limit
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(Money::from_dollars(50))
    }
}

impl PaymentGateway for SimulatedGateway {
    fn charge(
        &self,
        reservation_id: &ReservationId,
        amount: Money,
        method: PaymentMethod,
    ) -> GatewayResult<PaymentReceipt> {
        if method == PaymentMethod::Credit && amount > self.credit_limit {
            return Err(GatewayError::Declined {
                reason: format!("credit charges above {} are not accepted", self.credit_limit),
            });
        }

        let sequence = self.next_transaction.fetch_add(1, Ordering::Relaxed);
        let transaction_id = format!("sim_txn_{sequence:06}");

        tracing::debug!(
            reservation_id = %reservation_id,
            amount = amount.cents(),
            transaction_id = %transaction_id,
            "Simulated charge approved"
        );

        Ok(PaymentReceipt {
            transaction_id,
            reservation_id: reservation_id.clone(),
            amount,
            method,
        })
    }

    fn refund(&self, receipt: &PaymentReceipt) -> GatewayResult<()> {
        tracing::debug!(
            transaction_id = %receipt.transaction_id,
            amount = receipt.amount.cents(),
            "Simulated refund approved"
        );
        Ok(())
    }
}
