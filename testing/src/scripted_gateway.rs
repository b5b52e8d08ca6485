//! Payment gateway double with scripted outcomes
//!
//! Lets a test decide up front whether charges and refunds succeed, and
//! records every call so assertions can check what the engine asked for.

#![allow(clippy::module_name_repetitions)]

use courtbook_core::payment::{GatewayError, GatewayResult, PaymentGateway, PaymentReceipt};
use courtbook_core::types::{Money, PaymentMethod, ReservationId};
use std::sync::{Mutex, PoisonError};

/// One call made against a [`ScriptedGateway`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayCall {
    /// `charge` was called
    Charge {
        /// Reservation being paid
        reservation_id: ReservationId,
        /// Amount requested
        amount: Money,
        /// Method requested
        method: PaymentMethod,
    },
    /// `refund` was called
    Refund {
        /// Gateway transaction being refunded
        transaction_id: String,
        /// Amount refunded
        amount: Money,
    },
}

/// Gateway double whose answers are fixed at construction
///
/// # Example
///
/// ```
/// use courtbook_testing::ScriptedGateway;
///
/// let gateway = ScriptedGateway::approving().with_failing_refunds();
/// assert!(gateway.calls().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    decline_charges: Option<String>,
    fail_refunds: bool,
    calls: Mutex<Vec<GatewayCall>>,
}

impl ScriptedGateway {
    /// Approves every charge and refund
    #[must_use]
    pub fn approving() -> Self {
        Self::default()
    }

    /// Declines every charge with `reason`
    #[must_use]
    pub fn declining(reason: impl Into<String>) -> Self {
        Self {
            decline_charges: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Makes every refund fail with [`GatewayError::Unavailable`]
    #[must_use]
    pub fn with_failing_refunds(mut self) -> Self {
        self.fail_refunds = true;
        self
    }

    /// Calls received so far, oldest first
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of refunds requested
    #[must_use]
    pub fn refund_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, GatewayCall::Refund { .. }))
            .count()
    }

    fn record(&self, call: GatewayCall) -> usize {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.push(call);
        calls.len()
    }
}

impl PaymentGateway for ScriptedGateway {
    fn charge(
        &self,
        reservation_id: &ReservationId,
        amount: Money,
        method: PaymentMethod,
    ) -> GatewayResult<PaymentReceipt> {
        let sequence = self.record(GatewayCall::Charge {
            reservation_id: reservation_id.clone(),
            amount,
            method,
        });

        if let Some(reason) = &self.decline_charges {
            return Err(GatewayError::Declined {
                reason: reason.clone(),
            });
        }

        Ok(PaymentReceipt {
            transaction_id: format!("test_txn_{sequence}"),
            reservation_id: reservation_id.clone(),
            amount,
            method,
        })
    }

    fn refund(&self, receipt: &PaymentReceipt) -> GatewayResult<()> {
        self.record(GatewayCall::Refund {
            transaction_id: receipt.transaction_id.clone(),
            amount: receipt.amount,
        });

        if self.fail_refunds {
            return Err(GatewayError::Unavailable);
        }
        Ok(())
    }
}
