use crate::identity::Address;
use crate::ledger::Amount;
use serde::{Deserialize, Serialize};

/// One passenger's insurance purchase for one flight
///
/// `amount` is the premium declared at purchase and drops to zero once the
/// policy has been credited. `retained` is what the pool kept after any
/// overpayment refund and never changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurancePolicy {
    position: u64,
    flight: String,
    passenger: Address,
    amount: Amount,
    retained: Amount,
}

impl InsurancePolicy {
    pub(crate) fn new(position: u64, flight: String, passenger: Address, amount: Amount, retained: Amount) -> Self {
        Self {
            position,
            flight,
            passenger,
            amount,
            retained,
        }
    }

    /// Sequence number in purchase order, starting at 0
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn flight(&self) -> &str {
        &self.flight
    }

    pub fn passenger(&self) -> &Address {
        &self.passenger
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn retained(&self) -> Amount {
        self.retained
    }

    /// Credited policies keep their record with a zero amount
    pub fn is_settled(&self) -> bool {
        self.amount.is_zero()
    }

    pub(crate) fn mark_settled(&mut self) {
        self.amount = Amount::ZERO;
    }
}
