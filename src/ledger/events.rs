// Ledger events and outbound transfers

use crate::identity::Address;
use crate::ledger::Amount;
use serde::{Deserialize, Serialize};

/// Why currency leaves the pool
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferKind {
    /// An airline's funding payment forwarded to the owner
    CapitalContribution,
    /// Premium above the cap handed back to the passenger
    OverpaymentRefund,
    /// Credit balance paid out to a passenger
    Withdrawal,
}

/// Currency owed to an external account, already debited from custody
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    id: u64,
    to: Address,
    amount: Amount,
    kind: TransferKind,
}

impl Transfer {
    pub(crate) fn new(id: u64, to: Address, amount: Amount, kind: TransferKind) -> Self {
        Self { id, to, amount, kind }
    }

    /// Sequence number, unique per ledger
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn to(&self) -> &Address {
        &self.to
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn kind(&self) -> TransferKind {
        self.kind
    }
}

/// Events emitted by the ledger for every applied state change
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    AirlineRegistered {
        airline: Address,
        sponsor: Address,
        funded: bool,
    },
    AirlineFunded {
        airline: Address,
        amount: Amount,
    },
    PolicyPurchased {
        position: u64,
        flight: String,
        passenger: Address,
        amount: Amount,
        refund: Amount,
    },
    InsureeCredited {
        flight: String,
        passenger: Address,
        payout: Amount,
    },
    CreditsWithdrawn {
        insuree: Address,
        amount: Amount,
    },
    PoolCapitalized {
        amount: Amount,
    },
    OperatingStatusChanged {
        operational: bool,
    },
    CallerAuthorizationChanged {
        identity: Address,
        authorized: bool,
    },
}
