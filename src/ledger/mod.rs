// Ledger module - the process-scoped flight insurance ledger
// Owns membership, policies, credits, custody and the operational gate

mod access;
mod amount;
mod config;
mod error;
mod events;
mod state;

pub use access::AccessControl;
pub use amount::{Amount, AmountError, UNIT};
pub use config::{LedgerConfig, PayoutBasis};
pub use error::LedgerError;
pub use events::{LedgerEvent, Transfer, TransferKind};
pub use state::{CreditSummary, FlightLedger, PurchaseReceipt, SolvencyReport};
