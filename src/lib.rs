// flightsure - custodial ledger for flight-delay insurance
//
// Airlines join through a sponsored registry and pay in capital, passengers
// buy per-flight policies, delayed flights are credited at a fixed
// multiplier, and passengers withdraw their credit.

pub mod call;
pub mod gateway;
pub mod identity;
pub mod insurance;
pub mod ledger;
pub mod registry;
pub mod settlement;
pub mod storage;

pub use ledger::{Amount, FlightLedger, LedgerConfig, LedgerError};
