// Ledger errors - every rejected operation surfaces one of these

use crate::ledger::Amount;
use thiserror::Error;

/// Reasons a ledger operation is rejected
///
/// A rejected operation leaves the ledger exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ledger is not operational")]
    NotOperational,

    #[error("Caller is not the ledger owner")]
    NotOwner,

    #[error("Caller is not authorized to use app-facing entry points")]
    NotAuthorized,

    #[error("Airline is already registered")]
    AlreadyRegistered,

    #[error("Sponsoring caller is not a registered airline")]
    SponsorNotRegistered,

    #[error("Sponsoring caller has not provided funds")]
    SponsorNotFunded,

    #[error("Insufficient payment: required {required}, provided {provided}")]
    InsufficientPayment { required: Amount, provided: Amount },

    #[error("Airline has already provided funds")]
    AlreadyFunded,

    #[error("Caller is not a registered airline")]
    NotRegisteredAirline,

    #[error("Invalid amount: must be greater than zero")]
    InvalidAmount,

    #[error("No credits available for withdrawal")]
    NoCredits,

    #[error("Insufficient custody: pool holds {available}, required {required}")]
    InsufficientCustody { available: Amount, required: Amount },

    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("State export/import error: {0}")]
    StateError(String),
}
