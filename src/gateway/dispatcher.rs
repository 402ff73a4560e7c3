// Dispatcher - the ledger's entry-point router
// Authenticates signed calls, guards against replay, applies the
// authorized-caller gate and routes each selector to a ledger operation

use crate::call::{CallCodec, CallId, CallValidator, CodecError, Operation, SignedCall, ValidationError};
use crate::identity::Address;
use crate::ledger::{Amount, CreditSummary, FlightLedger, LedgerError, PurchaseReceipt};
use crate::registry::AirlineAccount;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, warn};

// ============================================================================
// DISPATCHER CONFIG
// ============================================================================

/// Configuration for the dispatcher
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Require the relaying gateway to be an authorized caller for
    /// app-facing operations
    pub enforce_caller_authorization: bool,
    /// Reject calls older than this many seconds
    pub max_call_age_secs: Option<u64>,
    /// How far into the future a call timestamp may be
    pub future_tolerance_secs: u64,
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caller_authorization(mut self, enforce: bool) -> Self {
        self.enforce_caller_authorization = enforce;
        self
    }

    pub fn with_max_call_age_secs(mut self, secs: u64) -> Self {
        self.max_call_age_secs = Some(secs);
        self
    }

    pub fn with_future_tolerance_secs(mut self, secs: u64) -> Self {
        self.future_tolerance_secs = secs;
        self
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enforce_caller_authorization: true,
            max_call_age_secs: None,
            future_tolerance_secs: 300,
        }
    }
}

// ============================================================================
// DISPATCH ERROR
// ============================================================================

/// Errors that can occur while dispatching a call
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unrecognized call: {0}")]
    UnrecognizedCall(#[from] CodecError),

    #[error("Call rejected: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Duplicate call: {0} was already applied")]
    DuplicateCall(CallId),

    #[error("Operation {0} does not accept attached value")]
    NonPayable(&'static str),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

// ============================================================================
// DISPATCH OUTCOME
// ============================================================================

/// What an applied call did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Registered { airline: Address, account: AirlineAccount },
    Funded { airline: Address, amount: Amount },
    Purchased(PurchaseReceipt),
    Credited(CreditSummary),
    Withdrawn { insuree: Address, amount: Amount },
    OperatingStatusSet { operational: bool },
    AuthorizationChanged { identity: Address, authorized: bool },
    Capitalized { amount: Amount },
}

/// Receipt for an applied call
#[derive(Clone, Debug)]
pub struct DispatchReceipt {
    pub call_id: CallId,
    /// Entry point that ran; `fund` for a bare transfer
    pub operation: &'static str,
    pub outcome: DispatchOutcome,
}

// ============================================================================
// DISPATCHER
// ============================================================================

/// Routes signed calls into a [`FlightLedger`]
pub struct Dispatcher {
    config: DispatcherConfig,
    /// Ids of calls already applied, with the call timestamp
    processed: HashMap<CallId, u64>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            processed: HashMap::new(),
        }
    }

    /// Restore a dispatcher with a previously saved replay set
    pub fn with_processed(
        config: DispatcherConfig,
        processed: impl IntoIterator<Item = (CallId, u64)>,
    ) -> Self {
        Self {
            config,
            processed: processed.into_iter().collect(),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn has_processed(&self, id: &CallId) -> bool {
        self.processed.contains_key(id)
    }

    /// Replay set entries as `(call id, call timestamp)`
    pub fn processed_calls(&self) -> Vec<(CallId, u64)> {
        self.processed.iter().map(|(id, ts)| (*id, *ts)).collect()
    }

    /// Forget applied calls that the age window would now reject anyway
    ///
    /// Does nothing unless `max_call_age_secs` is set. Returns how many
    /// entries were dropped.
    pub fn prune_expired(&mut self, now: u64) -> usize {
        let Some(max_age) = self.config.max_call_age_secs else {
            return 0;
        };
        let before = self.processed.len();
        self.processed
            .retain(|_, timestamp| timestamp.saturating_add(max_age) >= now);
        before - self.processed.len()
    }

    /// Decode and dispatch a call received as wire bytes
    pub fn dispatch_bytes(
        &mut self,
        ledger: &mut FlightLedger,
        relayer: &Address,
        bytes: &[u8],
    ) -> Result<DispatchReceipt, DispatchError> {
        let signed = CallCodec::decode(bytes)?;
        self.dispatch(ledger, relayer, &signed)
    }

    /// Apply a signed call relayed by `relayer`
    ///
    /// A rejected call is not recorded and may be resubmitted.
    pub fn dispatch(
        &mut self,
        ledger: &mut FlightLedger,
        relayer: &Address,
        signed: &SignedCall,
    ) -> Result<DispatchReceipt, DispatchError> {
        if self.config.max_call_age_secs.is_some() {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let pruned = self.prune_expired(now);
            if pruned > 0 {
                debug!(pruned, "Expired replay entries dropped");
            }
        }

        let call = match self.config.max_call_age_secs {
            Some(max_age) => {
                CallValidator::validate_fresh(signed, self.config.future_tolerance_secs, max_age)?
            }
            None => CallValidator::validate(signed)?,
        };
        let call_id = call.id();

        if self.processed.contains_key(&call_id) {
            warn!(call = %call_id, "Replayed call rejected");
            return Err(DispatchError::DuplicateCall(call_id));
        }

        // Bare transfers are treated as funding
        let operation = call.operation().cloned().unwrap_or(Operation::Fund);

        if self.config.enforce_caller_authorization && operation.is_app_facing() {
            ledger.require_authorized_caller(relayer)?;
        }

        if !operation.is_payable() && !call.value().is_zero() {
            return Err(DispatchError::NonPayable(operation.name()));
        }

        let caller = *call.caller();
        let value = call.value();
        debug!(call = %call_id, caller = %caller, op = operation.name(), "Dispatching call");

        let outcome = match &operation {
            Operation::RegisterAirline { candidate } => {
                let account = ledger.register_airline(*candidate, caller)?;
                DispatchOutcome::Registered {
                    airline: *candidate,
                    account,
                }
            }
            Operation::Fund => {
                ledger.fund(caller, value)?;
                DispatchOutcome::Funded {
                    airline: caller,
                    amount: value,
                }
            }
            Operation::Buy { flight } => DispatchOutcome::Purchased(ledger.buy(flight, caller, value)?),
            Operation::CreditInsurees { flight } => {
                DispatchOutcome::Credited(ledger.credit_insurees(flight)?)
            }
            Operation::Withdraw => {
                let amount = ledger.withdraw(caller)?;
                DispatchOutcome::Withdrawn {
                    insuree: caller,
                    amount,
                }
            }
            Operation::SetOperatingStatus { operational } => {
                ledger.set_operating_status(&caller, *operational)?;
                DispatchOutcome::OperatingStatusSet {
                    operational: *operational,
                }
            }
            Operation::AuthorizeCaller { identity } => {
                ledger.authorize_caller(&caller, *identity)?;
                DispatchOutcome::AuthorizationChanged {
                    identity: *identity,
                    authorized: true,
                }
            }
            Operation::DeauthorizeCaller { identity } => {
                ledger.deauthorize_caller(&caller, *identity)?;
                DispatchOutcome::AuthorizationChanged {
                    identity: *identity,
                    authorized: false,
                }
            }
            Operation::Capitalize => {
                ledger.capitalize(&caller, value)?;
                DispatchOutcome::Capitalized { amount: value }
            }
        };

        self.processed.insert(call_id, call.timestamp());

        Ok(DispatchReceipt {
            call_id,
            operation: operation.name(),
            outcome,
        })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}
