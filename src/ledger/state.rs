// Flight ledger - the single owner of all pooled funds and accounting state

use crate::identity::Address;
use crate::insurance::{InsurancePolicy, PolicyBook};
use crate::ledger::{
    AccessControl, Amount, LedgerConfig, LedgerError, LedgerEvent, Transfer, TransferKind,
};
use crate::registry::{AirlineAccount, AirlineRegistry};
use crate::settlement::CreditLedger;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Outcome of a policy purchase
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub position: u64,
    /// Portion of the premium the pool kept
    pub retained: Amount,
    /// Portion handed back to the passenger
    pub refund: Amount,
}

/// Outcome of a crediting sweep
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreditSummary {
    pub policies_credited: usize,
    pub total_credited: Amount,
}

/// Snapshot of what the pool holds against what it owes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolvencyReport {
    pub custody: Amount,
    pub outstanding_credits: Amount,
    pub committed_float: Amount,
}

impl SolvencyReport {
    /// Outstanding credits fit inside custody minus the float held for
    /// policies not yet credited
    pub fn is_solvent(&self) -> bool {
        self.outstanding_credits <= self.custody.saturating_sub(self.committed_float)
    }
}

/// The flight insurance ledger
///
/// One instance exists per deployment. Every state-changing operation
/// validates all of its preconditions and checked arithmetic before the
/// first mutation, so a rejected call leaves no trace. Outbound currency is
/// never moved inline: it is debited from custody and queued as a
/// [`Transfer`] for the gateway to deliver once the operation has returned.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlightLedger {
    config: LedgerConfig,
    access: AccessControl,
    registry: AirlineRegistry,
    policies: PolicyBook,
    credits: CreditLedger,
    /// Currency currently held by the pool
    custody: Amount,
    /// Currency ever attached to calls
    total_received: Amount,
    /// Currency ever queued to leave the pool
    total_disbursed: Amount,
    outbox: Vec<Transfer>,
    next_transfer_id: u64,
    #[serde(skip)]
    events: Vec<LedgerEvent>,
}

impl FlightLedger {
    /// Deploy a ledger owned by `owner`
    ///
    /// The owner is admitted as the first airline, already funded.
    pub fn deploy(owner: Address, config: LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;

        let mut ledger = Self {
            config,
            access: AccessControl::new(owner),
            registry: AirlineRegistry::new(),
            policies: PolicyBook::new(),
            credits: CreditLedger::new(),
            custody: Amount::ZERO,
            total_received: Amount::ZERO,
            total_disbursed: Amount::ZERO,
            outbox: Vec::new(),
            next_transfer_id: 0,
            events: Vec::new(),
        };
        ledger.register_airline(owner, owner)?;

        info!(owner = %owner, "Flight ledger deployed");
        Ok(ledger)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ========================================================================
    // OPERATIONAL GATE & ACCESS CONTROL
    // ========================================================================

    pub fn owner(&self) -> &Address {
        self.access.owner()
    }

    pub fn is_operational(&self) -> bool {
        self.access.is_operational()
    }

    /// Owner-only kill-switch; the one mutation allowed while paused
    pub fn set_operating_status(&mut self, caller: &Address, operational: bool) -> Result<(), LedgerError> {
        self.access.set_operating_status(caller, operational)?;
        self.events.push(LedgerEvent::OperatingStatusChanged { operational });
        info!(operational, "Operating status changed");
        Ok(())
    }

    pub fn authorize_caller(&mut self, caller: &Address, identity: Address) -> Result<(), LedgerError> {
        self.access.set_caller_authorization(caller, identity, true)?;
        self.events.push(LedgerEvent::CallerAuthorizationChanged {
            identity,
            authorized: true,
        });
        info!(identity = %identity, "Caller authorized");
        Ok(())
    }

    pub fn deauthorize_caller(&mut self, caller: &Address, identity: Address) -> Result<(), LedgerError> {
        self.access.set_caller_authorization(caller, identity, false)?;
        self.events.push(LedgerEvent::CallerAuthorizationChanged {
            identity,
            authorized: false,
        });
        info!(identity = %identity, "Caller deauthorized");
        Ok(())
    }

    pub fn is_caller_authorized(&self, identity: &Address) -> bool {
        self.access.is_caller_authorized(identity)
    }

    /// Gate for app-facing entry points, composed by the gateway
    pub fn require_authorized_caller(&self, identity: &Address) -> Result<(), LedgerError> {
        self.access.require_authorized_caller(identity)
    }

    pub fn authorized_callers(&self) -> Vec<&Address> {
        self.access.authorized_callers()
    }

    // ========================================================================
    // MEMBERSHIP & CONSENSUS REGISTRY
    // ========================================================================

    /// Admit `candidate` on behalf of `caller`
    ///
    /// Once the registry is non-empty the caller must be a registered, funded
    /// airline. Collecting M-of-N approval before calling this is up to the
    /// embedding application; see [`Self::is_multi_party_consensus_required`].
    pub fn register_airline(&mut self, candidate: Address, caller: Address) -> Result<AirlineAccount, LedgerError> {
        self.access.require_operational()?;

        let account = self
            .registry
            .register(candidate, &caller, self.config.bootstrap_airlines)?;

        self.events.push(LedgerEvent::AirlineRegistered {
            airline: candidate,
            sponsor: caller,
            funded: account.has_provided_funds(),
        });
        info!(
            airline = %candidate,
            sponsor = %caller,
            funded = account.has_provided_funds(),
            count = self.registry.count(),
            "Airline registered"
        );
        Ok(account)
    }

    /// Capital contribution from a registered airline
    ///
    /// The whole payment is forwarded to the owner.
    pub fn fund(&mut self, airline: Address, payment: Amount) -> Result<(), LedgerError> {
        self.access.require_operational()?;
        self.registry
            .check_funding(&airline, payment, self.config.funding_threshold)?;

        let total_received = self
            .total_received
            .checked_add(payment)
            .ok_or(LedgerError::Overflow("total received"))?;
        let total_disbursed = self
            .total_disbursed
            .checked_add(payment)
            .ok_or(LedgerError::Overflow("total disbursed"))?;

        self.registry.mark_funded(&airline)?;
        self.total_received = total_received;
        self.total_disbursed = total_disbursed;
        let owner = *self.access.owner();
        self.queue_transfer(owner, payment, TransferKind::CapitalContribution);

        self.events.push(LedgerEvent::AirlineFunded {
            airline,
            amount: payment,
        });
        info!(airline = %airline, amount = %payment, "Airline funded");
        Ok(())
    }

    pub fn is_registered_airline(&self, airline: &Address) -> bool {
        self.registry.is_registered(airline)
    }

    pub fn is_airline_with_funds(&self, airline: &Address) -> bool {
        self.registry.has_provided_funds(airline)
    }

    pub fn is_multi_party_consensus_required(&self) -> bool {
        self.registry
            .is_consensus_required(self.config.consensus_threshold)
    }

    pub fn registered_airlines_count(&self) -> u64 {
        self.registry.count()
    }

    pub fn registry(&self) -> &AirlineRegistry {
        &self.registry
    }

    // ========================================================================
    // INSURANCE LEDGER
    // ========================================================================

    /// Insure `passenger` on `flight` with an attached premium of `amount`
    ///
    /// Anything above the premium cap is refunded. The policy still records
    /// the full declared amount.
    pub fn buy(&mut self, flight: &str, passenger: Address, amount: Amount) -> Result<PurchaseReceipt, LedgerError> {
        self.access.require_operational()?;
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount);
        }

        let retained = amount.min(self.config.premium_cap);
        let refund = amount.saturating_sub(retained);

        let total_received = self
            .total_received
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("total received"))?;
        let custody = self
            .custody
            .checked_add(retained)
            .ok_or(LedgerError::Overflow("custody"))?;
        let total_disbursed = self
            .total_disbursed
            .checked_add(refund)
            .ok_or(LedgerError::Overflow("total disbursed"))?;

        let position = self.policies.append(flight, passenger, amount, retained);
        self.total_received = total_received;
        self.custody = custody;
        self.total_disbursed = total_disbursed;
        if !refund.is_zero() {
            self.queue_transfer(passenger, refund, TransferKind::OverpaymentRefund);
        }

        self.events.push(LedgerEvent::PolicyPurchased {
            position,
            flight: flight.to_string(),
            passenger,
            amount,
            refund,
        });
        info!(
            flight,
            passenger = %passenger,
            amount = %amount,
            refund = %refund,
            "Policy purchased"
        );

        Ok(PurchaseReceipt {
            position,
            retained,
            refund,
        })
    }

    /// Credit every unsettled policy on a delayed flight
    ///
    /// Each policy pays out once; repeated sweeps for the same flight add
    /// nothing.
    pub fn credit_insurees(&mut self, flight: &str) -> Result<CreditSummary, LedgerError> {
        self.access.require_operational()?;

        let planned = self.policies.plan_credits(
            flight,
            self.config.payout_multiplier_bps,
            self.config.payout_basis,
        )?;
        let additions: Vec<(Address, Amount)> =
            planned.iter().map(|c| (c.passenger, c.payout)).collect();
        self.credits.check_credits(&additions)?;

        let mut summary = CreditSummary::default();
        for credit in &planned {
            self.credits.credit(credit.passenger, credit.payout, flight)?;
            summary.policies_credited += 1;
            summary.total_credited = summary.total_credited.saturating_add(credit.payout);

            self.events.push(LedgerEvent::InsureeCredited {
                flight: flight.to_string(),
                passenger: credit.passenger,
                payout: credit.payout,
            });
            debug!(flight, passenger = %credit.passenger, payout = %credit.payout, "Insuree credited");
        }
        self.policies.settle(&planned);

        info!(
            flight,
            policies = summary.policies_credited,
            total = %summary.total_credited,
            "Crediting sweep complete"
        );
        Ok(summary)
    }

    pub fn policies(&self) -> &[InsurancePolicy] {
        self.policies.policies()
    }

    pub fn policies_for_flight(&self, flight: &str) -> Vec<&InsurancePolicy> {
        self.policies.for_flight(flight)
    }

    pub fn policies_for_passenger(&self, passenger: &Address) -> Vec<&InsurancePolicy> {
        self.policies.for_passenger(passenger)
    }

    // ========================================================================
    // CREDIT & SETTLEMENT LEDGER
    // ========================================================================

    /// Pay out an insuree's whole credit balance
    ///
    /// Payouts come out of custody only. Airline funding is forwarded to the
    /// owner, so under `PayoutBasis::Declared` a credit above the retained
    /// premium can only be paid once the owner has added pool capital with
    /// [`FlightLedger::capitalize`]; until then this returns
    /// `LedgerError::InsufficientCustody` and the credit is left untouched.
    pub fn withdraw(&mut self, insuree: Address) -> Result<Amount, LedgerError> {
        self.access.require_operational()?;

        let amount = self.credits.check_withdrawal(&insuree)?;
        let custody = self
            .custody
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientCustody {
                available: self.custody,
                required: amount,
            })?;
        let total_disbursed = self
            .total_disbursed
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("total disbursed"))?;

        // Balance goes to zero before the transfer is queued
        self.credits.take(&insuree)?;
        self.custody = custody;
        self.total_disbursed = total_disbursed;
        self.queue_transfer(insuree, amount, TransferKind::Withdrawal);

        self.events.push(LedgerEvent::CreditsWithdrawn { insuree, amount });
        info!(insuree = %insuree, amount = %amount, "Credits withdrawn");
        Ok(amount)
    }

    pub fn credit_of(&self, account: &Address) -> Amount {
        self.credits.balance(account)
    }

    pub fn credits(&self) -> &CreditLedger {
        &self.credits
    }

    // ========================================================================
    // CUSTODY
    // ========================================================================

    /// Owner moves currency into the pool to back payouts
    pub fn capitalize(&mut self, caller: &Address, value: Amount) -> Result<(), LedgerError> {
        self.access.require_operational()?;
        self.access.require_owner(caller)?;
        if value.is_zero() {
            return Err(LedgerError::InvalidAmount);
        }

        let total_received = self
            .total_received
            .checked_add(value)
            .ok_or(LedgerError::Overflow("total received"))?;
        let custody = self
            .custody
            .checked_add(value)
            .ok_or(LedgerError::Overflow("custody"))?;

        self.total_received = total_received;
        self.custody = custody;

        self.events.push(LedgerEvent::PoolCapitalized { amount: value });
        info!(amount = %value, "Pool capitalized");
        Ok(())
    }

    pub fn custody(&self) -> Amount {
        self.custody
    }

    pub fn total_received(&self) -> Amount {
        self.total_received
    }

    pub fn total_disbursed(&self) -> Amount {
        self.total_disbursed
    }

    /// Every unit received is either still held or queued out
    pub fn is_conserved(&self) -> bool {
        self.custody.checked_add(self.total_disbursed) == Some(self.total_received)
    }

    pub fn solvency(&self) -> SolvencyReport {
        SolvencyReport {
            custody: self.custody,
            outstanding_credits: self.credits.total_outstanding(),
            committed_float: self.policies.committed_float(),
        }
    }

    fn queue_transfer(&mut self, to: Address, amount: Amount, kind: TransferKind) {
        let id = self.next_transfer_id;
        self.next_transfer_id = self.next_transfer_id.wrapping_add(1);
        debug!(id, to = %to, amount = %amount, ?kind, "Transfer queued");
        self.outbox.push(Transfer::new(id, to, amount, kind));
    }

    /// Transfers queued but not yet handed to the gateway
    pub fn pending_transfers(&self) -> &[Transfer] {
        &self.outbox
    }

    /// Hand all queued transfers to the caller (clears the queue)
    pub fn drain_transfers(&mut self) -> Vec<Transfer> {
        std::mem::take(&mut self.outbox)
    }

    /// Put undelivered transfers back at the front of the queue
    ///
    /// Custody was debited when they were first queued, so nothing is
    /// re-counted.
    pub fn requeue_transfers(&mut self, mut transfers: Vec<Transfer>) {
        if transfers.is_empty() {
            return;
        }
        warn!(count = transfers.len(), "Undelivered transfers requeued");
        transfers.append(&mut self.outbox);
        self.outbox = transfers;
    }

    /// Poll for events (clears the event queue)
    pub fn poll_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // SERIALIZATION
    // ========================================================================

    /// Serialize the ledger to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        postcard::to_allocvec(self).map_err(|e| LedgerError::StateError(e.to_string()))
    }

    /// Deserialize a ledger from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        let mut ledger: FlightLedger =
            postcard::from_bytes(bytes).map_err(|e| LedgerError::StateError(e.to_string()))?;
        ledger.policies.rebuild_index();
        Ok(ledger)
    }
}
