// Airline registry - who underwrites, who sponsored them, who has paid in

use crate::identity::Address;
use crate::ledger::{Amount, LedgerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Membership record for one airline
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirlineAccount {
    is_registered: bool,
    has_provided_funds: bool,
}

impl AirlineAccount {
    pub fn is_registered(&self) -> bool {
        self.is_registered
    }

    pub fn has_provided_funds(&self) -> bool {
        self.has_provided_funds
    }
}

/// Set of admitted airlines plus the registration counter
///
/// Accounts are never removed, so `count` only grows and always equals the
/// number of registered entries.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AirlineRegistry {
    airlines: HashMap<Address, AirlineAccount>,
    /// Admission order, oldest first
    order: Vec<Address>,
    count: u64,
}

impl AirlineRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get(&self, airline: &Address) -> Option<&AirlineAccount> {
        self.airlines.get(airline)
    }

    pub fn is_registered(&self, airline: &Address) -> bool {
        self.airlines
            .get(airline)
            .map(|a| a.is_registered)
            .unwrap_or(false)
    }

    pub fn has_provided_funds(&self, airline: &Address) -> bool {
        self.airlines
            .get(airline)
            .map(|a| a.has_provided_funds)
            .unwrap_or(false)
    }

    /// True once membership reaches `threshold - 1`, from which point new
    /// admissions are expected to carry external multi-party approval.
    pub fn is_consensus_required(&self, threshold: u64) -> bool {
        self.count >= threshold.saturating_sub(1)
    }

    /// Registered airlines in admission order
    pub fn members(&self) -> &[Address] {
        &self.order
    }

    /// Number of members that have provided funds
    pub fn funded_count(&self) -> usize {
        self.airlines.values().filter(|a| a.has_provided_funds).count()
    }

    // ========================================================================
    // REGISTRATION
    // ========================================================================

    /// Check whether `sponsor` may admit `candidate`
    ///
    /// Returns whether the candidate joins already funded: true while fewer
    /// than `bootstrap_airlines` members exist. The very first admission
    /// (empty registry) needs no sponsor standing.
    pub fn check_admission(
        &self,
        candidate: &Address,
        sponsor: &Address,
        bootstrap_airlines: u64,
    ) -> Result<bool, LedgerError> {
        if !self.is_empty() {
            let standing = self.airlines.get(sponsor).copied().unwrap_or_default();
            if !standing.is_registered {
                return Err(LedgerError::SponsorNotRegistered);
            }
            if !standing.has_provided_funds {
                return Err(LedgerError::SponsorNotFunded);
            }
        }

        if self.is_registered(candidate) {
            return Err(LedgerError::AlreadyRegistered);
        }

        Ok(self.count < bootstrap_airlines)
    }

    /// Admit `candidate`; returns the stored account
    pub fn register(
        &mut self,
        candidate: Address,
        sponsor: &Address,
        bootstrap_airlines: u64,
    ) -> Result<AirlineAccount, LedgerError> {
        let funded = self.check_admission(&candidate, sponsor, bootstrap_airlines)?;
        let count = self
            .count
            .checked_add(1)
            .ok_or(LedgerError::Overflow("registry counter"))?;

        let account = AirlineAccount {
            is_registered: true,
            has_provided_funds: funded,
        };
        self.airlines.insert(candidate, account);
        self.order.push(candidate);
        self.count = count;

        Ok(account)
    }

    // ========================================================================
    // FUNDING GATE
    // ========================================================================

    /// Check a capital contribution from `airline` against the threshold
    pub fn check_funding(
        &self,
        airline: &Address,
        payment: Amount,
        threshold: Amount,
    ) -> Result<(), LedgerError> {
        if !self.is_registered(airline) {
            return Err(LedgerError::NotRegisteredAirline);
        }
        if self.has_provided_funds(airline) {
            return Err(LedgerError::AlreadyFunded);
        }
        if payment < threshold {
            return Err(LedgerError::InsufficientPayment {
                required: threshold,
                provided: payment,
            });
        }
        Ok(())
    }

    /// Mark a registered airline as funded
    pub fn mark_funded(&mut self, airline: &Address) -> Result<(), LedgerError> {
        let account = self
            .airlines
            .get_mut(airline)
            .filter(|a| a.is_registered)
            .ok_or(LedgerError::NotRegisteredAirline)?;
        account.has_provided_funds = true;
        Ok(())
    }
}
