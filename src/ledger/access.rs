// Operational gate and access control

use crate::identity::Address;
use crate::ledger::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Owner identity, global kill-switch and the authorized-caller map
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Address,
    operational: bool,
    authorized_callers: HashMap<Address, bool>,
}

impl AccessControl {
    /// Gate for a freshly deployed ledger: operational, nobody authorized
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            operational: true,
            authorized_callers: HashMap::new(),
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn is_operational(&self) -> bool {
        self.operational
    }

    pub fn is_caller_authorized(&self, caller: &Address) -> bool {
        self.authorized_callers.get(caller).copied().unwrap_or(false)
    }

    pub fn require_operational(&self) -> Result<(), LedgerError> {
        if !self.operational {
            return Err(LedgerError::NotOperational);
        }
        Ok(())
    }

    pub fn require_owner(&self, caller: &Address) -> Result<(), LedgerError> {
        if caller != &self.owner {
            return Err(LedgerError::NotOwner);
        }
        Ok(())
    }

    pub fn require_authorized_caller(&self, caller: &Address) -> Result<(), LedgerError> {
        if !self.is_caller_authorized(caller) {
            return Err(LedgerError::NotAuthorized);
        }
        Ok(())
    }

    /// Flip the kill-switch. Works whether or not the ledger is operational.
    pub fn set_operating_status(&mut self, caller: &Address, operational: bool) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        self.operational = operational;
        Ok(())
    }

    pub fn set_caller_authorization(
        &mut self,
        caller: &Address,
        identity: Address,
        authorized: bool,
    ) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        if authorized {
            self.authorized_callers.insert(identity, true);
        } else {
            self.authorized_callers.remove(&identity);
        }
        Ok(())
    }

    /// Currently authorized identities
    pub fn authorized_callers(&self) -> Vec<&Address> {
        self.authorized_callers
            .iter()
            .filter(|(_, allowed)| **allowed)
            .map(|(addr, _)| addr)
            .collect()
    }
}
