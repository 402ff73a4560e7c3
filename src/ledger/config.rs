// Ledger configuration - thresholds, caps and the payout rule

use crate::ledger::{Amount, LedgerError};
use serde::{Deserialize, Serialize};

/// Which premium figure the crediting sweep multiplies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutBasis {
    /// The amount declared at purchase, even when part of it was refunded
    Declared,
    /// Only the portion the pool kept after the overpayment refund
    Retained,
}

/// Configuration for a flight ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Membership size past which admissions need external multi-party approval
    pub consensus_threshold: u64,
    /// Number of airlines (deployer included) admitted already funded
    pub bootstrap_airlines: u64,
    /// Capital contribution required from an airline to become active
    pub funding_threshold: Amount,
    /// Largest premium the pool keeps per purchase; the rest is refunded
    pub premium_cap: Amount,
    /// Payout multiplier in basis points (15_000 = 150%)
    pub payout_multiplier_bps: u32,
    pub payout_basis: PayoutBasis,
}

impl LedgerConfig {
    /// Create a new config with builder pattern
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_consensus_threshold(mut self, threshold: u64) -> Self {
        self.consensus_threshold = threshold;
        self
    }

    pub fn with_bootstrap_airlines(mut self, count: u64) -> Self {
        self.bootstrap_airlines = count;
        self
    }

    pub fn with_funding_threshold(mut self, amount: Amount) -> Self {
        self.funding_threshold = amount;
        self
    }

    pub fn with_premium_cap(mut self, amount: Amount) -> Self {
        self.premium_cap = amount;
        self
    }

    pub fn with_payout_multiplier_bps(mut self, bps: u32) -> Self {
        self.payout_multiplier_bps = bps;
        self
    }

    pub fn with_payout_basis(mut self, basis: PayoutBasis) -> Self {
        self.payout_basis = basis;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.consensus_threshold == 0 {
            return Err(LedgerError::InvalidConfig(
                "consensus_threshold must be > 0".to_string(),
            ));
        }
        if self.bootstrap_airlines == 0 {
            return Err(LedgerError::InvalidConfig(
                "bootstrap_airlines must be > 0 so the deployer starts funded".to_string(),
            ));
        }
        if self.premium_cap.is_zero() {
            return Err(LedgerError::InvalidConfig(
                "premium_cap must be > 0".to_string(),
            ));
        }
        if self.payout_multiplier_bps == 0 {
            return Err(LedgerError::InvalidConfig(
                "payout_multiplier_bps must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            consensus_threshold: 5,
            bootstrap_airlines: 4,
            funding_threshold: Amount::units(10),
            premium_cap: Amount::units(1),
            payout_multiplier_bps: 15_000,
            payout_basis: PayoutBasis::Declared,
        }
    }
}
