// Policy book - append-only record of every purchase, indexed by flight

use crate::identity::Address;
use crate::insurance::InsurancePolicy;
use crate::ledger::{Amount, LedgerError, PayoutBasis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A payout computed by the crediting sweep, not yet applied
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyCredit {
    pub position: u64,
    pub passenger: Address,
    pub payout: Amount,
}

/// Append-only policy sequence
///
/// Records keep insertion order. The flight index maps a flight identifier
/// to the positions of its policies in that same order; it is derived data
/// and is rebuilt after deserialization.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PolicyBook {
    policies: Vec<InsurancePolicy>,
    #[serde(skip)]
    flight_index: HashMap<String, Vec<usize>>,
}

impl PolicyBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// All policies in purchase order
    pub fn policies(&self) -> &[InsurancePolicy] {
        &self.policies
    }

    pub fn get(&self, position: u64) -> Option<&InsurancePolicy> {
        usize::try_from(position).ok().and_then(|i| self.policies.get(i))
    }

    /// Policies for a flight in purchase order
    pub fn for_flight(&self, flight: &str) -> Vec<&InsurancePolicy> {
        self.flight_index
            .get(flight)
            .map(|positions| positions.iter().filter_map(|&i| self.policies.get(i)).collect())
            .unwrap_or_default()
    }

    /// Policies held by a passenger in purchase order
    pub fn for_passenger(&self, passenger: &Address) -> Vec<&InsurancePolicy> {
        self.policies
            .iter()
            .filter(|p| p.passenger() == passenger)
            .collect()
    }

    /// Premium the pool still holds against policies not yet credited
    pub fn committed_float(&self) -> Amount {
        self.policies
            .iter()
            .filter(|p| !p.is_settled())
            .fold(Amount::ZERO, |acc, p| acc.saturating_add(p.retained()))
    }

    /// Append a new policy and return its position
    pub fn append(
        &mut self,
        flight: &str,
        passenger: Address,
        amount: Amount,
        retained: Amount,
    ) -> u64 {
        let index = self.policies.len();
        let position = index as u64;
        self.policies.push(InsurancePolicy::new(
            position,
            flight.to_string(),
            passenger,
            amount,
            retained,
        ));
        self.flight_index
            .entry(flight.to_string())
            .or_default()
            .push(index);
        position
    }

    /// Compute payouts for every unsettled policy on `flight`
    ///
    /// Pure: nothing is marked settled until `settle` is called with the
    /// returned credits.
    pub fn plan_credits(
        &self,
        flight: &str,
        multiplier_bps: u32,
        basis: PayoutBasis,
    ) -> Result<Vec<PolicyCredit>, LedgerError> {
        let mut credits = Vec::new();
        for policy in self.for_flight(flight) {
            if policy.is_settled() {
                continue;
            }
            let premium = match basis {
                PayoutBasis::Declared => policy.amount(),
                PayoutBasis::Retained => policy.retained(),
            };
            let payout = premium
                .checked_mul_bps(multiplier_bps)
                .ok_or(LedgerError::Overflow("insurance payout"))?;
            credits.push(PolicyCredit {
                position: policy.position(),
                passenger: *policy.passenger(),
                payout,
            });
        }
        Ok(credits)
    }

    /// Zero the amount of each credited policy
    pub fn settle(&mut self, credits: &[PolicyCredit]) {
        for credit in credits {
            if let Some(policy) = usize::try_from(credit.position)
                .ok()
                .and_then(|i| self.policies.get_mut(i))
            {
                policy.mark_settled();
            }
        }
    }

    /// Rebuild the flight index (after deserialization)
    pub fn rebuild_index(&mut self) {
        self.flight_index.clear();
        for (index, policy) in self.policies.iter().enumerate() {
            self.flight_index
                .entry(policy.flight().to_string())
                .or_default()
                .push(index);
        }
    }
}
