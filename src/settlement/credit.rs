// Credit ledger - per-passenger balances produced by the crediting sweep

use crate::identity::Address;
use crate::ledger::{Amount, LedgerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditDirection {
    /// Payout added by a crediting sweep
    Credited,
    /// Balance paid out by a withdrawal
    Withdrawn,
}

/// History entry for a balance change
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRecord {
    account: Address,
    amount: Amount,
    direction: CreditDirection,
    /// Flight whose delay produced the credit
    flight: Option<String>,
}

impl CreditRecord {
    pub fn account(&self) -> &Address {
        &self.account
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn direction(&self) -> CreditDirection {
        self.direction
    }

    pub fn flight(&self) -> Option<&str> {
        self.flight.as_deref()
    }
}

/// Accumulated credit per passenger
///
/// Balances are accounting entries against the pool, not separate custody.
/// A zeroed balance is removed from the map.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreditLedger {
    balances: HashMap<Address, Amount>,
    history: Vec<CreditRecord>,
}

impl CreditLedger {
    /// Create an empty credit ledger
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // BALANCE QUERIES
    // ========================================================================

    pub fn balance(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Sum of all balances still owed
    pub fn total_outstanding(&self) -> Amount {
        self.balances
            .values()
            .fold(Amount::ZERO, |acc, b| acc.saturating_add(*b))
    }

    /// Accounts holding a non-zero balance
    pub fn accounts_with_credit(&self) -> Vec<&Address> {
        self.balances
            .iter()
            .filter(|(_, b)| !b.is_zero())
            .map(|(a, _)| a)
            .collect()
    }

    /// Total ever credited to an account
    pub fn total_credited(&self, account: &Address) -> Amount {
        self.sum_history(account, CreditDirection::Credited)
    }

    /// Total ever withdrawn by an account
    pub fn total_withdrawn(&self, account: &Address) -> Amount {
        self.sum_history(account, CreditDirection::Withdrawn)
    }

    fn sum_history(&self, account: &Address, direction: CreditDirection) -> Amount {
        self.history
            .iter()
            .filter(|r| r.direction == direction && &r.account == account)
            .fold(Amount::ZERO, |acc, r| acc.saturating_add(r.amount))
    }

    pub fn history(&self) -> &[CreditRecord] {
        &self.history
    }

    // ========================================================================
    // CREDITING
    // ========================================================================

    /// Check that a batch of additions fits without overflowing any balance
    pub fn check_credits(&self, additions: &[(Address, Amount)]) -> Result<(), LedgerError> {
        let mut projected: HashMap<Address, Amount> = HashMap::new();
        for (account, amount) in additions {
            let current = projected
                .get(account)
                .copied()
                .unwrap_or_else(|| self.balance(account));
            let next = current
                .checked_add(*amount)
                .ok_or(LedgerError::Overflow("credit balance"))?;
            projected.insert(*account, next);
        }
        Ok(())
    }

    /// Add a payout to an account's balance
    pub fn credit(&mut self, account: Address, amount: Amount, flight: &str) -> Result<Amount, LedgerError> {
        let next = self
            .balance(&account)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("credit balance"))?;
        self.balances.insert(account, next);
        self.history.push(CreditRecord {
            account,
            amount,
            direction: CreditDirection::Credited,
            flight: Some(flight.to_string()),
        });
        Ok(next)
    }

    // ========================================================================
    // WITHDRAWAL
    // ========================================================================

    /// Amount a withdrawal would pay out
    pub fn check_withdrawal(&self, account: &Address) -> Result<Amount, LedgerError> {
        let balance = self.balance(account);
        if balance.is_zero() {
            return Err(LedgerError::NoCredits);
        }
        Ok(balance)
    }

    /// Zero the balance and return what it held
    pub fn take(&mut self, account: &Address) -> Result<Amount, LedgerError> {
        let amount = self.check_withdrawal(account)?;
        self.balances.remove(account);
        self.history.push(CreditRecord {
            account: *account,
            amount,
            direction: CreditDirection::Withdrawn,
            flight: None,
        });
        Ok(amount)
    }
}
