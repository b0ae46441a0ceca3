//! fund ledger capability
//!
//! every transfer either succeeds fully or has no effect. the core calls
//! `transfer_in` for entry fees and `transfer_out` for the protocol fee and
//! for claimed rewards; custody of the pooled funds is the ledger's concern.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::types::{AccountId, Amount};

/// external fund transfer primitive
pub trait FundLedger: Send + Sync {
    /// move `amount` from `from` into the pool vault
    fn transfer_in(&self, from: &AccountId, amount: Amount) -> Result<()>;

    /// move `amount` from the pool vault to `to`
    fn transfer_out(&self, to: &AccountId, amount: Amount) -> Result<()>;
}

#[derive(Default)]
struct Balances {
    accounts: HashMap<AccountId, Amount>,
    vault: Amount,
}

/// in-memory ledger for tests and local runs
#[derive(Default)]
pub struct InMemoryLedger {
    inner: RwLock<Balances>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// credit an account from outside the system
    pub fn deposit(&self, account: &AccountId, amount: Amount) -> Result<()> {
        let mut inner = self.inner.write()?;
        let balance = inner.accounts.entry(*account).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| Error::Ledger("balance overflow".into()))?;
        Ok(())
    }

    pub fn balance_of(&self, account: &AccountId) -> Result<Amount> {
        Ok(self.inner.read()?.accounts.get(account).copied().unwrap_or(0))
    }

    pub fn vault_balance(&self) -> Result<Amount> {
        Ok(self.inner.read()?.vault)
    }
}

impl FundLedger for InMemoryLedger {
    fn transfer_in(&self, from: &AccountId, amount: Amount) -> Result<()> {
        let mut inner = self.inner.write()?;
        let have = inner.accounts.get(from).copied().unwrap_or(0);
        if have < amount {
            return Err(Error::InsufficientBalance { have, need: amount });
        }
        let vault = inner
            .vault
            .checked_add(amount)
            .ok_or_else(|| Error::Ledger("vault overflow".into()))?;
        inner.accounts.insert(*from, have - amount);
        inner.vault = vault;
        Ok(())
    }

    fn transfer_out(&self, to: &AccountId, amount: Amount) -> Result<()> {
        let mut inner = self.inner.write()?;
        if inner.vault < amount {
            return Err(Error::InsufficientBalance {
                have: inner.vault,
                need: amount,
            });
        }
        let current = inner.accounts.get(to).copied().unwrap_or(0);
        let credited = current
            .checked_add(amount)
            .ok_or_else(|| Error::Ledger("balance overflow".into()))?;
        inner.vault -= amount;
        inner.accounts.insert(*to, credited);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_in_out() {
        let ledger = InMemoryLedger::new();
        let alice = AccountId::from_label("alice");
        let bob = AccountId::from_label("bob");

        ledger.deposit(&alice, 100).unwrap();
        ledger.transfer_in(&alice, 40).unwrap();
        assert_eq!(ledger.balance_of(&alice).unwrap(), 60);
        assert_eq!(ledger.vault_balance().unwrap(), 40);

        ledger.transfer_out(&bob, 15).unwrap();
        assert_eq!(ledger.balance_of(&bob).unwrap(), 15);
        assert_eq!(ledger.vault_balance().unwrap(), 25);
    }

    #[test]
    fn test_failed_transfer_has_no_effect() {
        let ledger = InMemoryLedger::new();
        let alice = AccountId::from_label("alice");
        ledger.deposit(&alice, 3).unwrap();

        let err = ledger.transfer_in(&alice, 5).unwrap_err();
        assert_eq!(err, Error::InsufficientBalance { have: 3, need: 5 });
        assert_eq!(ledger.balance_of(&alice).unwrap(), 3);
        assert_eq!(ledger.vault_balance().unwrap(), 0);

        assert!(ledger.transfer_out(&alice, 1).is_err());
        assert_eq!(ledger.balance_of(&alice).unwrap(), 3);
    }
}
