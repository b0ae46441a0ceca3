//! per-pool admission bookkeeping
//!
//! one entry per participant per pool. the fee transfer and the append form a
//! single unit: if the ledger refuses the fee nothing is recorded.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::ledger::FundLedger;
use crate::types::{AccountId, Amount};

#[derive(Clone, Debug, Default)]
pub struct Admission {
    /// insertion order is the selection index space
    participants: Vec<AccountId>,
    entered: HashSet<AccountId>,
    total_collected: Amount,
}

impl Admission {
    pub fn new() -> Self {
        Self::default()
    }

    /// collect `fee` from `participant` and record the entry
    pub fn enter(
        &mut self,
        ledger: &dyn FundLedger,
        participant: AccountId,
        fee: Amount,
    ) -> Result<()> {
        if self.entered.contains(&participant) {
            return Err(Error::AlreadyEntered);
        }
        let total = self
            .total_collected
            .checked_add(fee)
            .ok_or_else(|| Error::Ledger("pool total overflow".into()))?;

        ledger.transfer_in(&participant, fee)?;

        self.entered.insert(participant);
        self.participants.push(participant);
        self.total_collected = total;
        Ok(())
    }

    pub fn has_entered(&self, participant: &AccountId) -> bool {
        self.entered.contains(participant)
    }

    pub fn participants(&self) -> &[AccountId] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn total_collected(&self) -> Amount {
        self.total_collected
    }
}
