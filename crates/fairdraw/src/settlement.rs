//! reward settlement and claims
//!
//! integer rules, all divisions truncate:
//!
//! ```text
//! protocol_fee      = total * fee_percent / 100
//! winner_pool       = total - protocol_fee
//! share_bps         = winner_share_percent * 100 / W
//! reward_per_winner = winner_pool / W
//! dust              = winner_pool - W * reward_per_winner      (< W)
//! ```
//!
//! dust stays with the pool it came from and is never rolled forward.
//! rewards are pulled by winners; only the protocol fee is pushed, right after
//! the draw. `fee_paid` guards that push the same way `claimed` guards a claim.

use serde::{Deserialize, Serialize};

use crate::config::PoolParams;
use crate::error::{Error, Result};
use crate::types::{AccountId, Amount, Bps, Winner, WinnerStatus};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub protocol_fee: Amount,
    pub winner_pool: Amount,
    /// per-winner share of the collected total
    pub share_bps: Bps,
    pub reward_per_winner: Amount,
    pub dust: Amount,
    pub winners: Vec<Winner>,
    /// protocol fee handed to the ledger, true from the start when it is 0
    #[serde(default)]
    pub fee_paid: bool,
}

impl Settlement {
    /// fix fee and rewards for `winners` of a pool that collected `total`
    pub fn compute(total: Amount, params: &PoolParams, winners: &[AccountId]) -> Result<Self> {
        let count = params.winner_count as usize;
        if count == 0 || winners.len() != count {
            return Err(Error::InvalidWinnerCount);
        }

        let protocol_fee = total
            .checked_mul(params.fee_percent as Amount)
            .ok_or_else(|| Error::Ledger("fee overflow".into()))?
            / 100;
        let winner_pool = total - protocol_fee;
        let reward_per_winner = winner_pool / count as Amount;
        let dust = winner_pool - reward_per_winner * count as Amount;
        let share_bps = params.share_per_winner_bps();

        let winners = winners
            .iter()
            .map(|participant| Winner {
                participant: *participant,
                share_bps,
                reward_amount: reward_per_winner,
                claimed: false,
            })
            .collect();

        Ok(Self {
            protocol_fee,
            winner_pool,
            share_bps,
            reward_per_winner,
            dust,
            winners,
            fee_paid: protocol_fee == 0,
        })
    }

    pub fn winner(&self, participant: &AccountId) -> Option<&Winner> {
        self.winners.iter().find(|w| &w.participant == participant)
    }

    pub fn status(&self, participant: &AccountId) -> WinnerStatus {
        match self.winner(participant) {
            Some(w) => WinnerStatus {
                is_winner: true,
                reward_amount: w.reward_amount,
                claimed: w.claimed,
            },
            None => WinnerStatus::NONE,
        }
    }

    /// check-then-set of the claimed flag, returns the owed reward
    ///
    /// must run before the payout transfer so a re-entrant claim sees
    /// `AlreadyClaimed`
    pub fn mark_claimed(&mut self, participant: &AccountId) -> Result<Amount> {
        let winner = self
            .winners
            .iter_mut()
            .find(|w| &w.participant == participant)
            .ok_or(Error::NotAWinner)?;
        if winner.claimed {
            return Err(Error::AlreadyClaimed);
        }
        winner.claimed = true;
        Ok(winner.reward_amount)
    }

    /// undo `mark_claimed` after the payout transfer failed
    pub(crate) fn revert_claim(&mut self, participant: &AccountId) {
        if let Some(w) = self.winners.iter_mut().find(|w| &w.participant == participant) {
            w.claimed = false;
        }
    }

    /// check-then-set of the fee flag, returns the fee still owed
    pub fn take_fee(&mut self) -> Option<Amount> {
        if self.fee_paid {
            return None;
        }
        self.fee_paid = true;
        Some(self.protocol_fee)
    }

    /// undo `take_fee` after the fee transfer failed
    pub(crate) fn revert_fee(&mut self) {
        if self.protocol_fee > 0 {
            self.fee_paid = false;
        }
    }

    /// sum of all rewards, claimed or not
    pub fn total_rewards(&self) -> Amount {
        self.winners.iter().map(|w| w.reward_amount).sum()
    }

    /// rewards not yet pulled
    pub fn outstanding(&self) -> Amount {
        self.winners
            .iter()
            .filter(|w| !w.claimed)
            .map(|w| w.reward_amount)
            .sum()
    }
}
