//! pool record and state machine
//!
//! ```text
//! Pending ──first entry──▶ Open ──close (due, non-empty)──▶ Closed
//!                           │ ▲
//!                           └─┘ close (due, empty): window restarts
//!
//! Closed ──request_seed──▶ SeedCommitted ──reveal (valid proof)──▶ SeedRevealed ──▶ Drawn
//! ```
//!
//! every method validates first and mutates last, so an `Err` leaves the
//! record untouched.

use serde::{Deserialize, Serialize};

use crate::admission::Admission;
use crate::config::PoolParams;
use crate::error::{Error, Result};
use crate::ledger::FundLedger;
use crate::settlement::Settlement;
use crate::types::{
    AccountId, Amount, PoolId, PoolState, RevealedValue, SeedHandle, Timestamp, Winner,
};

/// result of a close attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseOutcome {
    /// window elapsed with entries, `next_pool` now takes entries
    Closed { next_pool: PoolId },
    /// window elapsed with no entries, restarted until `closes_at`
    Extended { closes_at: Timestamp },
    /// no entry yet, no window running
    NotStarted,
    /// window still running (tick only, `close_pool` returns `PoolStillOpen`)
    NotDue,
    /// closed earlier, nothing to do
    AlreadyClosed,
}

#[derive(Clone, Debug)]
pub struct Pool {
    id: PoolId,
    state: PoolState,
    params: PoolParams,
    created_at: Timestamp,
    opened_at: Option<Timestamp>,
    closes_at: Option<Timestamp>,
    admission: Admission,
    seed_handle: Option<SeedHandle>,
    revealed_value: Option<RevealedValue>,
    settlement: Option<Settlement>,
}

impl Pool {
    pub fn new(id: PoolId, params: PoolParams, created_at: Timestamp) -> Self {
        Self {
            id,
            state: PoolState::Pending,
            params,
            created_at,
            opened_at: None,
            closes_at: None,
            admission: Admission::new(),
            seed_handle: None,
            revealed_value: None,
            settlement: None,
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    pub fn params(&self) -> &PoolParams {
        &self.params
    }

    pub fn closes_at(&self) -> Option<Timestamp> {
        self.closes_at
    }

    pub fn participants(&self) -> &[AccountId] {
        self.admission.participants()
    }

    pub fn has_entered(&self, participant: &AccountId) -> bool {
        self.admission.has_entered(participant)
    }

    pub fn total_collected(&self) -> Amount {
        self.admission.total_collected()
    }

    pub fn seed_handle(&self) -> Option<&SeedHandle> {
        self.seed_handle.as_ref()
    }

    pub fn settlement(&self) -> Option<&Settlement> {
        self.settlement.as_ref()
    }

    /// winners in draw order, empty until drawn
    pub fn winners(&self) -> &[Winner] {
        self.settlement
            .as_ref()
            .map(|s| s.winners.as_slice())
            .unwrap_or(&[])
    }

    /// true once the window of an open pool has elapsed
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.state == PoolState::Open && self.closes_at.map_or(false, |at| now >= at)
    }

    /// seconds left in the window, `None` while no window runs
    pub fn time_remaining(&self, now: Timestamp) -> Option<u64> {
        match self.state {
            PoolState::Open => self.closes_at.map(|at| at.saturating_sub(now)),
            _ => None,
        }
    }

    fn advance(&mut self, to: PoolState) -> Result<()> {
        if self.state.next() != Some(to) {
            return Err(Error::InvalidState {
                expected: to,
                actual: self.state,
            });
        }
        self.state = to;
        Ok(())
    }

    /// admit `participant`, starting the window on the first entry
    pub fn record_entry(
        &mut self,
        ledger: &dyn FundLedger,
        participant: AccountId,
        now: Timestamp,
    ) -> Result<()> {
        if !self.state.is_admitting() || self.is_due(now) {
            return Err(Error::PoolClosed);
        }

        // deadline is computed before any funds move
        let closes_at = match self.state {
            PoolState::Pending => Some(self.window_end(now)?),
            _ => None,
        };

        self.admission.enter(ledger, participant, self.params.entry_fee)?;

        if let Some(closes_at) = closes_at {
            self.advance(PoolState::Open)?;
            self.opened_at = Some(now);
            self.closes_at = Some(closes_at);
        }
        Ok(())
    }

    fn window_end(&self, now: Timestamp) -> Result<Timestamp> {
        now.checked_add(self.params.duration_secs).ok_or_else(|| {
            Error::InvalidConfig(format!(
                "window of {}s from {} overflows",
                self.params.duration_secs, now
            ))
        })
    }

    /// close an elapsed window
    ///
    /// the caller allocates the follow-up pool when this returns `Closed`;
    /// the returned `next_pool` is a placeholder of 0 until then.
    pub fn close(&mut self, now: Timestamp) -> Result<CloseOutcome> {
        match self.state {
            PoolState::Pending => Ok(CloseOutcome::NotStarted),
            PoolState::Open => {
                if !self.is_due(now) {
                    return Err(Error::PoolStillOpen);
                }
                if self.admission.is_empty() {
                    let closes_at = self.window_end(now)?;
                    self.opened_at = Some(now);
                    self.closes_at = Some(closes_at);
                    return Ok(CloseOutcome::Extended { closes_at });
                }
                self.advance(PoolState::Closed)?;
                Ok(CloseOutcome::Closed { next_pool: 0 })
            }
            _ => Ok(CloseOutcome::AlreadyClosed),
        }
    }

    /// validation for `request_seed`, run before asking the oracle
    pub fn check_seed_request(&self) -> Result<()> {
        if self.seed_handle.is_some() {
            return Err(Error::SeedAlreadyRequested);
        }
        if self.state != PoolState::Closed {
            return Err(Error::PoolStillOpen);
        }
        let need = self.params.winner_count as usize;
        if self.admission.len() < need {
            return Err(Error::NotEnoughParticipants {
                have: self.admission.len(),
                need,
            });
        }
        Ok(())
    }

    pub fn commit_seed(&mut self, handle: SeedHandle) -> Result<()> {
        self.check_seed_request()?;
        self.advance(PoolState::SeedCommitted)?;
        self.seed_handle = Some(handle);
        Ok(())
    }

    /// validation for `reveal_and_draw`, returns the handle to verify against
    pub fn check_reveal(&self) -> Result<SeedHandle> {
        let handle = self.seed_handle.ok_or(Error::SeedNotRequested)?;
        if self.state != PoolState::SeedCommitted {
            return Err(Error::InvalidState {
                expected: PoolState::SeedCommitted,
                actual: self.state,
            });
        }
        Ok(handle)
    }

    /// store a verified value and its settlement in one step
    pub fn apply_draw(&mut self, value: RevealedValue, settlement: Settlement) -> Result<()> {
        self.check_reveal()?;
        if settlement.winners.len() != self.params.winner_count as usize {
            return Err(Error::InvalidWinnerCount);
        }
        self.advance(PoolState::SeedRevealed)?;
        self.revealed_value = Some(value);
        self.advance(PoolState::Drawn)?;
        self.settlement = Some(settlement);
        Ok(())
    }

    /// claimed flag check-then-set, see `Settlement::mark_claimed`
    pub fn mark_claimed(&mut self, participant: &AccountId) -> Result<Amount> {
        match (self.state, self.settlement.as_mut()) {
            (PoolState::Drawn, Some(settlement)) => settlement.mark_claimed(participant),
            _ => Err(Error::WinnersNotDrawn),
        }
    }

    pub(crate) fn revert_claim(&mut self, participant: &AccountId) {
        if let Some(settlement) = self.settlement.as_mut() {
            settlement.revert_claim(participant);
        }
    }

    /// fee flag check-then-set, returns recipient and amount still owed
    pub fn take_fee(&mut self) -> Result<Option<(AccountId, Amount)>> {
        let recipient = self.params.fee_recipient;
        match (self.state, self.settlement.as_mut()) {
            (PoolState::Drawn, Some(settlement)) => {
                Ok(settlement.take_fee().map(|fee| (recipient, fee)))
            }
            _ => Err(Error::WinnersNotDrawn),
        }
    }

    pub(crate) fn revert_fee(&mut self) {
        if let Some(settlement) = self.settlement.as_mut() {
            settlement.revert_fee();
        }
    }

    /// small summary for schedulers, no participant list
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            id: self.id,
            state: self.state,
            entries: self.admission.len(),
            winner_count: self.params.winner_count,
            fee_pending: self.settlement.as_ref().map_or(false, |s| !s.fee_paid),
        }
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            id: self.id,
            state: self.state,
            params: self.params.clone(),
            created_at: self.created_at,
            opened_at: self.opened_at,
            closes_at: self.closes_at,
            participants: self.admission.participants().to_vec(),
            total_collected: self.admission.total_collected(),
            seed_handle: self.seed_handle,
            revealed_value: self.revealed_value,
            settlement: self.settlement.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    pub id: PoolId,
    pub state: PoolState,
    pub entries: usize,
    pub winner_count: u32,
    /// drawn, protocol fee not yet handed to the ledger
    pub fee_pending: bool,
}

impl PoolStatus {
    /// nothing left for an operator to do
    ///
    /// undersubscribed closed pools count as settled, they have no way forward
    pub fn is_settled(&self) -> bool {
        match self.state {
            PoolState::Drawn => !self.fee_pending,
            PoolState::Closed => self.entries < self.winner_count as usize,
            _ => false,
        }
    }
}

/// read-only copy of a pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub id: PoolId,
    pub state: PoolState,
    pub params: PoolParams,
    pub created_at: Timestamp,
    pub opened_at: Option<Timestamp>,
    pub closes_at: Option<Timestamp>,
    pub participants: Vec<AccountId>,
    pub total_collected: Amount,
    pub seed_handle: Option<SeedHandle>,
    pub revealed_value: Option<RevealedValue>,
    pub settlement: Option<Settlement>,
}

impl PoolSnapshot {
    pub fn winners(&self) -> &[Winner] {
        self.settlement
            .as_ref()
            .map(|s| s.winners.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::ledger::InMemoryLedger;

    const T0: Timestamp = 1_000;

    fn params(winners: u32) -> PoolParams {
        PoolConfig {
            entry_fee: 5,
            duration_secs: 60,
            winner_count: winners,
            ..Default::default()
        }
    }

    fn fill(pool: &mut Pool, ledger: &InMemoryLedger, n: usize, now: Timestamp) -> Vec<AccountId> {
        (0..n)
            .map(|i| {
                let id = AccountId::from_label(&format!("p{}", i));
                ledger.deposit(&id, 100).unwrap();
                pool.record_entry(ledger, id, now).unwrap();
                id
            })
            .collect()
    }

    #[test]
    fn test_first_entry_opens_window() {
        let ledger = InMemoryLedger::new();
        let mut pool = Pool::new(1, params(2), T0);
        assert_eq!(pool.state(), PoolState::Pending);
        assert_eq!(pool.closes_at(), None);

        fill(&mut pool, &ledger, 1, T0 + 10);
        assert_eq!(pool.state(), PoolState::Open);
        assert_eq!(pool.closes_at(), Some(T0 + 70));
        assert_eq!(pool.time_remaining(T0 + 20), Some(50));

        // later entries keep the deadline
        fill(&mut pool, &ledger, 3, T0 + 30);
        assert_eq!(pool.closes_at(), Some(T0 + 70));
    }

    #[test]
    fn test_entry_after_deadline_rejected() {
        let ledger = InMemoryLedger::new();
        let mut pool = Pool::new(1, params(1), T0);
        fill(&mut pool, &ledger, 1, T0);

        let late = AccountId::from_label("late");
        ledger.deposit(&late, 100).unwrap();
        assert_eq!(pool.record_entry(&ledger, late, T0 + 60), Err(Error::PoolClosed));
        // lazy close is not a thing
        assert_eq!(pool.state(), PoolState::Open);
        assert_eq!(ledger.balance_of(&late).unwrap(), 100);
    }

    #[test]
    fn test_overflowing_window_rejects_without_charging() {
        let ledger = InMemoryLedger::new();
        let params = PoolConfig {
            duration_secs: u64::MAX,
            ..params(1)
        };
        let mut pool = Pool::new(1, params, T0);
        let who = AccountId::from_label("who");
        ledger.deposit(&who, 100).unwrap();

        assert!(matches!(
            pool.record_entry(&ledger, who, T0),
            Err(Error::InvalidConfig(_))
        ));
        assert_eq!(pool.state(), PoolState::Pending);
        assert!(!pool.has_entered(&who));
        assert_eq!(ledger.balance_of(&who).unwrap(), 100);
        assert_eq!(ledger.vault_balance().unwrap(), 0);
    }

    #[test]
    fn test_close_timing() {
        let ledger = InMemoryLedger::new();
        let mut pool = Pool::new(1, params(1), T0);
        assert_eq!(pool.close(T0), Ok(CloseOutcome::NotStarted));

        fill(&mut pool, &ledger, 2, T0);
        assert_eq!(pool.close(T0 + 59), Err(Error::PoolStillOpen));
        assert_eq!(pool.close(T0 + 60), Ok(CloseOutcome::Closed { next_pool: 0 }));
        assert_eq!(pool.state(), PoolState::Closed);
        assert_eq!(pool.close(T0 + 61), Ok(CloseOutcome::AlreadyClosed));
    }

    #[test]
    fn test_empty_open_pool_extends() {
        let mut pool = Pool::new(1, params(1), T0);
        pool.state = PoolState::Open;
        pool.closes_at = Some(T0);

        assert_eq!(
            pool.close(T0 + 5),
            Ok(CloseOutcome::Extended { closes_at: T0 + 65 })
        );
        assert_eq!(pool.state(), PoolState::Open);
        assert_eq!(pool.closes_at(), Some(T0 + 65));
    }

    #[test]
    fn test_seed_request_guards() {
        let ledger = InMemoryLedger::new();
        let mut pool = Pool::new(1, params(3), T0);
        fill(&mut pool, &ledger, 2, T0);
        assert_eq!(pool.check_seed_request(), Err(Error::PoolStillOpen));

        pool.close(T0 + 60).unwrap();
        assert_eq!(
            pool.check_seed_request(),
            Err(Error::NotEnoughParticipants { have: 2, need: 3 })
        );
        assert_eq!(
            pool.commit_seed(SeedHandle([1; 32])),
            Err(Error::NotEnoughParticipants { have: 2, need: 3 })
        );
        assert_eq!(pool.state(), PoolState::Closed);
    }

    #[test]
    fn test_seed_then_draw() {
        let ledger = InMemoryLedger::new();
        let mut pool = Pool::new(1, params(2), T0);
        let people = fill(&mut pool, &ledger, 3, T0);
        pool.close(T0 + 60).unwrap();

        assert_eq!(pool.check_reveal(), Err(Error::SeedNotRequested));
        pool.commit_seed(SeedHandle([1; 32])).unwrap();
        assert_eq!(pool.commit_seed(SeedHandle([2; 32])), Err(Error::SeedAlreadyRequested));
        assert_eq!(pool.seed_handle(), Some(&SeedHandle([1; 32])));

        assert_eq!(pool.mark_claimed(&people[0]), Err(Error::WinnersNotDrawn));

        let settlement = Settlement::compute(15, pool.params(), &people[..2]).unwrap();
        pool.apply_draw(RevealedValue([0; 32]), settlement.clone()).unwrap();
        assert_eq!(pool.state(), PoolState::Drawn);
        assert_eq!(pool.winners().len(), 2);

        assert!(matches!(
            pool.apply_draw(RevealedValue([0; 32]), settlement),
            Err(Error::InvalidState { actual: PoolState::Drawn, .. })
        ));
    }

    #[test]
    fn test_fee_and_status() {
        let ledger = InMemoryLedger::new();
        let mut pool = Pool::new(1, params(2), T0);
        let people = fill(&mut pool, &ledger, 3, T0);
        assert_eq!(pool.take_fee(), Err(Error::WinnersNotDrawn));

        pool.close(T0 + 60).unwrap();
        assert!(!pool.status().is_settled());
        pool.commit_seed(SeedHandle([1; 32])).unwrap();
        let settlement = Settlement::compute(15, pool.params(), &people[..2]).unwrap();
        pool.apply_draw(RevealedValue([0; 32]), settlement).unwrap();

        let status = pool.status();
        assert_eq!(status.entries, 3);
        assert!(status.fee_pending);
        assert!(!status.is_settled());

        let recipient = pool.params().fee_recipient;
        assert_eq!(pool.take_fee(), Ok(Some((recipient, 1))));
        assert_eq!(pool.take_fee(), Ok(None));
        assert!(pool.status().is_settled());

        pool.revert_fee();
        assert!(pool.status().fee_pending);
    }

    #[test]
    fn test_undersubscribed_closed_pool_is_settled() {
        let ledger = InMemoryLedger::new();
        let mut pool = Pool::new(1, params(3), T0);
        fill(&mut pool, &ledger, 2, T0);
        assert!(!pool.status().is_settled());
        pool.close(T0 + 60).unwrap();
        assert!(pool.status().is_settled());
    }

    #[test]
    fn test_snapshot_copies_state() {
        let ledger = InMemoryLedger::new();
        let mut pool = Pool::new(7, params(1), T0);
        let people = fill(&mut pool, &ledger, 2, T0);

        let snap = pool.snapshot();
        assert_eq!(snap.id, 7);
        assert_eq!(snap.state, PoolState::Open);
        assert_eq!(snap.participants, people);
        assert_eq!(snap.total_collected, 10);
        assert!(snap.winners().is_empty());
    }
}
