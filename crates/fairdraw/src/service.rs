//! draw service - the operations callers see
//!
//! wires the pool arena to the injected collaborators (ledger, oracle,
//! authorizer, clock). each mutating call takes the target pool's lock for its
//! whole validate-then-mutate step. outbound transfers (claims and the
//! protocol fee) run with the lock released, behind a flag set beforehand, so
//! a ledger callback can re-enter the service without blocking.

use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::auth::Authorizer;
use crate::clock::Clock;
use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::ledger::FundLedger;
use crate::oracle::RandomnessOracle;
use crate::pool::{CloseOutcome, PoolSnapshot, PoolStatus};
use crate::selector;
use crate::settlement::Settlement;
use crate::store::PoolStore;
use crate::types::{
    AccountId, Amount, PoolId, Proof, RevealedValue, SeedHandle, Winner, WinnerStatus,
};

/// external capabilities the service depends on
#[derive(Clone)]
pub struct Adapters {
    pub ledger: Arc<dyn FundLedger>,
    pub oracle: Arc<dyn RandomnessOracle>,
    pub auth: Arc<dyn Authorizer>,
    pub clock: Arc<dyn Clock>,
}

pub struct DrawService {
    store: PoolStore,
    config: RwLock<PoolConfig>,
    adapters: Adapters,
}

impl DrawService {
    /// validate `config` and create the first pool
    pub fn new(config: PoolConfig, adapters: Adapters) -> Result<Self> {
        config.validate()?;
        let store = PoolStore::new();
        let first = store.create_pool(config.clone(), adapters.clock.now())?;
        info!(pool = first, "draw service started");
        Ok(Self {
            store,
            config: RwLock::new(config),
            adapters,
        })
    }

    fn ensure_operator(&self, caller: &AccountId) -> Result<()> {
        if self.adapters.auth.is_authorized_operator(caller) {
            Ok(())
        } else {
            warn!(caller = %caller, "unauthorized operator call");
            Err(Error::Unauthorized)
        }
    }

    // === participant operations ===

    /// enter the pool currently taking entries, returns its id
    pub fn enter_pool(&self, participant: AccountId) -> Result<PoolId> {
        let pool_id = self.store.current_id();
        self.enter(pool_id, participant)?;
        Ok(pool_id)
    }

    /// enter a specific pool
    pub fn enter(&self, pool_id: PoolId, participant: AccountId) -> Result<()> {
        let now = self.adapters.clock.now();
        self.store.with_pool(pool_id, |pool| {
            pool.record_entry(self.adapters.ledger.as_ref(), participant, now)?;
            info!(
                pool = pool_id,
                participant = %participant,
                entries = pool.participants().len(),
                "entry recorded"
            );
            Ok(())
        })
    }

    /// pull the caller's reward from a drawn pool
    pub fn claim_reward(&self, pool_id: PoolId, participant: AccountId) -> Result<Amount> {
        let reward = self
            .store
            .with_pool(pool_id, |pool| pool.mark_claimed(&participant))?;

        if let Err(e) = self.adapters.ledger.transfer_out(&participant, reward) {
            warn!(
                pool = pool_id,
                participant = %participant,
                error = %e,
                "payout failed, claim reverted"
            );
            self.store.with_pool(pool_id, |pool| {
                pool.revert_claim(&participant);
                Ok(())
            })?;
            return Err(e);
        }

        info!(pool = pool_id, participant = %participant, amount = reward, "reward claimed");
        Ok(reward)
    }

    // === lifecycle operations ===

    /// close an elapsed pool; rolls over to a fresh pool when it had entries
    pub fn close_pool(&self, pool_id: PoolId) -> Result<CloseOutcome> {
        let now = self.adapters.clock.now();
        self.store.with_pool(pool_id, |pool| match pool.close(now)? {
            CloseOutcome::Closed { .. } => {
                let params = self.config.read()?.clone();
                let next_pool = self.store.create_pool(params, now)?;
                info!(
                    pool = pool_id,
                    next_pool,
                    entries = pool.participants().len(),
                    collected = pool.total_collected(),
                    "pool closed"
                );
                Ok(CloseOutcome::Closed { next_pool })
            }
            CloseOutcome::Extended { closes_at } => {
                info!(pool = pool_id, closes_at, "empty pool extended");
                Ok(CloseOutcome::Extended { closes_at })
            }
            other => {
                debug!(pool = pool_id, outcome = ?other, "close was a no-op");
                Ok(other)
            }
        })
    }

    /// close the current pool if its window elapsed; safe to call on a timer
    pub fn tick(&self) -> Result<CloseOutcome> {
        let pool_id = self.store.current_id();
        match self.close_pool(pool_id) {
            Err(Error::PoolStillOpen) => Ok(CloseOutcome::NotDue),
            other => other,
        }
    }

    /// commit the oracle to a seed for a closed pool
    pub fn request_seed(&self, caller: &AccountId, pool_id: PoolId) -> Result<SeedHandle> {
        self.ensure_operator(caller)?;
        self.store.with_pool(pool_id, |pool| {
            pool.check_seed_request()?;
            let handle = self.adapters.oracle.commit()?;
            pool.commit_seed(handle)?;
            info!(pool = pool_id, handle = %hex::encode(handle.0), "seed committed");
            Ok(handle)
        })
    }

    /// verify a reveal, select winners and fix rewards
    ///
    /// an invalid proof leaves the pool in `SeedCommitted` so a correct
    /// reveal can follow.
    pub fn reveal_and_draw(
        &self,
        caller: &AccountId,
        pool_id: PoolId,
        value: RevealedValue,
        proof: Proof,
    ) -> Result<Vec<Winner>> {
        self.ensure_operator(caller)?;
        let winners = self.store.with_pool(pool_id, |pool| {
            let handle = pool.check_reveal()?;
            if !self.adapters.oracle.verify(&handle, &value, &proof) {
                warn!(pool = pool_id, "reveal rejected, proof does not match commitment");
                return Err(Error::InvalidProof);
            }

            let params = pool.params().clone();
            let drawn = selector::select(
                &value,
                pool.participants(),
                params.winner_count as usize,
                params.selection,
            )?;
            let settlement = Settlement::compute(pool.total_collected(), &params, &drawn)?;

            info!(
                pool = pool_id,
                winners = drawn.len(),
                protocol_fee = settlement.protocol_fee,
                reward = settlement.reward_per_winner,
                dust = settlement.dust,
                "winners drawn"
            );
            let winners = settlement.winners.clone();
            pool.apply_draw(value, settlement)?;
            Ok(winners)
        })?;

        // the draw stands even if the fee push fails; it stays pending
        if let Err(e) = self.settle_fee(pool_id) {
            warn!(pool = pool_id, error = %e, "protocol fee left pending");
        }
        Ok(winners)
    }

    /// push a drawn pool's unpaid protocol fee to its recipient
    ///
    /// runs with the pool lock released, guarded by the fee flag like a
    /// claim. returns the amount moved, 0 when nothing was owed.
    pub fn settle_fee(&self, pool_id: PoolId) -> Result<Amount> {
        let Some((recipient, fee)) = self.store.with_pool(pool_id, |pool| pool.take_fee())? else {
            return Ok(0);
        };

        if let Err(e) = self.adapters.ledger.transfer_out(&recipient, fee) {
            self.store.with_pool(pool_id, |pool| {
                pool.revert_fee();
                Ok(())
            })?;
            return Err(e);
        }

        info!(pool = pool_id, recipient = %recipient, amount = fee, "protocol fee paid");
        Ok(fee)
    }

    /// fetch the reveal for a committed pool from the oracle and draw
    pub fn reveal_from_oracle(&self, caller: &AccountId, pool_id: PoolId) -> Result<Vec<Winner>> {
        self.ensure_operator(caller)?;
        let handle = self
            .store
            .read_pool(pool_id, |pool| pool.seed_handle().copied())?
            .ok_or(Error::SeedNotRequested)?;
        let (value, proof) = self.adapters.oracle.reveal(&handle)?;
        self.reveal_and_draw(caller, pool_id, value, proof)
    }

    /// replace the config used for pools created from now on
    pub fn update_config(&self, caller: &AccountId, config: PoolConfig) -> Result<()> {
        self.ensure_operator(caller)?;
        config.validate()?;
        *self.config.write()? = config;
        info!(caller = %caller, "config updated for future pools");
        Ok(())
    }

    // === queries, never mutate ===

    pub fn config(&self) -> Result<PoolConfig> {
        Ok(self.config.read()?.clone())
    }

    pub fn current_pool_id(&self) -> PoolId {
        self.store.current_id()
    }

    pub fn pool_count(&self) -> usize {
        self.store.len()
    }

    pub fn get_pool(&self, pool_id: PoolId) -> Result<PoolSnapshot> {
        self.store.read_pool(pool_id, |pool| pool.snapshot())
    }

    /// state summary without copying participants or winners
    pub fn pool_status(&self, pool_id: PoolId) -> Result<PoolStatus> {
        self.store.read_pool(pool_id, |pool| pool.status())
    }

    /// winners in draw order, empty until drawn
    pub fn get_winners(&self, pool_id: PoolId) -> Result<Vec<Winner>> {
        self.store.read_pool(pool_id, |pool| pool.winners().to_vec())
    }

    pub fn is_winner(&self, pool_id: PoolId, participant: &AccountId) -> Result<WinnerStatus> {
        self.store.read_pool(pool_id, |pool| {
            pool.settlement()
                .map(|s| s.status(participant))
                .unwrap_or(WinnerStatus::NONE)
        })
    }

    pub fn participants(&self, pool_id: PoolId) -> Result<Vec<AccountId>> {
        self.store.read_pool(pool_id, |pool| pool.participants().to_vec())
    }

    /// seconds until the window ends, `None` when no window runs
    pub fn time_remaining(&self, pool_id: PoolId) -> Result<Option<u64>> {
        let now = self.adapters.clock.now();
        self.store.read_pool(pool_id, |pool| pool.time_remaining(now))
    }

    /// pools `participant` entered, ascending
    pub fn entries_of(&self, participant: &AccountId) -> Result<Vec<PoolId>> {
        self.store
            .scan(|pool| pool.has_entered(participant).then_some(pool.id()))
    }

    /// drawn pools where `participant` still has a reward to pull
    pub fn unclaimed_rewards(&self, participant: &AccountId) -> Result<Vec<(PoolId, Amount)>> {
        self.store.scan(|pool| {
            pool.settlement()
                .and_then(|s| s.winner(participant))
                .filter(|w| !w.claimed)
                .map(|w| (pool.id(), w.reward_amount))
        })
    }
}
