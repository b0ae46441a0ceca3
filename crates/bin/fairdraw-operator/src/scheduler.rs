//! operator loop: close due pools, commit seeds, draw winners, pay fees
//!
//! every pass pushes each pool that still needs work one step along its
//! lifecycle. failures are logged and the pool is retried on the next pass.
//! pools drop out of the working set once settled, so a pass only touches
//! new and unfinished pools.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use fairdraw::{
    AccountId, Adapters, Amount, CloseOutcome, DrawService, HashCommitOracle, InMemoryLedger,
    ManualClock, OperatorSet, PoolId, PoolSnapshot, PoolState, PoolStatus,
};
use serde::Serialize;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::OperatorConfig;

/// what one pass did
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub closed: Vec<PoolId>,
    pub seeded: Vec<PoolId>,
    pub drawn: Vec<PoolId>,
    pub fees_paid: Vec<PoolId>,
    pub failures: usize,
}

impl PassReport {
    pub fn is_idle(&self) -> bool {
        self.closed.is_empty()
            && self.seeded.is_empty()
            && self.drawn.is_empty()
            && self.fees_paid.is_empty()
    }
}

pub struct Operator {
    service: Arc<DrawService>,
    identity: AccountId,
    /// pools not yet settled
    active: BTreeSet<PoolId>,
    /// highest pool id already in `active` or settled
    seen: PoolId,
}

impl Operator {
    pub fn new(service: Arc<DrawService>, identity: AccountId) -> Self {
        Self {
            service,
            identity,
            active: BTreeSet::new(),
            seen: 0,
        }
    }

    /// pools still in the working set
    pub fn active(&self) -> impl Iterator<Item = PoolId> + '_ {
        self.active.iter().copied()
    }

    /// one pass over the unsettled pools
    pub fn operate_once(&mut self) -> PassReport {
        let mut report = PassReport::default();

        let current = self.service.current_pool_id();
        match self.service.tick() {
            Ok(CloseOutcome::Closed { next_pool }) => {
                debug!(pool = current, next_pool, "rolled over");
                report.closed.push(current);
            }
            Ok(outcome) => debug!(?outcome, "tick"),
            Err(e) => {
                warn!(error = %e, "tick failed");
                report.failures += 1;
            }
        }

        let count = self.service.pool_count() as PoolId;
        self.active.extend(self.seen + 1..=count);
        self.seen = self.seen.max(count);

        let pools: Vec<PoolId> = self.active.iter().copied().collect();
        for pool_id in pools {
            let status = match self.service.pool_status(pool_id) {
                Ok(s) => s,
                Err(e) => {
                    warn!(pool = pool_id, error = %e, "could not read pool");
                    report.failures += 1;
                    continue;
                }
            };
            if self.step(&status, &mut report) {
                debug!(pool = pool_id, "pool settled");
                self.active.remove(&pool_id);
            }
        }

        report
    }

    /// advance one pool, returns true once nothing is left to do for it
    fn step(&self, pool: &PoolStatus, report: &mut PassReport) -> bool {
        match pool.state {
            PoolState::Closed if pool.is_settled() => {
                debug!(
                    pool = pool.id,
                    have = pool.entries,
                    need = pool.winner_count,
                    "closed pool undersubscribed, dropping"
                );
                true
            }
            PoolState::Closed => {
                match self.service.request_seed(&self.identity, pool.id) {
                    Ok(_) => report.seeded.push(pool.id),
                    Err(e) => {
                        warn!(
                            pool = pool.id,
                            error = %e,
                            retry = e.is_retryable(),
                            "seed request failed"
                        );
                        report.failures += 1;
                    }
                }
                false
            }
            PoolState::SeedCommitted => {
                match self.service.reveal_from_oracle(&self.identity, pool.id) {
                    Ok(winners) => {
                        info!(pool = pool.id, winners = winners.len(), "pool drawn");
                        report.drawn.push(pool.id);
                    }
                    Err(e) => {
                        warn!(
                            pool = pool.id,
                            error = %e,
                            retry = e.is_retryable(),
                            "draw failed"
                        );
                        report.failures += 1;
                    }
                }
                false
            }
            PoolState::Drawn if pool.fee_pending => match self.service.settle_fee(pool.id) {
                Ok(_) => {
                    report.fees_paid.push(pool.id);
                    true
                }
                Err(e) => {
                    warn!(pool = pool.id, error = %e, "protocol fee still pending");
                    report.failures += 1;
                    false
                }
            },
            PoolState::Drawn => true,
            PoolState::Pending | PoolState::Open | PoolState::SeedRevealed => false,
        }
    }
}

/// drive the operator on a fixed interval; `passes == 0` runs until ctrl-c
pub async fn run_loop(mut operator: Operator, tick: Duration, passes: usize) -> usize {
    let mut ticker = interval(tick);
    let mut done = 0usize;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }

        let report = operator.operate_once();
        if !report.is_idle() || report.failures > 0 {
            info!(
                closed = ?report.closed,
                seeded = ?report.seeded,
                drawn = ?report.drawn,
                fees_paid = ?report.fees_paid,
                failures = report.failures,
                active = operator.active().count(),
                "operator pass"
            );
        }

        done += 1;
        if passes != 0 && done >= passes {
            break;
        }
    }

    done
}

#[derive(Clone, Debug, Serialize)]
pub struct Payout {
    pub participant: AccountId,
    pub amount: Amount,
}

#[derive(Clone, Debug, Serialize)]
pub struct SimulationSummary {
    pub pool: PoolSnapshot,
    pub payouts: Vec<Payout>,
    pub fee_recipient_balance: Amount,
    pub vault_balance: Amount,
    pub next_pool: PoolId,
}

/// play one full round against in-memory adapters and a manual clock
pub fn simulate(config: &OperatorConfig) -> anyhow::Result<SimulationSummary> {
    let ledger = Arc::new(InMemoryLedger::new());
    let clock = Arc::new(ManualClock::new(1_000_000));
    let adapters = Adapters {
        ledger: ledger.clone(),
        oracle: Arc::new(HashCommitOracle::new()),
        auth: Arc::new(OperatorSet::new(config.operator_set())),
        clock: clock.clone(),
    };
    let service = Arc::new(DrawService::new(config.pool.clone(), adapters)?);
    let mut operator = Operator::new(service.clone(), config.operator);

    let mut pool_id = service.current_pool_id();
    for demo in &config.demo_participants {
        let account = demo.account();
        ledger.deposit(&account, demo.balance)?;
        pool_id = service.enter_pool(account)?;
        info!(participant = %demo.label, pool = pool_id, "entered");
    }

    clock.advance(config.pool.duration_secs);
    // close, commit, reveal
    for _ in 0..3 {
        operator.operate_once();
    }

    let mut payouts = Vec::new();
    for winner in service.get_winners(pool_id)? {
        let amount = service.claim_reward(pool_id, winner.participant)?;
        payouts.push(Payout {
            participant: winner.participant,
            amount,
        });
    }

    Ok(SimulationSummary {
        pool: service.get_pool(pool_id)?,
        payouts,
        fee_recipient_balance: ledger.balance_of(&config.pool.fee_recipient)?,
        vault_balance: ledger.vault_balance()?,
        next_pool: service.current_pool_id(),
    })
}
