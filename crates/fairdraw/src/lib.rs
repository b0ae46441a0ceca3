//! # fairdraw
//!
//! repeated, time-boxed admission pools with verifiable multi-winner draws.
//!
//! participants pay a fixed fee to enter the current pool. the first entry
//! starts the window; once it elapses anyone may close the pool, which rolls
//! entries over to a fresh one. an operator then commits a randomness oracle
//! to a seed, later submits the revealed value with its proof, and the core
//! picks W distinct winners from it. the protocol fee is paid out at draw
//! time; each winner pulls their own reward.
//!
//! ## architecture
//!
//! ```text
//!   enter_pool ──▶ ┌──────────────┐      ┌──────────────────┐
//!                  │  pool store  │◀────▶│ admission ledger │──▶ FundLedger::transfer_in
//!   close_pool ──▶ │ (per-pool    │      └──────────────────┘
//!                  │  mutex)      │
//!  request_seed ─▶ │              │──▶ RandomnessOracle::commit
//! reveal_and_draw▶ │              │──▶ RandomnessOracle::verify
//!                  └──────┬───────┘
//!                         │ revealed value + participants
//!                         ▼
//!                  ┌──────────────┐      ┌──────────────────┐
//!                  │   selector   │─────▶│ settlement ledger│──▶ FundLedger::transfer_out
//!                  │   (pure)     │      └──────────────────┘
//!                  └──────────────┘              ▲
//!                                   claim_reward ┘
//! ```
//!
//! ## usage
//!
//! ```rust,ignore
//! use fairdraw::{Adapters, DrawService, PoolConfig};
//!
//! let service = DrawService::new(PoolConfig::default(), adapters)?;
//! let pool = service.enter_pool(alice)?;
//! // ... window elapses ...
//! service.tick()?;
//! service.request_seed(&operator, pool)?;
//! service.reveal_from_oracle(&operator, pool)?;
//! let paid = service.claim_reward(pool, winner)?;
//! ```

pub mod admission;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod oracle;
pub mod pool;
pub mod selector;
pub mod service;
pub mod settlement;
pub mod store;
pub mod types;

pub use auth::{Authorizer, OperatorSet};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{PoolConfig, PoolParams, SelectionMode, MAX_DURATION_SECS};
pub use error::{Error, Result};
pub use ledger::{FundLedger, InMemoryLedger};
pub use oracle::{HashCommitOracle, RandomnessOracle};
pub use pool::{CloseOutcome, PoolSnapshot, PoolStatus};
pub use service::{Adapters, DrawService};
pub use settlement::Settlement;
pub use types::*;
