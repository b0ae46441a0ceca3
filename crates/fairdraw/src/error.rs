//! error types for fairdraw

use thiserror::Error;

use crate::types::{PoolId, PoolState};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // === admission errors ===
    #[error("participant already entered this pool")]
    AlreadyEntered,

    #[error("pool is not accepting entries")]
    PoolClosed,

    // === lifecycle errors ===
    #[error("pool window has not elapsed yet")]
    PoolStillOpen,

    #[error("not enough participants: have {have}, need {need}")]
    NotEnoughParticipants { have: usize, need: usize },

    #[error("seed already requested for this pool")]
    SeedAlreadyRequested,

    #[error("seed not requested for this pool")]
    SeedNotRequested,

    #[error("randomness proof rejected")]
    InvalidProof,

    #[error("invalid winner count")]
    InvalidWinnerCount,

    #[error("pool {0} not found")]
    PoolNotFound(PoolId),

    #[error("pool in state {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: PoolState,
        actual: PoolState,
    },

    // === settlement errors ===
    #[error("winners not drawn yet")]
    WinnersNotDrawn,

    #[error("participant is not a winner of this pool")]
    NotAWinner,

    #[error("reward already claimed")]
    AlreadyClaimed,

    // === access errors ===
    #[error("caller is not an authorized operator")]
    Unauthorized,

    // === collaborator errors ===
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("oracle error: {0}")]
    Oracle(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// true when retrying the same call later can succeed without
    /// changing its inputs
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::PoolStillOpen
                | Error::PoolClosed
                | Error::WinnersNotDrawn
                | Error::Ledger(_)
                | Error::Oracle(_)
                | Error::Storage(_)
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Error::Storage(e.to_string())
    }
}
