//! pool configuration
//!
//! the service holds one current `PoolConfig`. every pool copies it into
//! `PoolParams` when created, so an update only affects later pools.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{AccountId, Amount, Bps};

/// longest accepted entry window, one year
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// how an index is derived from a seed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// `seed mod remaining`, carries a small modulo bias
    #[default]
    Modulo,
    /// rehash seeds that land in the biased tail before reducing
    Rejection,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// fixed fee per entry, minor units
    pub entry_fee: Amount,
    /// window length from the first entry
    pub duration_secs: u64,
    /// W, winners per pool
    pub winner_count: u32,
    /// protocol fee, whole percent of the collected total
    pub fee_percent: u8,
    /// part of the collected total owed to winners, whole percent
    pub winner_share_percent: u8,
    /// receives the protocol fee at draw time
    pub fee_recipient: AccountId,
    #[serde(default)]
    pub selection: SelectionMode,
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.winner_count == 0 {
            return Err(Error::InvalidWinnerCount);
        }
        if self.entry_fee == 0 {
            return Err(Error::InvalidConfig("entry fee must be non-zero".into()));
        }
        if self.duration_secs == 0 {
            return Err(Error::InvalidConfig("duration must be non-zero".into()));
        }
        if self.duration_secs > MAX_DURATION_SECS {
            return Err(Error::InvalidConfig(format!(
                "duration {}s exceeds {}s",
                self.duration_secs, MAX_DURATION_SECS
            )));
        }
        if self.fee_percent > 100 {
            return Err(Error::InvalidConfig(format!(
                "fee percent {} exceeds 100",
                self.fee_percent
            )));
        }
        if self.fee_percent as u16 + self.winner_share_percent as u16 != 100 {
            return Err(Error::InvalidConfig(format!(
                "fee {}% and winner share {}% must sum to 100",
                self.fee_percent, self.winner_share_percent
            )));
        }
        Ok(())
    }

    /// per-winner share of the collected total, in basis points
    pub fn share_per_winner_bps(&self) -> Bps {
        self.winner_share_percent as Bps * 100 / self.winner_count
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            entry_fee: 5,
            duration_secs: 24 * 60 * 60,
            winner_count: 5,
            fee_percent: 10,
            winner_share_percent: 90,
            fee_recipient: AccountId::from_label("fee-recipient"),
            selection: SelectionMode::Modulo,
        }
    }
}

/// frozen copy of the config a pool was created under
pub type PoolParams = PoolConfig;
