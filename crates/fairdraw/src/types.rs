//! core types shared across the draw engine

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// sequential pool identifier, starting at 1
pub type PoolId = u64;

/// token amount in minor units
pub type Amount = u128;

/// unix timestamp in seconds
pub type Timestamp = u64;

/// basis points (1/100 of a percent)
pub type Bps = u32;

pub const BPS_DENOMINATOR: Bps = 10_000;

/// 32-byte account identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// derive an account id from a human readable label
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"fairdraw:account:v1");
        hasher.update(label.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // short form keeps logs readable
        write!(f, "AccountId({}..)", &self.to_hex()[..8])
    }
}

impl FromStr for AccountId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// opaque reference to a randomness commitment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeedHandle(pub [u8; 32]);

/// disclosed randomness, read as a big-endian 256-bit integer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevealedValue(pub [u8; 32]);

/// oracle-specific proof that a revealed value matches its commitment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof(pub Vec<u8>);

/// pool lifecycle, strictly forward
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PoolState {
    /// created, no entries yet, window not started
    Pending,
    /// first entry recorded, window running
    Open,
    /// window elapsed, no more entries
    Closed,
    /// oracle commitment stored
    SeedCommitted,
    /// proof verified, value stored
    SeedRevealed,
    /// winners selected and rewards fixed
    Drawn,
}

impl PoolState {
    /// the only state this one may move to
    pub fn next(self) -> Option<PoolState> {
        match self {
            PoolState::Pending => Some(PoolState::Open),
            PoolState::Open => Some(PoolState::Closed),
            PoolState::Closed => Some(PoolState::SeedCommitted),
            PoolState::SeedCommitted => Some(PoolState::SeedRevealed),
            PoolState::SeedRevealed => Some(PoolState::Drawn),
            PoolState::Drawn => None,
        }
    }

    /// pools in these states still take entries
    pub fn is_admitting(self) -> bool {
        matches!(self, PoolState::Pending | PoolState::Open)
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PoolState::Pending => "pending",
            PoolState::Open => "open",
            PoolState::Closed => "closed",
            PoolState::SeedCommitted => "seed-committed",
            PoolState::SeedRevealed => "seed-revealed",
            PoolState::Drawn => "drawn",
        };
        f.write_str(s)
    }
}

/// one selected participant of a drawn pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub participant: AccountId,
    /// share of the collected total in basis points, `winner_share_percent * 100 / W`.
    /// the paid `reward_amount` is `winner_pool / W`
    pub share_bps: Bps,
    pub reward_amount: Amount,
    /// monotonic false -> true
    pub claimed: bool,
}

/// answer to `is_winner`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerStatus {
    pub is_winner: bool,
    pub reward_amount: Amount,
    pub claimed: bool,
}

impl WinnerStatus {
    pub const NONE: WinnerStatus = WinnerStatus {
        is_winner: false,
        reward_amount: 0,
        claimed: false,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_order() {
        let mut state = PoolState::Pending;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            assert!(next > state);
            state = next;
            seen.push(state);
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(state, PoolState::Drawn);
    }

    #[test]
    fn test_account_hex() {
        let id = AccountId::from_label("alice");
        let parsed: AccountId = id.to_hex().parse().unwrap();
        assert_eq!(id, parsed);

        let prefixed: AccountId = format!("0x{}", id.to_hex()).parse().unwrap();
        assert_eq!(id, prefixed);

        assert!("zz".parse::<AccountId>().is_err());
        assert_ne!(AccountId::from_label("alice"), AccountId::from_label("bob"));
    }

    #[test]
    fn test_account_serde_as_string() {
        let id = AccountId([7u8; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "07".repeat(32)));
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
