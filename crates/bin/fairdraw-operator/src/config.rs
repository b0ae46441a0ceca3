//! operator configuration file (json)

use std::path::Path;

use anyhow::{bail, Context};
use fairdraw::{AccountId, Amount, PoolConfig};
use serde::{Deserialize, Serialize};

fn default_tick_secs() -> u64 {
    10
}

/// account funded in the in-memory ledger at startup
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DemoParticipant {
    /// label hashed into an account id
    pub label: String,
    pub balance: Amount,
}

impl DemoParticipant {
    pub fn account(&self) -> AccountId {
        AccountId::from_label(&self.label)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OperatorConfig {
    pub pool: PoolConfig,
    /// identity this daemon acts as
    pub operator: AccountId,
    /// accounts allowed to seed and draw, `operator` is always added
    #[serde(default)]
    pub operators: Vec<AccountId>,
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    #[serde(default)]
    pub demo_participants: Vec<DemoParticipant>,
}

impl OperatorConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.pool.validate().context("pool config")?;
        if self.tick_secs == 0 {
            bail!("tick_secs must be non-zero");
        }
        Ok(())
    }

    /// configured operators plus our own identity
    pub fn operator_set(&self) -> Vec<AccountId> {
        let mut ops = self.operators.clone();
        if !ops.contains(&self.operator) {
            ops.push(self.operator);
        }
        ops
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            operator: AccountId::from_label("operator"),
            operators: Vec::new(),
            tick_secs: default_tick_secs(),
            demo_participants: (0..5)
                .map(|i| DemoParticipant {
                    label: format!("player-{}", i),
                    balance: 100,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrips_through_json() {
        let cfg = OperatorConfig::default();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let back: OperatorConfig = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();
        assert_eq!(back.pool, cfg.pool);
        assert_eq!(back.demo_participants.len(), 5);
    }

    #[test]
    fn test_operator_always_authorized() {
        let cfg = OperatorConfig::default();
        assert_eq!(cfg.operator_set(), vec![cfg.operator]);

        let other = AccountId::from_label("other");
        let cfg = OperatorConfig {
            operators: vec![other, AccountId::from_label("operator")],
            ..Default::default()
        };
        assert_eq!(cfg.operator_set().len(), 2);
    }

    #[test]
    fn test_rejects_zero_tick() {
        let cfg = OperatorConfig {
            tick_secs: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
