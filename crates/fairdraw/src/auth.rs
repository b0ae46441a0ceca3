//! operator authorization
//!
//! seed requests, reveals and config updates are gated by an injected role
//! check rather than a single hardcoded identity.

use std::collections::HashSet;
use std::sync::RwLock;

use crate::error::Result;
use crate::types::AccountId;

pub trait Authorizer: Send + Sync {
    fn is_authorized_operator(&self, caller: &AccountId) -> bool;
}

/// mutable allow-list of operator accounts
#[derive(Default)]
pub struct OperatorSet {
    operators: RwLock<HashSet<AccountId>>,
}

impl OperatorSet {
    pub fn new(operators: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            operators: RwLock::new(operators.into_iter().collect()),
        }
    }

    /// returns false if already present
    pub fn add(&self, operator: AccountId) -> Result<bool> {
        Ok(self.operators.write()?.insert(operator))
    }

    /// returns false if not present
    pub fn remove(&self, operator: &AccountId) -> Result<bool> {
        Ok(self.operators.write()?.remove(operator))
    }

    pub fn len(&self) -> usize {
        self.operators.read().map(|set| set.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Authorizer for OperatorSet {
    fn is_authorized_operator(&self, caller: &AccountId) -> bool {
        // poisoned lock denies
        self.operators
            .read()
            .map(|set| set.contains(caller))
            .unwrap_or(false)
    }
}
