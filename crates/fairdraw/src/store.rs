//! pool arena
//!
//! pools live in a vec indexed by `id - 1`, each behind its own mutex so
//! every mutating operation on one pool is serialized while different pools
//! proceed independently.
//!
//! lock order: a pool mutex may be held while taking the arena lock (rollover
//! allocates the next pool from inside `close`). the arena lock is never held
//! while waiting on a pool mutex.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use crate::config::PoolParams;
use crate::error::{Error, Result};
use crate::pool::Pool;
use crate::types::{PoolId, Timestamp};

pub struct PoolStore {
    pools: RwLock<Vec<Arc<Mutex<Pool>>>>,
    current: AtomicU64,
}

impl PoolStore {
    pub fn new() -> Self {
        Self {
            pools: RwLock::new(Vec::new()),
            current: AtomicU64::new(0),
        }
    }

    /// allocate the next pool and make it the one taking entries
    pub fn create_pool(&self, params: PoolParams, now: Timestamp) -> Result<PoolId> {
        let mut pools = self.pools.write()?;
        let id = pools.len() as PoolId + 1;
        pools.push(Arc::new(Mutex::new(Pool::new(id, params, now))));
        self.current.store(id, Ordering::SeqCst);
        debug!(pool = id, "pool created");
        Ok(id)
    }

    /// pool currently taking entries, 0 before the first pool exists
    pub fn current_id(&self) -> PoolId {
        self.current.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.pools.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, id: PoolId) -> Result<Arc<Mutex<Pool>>> {
        let pools = self.pools.read()?;
        id.checked_sub(1)
            .and_then(|idx| pools.get(idx as usize))
            .cloned()
            .ok_or(Error::PoolNotFound(id))
    }

    /// run `f` with exclusive access to pool `id`
    pub fn with_pool<T>(&self, id: PoolId, f: impl FnOnce(&mut Pool) -> Result<T>) -> Result<T> {
        let pool = self.get(id)?;
        let mut guard = pool.lock()?;
        f(&mut guard)
    }

    /// run a read-only `f` against pool `id`
    pub fn read_pool<T>(&self, id: PoolId, f: impl FnOnce(&Pool) -> T) -> Result<T> {
        let pool = self.get(id)?;
        let guard = pool.lock()?;
        Ok(f(&guard))
    }

    /// visit every pool in id order, one lock at a time
    pub fn scan<T>(&self, mut f: impl FnMut(&Pool) -> Option<T>) -> Result<Vec<T>> {
        let pools: Vec<_> = self.pools.read()?.iter().cloned().collect();
        let mut out = Vec::new();
        for pool in pools {
            if let Some(item) = f(&*pool.lock()?) {
                out.push(item);
            }
        }
        Ok(out)
    }
}

impl Default for PoolStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::types::PoolState;

    #[test]
    fn test_sequential_ids() {
        let store = PoolStore::new();
        assert_eq!(store.current_id(), 0);
        assert!(store.is_empty());

        assert_eq!(store.create_pool(PoolConfig::default(), 0).unwrap(), 1);
        assert_eq!(store.create_pool(PoolConfig::default(), 0).unwrap(), 2);
        assert_eq!(store.current_id(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_missing_pool() {
        let store = PoolStore::new();
        store.create_pool(PoolConfig::default(), 0).unwrap();
        assert_eq!(store.read_pool(0, |p| p.id()), Err(Error::PoolNotFound(0)));
        assert_eq!(store.read_pool(2, |p| p.id()), Err(Error::PoolNotFound(2)));
        assert_eq!(store.read_pool(1, |p| p.state()), Ok(PoolState::Pending));
    }

    #[test]
    fn test_rollover_inside_pool_lock() {
        // allocating while a pool is locked must not deadlock
        let store = PoolStore::new();
        store.create_pool(PoolConfig::default(), 0).unwrap();
        let next = store
            .with_pool(1, |_| store.create_pool(PoolConfig::default(), 5))
            .unwrap();
        assert_eq!(next, 2);
    }

    #[test]
    fn test_scan() {
        let store = PoolStore::new();
        for _ in 0..3 {
            store.create_pool(PoolConfig::default(), 0).unwrap();
        }
        let odd = store
            .scan(|p| (p.id() % 2 == 1).then_some(p.id()))
            .unwrap();
        assert_eq!(odd, vec![1, 3]);
    }
}
