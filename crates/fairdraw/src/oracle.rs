//! randomness oracle capability
//!
//! the core never computes or checks randomness itself. it asks the oracle for
//! a commitment handle, later receives a value + proof from the operator, and
//! lets the oracle decide whether the pair matches the handle.
//!
//! implementations:
//! - `HashCommitOracle`: sha256 commit/reveal held in memory, for tests and
//!   local deployments. NOT a vrf, the operator sees secrets before reveal.

use std::collections::HashMap;
use std::sync::RwLock;

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::types::{Proof, RevealedValue, SeedHandle};

/// external source of verifiable randomness
pub trait RandomnessOracle: Send + Sync {
    /// request a fresh commitment
    fn commit(&self) -> Result<SeedHandle>;

    /// disclose the value behind a commitment with its proof
    fn reveal(&self, handle: &SeedHandle) -> Result<(RevealedValue, Proof)>;

    /// check that value and proof belong to handle
    fn verify(&self, handle: &SeedHandle, value: &RevealedValue, proof: &Proof) -> bool;
}

const COMMIT_DOMAIN: &[u8] = b"fairdraw:commit:v1";
const VALUE_DOMAIN: &[u8] = b"fairdraw:value:v1";

fn tagged_hash(domain: &[u8], data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    hasher.finalize().into()
}

/// sha256 commit/reveal oracle
///
/// handle = H(commit_domain || secret), value = H(value_domain || secret),
/// proof = secret
pub struct HashCommitOracle {
    secrets: RwLock<HashMap<SeedHandle, [u8; 32]>>,
}

impl HashCommitOracle {
    pub fn new() -> Self {
        Self {
            secrets: RwLock::new(HashMap::new()),
        }
    }

    /// commit to a caller-chosen secret (deterministic tests)
    pub fn commit_secret(&self, secret: [u8; 32]) -> Result<SeedHandle> {
        let handle = SeedHandle(tagged_hash(COMMIT_DOMAIN, &secret));
        self.secrets.write()?.insert(handle, secret);
        Ok(handle)
    }

    /// value and proof a given secret opens to
    pub fn open(secret: &[u8; 32]) -> (RevealedValue, Proof) {
        (
            RevealedValue(tagged_hash(VALUE_DOMAIN, secret)),
            Proof(secret.to_vec()),
        )
    }
}

impl Default for HashCommitOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomnessOracle for HashCommitOracle {
    fn commit(&self) -> Result<SeedHandle> {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        self.commit_secret(secret)
    }

    fn reveal(&self, handle: &SeedHandle) -> Result<(RevealedValue, Proof)> {
        let secrets = self.secrets.read()?;
        let secret = secrets
            .get(handle)
            .ok_or_else(|| Error::Oracle("unknown seed handle".into()))?;
        Ok(Self::open(secret))
    }

    fn verify(&self, handle: &SeedHandle, value: &RevealedValue, proof: &Proof) -> bool {
        let Ok(secret) = <[u8; 32]>::try_from(proof.0.as_slice()) else {
            return false;
        };
        tagged_hash(COMMIT_DOMAIN, &secret) == handle.0
            && tagged_hash(VALUE_DOMAIN, &secret) == value.0
    }
}
