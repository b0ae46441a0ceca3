//! winner selection
//!
//! pure function of (revealed value, participant sequence, W, mode). the
//! revealed value is read as a big-endian 256-bit integer `seed`; for each
//! round i in 0..W:
//!
//! ```text
//! index     = seed mod remaining
//! winner    = working[index]
//! working[index] <-> working[remaining - 1], remaining -= 1
//! seed      = sha256(seed || u64_be(i))
//! ```
//!
//! `SelectionMode::Rejection` first rehashes (`seed = sha256(seed)`) while the
//! seed lies in the top `2^256 mod remaining` values, removing modulo bias at
//! the cost of a variable number of hashes.

use sha2::{Digest, Sha256};

use crate::config::SelectionMode;
use crate::error::{Error, Result};
use crate::types::{AccountId, RevealedValue};

type Seed = [u8; 32];

/// `seed mod modulus` over the 256-bit big-endian seed
fn reduce(seed: &Seed, modulus: u64) -> u64 {
    let m = modulus as u128;
    seed.iter()
        .fold(0u128, |acc, &byte| ((acc << 8) | byte as u128) % m) as u64
}

/// next seed for round `round`
pub fn mix(seed: &Seed, round: u64) -> Seed {
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update(round.to_be_bytes());
    hasher.finalize().into()
}

fn rehash(seed: &Seed) -> Seed {
    Sha256::digest(seed).into()
}

/// true if `seed mod modulus` would over-represent low indices
pub fn in_biased_tail(seed: &Seed, modulus: u64) -> bool {
    // 2^256 mod m == ((2^256 - 1) mod m + 1) mod m
    let tail = (reduce(&[0xFF; 32], modulus) as u128 + 1) % modulus as u128;
    if tail == 0 {
        return false;
    }
    // largest unbiased seed is 2^256 - 1 - tail == !tail in 256 bits
    let mut limit = [0xFF; 32];
    limit[24..].copy_from_slice(&(!(tail as u64)).to_be_bytes());
    seed > &limit
}

/// pick `count` distinct participants
///
/// returns winners in draw order. fails with `InvalidWinnerCount` for a zero
/// count and `NotEnoughParticipants` when fewer than `count` entered.
pub fn select(
    value: &RevealedValue,
    participants: &[AccountId],
    count: usize,
    mode: SelectionMode,
) -> Result<Vec<AccountId>> {
    if count == 0 {
        return Err(Error::InvalidWinnerCount);
    }
    if participants.len() < count {
        return Err(Error::NotEnoughParticipants {
            have: participants.len(),
            need: count,
        });
    }

    let mut working = participants.to_vec();
    let mut remaining = working.len();
    let mut seed = value.0;
    let mut winners = Vec::with_capacity(count);

    for round in 0..count {
        if mode == SelectionMode::Rejection {
            while in_biased_tail(&seed, remaining as u64) {
                seed = rehash(&seed);
            }
        }

        let index = reduce(&seed, remaining as u64) as usize;
        winners.push(working[index]);
        working.swap(index, remaining - 1);
        remaining -= 1;

        seed = mix(&seed, round as u64);
    }

    Ok(winners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn accounts(n: usize) -> Vec<AccountId> {
        (0..n).map(|i| AccountId::from_label(&format!("p{}", i))).collect()
    }

    fn value_from_u64(v: u64) -> RevealedValue {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&v.to_be_bytes());
        RevealedValue(bytes)
    }

    #[test]
    fn test_reduce_matches_u64() {
        let mut seed = [0u8; 32];
        seed[24..].copy_from_slice(&123_456_789u64.to_be_bytes());
        assert_eq!(reduce(&seed, 1000), 789);
        assert_eq!(reduce(&seed, 1), 0);
        // 2^64 mod 10 == 6
        let mut big = [0u8; 32];
        big[23] = 1;
        assert_eq!(reduce(&big, 10), 6);
    }

    #[test]
    fn test_first_pick_is_seed_mod_len() {
        let people = accounts(5);
        let winners = select(&value_from_u64(3), &people, 1, SelectionMode::Modulo).unwrap();
        assert_eq!(winners, vec![people[3]]);

        let winners = select(&value_from_u64(12), &people, 1, SelectionMode::Modulo).unwrap();
        assert_eq!(winners, vec![people[2]]);
    }

    #[test]
    fn test_swap_removal_moves_last_into_gap() {
        // seed 0 picks index 0 first; the last participant takes its slot
        let people = accounts(4);
        let value = value_from_u64(0);
        let winners = select(&value, &people, 2, SelectionMode::Modulo).unwrap();
        assert_eq!(winners[0], people[0]);

        let next = mix(&value.0, 0);
        let index = reduce(&next, 3) as usize;
        let expected = [people[3], people[1], people[2]][index];
        assert_eq!(winners[1], expected);
    }

    #[test]
    fn test_draw_everyone_is_permutation() {
        let people = accounts(7);
        let winners = select(&value_from_u64(99), &people, 7, SelectionMode::Modulo).unwrap();
        let mut sorted = winners.clone();
        sorted.sort();
        let mut expected = people.clone();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_errors() {
        let people = accounts(3);
        let value = value_from_u64(1);
        assert_eq!(
            select(&value, &people, 0, SelectionMode::Modulo),
            Err(Error::InvalidWinnerCount)
        );
        assert_eq!(
            select(&value, &people, 4, SelectionMode::Modulo),
            Err(Error::NotEnoughParticipants { have: 3, need: 4 })
        );
    }

    #[test]
    fn test_biased_tail() {
        // 2^256 mod 3 == 1, so only the all-ones seed is in the tail
        assert!(in_biased_tail(&[0xFF; 32], 3));
        let mut below = [0xFF; 32];
        below[31] = 0xFE;
        assert!(!in_biased_tail(&below, 3));

        // powers of two divide 2^256 evenly
        assert!(!in_biased_tail(&[0xFF; 32], 8));
        assert!(!in_biased_tail(&[0xFF; 32], 1));
    }

    #[test]
    fn test_rejection_skips_tail_seed() {
        let people = accounts(3);
        let value = RevealedValue([0xFF; 32]);
        let modulo = select(&value, &people, 1, SelectionMode::Modulo).unwrap();
        let rejection = select(&value, &people, 1, SelectionMode::Rejection).unwrap();

        // modulo uses the raw seed, rejection its rehash
        assert_eq!(modulo[0], people[reduce(&[0xFF; 32], 3) as usize]);
        let rehashed = rehash(&[0xFF; 32]);
        assert!(!in_biased_tail(&rehashed, 3));
        assert_eq!(rejection[0], people[reduce(&rehashed, 3) as usize]);
    }

    proptest! {
        #[test]
        fn prop_winners_distinct_and_deterministic(
            bytes in any::<[u8; 32]>(),
            n in 1usize..40,
            w in 1usize..10,
            rejection in any::<bool>(),
        ) {
            prop_assume!(w <= n);
            let mode = if rejection { SelectionMode::Rejection } else { SelectionMode::Modulo };
            let people = accounts(n);
            let value = RevealedValue(bytes);

            let first = select(&value, &people, w, mode).unwrap();
            let second = select(&value, &people, w, mode).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.len(), w);

            let unique: HashSet<_> = first.iter().collect();
            prop_assert_eq!(unique.len(), w);
            prop_assert!(first.iter().all(|p| people.contains(p)));
        }

        #[test]
        fn prop_reduce_in_range(bytes in any::<[u8; 32]>(), m in 1u64..u64::MAX) {
            prop_assert!(reduce(&bytes, m) < m);
        }
    }
}
