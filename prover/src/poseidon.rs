//! Poseidon over the BN254 scalar field.
//!
//! Width 5 (rate 4, capacity 1), x^5 S-box, 8 full and 60 partial rounds.
//! Round constants and the MDS matrix come from the Grain LFSR generator in
//! `ark-crypto-primitives`, and the native hash runs on its
//! [`PoseidonSponge`], so the R1CS gadget in
//! [`crate::circuits::poseidon_gadget`] only has to agree with one config.
//!
//! Inputs longer than the rate are absorbed by chaining: the first block
//! takes four inputs, each later block takes the previous digest plus the
//! next three inputs. Short blocks are zero padded. A block's digest is the
//! first rate element squeezed after one permutation.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{
    find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge,
};
use ark_crypto_primitives::sponge::{CryptographicSponge, FieldBasedCryptographicSponge};
use ark_ff::{PrimeField, Zero};
use once_cell::sync::Lazy;

pub const RATE: usize = 4;
pub const CAPACITY: usize = 1;
pub const WIDTH: usize = RATE + CAPACITY;
pub const FULL_ROUNDS: usize = 8;
pub const PARTIAL_ROUNDS: usize = 60;
pub const ALPHA: u64 = 5;

static CONFIG: Lazy<PoseidonConfig<Fr>> = Lazy::new(|| {
    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        Fr::MODULUS_BIT_SIZE as u64,
        RATE,
        FULL_ROUNDS as u64,
        PARTIAL_ROUNDS as u64,
        0,
    );
    PoseidonConfig::new(FULL_ROUNDS, PARTIAL_ROUNDS, ALPHA, mds, ark, RATE, CAPACITY)
});

pub fn config() -> &'static PoseidonConfig<Fr> {
    &CONFIG
}

/// Full rounds bracket the partial rounds: four before, four after.
pub fn is_full_round(round: usize) -> bool {
    round < FULL_ROUNDS / 2 || round >= FULL_ROUNDS / 2 + PARTIAL_ROUNDS
}

/// Hash exactly one block of `RATE` elements.
pub fn hash_block(inputs: [Fr; RATE]) -> Fr {
    let mut sponge = PoseidonSponge::new(config());
    sponge.absorb(&inputs.to_vec());
    sponge.squeeze_native_field_elements(1)[0]
}

/// Split an input sequence into the zero-padded blocks absorbed by [`hash`].
///
/// Shared with the in-circuit gadget so both sides chain identically.
pub fn chain_blocks<T: Copy>(inputs: &[T], padding: T) -> (Vec<T>, Vec<Vec<T>>) {
    let split = inputs.len().min(RATE);
    let mut first = inputs[..split].to_vec();
    first.resize(RATE, padding);

    let rest = inputs[split..]
        .chunks(RATE - 1)
        .map(|chunk| {
            let mut block = chunk.to_vec();
            block.resize(RATE - 1, padding);
            block
        })
        .collect();

    (first, rest)
}

/// Variable-length hash used for card commitments, shuffle draws and the
/// deck digest.
pub fn hash(inputs: &[Fr]) -> Fr {
    let (first, rest) = chain_blocks(inputs, Fr::zero());

    let mut block = [Fr::zero(); RATE];
    block.copy_from_slice(&first);
    let mut digest = hash_block(block);

    for chunk in rest {
        block[0] = digest;
        block[1..].copy_from_slice(&chunk);
        digest = hash_block(block);
    }

    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_shape() {
        let config = config();
        assert_eq!(config.ark.len(), FULL_ROUNDS + PARTIAL_ROUNDS);
        assert!(config.ark.iter().all(|row| row.len() == WIDTH));
        assert_eq!(config.mds.len(), WIDTH);
        assert!(config.mds.iter().all(|row| row.len() == WIDTH));
        assert_eq!((config.rate, config.capacity), (RATE, CAPACITY));
    }

    #[test]
    fn test_round_schedule() {
        let full: Vec<usize> = (0..FULL_ROUNDS + PARTIAL_ROUNDS)
            .filter(|r| is_full_round(*r))
            .collect();
        assert_eq!(full, vec![0, 1, 2, 3, 64, 65, 66, 67]);
    }

    #[test]
    fn test_hash_is_deterministic_and_order_sensitive() {
        let a = Fr::from(7u64);
        let b = Fr::from(11u64);
        assert_eq!(hash(&[a, b]), hash(&[a, b]));
        assert_ne!(hash(&[a, b]), hash(&[b, a]));
    }

    #[test]
    fn test_short_input_is_padded_single_block() {
        let a = Fr::from(3u64);
        let b = Fr::from(4u64);
        let expected = hash_block([a, b, Fr::zero(), Fr::zero()]);
        assert_eq!(hash(&[a, b]), expected);
    }

    #[test]
    fn test_long_input_chains_previous_digest() {
        let inputs: Vec<Fr> = (1..=6u64).map(Fr::from).collect();
        let first = hash_block([inputs[0], inputs[1], inputs[2], inputs[3]]);
        let expected = hash_block([first, inputs[4], inputs[5], Fr::zero()]);
        assert_eq!(hash(&inputs), expected);
    }

    #[test]
    fn test_chain_blocks_for_full_deck() {
        let deck: Vec<u8> = (0..52).collect();
        let (first, rest) = chain_blocks(&deck, 0);
        assert_eq!(first, vec![0, 1, 2, 3]);
        // 48 remaining values in blocks of three
        assert_eq!(rest.len(), 16);
        assert_eq!(rest[15], vec![49, 50, 51]);
    }

    #[test]
    fn test_empty_input_hashes_zero_block() {
        assert_eq!(hash(&[]), hash_block([Fr::zero(); RATE]));
    }
}
