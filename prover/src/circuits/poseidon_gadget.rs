//! In-circuit Poseidon matching [`crate::poseidon`] value for value.
//!
//! Each S-box costs three constraints (x^2, x^4, x^5). After every MDS
//! layer the state is re-allocated as fresh witnesses so linear
//! combinations never grow past one variable plus a constant.

use super::{mul, FpWire, Lin};
use crate::poseidon::{self, CAPACITY, RATE, WIDTH};
use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

fn sbox(cs: &ConstraintSystemRef<Fr>, x: &Lin) -> Result<FpWire, SynthesisError> {
    let x2 = Lin::from(mul(cs, x, x)?);
    let x4 = Lin::from(mul(cs, &x2, &x2)?);
    mul(cs, &x4, x)
}

pub fn permute(
    cs: &ConstraintSystemRef<Fr>,
    state: [FpWire; WIDTH],
) -> Result<[FpWire; WIDTH], SynthesisError> {
    let config = poseidon::config();
    let mut state = state;

    for (round, constants) in config.ark.iter().enumerate() {
        let full = poseidon::is_full_round(round);
        let mut layer = Vec::with_capacity(WIDTH);

        for (i, (wire, c)) in state.iter().zip(constants).enumerate() {
            let shifted = Lin::from(wire) + Lin::constant(*c);
            layer.push(if full || i == 0 {
                Lin::from(sbox(cs, &shifted)?)
            } else {
                shifted
            });
        }

        let mut mixed = [FpWire::zero(); WIDTH];
        for (row, slot) in config.mds.iter().zip(mixed.iter_mut()) {
            let combination: Lin = row
                .iter()
                .zip(&layer)
                .map(|(m, elem)| elem.clone() * *m)
                .sum();
            *slot = combination.alloc(cs)?;
        }
        state = mixed;
    }

    Ok(state)
}

/// One absorb and squeeze of the sponge: inputs fill the rate, the digest
/// is the first rate element.
pub fn hash_block(
    cs: &ConstraintSystemRef<Fr>,
    inputs: [FpWire; RATE],
) -> Result<FpWire, SynthesisError> {
    let mut state = [FpWire::zero(); WIDTH];
    state[CAPACITY..].copy_from_slice(&inputs);
    Ok(permute(cs, state)?[CAPACITY])
}

/// Chained variable-length hash, block layout shared with [`poseidon::hash`].
pub fn hash(cs: &ConstraintSystemRef<Fr>, inputs: &[FpWire]) -> Result<FpWire, SynthesisError> {
    let (first, rest) = poseidon::chain_blocks(inputs, FpWire::zero());

    let mut block = [FpWire::zero(); RATE];
    block.copy_from_slice(&first);
    let mut digest = hash_block(cs, block)?;

    for chunk in rest {
        block[0] = digest;
        block[1..].copy_from_slice(&chunk);
        digest = hash_block(cs, block)?;
    }

    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_crypto_primitives::sponge::poseidon::PoseidonSponge;
    use ark_crypto_primitives::sponge::{CryptographicSponge, FieldBasedCryptographicSponge};
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn test_gadget_matches_native_hash() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let values: Vec<Fr> = (10..17u64).map(Fr::from).collect();
        let wires = values
            .iter()
            .map(|v| FpWire::witness(&cs, *v))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        let digest = hash(&cs, &wires).unwrap();
        assert_eq!(digest.value, poseidon::hash(&values));
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_permutation_matches_sponge_rate() {
        let inputs = [21u64, 22, 23, 24].map(Fr::from);
        let mut sponge = PoseidonSponge::new(poseidon::config());
        sponge.absorb(&inputs.to_vec());
        let expected: Vec<Fr> = sponge.squeeze_native_field_elements(RATE);

        let cs = ConstraintSystem::<Fr>::new_ref();
        let mut state = [FpWire::zero(); WIDTH];
        for (slot, value) in state[CAPACITY..].iter_mut().zip(inputs) {
            *slot = FpWire::witness(&cs, value).unwrap();
        }
        let permuted = permute(&cs, state).unwrap();
        let rate: Vec<Fr> = permuted[CAPACITY..].iter().map(|w| w.value).collect();
        assert_eq!(rate, expected);
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_padded_hash_builds_matrices() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let a = FpWire::witness(&cs, Fr::from(1u64)).unwrap();
        hash(&cs, &[a]).unwrap();
        cs.finalize();
        assert!(cs.to_matrices().is_some());
    }

    #[test]
    fn test_tampered_witness_is_unsatisfied() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let a = FpWire::witness(&cs, Fr::from(1u64)).unwrap();
        let b = FpWire::witness(&cs, Fr::from(2u64)).unwrap();
        let digest = hash(&cs, &[a, b]).unwrap();

        // Claim a different digest as a public input
        let claimed = FpWire::input(&cs, digest.value + Fr::from(1u64)).unwrap();
        super::super::enforce_equal(&cs, &digest, &claimed).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }
}
