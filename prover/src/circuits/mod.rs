// R1CS circuits for the dealing and showdown proofs, written against raw
// `ConstraintSystemRef` variables

pub mod deck;
pub mod hand_reveal;
pub mod hole_cards;
pub mod poseidon_gadget;
pub mod ranking;
pub mod reveal;

pub use hand_reveal::HandRevealCircuit;
pub use hole_cards::HoleCardsCircuit;
pub use reveal::RevealCircuit;

use ark_bn254::Fr;
use ark_ff::{One, Zero};
use ark_relations::lc;
use ark_relations::r1cs::{ConstraintSystemRef, LinearCombination, SynthesisError, Variable};
use std::iter::Sum;
use std::ops::{Add, Mul, Sub};

/// A circuit variable together with its assigned value.
#[derive(Clone, Copy, Debug)]
pub struct FpWire {
    pub variable: Variable,
    pub value: Fr,
}

impl FpWire {
    pub fn witness(cs: &ConstraintSystemRef<Fr>, value: Fr) -> Result<Self, SynthesisError> {
        let variable = cs.new_witness_variable(|| Ok(value))?;
        Ok(Self { variable, value })
    }

    pub fn input(cs: &ConstraintSystemRef<Fr>, value: Fr) -> Result<Self, SynthesisError> {
        let variable = cs.new_input_variable(|| Ok(value))?;
        Ok(Self { variable, value })
    }

    /// Boolean witness: b * (b - 1) = 0
    pub fn bit(cs: &ConstraintSystemRef<Fr>, set: bool) -> Result<Self, SynthesisError> {
        let wire = Self::witness(cs, if set { Fr::one() } else { Fr::zero() })?;
        cs.enforce_constraint(wire.lc(), wire.lc() - Variable::One, lc!())?;
        Ok(wire)
    }

    /// Constant zero, used for padding. It never reaches a matrix row.
    pub fn zero() -> Self {
        Self {
            variable: Variable::Zero,
            value: Fr::zero(),
        }
    }

    pub fn lc(&self) -> LinearCombination<Fr> {
        if self.variable.is_zero() {
            lc!()
        } else {
            lc!() + self.variable
        }
    }
}

/// A linear combination of wires with its assigned value.
///
/// Additions and scalings are free; only [`mul`] and [`Lin::alloc`] add
/// constraints.
#[derive(Clone, Debug)]
pub struct Lin {
    lc: LinearCombination<Fr>,
    value: Fr,
}

impl Lin {
    pub fn zero() -> Self {
        Self {
            lc: lc!(),
            value: Fr::zero(),
        }
    }

    pub fn constant(c: Fr) -> Self {
        Self {
            lc: lc!() + (c, Variable::One),
            value: c,
        }
    }

    pub fn one() -> Self {
        Self::constant(Fr::one())
    }

    pub fn value(&self) -> Fr {
        self.value
    }

    pub fn lc(&self) -> LinearCombination<Fr> {
        self.lc.clone()
    }

    /// Pin the combination to a fresh witness.
    pub fn alloc(&self, cs: &ConstraintSystemRef<Fr>) -> Result<FpWire, SynthesisError> {
        let wire = FpWire::witness(cs, self.value)?;
        cs.enforce_constraint(self.lc(), lc!() + Variable::One, wire.lc())?;
        Ok(wire)
    }
}

impl From<FpWire> for Lin {
    fn from(wire: FpWire) -> Self {
        Self {
            lc: wire.lc(),
            value: wire.value,
        }
    }
}

impl From<&FpWire> for Lin {
    fn from(wire: &FpWire) -> Self {
        Self::from(*wire)
    }
}

impl Add for Lin {
    type Output = Lin;

    fn add(self, other: Lin) -> Lin {
        Lin {
            lc: self.lc + other.lc,
            value: self.value + other.value,
        }
    }
}

impl Sub for Lin {
    type Output = Lin;

    fn sub(self, other: Lin) -> Lin {
        Lin {
            lc: self.lc - other.lc,
            value: self.value - other.value,
        }
    }
}

impl Mul<Fr> for Lin {
    type Output = Lin;

    fn mul(self, scalar: Fr) -> Lin {
        Lin {
            lc: self.lc * scalar,
            value: self.value * scalar,
        }
    }
}

impl Sum for Lin {
    fn sum<I: Iterator<Item = Lin>>(iter: I) -> Lin {
        iter.fold(Lin::zero(), |acc, term| acc + term)
    }
}

/// a == b
pub fn enforce_equal(
    cs: &ConstraintSystemRef<Fr>,
    a: &FpWire,
    b: &FpWire,
) -> Result<(), SynthesisError> {
    enforce_lin_equal(cs, &Lin::from(a), &Lin::from(b))
}

pub fn enforce_lin_equal(
    cs: &ConstraintSystemRef<Fr>,
    a: &Lin,
    b: &Lin,
) -> Result<(), SynthesisError> {
    cs.enforce_constraint(a.lc(), lc!() + Variable::One, b.lc())
}

/// a * b as a fresh witness.
pub fn mul(cs: &ConstraintSystemRef<Fr>, a: &Lin, b: &Lin) -> Result<FpWire, SynthesisError> {
    let product = FpWire::witness(cs, a.value * b.value)?;
    cs.enforce_constraint(a.lc(), b.lc(), product.lc())?;
    Ok(product)
}

/// Decompose `value` into `size` boolean wires, exactly one set, whose
/// index equals the value. Also range checks `value` into `0..size`.
pub fn one_hot(
    cs: &ConstraintSystemRef<Fr>,
    value: &Lin,
    size: usize,
) -> Result<Vec<FpWire>, SynthesisError> {
    let position = (0..size).position(|k| Fr::from(k as u64) == value.value);
    let bits = (0..size)
        .map(|k| FpWire::bit(cs, position == Some(k)))
        .collect::<Result<Vec<_>, _>>()?;

    let count: Lin = bits.iter().map(Lin::from).sum();
    enforce_lin_equal(cs, &count, &Lin::one())?;
    let index: Lin = bits
        .iter()
        .enumerate()
        .map(|(k, bit)| Lin::from(bit) * Fr::from(k as u64))
        .sum();
    enforce_lin_equal(cs, &index, value)?;
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn test_zero_padding_survives_matrix_construction() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let zero = FpWire::witness(&cs, Fr::zero()).unwrap();
        enforce_equal(&cs, &zero, &FpWire::zero()).unwrap();
        assert!(cs.is_satisfied().unwrap());

        cs.finalize();
        let matrices = cs.to_matrices().unwrap();
        assert_eq!(matrices.num_constraints, 1);
    }

    #[test]
    fn test_one_hot_range_checks() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let value = FpWire::witness(&cs, Fr::from(3u64)).unwrap();
        let bits = one_hot(&cs, &Lin::from(value), 5).unwrap();
        let set: Vec<bool> = bits.iter().map(|b| b.value.is_one()).collect();
        assert_eq!(set, vec![false, false, false, true, false]);
        assert!(cs.is_satisfied().unwrap());

        let cs = ConstraintSystem::<Fr>::new_ref();
        let value = FpWire::witness(&cs, Fr::from(5u64)).unwrap();
        one_hot(&cs, &Lin::from(value), 5).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_product_constraint() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let a = FpWire::witness(&cs, Fr::from(6u64)).unwrap();
        let b = FpWire::witness(&cs, Fr::from(7u64)).unwrap();
        let shifted = Lin::from(b) + Lin::constant(Fr::from(1u64));
        let product = mul(&cs, &Lin::from(a), &shifted).unwrap();
        assert_eq!(product.value, Fr::from(48u64));
        assert!(cs.is_satisfied().unwrap());
    }
}
