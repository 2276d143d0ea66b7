//! Canonical encoding of BN254 scalar field elements.
//!
//! Every field value that crosses a trust boundary (card commitments, deck
//! digests, public proof inputs) travels as a fixed-width 32-byte big-endian
//! integer that must already be reduced modulo the field order. Decoding
//! rejects anything at or above the modulus instead of silently reducing it.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use thiserror::Error;

/// Width of a serialized field element.
pub const FIELD_BYTES: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Field element must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("Field element is not reduced modulo the scalar field order")]
    NotCanonical,
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),
}

/// Serialize a field element as a 32-byte big-endian integer.
pub fn to_bytes_be(value: &Fr) -> [u8; FIELD_BYTES] {
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; FIELD_BYTES];
    out[FIELD_BYTES - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Parse a canonical 32-byte big-endian field element.
pub fn from_bytes_be(bytes: &[u8]) -> Result<Fr, FieldError> {
    if bytes.len() != FIELD_BYTES {
        return Err(FieldError::InvalidLength {
            expected: FIELD_BYTES,
            actual: bytes.len(),
        });
    }

    let value = Fr::from_be_bytes_mod_order(bytes);
    if to_bytes_be(&value)[..] != *bytes {
        return Err(FieldError::NotCanonical);
    }

    Ok(value)
}

/// Interpret arbitrary bytes (e.g. a hash digest) as a field element by
/// reducing modulo the field order. Only for values the protocol derives
/// itself; untrusted input goes through [`from_bytes_be`].
pub fn reduce_bytes_be(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

/// `value mod modulus` computed on the canonical integer representative.
pub fn reduce_to_u64(value: &Fr, modulus: u64) -> u64 {
    debug_assert!(modulus > 0, "modulus must be non-zero");
    let modulus = modulus as u128;
    value
        .into_bigint()
        .as_ref()
        .iter()
        .rev()
        .fold(0u128, |rem, limb| ((rem << 64) | *limb as u128) % modulus) as u64
}

pub fn to_hex(value: &Fr) -> String {
    hex::encode(to_bytes_be(value))
}

pub fn from_hex(s: &str) -> Result<Fr, FieldError> {
    let bytes = hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| FieldError::InvalidHex(e.to_string()))?;
    from_bytes_be(&bytes)
}

/// Serde adapter: field elements as canonical big-endian hex strings.
pub mod serde_hex {
    use ark_bn254::Fr;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Fr, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::to_hex(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::{Field, One, Zero};

    #[test]
    fn test_small_values_encode_big_endian() {
        let bytes = to_bytes_be(&Fr::from(0x0102u64));
        assert_eq!(bytes[30], 0x01);
        assert_eq!(bytes[31], 0x02);
        assert!(bytes[..30].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_decode_rejects_modulus_and_above() {
        let modulus = Fr::MODULUS.to_bytes_be();
        assert_eq!(from_bytes_be(&modulus), Err(FieldError::NotCanonical));
        assert_eq!(from_bytes_be(&[0xff; 32]), Err(FieldError::NotCanonical));
    }

    #[test]
    fn test_decode_accepts_largest_element() {
        let largest = -Fr::one();
        let bytes = to_bytes_be(&largest);
        assert_eq!(from_bytes_be(&bytes).unwrap(), largest);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert_eq!(
            from_bytes_be(&[0u8; 31]),
            Err(FieldError::InvalidLength {
                expected: 32,
                actual: 31
            })
        );
    }

    #[test]
    fn test_reduce_to_u64_matches_integer_arithmetic() {
        let value = Fr::from(1_000_003u64);
        assert_eq!(reduce_to_u64(&value, 52), 1_000_003 % 52);
        assert_eq!(reduce_to_u64(&Fr::zero(), 7), 0);

        // -1 = p - 1, and p - 1 is even for the BN254 scalar field
        assert_eq!(reduce_to_u64(&(-Fr::one()), 2), 0);
        let two_inv = Fr::from(2u64).inverse().unwrap();
        assert_eq!(two_inv + two_inv, Fr::one());
    }

    #[test]
    fn test_hex_round_trip_with_prefix() {
        let value = Fr::from(987_654_321u64);
        let encoded = format!("0x{}", to_hex(&value));
        assert_eq!(from_hex(&encoded).unwrap(), value);
        assert!(matches!(from_hex("zz"), Err(FieldError::InvalidHex(_))));
    }
}
