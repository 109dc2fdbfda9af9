//! field elements and their text/binary encodings
//!
//! every circuit value lives in the pallas base field, which is also the
//! scalar field of vesta, the curve the halo2 ipa backend commits with.
//! arithmetic is the curve crate's; this module only converts.

use core::fmt;

use pasta_curves::group::ff::{Field, PrimeField};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CircuitError, Result};

/// the circuit field
pub type Fp = pasta_curves::pallas::Base;

/// widest bit decomposition with a unique canonical witness
///
/// the modulus is just above 2^254, so every value below 2^254 has
/// exactly one 254-bit decomposition.
pub const MAX_BITS: usize = 254;

/// low `n` bits of the canonical representation, least significant first
pub fn bits_le(value: &Fp, n: usize) -> Vec<bool> {
    let repr = value.to_repr();
    let bytes = repr.as_ref();
    (0..n)
        .map(|i| i < 256 && (bytes[i / 8] >> (i % 8)) & 1 == 1)
        .collect()
}

/// 2^i as a field element
pub fn pow2(i: usize) -> Fp {
    let mut acc = Fp::ONE;
    for _ in 0..i {
        acc = acc.double();
    }
    acc
}

/// parse a decimal string or a `0x` big-endian hex string
pub fn parse(text: &str) -> Result<Fp> {
    let text = text.trim();
    let bytes = if let Some(hex_digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        hex_to_le(hex_digits)?
    } else {
        decimal_to_le(text)?
    };
    Option::from(Fp::from_repr(bytes))
        .ok_or_else(|| CircuitError::FieldElement(format!("{} is not below the field modulus", text)))
}

/// `0x` big-endian hex, 64 digits
pub fn to_hex(value: &Fp) -> String {
    let mut be = value.to_repr();
    be.reverse();
    format!("0x{}", hex::encode(be))
}

fn hex_to_le(digits: &str) -> Result<[u8; 32]> {
    if digits.is_empty() || digits.len() > 64 {
        return Err(CircuitError::FieldElement(format!("bad hex length: 0x{}", digits)));
    }
    let padded = format!("{:0>64}", digits);
    let be = hex::decode(&padded)
        .map_err(|e| CircuitError::FieldElement(format!("0x{}: {}", digits, e)))?;
    let mut le = [0u8; 32];
    for (dst, src) in le.iter_mut().zip(be.iter().rev()) {
        *dst = *src;
    }
    Ok(le)
}

fn decimal_to_le(digits: &str) -> Result<[u8; 32]> {
    if digits.is_empty() {
        return Err(CircuitError::FieldElement("empty string".into()));
    }
    // 256-bit accumulator in u64 limbs, least significant first
    let mut limbs = [0u64; 4];
    for ch in digits.chars() {
        let d = ch
            .to_digit(10)
            .ok_or_else(|| CircuitError::FieldElement(format!("not a decimal number: {}", digits)))?;
        let mut carry = d as u128;
        for limb in limbs.iter_mut() {
            let wide = (*limb as u128) * 10 + carry;
            *limb = wide as u64;
            carry = wide >> 64;
        }
        if carry != 0 {
            return Err(CircuitError::FieldElement(format!("{} exceeds 256 bits", digits)));
        }
    }
    let mut le = [0u8; 32];
    for (i, limb) in limbs.iter().enumerate() {
        le[i * 8..(i + 1) * 8].copy_from_slice(&limb.to_le_bytes());
    }
    Ok(le)
}

/// field element as it appears in witness json
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Felt(pub Fp);

impl Felt {
    pub fn value(self) -> Fp {
        self.0
    }
}

impl fmt::Debug for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Felt({})", to_hex(&self.0))
    }
}

impl From<u64> for Felt {
    fn from(v: u64) -> Self {
        Felt(Fp::from(v))
    }
}

impl From<Fp> for Felt {
    fn from(v: Fp) -> Self {
        Felt(v)
    }
}

impl Serialize for Felt {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_hex(&self.0))
    }
}

impl<'de> Deserialize<'de> for Felt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        struct FeltVisitor;

        impl<'de> Visitor<'de> for FeltVisitor {
            type Value = Felt;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an unsigned integer, a decimal string or a 0x hex string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> core::result::Result<Felt, E> {
                Ok(Felt::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> core::result::Result<Felt, E> {
                u64::try_from(v)
                    .map(Felt::from)
                    .map_err(|_| E::custom(format!("negative field element: {}", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> core::result::Result<Felt, E> {
                parse(v).map(Felt).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(FeltVisitor)
    }
}

/// serde adapter storing a field element as its 32-byte representation
pub(crate) mod repr {
    use super::Fp;
    use pasta_curves::group::ff::PrimeField;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Fp, serializer: S) -> Result<S::Ok, S::Error> {
        value.to_repr().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fp, D::Error> {
        let bytes = <[u8; 32]>::deserialize(deserializer)?;
        Option::from(Fp::from_repr(bytes))
            .ok_or_else(|| de::Error::custom("non-canonical field element"))
    }
}
