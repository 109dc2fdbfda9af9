//! constraint system for the oracle circuits
//!
//! every constraint is one vanilla plonk gate over the pallas base field:
//!
//!   q_l*a + q_r*b + q_o*c + q_m*a*b + q_c = 0
//!
//! wires are shared between gates by index; the backend turns repeated
//! wires into copy constraints. the builder carries an optional witness
//! value per wire so the same `define` pass yields both the constraint
//! system (values unknown, used for setup) and a full assignment (used
//! for proving).

use std::collections::HashMap;

use blake2::{Blake2s256, Digest};
use pasta_curves::group::ff::{Field, PrimeField};
use serde::{Deserialize, Serialize};

use crate::error::{CircuitError, Result, Unsatisfied};
use crate::field::{bits_le, Fp};

/// wire index into the witness vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Var(pub usize);

impl Var {
    pub fn index(self) -> usize {
        self.0
    }
}

/// one row of the constraint system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub a: Var,
    pub b: Var,
    pub c: Var,
    #[serde(with = "crate::field::repr")]
    pub q_l: Fp,
    #[serde(with = "crate::field::repr")]
    pub q_r: Fp,
    #[serde(with = "crate::field::repr")]
    pub q_o: Fp,
    #[serde(with = "crate::field::repr")]
    pub q_m: Fp,
    #[serde(with = "crate::field::repr")]
    pub q_c: Fp,
}

impl Gate {
    fn zero(a: Var, b: Var, c: Var) -> Self {
        Self {
            a,
            b,
            c,
            q_l: Fp::ZERO,
            q_r: Fp::ZERO,
            q_o: Fp::ZERO,
            q_m: Fp::ZERO,
            q_c: Fp::ZERO,
        }
    }

    /// evaluate the gate polynomial
    pub fn evaluate(&self, a: Fp, b: Fp, c: Fp) -> Fp {
        self.q_l * a + self.q_r * b + self.q_o * c + self.q_m * a * b + self.q_c
    }

    /// check gate against witness values
    pub fn check(&self, values: &[Option<Fp>]) -> core::result::Result<bool, Unsatisfied> {
        let get = |v: Var| values[v.0].ok_or(Unsatisfied::Unassigned { wire: v.0 });
        Ok(self.evaluate(get(self.a)?, get(self.b)?, get(self.c)?).is_zero_vartime())
    }
}

/// compiled circuit shape, independent of any witness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSystem {
    pub num_wires: usize,
    /// public wires in declaration order
    pub public: Vec<Var>,
    /// one name per public wire, e.g. `transitionTime[1]`
    pub public_names: Vec<String>,
    pub gates: Vec<Gate>,
}

impl ConstraintSystem {
    pub fn num_public(&self) -> usize {
        self.public.len()
    }

    pub fn num_gates(&self) -> usize {
        self.gates.len()
    }

    /// canonical byte encoding
    ///
    /// # panics
    ///
    /// never in practice: the system is plain integers, strings and
    /// fixed-size byte arrays, all of which bincode encodes infallibly.
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("constraint system serialization failed")
    }

    pub fn from_bytes(bytes: &[u8]) -> core::result::Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// blake2s-256 of the canonical encoding
    ///
    /// setup artifacts are keyed to this value.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Blake2s256::new();
        hasher.update(b"oracle-circuit/constraint-system/v1");
        hasher.update(self.to_bytes());
        hasher.finalize().into()
    }

    /// check all gates against a witness, reporting the first failure
    pub fn check(&self, witness: &Witness) -> core::result::Result<(), Unsatisfied> {
        if witness.values.len() != self.num_wires {
            return Err(Unsatisfied::WireCount {
                got: witness.values.len(),
                expected: self.num_wires,
            });
        }
        for (i, gate) in self.gates.iter().enumerate() {
            if !gate.check(&witness.values)? {
                return Err(Unsatisfied::Gate { gate: i });
            }
        }
        Ok(())
    }

    /// number of multiplication gates (main cost metric)
    pub fn num_mul_gates(&self) -> usize {
        self.gates.iter().filter(|g| !g.q_m.is_zero_vartime()).count()
    }
}

/// assignment of every wire; `None` where the value is not known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    pub values: Vec<Option<Fp>>,
}

impl Witness {
    pub fn get(&self, var: Var) -> Option<Fp> {
        self.values[var.0]
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }

    /// public input vector in declaration order
    pub fn public_inputs(&self, cs: &ConstraintSystem) -> Result<Vec<Fp>> {
        cs.public
            .iter()
            .zip(&cs.public_names)
            .map(|(var, name)| {
                self.get(*var)
                    .ok_or_else(|| CircuitError::MissingValue(name.clone()))
            })
            .collect()
    }
}

/// circuit builder for constructing constraint systems
#[derive(Debug, Clone, Default)]
pub struct CircuitBuilder {
    values: Vec<Option<Fp>>,
    public: Vec<Var>,
    public_names: Vec<String>,
    gates: Vec<Gate>,
    constants: HashMap<[u8; 32], Var>,
}

impl CircuitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, value: Option<Fp>) -> Var {
        let var = Var(self.values.len());
        self.values.push(value);
        var
    }

    fn push(&mut self, gate: Gate) {
        self.gates.push(gate);
    }

    /// witness value of a wire, if known
    pub fn value(&self, var: Var) -> Option<Fp> {
        self.values[var.0]
    }

    /// allocate a public input wire
    pub fn public(&mut self, name: impl Into<String>, value: Option<Fp>) -> Var {
        let var = self.alloc(value);
        self.public.push(var);
        self.public_names.push(name.into());
        var
    }

    /// allocate a private witness wire
    pub fn private(&mut self, value: Option<Fp>) -> Var {
        self.alloc(value)
    }

    /// allocate `name[0..]` as public inputs
    pub fn public_vec(&mut self, name: &str, values: &[Option<Fp>]) -> Vec<Var> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| self.public(format!("{}[{}]", name, i), *v))
            .collect()
    }

    pub fn private_vec(&mut self, values: &[Option<Fp>]) -> Vec<Var> {
        values.iter().map(|v| self.private(*v)).collect()
    }

    /// wire fixed to a constant (one wire per distinct constant)
    pub fn constant(&mut self, k: Fp) -> Var {
        let key = k.to_repr();
        if let Some(var) = self.constants.get(&key) {
            return *var;
        }
        let var = self.alloc(Some(k));
        let mut gate = Gate::zero(var, var, var);
        gate.q_l = Fp::ONE;
        gate.q_c = -k;
        self.push(gate);
        self.constants.insert(key, var);
        var
    }

    pub fn zero(&mut self) -> Var {
        self.constant(Fp::ZERO)
    }

    pub fn one(&mut self) -> Var {
        self.constant(Fp::ONE)
    }

    fn is_constant(&self, var: Var, k: Fp) -> bool {
        self.constants.get(&k.to_repr()) == Some(&var)
    }

    /// c = ka*a + kb*b
    pub fn linear(&mut self, a: Var, ka: Fp, b: Var, kb: Fp) -> Var {
        let value = self.value(a).zip(self.value(b)).map(|(x, y)| ka * x + kb * y);
        let c = self.alloc(value);
        let mut gate = Gate::zero(a, b, c);
        gate.q_l = ka;
        gate.q_r = kb;
        gate.q_o = -Fp::ONE;
        self.push(gate);
        c
    }

    pub fn add(&mut self, a: Var, b: Var) -> Var {
        self.linear(a, Fp::ONE, b, Fp::ONE)
    }

    pub fn sub(&mut self, a: Var, b: Var) -> Var {
        self.linear(a, Fp::ONE, b, -Fp::ONE)
    }

    /// c = k*a
    pub fn scale(&mut self, a: Var, k: Fp) -> Var {
        let value = self.value(a).map(|x| k * x);
        let c = self.alloc(value);
        let mut gate = Gate::zero(a, a, c);
        gate.q_l = k;
        gate.q_o = -Fp::ONE;
        self.push(gate);
        c
    }

    /// c = a + k
    pub fn add_constant(&mut self, a: Var, k: Fp) -> Var {
        let value = self.value(a).map(|x| x + k);
        let c = self.alloc(value);
        let mut gate = Gate::zero(a, a, c);
        gate.q_l = Fp::ONE;
        gate.q_o = -Fp::ONE;
        gate.q_c = k;
        self.push(gate);
        c
    }

    /// c = a*b; multiplying by the constant one wire is free
    pub fn mul(&mut self, a: Var, b: Var) -> Var {
        if self.is_constant(a, Fp::ONE) {
            return b;
        }
        if self.is_constant(b, Fp::ONE) {
            return a;
        }
        let value = self.value(a).zip(self.value(b)).map(|(x, y)| x * y);
        let c = self.alloc(value);
        let mut gate = Gate::zero(a, b, c);
        gate.q_m = Fp::ONE;
        gate.q_o = -Fp::ONE;
        self.push(gate);
        c
    }

    /// c = 1 - a (boolean a)
    pub fn not(&mut self, a: Var) -> Var {
        let value = self.value(a).map(|x| Fp::ONE - x);
        let c = self.alloc(value);
        let mut gate = Gate::zero(a, a, c);
        gate.q_l = Fp::ONE;
        gate.q_o = Fp::ONE;
        gate.q_c = -Fp::ONE;
        self.push(gate);
        c
    }

    /// c = a*b (boolean a, b)
    pub fn and(&mut self, a: Var, b: Var) -> Var {
        self.mul(a, b)
    }

    /// c = a + b - a*b (boolean a, b)
    pub fn or(&mut self, a: Var, b: Var) -> Var {
        self.bool_gate(a, b, -Fp::ONE, |x, y| x + y - x * y)
    }

    /// c = a + b - 2*a*b (boolean a, b)
    pub fn xor(&mut self, a: Var, b: Var) -> Var {
        self.bool_gate(a, b, -Fp::from(2u64), |x, y| x + y - (x * y).double())
    }

    fn bool_gate(&mut self, a: Var, b: Var, q_m: Fp, f: impl Fn(Fp, Fp) -> Fp) -> Var {
        let value = self.value(a).zip(self.value(b)).map(|(x, y)| f(x, y));
        let c = self.alloc(value);
        let mut gate = Gate::zero(a, b, c);
        gate.q_l = Fp::ONE;
        gate.q_r = Fp::ONE;
        gate.q_m = q_m;
        gate.q_o = -Fp::ONE;
        self.push(gate);
        c
    }

    /// cond ? x : y, as y + cond*(x - y)
    pub fn select(&mut self, cond: Var, x: Var, y: Var) -> Var {
        let diff = self.sub(x, y);
        let picked = self.mul(cond, diff);
        self.add(y, picked)
    }

    /// 1 if a == 0 else 0
    ///
    /// hint: inv = a^-1 (or 0). constraints: out = 1 - a*inv, a*out = 0.
    pub fn is_zero(&mut self, a: Var) -> Var {
        let inv_value = self
            .value(a)
            .map(|x| Option::<Fp>::from(x.invert()).unwrap_or(Fp::ZERO));
        let inv = self.alloc(inv_value);
        let prod = self.mul(a, inv);
        let out = self.not(prod);

        let mut gate = Gate::zero(a, out, a);
        gate.q_m = Fp::ONE;
        self.push(gate);
        out
    }

    /// little-endian decomposition of `a` into `n` boolean wires
    ///
    /// unsatisfiable when `a` does not fit in `n` bits.
    pub fn to_binary(&mut self, a: Var, n: usize) -> Vec<Var> {
        let hint = self.value(a).map(|x| bits_le(&x, n));
        let bits: Vec<Var> = (0..n)
            .map(|i| {
                let bit = hint.as_ref().map(|b| if b[i] { Fp::ONE } else { Fp::ZERO });
                let var = self.alloc(bit);
                self.assert_boolean(var);
                var
            })
            .collect();
        let recomposed = self.from_binary(&bits);
        self.assert_equal(recomposed, a);
        bits
    }

    /// sum(bits[i] * 2^i)
    pub fn from_binary(&mut self, bits: &[Var]) -> Var {
        let Some((first, rest)) = bits.split_first() else {
            return self.zero();
        };
        let mut acc = *first;
        let mut weight = Fp::ONE;
        for bit in rest {
            weight = weight.double();
            acc = self.linear(acc, Fp::ONE, *bit, weight);
        }
        acc
    }

    /// sum of wires
    pub fn sum(&mut self, terms: &[Var]) -> Var {
        let Some((first, rest)) = terms.split_first() else {
            return self.zero();
        };
        rest.iter().fold(*first, |acc, t| self.add(acc, *t))
    }

    /// assert a = b
    pub fn assert_equal(&mut self, a: Var, b: Var) {
        let mut gate = Gate::zero(a, b, a);
        gate.q_l = Fp::ONE;
        gate.q_r = -Fp::ONE;
        self.push(gate);
    }

    /// assert a = 0
    pub fn assert_zero(&mut self, a: Var) {
        let mut gate = Gate::zero(a, a, a);
        gate.q_l = Fp::ONE;
        self.push(gate);
    }

    /// assert a*a = a
    pub fn assert_boolean(&mut self, a: Var) {
        let mut gate = Gate::zero(a, a, a);
        gate.q_m = Fp::ONE;
        gate.q_l = -Fp::ONE;
        self.push(gate);
    }

    /// assert a <= b for a, b in [0, 2^bits)
    ///
    /// both operands and b - a are decomposed into `bits` bits; if a > b
    /// the difference wraps to roughly the field modulus and cannot fit.
    pub fn assert_less_or_equal(&mut self, a: Var, b: Var, bits: usize) {
        self.to_binary(a, bits);
        self.to_binary(b, bits);
        let diff = self.sub(b, a);
        self.to_binary(diff, bits);
    }

    pub fn num_wires(&self) -> usize {
        self.values.len()
    }

    pub fn num_public(&self) -> usize {
        self.public.len()
    }

    pub fn num_gates(&self) -> usize {
        self.gates.len()
    }

    /// finish construction
    pub fn build(self) -> (ConstraintSystem, Witness) {
        let cs = ConstraintSystem {
            num_wires: self.values.len(),
            public: self.public,
            public_names: self.public_names,
            gates: self.gates,
        };
        (cs, Witness { values: self.values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(v: u64) -> Option<Fp> {
        Some(Fp::from(v))
    }

    #[test]
    fn test_arithmetic_gates() {
        let mut builder = CircuitBuilder::new();
        let a = builder.private(known(6));
        let b = builder.private(known(7));
        let sum = builder.add(a, b);
        let diff = builder.sub(a, b);
        let prod = builder.mul(a, b);
        let scaled = builder.scale(a, Fp::from(3u64));
        let shifted = builder.add_constant(a, Fp::from(10u64));

        assert_eq!(builder.value(sum), known(13));
        assert_eq!(builder.value(diff), Some(-Fp::ONE));
        assert_eq!(builder.value(prod), known(42));
        assert_eq!(builder.value(scaled), known(18));
        assert_eq!(builder.value(shifted), known(16));

        let (cs, witness) = builder.build();
        assert!(cs.check(&witness).is_ok());
    }

    #[test]
    fn test_tampered_witness_fails() {
        let mut builder = CircuitBuilder::new();
        let a = builder.private(known(6));
        let b = builder.private(known(7));
        let prod = builder.mul(a, b);
        let (cs, mut witness) = builder.build();

        witness.values[prod.index()] = known(41);
        assert_eq!(cs.check(&witness), Err(Unsatisfied::Gate { gate: 0 }));
    }

    #[test]
    fn test_boolean_ops() {
        for (x, y) in [(0u64, 0u64), (0, 1), (1, 0), (1, 1)] {
            let mut builder = CircuitBuilder::new();
            let a = builder.private(known(x));
            let b = builder.private(known(y));
            let and = builder.and(a, b);
            let or = builder.or(a, b);
            let xor = builder.xor(a, b);
            let not = builder.not(a);
            assert_eq!(builder.value(and), known(x & y));
            assert_eq!(builder.value(or), known(x | y));
            assert_eq!(builder.value(xor), known(x ^ y));
            assert_eq!(builder.value(not), known(1 - x));
            let (cs, witness) = builder.build();
            assert!(cs.check(&witness).is_ok());
        }
    }

    #[test]
    fn test_is_zero_and_select() {
        for v in [0u64, 1, 99] {
            let mut builder = CircuitBuilder::new();
            let a = builder.private(known(v));
            let z = builder.is_zero(a);
            let x = builder.constant(Fp::from(5u64));
            let y = builder.constant(Fp::from(9u64));
            let picked = builder.select(z, x, y);
            assert_eq!(builder.value(z), known((v == 0) as u64));
            assert_eq!(builder.value(picked), known(if v == 0 { 5 } else { 9 }));
            let (cs, witness) = builder.build();
            assert!(cs.check(&witness).is_ok());
        }
    }

    #[test]
    fn test_is_zero_rejects_forged_flag() {
        let mut builder = CircuitBuilder::new();
        let a = builder.private(known(3));
        let z = builder.is_zero(a);
        let (cs, mut witness) = builder.build();
        // claim 3 == 0 with any inverse hint
        witness.values[z.index()] = known(1);
        assert!(cs.check(&witness).is_err());
    }

    #[test]
    fn test_to_binary() {
        let mut builder = CircuitBuilder::new();
        let a = builder.private(known(0b1101));
        let bits = builder.to_binary(a, 4);
        let values: Vec<_> = bits.iter().map(|b| builder.value(*b)).collect();
        assert_eq!(values, vec![known(1), known(0), known(1), known(1)]);
        let (cs, witness) = builder.build();
        assert!(cs.check(&witness).is_ok());

        // 16 does not fit in 4 bits
        let mut builder = CircuitBuilder::new();
        let a = builder.private(known(16));
        builder.to_binary(a, 4);
        let (cs, witness) = builder.build();
        assert!(cs.check(&witness).is_err());
    }

    #[test]
    fn test_less_or_equal() {
        for (x, y, ok) in [(3u64, 5u64, true), (5, 5, true), (6, 5, false), (0, 255, true)] {
            let mut builder = CircuitBuilder::new();
            let a = builder.private(known(x));
            let b = builder.private(known(y));
            builder.assert_less_or_equal(a, b, 8);
            let (cs, witness) = builder.build();
            assert_eq!(cs.check(&witness).is_ok(), ok, "{} <= {}", x, y);
        }
    }

    #[test]
    fn test_constants_are_cached_and_mul_by_one_is_free() {
        let mut builder = CircuitBuilder::new();
        let one = builder.one();
        assert_eq!(builder.one(), one);
        let gates = builder.num_gates();
        let a = builder.private(known(4));
        assert_eq!(builder.mul(one, a), a);
        assert_eq!(builder.num_gates(), gates);
    }

    #[test]
    fn test_public_inputs() {
        let mut builder = CircuitBuilder::new();
        let t = builder.public_vec("transitionTime", &[known(1), known(2)]);
        builder.private(known(100));
        let f = builder.public("f", None);
        assert_eq!(t.len(), 2);
        let (cs, witness) = builder.build();
        assert_eq!(cs.num_public(), 3);
        assert_eq!(cs.public_names, vec!["transitionTime[0]", "transitionTime[1]", "f"]);
        assert_eq!(cs.public[2], f);
        match witness.public_inputs(&cs) {
            Err(CircuitError::MissingValue(name)) => assert_eq!(name, "f"),
            other => panic!("expected missing value, got {:?}", other),
        }
    }

    #[test]
    fn test_encoding_round_trip_and_digest() {
        let mut builder = CircuitBuilder::new();
        let a = builder.public("a", known(2));
        let b = builder.private(known(3));
        builder.mul(a, b);
        let (cs, _) = builder.build();

        let decoded = ConstraintSystem::from_bytes(&cs.to_bytes()).unwrap();
        assert_eq!(decoded, cs);
        assert_eq!(decoded.digest(), cs.digest());
        assert_eq!(cs.num_mul_gates(), 1);
    }

    #[test]
    fn test_distinct_systems_have_distinct_encodings() {
        let mut builder = CircuitBuilder::new();
        let a = builder.private(known(2));
        let b = builder.private(known(3));
        builder.mul(a, b);
        let (mul, _) = builder.build();

        let mut builder = CircuitBuilder::new();
        let a = builder.private(known(2));
        let b = builder.private(known(3));
        builder.add(a, b);
        let (add, _) = builder.build();

        assert!(!mul.to_bytes().is_empty());
        assert!(!CircuitBuilder::new().build().0.to_bytes().is_empty());
        assert_ne!(mul.to_bytes(), add.to_bytes());
        assert_ne!(mul.digest(), add.digest());
    }
}
