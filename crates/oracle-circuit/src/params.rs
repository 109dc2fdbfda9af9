//! structural parameters shared by every circuit
//!
//! all loop bounds come from here and none depend on the witness, so one
//! parameter set always produces the same constraint graph.

use serde::{Deserialize, Serialize};

use crate::error::{CircuitError, Result};
use crate::field::MAX_BITS;

/// deepest merkle tree accepted (2^24 leaves per state)
pub const MAX_HEIGHT: usize = 24;

/// widest comparison accepted by `assert_less_or_equal`
pub const MAX_TIME_BITS: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CircuitParams {
    /// statuses reported per transition
    pub num_statuses: usize,
    /// words per status vector
    pub data_size: usize,
    /// merkle tree height
    pub height: usize,
    /// independent reports per aggregation
    pub num_oracles: usize,
    /// bit width of a scalar status
    pub scalar_status_bits: usize,
    /// bit width of a status vector word and of a change mask
    pub word_bits: usize,
    /// bit width of every ordering comparison
    pub time_bits: usize,
}

impl Default for CircuitParams {
    fn default() -> Self {
        Self {
            num_statuses: 10,
            data_size: 7,
            height: 15,
            num_oracles: 4,
            scalar_status_bits: 64,
            word_bits: MAX_BITS,
            time_bits: 64,
        }
    }
}

impl CircuitParams {
    /// private intermediate states between the two public boundaries
    pub fn num_middle(&self) -> usize {
        self.num_statuses - 1
    }

    /// (time, root, leaves) triples of a merkle transition
    pub fn num_mt_statuses(&self) -> usize {
        self.num_statuses + 1
    }

    pub fn num_leaves(&self) -> usize {
        1 << self.height
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(CircuitError::InvalidParams(msg));

        if self.num_statuses < 2 {
            return fail(format!("num_statuses must be at least 2, got {}", self.num_statuses));
        }
        if self.data_size == 0 {
            return fail("data_size must be positive".into());
        }
        if self.num_oracles == 0 {
            return fail("num_oracles must be positive".into());
        }
        if self.height > MAX_HEIGHT {
            return fail(format!("height {} exceeds {}", self.height, MAX_HEIGHT));
        }
        for (name, bits) in [
            ("scalar_status_bits", self.scalar_status_bits),
            ("word_bits", self.word_bits),
            ("time_bits", self.time_bits),
        ] {
            if bits == 0 || bits > MAX_BITS {
                return fail(format!("{} must be in 1..={}, got {}", name, MAX_BITS, bits));
            }
        }
        if self.time_bits > MAX_TIME_BITS {
            return fail(format!("time_bits {} exceeds {}", self.time_bits, MAX_TIME_BITS));
        }
        if self.num_oracles >= MAX_BITS {
            return fail(format!("num_oracles {} does not fit the indicator", self.num_oracles));
        }
        // vote counts and index bounds are compared with time_bits
        let largest = self.num_oracles.max(self.data_size) as u128;
        if self.time_bits < 128 && largest >= 1u128 << self.time_bits {
            return fail(format!(
                "time_bits {} cannot represent {}",
                self.time_bits, largest
            ));
        }
        Ok(())
    }
}
