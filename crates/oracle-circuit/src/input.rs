//! witness record shape checks
//!
//! json records are bound to the circuit positionally, so every field must
//! have exactly the declared shape. private fields may be left empty, which
//! yields unknown values (a public-only record for verification).

use crate::error::{CircuitError, Result};
use crate::field::{Felt, Fp};

/// whether a field may be omitted from a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Visibility {
    Public,
    Private,
}

fn shape_error(field: &str, got: usize, expected: usize) -> CircuitError {
    CircuitError::Shape {
        field: field.to_string(),
        got,
        expected,
    }
}

/// `field[len]`; `None` record means shape only
pub(crate) fn flat(
    field: &str,
    values: Option<&[Felt]>,
    len: usize,
    vis: Visibility,
) -> Result<Vec<Option<Fp>>> {
    match values {
        None => Ok(vec![None; len]),
        Some(v) if v.is_empty() && vis == Visibility::Private && len > 0 => Ok(vec![None; len]),
        Some(v) if v.len() != len => Err(shape_error(field, v.len(), len)),
        Some(v) => Ok(v.iter().map(|f| Some(f.value())).collect()),
    }
}

/// `field[rows][cols]`
pub(crate) fn nested(
    field: &str,
    values: Option<&[Vec<Felt>]>,
    rows: usize,
    cols: usize,
    vis: Visibility,
) -> Result<Vec<Vec<Option<Fp>>>> {
    let values = match values {
        Some(v) if v.is_empty() && vis == Visibility::Private && rows > 0 => None,
        other => other,
    };
    match values {
        None => Ok(vec![vec![None; cols]; rows]),
        Some(v) if v.len() != rows => Err(shape_error(field, v.len(), rows)),
        Some(v) => v
            .iter()
            .enumerate()
            .map(|(i, row)| flat(&format!("{}[{}]", field, i), Some(row.as_slice()), cols, Visibility::Public))
            .collect(),
    }
}

/// `field[outer][rows][cols]`
pub(crate) fn nested3(
    field: &str,
    values: Option<&[Vec<Vec<Felt>>]>,
    outer: usize,
    rows: usize,
    cols: usize,
    vis: Visibility,
) -> Result<Vec<Vec<Vec<Option<Fp>>>>> {
    let values = match values {
        Some(v) if v.is_empty() && vis == Visibility::Private && outer > 0 => None,
        other => other,
    };
    match values {
        None => Ok(vec![vec![vec![None; cols]; rows]; outer]),
        Some(v) if v.len() != outer => Err(shape_error(field, v.len(), outer)),
        Some(v) => v
            .iter()
            .enumerate()
            .map(|(i, m)| {
                nested(&format!("{}[{}]", field, i), Some(m.as_slice()), rows, cols, Visibility::Public)
            })
            .collect(),
    }
}

/// single public value
pub(crate) fn scalar(value: Option<&Felt>) -> Option<Fp> {
    value.map(|f| f.value())
}
