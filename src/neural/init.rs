//! Weight initializers.
//!
//! Each initializer returns a factory `(rows, columns) -> weights` that a
//! layer calls when its weights are built. `columns` is the fan-in (previous
//! layer's nodes plus the bias column) and `rows` the fan-out.

use std::ops::RangeInclusive;

use rand::{
    distributions::{Distribution, Uniform},
    Rng,
};
use rand_distr::Normal;

use crate::{matrix::Matrix2, prelude::*};

/// Glorot/Xavier: Normal(0, sqrt(2 / (fan_in + fan_out))).
pub fn xavier<R: Rng>(mut rng: R) -> impl FnMut(usize, usize) -> Result<Matrix2<f64>> {
    move |rows, cols| {
        let std_dev = (2.0 / (rows + cols) as f64).sqrt();
        sample_normal(&mut rng, rows, cols, std_dev)
    }
}

/// Kaiming: Normal(0, sqrt(1 / fan_in)).
pub fn kaiming<R: Rng>(mut rng: R) -> impl FnMut(usize, usize) -> Result<Matrix2<f64>> {
    move |rows, cols| {
        let std_dev = (1.0 / cols as f64).sqrt();
        sample_normal(&mut rng, rows, cols, std_dev)
    }
}

/// Every weight drawn uniformly from `range`.
///
/// The bounds must be finite, ordered and not so far apart that their
/// distance overflows; otherwise every call fails with
/// [`Error::Initialization`].
pub fn uniform<R: Rng>(
    range: RangeInclusive<f64>,
    mut rng: R,
) -> impl FnMut(usize, usize) -> Result<Matrix2<f64>> {
    let (low, high) = range.into_inner();
    let valid = low <= high && (high - low).is_finite();
    let die = valid.then(|| Uniform::new_inclusive(low, high));
    move |rows, cols| {
        let die = die.as_ref().ok_or_else(|| {
            Error::Initialization(format!("invalid uniform range {low}..={high}"))
        })?;
        Ok(Matrix2::from_fn(rows, cols, |_, _| die.sample(&mut rng)))
    }
}

/// Every weight set to `value`.
pub fn constant(value: f64) -> impl FnMut(usize, usize) -> Result<Matrix2<f64>> {
    move |rows, cols| Ok(Matrix2::from_fn(rows, cols, |_, _| value))
}

pub fn zeros() -> impl FnMut(usize, usize) -> Result<Matrix2<f64>> {
    constant(0.0)
}

fn sample_normal<R: Rng>(
    rng: &mut R,
    rows: usize,
    cols: usize,
    std_dev: f64,
) -> Result<Matrix2<f64>> {
    if !std_dev.is_finite() {
        return Err(Error::Initialization(format!(
            "no fan-in for a {rows}x{cols} weight matrix"
        )));
    }
    let normal = Normal::new(0.0, std_dev).map_err(|e| Error::Initialization(e.to_string()))?;
    Ok(Matrix2::from_fn(rows, cols, |_, _| normal.sample(&mut *rng)))
}
