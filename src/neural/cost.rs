//! Cost functions comparing a layer's values against expected outputs.

use crate::{matrix::Matrix2, prelude::*};

/// Gradient of the cost with respect to one predicted value, given its target.
pub type CostDerivative = fn(f64, f64) -> f64;

/// Elementwise `(predicted - expected)^2`.
pub fn squared_error(predicted: &Matrix2<f64>, expected: &Matrix2<f64>) -> Result<Matrix2<f64>> {
    check_shape(predicted, expected)?;
    predicted.zip_map(expected, |p, e| (p - e).powi(2))
}

/// Derivative of `(p - t)^2 / 2` with respect to `p`.
pub fn squared_error_derivative(predicted: f64, target: f64) -> f64 {
    predicted - target
}

/// Mean of the squared error over every node of every pass.
pub fn mean_squared_error(output: &Matrix2<f64>, targets: &Matrix2<f64>) -> Result<f64> {
    let errors = squared_error(output, targets)?;
    let count = (errors.rows() * errors.cols()).max(1);
    Ok(errors.iter().sum::<f64>() / count as f64)
}

pub(crate) fn check_shape(values: &Matrix2<f64>, target: &Matrix2<f64>) -> Result<()> {
    if values.dim() != target.dim() {
        return Err(Error::ShapeMismatch {
            expected: values.dim(),
            found: target.dim(),
        });
    }
    Ok(())
}
