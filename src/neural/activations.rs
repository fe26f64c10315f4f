//! Activation functions and their derivatives.
//!
//! Scalar activations are applied to every entry of a layer's values. Softmax
//! works on whole columns (one column per pass) because its outputs depend on
//! each other, so its gradient goes through the per-column Jacobian instead of
//! an elementwise derivative.

use super::cost::{check_shape, CostDerivative};
use crate::{
    matrix::{ops::Dot, Matrix2},
    prelude::*,
};

/// Slope used by [`leaky_relu`] for non-positive inputs.
pub const LEAKY_SLOPE: f64 = 0.01;

pub fn relu(x: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Parametric ReLU: rectifies to `a * x` instead of zero.
pub fn prelu(x: f64, a: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        a * x
    }
}

pub fn leaky_relu(x: f64) -> f64 {
    prelu(x, LEAKY_SLOPE)
}

/// Exponential linear unit.
pub fn elu(x: f64, a: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        a * (x.exp() - 1.0)
    }
}

/// Logistic function, or its derivative when `derivative` is set.
///
/// The derivative is expressed through the function itself so both modes
/// agree to the last bit.
pub fn sigmoid(x: f64, derivative: bool) -> f64 {
    if derivative {
        let sigma = sigmoid(x, false);
        sigma * (1.0 - sigma)
    } else {
        1.0 / (1.0 + (-x).exp())
    }
}

/// Hyperbolic tangent written as a rescaled sigmoid.
pub fn tanh(x: f64) -> f64 {
    2.0 * sigmoid(2.0 * x, false) - 1.0
}

/// One for positive inputs, zero otherwise. Has no derivative.
pub fn step(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Column-wise softmax. Each column's maximum is subtracted before
/// exponentiating so large inputs do not overflow.
pub fn softmax(values: &Matrix2<f64>) -> Matrix2<f64> {
    let max = values.column_max();
    let exps = Matrix2::from_fn(values.rows(), values.cols(), |r, c| {
        (values[(r, c)] - max[(0, c)]).exp()
    });
    let sums = exps.column_sums();
    Matrix2::from_fn(values.rows(), values.cols(), |r, c| {
        exps[(r, c)] / sums[(0, c)]
    })
}

/// Jacobian of softmax for a single column.
///
/// `soft` is the softmax output of the `values` column. Entry `[i][j]` is
/// `soft[j] * (1 - soft[i])` on the diagonal and `-soft[i] * soft[j]` off it.
pub fn softmax_jacobian(values: &Matrix2<f64>, soft: &Matrix2<f64>) -> Result<Matrix2<f64>> {
    if soft.cols() != 1 {
        return Err(Error::ShapeMismatch {
            expected: (soft.rows(), 1),
            found: soft.dim(),
        });
    }
    check_shape(soft, values)?;

    let n = soft.rows();
    Ok(Matrix2::from_fn(n, n, |i, j| {
        let kronecker = if i == j { 1.0 } else { 0.0 };
        soft[(j, 0)] * (kronecker - soft[(i, 0)])
    }))
}

/// Output delta of a softmax layer.
///
/// For every column the cost gradient (from `cost_derivative` applied to the
/// softmax output and `target`) is multiplied by that column's Jacobian.
pub fn softmax_derivative(
    values: &Matrix2<f64>,
    target: &Matrix2<f64>,
    cost_derivative: CostDerivative,
) -> Result<Matrix2<f64>> {
    check_shape(values, target)?;
    let soft = softmax(values);
    let gradient = soft.zip_map(target, |&p, &t| cost_derivative(p, t))?;
    jacobian_product(values, &soft, &gradient)
}

fn jacobian_product(
    values: &Matrix2<f64>,
    soft: &Matrix2<f64>,
    upstream: &Matrix2<f64>,
) -> Result<Matrix2<f64>> {
    check_shape(values, upstream)?;
    let mut delta = Matrix2::new(values.rows(), values.cols());
    for col in 0..values.cols() {
        let jacobian = softmax_jacobian(&values.column(col), &soft.column(col))?;
        delta.set_column(col, &jacobian.dot(&upstream.column(col))?)?;
    }
    Ok(delta)
}

/// A forward function paired with the matching gradient computation.
pub trait Activation {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str {
        "custom"
    }

    /// Maps pre-activation values (`alpha`) to activated values (`beta`).
    fn activate(&self, alpha: &Matrix2<f64>) -> Result<Matrix2<f64>>;

    /// Local derivative evaluated at `alpha`, entry by entry.
    fn derivative(&self, alpha: &Matrix2<f64>) -> Result<Matrix2<f64>>;

    /// Turns the gradient w.r.t. this layer's output into its delta.
    fn backpropagate(
        &self,
        alpha: &Matrix2<f64>,
        upstream: &Matrix2<f64>,
    ) -> Result<Matrix2<f64>> {
        check_shape(alpha, upstream)?;
        upstream.hadamard(&self.derivative(alpha)?)
    }

    /// Delta of an output layer against `target`.
    fn output_delta(
        &self,
        alpha: &Matrix2<f64>,
        beta: &Matrix2<f64>,
        target: &Matrix2<f64>,
        cost_derivative: CostDerivative,
    ) -> Result<Matrix2<f64>> {
        elementwise_output_delta(self, alpha, beta, target, cost_derivative)
    }
}

/// Applies `cost_derivative` to every output against its target and feeds the
/// result through `activation`'s backpropagation.
fn elementwise_output_delta<A: Activation + ?Sized>(
    activation: &A,
    alpha: &Matrix2<f64>,
    beta: &Matrix2<f64>,
    target: &Matrix2<f64>,
    cost_derivative: CostDerivative,
) -> Result<Matrix2<f64>> {
    check_shape(beta, target)?;
    let gradient = beta.zip_map(target, |&p, &t| cost_derivative(p, t))?;
    activation.backpropagate(alpha, &gradient)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activations {
    Identity,
    ReLU,
    LeakyReLU,
    PReLU(f64),
    ELU(f64),
    Sigmoid,
    TanH,
    Step,
    Softmax,
}

impl Activation for Activations {
    fn name(&self) -> &'static str {
        use Activations::*;
        match self {
            Identity => "identity",
            ReLU => "relu",
            LeakyReLU => "leaky_relu",
            PReLU(_) => "prelu",
            ELU(_) => "elu",
            Sigmoid => "sigmoid",
            TanH => "tanh",
            Step => "step",
            Softmax => "softmax",
        }
    }

    fn activate(&self, alpha: &Matrix2<f64>) -> Result<Matrix2<f64>> {
        use Activations::*;
        Ok(match *self {
            Identity => alpha.clone(),
            ReLU => alpha.map(|&x| relu(x)),
            LeakyReLU => alpha.map(|&x| leaky_relu(x)),
            PReLU(a) => alpha.map(|&x| prelu(x, a)),
            ELU(a) => alpha.map(|&x| elu(x, a)),
            Sigmoid => alpha.map(|&x| sigmoid(x, false)),
            TanH => alpha.map(|&x| tanh(x)),
            Step => alpha.map(|&x| step(x)),
            Softmax => softmax(alpha),
        })
    }

    fn derivative(&self, alpha: &Matrix2<f64>) -> Result<Matrix2<f64>> {
        use Activations::*;
        let slope = |a: f64| move |&x: &f64| if x > 0.0 { 1.0 } else { a };
        Ok(match *self {
            Identity => alpha.map(|_| 1.0),
            ReLU => alpha.map(slope(0.0)),
            LeakyReLU => alpha.map(slope(LEAKY_SLOPE)),
            PReLU(a) => alpha.map(slope(a)),
            ELU(a) => alpha.map(|&x| if x > 0.0 { 1.0 } else { a * x.exp() }),
            Sigmoid => alpha.map(|&x| sigmoid(x, true)),
            TanH => alpha.map(|&x| 1.0 - tanh(x).powi(2)),
            // softmax outputs are coupled, see `backpropagate`
            Step | Softmax => return Err(Error::UndefinedDerivative(self.name())),
        })
    }

    fn backpropagate(
        &self,
        alpha: &Matrix2<f64>,
        upstream: &Matrix2<f64>,
    ) -> Result<Matrix2<f64>> {
        check_shape(alpha, upstream)?;
        match self {
            Activations::Softmax => jacobian_product(alpha, &softmax(alpha), upstream),
            _ => upstream.hadamard(&self.derivative(alpha)?),
        }
    }

    fn output_delta(
        &self,
        alpha: &Matrix2<f64>,
        beta: &Matrix2<f64>,
        target: &Matrix2<f64>,
        cost_derivative: CostDerivative,
    ) -> Result<Matrix2<f64>> {
        match self {
            Activations::Softmax => softmax_derivative(alpha, target, cost_derivative),
            _ => elementwise_output_delta(self, alpha, beta, target, cost_derivative),
        }
    }
}

type MatrixFn = Box<dyn Fn(&Matrix2<f64>) -> Result<Matrix2<f64>> + Send + Sync>;

/// Activation built from a single function taking a derivative flag.
///
/// The flag is fixed once at construction, giving one closure for the forward
/// direction and one for the derivative.
pub struct ActivationPair {
    name: &'static str,
    forward: MatrixFn,
    derivative: MatrixFn,
}

impl ActivationPair {
    /// Wraps a scalar `f(x, derivative)` applied to every entry.
    pub fn elementwise<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(f64, bool) -> Result<f64> + Clone + Send + Sync + 'static,
    {
        let g = f.clone();
        Self {
            name,
            forward: Box::new(move |m: &Matrix2<f64>| m.try_map(|&x| f(x, false))),
            derivative: Box::new(move |m: &Matrix2<f64>| m.try_map(|&x| g(x, true))),
        }
    }

    /// Wraps a matrix-level `f(values, derivative)`.
    pub fn columnwise<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&Matrix2<f64>, bool) -> Result<Matrix2<f64>> + Clone + Send + Sync + 'static,
    {
        let g = f.clone();
        Self {
            name,
            forward: Box::new(move |m: &Matrix2<f64>| f(m, false)),
            derivative: Box::new(move |m: &Matrix2<f64>| g(m, true)),
        }
    }
}

impl Activation for ActivationPair {
    fn name(&self) -> &'static str {
        self.name
    }

    fn activate(&self, alpha: &Matrix2<f64>) -> Result<Matrix2<f64>> {
        (self.forward)(alpha)
    }

    fn derivative(&self, alpha: &Matrix2<f64>) -> Result<Matrix2<f64>> {
        (self.derivative)(alpha)
    }
}
