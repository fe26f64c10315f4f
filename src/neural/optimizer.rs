use tracing::info;

use crate::{
    matrix::{
        ops::{Dot, Transpose},
        Matrix2,
    },
    neural::{
        cost::{squared_error_derivative, CostDerivative},
        Network,
    },
    prelude::*,
};

/// Computes a layer's new weights from its delta and the biased output of
/// the layer feeding it.
pub trait WeightUpdate {
    fn update(
        &self,
        weights: &Matrix2<f64>,
        delta: &Matrix2<f64>,
        previous_output: &Matrix2<f64>,
    ) -> Result<Matrix2<f64>>;
}

/// Plain gradient descent, averaged over the passes of a batch:
/// `omega - rate * (delta × previousᵗ) / passes`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientDescent {
    pub rate: f64,
}

impl GradientDescent {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl WeightUpdate for GradientDescent {
    fn update(
        &self,
        weights: &Matrix2<f64>,
        delta: &Matrix2<f64>,
        previous_output: &Matrix2<f64>,
    ) -> Result<Matrix2<f64>> {
        let passes = delta.cols().max(1) as f64;
        let gradient = delta.dot(&previous_output.transpose())?;
        weights - &gradient.scale(self.rate / passes)
    }
}

pub struct Optimizer {
    iterations: usize,
    iterations_per_log: Option<usize>,
    rate: f64,
}

impl Optimizer {
    pub fn new(iterations: usize, rate: f64) -> Self {
        Self {
            iterations,
            iterations_per_log: None,
            rate,
        }
    }

    pub fn with_log(mut self, iterations_per_log: Option<usize>) -> Self {
        self.iterations_per_log = iterations_per_log;
        self
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    pub fn set_iterations(&mut self, iterations: usize) {
        self.iterations = iterations;
    }

    /// Runs forward, backward and a gradient step `iterations` times on the
    /// whole batch. `inputs` is `input nodes × passes`, `targets` is
    /// `output nodes × passes`.
    pub fn train(
        &self,
        net: &mut Network,
        inputs: &Matrix2<f64>,
        targets: &Matrix2<f64>,
    ) -> Result<()> {
        self.train_with(
            net,
            inputs,
            targets,
            &GradientDescent::new(self.rate),
            squared_error_derivative,
        )
    }

    /// Like [`Optimizer::train`] with a caller-chosen update rule and cost
    /// gradient. The configured rate is ignored; `strategy` carries its own.
    pub fn train_with(
        &self,
        net: &mut Network,
        inputs: &Matrix2<f64>,
        targets: &Matrix2<f64>,
        strategy: &impl WeightUpdate,
        cost_derivative: CostDerivative,
    ) -> Result<()> {
        for i in 0..self.iterations {
            net.forward(inputs)?;
            net.backward_with(targets, cost_derivative)?;
            net.update_weights(strategy)?;

            if self.iterations_per_log.is_some_and(|ipl| ipl > 0 && i % ipl == 0) {
                let mse = net.mean_squared_error(inputs, targets)?;
                info!(iteration = i, mse, "training");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::{activations::Activations, init};

    #[test]
    fn gradient_step_is_averaged_over_passes() {
        let weights = Matrix2::from_array([[1.0, 1.0]]);
        let delta = Matrix2::from_array([[2.0, 4.0]]);
        let previous = Matrix2::from_array([[1.0, 1.0], [1.0, 1.0]]);

        // delta × previousᵗ = [6, 6], halved for two passes, times 0.5
        let updated = GradientDescent::new(0.5)
            .update(&weights, &delta, &previous)
            .unwrap();
        assert_eq!(updated.to_vec(), [[-0.5, -0.5]]);
    }

    #[test]
    fn gradient_step_checks_shapes() {
        let weights = Matrix2::from_array([[1.0, 1.0, 1.0]]);
        let delta = Matrix2::from_array([[1.0]]);
        let previous = Matrix2::from_column(vec![1.0, 1.0]);

        assert_eq!(
            GradientDescent::new(1.0).update(&weights, &delta, &previous),
            Err(Error::DimensionErr)
        );
    }

    #[test]
    fn learns_or() {
        let mut net = Network::builder()
            .passes(4)
            .input(2)
            .output(1, Activations::Sigmoid)
            .build(init::zeros())
            .unwrap();

        let inputs = Matrix2::from_array([[0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.0]]);
        let targets = Matrix2::from_array([[0.0, 1.0, 1.0, 1.0]]);

        let before = net.mean_squared_error(&inputs, &targets).unwrap();
        Optimizer::new(2_000, 5.0)
            .with_log(Some(500))
            .train(&mut net, &inputs, &targets)
            .unwrap();
        let after = net.mean_squared_error(&inputs, &targets).unwrap();
        assert!(after < before, "{after} >= {before}");

        let outputs = net.forward(&inputs).unwrap().clone();
        assert!(outputs[(0, 0)] < 0.5);
        for pass in 1..4 {
            assert!(outputs[(0, pass)] > 0.5, "pass {pass}: {}", outputs[(0, pass)]);
        }
    }

    struct Frozen;

    impl WeightUpdate for Frozen {
        fn update(
            &self,
            weights: &Matrix2<f64>,
            _: &Matrix2<f64>,
            _: &Matrix2<f64>,
        ) -> Result<Matrix2<f64>> {
            Ok(weights.clone())
        }
    }

    fn or_network() -> Network {
        Network::builder()
            .passes(4)
            .input(2)
            .output(1, Activations::Sigmoid)
            .build(init::constant(0.1))
            .unwrap()
    }

    #[test]
    fn train_with_uses_given_strategy() {
        let inputs = Matrix2::from_array([[0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.0]]);
        let targets = Matrix2::from_array([[0.0, 1.0, 1.0, 1.0]]);
        let optim = Optimizer::new(50, 2.0);

        let mut frozen = or_network();
        optim
            .train_with(&mut frozen, &inputs, &targets, &Frozen, squared_error_derivative)
            .unwrap();
        assert_eq!(frozen.output().weights(), or_network().output().weights());

        let mut plain = or_network();
        let mut explicit = or_network();
        optim.train(&mut plain, &inputs, &targets).unwrap();
        optim
            .train_with(
                &mut explicit,
                &inputs,
                &targets,
                &GradientDescent::new(2.0),
                squared_error_derivative,
            )
            .unwrap();
        assert_eq!(plain.output().weights(), explicit.output().weights());
    }

    #[test]
    fn train_with_uses_given_cost_gradient() {
        let inputs = Matrix2::from_array([[0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.0]]);
        let targets = Matrix2::from_array([[0.0, 1.0, 1.0, 1.0]]);
        let optim = Optimizer::new(50, 2.0);

        // no gradient at all: nothing moves
        let mut flat = or_network();
        optim
            .train_with(&mut flat, &inputs, &targets, &GradientDescent::new(2.0), |_, _| 0.0)
            .unwrap();
        assert_eq!(flat.output().weights(), or_network().output().weights());
    }

    #[test]
    fn training_without_weights_fails() {
        let layers = vec![
            crate::neural::layer::Layer::input(1, 1).unwrap(),
            crate::neural::layer::Layer::output(1, 1)
                .unwrap()
                .with_activation(Activations::Identity),
        ];
        let mut net = Network::new(layers).unwrap();

        let res = Optimizer::new(1, 0.1).train(
            &mut net,
            &Matrix2::from_column(vec![1.0]),
            &Matrix2::from_column(vec![1.0]),
        );
        assert_eq!(res, Err(Error::MissingWeights));
    }
}
