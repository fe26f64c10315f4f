pub mod activations;
pub mod cost;
pub mod init;
pub mod layer;
pub mod optimizer;

use std::sync::Arc;

use tracing::{debug, trace};

use crate::matrix::{
    ops::{Dot, Transpose},
    Matrix2,
};
use crate::prelude::*;

use self::activations::Activation;
use self::cost::{squared_error_derivative, CostDerivative};
use self::layer::{Layer, LayerKind};
use self::optimizer::WeightUpdate;

/// Feed-forward network: an input layer, any number of hidden layers and an
/// output layer. A layer's previous and next neighbours are the entries
/// before and after it.
#[derive(Clone, Debug)]
pub struct Network {
    layers: Vec<Layer>,
}

/// Where the backward pass currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackwardState {
    AtOutput,
    AtHidden(usize),
    AtInputBoundary,
}

impl BackwardState {
    fn below(index: usize) -> Self {
        match index - 1 {
            0 => BackwardState::AtInputBoundary,
            k => BackwardState::AtHidden(k),
        }
    }
}

impl Network {
    /// Chains `layers`. The first must be an input layer, the last an output
    /// layer and everything in between hidden, all with the same pass count.
    pub fn new(layers: Vec<Layer>) -> Result<Self> {
        if layers.len() < 2 {
            return Err(Error::TooFewLayers(layers.len()));
        }

        let last = layers.len() - 1;
        let passes = layers[0].passes();
        for (index, layer) in layers.iter().enumerate() {
            let expected = match index {
                0 => LayerKind::Input,
                i if i == last => LayerKind::Output,
                _ => LayerKind::Hidden,
            };
            if layer.kind() != expected {
                return Err(Error::InvalidLayerKind(index));
            }
            if layer.passes() != passes {
                return Err(Error::ShapeMismatch {
                    expected: (layer.nodes(), passes),
                    found: (layer.nodes(), layer.passes()),
                });
            }
        }

        Ok(Self { layers })
    }

    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::default()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn input(&self) -> &Layer {
        &self.layers[0]
    }

    pub fn output(&self) -> &Layer {
        &self.layers[self.layers.len() - 1]
    }

    pub fn passes(&self) -> usize {
        self.input().passes()
    }

    /// Builds every layer's weights with `init`. The input layer is skipped.
    pub fn build_weights<F>(&mut self, mut init: F) -> Result<()>
    where
        F: FnMut(usize, usize) -> Result<Matrix2<f64>>,
    {
        for index in 1..self.layers.len() {
            let (done, rest) = self.layers.split_at_mut(index);
            rest[0].build_weights(done.last(), &mut init)?;
        }
        debug!(layers = self.layers.len(), "weights built");
        Ok(())
    }

    /// Replaces the weights of the layer at `index`.
    pub fn set_weights(&mut self, index: usize, weights: Matrix2<f64>) -> Result<()> {
        if index == 0 {
            return Err(Error::InvalidLayerKind(0));
        }
        let expected = (
            self.layer_at(index)?.nodes(),
            self.layers[index - 1].nodes() + 1,
        );
        if weights.dim() != expected {
            return Err(Error::ShapeMismatch {
                expected,
                found: weights.dim(),
            });
        }
        self.layers[index].set_weights(weights)
    }

    /// Resizes one layer. Its own weights and the next layer's weights no
    /// longer fit and are dropped; call [`Network::build_weights`] again.
    pub fn resize_layer(&mut self, index: usize, nodes: i64) -> Result<()> {
        self.layer_at(index)?;
        self.layers[index].set_num_nodes(nodes)?;
        if let Some(next) = self.layers.get_mut(index + 1) {
            next.clear_weights();
        }
        debug!(layer = index, nodes, "layer resized");
        Ok(())
    }

    /// Changes the batch width of every layer. Weights are kept.
    pub fn set_passes(&mut self, passes: i64) -> Result<()> {
        for layer in self.layers.iter_mut() {
            layer.set_passes(passes)?;
        }
        Ok(())
    }

    /// Propagates a batch (`input nodes × passes`) to the output layer and
    /// returns its activated values.
    pub fn forward(&mut self, inputs: &Matrix2<f64>) -> Result<&Matrix2<f64>> {
        self.layers[0].set_inputs(inputs)?;

        for index in 1..self.layers.len() {
            let (done, rest) = self.layers.split_at_mut(index);
            rest[0].propagate_from(&done[index - 1])?;
            trace!(layer = index, "forward");
        }

        Ok(self.output().beta())
    }

    /// Elementwise squared error of the output layer against `expected`.
    pub fn cost(&self, expected: &Matrix2<f64>) -> Result<Matrix2<f64>> {
        self.output().cost(expected)
    }

    /// Runs `inputs` forward and averages the squared error against `targets`.
    pub fn mean_squared_error(
        &mut self,
        inputs: &Matrix2<f64>,
        targets: &Matrix2<f64>,
    ) -> Result<f64> {
        let outputs = self.forward(inputs)?;
        cost::mean_squared_error(outputs, targets)
    }

    /// Backward pass with the squared error cost.
    pub fn backward(&mut self, target: &Matrix2<f64>) -> Result<()> {
        self.backward_with(target, squared_error_derivative)
    }

    /// Computes every non-input layer's delta, from the output layer down.
    ///
    /// Must follow a forward pass on the same batch. The input layer never
    /// receives a delta. Deltas are only stored once every layer succeeded,
    /// so a failed pass leaves the previous deltas in place.
    pub fn backward_with(
        &mut self,
        target: &Matrix2<f64>,
        cost_derivative: CostDerivative,
    ) -> Result<()> {
        // (layer index, delta), output layer first
        let mut pending: Vec<(usize, Matrix2<f64>)> = Vec::new();
        let mut state = BackwardState::AtOutput;
        loop {
            state = match state {
                BackwardState::AtOutput => {
                    let index = self.layers.len() - 1;
                    let output = &self.layers[index];
                    let delta = output.activation()?.output_delta(
                        output.alpha(),
                        output.beta(),
                        target,
                        cost_derivative,
                    )?;
                    pending.push((index, delta));
                    trace!(layer = index, "output delta");
                    BackwardState::below(index)
                }
                BackwardState::AtHidden(index) => {
                    let layer = &self.layers[index];
                    let next = &self.layers[index + 1];
                    let next_delta = &pending[pending.len() - 1].1;

                    let omega = next.weights().ok_or(Error::MissingWeights)?;
                    // the bias row has no node to send a delta to
                    let trans_weight = omega
                        .transpose()
                        .dot(next_delta)?
                        .without_last_row()?;
                    let delta = layer
                        .activation()?
                        .backpropagate(layer.alpha(), &trans_weight)?;
                    pending.push((index, delta));
                    trace!(layer = index, "hidden delta");
                    BackwardState::below(index)
                }
                BackwardState::AtInputBoundary => break,
            };
        }

        for (index, delta) in &pending {
            let found = delta.dim();
            let expected = self.layers[*index].delta().dim();
            if found != expected {
                return Err(Error::ShapeMismatch { expected, found });
            }
        }
        for (index, delta) in pending {
            self.layers[index].store_delta(&delta)?;
        }
        Ok(())
    }

    /// Applies `strategy` to every weighted layer using its delta and the
    /// previous layer's output. Nothing is written unless every layer's
    /// update succeeds.
    pub fn update_weights(&mut self, strategy: &impl WeightUpdate) -> Result<()> {
        let mut updated = Vec::with_capacity(self.layers.len() - 1);
        for index in 1..self.layers.len() {
            let previous = &self.layers[index - 1];
            let layer = &self.layers[index];

            let weights = layer.weights().ok_or(Error::MissingWeights)?;
            let next = strategy.update(weights, layer.delta(), &previous.biased_output())?;
            if next.dim() != weights.dim() {
                return Err(Error::ShapeMismatch {
                    expected: weights.dim(),
                    found: next.dim(),
                });
            }
            updated.push(next);
        }

        for (layer, weights) in self.layers.iter_mut().skip(1).zip(updated) {
            layer.set_weights(weights)?;
        }
        Ok(())
    }

    fn layer_at(&self, index: usize) -> Result<&Layer> {
        self.layers.get(index).ok_or(Error::NoSuchLayer(index))
    }
}

/// Describes a network layer by layer before any matrix is allocated.
pub struct NetworkBuilder {
    passes: i64,
    layers: Vec<(LayerKind, i64, Option<Arc<dyn Activation>>)>,
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self {
            passes: 1,
            layers: Vec::new(),
        }
    }
}

impl NetworkBuilder {
    /// Number of samples processed per forward pass (defaults to 1).
    pub fn passes(mut self, passes: i64) -> Self {
        self.passes = passes;
        self
    }

    pub fn input(mut self, nodes: i64) -> Self {
        self.layers.push((LayerKind::Input, nodes, None));
        self
    }

    pub fn hidden(mut self, nodes: i64, activation: impl Activation + 'static) -> Self {
        self.layers
            .push((LayerKind::Hidden, nodes, Some(Arc::new(activation))));
        self
    }

    pub fn output(mut self, nodes: i64, activation: impl Activation + 'static) -> Self {
        self.layers
            .push((LayerKind::Output, nodes, Some(Arc::new(activation))));
        self
    }

    /// Creates the layers, validates the chain and builds the weights.
    pub fn build<F>(self, init: F) -> Result<Network>
    where
        F: FnMut(usize, usize) -> Result<Matrix2<f64>>,
    {
        let passes = self.passes;
        let layers = self
            .layers
            .into_iter()
            .map(|(kind, nodes, activation)| -> Result<Layer> {
                let mut layer = Layer::new(kind, nodes, passes)?;
                if let Some(activation) = activation {
                    layer.set_shared_activation(activation);
                }
                Ok(layer)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut network = Network::new(layers)?;
        network.build_weights(init)?;
        Ok(network)
    }
}
