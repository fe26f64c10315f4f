use std::{fmt, sync::Arc};

use tracing::debug;

use super::{activations::Activation, cost::squared_error};
use crate::{matrix::Matrix2, prelude::*};

/// Position of a layer in the chain. Only the input layer has no weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Input,
    Hidden,
    Output,
}

/// One stage of the network.
///
/// Values are stored one column per pass: `alpha` holds the weighted sums,
/// `beta` the activated values and `delta` the error signal from the last
/// backward pass. `omega` maps the previous layer's output, plus a constant
/// bias row, onto this layer's nodes.
#[derive(Clone)]
pub struct Layer {
    kind: LayerKind,
    nodes: usize,
    passes: usize,
    alpha: Matrix2<f64>,
    beta: Matrix2<f64>,
    delta: Matrix2<f64>,
    omega: Option<Matrix2<f64>>,
    activation: Option<Arc<dyn Activation>>,
}

fn check_nodes(nodes: i64) -> Result<usize> {
    usize::try_from(nodes).map_err(|_| Error::InvalidNodeCount(nodes))
}

fn check_passes(passes: i64) -> Result<usize> {
    match usize::try_from(passes) {
        Ok(p) if p >= 1 => Ok(p),
        _ => Err(Error::InvalidPassCount(passes)),
    }
}

impl Layer {
    /// Creates a layer of `nodes` nodes processing `passes` samples at once.
    /// No activation is attached and no weights are built.
    pub fn new(kind: LayerKind, nodes: i64, passes: i64) -> Result<Self> {
        let nodes = check_nodes(nodes)?;
        let passes = check_passes(passes)?;

        Ok(Self {
            kind,
            nodes,
            passes,
            alpha: Matrix2::new(nodes, passes),
            beta: Matrix2::new(nodes, passes),
            delta: Matrix2::new(nodes, passes),
            omega: None,
            activation: None,
        })
    }

    pub fn input(nodes: i64, passes: i64) -> Result<Self> {
        Self::new(LayerKind::Input, nodes, passes)
    }

    pub fn hidden(nodes: i64, passes: i64) -> Result<Self> {
        Self::new(LayerKind::Hidden, nodes, passes)
    }

    pub fn output(nodes: i64, passes: i64) -> Result<Self> {
        Self::new(LayerKind::Output, nodes, passes)
    }

    /// Attach an activation function to this layer
    pub fn with_activation(mut self, activation: impl Activation + 'static) -> Self {
        self.set_activation(activation);
        self
    }

    /// Replaces the activation and its derivative together.
    pub fn set_activation(&mut self, activation: impl Activation + 'static) {
        self.activation = Some(Arc::new(activation));
    }

    pub(crate) fn set_shared_activation(&mut self, activation: Arc<dyn Activation>) {
        self.activation = Some(activation);
    }

    pub fn activation(&self) -> Result<&dyn Activation> {
        self.activation
            .as_deref()
            .ok_or(Error::NullActivationFunction)
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn alpha(&self) -> &Matrix2<f64> {
        &self.alpha
    }

    pub fn beta(&self) -> &Matrix2<f64> {
        &self.beta
    }

    /// Error signal of the last backward pass (zeros before the first one).
    pub fn delta(&self) -> &Matrix2<f64> {
        &self.delta
    }

    pub fn weights(&self) -> Option<&Matrix2<f64>> {
        self.omega.as_ref()
    }

    /// Replaces the weight matrix, e.g. after a gradient step.
    pub fn set_weights(&mut self, weights: Matrix2<f64>) -> Result<()> {
        if weights.rows() != self.nodes {
            return Err(Error::ShapeMismatch {
                expected: (self.nodes, weights.cols()),
                found: weights.dim(),
            });
        }
        self.omega = Some(weights);
        Ok(())
    }

    pub(crate) fn clear_weights(&mut self) {
        self.omega = None;
    }

    /// Builds `omega` as `init(nodes, previous.nodes + 1)`.
    ///
    /// Does nothing for an input layer or when there is no previous layer, so
    /// "no previous layer" and "no weights" always coincide.
    pub fn build_weights<F>(&mut self, previous: Option<&Layer>, init: &mut F) -> Result<()>
    where
        F: FnMut(usize, usize) -> Result<Matrix2<f64>>,
    {
        let previous = match previous {
            Some(previous) if self.kind != LayerKind::Input => previous,
            _ => return Ok(()),
        };

        let shape = (self.nodes, previous.nodes + 1);
        let weights = init(shape.0, shape.1)?;
        if weights.dim() != shape {
            return Err(Error::ShapeMismatch {
                expected: shape,
                found: weights.dim(),
            });
        }
        self.omega = Some(weights);
        Ok(())
    }

    /// Stores a batch of inputs. Only valid on the input layer.
    pub fn set_inputs(&mut self, inputs: &Matrix2<f64>) -> Result<()> {
        if self.kind != LayerKind::Input {
            return Err(Error::InvalidInput(
                "inputs can only be set on the input layer".into(),
            ));
        }
        if inputs.rows() != self.nodes {
            return Err(Error::InvalidInput(format!(
                "expected {} rows (one per node), got {}",
                self.nodes,
                inputs.rows()
            )));
        }
        if inputs.cols() != self.passes {
            return Err(Error::InvalidInput(format!(
                "expected {} columns (one per pass), got {}",
                self.passes,
                inputs.cols()
            )));
        }

        self.alpha.assign(inputs)?;
        self.beta.assign(inputs)
    }

    /// `beta` with the constant bias row of ones appended, as fed to the next layer.
    pub fn biased_output(&self) -> Matrix2<f64> {
        self.beta.with_row_appended(1.0)
    }

    /// Sets `beta = activation(alpha)`.
    pub fn activate(&mut self) -> Result<()> {
        let beta = self.activation()?.activate(&self.alpha)?;
        self.beta.assign(&beta)
    }

    /// Local derivative of the activation at `alpha`.
    pub fn activation_derivative(&self) -> Result<Matrix2<f64>> {
        self.activation()?.derivative(&self.alpha)
    }

    /// `alpha = omega × [previous.beta; 1]`, then activates.
    pub fn propagate_from(&mut self, previous: &Layer) -> Result<()> {
        let omega = self.omega.as_ref().ok_or(Error::MissingWeights)?;
        if previous.passes != self.passes {
            return Err(Error::ShapeMismatch {
                expected: (previous.nodes, self.passes),
                found: (previous.nodes, previous.passes),
            });
        }

        omega.dot_into(&previous.biased_output(), &mut self.alpha)?;
        self.activate()
    }

    pub(crate) fn store_delta(&mut self, delta: &Matrix2<f64>) -> Result<()> {
        self.delta.assign(delta)
    }

    /// Elementwise squared error of `alpha` against `expected`.
    pub fn cost(&self, expected: &Matrix2<f64>) -> Result<Matrix2<f64>> {
        squared_error(&self.alpha, expected)
    }

    /// Resizes the layer. Stored values are reset and the weights dropped, so
    /// they must be rebuilt before the next forward pass.
    pub fn set_num_nodes(&mut self, nodes: i64) -> Result<()> {
        self.nodes = check_nodes(nodes)?;
        debug!(nodes = self.nodes, "layer resized, weights invalidated");
        self.reallocate();
        self.omega = None;
        Ok(())
    }

    /// Changes the batch width. Stored values are reset, weights are kept.
    pub fn set_passes(&mut self, passes: i64) -> Result<()> {
        self.passes = check_passes(passes)?;
        self.reallocate();
        Ok(())
    }

    fn reallocate(&mut self) {
        self.alpha = Matrix2::new(self.nodes, self.passes);
        self.beta = Matrix2::new(self.nodes, self.passes);
        self.delta = Matrix2::new(self.nodes, self.passes);
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("kind", &self.kind)
            .field("nodes", &self.nodes)
            .field("passes", &self.passes)
            .field("weights", &self.omega.as_ref().map(|w| w.dim()))
            .field("activation", &self.activation.as_ref().map(|a| a.name()))
            .finish()
    }
}
