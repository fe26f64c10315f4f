use thiserror::Error;

/// Error type for the network engine
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// Indicates some dimension is incorrect in a Matrix operation.
    #[error("matrix dimensions are incompatible")]
    DimensionErr,
    #[error("number of nodes cannot be less than zero (got {0})")]
    InvalidNodeCount(i64),
    #[error("number of passes cannot be less than one (got {0})")]
    InvalidPassCount(i64),
    /// Input matrix does not match the input layer's `(nodes, passes)`.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("activation function used before it was set")]
    NullActivationFunction,
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    /// The activation has no derivative (e.g. the step function).
    #[error("{0} has no defined derivative")]
    UndefinedDerivative(&'static str),
    /// A non-input layer was used before its weights were built.
    #[error("layer has no weights, call build_weights first")]
    MissingWeights,
    #[error("no layer at index {0}")]
    NoSuchLayer(usize),
    #[error("a network needs an input and an output layer (got {0} layers)")]
    TooFewLayers(usize),
    #[error("layer {0} has the wrong kind for its position")]
    InvalidLayerKind(usize),
    #[error("weight initialization failed: {0}")]
    Initialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
