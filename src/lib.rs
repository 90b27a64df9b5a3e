//! Minimal feedforward neural network with a single scalar output.

pub mod error;
pub mod iris;
pub mod layer;
pub mod network;
pub mod neuron;
pub mod normalize;
pub mod optimizer;
pub mod param;
pub mod train;

pub use error::{Error, Result};
pub use network::{Network, Topology};
pub use neuron::{Neuron, NeuronId};
pub use normalize::DatasetScale;
pub use optimizer::{OptimizerKind, OptimizerState};
pub use param::HyperParams;
pub use train::{Epochs, TrainSettings, TrainSummary};
