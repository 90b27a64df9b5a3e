use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Empty dataset, ragged rows, or rows that do not match the input layer.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("the network has not been trained yet")]
    UntrainedModel,

    /// A normalization divisor or a forward/update computation left the finite range.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    /// Training configuration outside its documented domain.
    #[error("invalid training settings: {0}")]
    InvalidSettings(String),
}
