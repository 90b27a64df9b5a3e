use crate::{
    error::{Error, Result},
    optimizer::OptimizerKind,
};

pub const DEFAULT_LEARNING_RATE: f64 = 0.001;
pub const DEFAULT_BETA1: f64 = 0.9;
pub const DEFAULT_BETA2: f64 = 0.999;
pub const DEFAULT_EPSILON: f64 = 0.000001;

/// Update-rule configuration shared by every trainable neuron during one training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HyperParams {
    pub optimizer: OptimizerKind,
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for HyperParams {
    fn default() -> Self {
        HyperParams {
            optimizer: OptimizerKind::None,
            learning_rate: DEFAULT_LEARNING_RATE,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl HyperParams {
    pub fn new(optimizer: OptimizerKind, learning_rate: f64) -> Self {
        HyperParams {
            optimizer,
            learning_rate,
            ..Default::default()
        }
    }

    pub fn with_betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidSettings(format!(
                "learning rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }
        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(Error::InvalidSettings(format!(
                    "{} must lie in [0, 1), got {}",
                    name, beta
                )));
            }
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(Error::InvalidSettings(format!(
                "epsilon must be finite and >= 0, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}
