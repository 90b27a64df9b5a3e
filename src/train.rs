use crate::{
    error::{Error, Result},
    param::HyperParams,
};

/// Epoch budget. `Limit(n)` is an exclusive bound on the 1-based epoch counter,
/// so it runs `n - 1` passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Epochs {
    Limit(u64),
    Unbounded,
}

impl Epochs {
    pub fn allows(self, epoch: u64) -> bool {
        match self {
            Epochs::Limit(limit) => epoch < limit,
            Epochs::Unbounded => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainSettings {
    pub dataset: Vec<Vec<f64>>,
    pub epochs: Epochs,
    pub hyper_params: HyperParams,
    /// A task counts as correct when `|output - expected| <= error_threshold`
    /// (both on the normalized scale).
    pub error_threshold: f64,
    /// Training stops after the first epoch whose correct ratio reaches this.
    pub target_correct_ratio: f64,
    pub log_period: Option<u64>,
}

impl TrainSettings {
    pub fn new(
        dataset: Vec<Vec<f64>>,
        hyper_params: HyperParams,
        error_threshold: f64,
        target_correct_ratio: f64,
    ) -> Self {
        Self {
            dataset,
            epochs: Epochs::Unbounded,
            hyper_params,
            error_threshold,
            target_correct_ratio,
            log_period: None,
        }
    }

    pub fn with_epochs(mut self, epochs: Epochs) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_log_period(mut self, period: u64) -> Self {
        self.log_period = Some(period);
        self
    }

    /// Checks the configuration and that every row holds `input_neurons` features plus a label.
    pub fn validate(&self, input_neurons: usize) -> Result<()> {
        self.hyper_params.validate()?;

        if !(self.error_threshold.is_finite() && self.error_threshold >= 0.0) {
            return Err(Error::InvalidSettings(format!(
                "error threshold must be finite and >= 0, got {}",
                self.error_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.target_correct_ratio) {
            return Err(Error::InvalidSettings(format!(
                "target correct ratio must lie in [0, 1], got {}",
                self.target_correct_ratio
            )));
        }
        if self.epochs == Epochs::Limit(0) {
            return Err(Error::InvalidSettings(
                "epoch limit must be positive".to_string(),
            ));
        }
        if self.log_period == Some(0) {
            return Err(Error::InvalidSettings(
                "log period must be positive".to_string(),
            ));
        }

        let first = self
            .dataset
            .first()
            .ok_or_else(|| Error::InvalidDataset("dataset is empty".to_string()))?;
        let width = input_neurons + 1;
        for (i, row) in self.dataset.iter().enumerate() {
            if row.len() != first.len() {
                return Err(Error::InvalidDataset(format!(
                    "row {} has {} values but row 0 has {}",
                    i,
                    row.len(),
                    first.len()
                )));
            }
            if row.len() != width {
                return Err(Error::InvalidDataset(format!(
                    "row {} has {} values, expected {} features and a label",
                    i,
                    row.len(),
                    input_neurons
                )));
            }
            if let Some(column) = row.iter().position(|value| !value.is_finite()) {
                return Err(Error::InvalidDataset(format!(
                    "row {} column {} is not finite ({})",
                    i, column, row[column]
                )));
            }
        }
        Ok(())
    }
}

/// How a training run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainSummary {
    pub epochs_completed: u64,
    /// Correct ratio of the last completed epoch, 0 when none ran.
    pub correct_ratio: f64,
    pub converged: bool,
}
