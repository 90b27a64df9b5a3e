use std::{fmt, str::FromStr};

use crate::{error::Error, param::HyperParams};

/// Adam stops correcting the second moment once its step counter reaches this value.
pub const SECOND_MOMENT_CORRECTION_STEPS: u64 = 4;
/// Adam stops correcting the first moment once its step counter reaches this value.
pub const FIRST_MOMENT_CORRECTION_STEPS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptimizerKind {
    None,
    AdaGrad,
    Adam,
    AmsGrad,
}

impl OptimizerKind {
    pub fn uses_moments(self) -> bool {
        matches!(self, OptimizerKind::Adam | OptimizerKind::AmsGrad)
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptimizerKind::None => "None",
            OptimizerKind::AdaGrad => "AdaGrad",
            OptimizerKind::Adam => "Adam",
            OptimizerKind::AmsGrad => "AMSGrad",
        };
        f.write_str(name)
    }
}

impl FromStr for OptimizerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "sgd" => Ok(OptimizerKind::None),
            "adagrad" => Ok(OptimizerKind::AdaGrad),
            "adam" => Ok(OptimizerKind::Adam),
            "amsgrad" | "ams-grad" => Ok(OptimizerKind::AmsGrad),
            _ => Err(Error::InvalidSettings(format!("unknown optimizer `{}`", s))),
        }
    }
}

/// Per-neuron update-rule state. Moment vectors are index-aligned with the neuron's weights.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizerState {
    None,
    AdaGrad {
        gradient_sum_sq: f64,
    },
    Adam {
        step: u64,
        first_moment: Vec<f64>,
        second_moment: Vec<f64>,
    },
    AmsGrad {
        first_moment: Vec<f64>,
        second_moment: Vec<f64>,
        second_moment_max: Vec<f64>,
    },
}

impl OptimizerState {
    pub fn new(kind: OptimizerKind, size: usize) -> Self {
        match kind {
            OptimizerKind::None => OptimizerState::None,
            OptimizerKind::AdaGrad => OptimizerState::AdaGrad {
                gradient_sum_sq: 0.0,
            },
            OptimizerKind::Adam => OptimizerState::Adam {
                step: 0,
                first_moment: vec![0.0; size],
                second_moment: vec![0.0; size],
            },
            OptimizerKind::AmsGrad => OptimizerState::AmsGrad {
                first_moment: vec![0.0; size],
                second_moment: vec![0.0; size],
                second_moment_max: vec![0.0; size],
            },
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        match self {
            OptimizerState::None => OptimizerKind::None,
            OptimizerState::AdaGrad { .. } => OptimizerKind::AdaGrad,
            OptimizerState::Adam { .. } => OptimizerKind::Adam,
            OptimizerState::AmsGrad { .. } => OptimizerKind::AmsGrad,
        }
    }

    /// Switches to `kind`. Staying on the same kind keeps the AdaGrad accumulator and
    /// the Adam step counter, but the moment vectors are always zeroed.
    pub fn prepare(&mut self, kind: OptimizerKind, size: usize) {
        if self.kind() != kind {
            *self = OptimizerState::new(kind, size);
            return;
        }
        match self {
            OptimizerState::None | OptimizerState::AdaGrad { .. } => {}
            OptimizerState::Adam {
                first_moment,
                second_moment,
                ..
            } => {
                reset(first_moment, size);
                reset(second_moment, size);
            }
            OptimizerState::AmsGrad {
                first_moment,
                second_moment,
                second_moment_max,
            } => {
                reset(first_moment, size);
                reset(second_moment, size);
                reset(second_moment_max, size);
            }
        }
    }

    /// Applies one update to `weights` with gradients `delta * input_i`.
    pub fn apply<I>(&mut self, params: &HyperParams, weights: &mut [f64], delta: f64, inputs: I)
    where
        I: IntoIterator<Item = f64>,
    {
        let HyperParams {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            ..
        } = *params;

        match self {
            OptimizerState::None => {
                for (weight, input) in weights.iter_mut().zip(inputs) {
                    *weight -= learning_rate * (delta * input);
                }
            }
            OptimizerState::AdaGrad { gradient_sum_sq } => {
                for (weight, input) in weights.iter_mut().zip(inputs) {
                    let gradient = delta * input;
                    *gradient_sum_sq += gradient * gradient;
                    *weight -= learning_rate / (gradient_sum_sq.sqrt() + epsilon) * gradient;
                }
            }
            OptimizerState::Adam {
                step,
                first_moment,
                second_moment,
            } => {
                *step += 1;
                let t = *step;
                let moments = first_moment.iter_mut().zip(second_moment.iter_mut());
                for ((weight, input), (m, v)) in weights.iter_mut().zip(inputs).zip(moments) {
                    let gradient = delta * input;
                    *m = beta1 * *m + (1.0 - beta1) * gradient;
                    *v = beta2 * *v + (1.0 - beta2) * gradient * gradient;

                    let mut m_hat = *m;
                    let mut v_hat = *v;
                    if t < SECOND_MOMENT_CORRECTION_STEPS {
                        v_hat /= 1.0 - beta2.powi(t as i32);
                    }
                    if t < FIRST_MOMENT_CORRECTION_STEPS {
                        m_hat /= 1.0 - beta1.powi(t as i32);
                    }

                    *weight -= learning_rate / (v_hat.sqrt() + epsilon) * m_hat;
                }
            }
            OptimizerState::AmsGrad {
                first_moment,
                second_moment,
                second_moment_max,
            } => {
                let moments = first_moment
                    .iter_mut()
                    .zip(second_moment.iter_mut())
                    .zip(second_moment_max.iter_mut());
                for ((weight, input), ((m, v), v_max)) in
                    weights.iter_mut().zip(inputs).zip(moments)
                {
                    let gradient = delta * input;
                    *m = beta1 * *m + (1.0 - beta1) * gradient;
                    *v = beta2 * *v + (1.0 - beta2) * gradient * gradient;
                    *v_max = (*v_max).max(*v);

                    *weight -= learning_rate / (v_max.sqrt() + epsilon) * *m;
                }
            }
        }
    }
}

fn reset(values: &mut Vec<f64>, size: usize) {
    values.clear();
    values.resize(size, 0.0);
}
