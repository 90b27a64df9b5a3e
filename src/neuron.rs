use rand::Rng;

use crate::{
    optimizer::{OptimizerKind, OptimizerState},
    param::HyperParams,
};

/// Index of a neuron in the network's arena.
pub type NeuronId = usize;

/// `2 / (1 + e^-x) - 1`, squashing into (-1, 1).
pub fn activate(x: f64) -> f64 {
    2.0 / (1.0 + (-x).exp()) - 1.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct Neuron {
    value: f64,
    delta: f64,
    bias: bool,
    incoming: Vec<NeuronId>,
    outgoing: Vec<NeuronId>,
    weights: Vec<f64>,
    optimizer: OptimizerState,
}

impl Default for Neuron {
    fn default() -> Self {
        Self::new()
    }
}

impl Neuron {
    pub fn new() -> Self {
        Self {
            value: 0.0,
            delta: 0.0,
            bias: false,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            weights: Vec::new(),
            optimizer: OptimizerState::None,
        }
    }

    /// A constant 1.0 source.
    pub fn bias() -> Self {
        Self {
            value: 1.0,
            bias: true,
            ..Self::new()
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn is_bias(&self) -> bool {
        self.bias
    }

    pub fn incoming(&self) -> &[NeuronId] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[NeuronId] {
        &self.outgoing
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn optimizer(&self) -> &OptimizerState {
        &self.optimizer
    }

    pub fn fan_out(&self) -> usize {
        self.outgoing.len()
    }

    /// Bias neurons ignore this and keep 1.0.
    pub fn set_value(&mut self, value: f64) {
        if !self.bias {
            self.value = value;
        }
    }

    pub fn set_delta(&mut self, delta: f64) {
        self.delta = delta;
    }

    /// Adds the edge `self -> target` with a weight drawn from [-1, 1].
    pub fn connect_to<R: Rng + ?Sized>(
        &mut self,
        own_id: NeuronId,
        target: &mut Neuron,
        target_id: NeuronId,
        rng: &mut R,
    ) {
        debug_assert!(!target.bias, "bias neurons never receive connections");
        debug_assert!(own_id < target_id, "edges point forward in the arena");

        target.incoming.push(own_id);
        target.weights.push(rng.gen_range(-1.0..=1.0));
        self.outgoing.push(target_id);
    }

    /// `upstream` must cover every incoming id; the network hands in the arena prefix
    /// that precedes this neuron.
    pub fn feed_forward(&mut self, upstream: &[Neuron]) -> f64 {
        if self.bias {
            return self.value;
        }

        let mut sum = 0.0;
        for (weight, id) in self.weights.iter().zip(&self.incoming) {
            sum += weight * upstream[*id].value;
        }
        self.value = activate(sum);
        self.value
    }

    /// Derivative of the activation, expressed through the activated value.
    pub fn derivative(&self) -> f64 {
        0.5 * (1.0 + self.value) * (1.0 - self.value)
    }

    /// Pushes this neuron's delta into its inputs.
    ///
    /// An input feeding only this neuron gets its delta overwritten with
    /// `delta * w * input.derivative()`. An input with several consumers accumulates
    /// `delta * w^2` and has its own derivative applied later, in `update_weights`.
    /// The second branch is not the chain rule for branching graphs; it is kept as is.
    pub fn back_propagate(&self, upstream: &mut [Neuron]) {
        if self.bias {
            return;
        }

        for (weight, id) in self.weights.iter().zip(&self.incoming) {
            let input = &mut upstream[*id];
            if input.bias {
                continue;
            }
            match input.fan_out() {
                0 => {}
                1 => input.delta = self.delta * weight * input.derivative(),
                _ => input.delta += self.delta * weight * weight,
            }
        }
    }

    /// Resets update-rule state before a training run (InitAdam for Adam and AMSGrad).
    pub fn init_optimizer(&mut self, kind: OptimizerKind) {
        self.optimizer.prepare(kind, self.weights.len());
    }

    pub fn update_weights(&mut self, upstream: &[Neuron], params: &HyperParams) {
        if self.bias {
            self.delta = 0.0;
            return;
        }

        let first_fan_out = self
            .incoming
            .first()
            .map_or(0, |id| upstream[*id].fan_out());
        if first_fan_out > 1 {
            self.delta *= self.derivative();
        }

        if self.optimizer.kind() != params.optimizer {
            self.optimizer = OptimizerState::new(params.optimizer, self.weights.len());
        }
        let inputs = self.incoming.iter().map(|id| upstream[*id].value);
        self.optimizer
            .apply(params, &mut self.weights, self.delta, inputs);

        self.delta = 0.0;
    }
}
