use crate::neuron::{Neuron, NeuronId};

/// A slice of the network's arena. The bias unit, when present, is the last member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    neurons: Vec<NeuronId>,
    bias: Option<NeuronId>,
}

impl Layer {
    /// Appends `size` regular neurons and an optional bias unit to `arena`.
    pub fn new(arena: &mut Vec<Neuron>, size: usize, bias: bool) -> Self {
        let mut neurons = Vec::with_capacity(size + bias as usize);
        for _ in 0..size {
            neurons.push(arena.len());
            arena.push(Neuron::new());
        }

        let bias = if bias {
            let id = arena.len();
            arena.push(Neuron::bias());
            neurons.push(id);
            Some(id)
        } else {
            None
        };

        Self { neurons, bias }
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn ids(&self) -> &[NeuronId] {
        &self.neurons
    }

    /// Members that compute a value and can be connection targets.
    pub fn regular(&self) -> &[NeuronId] {
        match self.bias {
            Some(_) => &self.neurons[..self.neurons.len() - 1],
            None => &self.neurons,
        }
    }

    pub fn bias(&self) -> Option<NeuronId> {
        self.bias
    }
}
