use log::{debug, info, warn};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::{
    error::{Error, Result},
    layer::Layer,
    neuron::{Neuron, NeuronId},
    normalize::DatasetScale,
    optimizer::OptimizerKind,
    param::HyperParams,
    train::{TrainSettings, TrainSummary},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub input_neurons: usize,
    pub hidden_layers: Vec<usize>,
    /// Adds a bias unit to the input layer and to every hidden layer.
    pub bias: bool,
}

impl Topology {
    pub fn new(input_neurons: usize, hidden_layers: &[usize], bias: bool) -> Self {
        Topology {
            input_neurons,
            hidden_layers: hidden_layers.to_vec(),
            bias,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_neurons == 0 {
            return Err(Error::InvalidTopology(
                "input neuron count must be positive".to_string(),
            ));
        }
        if self.hidden_layers.is_empty() {
            return Err(Error::InvalidTopology(
                "at least one hidden layer is required".to_string(),
            ));
        }
        if let Some(layer) = self.hidden_layers.iter().position(|size| *size == 0) {
            return Err(Error::InvalidTopology(format!(
                "hidden layer {} has no neurons",
                layer
            )));
        }
        Ok(())
    }
}

/// Fully-connected network with a single output neuron.
///
/// Neurons live in one arena ordered input layer, hidden layers, output, so every
/// edge points from a lower index to a higher one.
#[derive(Debug, Clone)]
pub struct Network<R: Rng = StdRng> {
    neurons: Vec<Neuron>,
    input_layer: Layer,
    hidden_layers: Vec<Layer>,
    output: NeuronId,
    topology: Topology,
    hyper_params: HyperParams,
    scale: Option<DatasetScale>,
    error: f64,
    expected: f64,
    rng: R,
}

impl Network<StdRng> {
    pub fn new(topology: Topology) -> Result<Self> {
        Self::with_rng(topology, StdRng::from_entropy())
    }

    pub fn with_seed(topology: Topology, seed: u64) -> Result<Self> {
        Self::with_rng(topology, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Network<R> {
    /// `rng` draws the initial weights here and shuffles the dataset in every epoch.
    pub fn with_rng(topology: Topology, mut rng: R) -> Result<Self> {
        topology.validate()?;

        let mut neurons = Vec::new();
        let input_layer = Layer::new(&mut neurons, topology.input_neurons, topology.bias);
        let hidden_layers: Vec<_> = topology
            .hidden_layers
            .iter()
            .map(|size| Layer::new(&mut neurons, *size, topology.bias))
            .collect();
        let output = neurons.len();
        neurons.push(Neuron::new());

        let mut sources = &input_layer;
        for layer in &hidden_layers {
            connect(&mut neurons, sources.ids(), layer.regular(), &mut rng);
            sources = layer;
        }
        connect(&mut neurons, sources.ids(), &[output], &mut rng);

        debug!(
            "built network {:?} with {} neurons",
            topology,
            neurons.len()
        );

        Ok(Network {
            neurons,
            input_layer,
            hidden_layers,
            output,
            topology,
            hyper_params: HyperParams::default(),
            scale: None,
            error: 0.0,
            expected: 0.0,
            rng,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn neuron(&self, id: NeuronId) -> Option<&Neuron> {
        self.neurons.get(id)
    }

    pub fn input_layer(&self) -> &Layer {
        &self.input_layer
    }

    pub fn hidden_layers(&self) -> &[Layer] {
        &self.hidden_layers
    }

    pub fn output(&self) -> &Neuron {
        &self.neurons[self.output]
    }

    pub fn output_id(&self) -> NeuronId {
        self.output
    }

    pub fn hyper_params(&self) -> &HyperParams {
        &self.hyper_params
    }

    pub fn scale(&self) -> Option<&DatasetScale> {
        self.scale.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.scale.is_some()
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn expected(&self) -> f64 {
        self.expected
    }

    /// Loads `features ++ [label]` into the input layer; the bias slot stays 1.0.
    pub fn set_task(&mut self, task: &[f64]) -> Result<()> {
        let count = self.topology.input_neurons;
        if task.len() != count + 1 {
            return Err(Error::InvalidInput(format!(
                "task has {} values, expected {} features and a label",
                task.len(),
                count
            )));
        }
        self.load_inputs(&task[..count]);
        self.expected = task[count];
        Ok(())
    }

    fn load_inputs(&mut self, features: &[f64]) {
        for (id, value) in self.input_layer.regular().iter().zip(features) {
            self.neurons[*id].set_value(*value);
        }
    }

    pub fn feed_forward(&mut self) -> Result<()> {
        for layer in &self.hidden_layers {
            for id in layer.regular() {
                forward(&mut self.neurons, *id)?;
            }
        }
        forward(&mut self.neurons, self.output)
    }

    pub fn back_propagate(&mut self) {
        let output = &mut self.neurons[self.output];
        self.error = output.value() - self.expected;
        output.set_delta(self.error * output.derivative());

        let (upstream, output) = split_at(&mut self.neurons, self.output);
        output.back_propagate(upstream);

        for layer in self.hidden_layers.iter().rev() {
            for id in layer.regular() {
                let (upstream, neuron) = split_at(&mut self.neurons, *id);
                neuron.back_propagate(upstream);
            }
        }
    }

    /// Uses the hyperparameters installed by the last `train` call.
    pub fn update_weights(&mut self) -> Result<()> {
        let params = self.hyper_params;

        update(&mut self.neurons, self.output, &params)?;
        for layer in &self.hidden_layers {
            for id in layer.regular() {
                update(&mut self.neurons, *id, &params)?;
            }
        }

        // input neurons take part in propagation but are never updated
        for id in self.input_layer.ids() {
            self.neurons[*id].set_delta(0.0);
        }
        Ok(())
    }

    fn init_optimizers(&mut self, kind: OptimizerKind) {
        let trainable = self
            .hidden_layers
            .iter()
            .flat_map(|layer| layer.regular().iter().copied())
            .chain(std::iter::once(self.output));
        for id in trainable {
            self.neurons[id].init_optimizer(kind);
        }
    }

    /// Normalizes a copy of the dataset, then runs epochs until the correct ratio
    /// reaches the target or the epoch budget runs out.
    ///
    /// On error the weights are left partially updated and the network should be
    /// rebuilt before training again.
    pub fn train(&mut self, settings: &TrainSettings) -> Result<TrainSummary> {
        settings.validate(self.topology.input_neurons)?;

        self.scale = None;
        let scale = DatasetScale::fit(&settings.dataset)?;
        let mut dataset = settings.dataset.clone();
        scale.apply_in_place(&mut dataset);

        self.hyper_params = settings.hyper_params;
        let optimizer = self.hyper_params.optimizer;
        if optimizer.uses_moments() {
            debug!("resetting {} moments", optimizer);
        }
        self.init_optimizers(optimizer);

        let threshold = settings.error_threshold;
        let mut summary = TrainSummary {
            epochs_completed: 0,
            correct_ratio: 0.0,
            converged: false,
        };

        let mut epoch = 1;
        while settings.epochs.allows(epoch) {
            dataset.shuffle(&mut self.rng);

            let mut correct = 0;
            for task in &dataset {
                self.set_task(task)?;
                self.feed_forward()?;
                self.back_propagate();
                self.update_weights()?;

                if (-threshold..=threshold).contains(&self.error) {
                    correct += 1;
                }
            }

            let correct_ratio = correct as f64 / dataset.len() as f64;
            summary.epochs_completed = epoch;
            summary.correct_ratio = correct_ratio;

            if let Some(period) = settings.log_period {
                if epoch % period == 0 {
                    info!(
                        "[epoch {}] correct predicts: {}%",
                        epoch,
                        (correct_ratio * 100.0) as u32
                    );
                }
            }

            if correct_ratio >= settings.target_correct_ratio {
                summary.converged = true;
                info!(
                    "reached {:.3} correct ratio after {} epochs",
                    correct_ratio, epoch
                );
                break;
            }
            epoch += 1;
        }

        if !summary.converged {
            warn!(
                "epoch budget exhausted at {:.3} correct ratio (target {})",
                summary.correct_ratio, settings.target_correct_ratio
            );
        }

        self.scale = Some(scale);
        Ok(summary)
    }

    pub fn predict(&mut self, features: &[f64]) -> Result<f64> {
        let scale = self.scale.as_ref().ok_or(Error::UntrainedModel)?;
        let count = self.topology.input_neurons;
        if features.len() != count {
            return Err(Error::InvalidInput(format!(
                "got {} features, expected {}",
                features.len(),
                count
            )));
        }
        if let Some(i) = features.iter().position(|value| !value.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "feature {} is not finite ({})",
                i, features[i]
            )));
        }
        let normalized = scale.normalize(features);
        let label_scale = scale.label_scale();

        self.load_inputs(&normalized);
        self.feed_forward()?;

        Ok(self.neurons[self.output].value() * label_scale)
    }
}

/// Splits the arena into the neurons preceding `id` and `id` itself.
fn split_at(neurons: &mut [Neuron], id: NeuronId) -> (&mut [Neuron], &mut Neuron) {
    let (upstream, rest) = neurons.split_at_mut(id);
    (upstream, &mut rest[0])
}

fn connect<R: Rng + ?Sized>(
    neurons: &mut [Neuron],
    sources: &[NeuronId],
    targets: &[NeuronId],
    rng: &mut R,
) {
    for from in sources {
        for to in targets {
            let (upstream, target) = split_at(neurons, *to);
            upstream[*from].connect_to(*from, target, *to, rng);
        }
    }
}

fn forward(neurons: &mut [Neuron], id: NeuronId) -> Result<()> {
    let (upstream, neuron) = split_at(neurons, id);
    let value = neuron.feed_forward(upstream);
    if !value.is_finite() {
        return Err(Error::NumericalInstability(format!(
            "neuron {} produced {} in the forward pass",
            id, value
        )));
    }
    Ok(())
}

fn update(neurons: &mut [Neuron], id: NeuronId, params: &HyperParams) -> Result<()> {
    let (upstream, neuron) = split_at(neurons, id);
    neuron.update_weights(upstream, params);
    if let Some(i) = neuron.weights().iter().position(|w| !w.is_finite()) {
        return Err(Error::NumericalInstability(format!(
            "weight {} of neuron {} became {} under {}",
            i,
            id,
            neuron.weights()[i],
            params.optimizer
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{optimizer::OptimizerKind, train::Epochs};

    fn iris_topology() -> Topology {
        Topology::new(4, &[10, 5], true)
    }

    #[test]
    fn wiring() {
        let network = Network::with_seed(iris_topology(), 1).unwrap();
        let neurons = network.neurons();
        assert_eq!(neurons.len(), 5 + 11 + 6 + 1);

        let input = network.input_layer();
        assert_eq!(input.len(), 5);
        for id in input.ids() {
            assert_eq!(neurons[*id].fan_out(), 10);
        }

        let hidden = network.hidden_layers();
        for id in hidden[0].regular() {
            assert_eq!(neurons[*id].incoming(), input.ids());
            assert_eq!(neurons[*id].fan_out(), 5);
        }
        for id in hidden[1].regular() {
            assert_eq!(neurons[*id].incoming().len(), 11);
            assert_eq!(neurons[*id].outgoing(), &[network.output_id()]);
        }
        for layer in hidden {
            let bias = &neurons[layer.bias().unwrap()];
            assert!(bias.incoming().is_empty());
            assert_eq!(bias.value(), 1.0);
        }
        assert_eq!(network.output().incoming(), hidden[1].ids());
        assert!(!network.output().is_bias());
    }

    #[test]
    fn wiring_without_bias() {
        let network = Network::with_seed(Topology::new(2, &[3], false), 1).unwrap();
        assert_eq!(network.neurons().len(), 2 + 3 + 1);
        assert!(network.neurons().iter().all(|n| !n.is_bias()));
        assert_eq!(network.output().incoming().len(), 3);
    }

    #[test]
    fn invalid_topologies() {
        for topology in [
            Topology::new(0, &[3], true),
            Topology::new(2, &[], true),
            Topology::new(2, &[3, 0], false),
        ] {
            assert!(matches!(
                Network::with_seed(topology, 0),
                Err(Error::InvalidTopology(_))
            ));
        }
    }

    #[test]
    fn forward_values_stay_in_range() {
        let mut network = Network::with_seed(iris_topology(), 3).unwrap();
        network.set_task(&[0.51, 0.35, 0.14, 0.02, 0.1]).unwrap();
        network.feed_forward().unwrap();
        for layer in network.hidden_layers() {
            for id in layer.regular() {
                let value = network.neurons()[*id].value();
                assert!(value > -1.0 && value < 1.0);
            }
            assert_eq!(network.neurons()[layer.bias().unwrap()].value(), 1.0);
        }
        let value = network.output().value();
        assert!(value > -1.0 && value < 1.0);
    }

    #[test]
    fn set_task_checks_width() {
        let mut network = Network::with_seed(iris_topology(), 3).unwrap();
        assert!(matches!(
            network.set_task(&[1.0, 2.0, 3.0, 4.0]),
            Err(Error::InvalidInput(_))
        ));
        network.set_task(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(network.expected(), 5.0);
        let bias = network.input_layer().bias().unwrap();
        assert_eq!(network.neurons()[bias].value(), 1.0);
    }

    #[test]
    fn predict_requires_training() {
        let mut network = Network::with_seed(iris_topology(), 3).unwrap();
        assert_eq!(
            network.predict(&[5.1, 3.5, 1.4, 0.2]),
            Err(Error::UntrainedModel)
        );
    }

    #[test]
    fn error_tracks_last_task() {
        let mut network = Network::with_seed(Topology::new(1, &[2], true), 9).unwrap();
        network.set_task(&[0.5, 0.25]).unwrap();
        network.feed_forward().unwrap();
        network.back_propagate();
        assert_eq!(network.error(), network.output().value() - 0.25);
        assert_ne!(network.output().delta(), 0.0);

        network.update_weights().unwrap();
        assert!(network.neurons().iter().all(|n| n.delta() == 0.0));
    }

    #[test]
    fn zero_pass_budget() {
        let mut network = Network::with_seed(Topology::new(1, &[2], true), 9).unwrap();
        let settings = TrainSettings::new(
            vec![vec![1.0, 2.0]],
            HyperParams::new(OptimizerKind::Adam, 0.01),
            0.0,
            1.0,
        )
        .with_epochs(Epochs::Limit(1));
        let before: Vec<_> = network.neurons().iter().map(|n| n.weights().to_vec()).collect();

        let summary = network.train(&settings).unwrap();
        assert_eq!(summary.epochs_completed, 0);
        assert!(!summary.converged);
        let after: Vec<_> = network.neurons().iter().map(|n| n.weights().to_vec()).collect();
        assert_eq!(before, after);
        assert!(network.is_trained());
    }

    #[test]
    fn failed_training_leaves_model_untrained() {
        let mut network = Network::with_seed(Topology::new(1, &[2], true), 9).unwrap();
        let settings = TrainSettings::new(
            vec![vec![1.0, 2.0], vec![3.0]],
            HyperParams::default(),
            0.1,
            1.0,
        );
        assert!(matches!(
            network.train(&settings),
            Err(Error::InvalidDataset(_))
        ));
        assert_eq!(network.predict(&[1.0]), Err(Error::UntrainedModel));
    }

    #[test]
    fn optimizer_state_is_installed() {
        let mut network = Network::with_seed(iris_topology(), 5).unwrap();
        let settings = TrainSettings::new(
            vec![vec![1.0, 2.0, 3.0, 4.0, 1.0]],
            HyperParams::new(OptimizerKind::AmsGrad, 0.01),
            0.0,
            1.0,
        )
        .with_epochs(Epochs::Limit(3));
        network.train(&settings).unwrap();
        assert_eq!(network.hyper_params().optimizer, OptimizerKind::AmsGrad);
        assert_eq!(network.output().optimizer().kind(), OptimizerKind::AmsGrad);
        let input = network.input_layer().ids()[0];
        assert_eq!(network.neurons()[input].optimizer().kind(), OptimizerKind::None);
    }
}
