use anyhow::Result;
use clap::Parser;
use log::info;
use neural_sense::{
    iris::{self, Species},
    Epochs, HyperParams, Network, OptimizerKind, Topology, TrainSettings,
};

#[derive(Parser, Debug)]
#[command(name = "neural-sense")]
#[command(about = "Train the example network on the iris rows and classify them")]
struct Args {
    /// None, AdaGrad, Adam or AMSGrad
    #[arg(short, long, default_value = "Adam")]
    optimizer: OptimizerKind,

    #[arg(long, default_value = "0.001")]
    learning_rate: f64,

    /// Exclusive epoch bound; unbounded when omitted
    #[arg(short, long)]
    epochs: Option<u64>,

    /// Largest normalized error still counted as a correct prediction
    #[arg(long, default_value = "0.003")]
    threshold: f64,

    /// Correct ratio that stops training
    #[arg(long, default_value = "0.9")]
    target: f64,

    /// Log progress every N epochs
    #[arg(long)]
    log_period: Option<u64>,

    /// Seed for weight initialization and shuffling
    #[arg(long)]
    seed: Option<u64>,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let topology = Topology::new(4, &[10, 5], true);
    let mut network = match args.seed {
        Some(seed) => Network::with_seed(topology, seed)?,
        None => Network::new(topology)?,
    };

    let settings = TrainSettings::new(
        iris::dataset(),
        HyperParams::new(args.optimizer, args.learning_rate),
        args.threshold,
        args.target,
    )
    .with_epochs(args.epochs.map_or(Epochs::Unbounded, Epochs::Limit));
    let settings = match args.log_period {
        Some(period) => settings.with_log_period(period),
        None => settings,
    };

    info!("training with {} at learning rate {}", args.optimizer, args.learning_rate);
    let summary = network.train(&settings)?;
    info!(
        "{} epochs, correct ratio {:.3}",
        summary.epochs_completed, summary.correct_ratio
    );

    for row in iris::DATASET.iter() {
        let prediction = network.predict(&row[..4])?;
        match Species::classify(prediction) {
            Some(species) => println!("{:>8.4} {}", prediction, species),
            None => println!("{:>8.4} ¯\\_(ツ)_/¯", prediction),
        }
    }
    Ok(())
}
