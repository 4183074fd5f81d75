// Toy two-cluster classifier: a small end-to-end training run exercising the
// full stack (dense layers, leaky ReLU, softmax + cross-entropy, batched
// epochs, metrics, weight persistence) without any external dataset.

use log::info;
use ndarray::Array2;
use ndarray_rand::rand_distr::StandardNormal;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::process;

use micronet::layers::{DenseLayer, Layer, LeakyReluLayer, SoftmaxLayer};
use micronet::losses::{CrossEntropy, Label};
use micronet::network::{Network, Sample};

const SAMPLES_PER_CLASS: usize = 100;
const EVAL_SAMPLES: usize = 80;
// Training hyperparameters.
const EPOCHS: usize = 200;
const BATCH_SIZE: usize = 10;
const LEARNING_RATE: f64 = 0.05;
const SEED: u64 = 42;

/// Two noisy point clouds around (1, 0) and (0, 1), labeled 0 and 1.
fn make_dataset(rng: &mut StdRng) -> Vec<Sample> {
    let centers = [(1.0, 0.0), (0.0, 1.0)];
    let mut data = Vec::with_capacity(centers.len() * SAMPLES_PER_CLASS);

    for (class, &(cx, cy)) in centers.iter().enumerate() {
        for _ in 0..SAMPLES_PER_CLASS {
            let x = cx + 0.2 * rng.sample::<f64, _>(StandardNormal);
            let y = cy + 0.2 * rng.sample::<f64, _>(StandardNormal);
            let input = Array2::from_shape_vec((2, 1), vec![x, y])
                .expect("two rows, one column")
                .into_dyn();
            data.push(Sample {
                input,
                label: Label::Class(class),
            });
        }
    }
    data
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut rng = StdRng::seed_from_u64(SEED);

    let layers: Vec<Box<dyn Layer>> = vec![
        Box::new(DenseLayer::new(2, 8, &mut rng)),
        Box::new(LeakyReluLayer::default()),
        Box::new(DenseLayer::new(8, 2, &mut rng)),
        Box::new(SoftmaxLayer),
    ];
    let mut network = Network::new(layers, Box::new(CrossEntropy), EVAL_SAMPLES);
    network.set_training_data(make_dataset(&mut rng));

    info!(
        "training {} parameters on {} samples",
        network.parameter_count(),
        network.training_data().len()
    );

    for epoch in 0..EPOCHS {
        network.train_epoch(BATCH_SIZE, LEARNING_RATE, &mut rng);
        if (epoch + 1) % 20 == 0 {
            info!(
                "epoch {:3}: loss {:.4}, accuracy {:.1}%",
                epoch + 1,
                network.average_loss(),
                network.accuracy()
            );
        }
    }

    if let Err(err) = network.save_weights() {
        eprintln!("failed to save weights: {err}");
        process::exit(1);
    }
    info!("weights saved to {}", micronet::DEFAULT_WEIGHTS_PATH);
}
