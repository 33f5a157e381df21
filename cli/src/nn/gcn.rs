/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::{GlobalArgs, NumThreadsArg, create_file, get_thread_pool};
use anyhow::{Context, Result, ensure};
use clap::{Parser, ValueEnum};
use dsi_progress_logger::{ProgressLog, progress_logger};
use mpgraph::datasets::{CitationLoader, Split};
use mpgraph_algo::nn::{NodeClassification, Normalization, OptimizerKind, TrainConfig, Trainer};
use std::io::Write;
use std::path::PathBuf;

/// The normalization of the adjacency matrix.
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum CliNormalization {
    /// Sum the features of the neighbors.
    None,
    /// Scale each message by the inverse square root of the degrees of its
    /// endpoints.
    #[default]
    Symmetric,
}

impl From<CliNormalization> for Normalization {
    fn from(n: CliNormalization) -> Self {
        match n {
            CliNormalization::None => Normalization::None,
            CliNormalization::Symmetric => Normalization::Symmetric,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum CliOptimizer {
    #[default]
    Adam,
    /// Stochastic gradient descent, with optional momentum.
    Sgd,
}

#[derive(Parser, Debug)]
#[command(
    about = "Train a Graph Convolutional Network on a citation dataset.",
    long_about = "Train a Graph Convolutional Network on a citation dataset in the Cora/CiteSeer format, that is, a file BASENAME.content with a line per paper (identifier, features, class label) and a file BASENAME.cites with a line per citation (cited paper, citing paper). Training uses the first nodes of each class; validation and test nodes follow among the remaining ones."
)]
pub struct CliArgs {
    /// The basename of the dataset.
    pub basename: PathBuf,

    #[arg(long, value_delimiter = ',', default_value = "16")]
    /// The dimensions of the hidden layers, separated by commas.
    pub hidden: Vec<usize>,

    #[arg(short, long, default_value_t = 200)]
    /// The number of training epochs.
    pub epochs: usize,

    #[arg(long = "lr", default_value_t = 0.01)]
    /// The learning rate.
    pub learning_rate: f64,

    #[arg(long, default_value_t = 5E-4)]
    /// The coefficient of the L2 penalty on the weights.
    pub weight_decay: f64,

    #[arg(long, value_enum, default_value_t = CliOptimizer::Adam)]
    /// The optimizer.
    pub optimizer: CliOptimizer,

    #[arg(long, default_value_t = 0.0)]
    /// The momentum of stochastic gradient descent.
    pub momentum: f64,

    #[arg(long, value_enum, default_value_t = CliNormalization::Symmetric)]
    /// The normalization of the adjacency matrix.
    pub norm: CliNormalization,

    #[arg(long, default_value_t = 0)]
    /// The seed used to initialize the weights.
    pub seed: u64,

    #[arg(long)]
    /// Do not add a self-loop to each node.
    pub no_self_loops: bool,

    #[arg(long)]
    /// Keep citations directed (from citing to cited paper).
    pub directed: bool,

    #[arg(long)]
    /// Do not normalize feature vectors to sum one.
    pub no_row_normalize: bool,

    #[arg(long, default_value_t = 20)]
    /// The number of training nodes per class.
    pub train_per_class: usize,

    #[arg(long, default_value_t = 500)]
    /// The number of validation nodes.
    pub num_val: usize,

    #[arg(long, default_value_t = 1000)]
    /// The number of test nodes.
    pub num_test: usize,

    #[arg(long)]
    /// Where to store a JSON report with the configuration, per-epoch
    /// statistics, and final accuracies.
    pub report: Option<PathBuf>,

    #[arg(long)]
    /// Where to store the predicted class of each paper, as tab-separated
    /// pairs of paper identifier and class label.
    pub predictions: Option<PathBuf>,

    #[arg(long)]
    /// Where to store the trained model in JSON format.
    pub model: Option<PathBuf>,

    #[clap(flatten)]
    pub num_threads: NumThreadsArg,
}

impl CliArgs {
    fn train_config(&self) -> TrainConfig {
        TrainConfig {
            epochs: self.epochs,
            learning_rate: self.learning_rate,
            weight_decay: self.weight_decay,
            hidden: self.hidden.clone(),
            seed: self.seed,
            normalization: self.norm.into(),
            optimizer: match self.optimizer {
                CliOptimizer::Adam => OptimizerKind::Adam,
                CliOptimizer::Sgd => OptimizerKind::Sgd {
                    momentum: self.momentum,
                },
            },
        }
    }
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    ensure!(
        args.learning_rate > 0.0,
        "The learning rate must be positive, got {}",
        args.learning_rate
    );
    ensure!(
        args.weight_decay >= 0.0,
        "The weight decay cannot be negative, got {}",
        args.weight_decay
    );
    ensure!(
        (0.0..1.0).contains(&args.momentum),
        "The momentum must be in [0 . . 1), got {}",
        args.momentum
    );
    ensure!(
        args.hidden.iter().all(|&d| d > 0),
        "Hidden dimensions must be positive, got {:?}",
        args.hidden
    );

    let mut pl = progress_logger![];
    pl.display_memory(true);
    if let Some(log_interval) = global_args.log_interval {
        pl.log_interval(log_interval);
    }

    let thread_pool = get_thread_pool(args.num_threads.num_threads)?;

    log::info!("Loading the dataset from {}", args.basename.display());
    let dataset = CitationLoader::with_basename(&args.basename)
        .self_loops(!args.no_self_loops)
        .symmetric(!args.directed)
        .row_normalize(!args.no_row_normalize)
        .split(Split {
            train_per_class: args.train_per_class,
            num_val: args.num_val,
            num_test: args.num_test,
        })
        .load()?;
    log::info!(
        "{} papers, {} arcs, {} features, {} classes",
        dataset.num_nodes(),
        dataset.graph.num_arcs(),
        dataset.num_features(),
        dataset.num_classes()
    );

    let task = NodeClassification::from(&dataset);
    let trainer = Trainer::new(args.train_config());
    let outcome = thread_pool.install(|| trainer.train_with_logging(&task, &mut pl))?;

    if let Some(path) = &args.report {
        log::info!("Storing the report at {}", path.display());
        let mut file = create_file(path)?;
        serde_json::to_writer_pretty(&mut file, &outcome.report)
            .with_context(|| format!("Could not write the report to {}", path.display()))?;
        file.flush()?;
    }

    if let Some(path) = &args.predictions {
        log::info!("Storing predictions at {}", path.display());
        let mut file = create_file(path)?;
        for (paper, class) in dataset.paper_ids.iter().zip(outcome.predictions()) {
            writeln!(file, "{}\t{}", paper, dataset.class_names[class])
                .with_context(|| format!("Could not write predictions to {}", path.display()))?;
        }
        file.flush()?;
    }

    if let Some(path) = &args.model {
        log::info!("Storing the model at {}", path.display());
        let mut file = create_file(path)?;
        serde_json::to_writer(&mut file, &outcome.model)
            .with_context(|| format!("Could not write the model to {}", path.display()))?;
        file.flush()?;
    }

    Ok(())
}
