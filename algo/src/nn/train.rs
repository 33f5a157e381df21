/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{Gcn, GcnGraph, Normalization, OptimizerKind, accuracy, predict, softmax_cross_entropy};
use anyhow::{Context, Result, ensure};
use dsi_progress_logger::{ProgressLog, no_logging};
use mpgraph::datasets::CitationDataset;
use mpgraph::graphs::{MessageGraph, VecGraph};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// The hyperparameters of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// The coefficient of the L2 penalty on the weights (not on the biases).
    pub weight_decay: f64,
    /// The dimensions of the hidden layers.
    pub hidden: Vec<usize>,
    /// The seed used to initialize the weights.
    pub seed: u64,
    pub normalization: Normalization,
    pub optimizer: OptimizerKind,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 200,
            learning_rate: 0.01,
            weight_decay: 5E-4,
            hidden: vec![16],
            seed: 0,
            normalization: Normalization::Symmetric,
            optimizer: OptimizerKind::Adam,
        }
    }
}

/// Statistics about an epoch, computed on the logits of its forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub loss: f64,
    pub train_acc: f64,
    pub val_acc: f64,
}

/// The outcome of a training run, in a serializable form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    pub config: TrainConfig,
    pub num_parameters: usize,
    pub epochs: Vec<EpochStats>,
    /// Accuracies of the trained model.
    pub train_acc: f64,
    pub val_acc: f64,
    pub test_acc: f64,
}

/// A semi-supervised node-classification task.
#[derive(Debug, Clone, Copy)]
pub struct NodeClassification<'a> {
    pub graph: &'a VecGraph,
    pub features: &'a Array2<f64>,
    pub labels: &'a [usize],
    pub num_classes: usize,
    pub train_mask: &'a [bool],
    pub val_mask: &'a [bool],
    pub test_mask: &'a [bool],
}

impl<'a> From<&'a CitationDataset> for NodeClassification<'a> {
    fn from(dataset: &'a CitationDataset) -> Self {
        Self {
            graph: &dataset.graph,
            features: &dataset.features,
            labels: &dataset.labels,
            num_classes: dataset.num_classes(),
            train_mask: &dataset.train_mask,
            val_mask: &dataset.val_mask,
            test_mask: &dataset.test_mask,
        }
    }
}

impl NodeClassification<'_> {
    fn check(&self) -> Result<()> {
        let n = self.graph.num_nodes();
        ensure!(
            self.features.nrows() == n,
            "The graph has {n} nodes, but there are {} feature rows",
            self.features.nrows()
        );
        for (name, len) in [
            ("labels", self.labels.len()),
            ("training mask", self.train_mask.len()),
            ("validation mask", self.val_mask.len()),
            ("test mask", self.test_mask.len()),
        ] {
            ensure!(len == n, "The graph has {n} nodes, but the {name} has length {len}");
        }
        ensure!(self.num_classes > 0, "There must be at least one class");
        if let Some(&label) = self.labels.iter().max() {
            ensure!(
                label < self.num_classes,
                "Label {label} out of range for {} classes",
                self.num_classes
            );
        }
        Ok(())
    }
}

/// The result of [`Trainer::train`].
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model: Gcn,
    pub report: TrainReport,
    /// The logits of the trained model on all nodes.
    pub logits: Array2<f64>,
}

impl TrainOutcome {
    /// Returns the predicted class of each node.
    pub fn predictions(&self) -> Vec<usize> {
        predict(&self.logits)
    }
}

/// Trains a [`Gcn`] by full-batch gradient descent.
///
/// # Examples
///
/// ```
/// use mpgraph::graphs::VecGraph;
/// use mpgraph_algo::nn::{NodeClassification, TrainConfig, Trainer};
/// use ndarray::Array2;
///
/// let mut graph = VecGraph::from_arcs([(0, 1), (1, 0), (2, 3), (3, 2)]);
/// graph.add_self_loops();
/// let features = Array2::eye(4);
/// let task = NodeClassification {
///     graph: &graph,
///     features: &features,
///     labels: &[0, 0, 1, 1],
///     num_classes: 2,
///     train_mask: &[true, false, true, false],
///     val_mask: &[false, true, false, true],
///     test_mask: &[false, true, false, true],
/// };
/// let config = TrainConfig {
///     epochs: 50,
///     weight_decay: 0.0,
///     ..Default::default()
/// };
/// let outcome = Trainer::new(config).train(&task)?;
/// assert_eq!(outcome.report.epochs.len(), 50);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainConfig,
}

impl Trainer {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn train(&self, task: &NodeClassification<'_>) -> Result<TrainOutcome> {
        self.train_with_logging(task, no_logging![])
    }

    /// Trains a model, logging epochs with the given [`ProgressLog`].
    pub fn train_with_logging(
        &self,
        task: &NodeClassification<'_>,
        pl: &mut impl ProgressLog,
    ) -> Result<TrainOutcome> {
        task.check()?;
        let config = &self.config;
        let mut g = GcnGraph::new(MessageGraph::from(task.graph), config.normalization);

        let mut dims = vec![task.features.ncols()];
        dims.extend(&config.hidden);
        dims.push(task.num_classes);
        let mut model = Gcn::new(&dims, config.seed);
        let mut optimizer = config.optimizer.build(config.learning_rate);

        log::info!(
            "Training a GCN with dimensions {:?} ({} parameters) on {} nodes, {} training nodes",
            dims,
            model.num_parameters(),
            g.num_nodes(),
            task.train_mask.iter().filter(|&&m| m).count()
        );

        let mut epochs = Vec::with_capacity(config.epochs);
        pl.item_name("epoch");
        pl.expected_updates(Some(config.epochs));
        pl.start("Training...");

        for epoch in 1..=config.epochs {
            let (logits, caches) = model
                .forward(&mut g, task.features)
                .with_context(|| format!("Forward pass failed at epoch {epoch}"))?;
            let (mut loss, grad_logits) =
                softmax_cross_entropy(&logits, task.labels, task.train_mask)?;
            let mut grads = model
                .backward(&mut g, &caches, &grad_logits)
                .with_context(|| format!("Backward pass failed at epoch {epoch}"))?;

            if config.weight_decay != 0.0 {
                // Weights are at even positions
                for (layer, grad) in model.layers().iter().zip(grads.iter_mut().step_by(2)) {
                    grad.scaled_add(config.weight_decay, &layer.weight);
                    loss += 0.5 * config.weight_decay * layer.weight.mapv(|w| w * w).sum();
                }
            }

            let stats = EpochStats {
                epoch,
                loss,
                train_acc: accuracy(&logits, task.labels, task.train_mask)?,
                val_acc: accuracy(&logits, task.labels, task.val_mask)?,
            };
            log::debug!(
                "Epoch {}: loss = {:.4}, train accuracy = {:.4}, validation accuracy = {:.4}",
                stats.epoch,
                stats.loss,
                stats.train_acc,
                stats.val_acc
            );
            epochs.push(stats);

            optimizer.step(&mut model.parameters_mut(), &grads)?;
            pl.light_update();
        }
        pl.done();

        let (logits, _) = model.forward(&mut g, task.features)?;
        let report = TrainReport {
            config: config.clone(),
            num_parameters: model.num_parameters(),
            epochs,
            train_acc: accuracy(&logits, task.labels, task.train_mask)?,
            val_acc: accuracy(&logits, task.labels, task.val_mask)?,
            test_acc: accuracy(&logits, task.labels, task.test_mask)?,
        };
        log::info!(
            "Final accuracy: train {:.4}, validation {:.4}, test {:.4}",
            report.train_acc,
            report.val_acc,
            report.test_acc
        );

        Ok(TrainOutcome {
            model,
            report,
            logits,
        })
    }
}
