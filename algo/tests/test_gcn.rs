/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use mpgraph::graphs::{MessageGraph, VecGraph};
use mpgraph_algo::nn::*;
use ndarray::Array2;
use rand::{Rng, SeedableRng, rngs::SmallRng};

fn random_graph(n: usize, p: f64, seed: u64) -> VecGraph {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut g = VecGraph::empty(n);
    for u in 0..n {
        for v in 0..n {
            if u != v && rng.random_bool(p) {
                g.add_arc(u, v);
            }
        }
    }
    g.add_self_loops();
    g
}

fn loss(gcn: &Gcn, g: &mut GcnGraph, x: &Array2<f64>, labels: &[usize], mask: &[bool]) -> Result<f64> {
    let (logits, _) = gcn.forward(g, x)?;
    Ok(softmax_cross_entropy(&logits, labels, mask)?.0)
}

/// Compares the analytic gradient with central finite differences.
fn check_gradients(dims: &[usize], normalization: Normalization) -> Result<()> {
    let n = 12;
    let vg = random_graph(n, 0.3, 1);
    let mut g = GcnGraph::new(MessageGraph::from(&vg), normalization);
    let mut rng = SmallRng::seed_from_u64(2);
    let x = Array2::from_shape_simple_fn((n, dims[0]), || rng.random_range(-1.0..1.0));
    let classes = dims[dims.len() - 1];
    let labels: Vec<usize> = (0..n).map(|i| i % classes).collect();
    let mask: Vec<bool> = (0..n).map(|i| i % 3 != 0).collect();

    let mut gcn = Gcn::new(dims, 3);
    let (logits, caches) = gcn.forward(&mut g, &x)?;
    let (_, grad_logits) = softmax_cross_entropy(&logits, &labels, &mask)?;
    let grads = gcn.backward(&mut g, &caches, &grad_logits)?;
    assert_eq!(grads.len(), 2 * (dims.len() - 1));

    let eps = 1E-6;
    for (p, grad) in grads.iter().enumerate() {
        let shape = gcn.parameters_mut()[p].dim();
        assert_eq!(grad.dim(), shape);
        for i in 0..shape.0 {
            for j in 0..shape.1 {
                let orig = gcn.parameters_mut()[p][(i, j)];
                gcn.parameters_mut()[p][(i, j)] = orig + eps;
                let plus = loss(&gcn, &mut g, &x, &labels, &mask)?;
                gcn.parameters_mut()[p][(i, j)] = orig - eps;
                let minus = loss(&gcn, &mut g, &x, &labels, &mask)?;
                gcn.parameters_mut()[p][(i, j)] = orig;

                let numeric = (plus - minus) / (2.0 * eps);
                let analytic = grad[(i, j)];
                assert!(
                    (numeric - analytic).abs() <= 1E-6 + 1E-4 * numeric.abs().max(analytic.abs()),
                    "Parameter {p} at ({i}, {j}): numeric {numeric}, analytic {analytic}"
                );
            }
        }
    }
    Ok(())
}

#[test]
fn test_gradients_aggregate_then_project() -> Result<()> {
    // Both orders: 3 → 5 aggregates first, 5 → 2 projects first
    check_gradients(&[3, 5, 2], Normalization::Symmetric)
}

#[test]
fn test_gradients_project_then_aggregate() -> Result<()> {
    check_gradients(&[6, 2, 3], Normalization::Symmetric)
}

#[test]
fn test_gradients_unnormalized_deep() -> Result<()> {
    check_gradients(&[4, 4, 3, 2], Normalization::None)
}

/// Two 10-cliques joined by an arc in each direction.
fn two_cliques() -> (VecGraph, Vec<usize>) {
    let mut g = VecGraph::empty(20);
    for base in [0, 10] {
        for u in base..base + 10 {
            for v in base..base + 10 {
                g.add_arc(u, v);
            }
        }
    }
    g.add_arc(9, 10);
    g.add_arc(10, 9);
    let labels = (0..20).map(|i| i / 10).collect();
    (g, labels)
}

#[test]
fn test_train_two_communities() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let (graph, labels) = two_cliques();
    let features = Array2::eye(20);
    let train_mask: Vec<bool> = (0..20).map(|i| i % 10 < 2).collect();
    let rest: Vec<bool> = train_mask.iter().map(|m| !m).collect();
    let task = NodeClassification {
        graph: &graph,
        features: &features,
        labels: &labels,
        num_classes: 2,
        train_mask: &train_mask,
        val_mask: &rest,
        test_mask: &rest,
    };
    let config = TrainConfig {
        epochs: 100,
        learning_rate: 0.05,
        weight_decay: 0.0,
        hidden: vec![8],
        ..Default::default()
    };
    let outcome = Trainer::new(config).train(&task)?;
    let report = &outcome.report;

    assert_eq!(report.epochs.len(), 100);
    assert_eq!(report.epochs[0].epoch, 1);
    assert!(report.epochs[99].loss < report.epochs[0].loss);
    assert_eq!(report.train_acc, 1.0);
    assert!(report.test_acc >= 0.85, "Test accuracy {}", report.test_acc);
    assert_eq!(report.num_parameters, 20 * 8 + 8 + 8 * 2 + 2);

    let predictions = outcome.predictions();
    assert_eq!(predictions.len(), 20);
    assert_eq!(predictions[0], 0);
    assert_eq!(predictions[19], 1);
    Ok(())
}

#[test]
fn test_training_is_deterministic() -> Result<()> {
    let (graph, labels) = two_cliques();
    let features = Array2::eye(20);
    let mask: Vec<bool> = (0..20).map(|i| i % 5 == 0).collect();
    let task = NodeClassification {
        graph: &graph,
        features: &features,
        labels: &labels,
        num_classes: 2,
        train_mask: &mask,
        val_mask: &mask,
        test_mask: &mask,
    };
    let config = TrainConfig {
        epochs: 10,
        optimizer: OptimizerKind::Sgd { momentum: 0.9 },
        ..Default::default()
    };
    let a = Trainer::new(config.clone()).train(&task)?;
    let b = Trainer::new(config).train(&task)?;
    assert_eq!(a.report.epochs, b.report.epochs);
    assert_eq!(a.logits, b.logits);
    Ok(())
}

#[test]
fn test_report_serialization() -> Result<()> {
    let (graph, labels) = two_cliques();
    let features = Array2::eye(20);
    let mask = vec![true; 20];
    let task = NodeClassification {
        graph: &graph,
        features: &features,
        labels: &labels,
        num_classes: 2,
        train_mask: &mask,
        val_mask: &mask,
        test_mask: &mask,
    };
    let config = TrainConfig {
        epochs: 3,
        ..Default::default()
    };
    let outcome = Trainer::new(config).train(&task)?;

    let json = serde_json::to_string(&outcome.report)?;
    let report: TrainReport = serde_json::from_str(&json)?;
    assert_eq!(report.config, outcome.report.config);
    assert_eq!(report.epochs, outcome.report.epochs);
    let value: serde_json::Value = serde_json::from_str(&json)?;
    assert_eq!(value["config"]["optimizer"], "adam");
    assert_eq!(value["config"]["normalization"], "symmetric");

    let model: Gcn = serde_json::from_str(&serde_json::to_string(&outcome.model)?)?;
    assert_eq!(model.layers().len(), 2);
    for (loaded, trained) in model.layers().iter().zip(outcome.model.layers()) {
        assert_eq!(loaded.weight, trained.weight);
        assert_eq!(loaded.bias, trained.bias);
        assert_eq!(loaded.activation, trained.activation);
    }
    Ok(())
}

#[test]
fn test_invalid_tasks() {
    let (graph, labels) = two_cliques();
    let features = Array2::eye(19);
    let mask = vec![true; 20];
    let mut task = NodeClassification {
        graph: &graph,
        features: &features,
        labels: &labels,
        num_classes: 2,
        train_mask: &mask,
        val_mask: &mask,
        test_mask: &mask,
    };
    let trainer = Trainer::default();
    assert!(trainer.train(&task).is_err());

    let features = Array2::eye(20);
    task.features = &features;
    task.num_classes = 1;
    assert!(trainer.train(&task).is_err());

    let short = vec![true; 3];
    task.num_classes = 2;
    task.test_mask = &short;
    assert!(trainer.train(&task).is_err());
}
