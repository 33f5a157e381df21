/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Graph Convolutional Networks.
//!
//! A [`Gcn`] is a stack of [`GcnLayer`]s, each of which aggregates the
//! features of the in-neighbors of every node by message passing on a
//! [`GcnGraph`] and then applies a learned projection and a nonlinearity.
//! Gradients are computed by hand: the transposed aggregation needed by the
//! backward pass is message passing on the reversed graph.
//!
//! The [`Trainer`] fits a model to a semi-supervised [node-classification
//! task](NodeClassification) by minimizing the [cross-entropy
//! loss](softmax_cross_entropy) on the training nodes with an
//! [`Optimizer`].

mod activation;
pub use activation::*;

pub mod gcn;
pub use gcn::{Gcn, GcnGraph, GcnLayer, LayerCache, LayerGrads, Normalization};

mod loss;
pub use loss::*;

pub mod optim;
pub use optim::{Adam, Optimizer, OptimizerKind, Sgd};

mod train;
pub use train::*;
