/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Graph convolutional layers.
//!
//! A layer computes
//!
//! > *H*′ = σ( *Â* *H* *W* + **b** ),
//!
//! where *Â* is the (possibly normalized) adjacency matrix of the graph,
//! oriented so that each node sums over its in-neighbors. The multiplication
//! by *Â* is a round of message passing: the source features are copied along
//! the edges and summed by the receivers, and a node transform applies the
//! learned linear projection, the bias, and the nonlinearity.
//!
//! When the layer reduces dimensionality the projection is applied before
//! sending, so that messages are as narrow as possible; the two orders are
//! equivalent, as *Â* (*H* *W*) = (*Â* *H*) *W*.
//!
//! In the backward pass the gradient is multiplied by *Â*ᵀ, which is again a
//! round of message passing, on the reversed graph.

use super::Activation;
use anyhow::{Result, ensure};
use mpgraph::frame::{Attrs, Frame};
use mpgraph::functions::*;
use mpgraph::graphs::MessageGraph;
use ndarray::{Array2, Axis};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

const FEATURES: &str = "h";
const MESSAGE: &str = "m";
const AGGREGATE: &str = "agg";
const NORMALIZED: &str = "a";
const PRE_ACTIVATION: &str = "z";
const OUTPUT: &str = "out";

/// The normalization of the adjacency matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Plain sum of the neighbors.
    None,
    /// *D*ₒᵤₜ^(−½) *A* *D*ᵢₙ^(−½): the message from *j* to *i* is scaled by
    /// 1 / √(*d*⁺(*j*) *d*⁻(*i*)). Degrees are clamped to one.
    #[default]
    Symmetric,
}

/// A graph prepared for GCN computations.
///
/// Besides the graph, we keep its reversal (for the backward pass) and the
/// normalization coefficients of sources and destinations, as column
/// vectors.
#[derive(Debug, Clone)]
pub struct GcnGraph {
    graph: MessageGraph,
    reversed: MessageGraph,
    src_norm: Array2<f64>,
    dst_norm: Array2<f64>,
}

fn norm_coefficients(degrees: &[usize], normalization: Normalization) -> Array2<f64> {
    Array2::from_shape_fn((degrees.len(), 1), |(i, _)| match normalization {
        Normalization::None => 1.0,
        Normalization::Symmetric => 1.0 / (degrees[i].max(1) as f64).sqrt(),
    })
}

/// Removes a column from a frame, returning it.
fn take(frame: &mut Frame, name: &str) -> Result<Array2<f64>> {
    frame
        .remove(name)
        .ok_or_else(|| mpgraph::Error::MissingAttribute(name.to_owned()).into())
}

impl GcnGraph {
    pub fn new(graph: MessageGraph, normalization: Normalization) -> Self {
        let src_norm = norm_coefficients(&graph.out_degrees(), normalization);
        let dst_norm = norm_coefficients(&graph.in_degrees(), normalization);
        let reversed = graph.reverse();
        Self {
            graph,
            reversed,
            src_norm,
            dst_norm,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }

    pub fn graph(&self) -> &MessageGraph {
        &self.graph
    }

    /// Computes *Â*ᵀ *Y* by message passing on the reversed graph.
    pub fn aggregate_transposed(&mut self, y: &Array2<f64>) -> Result<Array2<f64>> {
        let ndata = self.reversed.ndata_mut();
        ndata.set(FEATURES, y * &self.dst_norm)?;
        ndata.remove(AGGREGATE);
        self.reversed.update_all(
            &builtin::copy_src(FEATURES, MESSAGE),
            &builtin::sum(MESSAGE, AGGREGATE),
            &NoApply,
        )?;
        let aggregate = take(self.reversed.ndata_mut(), AGGREGATE)?;
        Ok(aggregate * &self.src_norm)
    }
}

/// The values computed by a forward pass of a layer that are needed by the
/// backward pass.
#[derive(Debug, Clone)]
pub struct LayerCache {
    /// The input features *H*.
    pub input: Array2<f64>,
    /// *Â* *H*, if the layer aggregates before projecting.
    pub aggregate: Option<Array2<f64>>,
    /// *Â* *H* *W* + **b**.
    pub pre_activation: Array2<f64>,
}

/// The gradients of the loss with respect to the parameters of a layer.
#[derive(Debug, Clone)]
pub struct LayerGrads {
    pub weight: Array2<f64>,
    pub bias: Array2<f64>,
}

/// A graph convolutional layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcnLayer {
    /// The projection, with shape (input dimension × output dimension).
    pub weight: Array2<f64>,
    /// The bias, with shape (1 × output dimension).
    pub bias: Array2<f64>,
    pub activation: Activation,
}

impl GcnLayer {
    /// Creates a layer with Glorot-uniform weights and zero bias.
    pub fn new(in_dim: usize, out_dim: usize, activation: Activation, rng: &mut impl Rng) -> Self {
        let limit = (6.0 / (in_dim + out_dim).max(1) as f64).sqrt();
        let weight = Array2::from_shape_simple_fn((in_dim, out_dim), || {
            rng.random_range(-limit..=limit)
        });
        Self {
            weight,
            bias: Array2::zeros((1, out_dim)),
            activation,
        }
    }

    pub fn in_dim(&self) -> usize {
        self.weight.nrows()
    }

    pub fn out_dim(&self) -> usize {
        self.weight.ncols()
    }

    fn aggregates_first(&self) -> bool {
        self.in_dim() <= self.out_dim()
    }

    /// Computes the output of the layer, returning it together with the
    /// values needed by [`backward`](Self::backward).
    pub fn forward(&self, g: &mut GcnGraph, input: &Array2<f64>) -> Result<(Array2<f64>, LayerCache)> {
        ensure!(
            input.nrows() == g.num_nodes() && input.ncols() == self.in_dim(),
            "The input has shape {:?}, but the layer expects ({}, {})",
            input.shape(),
            g.num_nodes(),
            self.in_dim()
        );
        let aggregate_first = self.aggregates_first();
        let features = if aggregate_first {
            input * &g.src_norm
        } else {
            input.dot(&self.weight) * &g.src_norm
        };

        let (weight, bias, activation) = (&self.weight, &self.bias, self.activation);
        let dst_norm = &g.dst_norm;
        let transform = apply_node_fn(move |nodes| {
            let aggregate = nodes.data(AGGREGATE)? * &dst_norm.select(Axis(0), nodes.node_ids());
            let mut attrs = Attrs::new();
            let z = if aggregate_first {
                let z = aggregate.dot(weight) + bias;
                attrs.insert(NORMALIZED.to_owned(), aggregate);
                z
            } else {
                aggregate + bias
            };
            attrs.insert(OUTPUT.to_owned(), activation.forward(&z));
            attrs.insert(PRE_ACTIVATION.to_owned(), z);
            Ok(attrs)
        });

        let ndata = g.graph.ndata_mut();
        ndata.set(FEATURES, features)?;
        for name in [AGGREGATE, NORMALIZED, PRE_ACTIVATION, OUTPUT] {
            ndata.remove(name);
        }
        g.graph.update_all(
            &builtin::copy_src(FEATURES, MESSAGE),
            &builtin::sum(MESSAGE, AGGREGATE),
            &transform,
        )?;

        let ndata = g.graph.ndata_mut();
        let output = take(ndata, OUTPUT)?;
        let cache = LayerCache {
            input: input.clone(),
            aggregate: if aggregate_first {
                Some(take(ndata, NORMALIZED)?)
            } else {
                None
            },
            pre_activation: take(ndata, PRE_ACTIVATION)?,
        };
        ndata.remove(AGGREGATE);
        Ok((output, cache))
    }

    /// Backpropagates the gradient of the loss with respect to the output of
    /// the layer.
    ///
    /// Returns the gradients of the parameters and, if `input_grad` is true,
    /// the gradient with respect to the input.
    pub fn backward(
        &self,
        g: &mut GcnGraph,
        cache: &LayerCache,
        grad_output: &Array2<f64>,
        input_grad: bool,
    ) -> Result<(LayerGrads, Option<Array2<f64>>)> {
        ensure!(
            grad_output.dim() == cache.pre_activation.dim(),
            "The gradient has shape {:?}, but the output has shape {:?}",
            grad_output.shape(),
            cache.pre_activation.shape()
        );
        let grad_z = grad_output * &self.activation.derivative(&cache.pre_activation);
        let bias = grad_z.sum_axis(Axis(0)).insert_axis(Axis(0));

        let (weight, grad_input) = match &cache.aggregate {
            Some(aggregate) => {
                let weight = aggregate.t().dot(&grad_z);
                let grad_input = if input_grad {
                    Some(g.aggregate_transposed(&grad_z.dot(&self.weight.t()))?)
                } else {
                    None
                };
                (weight, grad_input)
            }
            None => {
                let back = g.aggregate_transposed(&grad_z)?;
                let weight = cache.input.t().dot(&back);
                let grad_input = input_grad.then(|| back.dot(&self.weight.t()));
                (weight, grad_input)
            }
        };
        Ok((LayerGrads { weight, bias }, grad_input))
    }
}

/// A stack of graph convolutional layers.
///
/// Hidden layers use [ReLU](Activation::Relu); the last layer is
/// [linear](Activation::Identity) and outputs logits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gcn {
    layers: Vec<GcnLayer>,
}

impl Gcn {
    /// Creates a network with the given layer dimensions, from the input
    /// dimension to the number of classes.
    ///
    /// # Panics
    ///
    /// Panics if fewer than two dimensions are given.
    pub fn new(dims: &[usize], seed: u64) -> Self {
        assert!(
            dims.len() >= 2,
            "A GCN needs at least an input and an output dimension, got {dims:?}"
        );
        let mut rng = SmallRng::seed_from_u64(seed);
        let last = dims.len() - 2;
        let layers = dims
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                let activation = if i == last {
                    Activation::Identity
                } else {
                    Activation::Relu
                };
                GcnLayer::new(w[0], w[1], activation, &mut rng)
            })
            .collect();
        Self { layers }
    }

    pub fn layers(&self) -> &[GcnLayer] {
        &self.layers
    }

    /// Returns the number of scalar parameters.
    pub fn num_parameters(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weight.len() + l.bias.len())
            .sum()
    }

    /// Returns mutable references to the parameters, weight and bias of
    /// each layer in turn.
    pub fn parameters_mut(&mut self) -> Vec<&mut Array2<f64>> {
        self.layers
            .iter_mut()
            .flat_map(|l| [&mut l.weight, &mut l.bias])
            .collect()
    }

    /// Computes the logits, returning them together with the caches of the
    /// layers.
    pub fn forward(&self, g: &mut GcnGraph, features: &Array2<f64>) -> Result<(Array2<f64>, Vec<LayerCache>)> {
        let mut caches = Vec::with_capacity(self.layers.len());
        let mut h = features.clone();
        for layer in &self.layers {
            let (output, cache) = layer.forward(g, &h)?;
            caches.push(cache);
            h = output;
        }
        Ok((h, caches))
    }

    /// Backpropagates the gradient of the loss with respect to the logits.
    ///
    /// The result has the same order as [`parameters_mut`](Self::parameters_mut).
    pub fn backward(
        &self,
        g: &mut GcnGraph,
        caches: &[LayerCache],
        grad_logits: &Array2<f64>,
    ) -> Result<Vec<Array2<f64>>> {
        ensure!(
            caches.len() == self.layers.len(),
            "Expected {} layer caches, got {}",
            self.layers.len(),
            caches.len()
        );
        let mut grads = Vec::with_capacity(2 * self.layers.len());
        let mut grad = grad_logits.clone();
        for (i, (layer, cache)) in self.layers.iter().zip(caches).enumerate().rev() {
            let (layer_grads, grad_input) = layer.backward(g, cache, &grad, i > 0)?;
            grads.push(layer_grads.bias);
            grads.push(layer_grads.weight);
            if let Some(grad_input) = grad_input {
                grad = grad_input;
            }
        }
        grads.reverse();
        Ok(grads)
    }
}
