/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Callbacks run by the propagation operations, and the batch views they
//! receive.
//!
//! There are four kinds of callbacks:
//!
//! - a [`MessageFunction`] receives an [`EdgeBatch`] and returns, for each
//!   named message, a matrix with one row per edge;
//! - a [`ReduceFunction`] receives a [`NodeBatch`] and a [`Mailbox`]
//!   containing the messages delivered to each node of the batch, and returns
//!   new node attributes, one row per node;
//! - an [`ApplyNodeFunction`] receives a [`NodeBatch`] and returns new node
//!   attributes;
//! - an [`ApplyEdgeFunction`] receives an [`EdgeBatch`] and returns new edge
//!   attributes.
//!
//! Closures can be turned into callbacks using [`message_fn`], [`reduce_fn`],
//! [`apply_node_fn`], and [`apply_edge_fn`]. Common callbacks are available
//! in the [`builtin`] module.
//!
//! # Examples
//!
//! The message and reduce callbacks of PageRank:
//!
//! ```
//! use mpgraph::prelude::*;
//!
//! const ALPHA: f64 = 0.85;
//!
//! let message = message_fn(|edges| {
//!     Ok(Attrs::from([(
//!         "m".to_owned(),
//!         edges.src("pv")? / edges.src("deg")?,
//!     )]))
//! });
//! let reduce = reduce_fn(|nodes, mailbox| {
//!     let n = nodes.num_nodes() as f64;
//!     let sum = mailbox.get("m")?.sum_axis(ndarray::Axis(1));
//!     Ok(Attrs::from([("pv".to_owned(), (1.0 - ALPHA) / n + ALPHA * sum)]))
//! });
//!
//! let mut g = MessageGraph::from(&VecGraph::from_arcs([(0, 1), (1, 0)]));
//! g.ndata_mut().set_column("pv", vec![0.5, 0.5])?;
//! g.ndata_mut().set_column("deg", vec![1.0, 1.0])?;
//! g.update_all(&message, &reduce, &NoApply)?;
//! assert!(g.ndata().column("pv")?.iter().all(|x| (x - 0.5).abs() < 1E-12));
//! # Ok::<(), mpgraph::Error>(())
//! ```

pub mod builtin;

use crate::frame::Attrs;
use crate::graphs::MessageGraph;
use crate::graphs::MessageQueue;
use crate::{Error, Result};
use ndarray::{Array2, Array3, Axis};

/// A batch of edges, as seen by message and edge-apply callbacks.
#[derive(Debug)]
pub struct EdgeBatch<'a> {
    graph: &'a MessageGraph,
    edges: &'a [usize],
    src: Vec<usize>,
    dst: Vec<usize>,
}

impl<'a> EdgeBatch<'a> {
    pub(crate) fn new(graph: &'a MessageGraph, edges: &'a [usize]) -> Self {
        let src = edges.iter().map(|&e| graph.src()[e]).collect();
        let dst = edges.iter().map(|&e| graph.dst()[e]).collect();
        Self {
            graph,
            edges,
            src,
            dst,
        }
    }

    /// Returns the number of edges in the batch.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Returns the number of nodes of the whole graph.
    pub fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }

    /// Returns the edge identifiers.
    pub fn edge_ids(&self) -> &[usize] {
        self.edges
    }

    /// Returns the sources of the edges.
    pub fn src_ids(&self) -> &[usize] {
        &self.src
    }

    /// Returns the destinations of the edges.
    pub fn dst_ids(&self) -> &[usize] {
        &self.dst
    }

    /// Returns a node attribute of the sources, one row per edge.
    pub fn src(&self, name: &str) -> Result<Array2<f64>> {
        self.graph.ndata().select(name, &self.src)
    }

    /// Returns a node attribute of the destinations, one row per edge.
    pub fn dst(&self, name: &str) -> Result<Array2<f64>> {
        self.graph.ndata().select(name, &self.dst)
    }

    /// Returns an edge attribute, one row per edge.
    pub fn data(&self, name: &str) -> Result<Array2<f64>> {
        self.graph.edata().select(name, self.edges)
    }
}

/// A batch of nodes, as seen by reduce and node-apply callbacks.
#[derive(Debug)]
pub struct NodeBatch<'a> {
    graph: &'a MessageGraph,
    nodes: &'a [usize],
}

impl<'a> NodeBatch<'a> {
    pub(crate) fn new(graph: &'a MessageGraph, nodes: &'a [usize]) -> Self {
        Self { graph, nodes }
    }

    /// Returns the number of nodes in the batch.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of nodes of the whole graph.
    pub fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }

    /// Returns the node identifiers.
    pub fn node_ids(&self) -> &[usize] {
        self.nodes
    }

    /// Returns a node attribute, one row per node.
    pub fn data(&self, name: &str) -> Result<Array2<f64>> {
        self.graph.ndata().select(name, self.nodes)
    }
}

/// The messages delivered to a batch of nodes with the same number of
/// incoming messages.
#[derive(Debug)]
pub struct Mailbox<'a> {
    queue: &'a MessageQueue,
    /// For each node, `degree` edges in increasing order.
    edges: &'a [usize],
    len: usize,
    degree: usize,
}

impl<'a> Mailbox<'a> {
    pub(crate) fn new(queue: &'a MessageQueue, edges: &'a [usize], len: usize, degree: usize) -> Self {
        debug_assert_eq!(edges.len(), len * degree);
        Self {
            queue,
            edges,
            len,
            degree,
        }
    }

    /// Returns the number of messages delivered to each node.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Returns the messages with the given name as a tensor of shape
    /// (nodes × degree × width).
    ///
    /// If the degree is zero, the result is empty, but it has the right
    /// width, so that reductions over the second axis yield zeros.
    pub fn get(&self, name: &str) -> Result<Array3<f64>> {
        let field = self
            .queue
            .fields
            .get(name)
            .ok_or_else(|| Error::MissingMessage(name.to_owned()))?;
        let mut mail = Array3::zeros((self.len, self.degree, field.ncols()));
        if self.degree == 0 {
            return Ok(mail);
        }
        for (mut node_mail, edges) in mail
            .axis_iter_mut(Axis(0))
            .zip(self.edges.chunks(self.degree))
        {
            for (mut slot, &edge) in node_mail.axis_iter_mut(Axis(0)).zip(edges) {
                slot.assign(&field.row(edge));
            }
        }
        Ok(mail)
    }
}

/// A callback computing messages on edges.
pub trait MessageFunction: Sync {
    fn message(&self, edges: &EdgeBatch<'_>) -> Result<Attrs>;
}

/// A callback aggregating the messages delivered to nodes.
pub trait ReduceFunction: Sync {
    fn reduce(&self, nodes: &NodeBatch<'_>, mailbox: &Mailbox<'_>) -> Result<Attrs>;
}

/// A callback computing new node attributes.
pub trait ApplyNodeFunction: Sync {
    fn apply(&self, nodes: &NodeBatch<'_>) -> Result<Attrs>;
}

/// A callback computing new edge attributes.
pub trait ApplyEdgeFunction: Sync {
    fn apply(&self, edges: &EdgeBatch<'_>) -> Result<Attrs>;
}

/// A node-apply callback that does nothing.
///
/// Pass it to [`recv`](MessageGraph::recv) and the other receiving
/// operations when no per-node transform is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoApply;

impl ApplyNodeFunction for NoApply {
    fn apply(&self, _nodes: &NodeBatch<'_>) -> Result<Attrs> {
        Ok(Attrs::new())
    }
}

/// A [`MessageFunction`] wrapping a closure; see [`message_fn`].
#[derive(Debug, Clone, Copy)]
pub struct MessageFn<F>(F);

/// Turns a closure into a [`MessageFunction`].
pub fn message_fn<F>(f: F) -> MessageFn<F>
where
    F: Fn(&EdgeBatch<'_>) -> Result<Attrs> + Sync,
{
    MessageFn(f)
}

impl<F> MessageFunction for MessageFn<F>
where
    F: Fn(&EdgeBatch<'_>) -> Result<Attrs> + Sync,
{
    fn message(&self, edges: &EdgeBatch<'_>) -> Result<Attrs> {
        (self.0)(edges)
    }
}

/// A [`ReduceFunction`] wrapping a closure; see [`reduce_fn`].
#[derive(Debug, Clone, Copy)]
pub struct ReduceFn<F>(F);

/// Turns a closure into a [`ReduceFunction`].
pub fn reduce_fn<F>(f: F) -> ReduceFn<F>
where
    F: Fn(&NodeBatch<'_>, &Mailbox<'_>) -> Result<Attrs> + Sync,
{
    ReduceFn(f)
}

impl<F> ReduceFunction for ReduceFn<F>
where
    F: Fn(&NodeBatch<'_>, &Mailbox<'_>) -> Result<Attrs> + Sync,
{
    fn reduce(&self, nodes: &NodeBatch<'_>, mailbox: &Mailbox<'_>) -> Result<Attrs> {
        (self.0)(nodes, mailbox)
    }
}

/// An [`ApplyNodeFunction`] wrapping a closure; see [`apply_node_fn`].
#[derive(Debug, Clone, Copy)]
pub struct ApplyNodeFn<F>(F);

/// Turns a closure into an [`ApplyNodeFunction`].
pub fn apply_node_fn<F>(f: F) -> ApplyNodeFn<F>
where
    F: Fn(&NodeBatch<'_>) -> Result<Attrs> + Sync,
{
    ApplyNodeFn(f)
}

impl<F> ApplyNodeFunction for ApplyNodeFn<F>
where
    F: Fn(&NodeBatch<'_>) -> Result<Attrs> + Sync,
{
    fn apply(&self, nodes: &NodeBatch<'_>) -> Result<Attrs> {
        (self.0)(nodes)
    }
}

/// An [`ApplyEdgeFunction`] wrapping a closure; see [`apply_edge_fn`].
#[derive(Debug, Clone, Copy)]
pub struct ApplyEdgeFn<F>(F);

/// Turns a closure into an [`ApplyEdgeFunction`].
pub fn apply_edge_fn<F>(f: F) -> ApplyEdgeFn<F>
where
    F: Fn(&EdgeBatch<'_>) -> Result<Attrs> + Sync,
{
    ApplyEdgeFn(f)
}

impl<F> ApplyEdgeFunction for ApplyEdgeFn<F>
where
    F: Fn(&EdgeBatch<'_>) -> Result<Attrs> + Sync,
{
    fn apply(&self, edges: &EdgeBatch<'_>) -> Result<Attrs> {
        (self.0)(edges)
    }
}

/// Checks that every matrix returned by a callback has `expected` rows.
pub(crate) fn check_rows(attrs: &Attrs, expected: usize) -> Result<()> {
    for (name, values) in attrs {
        if values.nrows() != expected {
            return Err(Error::RowCount {
                name: name.clone(),
                expected,
                got: values.nrows(),
            });
        }
    }
    Ok(())
}
