/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Propagation operations.
//!
//! Messages are computed on edges by a [`MessageFunction`] with
//! [`send`](MessageGraph::send), and they stay in the queue of the graph until
//! the destination receives them with [`recv`](MessageGraph::recv), which
//! aggregates them with a [`ReduceFunction`] and then transforms the
//! receiving nodes with an [`ApplyNodeFunction`].
//!
//! All other operations are combinations of the two:
//!
//! | operation | sends on | receives on |
//! |-----------|----------|-------------|
//! | [`send_and_recv`](MessageGraph::send_and_recv) | the given edges | their destinations |
//! | [`pull`](MessageGraph::pull) | the in-edges of the given nodes | the given nodes |
//! | [`push`](MessageGraph::push) | the out-edges of the given nodes | their destinations |
//! | [`update_all`](MessageGraph::update_all) | all edges | all nodes |
//!
//! # Degree buckets
//!
//! The receiving nodes are grouped by the number of pending messages they
//! have, so that the reduce callback sees a regular (nodes × degree × width)
//! [`Mailbox`]. Buckets are further split in chunks of nodes whose size is
//! given by the [`Granularity`](crate::utils::Granularity) of the graph, and
//! chunks are reduced in parallel using Rayon. Receiving nodes without
//! pending messages form a bucket of degree zero: their mailbox is empty, but
//! the reduce callback is invoked nevertheless.

use super::MessageGraph;
use crate::Result;
use crate::frame::Attrs;
use crate::functions::*;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// A chunk of a degree bucket: the nodes and, for each node, its pending
/// edges.
struct ReduceTask {
    nodes: Vec<usize>,
    edges: Vec<usize>,
    degree: usize,
}

impl MessageGraph {
    /// Computes messages on the given edges and enqueues them.
    ///
    /// The message callback is invoked exactly once, even if `edges` is
    /// empty. A message still pending on an edge is overwritten.
    pub fn send(&mut self, edges: &[usize], message: &impl MessageFunction) -> Result<()> {
        let edges = self.check_edges(edges)?;
        let messages = message.message(&EdgeBatch::new(self, &edges))?;
        check_rows(&messages, edges.len())?;
        log::trace!("Sent {} message(s) on {} edge(s)", messages.len(), edges.len());
        self.queue.enqueue(&edges, &messages)
    }

    /// Delivers pending messages to the given nodes, reduces them, and
    /// applies a transform to the receiving nodes.
    ///
    /// Attributes returned by the reduce callback are written in
    /// [`ndata`](Self::ndata); new attributes are zero-filled on the nodes
    /// that are not receiving. Delivered messages are discarded.
    pub fn recv(
        &mut self,
        nodes: &[usize],
        reduce: &impl ReduceFunction,
        apply: &impl ApplyNodeFunction,
    ) -> Result<()> {
        let nodes = self.check_nodes(nodes)?;

        let mut buckets: BTreeMap<usize, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
        for &node in &nodes {
            let pending: Vec<usize> = self
                .in_edges(node)
                .iter()
                .copied()
                .filter(|&e| self.queue.pending[e])
                .collect();
            let bucket = buckets.entry(pending.len()).or_default();
            bucket.0.push(node);
            bucket.1.extend(pending);
        }

        let num_messages: usize = buckets.values().map(|b| b.1.len()).sum();
        let node_granularity = self
            .granularity
            .node_granularity(nodes.len(), Some(num_messages as u64))
            .max(1);

        let mut tasks = Vec::new();
        for (degree, (bucket_nodes, bucket_edges)) in buckets {
            for (i, chunk) in bucket_nodes.chunks(node_granularity).enumerate() {
                let start = i * node_granularity * degree;
                tasks.push(ReduceTask {
                    nodes: chunk.to_vec(),
                    edges: bucket_edges[start..start + chunk.len() * degree].to_vec(),
                    degree,
                });
            }
        }
        log::debug!(
            "Receiving {} message(s) on {} node(s) in {} task(s)",
            num_messages,
            nodes.len(),
            tasks.len()
        );

        let results = {
            let graph = &*self;
            tasks
                .par_iter()
                .map(|task| {
                    let batch = NodeBatch::new(graph, &task.nodes);
                    let mailbox =
                        Mailbox::new(&graph.queue, &task.edges, task.nodes.len(), task.degree);
                    let attrs = reduce.reduce(&batch, &mailbox)?;
                    check_rows(&attrs, task.nodes.len())?;
                    Ok(attrs)
                })
                .collect::<Result<Vec<Attrs>>>()?
        };

        // On failure, neither the frame nor the queue change
        self.ndata.check_scatter(
            tasks
                .iter()
                .map(|task| task.nodes.as_slice())
                .zip(&results),
        )?;
        for (task, attrs) in tasks.iter().zip(&results) {
            self.ndata.scatter_all(&task.nodes, attrs)?;
        }
        self.queue
            .consume(tasks.iter().flat_map(|task| task.edges.iter().copied()));

        self.apply_nodes(apply, &nodes)
    }

    /// Sends messages on the given edges and receives them on their
    /// destinations.
    pub fn send_and_recv(
        &mut self,
        edges: &[usize],
        message: &impl MessageFunction,
        reduce: &impl ReduceFunction,
        apply: &impl ApplyNodeFunction,
    ) -> Result<()> {
        let edges = self.check_edges(edges)?;
        self.send(&edges, message)?;
        let dst: Vec<usize> = edges.iter().map(|&e| self.dst()[e]).collect();
        self.recv(&dst, reduce, apply)
    }

    /// Sends messages on the in-edges of the given nodes and receives them
    /// on the nodes.
    ///
    /// Nodes without in-edges are reduced with an empty mailbox.
    pub fn pull(
        &mut self,
        nodes: &[usize],
        message: &impl MessageFunction,
        reduce: &impl ReduceFunction,
        apply: &impl ApplyNodeFunction,
    ) -> Result<()> {
        let nodes = self.check_nodes(nodes)?;
        let edges: Vec<usize> = nodes
            .iter()
            .flat_map(|&v| self.in_edges(v).iter().copied())
            .collect();
        self.send(&edges, message)?;
        self.recv(&nodes, reduce, apply)
    }

    /// Sends messages on the out-edges of the given nodes and receives them
    /// on their destinations.
    pub fn push(
        &mut self,
        nodes: &[usize],
        message: &impl MessageFunction,
        reduce: &impl ReduceFunction,
        apply: &impl ApplyNodeFunction,
    ) -> Result<()> {
        let nodes = self.check_nodes(nodes)?;
        let edges: Vec<usize> = nodes
            .iter()
            .flat_map(|&u| self.out_edges(u).iter().copied())
            .collect();
        self.send_and_recv(&edges, message, reduce, apply)
    }

    /// Sends messages on all edges and receives them on all nodes.
    pub fn update_all(
        &mut self,
        message: &impl MessageFunction,
        reduce: &impl ReduceFunction,
        apply: &impl ApplyNodeFunction,
    ) -> Result<()> {
        let edges = self.all_edges();
        self.send(&edges, message)?;
        let nodes = self.all_nodes();
        self.recv(&nodes, reduce, apply)
    }

    /// Applies a transform to the given nodes, writing the results in
    /// [`ndata`](Self::ndata).
    pub fn apply_nodes(&mut self, apply: &impl ApplyNodeFunction, nodes: &[usize]) -> Result<()> {
        let nodes = self.check_nodes(nodes)?;
        let attrs = apply.apply(&NodeBatch::new(self, &nodes))?;
        check_rows(&attrs, nodes.len())?;
        self.ndata.scatter_all(&nodes, &attrs)
    }

    /// Applies a transform to the given edges, writing the results in
    /// [`edata`](Self::edata).
    pub fn apply_edges(&mut self, apply: &impl ApplyEdgeFunction, edges: &[usize]) -> Result<()> {
        let edges = self.check_edges(edges)?;
        let attrs = apply.apply(&EdgeBatch::new(self, &edges))?;
        check_rows(&attrs, edges.len())?;
        self.edata.scatter_all(&edges, &attrs)
    }
}
