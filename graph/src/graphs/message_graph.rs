/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::VecGraph;
use crate::frame::{Attrs, Frame};
use crate::utils::Granularity;
use crate::{Error, Result};
use ndarray::Array2;
use std::collections::BTreeMap;

/// A directed graph with attribute frames and a message queue.
///
/// Edges are identified by integers in `0..num_edges()`. The topology is
/// immutable, and it is stored as the list of endpoints of each edge plus two
/// compressed sparse-row indices, listing for each node the identifiers of
/// its outgoing and incoming edges in increasing order.
///
/// Node attributes live in [`ndata`](Self::ndata), edge attributes in
/// [`edata`](Self::edata). The propagation operations (`send`, `recv`,
/// `update_all` and so on) are documented in the [`propagate`](super::propagate)
/// module.
#[derive(Debug, Clone)]
pub struct MessageGraph {
    src: Box<[usize]>,
    dst: Box<[usize]>,
    out_offsets: Box<[usize]>,
    out_edges: Box<[usize]>,
    in_offsets: Box<[usize]>,
    in_edges: Box<[usize]>,
    pub(crate) ndata: Frame,
    pub(crate) edata: Frame,
    pub(crate) queue: MessageQueue,
    pub(crate) granularity: Granularity,
}

/// Pending messages, one row per edge and one matrix per message name.
#[derive(Debug, Clone, Default)]
pub(crate) struct MessageQueue {
    pub(crate) fields: BTreeMap<String, Array2<f64>>,
    pub(crate) pending: Vec<bool>,
}

impl MessageQueue {
    fn new(num_edges: usize) -> Self {
        Self {
            fields: BTreeMap::new(),
            pending: vec![false; num_edges],
        }
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.pending.iter().any(|&p| p)
    }

    /// Stores the messages produced for the given edges, overwriting any
    /// message still pending on them.
    ///
    /// While messages are pending, new messages must have the same names and
    /// widths as the pending ones; otherwise, an edge could receive a message
    /// it never produced. Nothing is written if the messages are rejected.
    pub(crate) fn enqueue(&mut self, edges: &[usize], messages: &Attrs) -> Result<()> {
        for (name, values) in messages {
            if values.nrows() != edges.len() {
                return Err(Error::RowCount {
                    name: name.clone(),
                    expected: edges.len(),
                    got: values.nrows(),
                });
            }
        }

        if self.has_pending() {
            if !self.fields.keys().eq(messages.keys()) {
                return Err(Error::MessageNames {
                    pending: self.fields.keys().cloned().collect(),
                    got: messages.keys().cloned().collect(),
                });
            }
            for (name, values) in messages {
                let expected = self.fields[name].ncols();
                if values.ncols() != expected {
                    return Err(Error::DimensionMismatch {
                        name: name.clone(),
                        expected,
                        got: values.ncols(),
                    });
                }
            }
        } else {
            self.fields.clear();
        }

        let num_edges = self.pending.len();
        for (name, values) in messages {
            let field = self
                .fields
                .entry(name.clone())
                .or_insert_with(|| Array2::zeros((num_edges, values.ncols())));
            for (&edge, row) in edges.iter().zip(values.rows()) {
                field.row_mut(edge).assign(&row);
            }
        }
        for &edge in edges {
            self.pending[edge] = true;
        }
        Ok(())
    }

    /// Discards the messages on the given edges.
    pub(crate) fn consume(&mut self, edges: impl IntoIterator<Item = usize>) {
        for edge in edges {
            self.pending[edge] = false;
        }
        if !self.has_pending() {
            self.fields.clear();
        }
    }
}

/// Builds a CSR index of edge identifiers grouped by `key`.
fn csr_index(num_nodes: usize, key: &[usize]) -> (Box<[usize]>, Box<[usize]>) {
    let mut offsets = vec![0; num_nodes + 1];
    for &node in key {
        offsets[node + 1] += 1;
    }
    for i in 0..num_nodes {
        offsets[i + 1] += offsets[i];
    }
    let mut cursor = offsets.clone();
    let mut edges = vec![0; key.len()];
    for (edge, &node) in key.iter().enumerate() {
        edges[cursor[node]] = edge;
        cursor[node] += 1;
    }
    (offsets.into_boxed_slice(), edges.into_boxed_slice())
}

impl MessageGraph {
    fn from_endpoints(num_nodes: usize, src: Vec<usize>, dst: Vec<usize>) -> Self {
        let (out_offsets, out_edges) = csr_index(num_nodes, &src);
        let (in_offsets, in_edges) = csr_index(num_nodes, &dst);
        let num_edges = src.len();
        Self {
            src: src.into_boxed_slice(),
            dst: dst.into_boxed_slice(),
            out_offsets,
            out_edges,
            in_offsets,
            in_edges,
            ndata: Frame::new(num_nodes),
            edata: Frame::new(num_edges),
            queue: MessageQueue::new(num_edges),
            granularity: Granularity::default(),
        }
    }

    /// Creates a graph with `num_nodes` nodes from a sequence of arcs.
    ///
    /// Edge identifiers follow the order of the sequence; parallel edges are
    /// allowed.
    pub fn from_arcs(
        num_nodes: usize,
        arcs: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self> {
        let (mut src, mut dst) = (vec![], vec![]);
        for (u, v) in arcs {
            let max = u.max(v);
            if max >= num_nodes {
                return Err(Error::InvalidNode {
                    node: max,
                    num_nodes,
                });
            }
            src.push(u);
            dst.push(v);
        }
        Ok(Self::from_endpoints(num_nodes, src, dst))
    }

    /// Returns the number of nodes.
    #[inline(always)]
    pub fn num_nodes(&self) -> usize {
        self.ndata.num_rows()
    }

    /// Returns the number of edges.
    #[inline(always)]
    pub fn num_edges(&self) -> usize {
        self.src.len()
    }

    /// Returns the source of each edge.
    pub fn src(&self) -> &[usize] {
        &self.src
    }

    /// Returns the destination of each edge.
    pub fn dst(&self) -> &[usize] {
        &self.dst
    }

    /// Returns the identifiers of the edges leaving `node`.
    #[inline(always)]
    pub fn out_edges(&self, node: usize) -> &[usize] {
        &self.out_edges[self.out_offsets[node]..self.out_offsets[node + 1]]
    }

    /// Returns the identifiers of the edges entering `node`.
    #[inline(always)]
    pub fn in_edges(&self, node: usize) -> &[usize] {
        &self.in_edges[self.in_offsets[node]..self.in_offsets[node + 1]]
    }

    #[inline(always)]
    pub fn out_degree(&self, node: usize) -> usize {
        self.out_offsets[node + 1] - self.out_offsets[node]
    }

    #[inline(always)]
    pub fn in_degree(&self, node: usize) -> usize {
        self.in_offsets[node + 1] - self.in_offsets[node]
    }

    pub fn out_degrees(&self) -> Vec<usize> {
        (0..self.num_nodes()).map(|v| self.out_degree(v)).collect()
    }

    pub fn in_degrees(&self) -> Vec<usize> {
        (0..self.num_nodes()).map(|v| self.in_degree(v)).collect()
    }

    /// Returns the successors of `node`, in edge-identifier order.
    pub fn successors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.out_edges(node).iter().map(|&e| self.dst[e])
    }

    /// Returns the predecessors of `node`, in edge-identifier order.
    pub fn predecessors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.in_edges(node).iter().map(|&e| self.src[e])
    }

    /// Returns all node identifiers.
    pub fn all_nodes(&self) -> Vec<usize> {
        (0..self.num_nodes()).collect()
    }

    /// Returns all edge identifiers.
    pub fn all_edges(&self) -> Vec<usize> {
        (0..self.num_edges()).collect()
    }

    /// Returns the node attributes.
    pub fn ndata(&self) -> &Frame {
        &self.ndata
    }

    /// Returns the node attributes mutably.
    pub fn ndata_mut(&mut self) -> &mut Frame {
        &mut self.ndata
    }

    /// Returns the edge attributes.
    pub fn edata(&self) -> &Frame {
        &self.edata
    }

    /// Returns the edge attributes mutably.
    pub fn edata_mut(&mut self) -> &mut Frame {
        &mut self.edata
    }

    /// Sets the granularity used to split degree buckets into parallel
    /// reduce tasks.
    pub fn set_granularity(&mut self, granularity: Granularity) -> &mut Self {
        self.granularity = granularity;
        self
    }

    /// Returns whether some message has been sent but not yet received.
    pub fn has_pending_messages(&self) -> bool {
        self.queue.has_pending()
    }

    /// Returns a graph with the same edge identifiers and reversed edges.
    ///
    /// Attribute frames are cloned; pending messages are not.
    pub fn reverse(&self) -> Self {
        Self {
            src: self.dst.clone(),
            dst: self.src.clone(),
            out_offsets: self.in_offsets.clone(),
            out_edges: self.in_edges.clone(),
            in_offsets: self.out_offsets.clone(),
            in_edges: self.out_edges.clone(),
            ndata: self.ndata.clone(),
            edata: self.edata.clone(),
            queue: MessageQueue::new(self.num_edges()),
            granularity: self.granularity,
        }
    }

    /// Sorts and deduplicates a list of nodes, checking that they exist.
    pub(crate) fn check_nodes(&self, nodes: &[usize]) -> Result<Vec<usize>> {
        let mut nodes = nodes.to_vec();
        nodes.sort_unstable();
        nodes.dedup();
        match nodes.last() {
            Some(&node) if node >= self.num_nodes() => Err(Error::InvalidNode {
                node,
                num_nodes: self.num_nodes(),
            }),
            _ => Ok(nodes),
        }
    }

    /// Sorts and deduplicates a list of edges, checking that they exist.
    pub(crate) fn check_edges(&self, edges: &[usize]) -> Result<Vec<usize>> {
        let mut edges = edges.to_vec();
        edges.sort_unstable();
        edges.dedup();
        match edges.last() {
            Some(&edge) if edge >= self.num_edges() => Err(Error::InvalidEdge {
                edge,
                num_edges: self.num_edges(),
            }),
            _ => Ok(edges),
        }
    }
}

impl From<&VecGraph> for MessageGraph {
    /// Freezes a [`VecGraph`], numbering edges in node-then-successor order.
    fn from(g: &VecGraph) -> Self {
        let (src, dst): (Vec<usize>, Vec<usize>) = g.arcs().unzip();
        Self::from_endpoints(g.num_nodes(), src, dst)
    }
}
