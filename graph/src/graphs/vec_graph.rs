/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/// A mutable directed graph based on a vector of sorted successor lists.
///
/// Arcs can be added in any order; successor lists are kept sorted and
/// duplicate arcs are ignored. This is the structure used to build a graph
/// before freezing it into a [`MessageGraph`](super::MessageGraph), which
/// assigns edge identifiers following the node-then-successor order of this
/// structure.
///
/// By setting the feature `serde`, this struct can be serialized using
/// [serde](https://crates.io/crates/serde).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VecGraph {
    /// The number of arcs in the graph.
    num_arcs: u64,
    /// For each node, its sorted list of successors.
    succ: Vec<Vec<usize>>,
}

impl VecGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new graph with `n` nodes and no arcs.
    pub fn empty(n: usize) -> Self {
        Self {
            num_arcs: 0,
            succ: Vec::from_iter((0..n).map(|_| Vec::new())),
        }
    }

    /// Creates a new graph from a sequence of arcs, adding nodes as needed.
    pub fn from_arcs(arcs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut g = Self::new();
        for (u, v) in arcs {
            g.add_node(u.max(v));
            g.add_arc(u, v);
        }
        g
    }

    /// Returns the number of nodes.
    #[inline(always)]
    pub fn num_nodes(&self) -> usize {
        self.succ.len()
    }

    /// Returns the number of arcs.
    #[inline(always)]
    pub fn num_arcs(&self) -> u64 {
        self.num_arcs
    }

    /// Adds nodes up to `node` included, and returns true if `node` is a new
    /// node.
    pub fn add_node(&mut self, node: usize) -> bool {
        let len = self.succ.len();
        self.succ.extend((len..=node).map(|_| Vec::new()));
        len <= node
    }

    /// Adds an arc to the graph and returns true if it was not already
    /// present.
    ///
    /// # Panics
    ///
    /// This method will panic if one of the given nodes is greater or equal
    /// than the number of nodes in the graph.
    pub fn add_arc(&mut self, u: usize, v: usize) -> bool {
        let max = u.max(v);
        if max >= self.succ.len() {
            panic!(
                "Node {} does not exist (the graph has {} nodes)",
                max,
                self.succ.len(),
            );
        }
        let succ = &mut self.succ[u];
        match succ.binary_search(&v) {
            Ok(_) => false,
            Err(pos) => {
                succ.insert(pos, v);
                self.num_arcs += 1;
                true
            }
        }
    }

    /// Adds arcs from an iterator, adding nodes as needed.
    pub fn add_arcs(&mut self, arcs: impl IntoIterator<Item = (usize, usize)>) -> &mut Self {
        for (u, v) in arcs {
            self.add_node(u.max(v));
            self.add_arc(u, v);
        }
        self
    }

    /// Returns the sorted successors of a node.
    #[inline(always)]
    pub fn successors(&self, node: usize) -> &[usize] {
        &self.succ[node]
    }

    /// Returns the outdegree of a node.
    #[inline(always)]
    pub fn outdegree(&self, node: usize) -> usize {
        self.succ[node].len()
    }

    /// Returns an iterator over all arcs in node-then-successor order.
    pub fn arcs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.succ
            .iter()
            .enumerate()
            .flat_map(|(u, succ)| succ.iter().map(move |&v| (u, v)))
    }

    /// Returns the transpose of this graph.
    pub fn transpose(&self) -> Self {
        let mut t = Self::empty(self.num_nodes());
        // Scanning sources in increasing order produces sorted lists
        for (u, v) in self.arcs() {
            t.succ[v].push(u);
        }
        t.num_arcs = self.num_arcs;
        t
    }

    /// Adds, for each arc, the reversed arc.
    pub fn symmetrize(&mut self) -> &mut Self {
        let reversed = self.transpose();
        for (u, v) in reversed.arcs() {
            self.add_arc(u, v);
        }
        self
    }

    /// Adds a loop on every node that does not have one.
    pub fn add_self_loops(&mut self) -> &mut Self {
        for node in 0..self.num_nodes() {
            self.add_arc(node, node);
        }
        self
    }
}
