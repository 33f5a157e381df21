/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::graphs::VecGraph;
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Erdős–Rényi random digraphs.
///
/// The Erdős–Rényi random graph model is parameterized by the number of
/// nodes `n` and the probability `p` of an arc between any two distinct
/// nodes. Loops are never included.
///
/// Arcs are generated deterministically from the seed of a
/// [pseudorandom number generator](SmallRng), so the same parameters always
/// yield the same graph. The time required to enumerate the arcs is quadratic
/// in `n`: use [`to_vec_graph`](Self::to_vec_graph) if you need the graph more
/// than once.
#[derive(Debug, Clone)]
pub struct ErdosRenyi {
    n: usize,
    p: f64,
    seed: u64,
}

impl ErdosRenyi {
    /// Creates a new Erdős–Rényi random graph, given the number of nodes, the
    /// probability of an arc between any two nodes, and a seed.
    ///
    /// # Panics
    ///
    /// Panics if `p` is not in [0 . . 1].
    pub fn new(n: usize, p: f64, seed: u64) -> Self {
        assert!((0.0..=1.0).contains(&p), "p must be in [0 . . 1], got {p}");
        Self { n, p, seed }
    }

    /// Returns the number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.n
    }

    /// Returns an iterator over the arcs, in node-then-successor order.
    pub fn arcs(&self) -> impl Iterator<Item = (usize, usize)> {
        let (n, p) = (self.n, self.p);
        let mut rng = SmallRng::seed_from_u64(self.seed);
        (0..n).flat_map(move |x| {
            (0..n)
                .filter(|&y| y != x && rng.random_bool(p))
                .map(|y| (x, y))
                .collect::<Vec<_>>()
        })
    }

    /// Materializes the graph.
    pub fn to_vec_graph(&self) -> VecGraph {
        let mut g = VecGraph::empty(self.n);
        for (u, v) in self.arcs() {
            g.add_arc(u, v);
        }
        g
    }
}
