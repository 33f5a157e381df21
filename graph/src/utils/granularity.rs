/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/// Granularity of parallel reduce tasks, specified by nodes or by messages.
///
/// When receiving, nodes are grouped in degree buckets, and each bucket is
/// split into chunks that are reduced in parallel. The size of a chunk can be
/// expressed directly as a number of nodes, or as a tentative number of
/// messages, which is converted into a number of nodes using the average
/// number of messages per receiving node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Each task will be formed by the specified number of nodes.
    Nodes(usize),
    /// Each task will be formed by a number of nodes that receive,
    /// tentatively, the specified number of messages.
    Messages(u64),
}

impl core::default::Default for Granularity {
    /// Returns a default granularity of 1000 nodes.
    fn default() -> Self {
        Self::Nodes(1000)
    }
}

impl Granularity {
    /// Returns a node granularity for a given number of receiving nodes and
    /// messages.
    ///
    /// For the variant [`Nodes`](Self::Nodes), the specified number of nodes is
    /// returned. For the variant [`Messages`](Self::Messages), the number of
    /// nodes is computed as the specified number of messages divided by the
    /// average number of messages per node.
    ///
    /// # Panics
    ///
    /// This method will panic if it needs to make a conversion from message
    /// granularity to node granularity and the number of messages is not
    /// provided.
    pub fn node_granularity(&self, num_nodes: usize, num_messages: Option<u64>) -> usize {
        match self {
            Self::Nodes(n) => *n,
            Self::Messages(n) => {
                let average_degree = num_messages.expect(
                    "You need the number of messages to convert message granularity to node granularity",
                ) as f64
                    / num_nodes.max(1) as f64;
                (*n as f64 / average_degree).min(usize::MAX as f64).ceil() as usize
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_granularity() {
        assert_eq!(Granularity::Nodes(10).node_granularity(100, None), 10);
        assert_eq!(Granularity::Messages(50).node_granularity(100, Some(500)), 10);
        // No messages: a single task
        assert!(Granularity::Messages(50).node_granularity(100, Some(0)) >= 100);
    }
}
