/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Graph structures.
//!
//! A [`VecGraph`] is a mutable adjacency-list graph used to build the
//! topology, which is then frozen into a [`MessageGraph`] carrying attributes
//! and supporting the [propagation operations](propagate).

pub mod message_graph;
pub mod propagate;
pub mod random;
pub mod vec_graph;

pub use message_graph::MessageGraph;
pub(crate) use message_graph::MessageQueue;
pub use vec_graph::VecGraph;

pub mod prelude {
    pub use super::MessageGraph;
    pub use super::VecGraph;
    pub use super::random::ErdosRenyi;
}
