/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(unreachable_code)]
#![deny(unreachable_patterns)]
#![deny(unused_doc_comments)]

pub mod nn;
pub mod rank;

pub mod prelude {
    pub use crate::nn::{Gcn, TrainConfig, Trainer};
    pub use crate::rank::pagerank::{Mode, PageRank, Strategy, preds};
}
