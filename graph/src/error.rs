/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Errors raised by frames, propagation, and loaders.

use std::path::PathBuf;

/// The error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Node {node} does not exist (the graph has {num_nodes} nodes)")]
    InvalidNode { node: usize, num_nodes: usize },
    #[error("Edge {edge} does not exist (the graph has {num_edges} edges)")]
    InvalidEdge { edge: usize, num_edges: usize },
    #[error("No attribute named {0:?}")]
    MissingAttribute(String),
    #[error("No pending message named {0:?}")]
    MissingMessage(String),
    #[error("Messages named {pending:?} are pending, but the new messages are named {got:?}")]
    MessageNames {
        pending: Vec<String>,
        got: Vec<String>,
    },
    #[error("Attribute {name:?} has {got} rows, but the frame has {expected} rows")]
    ShapeMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("Attribute {name:?} has width {expected}, but the new values have width {got}")]
    DimensionMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("Callback returned {got} rows for {name:?}, but the batch has {expected} items")]
    RowCount {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("Parse error at line {line} of {path}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A result with the crate [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
