/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Built-in message and reduce callbacks.
//!
//! Message callbacks: [`copy_src`], [`copy_edge`], [`src_mul_edge`].
//! Reduce callbacks: [`sum`], [`mean`], [`max`], [`min`].
//!
//! Reducers write zeros for nodes that received no messages.

use super::{EdgeBatch, Mailbox, MessageFunction, NodeBatch, ReduceFunction};
use crate::frame::Attrs;
use crate::{Error, Result};
use ndarray::{Array2, Axis};

/// Copies a node attribute of the source into a message.
#[derive(Debug, Clone)]
pub struct CopySrc {
    field: String,
    out: String,
}

/// Returns a [`CopySrc`] message callback.
pub fn copy_src(field: impl Into<String>, out: impl Into<String>) -> CopySrc {
    CopySrc {
        field: field.into(),
        out: out.into(),
    }
}

impl MessageFunction for CopySrc {
    fn message(&self, edges: &EdgeBatch<'_>) -> Result<Attrs> {
        Ok(Attrs::from([(self.out.clone(), edges.src(&self.field)?)]))
    }
}

/// Copies an edge attribute into a message.
#[derive(Debug, Clone)]
pub struct CopyEdge {
    field: String,
    out: String,
}

/// Returns a [`CopyEdge`] message callback.
pub fn copy_edge(field: impl Into<String>, out: impl Into<String>) -> CopyEdge {
    CopyEdge {
        field: field.into(),
        out: out.into(),
    }
}

impl MessageFunction for CopyEdge {
    fn message(&self, edges: &EdgeBatch<'_>) -> Result<Attrs> {
        Ok(Attrs::from([(self.out.clone(), edges.data(&self.field)?)]))
    }
}

/// Multiplies a node attribute of the source by an edge attribute.
///
/// The edge attribute must have either the same width as the node attribute
/// or width one, in which case it acts as a per-edge scalar weight.
#[derive(Debug, Clone)]
pub struct SrcMulEdge {
    field: String,
    edge_field: String,
    out: String,
}

/// Returns a [`SrcMulEdge`] message callback.
pub fn src_mul_edge(
    field: impl Into<String>,
    edge_field: impl Into<String>,
    out: impl Into<String>,
) -> SrcMulEdge {
    SrcMulEdge {
        field: field.into(),
        edge_field: edge_field.into(),
        out: out.into(),
    }
}

impl MessageFunction for SrcMulEdge {
    fn message(&self, edges: &EdgeBatch<'_>) -> Result<Attrs> {
        let src = edges.src(&self.field)?;
        let weight = edges.data(&self.edge_field)?;
        if weight.ncols() != 1 && weight.ncols() != src.ncols() {
            return Err(Error::DimensionMismatch {
                name: self.edge_field.clone(),
                expected: src.ncols(),
                got: weight.ncols(),
            });
        }
        // Broadcasting handles the single-column case
        Ok(Attrs::from([(self.out.clone(), src * &weight)]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Sum,
    Mean,
    Max,
    Min,
}

/// Aggregates a message along the mailbox.
#[derive(Debug, Clone)]
pub struct Reducer {
    op: Op,
    msg: String,
    out: String,
}

fn reducer(op: Op, msg: impl Into<String>, out: impl Into<String>) -> Reducer {
    Reducer {
        op,
        msg: msg.into(),
        out: out.into(),
    }
}

/// Returns a reducer summing messages.
pub fn sum(msg: impl Into<String>, out: impl Into<String>) -> Reducer {
    reducer(Op::Sum, msg, out)
}

/// Returns a reducer averaging messages.
pub fn mean(msg: impl Into<String>, out: impl Into<String>) -> Reducer {
    reducer(Op::Mean, msg, out)
}

/// Returns a reducer computing the elementwise maximum of messages.
pub fn max(msg: impl Into<String>, out: impl Into<String>) -> Reducer {
    reducer(Op::Max, msg, out)
}

/// Returns a reducer computing the elementwise minimum of messages.
pub fn min(msg: impl Into<String>, out: impl Into<String>) -> Reducer {
    reducer(Op::Min, msg, out)
}

impl ReduceFunction for Reducer {
    fn reduce(&self, _nodes: &NodeBatch<'_>, mailbox: &Mailbox<'_>) -> Result<Attrs> {
        let mail = mailbox.get(&self.msg)?;
        let degree = mailbox.degree();
        let reduced: Array2<f64> = if degree == 0 {
            Array2::zeros((mail.len_of(Axis(0)), mail.len_of(Axis(2))))
        } else {
            match self.op {
                Op::Sum => mail.sum_axis(Axis(1)),
                Op::Mean => mail.sum_axis(Axis(1)) / degree as f64,
                Op::Max => mail.fold_axis(Axis(1), f64::NEG_INFINITY, |acc, &x| acc.max(x)),
                Op::Min => mail.fold_axis(Axis(1), f64::INFINITY, |acc, &x| acc.min(x)),
            }
        };
        Ok(Attrs::from([(self.out.clone(), reduced)]))
    }
}
