/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use mpgraph::prelude::*;
use ndarray::{Array2, Axis, array};

/// 0 → 1, 0 → 2, 1 → 2, 2 → 3, 3 → 0; node 4 is isolated.
fn small() -> MessageGraph {
    let mut g = MessageGraph::from_arcs(5, [(0, 1), (0, 2), (1, 2), (2, 3), (3, 0)]).unwrap();
    g.ndata_mut()
        .set_column("x", vec![1.0, 2.0, 4.0, 8.0, 16.0])
        .unwrap();
    g
}

#[test]
fn test_update_all_sum() -> Result<()> {
    let mut g = small();
    g.update_all(&builtin::copy_src("x", "m"), &builtin::sum("m", "y"), &NoApply)?;
    assert_eq!(g.ndata().column("y")?, vec![8.0, 1.0, 3.0, 4.0, 0.0]);
    assert!(!g.has_pending_messages());
    Ok(())
}

#[test]
fn test_builtin_reducers() -> Result<()> {
    let mut g = small();
    g.update_all(&builtin::copy_src("x", "m"), &builtin::mean("m", "y"), &NoApply)?;
    assert_eq!(g.ndata().column("y")?, vec![8.0, 1.0, 1.5, 4.0, 0.0]);
    g.update_all(&builtin::copy_src("x", "m"), &builtin::max("m", "y"), &NoApply)?;
    assert_eq!(g.ndata().column("y")?, vec![8.0, 1.0, 2.0, 4.0, 0.0]);
    g.update_all(&builtin::copy_src("x", "m"), &builtin::min("m", "y"), &NoApply)?;
    assert_eq!(g.ndata().column("y")?, vec![8.0, 1.0, 1.0, 4.0, 0.0]);
    Ok(())
}

#[test]
fn test_edge_weights() -> Result<()> {
    let mut g = small();
    g.edata_mut().set_column("w", vec![1.0, 0.5, 2.0, 1.0, 3.0])?;
    g.update_all(
        &builtin::src_mul_edge("x", "w", "m"),
        &builtin::sum("m", "y"),
        &NoApply,
    )?;
    assert_eq!(g.ndata().column("y")?, vec![24.0, 1.0, 4.5, 4.0, 0.0]);

    g.update_all(&builtin::copy_edge("w", "m"), &builtin::sum("m", "y"), &NoApply)?;
    assert_eq!(g.ndata().column("y")?, vec![3.0, 1.0, 2.5, 1.0, 0.0]);
    Ok(())
}

#[test]
fn test_send_then_recv() -> Result<()> {
    let mut g = small();
    g.send(&[1, 2], &builtin::copy_src("x", "m"))?;
    assert!(g.has_pending_messages());
    // Node 3 has no pending messages and is zero-filled
    g.recv(&[2, 3], &builtin::sum("m", "y"), &NoApply)?;
    assert!(!g.has_pending_messages());
    assert_eq!(g.ndata().column("y")?, vec![0.0, 0.0, 3.0, 0.0, 0.0]);
    Ok(())
}

#[test]
fn test_partial_recv_keeps_other_messages() -> Result<()> {
    let mut g = small();
    g.send(&g.all_edges(), &builtin::copy_src("x", "m"))?;
    g.recv(&[2], &builtin::sum("m", "y"), &NoApply)?;
    assert!(g.has_pending_messages());
    g.recv(&[0], &builtin::sum("m", "y"), &NoApply)?;
    assert_eq!(g.ndata().column("y")?, vec![8.0, 0.0, 3.0, 0.0, 0.0]);
    // Messages delivered to node 2 are gone
    g.recv(&[2], &builtin::sum("m", "y"), &NoApply)?;
    assert_eq!(g.ndata().column("y")?[2], 0.0);
    Ok(())
}

#[test]
fn test_send_overwrites_pending() -> Result<()> {
    let mut g = small();
    g.send(&[4], &builtin::copy_src("x", "m"))?;
    g.ndata_mut().set_column("x", vec![10.0, 20.0, 40.0, 80.0, 160.0])?;
    g.send(&[4], &builtin::copy_src("x", "m"))?;
    g.recv(&[0], &builtin::sum("m", "y"), &NoApply)?;
    assert_eq!(g.ndata().column("y")?[0], 80.0);
    Ok(())
}

#[test]
fn test_send_and_recv() -> Result<()> {
    let mut g = small();
    g.send_and_recv(
        &[0, 2, 2],
        &builtin::copy_src("x", "m"),
        &builtin::sum("m", "y"),
        &NoApply,
    )?;
    assert_eq!(g.ndata().column("y")?, vec![0.0, 1.0, 2.0, 0.0, 0.0]);
    Ok(())
}

#[test]
fn test_pull_and_push() -> Result<()> {
    let mut g = small();
    g.pull(
        &[2, 4],
        &builtin::copy_src("x", "m"),
        &builtin::sum("m", "y"),
        &NoApply,
    )?;
    assert_eq!(g.ndata().column("y")?, vec![0.0, 0.0, 3.0, 0.0, 0.0]);

    let mut g = small();
    g.push(
        &[0],
        &builtin::copy_src("x", "m"),
        &builtin::sum("m", "y"),
        &NoApply,
    )?;
    assert_eq!(g.ndata().column("y")?, vec![0.0, 1.0, 1.0, 0.0, 0.0]);
    Ok(())
}

#[test]
fn test_apply_after_reduce() -> Result<()> {
    let mut g = small();
    let double = apply_node_fn(|nodes| Ok(Attrs::from([("z".to_owned(), nodes.data("y")? * 2.0)])));
    g.update_all(&builtin::copy_src("x", "m"), &builtin::sum("m", "y"), &double)?;
    assert_eq!(g.ndata().column("z")?, vec![16.0, 2.0, 6.0, 8.0, 0.0]);
    Ok(())
}

#[test]
fn test_apply_nodes_and_edges() -> Result<()> {
    let mut g = small();
    g.apply_nodes(
        &apply_node_fn(|nodes| Ok(Attrs::from([("x".to_owned(), nodes.data("x")? + 1.0)]))),
        &[1, 3],
    )?;
    assert_eq!(g.ndata().column("x")?, vec![1.0, 3.0, 4.0, 9.0, 16.0]);

    g.apply_edges(
        &apply_edge_fn(|edges| {
            Ok(Attrs::from([(
                "d".to_owned(),
                edges.dst("x")? - edges.src("x")?,
            )]))
        }),
        &g.all_edges(),
    )?;
    assert_eq!(g.edata().column("d")?, vec![2.0, 3.0, 1.0, 5.0, -8.0]);
    Ok(())
}

#[test]
fn test_vector_messages() -> Result<()> {
    let mut g = MessageGraph::from(&VecGraph::from_arcs([(0, 2), (1, 2), (2, 0)]));
    g.ndata_mut()
        .set("h", array![[1.0, 0.0], [0.0, 1.0], [2.0, 3.0]])?;
    g.update_all(&builtin::copy_src("h", "m"), &builtin::sum("m", "h"), &NoApply)?;
    assert_eq!(
        g.ndata().get("h")?,
        &array![[2.0, 3.0], [0.0, 0.0], [1.0, 1.0]]
    );
    Ok(())
}

#[test]
fn test_mailbox_shape() -> Result<()> {
    let mut g = small();
    let reduce = reduce_fn(|nodes, mailbox| {
        let mail = mailbox.get("m")?;
        assert_eq!(mail.shape(), &[nodes.len(), mailbox.degree(), 1]);
        let degree = Array2::from_elem((nodes.len(), 1), mailbox.degree() as f64);
        Ok(Attrs::from([("k".to_owned(), degree)]))
    });
    g.update_all(&builtin::copy_src("x", "m"), &reduce, &NoApply)?;
    assert_eq!(g.ndata().column("k")?, vec![1.0, 1.0, 2.0, 1.0, 0.0]);
    Ok(())
}

#[test]
fn test_granularity_does_not_change_results() -> Result<()> {
    let vg = ErdosRenyi::new(200, 0.05, 0).to_vec_graph();
    let x: Vec<f64> = (0..200).map(|i| (i % 7) as f64).collect();
    let mut results = vec![];
    for granularity in [
        Granularity::Nodes(1),
        Granularity::Nodes(17),
        Granularity::Messages(50),
        Granularity::default(),
    ] {
        let mut g = MessageGraph::from(&vg);
        g.set_granularity(granularity);
        g.ndata_mut().set_column("x", x.clone())?;
        g.update_all(&builtin::copy_src("x", "m"), &builtin::sum("m", "y"), &NoApply)?;
        results.push(g.ndata().column("y")?);
    }
    for r in &results[1..] {
        assert_eq!(r, &results[0]);
    }
    let expected: f64 = vg.arcs().map(|(u, _)| x[u]).sum();
    assert_eq!(results[0].iter().sum::<f64>(), expected);
    Ok(())
}

#[test]
fn test_errors() {
    let mut g = small();
    assert!(matches!(
        g.send(&[5], &builtin::copy_src("x", "m")),
        Err(Error::InvalidEdge { edge: 5, .. })
    ));
    assert!(matches!(
        g.recv(&[7], &builtin::sum("m", "y"), &NoApply),
        Err(Error::InvalidNode { node: 7, .. })
    ));
    assert!(matches!(
        g.send(&[0], &builtin::copy_src("nope", "m")),
        Err(Error::MissingAttribute(_))
    ));
    assert!(matches!(
        g.recv(&[0], &builtin::sum("m", "y"), &NoApply),
        Err(Error::MissingMessage(_))
    ));
    let bad = message_fn(|_| Ok(Attrs::from([("m".to_owned(), Array2::zeros((7, 1)))])));
    assert!(matches!(
        g.send(&[0, 1], &bad),
        Err(Error::RowCount { expected: 2, got: 7, .. })
    ));
}

#[test]
fn test_send_rejects_different_names() -> Result<()> {
    // Edge 0 is 0 → 2, edge 1 is 1 → 2
    let mut g = MessageGraph::from_arcs(3, [(0, 2), (1, 2)])?;
    g.ndata_mut().set_column("x", vec![7.0, 3.0, 0.0])?;
    g.send(&[0], &builtin::copy_src("x", "a"))?;
    assert!(matches!(
        g.send(&[1], &builtin::copy_src("x", "b")),
        Err(Error::MessageNames { .. })
    ));
    let wide = message_fn(|edges| Ok(Attrs::from([("a".to_owned(), Array2::zeros((edges.len(), 2)))])));
    assert!(matches!(
        g.send(&[1], &wide),
        Err(Error::DimensionMismatch { expected: 1, got: 2, .. })
    ));

    // Only the message on edge 0 is delivered
    g.recv(&[2], &builtin::mean("a", "y"), &NoApply)?;
    assert_eq!(g.ndata().column("y")?, vec![0.0, 0.0, 7.0]);
    assert!(!g.has_pending_messages());

    // With nothing pending, any name can be sent
    g.send(&[1], &builtin::copy_src("x", "b"))?;
    g.recv(&[2], &builtin::max("b", "z"), &NoApply)?;
    assert_eq!(g.ndata().column("z")?, vec![0.0, 0.0, 3.0]);
    Ok(())
}

#[test]
fn test_failed_recv_changes_nothing() -> Result<()> {
    let mut g = small();
    g.send(&g.all_edges(), &builtin::copy_src("x", "m"))?;
    // The width depends on the degree bucket, so buckets disagree
    let reduce = reduce_fn(|nodes, mailbox| {
        Ok(Attrs::from([(
            "y".to_owned(),
            Array2::zeros((nodes.len(), mailbox.degree() + 1)),
        )]))
    });
    assert!(matches!(
        g.recv(&g.all_nodes(), &reduce, &NoApply),
        Err(Error::DimensionMismatch { .. })
    ));
    assert!(!g.ndata().contains("y"));
    assert!(g.has_pending_messages());

    g.recv(&g.all_nodes(), &builtin::sum("m", "y"), &NoApply)?;
    assert_eq!(g.ndata().column("y")?, vec![8.0, 1.0, 3.0, 4.0, 0.0]);
    Ok(())
}

#[test]
fn test_empty_graph() -> Result<()> {
    let mut g = MessageGraph::from(&VecGraph::new());
    g.ndata_mut().set("x", Array2::zeros((0, 1)))?;
    g.update_all(&builtin::copy_src("x", "m"), &builtin::sum("m", "y"), &NoApply)?;
    assert_eq!(g.ndata().get("x")?.len_of(Axis(0)), 0);
    Ok(())
}
