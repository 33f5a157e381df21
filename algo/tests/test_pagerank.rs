/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use mpgraph::prelude::*;
use mpgraph_algo::rank::pagerank::{DEGREE, Mode, PageRank, RANK, Strategy, check_stochastic, preds};
use predicates::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Builds a graph made of a *k*-clique (nodes 0..*k*) and a directed
/// *p*-cycle (nodes *k*..*k* + *p*), with optional bridge arcs between node
/// *k* − 1 and node *k*.
///
/// The bridge type is one of:
/// - `"bi"`:      arcs *k* − 1 → *k* and *k* → *k* − 1
/// - `"back"`:    arc *k* → *k* − 1 only (from the cycle to the clique)
/// - `"forward"`: arc *k* − 1 → *k* only (from the clique to the cycle)
/// - `"none"`:    no bridge
fn clique_cycle(p: usize, k: usize, bridge: &str) -> MessageGraph {
    let mut g = VecGraph::empty(p + k);
    for i in 0..k {
        for j in 0..k {
            if i != j {
                g.add_arc(i, j);
            }
        }
    }
    for i in 0..p {
        g.add_arc(k + i, k + (i + 1) % p);
    }
    match bridge {
        "bi" => {
            g.add_arc(k - 1, k);
            g.add_arc(k, k - 1);
        }
        "back" => {
            g.add_arc(k, k - 1);
        }
        "forward" => {
            g.add_arc(k - 1, k);
        }
        "none" => {}
        _ => panic!("Unknown bridge type: {bridge}"),
    }
    MessageGraph::from(&g)
}

/// Returns the ℓ∞ distance (maximum absolute difference) between two vectors.
fn l_inf_distance(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

fn thresholds() -> impl Iterator<Item = f64> {
    [3, 6, 9].into_iter().map(|e| f64::powi(10.0, -e))
}

#[test]
fn test_empty() -> Result<()> {
    let mut g = MessageGraph::from(&VecGraph::empty(0));
    let mut pr = PageRank::new(&mut g);
    pr.run(preds::L1Norm::try_from(1E-15)?)?;
    assert!(pr.rank().is_empty());
    assert_eq!(pr.iterations(), 0);
    Ok(())
}

#[test]
fn test_no_arcs() -> Result<()> {
    // Every node is dangling
    let mut g = MessageGraph::from(&VecGraph::empty(4));
    let mut pr = PageRank::new(&mut g);
    pr.run(preds::L1Norm::try_from(1E-12)?)?;
    assert!(l_inf_distance(pr.rank(), &[0.25; 4]) < 1E-12);
    Ok(())
}

/// The expected rank values are derived analytically in terms of the rank at
/// node *k* − 1.
#[test]
fn test_clique_bidi_bridge_cycle() -> Result<()> {
    for threshold in thresholds() {
        for &p in &[10, 50] {
            for &k in &[10, 50] {
                let mut g = clique_cycle(p, k, "bi");
                let n = g.num_nodes();

                for &alpha in &[0.25, 0.50, 0.75] {
                    let mut pr = PageRank::new(&mut g);
                    pr.alpha(alpha);
                    pr.run(preds::L1Norm::try_from(threshold / 10.0)?)?;

                    let r = pr.rank()[k - 1] * n as f64;
                    let mut expected = vec![0.0; n];

                    expected[k - 1] = r;
                    let clique_rank = (k - 1) as f64 * (k as f64 - alpha * k as f64 + alpha * r)
                        / (k as f64 * ((k - 1) as f64 - alpha * (k - 2) as f64));
                    expected[..k - 1].fill(clique_rank);
                    expected[k] = 2.0
                        + 2.0 * (alpha * r - k as f64) / (k as f64 * (2.0 - alpha.powi(p as i32)));
                    for d in 1..p {
                        expected[k + d] = 1.0
                            + alpha.powi(d as i32) * (alpha * r - k as f64)
                                / (k as f64 * (2.0 - alpha.powi(p as i32)));
                    }
                    for v in expected.iter_mut() {
                        *v /= n as f64;
                    }

                    assert!(
                        l_inf_distance(&expected, pr.rank()) < threshold,
                        "bidi bridge p={p} k={k} alpha={alpha} threshold={threshold}: L∞={}",
                        l_inf_distance(&expected, pr.rank())
                    );
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_clique_back_bridge_cycle() -> Result<()> {
    for threshold in thresholds() {
        for &p in &[10, 50] {
            for &k in &[10, 50] {
                let mut g = clique_cycle(p, k, "back");
                let n = g.num_nodes();

                for &alpha in &[0.25, 0.50, 0.75] {
                    let mut pr = PageRank::new(&mut g);
                    pr.alpha(alpha).strategy(Strategy::Pull);
                    pr.run(preds::L1Norm::try_from(threshold / 10.0)?)?;

                    let kf = k as f64;
                    let ap = alpha.powi(p as i32);
                    let common = 2.0 * (1.0 - alpha) * (kf - 1.0 + alpha);
                    let mut expected = vec![0.0; n];

                    let clique_rank = (2.0 * (kf - 1.0) - 2.0 * (kf - 2.0) * alpha - alpha * alpha)
                        / common
                        - alpha.powi(p as i32 + 2) / (common * (2.0 - ap));
                    expected[..k - 1].fill(clique_rank);

                    expected[k - 1] = (2.0 * (kf - 1.0) - (kf - 3.0) * alpha - alpha * alpha * kf)
                        / common
                        - alpha.powi(p as i32 + 1) * (kf - 1.0 - alpha * (kf - 2.0))
                            / (common * (2.0 - ap));

                    for d in 0..p {
                        let exp = if d == 0 { p } else { d };
                        expected[k + d] = 1.0 - alpha.powi(exp as i32) / (2.0 - ap);
                    }

                    for v in expected.iter_mut() {
                        *v /= n as f64;
                    }

                    assert!(
                        l_inf_distance(&expected, pr.rank()) < threshold,
                        "back bridge p={p} k={k} alpha={alpha} threshold={threshold}: L∞={}",
                        l_inf_distance(&expected, pr.rank())
                    );
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_clique_forward_bridge_cycle() -> Result<()> {
    for threshold in thresholds() {
        for &p in &[10, 50] {
            for &k in &[10, 50] {
                let mut g = clique_cycle(p, k, "forward");
                let n = g.num_nodes();

                for &alpha in &[0.25, 0.50, 0.75] {
                    let mut pr = PageRank::new(&mut g);
                    pr.alpha(alpha).strategy(Strategy::Builtin);
                    pr.run(preds::L1Norm::try_from(threshold / 10.0)?)?;

                    let kf = k as f64;
                    let denom = (kf - alpha * alpha) * (kf - 1.0) - alpha * kf * (kf - 2.0);
                    let mut expected = vec![0.0; n];

                    let clique_rank = (1.0 - alpha) * (alpha + kf) * (kf - 1.0) / denom;
                    expected[..k - 1].fill(clique_rank);

                    expected[k - 1] = kf * (1.0 - alpha) * (kf - 1.0 + alpha) / denom;

                    for d in 0..p {
                        expected[k + d] = 1.0
                            + (alpha.powi(d as i32 + 1) * (1.0 - alpha) * (kf - 1.0 + alpha))
                                / ((1.0 - alpha.powi(p as i32)) * denom);
                    }

                    for v in expected.iter_mut() {
                        *v /= n as f64;
                    }

                    assert!(
                        l_inf_distance(&expected, pr.rank()) < threshold,
                        "forward bridge p={p} k={k} alpha={alpha} threshold={threshold}: L∞={}",
                        l_inf_distance(&expected, pr.rank())
                    );
                }
            }
        }
    }
    Ok(())
}

/// Without a bridge both components are strongly connected and regular, so
/// the rank is uniform.
#[test]
fn test_clique_no_bridge_cycle() -> Result<()> {
    for &(p, k) in &[(10, 10), (50, 10), (10, 50)] {
        let mut g = clique_cycle(p, k, "none");
        let n = g.num_nodes();
        for &alpha in &[0.25, 0.50, 0.75] {
            let mut pr = PageRank::new(&mut g);
            pr.alpha(alpha).strategy(Strategy::Naive);
            pr.run(preds::L1Norm::try_from(1E-10)?)?;
            assert!(l_inf_distance(&vec![1.0 / n as f64; n], pr.rank()) < 1E-9);
        }
    }
    Ok(())
}

/// Generates a random stochastic vector of length *n*.
fn random_stochastic_vector(n: usize, rng: &mut impl Rng) -> Vec<f64> {
    let mut v: Vec<f64> = (0..n).map(|_| rng.random::<f64>()).collect();
    let sum: f64 = v.iter().sum();
    for x in &mut v {
        *x /= sum;
    }
    v
}

/// Computes PageRank with a plain sequential power method.
fn power_method(
    graph: &VecGraph,
    alpha: f64,
    preference: Option<&[f64]>,
    mode: Mode,
) -> Vec<f64> {
    let n = graph.num_nodes();
    let inv_n = 1.0 / n as f64;
    let v = |i: usize| preference.map_or(inv_n, |v| v[i]);
    let u = |i: usize| match mode {
        Mode::StronglyPreferential => v(i),
        Mode::WeaklyPreferential => inv_n,
        Mode::PseudoRank => 0.0,
    };

    let mut rank: Vec<f64> = (0..n).map(v).collect();
    for _ in 0..10_000 {
        let mut new_rank = vec![0.0; n];
        let mut dangling_rank = 0.0;
        for j in 0..n {
            let d = graph.outdegree(j);
            if d == 0 {
                dangling_rank += rank[j];
            } else {
                for &i in graph.successors(j) {
                    new_rank[i] += rank[j] / d as f64;
                }
            }
        }
        for (i, x) in new_rank.iter_mut().enumerate() {
            *x = (1.0 - alpha) * v(i) + alpha * (*x + dangling_rank * u(i));
        }
        let diff: f64 = rank
            .iter()
            .zip(new_rank.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        rank = new_rank;
        if diff * alpha / (1.0 - alpha) < 1E-14 {
            break;
        }
    }
    rank
}

/// Tests message-passing PageRank against the power method on random
/// Erdős–Rényi digraphs, which have dangling nodes at small densities, in all
/// modes and with uniform and random preference vectors.
#[test]
fn test_erdos_renyi_vs_power_method() -> Result<()> {
    for &(n, arc_p, seed) in &[(10, 0.2, 0_u64), (100, 0.02, 1), (300, 0.005, 2)] {
        let mut rng = SmallRng::seed_from_u64(seed);
        let vg = ErdosRenyi::new(n, arc_p, seed).to_vec_graph();
        let mut g = MessageGraph::from(&vg);
        let pref = random_stochastic_vector(n, &mut rng);

        for &alpha in &[0.25, 0.50, 0.85] {
            for mode in [
                Mode::WeaklyPreferential,
                Mode::StronglyPreferential,
                Mode::PseudoRank,
            ] {
                for preference in [None, Some(pref.as_slice())] {
                    let expected = power_method(&vg, alpha, preference, mode);
                    let mut pr = PageRank::new(&mut g);
                    pr.alpha(alpha).mode(mode).preference(preference);
                    pr.run(preds::L1Norm::try_from(1E-14)?.or(preds::MaxIter::from(10_000)))?;
                    assert!(
                        l_inf_distance(&expected, pr.rank()) < 1E-12,
                        "{mode} n={n} alpha={alpha} custom={}: L∞={}",
                        preference.is_some(),
                        l_inf_distance(&expected, pr.rank())
                    );
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_strategies_agree() -> Result<()> {
    let vg = ErdosRenyi::new(200, 0.02, 42).to_vec_graph();
    let mut results = vec![];
    for strategy in [
        Strategy::Naive,
        Strategy::Pull,
        Strategy::UpdateAll,
        Strategy::Builtin,
    ] {
        let mut g = MessageGraph::from(&vg);
        g.set_granularity(Granularity::Nodes(16));
        let mut pr = PageRank::new(&mut g);
        pr.strategy(strategy);
        pr.run(preds::MaxIter::from(20))?;
        assert_eq!(pr.iterations(), 20);
        results.push(pr.rank().to_vec());
    }
    for r in &results[1..] {
        assert!(l_inf_distance(r, &results[0]) < 1E-15);
    }
    Ok(())
}

#[test]
fn test_stochastic_modes_sum_to_one() -> Result<()> {
    // 0 → 1 → 2, 3 → 0; 2 is dangling
    let vg = VecGraph::from_arcs([(0, 1), (1, 2), (3, 0)]);
    for mode in [Mode::WeaklyPreferential, Mode::StronglyPreferential] {
        let mut g = MessageGraph::from(&vg);
        let mut pr = PageRank::new(&mut g);
        pr.mode(mode);
        pr.run(preds::L1Norm::try_from(1E-12)?)?;
        assert!((pr.rank().iter().sum::<f64>() - 1.0).abs() < 1E-10);
    }

    let mut g = MessageGraph::from(&vg);
    let mut pr = PageRank::new(&mut g);
    pr.mode(Mode::PseudoRank);
    pr.run(preds::L1Norm::try_from(1E-12)?)?;
    assert!(pr.rank().iter().sum::<f64>() < 1.0);
    Ok(())
}

#[test]
fn test_results_in_ndata() -> Result<()> {
    let mut g = MessageGraph::from(&VecGraph::from_arcs([(0, 1), (0, 2), (1, 2), (2, 0)]));
    let rank = {
        let mut pr = PageRank::new(&mut g);
        pr.run(preds::L1Norm::try_from(1E-9)?)?;
        assert!(pr.norm_delta() <= 1E-9);
        pr.rank().to_vec()
    };
    assert_eq!(g.ndata().column(RANK)?, rank);
    assert_eq!(g.ndata().column(DEGREE)?, vec![2.0, 1.0, 1.0]);
    assert!(!g.ndata().contains("pref"));
    Ok(())
}

#[test]
#[should_panic(expected = "damping factor")]
fn test_alpha_out_of_range() {
    let mut g = MessageGraph::from(&VecGraph::empty(2));
    PageRank::new(&mut g).alpha(1.0);
}

#[test]
#[should_panic(expected = "does not match the number of nodes")]
fn test_preference_length() {
    let mut g = MessageGraph::from(&VecGraph::empty(2));
    let pref = [1.0];
    PageRank::new(&mut g).preference(Some(&pref));
}

#[test]
#[should_panic(expected = "negative entry at index 2")]
fn test_preference_negative() {
    let mut g = MessageGraph::from(&VecGraph::empty(3));
    let pref = [1.0, 1.0, -0.5];
    PageRank::new(&mut g).preference(Some(&pref));
}

#[test]
#[should_panic(expected = "is not stochastic")]
fn test_preference_not_normalized() {
    let mut g = MessageGraph::from(&VecGraph::empty(3));
    let pref = [0.5, 0.5, 0.5];
    PageRank::new(&mut g).preference(Some(&pref));
}

#[test]
fn test_check_stochastic() {
    assert!(check_stochastic(&[0.25, 0.75], "preference").is_ok());
    assert!(check_stochastic(&[1.0 + 1E-9], "preference").is_ok());
    assert!(check_stochastic(&[0.5, f64::NAN], "preference").is_err());
    assert!(check_stochastic(&[], "preference").is_err());
}

#[test]
fn test_invalid_threshold() {
    assert!(preds::L1Norm::try_from(0.0).is_err());
    assert!(preds::L1Norm::try_from(f64::NAN).is_err());
    assert!(preds::L1Norm::try_from(None).is_ok());
}
