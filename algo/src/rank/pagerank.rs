/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! PageRank by message passing.
//!
//! Each iteration is a round of message passing on a [`MessageGraph`]: the
//! message callback sends along each edge the rank of the source divided by
//! its outdegree, and the reduce callback sums the incoming messages and
//! recombines them with the damping factor.
//!
//! # The formula
//!
//! If we denote with *P* the row-normalized adjacency matrix of the graph
//! (with zero rows for dangling nodes), with **d** the characteristic vector of
//! dangling nodes, with **v** the preference vector, and with α the damping
//! factor, PageRank is the fixed point of
//!
//! > **x** = (1 − α) **v** + α ( **x** *P* + (**x** · **d**) **u** )
//!
//! where **u** is the distribution along which dangling nodes spread their
//! rank. The [`mode`](PageRank::mode) setter selects it:
//!
//! - [`WeaklyPreferential`](Mode::WeaklyPreferential) (the default):
//!   **u** = **1**/*n*;
//! - [`StronglyPreferential`](Mode::StronglyPreferential): **u** = **v**;
//! - [`PseudoRank`](Mode::PseudoRank): **u** = **0**, which is the textbook
//!   update: the rank of dangling nodes is lost, and the result is not
//!   stochastic.
//!
//! We compute the fixed point by power (Jacobi) iteration, starting from the
//! preference vector: the message on an edge *j* → *i* is *xⱼ* / *dⱼ*, and
//! node *i* reduces its mailbox to
//!
//! > *xᵢ* = (1 − α) *vᵢ* + α ( ∑ *m* + *D* *uᵢ* ),
//!
//! where *D* is the rank held by dangling nodes at the start of the
//! iteration.
//!
//! # Strategies
//!
//! The same iteration can be expressed with different propagation operations
//! of [`MessageGraph`]; the [`strategy`](PageRank::strategy) setter selects
//! one. All strategies compute the same values.
//!
//! # Stopping criteria
//!
//! The [`run`](PageRank::run) method accepts a composable [`Predicate`] that
//! is evaluated after each iteration. The predicate receives the current
//! iteration number and a _norm delta_, an upper bound on the ℓ₁ error
//! between the current approximation and the true PageRank vector computed
//! as
//!
//! > α / (1 − α) · ‖**x**⁽ᵗ⁾ − **x**⁽ᵗ⁻¹⁾‖₁.

pub mod preds {
    //! Predicates implementing stopping conditions.
    //!
    //! The predicates evaluate to true when the computation should stop, and
    //! can be combined with the `and` and `or` methods of [`Predicate`].
    //!
    //! # Examples
    //! ```
    //! # fn main() -> anyhow::Result<()> {
    //! use predicates::prelude::*;
    //! use mpgraph_algo::rank::pagerank::preds::{L1Norm, MaxIter};
    //!
    //! let predicate = L1Norm::try_from(1E-6)?.or(MaxIter::from(100));
    //! #     Ok(())
    //! # }
    //! ```

    use anyhow::ensure;
    use predicates::{Predicate, reflection::PredicateReflection};
    use std::fmt::Display;

    #[doc(hidden)]
    /// The state of the computation passed to stopping predicates.
    #[derive(Debug)]
    pub struct PredParams {
        pub iteration: usize,
        pub norm_delta: f64,
    }

    /// Stops after the given number of iterations.
    #[derive(Debug, Clone)]
    pub struct MaxIter {
        max_iter: usize,
    }

    impl MaxIter {
        pub const DEFAULT_MAX_ITER: usize = 1000;
    }

    impl From<usize> for MaxIter {
        fn from(max_iter: usize) -> Self {
            MaxIter { max_iter }
        }
    }

    impl Default for MaxIter {
        fn default() -> Self {
            Self::from(Self::DEFAULT_MAX_ITER)
        }
    }

    impl Display for MaxIter {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "(max iter: {})", self.max_iter)
        }
    }

    impl PredicateReflection for MaxIter {}

    impl Predicate<PredParams> for MaxIter {
        fn eval(&self, params: &PredParams) -> bool {
            params.iteration >= self.max_iter
        }
    }

    /// Stops when the bound α / (1 − α) · ‖*x*(*t*) − *x*(*t* − 1)‖₁ on the ℓ₁
    /// error falls below a threshold.
    #[derive(Debug, Clone)]
    pub struct L1Norm {
        threshold: f64,
    }

    impl L1Norm {
        pub const DEFAULT_THRESHOLD: f64 = 1E-6;
    }

    impl TryFrom<Option<f64>> for L1Norm {
        type Error = anyhow::Error;
        fn try_from(threshold: Option<f64>) -> anyhow::Result<Self> {
            let threshold = threshold.unwrap_or(Self::DEFAULT_THRESHOLD);
            ensure!(!threshold.is_nan(), "The threshold cannot be NaN");
            ensure!(threshold > 0.0, "The threshold must be positive, got {threshold}");
            Ok(L1Norm { threshold })
        }
    }

    impl TryFrom<f64> for L1Norm {
        type Error = anyhow::Error;
        fn try_from(threshold: f64) -> anyhow::Result<Self> {
            Some(threshold).try_into()
        }
    }

    impl Default for L1Norm {
        fn default() -> Self {
            L1Norm {
                threshold: Self::DEFAULT_THRESHOLD,
            }
        }
    }

    impl Display for L1Norm {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "(norm: {})", self.threshold)
        }
    }

    impl PredicateReflection for L1Norm {}

    impl Predicate<PredParams> for L1Norm {
        fn eval(&self, params: &PredParams) -> bool {
            params.norm_delta <= self.threshold
        }
    }
}

/// Selects the distribution of the rank of dangling nodes.
///
/// See the [module-level documentation](self) for the mathematical details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Uses the preference vector (**u** = **v**).
    StronglyPreferential,
    /// Uses the uniform distribution (**u** = **1**/*n*). This is the
    /// default.
    #[default]
    WeaklyPreferential,
    /// Loses the rank of dangling nodes (**u** = **0**).
    PseudoRank,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::StronglyPreferential => f.write_str("strongly preferential"),
            Mode::WeaklyPreferential => f.write_str("weakly preferential"),
            Mode::PseudoRank => f.write_str("pseudorank"),
        }
    }
}

/// Selects the propagation operations used to perform an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// [`send`](MessageGraph::send) on all edges, then
    /// [`recv`](MessageGraph::recv) on all nodes.
    Naive,
    /// [`pull`](MessageGraph::pull) on all nodes.
    Pull,
    /// [`update_all`](MessageGraph::update_all). This is the default.
    #[default]
    UpdateAll,
    /// Built-in callbacks only: the ranks are divided by the outdegrees with
    /// [`apply_nodes`](MessageGraph::apply_nodes), the quotients are
    /// propagated with [`copy_src`](builtin::copy_src) and
    /// [`sum`](builtin::sum), and the damping formula is applied as a node
    /// transform.
    Builtin,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Naive => f.write_str("naive"),
            Strategy::Pull => f.write_str("pull"),
            Strategy::UpdateAll => f.write_str("update all"),
            Strategy::Builtin => f.write_str("builtin"),
        }
    }
}

use anyhow::{Context, Result, ensure};
use dsi_progress_logger::{ProgressLog, no_logging};
use kahan::KahanSum;
use mpgraph::frame::Attrs;
use mpgraph::functions::builtin;
use mpgraph::functions::*;
use mpgraph::graphs::MessageGraph;
use mpgraph::utils::Granularity;
use ndarray::{Array2, Axis, Zip};
use predicates::Predicate;

/// Node attribute holding the rank.
pub const RANK: &str = "pv";
/// Node attribute holding the outdegree.
pub const DEGREE: &str = "deg";
const PREFERENCE: &str = "pref";
const DANGLING: &str = "dangling";
const QUOTIENT: &str = "pv_deg";
const MESSAGE: &str = "m";
const MESSAGE_SUM: &str = "m_sum";

/// Computes PageRank by message passing.
///
/// The struct is configured via setters and then executed via
/// [`run`](Self::run). After completion the rank vector is available via the
/// [`rank`](Self::rank) method, and it is also stored in the node attribute
/// [`RANK`] of the graph; outdegrees are stored in the node attribute
/// [`DEGREE`].
///
/// # Examples
///
/// ```
/// use mpgraph::prelude::*;
/// use mpgraph_algo::rank::pagerank::{Mode, PageRank, Strategy, preds};
///
/// // 0 → 1, 0 → 2, 1 → 2, 2 → 0, 3 → 0, 4 → 3
/// let mut g = MessageGraph::from(&VecGraph::from_arcs([
///     (0, 1), (0, 2), (1, 2), (2, 0), (3, 0), (4, 3),
/// ]));
///
/// let pref = [0.5, 0.2, 0.1, 0.1, 0.1];
/// let mut pr = PageRank::new(&mut g);
/// pr.alpha(0.9)
///     .preference(Some(&pref))
///     .mode(Mode::StronglyPreferential)
///     .strategy(Strategy::Pull);
/// pr.run(preds::L1Norm::try_from(1E-9)?)?;
///
/// assert!(pr.rank()[0] > pr.rank()[1]);
/// assert!((pr.rank().iter().sum::<f64>() - 1.0).abs() < 1E-9);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct PageRank<'a> {
    graph: &'a mut MessageGraph,
    alpha: f64,
    preference: Option<&'a [f64]>,
    mode: Mode,
    strategy: Strategy,
    norm_delta: f64,

    rank: Box<[f64]>,
    iteration: usize,
}

impl std::fmt::Debug for PageRank<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRank")
            .field("alpha", &self.alpha)
            .field("mode", &self.mode)
            .field("strategy", &self.strategy)
            .field("norm_delta", &self.norm_delta)
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}

impl<'a> PageRank<'a> {
    /// Creates a new PageRank computation on the given graph.
    ///
    /// The computation overwrites the node attributes [`RANK`] and
    /// [`DEGREE`], and uses a few other scratch attributes.
    pub fn new(graph: &'a mut MessageGraph) -> Self {
        let n = graph.num_nodes();
        Self {
            graph,
            alpha: 0.85,
            preference: None,
            mode: Mode::default(),
            strategy: Strategy::default(),
            norm_delta: f64::INFINITY,
            rank: vec![0.0; n].into_boxed_slice(),
            iteration: 0,
        }
    }

    /// Sets the damping factor α.
    ///
    /// # Panics
    ///
    /// Panics if `alpha` is not in the interval [0 . . 1).
    pub fn alpha(&mut self, alpha: f64) -> &mut Self {
        assert!(
            (0.0..1.0).contains(&alpha),
            "The damping factor must be in [0 . . 1), got {alpha}"
        );
        self.alpha = alpha;
        self
    }

    /// Sets the preference (personalization) vector.
    ///
    /// Pass `None` to revert to the uniform preference (1/*n*).
    ///
    /// # Panics
    ///
    /// Panics if the length of the vector does not match the number of nodes,
    /// or if the vector is not stochastic (nonnegative entries summing to 1
    /// within a tolerance of 1E-6).
    pub fn preference(&mut self, preference: Option<&'a [f64]>) -> &mut Self {
        if let Some(v) = preference {
            let n = self.graph.num_nodes();
            assert_eq!(
                v.len(),
                n,
                "Preference vector length ({}) does not match the number of nodes ({n})",
                v.len()
            );
            Self::assert_stochastic(v, "preference");
        }
        self.preference = preference;
        self
    }

    /// Sets the PageRank [mode](Mode).
    pub fn mode(&mut self, mode: Mode) -> &mut Self {
        self.mode = mode;
        self
    }

    /// Sets the propagation [strategy](Strategy).
    pub fn strategy(&mut self, strategy: Strategy) -> &mut Self {
        self.strategy = strategy;
        self
    }

    /// Sets the granularity of the parallel reduce tasks of the graph.
    pub fn granularity(&mut self, granularity: Granularity) -> &mut Self {
        self.graph.set_granularity(granularity);
        self
    }

    /// Returns the rank vector.
    pub fn rank(&self) -> &[f64] {
        &self.rank
    }

    /// Returns the number of iterations performed by the last call to
    /// [`run`](Self::run).
    pub fn iterations(&self) -> usize {
        self.iteration
    }

    /// Returns the norm delta after the last iteration.
    pub fn norm_delta(&self) -> f64 {
        self.norm_delta
    }

    /// Runs the PageRank computation until the given predicate is satisfied.
    pub fn run(&mut self, predicate: impl Predicate<preds::PredParams>) -> Result<()> {
        self.run_with_logging(predicate, no_logging![])
    }

    /// Runs the PageRank computation until the given predicate is satisfied,
    /// logging iterations with the given [`ProgressLog`].
    pub fn run_with_logging(
        &mut self,
        predicate: impl Predicate<preds::PredParams>,
        pl: &mut impl ProgressLog,
    ) -> Result<()> {
        let n = self.graph.num_nodes();
        self.iteration = 0;
        self.norm_delta = f64::INFINITY;
        if n == 0 {
            return Ok(());
        }

        log::info!("Mode: {}", self.mode);
        log::info!("Strategy: {}", self.strategy);
        log::info!("Alpha: {}", self.alpha);
        log::info!(
            "Preference: {}",
            if self.preference.is_some() {
                "custom"
            } else {
                "uniform"
            }
        );
        log::info!("Stopping criterion: {}", predicate);

        let inv_n = 1.0 / n as f64;
        let preference = match self.preference {
            Some(v) => v.to_vec(),
            None => vec![inv_n; n],
        };
        let dangling_distribution = match self.mode {
            Mode::StronglyPreferential => preference.clone(),
            Mode::WeaklyPreferential => vec![inv_n; n],
            Mode::PseudoRank => vec![0.0; n],
        };
        let degrees = self.graph.out_degrees();
        let dangling: Vec<usize> = (0..n).filter(|&i| degrees[i] == 0).collect();
        log::info!("{} dangling nodes", dangling.len());

        self.rank.copy_from_slice(&preference);
        let ndata = self.graph.ndata_mut();
        ndata.set_column(RANK, preference.clone())?;
        ndata.set_column(DEGREE, degrees.iter().map(|&d| d as f64).collect())?;
        ndata.set_column(PREFERENCE, preference)?;
        ndata.set_column(DANGLING, dangling_distribution)?;

        pl.item_name("iteration");
        pl.expected_updates(None);
        pl.start(format!("Computing PageRank (alpha={})...", self.alpha));

        loop {
            let mut dangling_rank = KahanSum::<f64>::new();
            for &i in &dangling {
                dangling_rank += self.rank[i];
            }
            self.iterate(dangling_rank.sum())
                .with_context(|| format!("Iteration {} failed", self.iteration + 1))?;

            let new_rank = self.graph.ndata().column(RANK)?;
            let mut norm = KahanSum::<f64>::new();
            for (old, new) in self.rank.iter().zip(&new_rank) {
                norm += (new - old).abs();
            }
            self.rank.copy_from_slice(&new_rank);
            self.norm_delta = norm.sum() * self.alpha / (1.0 - self.alpha);
            self.iteration += 1;

            log::info!(
                "Iteration {}: norm delta = {}",
                self.iteration,
                self.norm_delta
            );
            pl.update_and_display();

            if predicate.eval(&preds::PredParams {
                iteration: self.iteration,
                norm_delta: self.norm_delta,
            }) {
                break;
            }
        }
        pl.done();

        let ndata = self.graph.ndata_mut();
        for scratch in [PREFERENCE, DANGLING, QUOTIENT, MESSAGE_SUM] {
            ndata.remove(scratch);
        }
        Ok(())
    }

    /// Performs one iteration, leaving the new ranks in [`RANK`].
    fn iterate(&mut self, dangling_rank: f64) -> Result<()> {
        let alpha = self.alpha;
        let message = message_fn(|edges| {
            Ok(Attrs::from([(
                MESSAGE.to_owned(),
                edges.src(RANK)? / edges.src(DEGREE)?,
            )]))
        });
        let reduce = reduce_fn(|nodes, mailbox| {
            damp(
                nodes,
                mailbox.get(MESSAGE)?.sum_axis(Axis(1)),
                alpha,
                dangling_rank,
            )
        });

        let g = &mut *self.graph;
        match self.strategy {
            Strategy::Naive => {
                g.send(&g.all_edges(), &message)?;
                g.recv(&g.all_nodes(), &reduce, &NoApply)?;
            }
            Strategy::Pull => g.pull(&g.all_nodes(), &message, &reduce, &NoApply)?,
            Strategy::UpdateAll => g.update_all(&message, &reduce, &NoApply)?,
            Strategy::Builtin => {
                let quotient = apply_node_fn(|nodes| {
                    let rank = nodes.data(RANK)?;
                    let degree = nodes.data(DEGREE)?;
                    let quotient = Zip::from(&rank)
                        .and(&degree)
                        .map_collect(|&r, &d| if d == 0.0 { 0.0 } else { r / d });
                    Ok(Attrs::from([(QUOTIENT.to_owned(), quotient)]))
                });
                g.apply_nodes(&quotient, &g.all_nodes())?;
                g.update_all(
                    &builtin::copy_src(QUOTIENT, MESSAGE),
                    &builtin::sum(MESSAGE, MESSAGE_SUM),
                    &apply_node_fn(|nodes| {
                        damp(nodes, nodes.data(MESSAGE_SUM)?, alpha, dangling_rank)
                    }),
                )?;
            }
        }
        Ok(())
    }
}

impl PageRank<'_> {
    fn assert_stochastic(v: &[f64], name: &str) {
        if let Err(e) = check_stochastic(v, name) {
            panic!("{e}");
        }
    }
}

/// Checks that a vector is stochastic (all entries nonnegative and summing
/// to 1 within a tolerance of 1E-6).
pub fn check_stochastic(v: &[f64], name: &str) -> Result<()> {
    for (i, &x) in v.iter().enumerate() {
        ensure!(
            x >= 0.0,
            "The {name} vector has a negative entry at index {i}: {x}"
        );
    }
    let mut sum = KahanSum::<f64>::new();
    for &x in v {
        sum += x;
    }
    let sum = sum.sum();
    ensure!(
        (sum - 1.0).abs() < 1E-6,
        "The {name} vector is not stochastic (sum = {sum})"
    );
    Ok(())
}

/// Applies the damping formula to the sum of the incoming messages.
fn damp(
    nodes: &NodeBatch<'_>,
    sum: Array2<f64>,
    alpha: f64,
    dangling_rank: f64,
) -> mpgraph::Result<Attrs> {
    let rank = (1.0 - alpha) * nodes.data(PREFERENCE)?
        + alpha * (sum + dangling_rank * nodes.data(DANGLING)?);
    Ok(Attrs::from([(RANK.to_owned(), rank)]))
}
