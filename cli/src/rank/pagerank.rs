/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::{ArcsArgs, FloatVectorFormat, GlobalArgs, GranularityArgs, NumThreadsArg, get_thread_pool};
use anyhow::{Result, ensure};
use clap::Parser;
use dsi_progress_logger::{ProgressLog, progress_logger};
use mpgraph::prelude::*;
use mpgraph_algo::rank::pagerank::preds::{L1Norm, MaxIter};
use mpgraph_algo::rank::pagerank::{Mode, PageRank, Strategy, check_stochastic};
use predicates::prelude::*;
use std::path::PathBuf;

/// The PageRank mode.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
pub enum CliMode {
    /// Use the preference vector as dangling-node distribution.
    StronglyPreferential,
    /// Use a uniform dangling-node distribution regardless of the preference
    /// vector.
    #[default]
    WeaklyPreferential,
    /// Zero out the dangling-node contribution (pseudorank).
    PseudoRank,
}

impl From<CliMode> for Mode {
    fn from(m: CliMode) -> Self {
        match m {
            CliMode::StronglyPreferential => Mode::StronglyPreferential,
            CliMode::WeaklyPreferential => Mode::WeaklyPreferential,
            CliMode::PseudoRank => Mode::PseudoRank,
        }
    }
}

/// The propagation operations used by each iteration.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
pub enum CliStrategy {
    /// Send on all edges, then receive on all nodes.
    Naive,
    /// Pull on all nodes.
    Pull,
    /// Send and receive in a single pass.
    #[default]
    UpdateAll,
    /// Use only built-in message and reduce functions.
    Builtin,
}

impl From<CliStrategy> for Strategy {
    fn from(s: CliStrategy) -> Self {
        match s {
            CliStrategy::Naive => Strategy::Naive,
            CliStrategy::Pull => Strategy::Pull,
            CliStrategy::UpdateAll => Strategy::UpdateAll,
            CliStrategy::Builtin => Strategy::Builtin,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "pagerank",
    about = "Compute PageRank by message passing (Jacobi iteration).",
    long_about = "Compute PageRank by message passing (Jacobi iteration). The graph is read from a list of arcs (from standard input if no file is given), or generated at random with --er-nodes."
)]
pub struct CliArgs {
    /// A file containing a list of arcs, one per line.
    pub arcs: Option<PathBuf>,

    #[arg(short, long)]
    /// Where to store the rank vector.
    pub output: PathBuf,

    #[arg(long, conflicts_with = "arcs")]
    /// Use an Erdős–Rényi random graph with this number of nodes instead of
    /// reading arcs.
    pub er_nodes: Option<usize>,

    #[arg(long, default_value_t = 0.001, requires = "er_nodes")]
    /// The arc probability of the Erdős–Rényi random graph.
    pub er_prob: f64,

    #[arg(long, default_value_t = 0, requires = "er_nodes")]
    /// The seed of the Erdős–Rényi random graph.
    pub seed: u64,

    #[arg(long)]
    /// The number of nodes; if larger than the number of nodes appearing in
    /// the arcs, isolated nodes are added at the end.
    pub num_nodes: Option<usize>,

    #[arg(short, long, default_value_t = 0.85)]
    /// The damping factor α (must be in the interval [0 . . 1).
    pub alpha: f64,

    #[arg(long)]
    /// Maximum number of iterations.
    pub max_iter: Option<usize>,

    #[arg(short, long, default_value_t = 1e-6)]
    /// The ℓ₁ error threshold to stop.
    pub threshold: f64,

    #[arg(short, long)]
    /// Path to a preference (personalization) vector.
    pub preference: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = FloatVectorFormat::Ascii)]
    /// The input format for the preference vector.
    pub preference_fmt: FloatVectorFormat,

    #[arg(short, long, value_enum, default_value_t = CliMode::WeaklyPreferential)]
    /// The PageRank mode.
    pub mode: CliMode,

    #[arg(short, long, value_enum, default_value_t = CliStrategy::UpdateAll)]
    /// The propagation strategy.
    pub strategy: CliStrategy,

    #[arg(long, value_enum, default_value_t = FloatVectorFormat::Ascii)]
    /// The output format for the rank vector.
    pub fmt: FloatVectorFormat,

    #[arg(long)]
    /// Decimal digits for text output formats.
    pub precision: Option<usize>,

    #[arg(long, default_value_t = 10)]
    /// The number of top-ranked nodes to log.
    pub top: usize,

    #[clap(flatten)]
    pub arcs_args: ArcsArgs,

    #[clap(flatten)]
    pub num_threads: NumThreadsArg,

    #[clap(flatten)]
    pub granularity: GranularityArgs,
}

/// Reads or generates the graph.
fn load_graph(args: &CliArgs, pl: &mut impl ProgressLog) -> Result<ArcList> {
    let mut arc_list = if let Some(n) = args.er_nodes {
        ensure!(
            (0.0..=1.0).contains(&args.er_prob),
            "The arc probability must be in [0 . . 1], got {}",
            args.er_prob
        );
        log::info!(
            "Generating an Erdős–Rényi graph with {} nodes, p = {}, seed = {}",
            n,
            args.er_prob,
            args.seed
        );
        ArcList {
            graph: ErdosRenyi::new(n, args.er_prob, args.seed).to_vec_graph(),
            labels: None,
        }
    } else {
        let format = ArcsFormat::from(&args.arcs_args);
        match &args.arcs {
            Some(path) => {
                log::info!("Reading arcs from {}", path.display());
                load_arcs(path, &format, pl)?
            }
            None => {
                log::info!("Reading arcs from stdin...");
                read_arcs(std::io::stdin().lock(), &format, "stdin", pl)?
            }
        }
    };

    if let Some(num_nodes) = args.num_nodes {
        let graph = &mut arc_list.graph;
        ensure!(
            num_nodes >= graph.num_nodes(),
            "The arcs mention {} nodes, but --num-nodes is {}",
            graph.num_nodes(),
            num_nodes
        );
        if num_nodes > 0 {
            graph.add_node(num_nodes - 1);
        }
    }
    Ok(arc_list)
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    ensure!(
        // Note that 0.0..1.0 is [0.0..1.0) in mathematical notation
        (0.0..1.0).contains(&args.alpha),
        "The damping factor must be in [0 . . 1), got {}",
        args.alpha
    );

    let mut pl = progress_logger![];
    pl.display_memory(true);
    if let Some(log_interval) = global_args.log_interval {
        pl.log_interval(log_interval);
    }

    let thread_pool = get_thread_pool(args.num_threads.num_threads)?;

    let ArcList { graph, labels } = load_graph(&args, &mut pl)?;
    log::info!(
        "The graph has {} nodes and {} arcs",
        graph.num_nodes(),
        graph.num_arcs()
    );
    let mut graph = MessageGraph::from(&graph);

    let preference: Option<Vec<f64>> = args
        .preference
        .as_ref()
        .map(|path| args.preference_fmt.load(path))
        .transpose()?;
    if let Some(preference) = &preference {
        ensure!(
            preference.len() == graph.num_nodes(),
            "The preference vector has {} elements, but the graph has {} nodes",
            preference.len(),
            graph.num_nodes()
        );
        check_stochastic(preference, "preference")?;
    }

    // Build stopping predicate
    let mut predicate = L1Norm::try_from(args.threshold)?.boxed();
    if let Some(max_iter) = args.max_iter {
        predicate = predicate.or(MaxIter::from(max_iter)).boxed();
    }

    let mut pr = PageRank::new(&mut graph);
    pr.alpha(args.alpha)
        .mode(args.mode.into())
        .strategy(args.strategy.into())
        .granularity(args.granularity.into_granularity())
        .preference(preference.as_deref());

    thread_pool.install(|| pr.run_with_logging(predicate, &mut pl))?;

    log::info!(
        "Completed after {} iteration(s), norm delta = {}",
        pr.iterations(),
        pr.norm_delta()
    );

    let rank = pr.rank();
    for (position, node) in top_nodes(rank, args.top).into_iter().enumerate() {
        let name = labels
            .as_ref()
            .map_or_else(|| node.to_string(), |labels| labels[node].clone());
        log::info!("#{}: {} ({})", position + 1, name, rank[node]);
    }

    args.fmt.store(&args.output, rank, args.precision)?;

    Ok(())
}

/// Returns the indices of the `k` largest values, in decreasing order of
/// value (and increasing order of index in case of ties).
fn top_nodes(rank: &[f64], k: usize) -> Vec<usize> {
    let mut nodes: Vec<usize> = (0..rank.len()).collect();
    nodes.sort_by(|&x, &y| rank[y].total_cmp(&rank[x]).then(x.cmp(&y)));
    nodes.truncate(k);
    nodes
}
