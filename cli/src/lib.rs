/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_pub)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]
#![allow(clippy::type_complexity)]

use anyhow::{Context, Result, anyhow, bail, ensure};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mpgraph::utils::{ArcsFormat, Granularity};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;
use std::time::SystemTime;

pub mod build_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));

    pub const BUILD_DATE: &str = env!("BUILD_DATE");

    pub fn version_string() -> String {
        format!(
            "{}
git info: {} {} {}
build info: built on {} for {} with {}",
            PKG_VERSION,
            GIT_VERSION.unwrap_or(""),
            GIT_COMMIT_HASH.unwrap_or(""),
            match GIT_DIRTY {
                None => "",
                Some(true) => "(dirty)",
                Some(false) => "(clean)",
            },
            BUILD_DATE,
            TARGET,
            RUSTC_VERSION
        )
    }
}

#[derive(Args, Debug)]
/// Shared CLI arguments for reading files containing arcs.
pub struct ArcsArgs {
    #[arg(long, default_value_t = '#')]
    /// Ignore lines that start with this symbol.
    pub line_comment_symbol: char,

    #[arg(long, default_value_t = 0)]
    /// How many lines to skip, ignoring comment lines.
    pub lines_to_skip: usize,

    #[arg(long)]
    /// How many arcs to parse, after skipping the first lines_to_skip and
    /// ignoring comment lines.
    pub max_arcs: Option<usize>,

    #[arg(long, default_value_t = '\t')]
    /// The column separator; if it is a space, any run of whitespace
    /// separates columns.
    pub separator: char,

    #[arg(long, default_value_t = 0)]
    /// The index of the column containing the source node of an arc.
    pub source_column: usize,

    #[arg(long, default_value_t = 1)]
    /// The index of the column containing the target node of an arc.
    pub target_column: usize,

    #[arg(long, default_value_t = false)]
    /// Sources and destinations are not node identifiers starting from 0, but labels.
    pub labels: bool,
}

impl From<&ArcsArgs> for ArcsFormat {
    fn from(args: &ArcsArgs) -> Self {
        ArcsFormat {
            comment: args.line_comment_symbol,
            lines_to_skip: args.lines_to_skip,
            max_arcs: args.max_arcs,
            separator: args.separator,
            source_column: args.source_column,
            target_column: args.target_column,
            labels: args.labels,
        }
    }
}

/// Parses the number of threads from a string.
///
/// This function is meant to be used with `#[arg(...,  value_parser =
/// num_threads_parser)]`.
pub fn num_threads_parser(arg: &str) -> Result<usize> {
    let num_threads = arg.parse::<usize>()?;
    ensure!(num_threads > 0, "Number of threads must be greater than 0");
    Ok(num_threads)
}

/// Shared CLI arguments for commands that specify a number of threads.
#[derive(Args, Debug)]
pub struct NumThreadsArg {
    #[arg(short = 'j', long, default_value_t = rayon::current_num_threads().max(1), value_parser = num_threads_parser)]
    /// The number of threads to use.
    pub num_threads: usize,
}

/// Shared CLI arguments for commands that specify a granularity.
#[derive(Args, Debug)]
pub struct GranularityArgs {
    #[arg(long, conflicts_with("node_granularity"))]
    /// The tentative number of messages reduced by a parallel job
    /// (advanced option).
    pub message_granularity: Option<u64>,

    #[arg(long, conflicts_with("message_granularity"))]
    /// The number of receiving nodes reduced by a parallel job (advanced
    /// option).
    pub node_granularity: Option<usize>,
}

impl GranularityArgs {
    pub fn into_granularity(&self) -> Granularity {
        match (self.message_granularity, self.node_granularity) {
            (Some(_), Some(_)) => unreachable!(),
            (Some(message_granularity), None) => Granularity::Messages(message_granularity),
            (None, Some(node_granularity)) => Granularity::Nodes(node_granularity),
            (None, None) => Granularity::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
/// Formats for storing and loading vectors of floats.
pub enum FloatVectorFormat {
    /// Java-compatible format: a sequence of big-endian doubles.
    Java,
    /// ASCII format, one float per line.
    Ascii,
    /// A JSON Array.
    Json,
}

impl FloatVectorFormat {
    /// Stores float values in the specified `path` using the format defined by
    /// `self`.
    ///
    /// If the result is a textual format, that is, ASCII or JSON, `precision`
    /// will be used to truncate the float values to the specified number of
    /// decimal digits. If `None`, the shortest representation that reads back
    /// to the same value is used.
    pub fn store(
        &self,
        path: impl AsRef<Path>,
        values: &[f64],
        precision: Option<usize>,
    ) -> Result<()> {
        create_parent_dir(&path)?;
        let path_display = path.as_ref().display();
        let file = std::fs::File::create(&path)
            .with_context(|| format!("Could not create vector at {}", path_display))?;
        let mut file = BufWriter::new(file);
        let fmt = |value: f64| match precision {
            None => format!("{value}"),
            Some(precision) => format!("{value:.precision$}"),
        };

        match self {
            FloatVectorFormat::Java => {
                log::info!("Storing in Java format at {}", path_display);
                for value in values {
                    file.write_all(&value.to_be_bytes())
                        .with_context(|| format!("Could not write vector to {}", path_display))?;
                }
            }
            FloatVectorFormat::Ascii => {
                log::info!("Storing in ASCII format at {}", path_display);
                for &value in values {
                    writeln!(file, "{}", fmt(value))
                        .with_context(|| format!("Could not write vector to {}", path_display))?;
                }
            }
            FloatVectorFormat::Json => {
                log::info!("Storing in JSON format at {}", path_display);
                let items: Vec<String> = values.iter().map(|&value| fmt(value)).collect();
                write!(file, "[{}]", items.join(", "))
                    .with_context(|| format!("Could not write vector to {}", path_display))?;
            }
        }
        file.flush()
            .with_context(|| format!("Could not write vector to {}", path_display))?;
        Ok(())
    }

    /// Loads float values from the specified `path` using the format defined
    /// by `self`.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Vec<f64>> {
        let path = path.as_ref();
        let path_display = path.display();
        let file =
            std::fs::File::open(path).with_context(|| format!("Could not open {}", path_display))?;

        match self {
            FloatVectorFormat::Java => {
                log::info!("Loading Java format from {}", path_display);
                let file_len = file.metadata()?.len() as usize;
                let byte_size = size_of::<f64>();
                ensure!(
                    file_len % byte_size == 0,
                    "File size ({}) is not a multiple of {} bytes",
                    file_len,
                    byte_size
                );
                let mut reader = BufReader::new(file);
                let mut result = Vec::with_capacity(file_len / byte_size);
                let mut buf = [0u8; 8];
                for i in 0..file_len / byte_size {
                    reader.read_exact(&mut buf).with_context(|| {
                        format!("Could not read value at index {i} from {}", path_display)
                    })?;
                    result.push(f64::from_be_bytes(buf));
                }
                Ok(result)
            }
            FloatVectorFormat::Ascii => {
                log::info!("Loading ASCII format from {}", path_display);
                BufReader::new(file)
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
                    .map(|(i, line)| {
                        let line = line.with_context(|| {
                            format!("Error reading line {} of {}", i + 1, path_display)
                        })?;
                        line.trim().parse::<f64>().map_err(|e| {
                            anyhow!("Error parsing line {} of {}: {}", i + 1, path_display, e)
                        })
                    })
                    .collect()
            }
            FloatVectorFormat::Json => {
                log::info!("Loading JSON format from {}", path_display);
                serde_json::from_reader(BufReader::new(file))
                    .with_context(|| format!("Could not parse a JSON array from {}", path_display))
            }
        }
    }
}

/// Creates a [`ThreadPool`](rayon::ThreadPool) with the given number of threads.
pub fn get_thread_pool(num_threads: usize) -> Result<rayon::ThreadPool> {
    let thread_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .context("Failed to create thread pool")?;
    log::info!("Using {} threads", thread_pool.current_num_threads());
    Ok(thread_pool)
}

/// Creates all parent directories of the given file path.
pub fn create_parent_dir(file_path: impl AsRef<Path>) -> Result<()> {
    if let Some(parent_dir) = file_path.as_ref().parent() {
        std::fs::create_dir_all(parent_dir).with_context(|| {
            format!(
                "Failed to create the directory {:?}",
                parent_dir.to_string_lossy()
            )
        })?;
    }
    Ok(())
}

/// Creates a buffered writer on a new file, creating parent directories as
/// needed.
pub fn create_file(path: impl AsRef<Path>) -> Result<BufWriter<std::fs::File>> {
    create_parent_dir(&path)?;
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Could not create {}", path.as_ref().display()))?;
    Ok(BufWriter::new(file))
}

/// Parses a duration from a string.
///
/// If no suffix is given, the value is assumed to be in milliseconds. The
/// available suffixes are:
/// - `s` for seconds
/// - `m` for minutes
/// - `h` for hours
/// - `d` for days
///
/// Example: `1d2h3m4s567` this is parsed as: 1 day, 2 hours, 3 minutes, 4 seconds, and 567 milliseconds.
fn parse_duration(value: &str) -> Result<Duration> {
    if value.is_empty() {
        bail!("Empty duration string, if you want every 0 milliseconds use `0`.");
    }
    let mut duration = Duration::from_secs(0);
    let mut acc = String::new();
    for c in value.chars() {
        if c.is_ascii_digit() {
            acc.push(c);
        } else if c.is_whitespace() {
            continue;
        } else {
            let dur = acc.parse::<u64>()?;
            match c {
                's' => duration += Duration::from_secs(dur),
                'm' => duration += Duration::from_secs(dur * 60),
                'h' => duration += Duration::from_secs(dur * 60 * 60),
                'd' => duration += Duration::from_secs(dur * 60 * 60 * 24),
                _ => return Err(anyhow!("Invalid duration suffix: {}", c)),
            }
            acc.clear();
        }
    }
    if !acc.is_empty() {
        let dur = acc.parse::<u64>()?;
        duration += Duration::from_millis(dur);
    }
    Ok(duration)
}

/// Initializes the `env_logger` logger with a custom format including
/// timestamps with elapsed time since initialization.
pub fn init_env_logger() -> Result<()> {
    use jiff::SpanRound;
    use jiff::fmt::friendly::{Designator, Spacing, SpanPrinter};

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    let start = std::time::Instant::now();
    let printer = SpanPrinter::new()
        .spacing(Spacing::None)
        .designator(Designator::Compact);
    let span_round = SpanRound::new()
        .largest(jiff::Unit::Day)
        .smallest(jiff::Unit::Millisecond)
        .days_are_24_hours();

    builder.format(move |buf, record| {
        let Ok(ts) = jiff::Timestamp::try_from(SystemTime::now()) else {
            return Err(std::io::Error::other("Failed to get timestamp"));
        };
        let style = buf.default_level_style(record.level());
        let elapsed = start.elapsed();
        let span = jiff::Span::new()
            .seconds(elapsed.as_secs() as i64)
            .milliseconds(elapsed.subsec_millis() as i64)
            .round(span_round)
            .map_err(std::io::Error::other)?;
        writeln!(
            buf,
            "{} {} {style}{}{style:#} [{:?}] {} - {}",
            ts.strftime("%F %T%.3f"),
            printer.span_to_string(&span),
            record.level(),
            std::thread::current().id(),
            record.target(),
            record.args()
        )
    });
    builder.try_init()?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    #[arg(long, value_parser = parse_duration, global=true, display_order = 1000)]
    /// How often to log progress. Default is 10s. You can use the suffixes "s"
    /// for seconds, "m" for minutes, "h" for hours, and "d" for days. If no
    /// suffix is provided it is assumed to be in milliseconds.
    /// Example: "1d2h3m4s567" is parsed as 1 day + 2 hours + 3 minutes + 4
    /// seconds + 567 milliseconds = 93784567 milliseconds.
    pub log_interval: Option<Duration>,
}

#[derive(Subcommand, Debug)]
pub enum SubCommands {
    #[command(subcommand)]
    Rank(rank::SubCommands),
    #[command(subcommand)]
    Nn(nn::SubCommands),
}

#[derive(Parser, Debug)]
#[command(name = "mpgraph", version=build_info::version_string())]
/// Message-passing graph tools: PageRank and Graph Convolutional Networks.
#[doc = include_str!("common_env.txt")]
pub struct Cli {
    #[command(subcommand)]
    pub command: SubCommands,
    #[clap(flatten)]
    pub args: GlobalArgs,
}

pub mod nn;
pub mod rank;

/// The entry point of the command-line interface.
pub fn cli_main<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let start = std::time::Instant::now();
    let cli = Cli::parse_from(args);
    match cli.command {
        SubCommands::Rank(args) => {
            rank::main(cli.args, args)?;
        }
        SubCommands::Nn(args) => {
            nn::main(cli.args, args)?;
        }
    }

    log::info!(
        "The command took {}",
        pretty_print_elapsed(start.elapsed().as_secs_f64())
    );

    Ok(())
}

/// Pretty-prints seconds in a human-readable format.
fn pretty_print_elapsed(elapsed: f64) -> String {
    let mut result = String::new();
    let mut elapsed_seconds = elapsed as u64;
    let weeks = elapsed_seconds / (60 * 60 * 24 * 7);
    elapsed_seconds %= 60 * 60 * 24 * 7;
    let days = elapsed_seconds / (60 * 60 * 24);
    elapsed_seconds %= 60 * 60 * 24;
    let hours = elapsed_seconds / (60 * 60);
    elapsed_seconds %= 60 * 60;
    let minutes = elapsed_seconds / 60;

    for (value, unit) in [(weeks, "week"), (days, "day"), (hours, "hour"), (minutes, "minute")] {
        match value {
            0 => {}
            1 => result.push_str(&format!("1 {unit} ")),
            _ => result.push_str(&format!("{value} {unit}s ")),
        }
    }

    result.push_str(&format!("{:.3} seconds ({}s)", elapsed % 60.0, elapsed));
    result
}
