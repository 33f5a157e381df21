/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::graphs::VecGraph;
use crate::{Error, Result};
use dsi_progress_logger::ProgressLog;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// The layout of a textual list of arcs.
///
/// Each line contains (at least) two columns separated by `separator`; the
/// source and the target of the arc are in the columns `source_column` and
/// `target_column`. Lines starting with `comment` are ignored.
///
/// If the separator is a space, any run of whitespace separates columns;
/// otherwise, every occurrence of the separator starts a new column, so two
/// consecutive separators delimit an empty column.
#[derive(Debug, Clone)]
pub struct ArcsFormat {
    pub comment: char,
    pub lines_to_skip: usize,
    pub max_arcs: Option<usize>,
    pub separator: char,
    pub source_column: usize,
    pub target_column: usize,
    /// If true, sources and targets are arbitrary labels, and numerical
    /// identifiers are assigned to them in order of appearance; otherwise,
    /// they must be node identifiers starting from zero.
    pub labels: bool,
}

impl Default for ArcsFormat {
    fn default() -> Self {
        Self {
            comment: '#',
            lines_to_skip: 0,
            max_arcs: None,
            separator: '\t',
            source_column: 0,
            target_column: 1,
            labels: false,
        }
    }
}

/// A graph read from a list of arcs.
#[derive(Debug, Clone)]
pub struct ArcList {
    pub graph: VecGraph,
    /// The node labels, if the list used labels.
    pub labels: Option<Vec<String>>,
}

struct Labeler {
    ids: HashMap<String, usize>,
    labels: Vec<String>,
}

impl Labeler {
    fn id(&mut self, label: &str) -> usize {
        if let Some(&id) = self.ids.get(label) {
            return id;
        }
        let id = self.labels.len();
        self.ids.insert(label.to_owned(), id);
        self.labels.push(label.to_owned());
        id
    }
}

/// Reads a list of arcs.
///
/// `origin` is used only in error messages. Duplicate arcs are ignored.
pub fn read_arcs(
    reader: impl BufRead,
    format: &ArcsFormat,
    origin: impl AsRef<Path>,
    pl: &mut impl ProgressLog,
) -> Result<ArcList> {
    let origin = origin.as_ref();
    let parse_error = |line: usize, message: String| Error::Parse {
        path: origin.to_owned(),
        line,
        message,
    };
    let mut labeler = format.labels.then(|| Labeler {
        ids: HashMap::new(),
        labels: Vec::new(),
    });
    let needed = format.source_column.max(format.target_column) + 1;
    let mut graph = VecGraph::new();
    let mut num_arcs = 0;

    pl.item_name("arc");
    pl.expected_updates(format.max_arcs);
    pl.start("Reading arcs...");

    for (i, line) in reader.lines().enumerate().skip(format.lines_to_skip) {
        let line = line.map_err(|source| Error::Io {
            path: PathBuf::from(origin),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(format.comment) {
            continue;
        }
        if format.max_arcs.is_some_and(|max_arcs| num_arcs >= max_arcs) {
            break;
        }
        let columns: Vec<&str> = if format.separator == ' ' {
            trimmed.split_whitespace().collect()
        } else {
            trimmed.split(format.separator).map(str::trim).collect()
        };
        if columns.len() < needed {
            return Err(parse_error(
                i + 1,
                format!(
                    "expected at least {} columns separated by {:?}, got {}",
                    needed,
                    format.separator,
                    columns.len()
                ),
            ));
        }
        let (src, dst) = (
            columns[format.source_column],
            columns[format.target_column],
        );
        let (u, v) = match labeler.as_mut() {
            Some(labeler) => (labeler.id(src), labeler.id(dst)),
            None => {
                let parse = |s: &str| {
                    s.parse::<usize>()
                        .map_err(|e| parse_error(i + 1, format!("invalid node {s:?}: {e}")))
                };
                (parse(src)?, parse(dst)?)
            }
        };
        graph.add_node(u.max(v));
        graph.add_arc(u, v);
        num_arcs += 1;
        pl.light_update();
    }
    pl.done();

    log::info!(
        "Read {} arcs ({} distinct) on {} nodes from {}",
        num_arcs,
        graph.num_arcs(),
        graph.num_nodes(),
        origin.display()
    );

    Ok(ArcList {
        graph,
        labels: labeler.map(|labeler| labeler.labels),
    })
}

/// Reads a list of arcs from a file.
pub fn load_arcs(
    path: impl AsRef<Path>,
    format: &ArcsFormat,
    pl: &mut impl ProgressLog,
) -> Result<ArcList> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;
    read_arcs(std::io::BufReader::new(file), format, path, pl)
}
