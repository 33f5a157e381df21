/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::graphs::VecGraph;
use crate::{Error, Result};
use ndarray::Array2;
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// How nodes are assigned to the training, validation, and test sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    /// The number of training nodes per class.
    pub train_per_class: usize,
    /// The number of validation nodes.
    pub num_val: usize,
    /// The number of test nodes.
    pub num_test: usize,
}

impl Default for Split {
    fn default() -> Self {
        Self {
            train_per_class: 20,
            num_val: 500,
            num_test: 1000,
        }
    }
}

/// A citation graph with node features, labels, and a semi-supervised split.
#[derive(Debug, Clone)]
pub struct CitationDataset {
    /// The graph; arcs go from the citing paper to the cited paper (plus
    /// their reverses if the loader was symmetric).
    pub graph: VecGraph,
    /// One row of features per node.
    pub features: Array2<f64>,
    /// The class of each node, in `0..class_names.len()`.
    pub labels: Vec<usize>,
    /// The class names, in order of first appearance.
    pub class_names: Vec<String>,
    /// The paper identifier of each node, in file order.
    pub paper_ids: Vec<String>,
    pub train_mask: Vec<bool>,
    pub val_mask: Vec<bool>,
    pub test_mask: Vec<bool>,
}

impl CitationDataset {
    /// Returns the number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.labels.len()
    }

    /// Returns the number of features per node.
    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    /// Returns the number of classes.
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }
}

/// A loader for citation graphs in the LINQS format (e.g., Cora).
///
/// The dataset is made of two files sharing a basename:
///
/// - `BASENAME.content`, containing a line per paper with its identifier, its
///   features, and its class label, separated by whitespace;
/// - `BASENAME.cites`, containing a line per citation with the identifier of
///   the cited paper followed by the identifier of the citing paper.
///
/// Nodes are numbered following the order of the `.content` file. Citations
/// mentioning papers that do not appear in the `.content` file are skipped.
///
/// # Examples
///
/// ```no_run
/// use mpgraph::datasets::{CitationLoader, Split};
///
/// let cora = CitationLoader::with_basename("data/cora")
///     .split(Split::default())
///     .load()?;
/// println!("{} nodes, {} classes", cora.num_nodes(), cora.num_classes());
/// # Ok::<(), mpgraph::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct CitationLoader {
    basename: PathBuf,
    self_loops: bool,
    symmetric: bool,
    row_normalize: bool,
    split: Split,
}

impl CitationLoader {
    pub fn with_basename(basename: impl AsRef<Path>) -> Self {
        Self {
            basename: basename.as_ref().to_owned(),
            self_loops: true,
            symmetric: true,
            row_normalize: true,
            split: Split::default(),
        }
    }

    /// Sets whether a loop is added on every node (default: true).
    pub fn self_loops(mut self, self_loops: bool) -> Self {
        self.self_loops = self_loops;
        self
    }

    /// Sets whether every citation is also added reversed (default: true).
    pub fn symmetric(mut self, symmetric: bool) -> Self {
        self.symmetric = symmetric;
        self
    }

    /// Sets whether feature rows are normalized to sum one (default: true).
    pub fn row_normalize(mut self, row_normalize: bool) -> Self {
        self.row_normalize = row_normalize;
        self
    }

    pub fn split(mut self, split: Split) -> Self {
        self.split = split;
        self
    }

    fn open(&self, extension: &str) -> Result<(PathBuf, BufReader<std::fs::File>)> {
        let path = self.basename.with_extension(extension);
        let file = std::fs::File::open(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        Ok((path, BufReader::new(file)))
    }

    pub fn load(&self) -> Result<CitationDataset> {
        let (content_path, content) = self.open("content")?;
        let mut paper_ids = Vec::new();
        let mut ids = HashMap::new();
        let mut class_ids = HashMap::new();
        let mut class_names = Vec::new();
        let mut labels = Vec::new();
        let mut values = Vec::new();
        let mut num_features = None;

        for (i, line) in content.lines().enumerate() {
            let line = line.map_err(|source| Error::Io {
                path: content_path.clone(),
                source,
            })?;
            let parse_error = |message: String| Error::Parse {
                path: content_path.clone(),
                line: i + 1,
                message,
            };
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() < 2 {
                return Err(parse_error("missing class label".to_owned()));
            }
            let paper = tokens[0];
            let class = tokens[tokens.len() - 1];
            let features = &tokens[1..tokens.len() - 1];
            match num_features {
                None => num_features = Some(features.len()),
                Some(k) if k != features.len() => {
                    return Err(parse_error(format!(
                        "expected {} features, got {}",
                        k,
                        features.len()
                    )));
                }
                _ => {}
            }
            for f in features {
                values.push(
                    f.parse::<f64>()
                        .map_err(|e| parse_error(format!("invalid feature {f:?}: {e}")))?,
                );
            }
            if ids.insert(paper.to_owned(), paper_ids.len()).is_some() {
                return Err(parse_error(format!("duplicate paper {paper:?}")));
            }
            paper_ids.push(paper.to_owned());
            let next_class = class_names.len();
            let label = *class_ids.entry(class.to_owned()).or_insert_with(|| {
                class_names.push(class.to_owned());
                next_class
            });
            labels.push(label);
        }

        let num_nodes = paper_ids.len();
        let num_features = num_features.unwrap_or(0);
        let mut features = Array2::from_shape_vec((num_nodes, num_features), values)
            .expect("every paper has the same number of features");
        if self.row_normalize {
            for mut row in features.rows_mut() {
                let sum = row.sum();
                if sum != 0.0 {
                    row /= sum;
                }
            }
        }

        let (cites_path, cites) = self.open("cites")?;
        let mut graph = VecGraph::empty(num_nodes);
        let mut skipped = 0_usize;
        for (i, line) in cites.lines().enumerate() {
            let line = line.map_err(|source| Error::Io {
                path: cites_path.clone(),
                source,
            })?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() != 2 {
                return Err(Error::Parse {
                    path: cites_path.clone(),
                    line: i + 1,
                    message: format!("expected two paper identifiers, got {}", tokens.len()),
                });
            }
            match (ids.get(tokens[1]), ids.get(tokens[0])) {
                (Some(&citing), Some(&cited)) => {
                    graph.add_arc(citing, cited);
                    if self.symmetric {
                        graph.add_arc(cited, citing);
                    }
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            log::warn!(
                "Skipped {} citation(s) mentioning unknown papers in {}",
                skipped,
                cites_path.display()
            );
        }
        if self.self_loops {
            graph.add_self_loops();
        }

        let (train_mask, val_mask, test_mask) =
            split_masks(&labels, class_names.len(), &self.split);

        log::info!(
            "Loaded {} papers, {} arcs, {} features, {} classes from {}",
            num_nodes,
            graph.num_arcs(),
            num_features,
            class_names.len(),
            self.basename.display()
        );

        Ok(CitationDataset {
            graph,
            features,
            labels,
            class_names,
            paper_ids,
            train_mask,
            val_mask,
            test_mask,
        })
    }
}

fn split_masks(
    labels: &[usize],
    num_classes: usize,
    split: &Split,
) -> (Vec<bool>, Vec<bool>, Vec<bool>) {
    let n = labels.len();
    let mut train = vec![false; n];
    let mut val = vec![false; n];
    let mut test = vec![false; n];
    let mut per_class = vec![0; num_classes];
    for (node, &label) in labels.iter().enumerate() {
        if per_class[label] < split.train_per_class {
            per_class[label] += 1;
            train[node] = true;
        }
    }

    let mut rest = (0..n).filter(|&node| !train[node]);
    for node in rest.by_ref().take(split.num_val) {
        val[node] = true;
    }
    for node in rest.take(split.num_test) {
        test[node] = true;
    }

    let counts = [&train, &val, &test].map(|mask| mask.iter().filter(|&&x| x).count());
    if counts[1] < split.num_val || counts[2] < split.num_test {
        log::warn!(
            "Not enough nodes for the requested split: {} validation and {} test nodes",
            counts[1],
            counts[2]
        );
    }
    (train, val, test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_masks() {
        let labels = [0, 1, 0, 0, 1, 2, 1, 0];
        let split = Split {
            train_per_class: 2,
            num_val: 2,
            num_test: 5,
        };
        let (train, val, test) = split_masks(&labels, 3, &split);
        assert_eq!(
            train,
            vec![true, true, true, false, true, true, false, false]
        );
        assert_eq!(
            val,
            vec![false, false, false, true, false, false, true, false]
        );
        assert_eq!(
            test,
            vec![false, false, false, false, false, false, false, true]
        );
    }
}
