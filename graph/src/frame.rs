/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Column stores for node and edge attributes.
//!
//! A [`Frame`] maps attribute names to dense matrices of `f64` with one row
//! per node (or per edge) and an arbitrary, per-attribute number of columns.
//! Scalar attributes, such as a PageRank value or a degree, are stored as
//! matrices with a single column.

use crate::{Error, Result};
use ndarray::{Array2, ArrayView2, Axis};
use std::collections::BTreeMap;

/// A set of named matrices, as returned by callbacks.
///
/// Each matrix has one row per item of the batch the callback was invoked
/// on.
pub type Attrs = BTreeMap<String, Array2<f64>>;

/// A column store with a fixed number of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    num_rows: usize,
    columns: BTreeMap<String, Array2<f64>>,
}

impl Frame {
    /// Creates an empty frame with `num_rows` rows.
    pub fn new(num_rows: usize) -> Self {
        Self {
            num_rows,
            columns: BTreeMap::new(),
        }
    }

    /// Returns the number of rows of every column.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Returns whether the frame has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the column names in lexicographical order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.keys().map(String::as_str)
    }

    /// Returns whether a column with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Sets (or replaces) a column.
    ///
    /// The number of rows of `value` must match the number of rows of the
    /// frame.
    pub fn set(&mut self, name: impl Into<String>, value: Array2<f64>) -> Result<()> {
        let name = name.into();
        if value.nrows() != self.num_rows {
            return Err(Error::ShapeMismatch {
                name,
                expected: self.num_rows,
                got: value.nrows(),
            });
        }
        self.columns.insert(name, value);
        Ok(())
    }

    /// Sets (or replaces) a single-column attribute from a vector of scalars.
    pub fn set_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        let len = values.len();
        let value = Array2::from_shape_vec((len, 1), values).map_err(|_| Error::ShapeMismatch {
            name: name.clone(),
            expected: self.num_rows,
            got: len,
        })?;
        self.set(name, value)
    }

    /// Returns a column.
    pub fn get(&self, name: &str) -> Result<&Array2<f64>> {
        self.columns
            .get(name)
            .ok_or_else(|| Error::MissingAttribute(name.to_owned()))
    }

    /// Returns a column mutably.
    ///
    /// The shape of the column must not be changed through the returned
    /// reference.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut Array2<f64>> {
        self.columns
            .get_mut(name)
            .ok_or_else(|| Error::MissingAttribute(name.to_owned()))
    }

    /// Removes a column, returning it.
    pub fn remove(&mut self, name: &str) -> Option<Array2<f64>> {
        self.columns.remove(name)
    }

    /// Returns the first column of an attribute as a vector.
    ///
    /// This is the natural way of reading back scalar attributes.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let value = self.get(name)?;
        if value.ncols() == 0 {
            return Err(Error::DimensionMismatch {
                name: name.to_owned(),
                expected: 1,
                got: 0,
            });
        }
        Ok(value.column(0).to_vec())
    }

    /// Gathers the given rows of an attribute into a new matrix.
    pub fn select(&self, name: &str, rows: &[usize]) -> Result<Array2<f64>> {
        Ok(self.get(name)?.select(Axis(0), rows))
    }

    /// Writes `values` into the given rows of an attribute.
    ///
    /// If the attribute does not exist it is created and zero-filled, with
    /// the width of `values`.
    pub fn scatter(&mut self, name: &str, rows: &[usize], values: ArrayView2<'_, f64>) -> Result<()> {
        if values.nrows() != rows.len() {
            return Err(Error::RowCount {
                name: name.to_owned(),
                expected: rows.len(),
                got: values.nrows(),
            });
        }
        let num_rows = self.num_rows;
        let column = self
            .columns
            .entry(name.to_owned())
            .or_insert_with(|| Array2::zeros((num_rows, values.ncols())));
        if column.ncols() != values.ncols() {
            return Err(Error::DimensionMismatch {
                name: name.to_owned(),
                expected: column.ncols(),
                got: values.ncols(),
            });
        }
        for (&row, value) in rows.iter().zip(values.rows()) {
            column.row_mut(row).assign(&value);
        }
        Ok(())
    }

    /// Checks that a sequence of callback results, each paired with the rows
    /// it is meant for, can be merged by [`scatter_all`](Self::scatter_all)
    /// without errors.
    ///
    /// Row counts must match, and each attribute must have the same width in
    /// all results and in the frame, if already present.
    pub fn check_scatter<'a>(
        &self,
        batches: impl IntoIterator<Item = (&'a [usize], &'a Attrs)>,
    ) -> Result<()> {
        let mut widths: BTreeMap<&str, usize> = BTreeMap::new();
        for (rows, attrs) in batches {
            for (name, values) in attrs {
                if values.nrows() != rows.len() {
                    return Err(Error::RowCount {
                        name: name.clone(),
                        expected: rows.len(),
                        got: values.nrows(),
                    });
                }
                let expected = *widths.entry(name.as_str()).or_insert_with(|| {
                    self.columns
                        .get(name)
                        .map_or(values.ncols(), |column| column.ncols())
                });
                if values.ncols() != expected {
                    return Err(Error::DimensionMismatch {
                        name: name.clone(),
                        expected,
                        got: values.ncols(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Merges a set of callback results into the given rows.
    ///
    /// Nothing is written if some attribute cannot be merged.
    pub fn scatter_all(&mut self, rows: &[usize], attrs: &Attrs) -> Result<()> {
        self.check_scatter([(rows, attrs)])?;
        for (name, values) in attrs {
            self.scatter(name, rows, values.view())?;
        }
        Ok(())
    }
}
