/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Masked classification loss and metrics.
//!
//! All functions take one row of logits per node, the label of each node,
//! and a mask selecting the nodes that contribute.

use anyhow::{Result, ensure};
use ndarray::{Array2, ArrayView1, Axis};

fn check(logits: &Array2<f64>, labels: &[usize], mask: &[bool]) -> Result<()> {
    ensure!(
        logits.nrows() == labels.len() && labels.len() == mask.len(),
        "Mismatched lengths: {} rows of logits, {} labels, {} mask entries",
        logits.nrows(),
        labels.len(),
        mask.len()
    );
    if let Some(&label) = labels.iter().zip(mask).filter(|&(_, &m)| m).map(|(l, _)| l).max() {
        ensure!(
            label < logits.ncols(),
            "Label {label} out of range for {} classes",
            logits.ncols()
        );
    }
    Ok(())
}

/// Returns the row-wise softmax of the logits.
pub fn softmax(logits: &Array2<f64>) -> Array2<f64> {
    let mut probs = logits.clone();
    for mut row in probs.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |m, &x| m.max(x));
        row.mapv_inplace(|x| (x - max).exp());
        let sum = row.sum();
        row /= sum;
    }
    probs
}

/// Returns the mean cross-entropy of the softmax of the logits over the
/// masked nodes, and its gradient with respect to the logits.
///
/// The gradient is zero on unmasked nodes. If no node is masked, the loss
/// and the gradient are zero.
pub fn softmax_cross_entropy(
    logits: &Array2<f64>,
    labels: &[usize],
    mask: &[bool],
) -> Result<(f64, Array2<f64>)> {
    check(logits, labels, mask)?;
    let count = mask.iter().filter(|&&m| m).count();
    let mut grad = Array2::zeros(logits.raw_dim());
    if count == 0 {
        return Ok((0.0, grad));
    }
    let probs = softmax(logits);
    let mut loss = 0.0;
    for (i, (&label, _)) in labels.iter().zip(mask).enumerate().filter(|(_, (_, m))| **m) {
        loss -= probs[(i, label)].max(f64::MIN_POSITIVE).ln();
        let mut row = grad.row_mut(i);
        row.assign(&probs.row(i));
        row[label] -= 1.0;
    }
    grad /= count as f64;
    Ok((loss / count as f64, grad))
}

fn argmax(row: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (i, &x) in row.iter().enumerate() {
        if x > row[best] {
            best = i;
        }
    }
    best
}

/// Returns the class with the largest logit of each node (the first one, in
/// case of ties).
pub fn predict(logits: &Array2<f64>) -> Vec<usize> {
    logits.axis_iter(Axis(0)).map(argmax).collect()
}

/// Returns the fraction of masked nodes whose predicted class is the label.
///
/// If no node is masked, the accuracy is zero.
pub fn accuracy(logits: &Array2<f64>, labels: &[usize], mask: &[bool]) -> Result<f64> {
    check(logits, labels, mask)?;
    let (mut correct, mut total) = (0_usize, 0_usize);
    for ((prediction, &label), _) in predict(logits)
        .into_iter()
        .zip(labels)
        .zip(mask)
        .filter(|(_, m)| **m)
    {
        total += 1;
        correct += usize::from(prediction == label);
    }
    Ok(if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_softmax() {
        let probs = softmax(&array![[0.0, 0.0], [1000.0, 0.0]]);
        assert_eq!(probs.row(0).to_vec(), vec![0.5, 0.5]);
        assert!((probs[(1, 0)] - 1.0).abs() < 1E-12);
    }

    #[test]
    fn test_cross_entropy() -> Result<()> {
        let logits = array![[0.0, 0.0], [2.0, 0.0], [5.0, -5.0]];
        let (loss, grad) = softmax_cross_entropy(&logits, &[1, 0, 1], &[true, false, false])?;
        assert!((loss - 2.0_f64.ln()).abs() < 1E-12);
        assert_eq!(grad, array![[0.5, -0.5], [0.0, 0.0], [0.0, 0.0]]);

        let (loss, grad) = softmax_cross_entropy(&logits, &[1, 0, 1], &[false; 3])?;
        assert_eq!(loss, 0.0);
        assert!(grad.iter().all(|&x| x == 0.0));
        Ok(())
    }

    #[test]
    fn test_accuracy() -> Result<()> {
        let logits = array![[0.0, 1.0], [2.0, 0.0], [5.0, -5.0], [1.0, 1.0]];
        assert_eq!(predict(&logits), vec![1, 0, 0, 0]);
        assert_eq!(accuracy(&logits, &[1, 0, 1, 0], &[true; 4])?, 0.75);
        assert_eq!(accuracy(&logits, &[1, 0, 1, 0], &[false, false, true, false])?, 0.0);
        Ok(())
    }

    #[test]
    fn test_errors() {
        let logits = array![[0.0, 1.0]];
        assert!(accuracy(&logits, &[0, 1], &[true]).is_err());
        assert!(softmax_cross_entropy(&logits, &[2], &[true]).is_err());
        // Unmasked labels are not checked
        assert!(softmax_cross_entropy(&logits, &[2], &[false]).is_ok());
    }
}
