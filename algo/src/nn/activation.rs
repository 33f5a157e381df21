/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Elementwise nonlinearities of GCN layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// max(0, *x*).
    #[default]
    Relu,
    /// *x*; used by output layers, whose values are logits.
    Identity,
}

impl Activation {
    pub fn forward(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => z.mapv(|x| x.max(0.0)),
            Activation::Identity => z.clone(),
        }
    }

    /// Returns the derivative evaluated at each entry of the given
    /// pre-activation values.
    ///
    /// The derivative of ReLU at zero is taken to be zero.
    pub fn derivative(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => z.mapv(|x| if x > 0.0 { 1.0 } else { 0.0 }),
            Activation::Identity => Array2::ones(z.raw_dim()),
        }
    }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Activation::Relu => f.write_str("relu"),
            Activation::Identity => f.write_str("identity"),
        }
    }
}
