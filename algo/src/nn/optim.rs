/*
 * SPDX-FileCopyrightText: 2026 The mpgraph developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Gradient-descent optimizers.

use anyhow::{Result, ensure};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// An optimizer updating a list of parameters given their gradients.
///
/// The optimizer keeps per-parameter state (e.g., moments), so the
/// parameters must be passed in the same order at each step.
pub trait Optimizer {
    /// Performs an update step.
    fn step(&mut self, params: &mut [&mut Array2<f64>], grads: &[Array2<f64>]) -> Result<()>;

    /// Resets the internal state.
    fn reset(&mut self);

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, learning_rate: f64);
}

fn check_shapes(params: &[&mut Array2<f64>], grads: &[Array2<f64>]) -> Result<()> {
    ensure!(
        params.len() == grads.len(),
        "{} parameters but {} gradients",
        params.len(),
        grads.len()
    );
    for (i, (p, g)) in params.iter().zip(grads).enumerate() {
        ensure!(
            p.dim() == g.dim(),
            "Parameter {i} has shape {:?}, but its gradient has shape {:?}",
            p.shape(),
            g.shape()
        );
    }
    Ok(())
}

/// Resizes a state vector to match the parameters, zeroing mismatched
/// entries.
fn fit_state(state: &mut Vec<Array2<f64>>, params: &[&mut Array2<f64>]) {
    state.truncate(params.len());
    for (i, p) in params.iter().enumerate() {
        match state.get_mut(i) {
            Some(s) if s.dim() == p.dim() => {}
            Some(s) => *s = Array2::zeros(p.raw_dim()),
            None => state.push(Array2::zeros(p.raw_dim())),
        }
    }
}

/// Stochastic gradient descent with momentum.
#[derive(Debug, Clone)]
pub struct Sgd {
    learning_rate: f64,
    momentum: f64,
    velocity: Vec<Array2<f64>>,
}

impl Sgd {
    /// Creates a new optimizer; a momentum of zero gives plain gradient
    /// descent.
    pub fn new(learning_rate: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: Vec::new(),
        }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [&mut Array2<f64>], grads: &[Array2<f64>]) -> Result<()> {
        check_shapes(params, grads)?;
        fit_state(&mut self.velocity, params);
        for ((param, grad), velocity) in params.iter_mut().zip(grads).zip(&mut self.velocity) {
            // v ← μ v − η g
            *velocity *= self.momentum;
            velocity.scaled_add(-self.learning_rate, grad);
            **param += &*velocity;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.velocity.clear();
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }
}

/// The Adam optimizer.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: i32,
    m: Vec<Array2<f64>>,
    v: Vec<Array2<f64>>,
}

impl Adam {
    pub const DEFAULT_BETA1: f64 = 0.9;
    pub const DEFAULT_BETA2: f64 = 0.999;
    pub const DEFAULT_EPSILON: f64 = 1E-8;

    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Creates an optimizer with the usual decay rates and ε.
    pub fn with_learning_rate(learning_rate: f64) -> Self {
        Self::new(
            learning_rate,
            Self::DEFAULT_BETA1,
            Self::DEFAULT_BETA2,
            Self::DEFAULT_EPSILON,
        )
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [&mut Array2<f64>], grads: &[Array2<f64>]) -> Result<()> {
        check_shapes(params, grads)?;
        fit_state(&mut self.m, params);
        fit_state(&mut self.v, params);
        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);

        for (((param, grad), m), v) in params
            .iter_mut()
            .zip(grads)
            .zip(&mut self.m)
            .zip(&mut self.v)
        {
            *m *= self.beta1;
            m.scaled_add(1.0 - self.beta1, grad);
            *v *= self.beta2;
            v.scaled_add(1.0 - self.beta2, &grad.mapv(|x| x * x));

            let (lr, eps) = (self.learning_rate, self.epsilon);
            ndarray::Zip::from(&mut **param)
                .and(&*m)
                .and(&*v)
                .for_each(|p, &m, &v| *p -= lr * (m / bias1) / ((v / bias2).sqrt() + eps));
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.t = 0;
        self.m.clear();
        self.v.clear();
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }
}

/// The optimizers available to [`Trainer`](super::Trainer).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Sgd {
        momentum: f64,
    },
}

impl OptimizerKind {
    pub fn build(&self, learning_rate: f64) -> Box<dyn Optimizer> {
        match *self {
            OptimizerKind::Adam => Box::new(Adam::with_learning_rate(learning_rate)),
            OptimizerKind::Sgd { momentum } => Box::new(Sgd::new(learning_rate, momentum)),
        }
    }
}
