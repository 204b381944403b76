// SPDX-License-Identifier: AGPL-3.0-only

//! Synthetic regression data
//!
//! Covariates are uniform on `[low, high]`; the response is
//!
//! ```text
//! y_i = Σ_j cos(2π/T · x_ji) + σ·ε_i,   ε_i ~ N(0, 1)
//! ```

use bart_runtime::Key;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand_distr::{Distribution, StandardNormal, Uniform};

/// Shape and parameters of one synthetic dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetSpec {
    /// Covariates
    pub p: usize,
    /// Observations
    pub n: usize,
    /// Noise standard deviation
    pub sigma: f32,
    /// Covariate lower bound
    pub low: f32,
    /// Covariate upper bound
    pub high: f32,
    /// Cosine period
    pub period: f32,
}

/// Covariates of shape (p, n) and a response of length n
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Array2<f32>,
    y: Array1<f32>,
}

impl Dataset {
    /// Draw a fresh dataset; `x_key` drives the covariates, `noise_key` the noise.
    pub fn generate(x_key: Key, noise_key: Key, spec: &DatasetSpec) -> Self {
        let mut rng = x_key.into_rng();
        let uniform = Uniform::new_inclusive(spec.low, spec.high);
        let x = Array2::from_shape_simple_fn((spec.p, spec.n), || uniform.sample(&mut rng));

        let omega = 2.0 * std::f32::consts::PI / spec.period;
        let mean = x.map(|&v| (omega * v).cos()).sum_axis(Axis(0));

        let mut rng = noise_key.into_rng();
        let y = mean.mapv(|m| {
            let eps: f32 = StandardNormal.sample(&mut rng);
            m + spec.sigma * eps
        });

        tracing::debug!(
            "Generated dataset p = {}, n = {}, {} bytes",
            spec.p,
            spec.n,
            (x.len() + y.len()) * std::mem::size_of::<f32>()
        );
        Self { x, y }
    }

    /// Covariates, shape (p, n)
    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    /// Response, length n
    pub fn y(&self) -> ArrayView1<'_, f32> {
        self.y.view()
    }

    /// Covariate count
    pub fn p(&self) -> usize {
        self.x.nrows()
    }

    /// Observation count
    pub fn n(&self) -> usize {
        self.y.len()
    }

    /// Bytes held by both arrays
    pub fn nbytes(&self) -> usize {
        (self.x.len() + self.y.len()) * std::mem::size_of::<f32>()
    }
}
