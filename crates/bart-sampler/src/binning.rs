// SPDX-License-Identifier: AGPL-3.0-only

//! Covariate quantization
//!
//! Trees split on bin indices rather than raw values. Each covariate gets at
//! most `numcut` cutpoints placed at quantiles of its distinct values; an
//! observation's bin is the number of cutpoints strictly below it. A split
//! `s` (1-based) sends an observation left when its bin is `< s`.

use ndarray::{Array2, ArrayView2, Axis};

/// Quantized covariates
#[derive(Debug, Clone)]
pub struct Binned {
    /// Bin index per covariate and observation, shape (p, n)
    pub x: Array2<u16>,
    /// Number of cutpoints per covariate
    pub max_split: Vec<u16>,
    /// Cutpoint values per covariate
    pub cutpoints: Vec<Vec<f32>>,
}

/// Quantize covariates of shape (p, n).
pub fn quantize(x: ArrayView2<'_, f32>, numcut: usize) -> Binned {
    let (p, n) = x.dim();
    let mut binned = Array2::<u16>::zeros((p, n));
    let mut max_split = Vec::with_capacity(p);
    let mut cutpoints = Vec::with_capacity(p);

    for (var, row) in x.axis_iter(Axis(0)).enumerate() {
        let cuts = cutpoints_for(row.iter().copied(), numcut);
        for (j, &value) in row.iter().enumerate() {
            binned[[var, j]] = bin_of(&cuts, value);
        }
        #[allow(clippy::cast_possible_truncation)]
        max_split.push(cuts.len() as u16);
        cutpoints.push(cuts);
    }

    tracing::debug!(
        "Quantized ({p}, {n}) covariates, cutpoints per var: {:?}",
        max_split
    );
    Binned {
        x: binned,
        max_split,
        cutpoints,
    }
}

fn cutpoints_for(values: impl Iterator<Item = f32>, numcut: usize) -> Vec<f32> {
    let mut sorted: Vec<f32> = values.collect();
    sorted.sort_unstable_by(f32::total_cmp);
    sorted.dedup();

    let midpoint = |i: usize| 0.5 * (sorted[i - 1] + sorted[i]);
    let mut cuts: Vec<f32> = if sorted.len() <= numcut + 1 {
        (1..sorted.len()).map(midpoint).collect()
    } else {
        (1..=numcut)
            .map(|k| midpoint((k * sorted.len() / (numcut + 1)).max(1)))
            .collect()
    };
    cuts.dedup();
    cuts
}

#[allow(clippy::cast_possible_truncation)]
fn bin_of(cuts: &[f32], value: f32) -> u16 {
    cuts.partition_point(|&c| c < value) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn few_distinct_values_get_midpoints() {
        let cuts = cutpoints_for([3.0, 1.0, 2.0, 2.0].into_iter(), 255);
        assert_eq!(cuts, vec![1.5, 2.5]);
    }

    #[test]
    fn cutpoints_capped_at_numcut() {
        #[allow(clippy::cast_precision_loss)]
        let cuts = cutpoints_for((0..1000).map(|i| i as f32), 10);
        assert!(cuts.len() <= 10);
        assert!(cuts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn bins_count_cutpoints_below() {
        let x = array![[0.0_f32, 1.0, 2.0, 3.0]];
        let b = quantize(x.view(), 255);
        assert_eq!(b.max_split, vec![3]);
        assert_eq!(b.x.row(0).to_vec(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn constant_covariate_has_no_splits() {
        let x = array![[5.0_f32, 5.0, 5.0]];
        let b = quantize(x.view(), 255);
        assert_eq!(b.max_split, vec![0]);
        assert!(b.x.iter().all(|&v| v == 0));
    }

    #[test]
    fn single_observation() {
        let x = array![[0.5_f32], [-1.0]];
        let b = quantize(x.view(), 255);
        assert_eq!(b.x.dim(), (2, 1));
        assert_eq!(b.max_split, vec![0, 0]);
    }
}
