// SPDX-License-Identifier: AGPL-3.0-only

//! Base-10 logarithmic axis

/// Log axis spanning whole decades `[10^lo, 10^hi]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogAxis {
    lo: i32,
    hi: i32,
}

impl LogAxis {
    /// Smallest decade range covering every positive, finite value.
    ///
    /// Falls back to `[1, 10]` when there is nothing to cover.
    pub fn covering(values: impl IntoIterator<Item = f64>) -> Self {
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite() && *v > 0.0)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !min.is_finite() {
            return Self { lo: 0, hi: 1 };
        }
        #[allow(clippy::cast_possible_truncation)]
        let lo = min.log10().floor() as i32;
        #[allow(clippy::cast_possible_truncation)]
        let hi = (max.log10().ceil() as i32).max(lo + 1);
        Self { lo, hi }
    }

    /// Lowest decade exponent
    pub const fn lo(&self) -> i32 {
        self.lo
    }

    /// Highest decade exponent
    pub const fn hi(&self) -> i32 {
        self.hi
    }

    /// Position of `v` as a fraction of the axis length
    pub fn fraction(&self, v: f64) -> f64 {
        (v.log10() - f64::from(self.lo)) / f64::from(self.hi - self.lo)
    }

    /// Decade exponents, `lo..=hi`
    pub fn major_ticks(&self) -> Vec<i32> {
        (self.lo..=self.hi).collect()
    }

    /// `m · 10^k` for `m` in 2..=9 inside every decade
    pub fn minor_ticks(&self) -> Vec<f64> {
        (self.lo..self.hi)
            .flat_map(|k| (2..=9).map(move |m| f64::from(m) * 10f64.powi(k)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_data_with_whole_decades() {
        let axis = LogAxis::covering([150.0, 3_000.0]);
        assert_eq!((axis.lo(), axis.hi()), (2, 4));
        assert_eq!(axis.major_ticks(), vec![2, 3, 4]);
        assert_eq!(axis.minor_ticks().len(), 16);
    }

    #[test]
    fn exact_powers_still_span_a_decade() {
        let axis = LogAxis::covering([100.0]);
        assert_eq!((axis.lo(), axis.hi()), (2, 3));
    }

    #[test]
    fn small_times_get_negative_decades() {
        let axis = LogAxis::covering([0.0021, 0.5]);
        assert_eq!((axis.lo(), axis.hi()), (-3, 0));
    }

    #[test]
    fn ignores_non_positive_values() {
        let axis = LogAxis::covering([0.0, -1.0, f64::NAN]);
        assert_eq!((axis.lo(), axis.hi()), (0, 1));
    }

    #[test]
    fn fraction_is_linear_in_log() {
        let axis = LogAxis::covering([10.0, 1_000.0]);
        assert!((axis.fraction(10.0) - 0.0).abs() < 1e-12);
        assert!((axis.fraction(100.0) - 0.5).abs() < 1e-12);
        assert!((axis.fraction(1_000.0) - 1.0).abs() < 1e-12);
    }
}
