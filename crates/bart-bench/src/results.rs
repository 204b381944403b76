// SPDX-License-Identifier: AGPL-3.0-only

//! Timing results of a sweep

use std::fmt::Write as _;

/// Elapsed time of one `(n, device)` pair
#[derive(Debug, Clone, PartialEq)]
pub struct TimingResult {
    /// Dataset size
    pub n: usize,
    /// Device label
    pub device: String,
    /// Wall time of one compiled call, barrier included
    pub seconds: f64,
}

/// Append-only table of timings, in the order they were measured
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsTable {
    entries: Vec<TimingResult>,
}

impl ResultsTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one measurement
    pub fn record(&mut self, n: usize, device: impl Into<String>, seconds: f64) {
        self.entries.push(TimingResult {
            n,
            device: device.into(),
            seconds,
        });
    }

    /// All measurements, in sweep order
    pub fn entries(&self) -> &[TimingResult] {
        &self.entries
    }

    /// Number of measurements
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True before the first measurement
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Device labels in order of first appearance
    pub fn devices(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for e in &self.entries {
            if !labels.contains(&e.device.as_str()) {
                labels.push(&e.device);
            }
        }
        labels
    }

    /// Dataset sizes in order of first appearance
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::new();
        for e in &self.entries {
            if !sizes.contains(&e.n) {
                sizes.push(e.n);
            }
        }
        sizes
    }

    /// `(n, seconds)` points measured on `device`, in sweep order
    pub fn series(&self, device: &str) -> Vec<(usize, f64)> {
        self.entries
            .iter()
            .filter(|e| e.device == device)
            .map(|e| (e.n, e.seconds))
            .collect()
    }

    /// Time measured for one pair, if any
    pub fn get(&self, n: usize, device: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.n == n && e.device == device)
            .map(|e| e.seconds)
    }

    /// Markdown table with one row per size and one column per device
    pub fn to_markdown(&self) -> String {
        let devices = self.devices();
        let mut md = String::new();
        let _ = write!(md, "| n |");
        for d in &devices {
            let _ = write!(md, " {d} (s) |");
        }
        md.push('\n');
        md.push_str("|--:|");
        for _ in &devices {
            md.push_str("--:|");
        }
        md.push('\n');
        for n in self.sizes() {
            let _ = write!(md, "| {n} |");
            for d in &devices {
                match self.get(n, d) {
                    Some(s) => {
                        let _ = write!(md, " {} |", format_seconds(s));
                    }
                    None => md.push_str(" - |"),
                }
            }
            md.push('\n');
        }
        md
    }
}

/// Two significant digits, like `0.0021` or `1.3e+02`
pub fn format_seconds(seconds: f64) -> String {
    if seconds == 0.0 || !seconds.is_finite() {
        return format!("{seconds}");
    }
    // Exponent of the value after rounding to two digits, so 99.6 counts as 1.0e2.
    let sci = format!("{seconds:.1e}");
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exponent: i32 = exp.parse().unwrap_or(0);
    if (-4..2).contains(&exponent) {
        let decimals = usize::try_from(1 - exponent).unwrap_or(0);
        trim_zeros(&format!("{seconds:.decimals$}"))
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_zeros(mantissa), exponent.abs())
    }
}

fn trim_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}
