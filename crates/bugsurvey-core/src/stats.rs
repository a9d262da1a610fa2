//! Shared numeric routines for every reporting path.
//!
//! Participant summaries and the aggregate report both go through these
//! functions, so the two views agree bit for bit. None of them fail: empty
//! inputs and zero denominators produce the neutral value (0, or a p-value of
//! exactly 1.0 below the significance floor).

use serde::{Deserialize, Serialize};

// Abramowitz & Stegun 7.1.26.
const A1: f64 = 0.254829592;
const A2: f64 = -0.284496736;
const A3: f64 = 1.421413741;
const A4: f64 = -1.453152027;
const A5: f64 = 1.061405429;
const P: f64 = 0.3275911;

/// Accuracy under the null hypothesis (pure guessing between two labels)
pub const CHANCE: f64 = 0.5;

/// Tunables of the significance test and confidence interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Below this many trials the p-value is pinned to 1.0.
    pub significance_floor: u64,
    /// p-values strictly below `alpha` count as significant.
    pub alpha: f64,
    /// Normal quantile of the Wilson interval (1.96 → 95%).
    pub confidence_z: f64,
    /// Φ(z) is capped here before computing the p-value so it never hits 0.
    pub cdf_cap: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            significance_floor: 10,
            alpha: 0.05,
            confidence_z: 1.96,
            cdf_cap: 0.9999,
        }
    }
}

/// `num / den`, or 0 when `den == 0`.
pub fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Error function, rational approximation.
pub fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

/// Standard normal CDF built on [`erf`].
///
/// The survey's old admin page evaluated `erf(x)` without the `/ √2`, so its
/// p-values differ from these.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// |accuracy − 0.5| in units of the null-hypothesis standard error.
///
/// 0 when `total == 0`.
pub fn z_score(correct: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let stderr = (CHANCE * (1.0 - CHANCE) / total as f64).sqrt();
    (ratio(correct, total) - CHANCE).abs() / stderr
}

/// Two-sided p-value of `H0: accuracy = 0.5` (normal approximation to the
/// binomial test).
pub fn binomial_p_value(correct: u64, total: u64, config: &StatsConfig) -> f64 {
    if total < config.significance_floor || total == 0 {
        return 1.0;
    }
    let z = z_score(correct, total);
    2.0 * (1.0 - normal_cdf(z).min(config.cdf_cap))
}

/// Wilson score interval for a binomial proportion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WilsonInterval {
    pub lower: f64,
    pub upper: f64,
}

impl WilsonInterval {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Wilson score interval of `successes / n` at normal quantile `z`.
///
/// `n == 0` yields the all-zero interval.
pub fn wilson_interval(successes: u64, n: u64, z: f64) -> WilsonInterval {
    if n == 0 {
        return WilsonInterval::default();
    }
    let n = n as f64;
    let p = successes as f64 / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let half_width = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;
    WilsonInterval {
        lower: (center - half_width).clamp(0.0, 1.0),
        upper: (center + half_width).clamp(0.0, 1.0),
    }
}

/// Response-time statistics in milliseconds.
///
/// Only measured latencies (`> 0`) take part; all fields are 0 when none do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseTimeStats {
    /// Number of measured latencies
    pub count: u64,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
}

impl ResponseTimeStats {
    pub fn from_latencies(latencies: impl IntoIterator<Item = u64>) -> Self {
        let mut sorted: Vec<u64> = latencies.into_iter().filter(|&t| t > 0).collect();
        if sorted.is_empty() {
            return Self::default();
        }
        sorted.sort_unstable();

        let len = sorted.len();
        let sum: u128 = sorted.iter().map(|&t| t as u128).sum();
        let median_ms = if len % 2 == 0 {
            (sorted[len / 2 - 1] as f64 + sorted[len / 2] as f64) / 2.0
        } else {
            sorted[len / 2] as f64
        };

        Self {
            count: len as u64,
            mean_ms: sum as f64 / len as f64,
            median_ms,
            min_ms: sorted[0],
            max_ms: sorted[len - 1],
        }
    }
}
