//! National statistics for an indicator and percentile placement.

use serde::{Deserialize, Serialize};

/// Aggregate score distribution for one indicator (per year and grade band).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorStatistics {
    #[serde(rename = "puntaje_promedio")]
    pub mean: f64,
    #[serde(rename = "desviacion_estandar")]
    pub std_dev: f64,
}

impl IndicatorStatistics {
    /// Percentile (0–100) of `score` under a normal approximation.
    pub fn percentile(&self, score: f64) -> u8 {
        if self.std_dev <= 0.0 {
            return 50;
        }
        let z = (score - self.mean) / self.std_dev;
        let cdf = 0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2));
        (cdf * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Abramowitz–Stegun 7.1.26 approximation (max error 1.5e-7).
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x >= 0.0 { 1.0 } else { -1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}
