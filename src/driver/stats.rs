/*!
 * Sample Statistics
 * Summary of the measured elapsed times for one combination
 */

use serde::Serialize;
use std::time::Duration;

/// Average-time summary in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub samples: usize,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// Sample standard deviation (n - 1); zero for a single sample
    pub stddev_ms: f64,
}

impl Summary {
    /// Summarize `samples`; `None` when empty
    pub fn from_durations(samples: &[Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let values: Vec<f64> = samples.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let stddev = if values.len() > 1 {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt()
        } else {
            0.0
        };

        Some(Self {
            samples: values.len(),
            mean_ms: mean,
            min_ms: min,
            max_ms: max,
            stddev_ms: stddev,
        })
    }
}
