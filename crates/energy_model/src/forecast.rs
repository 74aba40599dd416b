//! Next-period forecast from a prior prediction.

use common::{PredictionResult, Trend};
use rand::Rng;

// Exclusive thresholds: a change of exactly ±2.0% is stable.
const INCREASE_THRESHOLD_PCT: f64 = 2.0;
const DECREASE_THRESHOLD_PCT: f64 = -2.0;

/// Raw forecast figures before persistence.
#[derive(Debug, Clone, Copy)]
pub struct ForecastFigures {
    pub consumption: f64,
    pub trend: Trend,
    pub percentage_change: f64,
}

/// Classify a percentage change against the fixed thresholds.
pub fn classify_trend(percentage_change: f64) -> Trend {
    if percentage_change > INCREASE_THRESHOLD_PCT {
        Trend::Increase
    } else if percentage_change < DECREASE_THRESHOLD_PCT {
        Trend::Decrease
    } else {
        Trend::Stable
    }
}

/// Project the next period from a prior result.
///
/// Draws a uniform trend factor in [0.9, 1.2] and classifies the resulting
/// percentage change.
pub fn generate_forecast<R: Rng>(prior: &PredictionResult, rng: &mut R) -> ForecastFigures {
    let factor = rng.gen_range(0.9..=1.2);
    let consumption = prior.consumption * factor;
    let percentage_change = (consumption - prior.consumption) / prior.consumption * 100.0;
    ForecastFigures {
        consumption,
        trend: classify_trend(percentage_change),
        percentage_change,
    }
}
