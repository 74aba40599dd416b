//! Consumption estimation.

use chrono::Datelike;
use common::{ApplianceCounts, PredictionRequest, Result};
use rand::Rng;

use crate::factors::daily_factor;

/// Seasonal multiplier for a 1-based calendar month.
///
/// Peaks in spring (`1 + 0.1·sin(2π·m/12)`), bottoms out in autumn.
pub fn seasonal_factor(month: u32) -> f64 {
    1.0 + 0.1 * (2.0 * std::f64::consts::PI * month as f64 / 12.0).sin()
}

/// Combined nominal draw for the requested appliances, kWh per day.
pub fn daily_consumption(appliances: &ApplianceCounts) -> f64 {
    appliances
        .iter()
        .filter(|&(_, &count)| count > 0)
        .map(|(kind, &count)| daily_factor(kind) * count as f64)
        .sum()
}

/// Estimate total consumption over the request window, in kWh.
///
/// Applies the seasonal multiplier for the start month and a uniform ±15%
/// noise multiplier. Not deterministic — seed the Rng for reproducible
/// output.
pub fn estimate<R: Rng>(request: &PredictionRequest, rng: &mut R) -> Result<f64> {
    let days = request.days()?;
    let daily = daily_consumption(&request.appliances);
    let seasonal = seasonal_factor(request.start_date.month());
    let jitter = rng.gen_range(0.85..=1.15);
    Ok(daily * days as f64 * seasonal * jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use common::Error;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn request(counts: &[(&str, u32)], start: (i32, u32, u32), end: (i32, u32, u32)) -> PredictionRequest {
        PredictionRequest {
            appliances: counts
                .iter()
                .map(|(k, c)| (k.to_string(), *c))
                .collect(),
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        }
    }

    #[test]
    fn test_daily_consumption_weights_by_factor() {
        let req = request(&[("lightbulbs", 8), ("tvs", 1)], (2025, 1, 1), (2025, 1, 8));
        let daily = daily_consumption(&req.appliances);
        assert!((daily - (0.3 * 8.0 + 2.5)).abs() < 1e-9);
    }

    #[test]
    fn test_daily_consumption_ignores_zero_counts() {
        let req = request(&[("tvs", 0), ("fans", 2)], (2025, 1, 1), (2025, 1, 8));
        assert!((daily_consumption(&req.appliances) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_rejects_inverted_range() {
        let req = request(&[("tvs", 1)], (2025, 1, 8), (2025, 1, 1));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(estimate(&req, &mut rng), Err(Error::InvalidRange(_))));
    }

    #[test]
    fn test_estimate_stays_within_jitter_envelope() {
        // 8 lightbulbs + 1 tv over 7 days: daily = 4.9, base = 34.3 kWh.
        let req = request(&[("lightbulbs", 8), ("tvs", 1)], (2025, 1, 1), (2025, 1, 8));
        let base = 4.9 * 7.0 * seasonal_factor(1);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let kwh = estimate(&req, &mut rng).unwrap();
            assert!(
                kwh >= base * 0.85 - 1e-9 && kwh <= base * 1.15 + 1e-9,
                "estimate {} outside [{}, {}]",
                kwh,
                base * 0.85,
                base * 1.15
            );
        }
    }

    #[test]
    fn test_estimate_is_reproducible_with_a_seed() {
        let req = request(&[("computers", 3)], (2025, 6, 1), (2025, 6, 15));
        let a = estimate(&req, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = estimate(&req, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_seasonal_factor_bounds() {
        for month in 1..=12 {
            let s = seasonal_factor(month);
            assert!((0.9..=1.1).contains(&s), "month {} factor {}", month, s);
        }
        // March sits at the sine peak; September at the trough.
        assert!(seasonal_factor(3) > 1.09);
        assert!(seasonal_factor(9) < 0.91);
    }
}
